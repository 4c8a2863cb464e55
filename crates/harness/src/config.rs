//! Declarative verification configuration
//!
//! All thresholds and check criteria live here as data so the harness can
//! be retargeted to a different expected baseline without code changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classify::Severity;
use crate::error::HarnessResult;

/// A complete verification configuration, usually parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Maximum navigation attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-attempt navigation timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Fixed wait between navigation attempts (not exponential)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Wait after load before probing, to let client-side rendering settle
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Inclusive [min, max] byte range for the entry document
    #[serde(default = "default_size_range")]
    pub expected_size_range_bytes: [u64; 2],

    /// Beyond this the size miss is classified critical instead of major
    #[serde(default = "default_size_hard_limit")]
    pub size_hard_limit_bytes: u64,

    /// Exact computed-style value expected on the root element
    #[serde(default = "default_style_value")]
    pub expected_style_value: String,

    /// Root element the style-equality probe inspects
    #[serde(default = "default_style_selector")]
    pub style_selector: String,

    /// Computed style property under test
    #[serde(default = "default_style_property")]
    pub style_property: String,

    /// Color signatures that must not appear in any element's background
    #[serde(default = "default_forbidden_signatures")]
    pub forbidden_color_signatures: Vec<String>,

    /// Load time above this is a major performance issue
    #[serde(default = "default_performance_threshold_ms")]
    pub performance_threshold_ms: u64,

    /// Literal tokens that must not appear in the rendered text body
    #[serde(default = "default_placeholder_tokens")]
    pub placeholder_tokens: Vec<String>,

    /// Expected entry document name for size attribution
    #[serde(default = "default_entry_document")]
    pub entry_document: String,

    /// Browser viewport
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Browser engine (chromium, firefox, webkit)
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Run headless
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Optional user agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Named features whose presence is asserted
    #[serde(default = "default_features")]
    pub features: Vec<FeatureCheck>,

    /// Interaction simulations to exercise
    #[serde(default = "default_interactions")]
    pub interactions: Vec<InteractionCheck>,

    /// Client-side library symbols expected in global scope
    #[serde(default = "default_libraries")]
    pub libraries: Vec<LibraryCheck>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Presence criteria for a named feature. Criteria are data: any selector
/// in the list matching at least one element counts as present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCheck {
    pub name: String,
    pub selectors: Vec<String>,
    /// Severity assigned when the feature is missing
    #[serde(default = "default_missing_severity")]
    pub severity_on_missing: Severity,
}

/// A simulated user action on a located control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionCheck {
    pub name: String,
    pub selector: String,
    pub action: InteractionAction,
    #[serde(default = "default_interaction_settle_ms")]
    pub settle_ms: u64,
    /// Capture a screenshot under this label after the action settles
    #[serde(default)]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionAction {
    Click,
    Hover,
    /// Horizontal scroll of the matched container by `by` pixels
    ScrollX { by: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryCheck {
    pub name: String,
    /// Global symbol that must be defined after load
    pub symbol: String,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_backoff_ms() -> u64 {
    2_000
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_size_range() -> [u64; 2] {
    [200 * 1024, 250 * 1024]
}

fn default_size_hard_limit() -> u64 {
    400 * 1024
}

fn default_style_value() -> String {
    "rgb(245, 241, 232)".to_string()
}

fn default_style_selector() -> String {
    "body".to_string()
}

fn default_style_property() -> String {
    "background-color".to_string()
}

fn default_forbidden_signatures() -> Vec<String> {
    vec!["667eea".to_string(), "764ba2".to_string()]
}

fn default_performance_threshold_ms() -> u64 {
    5_000
}

fn default_placeholder_tokens() -> Vec<String> {
    vec!["NaN".to_string(), "undefined".to_string()]
}

fn default_entry_document() -> String {
    "index.html".to_string()
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1920,
        height: 1080,
    }
}

fn default_browser() -> String {
    "chromium".to_string()
}

fn default_true() -> bool {
    true
}

fn default_missing_severity() -> Severity {
    Severity::Major
}

fn default_interaction_settle_ms() -> u64 {
    500
}

fn default_features() -> Vec<FeatureCheck> {
    vec![
        FeatureCheck {
            name: "statistics dashboard".to_string(),
            selectors: vec!["text=Statistics Dashboard".to_string()],
            severity_on_missing: Severity::Critical,
        },
        FeatureCheck {
            name: "kanban route map".to_string(),
            selectors: vec!["text=Route Map".to_string(), ".kanban".to_string()],
            severity_on_missing: Severity::Critical,
        },
        FeatureCheck {
            name: "budget charts".to_string(),
            selectors: vec!["canvas".to_string(), "text=Budget".to_string()],
            severity_on_missing: Severity::Major,
        },
        FeatureCheck {
            name: "map links".to_string(),
            selectors: vec!["a[href*=\"maps\"]".to_string()],
            severity_on_missing: Severity::Major,
        },
        FeatureCheck {
            name: "cities panel".to_string(),
            selectors: vec!["text=Cities".to_string(), "text=Beijing".to_string()],
            severity_on_missing: Severity::Major,
        },
        FeatureCheck {
            name: "currency values".to_string(),
            selectors: vec![
                "text=¥".to_string(),
                "text=CNY".to_string(),
                "text=RMB".to_string(),
            ],
            severity_on_missing: Severity::Minor,
        },
    ]
}

fn default_interactions() -> Vec<InteractionCheck> {
    vec![
        InteractionCheck {
            name: "expand-collapse controls".to_string(),
            selector: "button:has-text(\"Expand All\")".to_string(),
            action: InteractionAction::Click,
            settle_ms: 500,
            screenshot: Some("expanded-stats".to_string()),
        },
        InteractionCheck {
            name: "map link hover".to_string(),
            selector: "a[href*=\"maps\"]".to_string(),
            action: InteractionAction::Hover,
            settle_ms: 300,
            screenshot: Some("map-link-hover".to_string()),
        },
        InteractionCheck {
            name: "kanban horizontal scroll".to_string(),
            selector: ".kanban".to_string(),
            action: InteractionAction::ScrollX { by: 100 },
            settle_ms: 300,
            screenshot: None,
        },
    ]
}

fn default_libraries() -> Vec<LibraryCheck> {
    vec![LibraryCheck {
        name: "Chart.js".to_string(),
        symbol: "Chart".to_string(),
    }]
}

impl Default for VerifyConfig {
    fn default() -> Self {
        // Serde defaults are the single source of truth
        serde_yaml::from_str("{}").expect("default config must deserialize")
    }
}

impl VerifyConfig {
    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a YAML file
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> HarnessResult<()> {
        use crate::error::HarnessError;

        if self.max_attempts == 0 {
            return Err(HarnessError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        let [min, max] = self.expected_size_range_bytes;
        if min > max {
            return Err(HarnessError::InvalidConfig(format!(
                "expected_size_range_bytes min {} exceeds max {}",
                min, max
            )));
        }
        Ok(())
    }
}
