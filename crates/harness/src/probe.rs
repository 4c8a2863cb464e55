//! Probe suite: independent, composable page checks
//!
//! Each probe produces one ProbeResult and must be safely skippable: a
//! missing precondition yields a failed or unavailable result, never a
//! thrown error. A single execution wrapper converts any driver/JS error
//! into an errored result, so adding a probe never re-derives
//! error-handling boilerplate.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{FeatureCheck, InteractionAction, InteractionCheck, LibraryCheck, VerifyConfig};
use crate::driver::Driver;
use crate::error::HarnessResult;
use crate::evidence::{EvidenceId, EvidencePayload, EvidenceStore};
use crate::observer::ObserverLog;

/// Timeout for locating a control during an interaction
const INTERACTION_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    SizeRange,
    StyleEquality,
    ForbiddenPattern,
    Presence,
    ContentIntegrity,
    Interaction,
    LibraryPresence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Passed,
    Failed,
    /// Precondition absent (e.g. control not on this page); not a failure
    Unavailable,
    /// The probe itself threw mid-execution
    Errored,
}

/// One probe execution. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub name: String,
    pub kind: ProbeKind,
    pub status: ProbeStatus,
    #[serde(default)]
    pub metric: Option<Value>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub evidence: Option<EvidenceId>,
}

impl ProbeResult {
    pub fn passed(&self) -> bool {
        self.status == ProbeStatus::Passed
    }
}

/// Everything a probe may touch during execution. Probes are independent
/// and must not rely on another probe's side effects.
pub struct ProbeContext<'a> {
    pub driver: &'a Driver,
    pub log: &'a ObserverLog,
    pub evidence: &'a mut EvidenceStore,
    pub target: &'a str,
}

/// A check in the suite. Criteria are data, so the suite is extensible
/// through configuration alone.
#[derive(Debug, Clone)]
pub enum Probe {
    SizeRange {
        range: [u64; 2],
        entry_document: String,
    },
    StyleEquality {
        selector: String,
        property: String,
        expected: String,
    },
    ForbiddenPattern {
        signatures: Vec<String>,
    },
    Presence(FeatureCheck),
    ContentIntegrity {
        tokens: Vec<String>,
    },
    Interaction(InteractionCheck),
    LibraryPresence(LibraryCheck),
}

impl Probe {
    pub fn name(&self) -> String {
        match self {
            Probe::SizeRange { .. } => "size-range".to_string(),
            Probe::StyleEquality { .. } => "style-equality".to_string(),
            Probe::ForbiddenPattern { .. } => "forbidden-pattern".to_string(),
            Probe::Presence(f) => format!("presence:{}", f.name),
            Probe::ContentIntegrity { .. } => "content-integrity".to_string(),
            Probe::Interaction(i) => format!("interaction:{}", i.name),
            Probe::LibraryPresence(l) => format!("library:{}", l.name),
        }
    }

    pub fn kind(&self) -> ProbeKind {
        match self {
            Probe::SizeRange { .. } => ProbeKind::SizeRange,
            Probe::StyleEquality { .. } => ProbeKind::StyleEquality,
            Probe::ForbiddenPattern { .. } => ProbeKind::ForbiddenPattern,
            Probe::Presence(_) => ProbeKind::Presence,
            Probe::ContentIntegrity { .. } => ProbeKind::ContentIntegrity,
            Probe::Interaction(_) => ProbeKind::Interaction,
            Probe::LibraryPresence(_) => ProbeKind::LibraryPresence,
        }
    }

    /// The standard suite for a configuration, in execution order.
    pub fn standard_suite(config: &VerifyConfig) -> Vec<Probe> {
        let mut suite = vec![
            Probe::SizeRange {
                range: config.expected_size_range_bytes,
                entry_document: config.entry_document.clone(),
            },
            Probe::StyleEquality {
                selector: config.style_selector.clone(),
                property: config.style_property.clone(),
                expected: config.expected_style_value.clone(),
            },
            Probe::ForbiddenPattern {
                signatures: config.forbidden_color_signatures.clone(),
            },
        ];
        suite.extend(config.features.iter().cloned().map(Probe::Presence));
        suite.push(Probe::ContentIntegrity {
            tokens: config.placeholder_tokens.clone(),
        });
        suite.extend(config.libraries.iter().cloned().map(Probe::LibraryPresence));
        suite.extend(config.interactions.iter().cloned().map(Probe::Interaction));
        suite
    }

    /// Execution wrapper: any error from the inner check becomes an
    /// errored result instead of aborting the run.
    pub async fn execute(&self, ctx: &mut ProbeContext<'_>) -> ProbeResult {
        debug!(probe = %self.name(), "running probe");
        match self.run(ctx).await {
            Ok(result) => result,
            Err(e) => ProbeResult {
                name: self.name(),
                kind: self.kind(),
                status: ProbeStatus::Errored,
                metric: None,
                detail: Some(e.to_string()),
                location: Some(self.location_hint()),
                evidence: None,
            },
        }
    }

    fn location_hint(&self) -> String {
        match self {
            Probe::SizeRange { entry_document, .. } => entry_document.clone(),
            Probe::StyleEquality { selector, .. } => selector.clone(),
            Probe::ForbiddenPattern { .. } => "computed styles".to_string(),
            Probe::Presence(_) | Probe::ContentIntegrity { .. } => "page content".to_string(),
            Probe::Interaction(i) => i.selector.clone(),
            Probe::LibraryPresence(_) => "javascript libraries".to_string(),
        }
    }

    async fn run(&self, ctx: &mut ProbeContext<'_>) -> HarnessResult<ProbeResult> {
        match self {
            Probe::SizeRange {
                range,
                entry_document,
            } => Ok(self.size_range(ctx.log, ctx.target, *range, entry_document)),
            Probe::StyleEquality {
                selector,
                property,
                expected,
            } => self.style_equality(ctx, selector, property, expected).await,
            Probe::ForbiddenPattern { signatures } => {
                self.forbidden_pattern(ctx, signatures).await
            }
            Probe::Presence(feature) => self.presence(ctx, feature).await,
            Probe::ContentIntegrity { tokens } => self.content_integrity(ctx, tokens).await,
            Probe::Interaction(check) => self.interaction(ctx, check).await,
            Probe::LibraryPresence(library) => self.library_presence(ctx, library).await,
        }
    }

    // Reads only the observer log, so the size contract is testable
    // without a browser
    fn size_range(
        &self,
        log: &ObserverLog,
        target: &str,
        range: [u64; 2],
        entry_document: &str,
    ) -> ProbeResult {
        match log.document_size(target, entry_document) {
            None => ProbeResult {
                name: self.name(),
                kind: self.kind(),
                status: ProbeStatus::Failed,
                metric: None,
                detail: Some("entry document response was not captured".to_string()),
                location: Some(entry_document.to_string()),
                evidence: None,
            },
            Some(size) => {
                let [min, max] = range;
                let in_range = (min..=max).contains(&size);
                ProbeResult {
                    name: self.name(),
                    kind: self.kind(),
                    status: if in_range {
                        ProbeStatus::Passed
                    } else {
                        ProbeStatus::Failed
                    },
                    metric: Some(json!(size)),
                    detail: Some(if in_range {
                        format!("document size {} bytes within [{}, {}]", size, min, max)
                    } else {
                        format!("document size {} bytes outside expected [{}, {}]", size, min, max)
                    }),
                    location: Some(entry_document.to_string()),
                    evidence: None,
                }
            }
        }
    }

    async fn style_equality(
        &self,
        ctx: &mut ProbeContext<'_>,
        selector: &str,
        property: &str,
        expected: &str,
    ) -> HarnessResult<ProbeResult> {
        let script = format!(
            r#"(() => {{
  const el = document.querySelector({selector});
  if (!el) return null;
  return window.getComputedStyle(el).getPropertyValue({property});
}})()"#,
            selector = js_string(selector),
            property = js_string(property),
        );
        let value = ctx.driver.evaluate(&script).await?;

        let result = match value.as_str() {
            None => ProbeResult {
                name: self.name(),
                kind: self.kind(),
                status: ProbeStatus::Failed,
                metric: Some(Value::Null),
                detail: Some(format!("element {} not found", selector)),
                location: Some(selector.to_string()),
                evidence: None,
            },
            Some(actual) => {
                let actual = actual.trim();
                let matches = actual == expected;
                ProbeResult {
                    name: self.name(),
                    kind: self.kind(),
                    status: if matches {
                        ProbeStatus::Passed
                    } else {
                        ProbeStatus::Failed
                    },
                    metric: Some(json!(actual)),
                    detail: Some(if matches {
                        format!("{} is {}", property, actual)
                    } else {
                        format!("{} is {}, expected {}", property, actual, expected)
                    }),
                    location: Some(selector.to_string()),
                    evidence: None,
                }
            }
        };
        Ok(result)
    }

    async fn forbidden_pattern(
        &self,
        ctx: &mut ProbeContext<'_>,
        signatures: &[String],
    ) -> HarnessResult<ProbeResult> {
        // Exhaustive scan: every element is inspected so a single match
        // among thousands cannot be missed by short-circuiting.
        let script = format!(
            r#"(() => {{
  const signatures = {signatures};
  const hits = [];
  const all = document.querySelectorAll('*');
  for (const el of all) {{
    const style = window.getComputedStyle(el);
    const haystack = style.background + ' ' + style.backgroundImage + ' ' + style.backgroundColor;
    for (const signature of signatures) {{
      if (haystack.includes(signature)) {{
        hits.push({{ tag: el.tagName.toLowerCase(), signature }});
      }}
    }}
  }}
  return {{ scanned: all.length, hits }};
}})()"#,
            signatures = serde_json::to_string(signatures)?,
        );
        let value = ctx.driver.evaluate(&script).await?;

        let hit_count = value["hits"].as_array().map(|h| h.len()).unwrap_or(0);
        let scanned = value["scanned"].as_u64().unwrap_or(0);
        let first_signature = value["hits"][0]["signature"].as_str().unwrap_or("");

        Ok(ProbeResult {
            name: self.name(),
            kind: self.kind(),
            status: if hit_count == 0 {
                ProbeStatus::Passed
            } else {
                ProbeStatus::Failed
            },
            metric: Some(value.clone()),
            detail: Some(if hit_count == 0 {
                format!("no forbidden color signature across {} elements", scanned)
            } else {
                format!(
                    "forbidden color signature {} found on {} element(s) of {}",
                    first_signature, hit_count, scanned
                )
            }),
            location: Some("computed styles".to_string()),
            evidence: None,
        })
    }

    async fn presence(
        &self,
        ctx: &mut ProbeContext<'_>,
        feature: &FeatureCheck,
    ) -> HarnessResult<ProbeResult> {
        let mut found = 0u64;
        for selector in &feature.selectors {
            found = ctx.driver.count(selector).await?;
            if found > 0 {
                break;
            }
        }

        Ok(ProbeResult {
            name: self.name(),
            kind: self.kind(),
            status: if found > 0 {
                ProbeStatus::Passed
            } else {
                ProbeStatus::Failed
            },
            metric: Some(json!(found)),
            detail: Some(if found > 0 {
                format!("{} present ({} match(es))", feature.name, found)
            } else {
                format!("{} not found", feature.name)
            }),
            location: Some("page content".to_string()),
            evidence: None,
        })
    }

    async fn content_integrity(
        &self,
        ctx: &mut ProbeContext<'_>,
        tokens: &[String],
    ) -> HarnessResult<ProbeResult> {
        let body = ctx.driver.text_content("body").await?;

        let result = match body {
            None => ProbeResult {
                name: self.name(),
                kind: self.kind(),
                status: ProbeStatus::Failed,
                metric: None,
                detail: Some("page body not found".to_string()),
                location: Some("page content".to_string()),
                evidence: None,
            },
            Some(text) => {
                let found: Vec<&String> = tokens.iter().filter(|t| text.contains(t.as_str())).collect();
                ProbeResult {
                    name: self.name(),
                    kind: self.kind(),
                    status: if found.is_empty() {
                        ProbeStatus::Passed
                    } else {
                        ProbeStatus::Failed
                    },
                    metric: Some(json!(found)),
                    detail: Some(if found.is_empty() {
                        "no placeholder artifacts in page content".to_string()
                    } else {
                        format!("found placeholder token \"{}\" in page content", found[0])
                    }),
                    location: Some("page content".to_string()),
                    evidence: None,
                }
            }
        };
        Ok(result)
    }

    async fn interaction(
        &self,
        ctx: &mut ProbeContext<'_>,
        check: &InteractionCheck,
    ) -> HarnessResult<ProbeResult> {
        // Missing control is a skipped probe, not a failure
        if ctx.driver.count(&check.selector).await? == 0 {
            return Ok(ProbeResult {
                name: self.name(),
                kind: self.kind(),
                status: ProbeStatus::Unavailable,
                metric: None,
                detail: Some(format!("control not found: {}", check.selector)),
                location: Some(check.selector.clone()),
                evidence: None,
            });
        }

        match &check.action {
            InteractionAction::Click => {
                ctx.driver
                    .click(&check.selector, INTERACTION_TIMEOUT_MS)
                    .await?;
            }
            InteractionAction::Hover => {
                ctx.driver
                    .hover(&check.selector, INTERACTION_TIMEOUT_MS)
                    .await?;
            }
            InteractionAction::ScrollX { by } => {
                // CSS selector path: scroll the container only when it
                // actually overflows
                let script = format!(
                    r#"(() => {{
  const el = document.querySelector({selector});
  if (!el) return false;
  if (el.scrollWidth <= el.clientWidth) return false;
  el.scrollLeft += {by};
  return true;
}})()"#,
                    selector = js_string(&check.selector),
                    by = by,
                );
                let scrolled = ctx.driver.evaluate(&script).await?.as_bool().unwrap_or(false);
                if let Some(result) = self.scroll_outcome(check, scrolled) {
                    return Ok(result);
                }
            }
        }

        ctx.driver.settle(check.settle_ms).await?;

        let evidence = match &check.screenshot {
            Some(label) => {
                let shot = ctx.driver.screenshot(true).await?;
                Some(ctx.evidence.push(label, EvidencePayload::PngBase64(shot)))
            }
            None => None,
        };

        Ok(ProbeResult {
            name: self.name(),
            kind: self.kind(),
            status: ProbeStatus::Passed,
            metric: None,
            detail: Some(format!("{} working", check.name)),
            location: Some(check.selector.clone()),
            evidence,
        })
    }

    /// Map the page's scroll report to a probe outcome. A container that
    /// never overflowed was not exercised: unavailable, not passed.
    fn scroll_outcome(&self, check: &InteractionCheck, scrolled: bool) -> Option<ProbeResult> {
        if scrolled {
            return None;
        }
        Some(ProbeResult {
            name: self.name(),
            kind: self.kind(),
            status: ProbeStatus::Unavailable,
            metric: Some(json!(false)),
            detail: Some(format!("{}: container does not overflow", check.name)),
            location: Some(check.selector.clone()),
            evidence: None,
        })
    }

    async fn library_presence(
        &self,
        ctx: &mut ProbeContext<'_>,
        library: &LibraryCheck,
    ) -> HarnessResult<ProbeResult> {
        let script = format!(
            "typeof window[{}] !== 'undefined'",
            js_string(&library.symbol)
        );
        let defined = ctx.driver.evaluate(&script).await?.as_bool().unwrap_or(false);

        Ok(ProbeResult {
            name: self.name(),
            kind: self.kind(),
            status: if defined {
                ProbeStatus::Passed
            } else {
                ProbeStatus::Failed
            },
            metric: Some(json!(defined)),
            detail: Some(if defined {
                format!("{} library loaded", library.name)
            } else {
                format!("{} library not loaded", library.name)
            }),
            location: Some("javascript libraries".to_string()),
            evidence: None,
        })
    }
}

/// Run the suite sequentially; each probe is awaited before the next.
pub async fn run_suite(probes: &[Probe], ctx: &mut ProbeContext<'_>) -> Vec<ProbeResult> {
    let mut results = Vec::with_capacity(probes.len());
    for probe in probes {
        results.push(probe.execute(ctx).await);
    }
    results
}

/// Render a Rust string as a JS string literal
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NetworkEvent;
    use crate::report::Report;
    use test_case::test_case;

    fn log_with_document(byte_size: u64) -> ObserverLog {
        let log = ObserverLog::new();
        log.push_network(NetworkEvent {
            url: "https://site.test/plan/index.html".to_string(),
            http_status: 200,
            byte_size,
            content_type: "text/html".to_string(),
        });
        log
    }

    fn size_probe() -> Probe {
        Probe::SizeRange {
            range: [204_800, 256_000],
            entry_document: "index.html".to_string(),
        }
    }

    #[test_case(204_800, ProbeStatus::Passed ; "exact lower bound passes")]
    #[test_case(256_000, ProbeStatus::Passed ; "exact upper bound passes")]
    #[test_case(204_799, ProbeStatus::Failed ; "one byte under fails")]
    #[test_case(256_001, ProbeStatus::Failed ; "one byte over fails")]
    fn size_range_bounds_are_inclusive(size: u64, expected: ProbeStatus) {
        let probe = size_probe();
        let result = probe.size_range(
            &log_with_document(size),
            "https://site.test/plan/",
            [204_800, 256_000],
            "index.html",
        );
        assert_eq!(result.status, expected);
        assert_eq!(result.metric, Some(json!(size)));
    }

    #[test]
    fn size_range_without_captured_document_fails() {
        let probe = size_probe();
        let result = probe.size_range(
            &ObserverLog::new(),
            "https://site.test/plan/",
            [204_800, 256_000],
            "index.html",
        );
        assert_eq!(result.status, ProbeStatus::Failed);
        assert!(result.detail.as_deref().unwrap().contains("not captured"));
    }

    #[test]
    fn non_overflowing_scroll_is_unavailable_not_passed() {
        let check = InteractionCheck {
            name: "kanban horizontal scroll".to_string(),
            selector: ".kanban".to_string(),
            action: InteractionAction::ScrollX { by: 100 },
            settle_ms: 300,
            screenshot: None,
        };
        let probe = Probe::Interaction(check.clone());

        let result = probe.scroll_outcome(&check, false).unwrap();
        assert_eq!(result.status, ProbeStatus::Unavailable);
        assert!(!result.passed());
        assert!(result.detail.as_deref().unwrap().contains("does not overflow"));

        // Never listed as a working feature
        let ledger = Report::features_ledger(&[result], &[], &[]);
        assert!(ledger.iter().all(|f| !f.contains("kanban")));

        // An overflowing container continues to the settle/evidence path
        assert!(probe.scroll_outcome(&check, true).is_none());
    }

    #[test]
    fn standard_suite_covers_configured_checks() {
        let config = VerifyConfig::default();
        let suite = Probe::standard_suite(&config);

        // size + style + forbidden + features + integrity + libraries + interactions
        let expected = 3 + config.features.len() + 1 + config.libraries.len() + config.interactions.len();
        assert_eq!(suite.len(), expected);
        assert_eq!(suite[0].kind(), ProbeKind::SizeRange);
        assert_eq!(suite[1].kind(), ProbeKind::StyleEquality);
        assert_eq!(suite[2].kind(), ProbeKind::ForbiddenPattern);
    }

    #[test]
    fn probe_names_are_stable() {
        let config = VerifyConfig::default();
        let suite = Probe::standard_suite(&config);
        let names: Vec<String> = suite.iter().map(Probe::name).collect();

        assert!(names.contains(&"presence:statistics dashboard".to_string()));
        assert!(names.contains(&"library:Chart.js".to_string()));
        assert!(names.contains(&"interaction:kanban horizontal scroll".to_string()));
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string("a'b\"c"), r#""a'b\"c""#);
    }
}
