//! Playwright browser driver
//!
//! One long-lived `node` subprocess runs an embedded Playwright script for
//! the life of a Session. Commands go down stdin as JSON lines and replies
//! come back correlated by id; unsolicited event lines (network responses,
//! console and runtime errors) are pushed into the session's ObserverLog
//! as they arrive, interleaved with foreground commands.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::config::VerifyConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::observer::ObserverLog;

/// Extra headroom over the per-command timeout so browser-side timeouts
/// surface as command errors, not reply timeouts.
const REPLY_TIMEOUT_MARGIN_MS: u64 = 5_000;

struct PendingReply {
    tx: oneshot::Sender<Result<Value, String>>,
}

/// Handle to the driver subprocess.
pub struct Driver {
    child: Child,
    // Shared so concurrent callers serialize on the write, not the handle
    stdin: Arc<tokio::sync::Mutex<ChildStdin>>,
    pending: Arc<Mutex<HashMap<u64, PendingReply>>>,
    next_id: AtomicU64,
    timeout_ms: u64,
    // Holds the staged driver script for the life of the process
    _script_dir: TempDir,
}

impl Driver {
    /// Launch the driver for one session. Observer accumulation starts
    /// here, before any navigation is attempted.
    pub async fn launch(config: &VerifyConfig, log: ObserverLog) -> HarnessResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, driver_script(config))?;

        debug!("Launching browser driver: {}", script_path.display());

        let mut child = Command::new("node")
            .arg(&script_path)
            .current_dir(script_dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::Driver(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HarnessError::Driver("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::Driver("driver stdout unavailable".to_string()))?;

        let pending: Arc<Mutex<HashMap<u64, PendingReply>>> = Arc::new(Mutex::new(HashMap::new()));

        // Reader task: route replies by id, push events into the log
        tokio::spawn(route_driver_output(
            BufReader::new(stdout),
            pending.clone(),
            log,
        ));

        Ok(Self {
            child,
            stdin: Arc::new(tokio::sync::Mutex::new(stdin)),
            pending,
            next_id: AtomicU64::new(1),
            timeout_ms: config.timeout_ms,
            _script_dir: script_dir,
        })
    }

    fn check_playwright_installed() -> HarnessResult<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::PlaywrightNotFound),
        }
    }

    /// Send one command and wait for its correlated reply. A browser-side
    /// error comes back as `Err` with the driver's message.
    async fn call(&self, mut command: Value) -> HarnessResult<Result<Value, String>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        command["id"] = json!(id);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingReply { tx });

        let mut line = serde_json::to_string(&command)?;
        line.push('\n');
        trace!("driver send: {}", line.trim_end());
        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(|e| HarnessError::Driver(format!("driver stdin write failed: {}", e)))?;
        }

        let reply_timeout = Duration::from_millis(self.timeout_ms + REPLY_TIMEOUT_MARGIN_MS);
        match tokio::time::timeout(reply_timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(HarnessError::DriverClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(HarnessError::Timeout(format!(
                    "driver reply for {}",
                    command["op"].as_str().unwrap_or("command")
                )))
            }
        }
    }

    /// Like `call`, but treat a browser-side error as a harness error.
    async fn call_ok(&self, command: Value) -> HarnessResult<Value> {
        self.call(command)
            .await?
            .map_err(HarnessError::Driver)
    }

    /// Navigate to a URL. `Ok(Ok(status))` on a loaded document,
    /// `Ok(Err(reason))` when the browser navigation itself threw.
    pub async fn goto(&self, url: &str) -> HarnessResult<Result<u16, String>> {
        let timeout_ms = self.timeout_ms;
        let reply = self
            .call(json!({"op": "goto", "url": url, "timeout_ms": timeout_ms}))
            .await?;
        Ok(reply.map(|v| v["status"].as_u64().unwrap_or(0) as u16))
    }

    /// Evaluate a JavaScript expression in the page
    pub async fn evaluate(&self, script: &str) -> HarnessResult<Value> {
        self.call_ok(json!({"op": "evaluate", "script": script}))
            .await
    }

    /// Count elements matching a Playwright selector
    pub async fn count(&self, selector: &str) -> HarnessResult<u64> {
        let value = self
            .call_ok(json!({"op": "count", "selector": selector}))
            .await?;
        Ok(value.as_u64().unwrap_or(0))
    }

    /// Full text content of an element, if it exists
    pub async fn text_content(&self, selector: &str) -> HarnessResult<Option<String>> {
        let value = self
            .call_ok(json!({"op": "text_content", "selector": selector}))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn click(&self, selector: &str, timeout_ms: u64) -> HarnessResult<()> {
        self.call_ok(json!({"op": "click", "selector": selector, "timeout_ms": timeout_ms}))
            .await?;
        Ok(())
    }

    pub async fn hover(&self, selector: &str, timeout_ms: u64) -> HarnessResult<()> {
        self.call_ok(json!({"op": "hover", "selector": selector, "timeout_ms": timeout_ms}))
            .await?;
        Ok(())
    }

    /// Full-page screenshot as base64 PNG
    pub async fn screenshot(&self, full_page: bool) -> HarnessResult<String> {
        let value = self
            .call_ok(json!({"op": "screenshot", "full_page": full_page}))
            .await?;
        let data = value
            .as_str()
            .ok_or_else(|| HarnessError::Driver("missing screenshot data".to_string()))?;
        // Validate the payload decodes; stored base64, persisted by the consumer
        BASE64
            .decode(data)
            .map_err(|e| HarnessError::Driver(format!("invalid screenshot payload: {}", e)))?;
        Ok(data.to_string())
    }

    /// In-page settle wait (browser clock, not harness clock)
    pub async fn settle(&self, ms: u64) -> HarnessResult<()> {
        self.call_ok(json!({"op": "sleep", "ms": ms})).await?;
        Ok(())
    }

    /// Graceful shutdown: close the browser, then reap the child. The
    /// kill-on-drop child is the backstop when this path is skipped.
    pub async fn close(mut self) {
        if let Err(e) = self.call(json!({"op": "close"})).await {
            warn!("driver close command failed: {}", e);
        }
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("driver exited: {}", status),
            _ => {
                warn!("driver did not exit cleanly, killing");
                let _ = self.child.kill().await;
            }
        }
    }
}

/// Route driver stdout: replies to their correlated waiters, unsolicited
/// events into the log. When the stream ends (driver exited) the pending
/// map is drained so in-flight callers fail fast with DriverClosed
/// instead of waiting out their reply timeout.
async fn route_driver_output<R>(
    reader: R,
    pending: Arc<Mutex<HashMap<u64, PendingReply>>>,
    log: ObserverLog,
) where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        trace!("driver recv: {}", line);
        let value: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => continue, // stray output from the page
        };

        if let Some(id) = value.get("id").and_then(Value::as_u64) {
            if let Some(reply) = pending.lock().remove(&id) {
                let result = if value["ok"].as_bool() == Some(true) {
                    Ok(value["result"].clone())
                } else {
                    Err(value["error"]
                        .as_str()
                        .unwrap_or("unknown driver error")
                        .to_string())
                };
                let _ = reply.tx.send(result);
            }
        } else if value.get("event").is_some() {
            log.ingest(&value);
        }
    }
    debug!("driver stdout closed");
    pending.lock().clear();
}

/// Render the embedded Playwright driver for this configuration.
fn driver_script(config: &VerifyConfig) -> String {
    let user_agent = config
        .user_agent
        .as_deref()
        .map(|ua| format!(", userAgent: '{}'", ua.replace('\'', "\\'")))
        .unwrap_or_default();

    format!(
        r#"const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

const emit = (obj) => process.stdout.write(JSON.stringify(obj) + '\n');

(async () => {{
  const browser = await {browser}.launch({{
    headless: {headless},
    args: ['--no-sandbox', '--disable-setuid-sandbox']
  }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}{user_agent}
  }});
  const page = await context.newPage();

  page.on('response', async (response) => {{
    let size = 0;
    try {{
      size = (await response.body()).length;
    }} catch (e) {{
      // body unavailable (redirect, stream): record zero rather than drop
    }}
    emit({{
      event: 'network',
      url: response.url(),
      status: response.status(),
      size,
      content_type: response.headers()['content-type'] || 'unknown'
    }});
  }});

  page.on('console', (msg) => {{
    if (msg.type() === 'error') {{
      emit({{ event: 'console_error', message: msg.text() }});
    }}
  }});

  page.on('pageerror', (error) => {{
    emit({{ event: 'runtime_error', message: error.message, stack: error.stack }});
  }});

  const rl = readline.createInterface({{ input: process.stdin }});
  for await (const line of rl) {{
    let cmd;
    try {{ cmd = JSON.parse(line); }} catch (e) {{ continue; }}
    try {{
      let result = null;
      switch (cmd.op) {{
        case 'goto': {{
          const resp = await page.goto(cmd.url, {{ waitUntil: 'networkidle', timeout: cmd.timeout_ms }});
          result = {{ status: resp ? resp.status() : 0 }};
          break;
        }}
        case 'evaluate':
          result = await page.evaluate(cmd.script);
          break;
        case 'count':
          result = await page.locator(cmd.selector).count();
          break;
        case 'text_content':
          result = await page.textContent(cmd.selector);
          break;
        case 'click':
          await page.click(cmd.selector, {{ timeout: cmd.timeout_ms }});
          break;
        case 'hover':
          await page.hover(cmd.selector, {{ timeout: cmd.timeout_ms }});
          break;
        case 'screenshot':
          result = (await page.screenshot({{ fullPage: cmd.full_page }})).toString('base64');
          break;
        case 'sleep':
          await page.waitForTimeout(cmd.ms);
          break;
        case 'close':
          await browser.close();
          emit({{ id: cmd.id, ok: true, result: null }});
          process.exit(0);
        default:
          throw new Error('unknown op: ' + cmd.op);
      }}
      emit({{ id: cmd.id, ok: true, result }});
    }} catch (error) {{
      emit({{ id: cmd.id, ok: false, error: error.message }});
    }}
  }}
  await browser.close();
}})().catch((error) => {{
  emit({{ event: 'fatal', message: error.message }});
  process.exit(1);
}});
"#,
        browser = match config.browser.as_str() {
            "firefox" => "firefox",
            "webkit" => "webkit",
            _ => "chromium",
        },
        headless = config.headless,
        width = config.viewport.width,
        height = config.viewport.height,
        user_agent = user_agent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_carries_viewport_and_engine() {
        let mut config = VerifyConfig::default();
        config.browser = "firefox".to_string();
        let script = driver_script(&config);
        assert!(script.contains("width: 1920, height: 1080"));
        assert!(script.contains("firefox.launch"));
        assert!(script.contains("event: 'network'"));
    }

    #[test]
    fn unknown_engine_falls_back_to_chromium() {
        let mut config = VerifyConfig::default();
        config.browser = "netscape".to_string();
        assert!(driver_script(&config).contains("chromium.launch"));
    }

    #[tokio::test]
    async fn replies_and_events_are_routed() {
        let pending: Arc<Mutex<HashMap<u64, PendingReply>>> = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = oneshot::channel();
        pending.lock().insert(1, PendingReply { tx });
        let log = ObserverLog::new();

        let input: &[u8] = b"{\"id\":1,\"ok\":true,\"result\":42}\n\
            {\"event\":\"network\",\"url\":\"https://a.test/\",\"status\":200,\"size\":10,\"content_type\":\"text/html\"}\n\
            not json\n";
        route_driver_output(input, pending.clone(), log.clone()).await;

        assert_eq!(rx.await.unwrap().unwrap(), json!(42));
        assert_eq!(log.network_events().len(), 1);
        assert!(pending.lock().is_empty());
    }

    #[tokio::test]
    async fn stream_end_fails_in_flight_callers() {
        let pending: Arc<Mutex<HashMap<u64, PendingReply>>> = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = oneshot::channel();
        pending.lock().insert(7, PendingReply { tx });

        // Empty stream: the driver died before replying
        route_driver_output(&b""[..], pending.clone(), ObserverLog::new()).await;

        assert!(pending.lock().is_empty());
        // The waiter resolves immediately with a dropped sender, which
        // `call` surfaces as DriverClosed
        assert!(rx.await.is_err());
    }
}
