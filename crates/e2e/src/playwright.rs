//! Playwright browser automation
//!
//! A single long-lived `node` process hosts the browser and speaks a
//! JSON-lines protocol on stdin/stdout. Requests carry an id and are answered
//! out of order, so several waits can be in flight against one page.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command as TokioCommand};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{Cookie, Page, WaitState};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Extra time granted to the bridge beyond a wait's own timeout
const BRIDGE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Base URL that relative navigations resolve against
    pub base_url: String,

    /// Directory holding `node_modules/playwright`
    pub node_project_dir: PathBuf,

    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,

    /// Default bound for clicks and fills
    pub action_timeout: Duration,

    /// Bound for the browser to come up
    pub launch_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: pos_e2e_common::settings::DEFAULT_BASE_URL.to_string(),
            node_project_dir: PathBuf::from("."),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            action_timeout: Duration::from_secs(30),
            launch_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchOptions<'a> {
    browser: &'a str,
    headless: bool,
    base_url: &'a str,
    viewport: Viewport,
    action_timeout_ms: u64,
}

#[derive(Serialize)]
struct Viewport {
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u64>,
    cmd: &'a str,
    args: Value,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

#[derive(Debug, Deserialize)]
struct BridgeEvent {
    event: String,
    #[serde(default)]
    page: Option<u64>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Message {
    Reply(Reply),
    Event(BridgeEvent),
}

type PendingMap = Arc<parking_lot::Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

/// Handle to the running Playwright bridge process
pub struct PlaywrightBridge {
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
    child: parking_lot::Mutex<Child>,
    config: PlaywrightConfig,
    _workdir: tempfile::TempDir,
}

impl PlaywrightBridge {
    /// Start node with the bridge script and wait for the browser to launch
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Arc<Self>> {
        Self::check_playwright_installed(&config.node_project_dir).await?;

        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let options = serde_json::to_string(&LaunchOptions {
            browser: config.browser.as_str(),
            headless: config.headless,
            base_url: &config.base_url,
            viewport: Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
            },
            action_timeout_ms: config.action_timeout.as_millis() as u64,
        })?;

        info!(
            "Launching {} via Playwright bridge (headless: {})",
            config.browser.as_str(),
            config.headless
        );

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(options)
            .current_dir(&config.node_project_dir)
            .env("NODE_PATH", config.node_project_dir.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.start_kill();
                return Err(E2eError::Playwright("bridge stdio unavailable".to_string()));
            }
        };

        let pending: PendingMap = Arc::new(parking_lot::Mutex::new(HashMap::new()));
        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(read_replies(stdout, pending.clone(), ready_tx));

        let started = match tokio::time::timeout(config.launch_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(fatal))) => Err(E2eError::Playwright(fatal)),
            Ok(Err(_)) => Err(E2eError::BridgeClosed),
            Err(_) => Err(E2eError::Timeout(format!(
                "Playwright bridge to start ({:?})",
                config.launch_timeout
            ))),
        };
        if let Err(e) = started {
            let _ = child.start_kill();
            return Err(e);
        }

        Ok(Arc::new(Self {
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            child: parking_lot::Mutex::new(child),
            config,
            _workdir: workdir,
        }))
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed(project_dir: &Path) -> E2eResult<()> {
        let output = TokioCommand::new("npx")
            .args(["playwright", "--version"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Open a page in a fresh browser context
    pub async fn new_page(self: &Arc<Self>) -> E2eResult<PlaywrightPage> {
        let result = self.request(None, "new_page", json!({})).await?;
        let id = result
            .get("page")
            .and_then(Value::as_u64)
            .ok_or_else(|| E2eError::Playwright(format!("bad new_page reply: {}", result)))?;
        debug!("Opened page {}", id);
        Ok(PlaywrightPage {
            bridge: Arc::clone(self),
            id,
            closed: false,
        })
    }

    async fn request(&self, page: Option<u64>, cmd: &str, args: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let mut line = serde_json::to_string(&Request {
            id,
            page,
            cmd,
            args,
        })?;
        line.push('\n');

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().remove(&id);
            return Err(e.into());
        }

        let reply = rx.await.map_err(|_| E2eError::BridgeClosed)?;
        if reply.ok {
            Ok(reply.result)
        } else {
            let message = reply.error.unwrap_or_else(|| "unknown bridge error".to_string());
            if reply.timeout {
                Err(E2eError::Timeout(message))
            } else {
                Err(E2eError::Playwright(format!("{}: {}", cmd, message)))
            }
        }
    }

    /// Ask the bridge to close the browser and exit
    pub async fn shutdown(&self) -> E2eResult<()> {
        match self.request(None, "shutdown", json!({})).await {
            Ok(_) | Err(E2eError::BridgeClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

async fn read_replies(
    stdout: tokio::process::ChildStdout,
    pending: PendingMap,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let mut ready = Some(ready);
    let mut lines = BufReader::new(stdout).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        match serde_json::from_str::<Message>(&line) {
            Ok(Message::Reply(reply)) => {
                // The waiter may have lost a race and gone away
                if let Some(tx) = pending.lock().remove(&reply.id) {
                    let _ = tx.send(reply);
                }
            }
            Ok(Message::Event(event)) => match event.event.as_str() {
                "ready" => {
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    }
                }
                "fatal" => {
                    let text = event.text.unwrap_or_default();
                    warn!("Playwright bridge failed: {}", text);
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(text));
                    }
                }
                "console" | "pageerror" => {
                    warn!(
                        "PAGE ERROR [page {}]: {}",
                        event.page.unwrap_or_default(),
                        event.text.unwrap_or_default()
                    );
                }
                other => debug!("bridge event {}: {:?}", other, event.text),
            },
            Err(_) => debug!("bridge: {}", line),
        }
    }

    debug!("Playwright bridge closed its output");
    pending.lock().clear();
}

impl Drop for PlaywrightBridge {
    fn drop(&mut self) {
        terminate(&mut self.child.lock());
    }
}

/// Stop the bridge process if it is still running.
///
/// Playwright closes its browsers on SIGTERM; SIGKILL only when the signal
/// cannot be delivered.
fn terminate(child: &mut Child) {
    if matches!(child.try_wait(), Ok(Some(_))) {
        return;
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                debug!("Sent SIGTERM to Playwright bridge (pid {})", pid);
                return;
            }
        }
    }

    let _ = child.start_kill();
}

/// A page in its own browser context, driven through the bridge
pub struct PlaywrightPage {
    bridge: Arc<PlaywrightBridge>,
    id: u64,
    closed: bool,
}

impl PlaywrightPage {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Close the page and discard its context (cookies, storage)
    pub async fn close(mut self) -> E2eResult<()> {
        self.closed = true;
        self.call("close_page", json!({})).await.map(|_| ())
    }

    async fn call(&self, cmd: &str, args: Value) -> E2eResult<Value> {
        self.bridge.request(Some(self.id), cmd, args).await
    }

    async fn call_unit(&self, cmd: &str, args: Value) -> E2eResult<()> {
        self.call(cmd, args).await.map(|_| ())
    }
}

impl Drop for PlaywrightPage {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let bridge = Arc::clone(&self.bridge);
            let id = self.id;
            handle.spawn(async move {
                let _ = bridge.request(Some(id), "close_page", json!({})).await;
            });
        }
    }
}

fn optional_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn add_init_script(&self, script: &str) -> E2eResult<()> {
        self.call_unit("add_init_script", json!({ "script": script })).await
    }

    async fn add_cookies(&self, cookies: &[Cookie]) -> E2eResult<()> {
        self.call_unit("add_cookies", json!({ "cookies": cookies })).await
    }

    async fn goto(&self, path: &str) -> E2eResult<()> {
        debug!("[page {}] goto {}", self.id, path);
        self.call_unit("goto", json!({ "path": path })).await
    }

    async fn url(&self) -> E2eResult<String> {
        let value = self.call("url", json!({})).await?;
        optional_string(value)
            .ok_or_else(|| E2eError::Playwright("url reply was not a string".to_string()))
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.call_unit("fill", json!({ "locator": locator, "value": value })).await
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        debug!("[page {}] click {}", self.id, locator);
        self.call_unit("click", json!({ "locator": locator })).await
    }

    async fn focus(&self, locator: &Locator) -> E2eResult<()> {
        self.call_unit("focus", json!({ "locator": locator })).await
    }

    async fn type_text(&self, locator: &Locator, text: &str, delay: Duration) -> E2eResult<()> {
        self.call_unit(
            "type",
            json!({ "locator": locator, "text": text, "delayMs": delay.as_millis() as u64 }),
        )
        .await
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.call_unit("select_option", json!({ "locator": locator, "value": value }))
            .await
    }

    async fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()> {
        let args = json!({
            "locator": locator,
            "state": state,
            "timeoutMs": timeout.as_millis() as u64,
        });

        let described = || E2eError::Timeout(format!("{} to be {:?}", locator, state));
        match tokio::time::timeout(timeout + BRIDGE_GRACE, self.call_unit("wait_for", args)).await {
            Ok(Err(e)) if e.is_timeout() => Err(described()),
            Ok(result) => result,
            Err(_) => Err(described()),
        }
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let value = self.call("is_visible", json!({ "locator": locator })).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let value = self.call("text_content", json!({ "locator": locator })).await?;
        Ok(optional_string(value))
    }

    async fn inner_html(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let value = self.call("inner_html", json!({ "locator": locator })).await?;
        Ok(optional_string(value))
    }

    async fn local_storage_item(&self, key: &str) -> E2eResult<Option<String>> {
        let value = self.call("local_storage_item", json!({ "key": key })).await?;
        Ok(optional_string(value))
    }

    async fn click_expecting_dialog(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> E2eResult<Option<String>> {
        let value = self
            .call(
                "click_expecting_dialog",
                json!({ "locator": locator, "timeoutMs": timeout.as_millis() as u64 }),
            )
            .await?;
        Ok(optional_string(value))
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.call_unit("screenshot", json!({ "path": path })).await
    }
}
