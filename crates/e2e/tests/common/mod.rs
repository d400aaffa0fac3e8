//! Scripted in-memory page for driving flows without a browser.
//!
//! Elements are identified by `Locator::describe()`. State changes are either
//! scheduled at a fixed offset from page creation or attached to an action
//! (`click`, `fill`, `type`, `select`, `goto`) and applied after a delay.
//! Everything runs on tokio's clock, so tests use paused time.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use pos_e2e::{Cookie, E2eError, E2eResult, Locator, Page, WaitState};

pub const BASE_URL: &str = "http://localhost:5173";

const TICK: Duration = Duration::from_millis(10);

/// A change to the fake page's state
#[derive(Debug, Clone)]
pub enum Change {
    Url(String),
    Show(String),
    Hide(String),
    Text(String, String),
    Html(String, String),
    Storage(String, String),
    /// The browser goes away; later calls fail with `BridgeClosed`
    Close,
}

impl Change {
    pub fn url(path: &str) -> Self {
        Change::Url(format!("{}{}", BASE_URL, path))
    }

    pub fn show(locator: &Locator) -> Self {
        Change::Show(locator.describe())
    }

    pub fn hide(locator: &Locator) -> Self {
        Change::Hide(locator.describe())
    }

    pub fn text(locator: &Locator, text: &str) -> Self {
        Change::Text(locator.describe(), text.to_string())
    }

    pub fn storage(key: &str, value: &str) -> Self {
        Change::Storage(key.to_string(), value.to_string())
    }

    pub fn close() -> Self {
        Change::Close
    }
}

/// One recorded interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: String,
    pub target: String,
    pub value: Option<String>,
}

struct Hook {
    key: String,
    occurrence: Option<usize>,
    after: Duration,
    changes: Vec<Change>,
}

struct State {
    url: String,
    visible: HashSet<String>,
    text: HashMap<String, String>,
    html: HashMap<String, String>,
    storage: HashMap<String, String>,
    dialogs: HashMap<String, String>,
    scheduled: Vec<(Instant, Change)>,
    hooks: Vec<Hook>,
    counts: HashMap<String, usize>,
    log: Vec<Action>,
    init_scripts: Vec<String>,
    cookies: Vec<Cookie>,
    screenshots: Vec<PathBuf>,
    closed: bool,
}

pub struct FakePage {
    created: Instant,
    state: Mutex<State>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            state: Mutex::new(State {
                url: "about:blank".to_string(),
                visible: HashSet::new(),
                text: HashMap::new(),
                html: HashMap::new(),
                storage: HashMap::new(),
                dialogs: HashMap::new(),
                scheduled: Vec::new(),
                hooks: Vec::new(),
                counts: HashMap::new(),
                log: Vec::new(),
                init_scripts: Vec::new(),
                cookies: Vec::new(),
                screenshots: Vec::new(),
                closed: false,
            }),
        }
    }

    // --- scripting ---

    pub fn show(&self, locator: &Locator) -> &Self {
        self.state.lock().visible.insert(locator.describe());
        self
    }

    pub fn set_text(&self, locator: &Locator, text: &str) -> &Self {
        self.state.lock().text.insert(locator.describe(), text.to_string());
        self
    }

    pub fn set_html(&self, locator: &Locator, html: &str) -> &Self {
        self.state.lock().html.insert(locator.describe(), html.to_string());
        self
    }

    pub fn set_storage(&self, key: &str, value: &str) -> &Self {
        self.state.lock().storage.insert(key.to_string(), value.to_string());
        self
    }

    /// Clicking `locator` through `click_expecting_dialog` opens a native
    /// dialog with `message`
    pub fn dialog_on(&self, locator: &Locator, message: &str) -> &Self {
        self.state
            .lock()
            .dialogs
            .insert(locator.describe(), message.to_string());
        self
    }

    /// Apply `changes` at `at` after page creation
    pub fn schedule(&self, at: Duration, changes: Vec<Change>) -> &Self {
        let when = self.created + at;
        let mut state = self.state.lock();
        for change in changes {
            state.scheduled.push((when, change));
        }
        self
    }

    /// Apply `changes` `after` every `kind` action on `target`
    pub fn on(&self, kind: &str, target: &str, after: Duration, changes: Vec<Change>) -> &Self {
        self.add_hook(kind, target, None, after, changes)
    }

    /// Like `on`, but only for the `occurrence`-th such action (1-based)
    pub fn on_nth(
        &self,
        kind: &str,
        target: &str,
        occurrence: usize,
        after: Duration,
        changes: Vec<Change>,
    ) -> &Self {
        self.add_hook(kind, target, Some(occurrence), after, changes)
    }

    fn add_hook(
        &self,
        kind: &str,
        target: &str,
        occurrence: Option<usize>,
        after: Duration,
        changes: Vec<Change>,
    ) -> &Self {
        self.state.lock().hooks.push(Hook {
            key: format!("{} {}", kind, target),
            occurrence,
            after,
            changes,
        });
        self
    }

    // --- inspection ---

    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().log.clone()
    }

    /// Number of `kind` actions on `target`
    pub fn count(&self, kind: &str, target: &str) -> usize {
        self.state
            .lock()
            .counts
            .get(&format!("{} {}", kind, target))
            .copied()
            .unwrap_or(0)
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.state.lock().log.iter().filter(|a| a.kind == kind).count()
    }

    pub fn filled(&self, locator: &Locator) -> Option<String> {
        let target = locator.describe();
        self.state
            .lock()
            .log
            .iter()
            .rev()
            .find(|a| (a.kind == "fill" || a.kind == "type") && a.target == target)
            .and_then(|a| a.value.clone())
    }

    pub fn init_scripts(&self) -> Vec<String> {
        self.state.lock().init_scripts.clone()
    }

    pub fn cookies(&self) -> Vec<Cookie> {
        self.state.lock().cookies.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().screenshots.clone()
    }

    pub fn current_url(&self) -> String {
        self.state.lock().url.clone()
    }

    // --- internals ---

    fn apply_due(state: &mut State) {
        let now = Instant::now();
        let mut due: Vec<(Instant, Change)> = Vec::new();
        state.scheduled.retain(|(when, change)| {
            if *when <= now {
                due.push((*when, change.clone()));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(when, _)| *when);
        for (_, change) in due {
            match change {
                Change::Url(url) => state.url = url,
                Change::Show(target) => {
                    state.visible.insert(target);
                }
                Change::Hide(target) => {
                    state.visible.remove(&target);
                }
                Change::Text(target, text) => {
                    state.text.insert(target, text);
                }
                Change::Html(target, html) => {
                    state.html.insert(target, html);
                }
                Change::Storage(key, value) => {
                    state.storage.insert(key, value);
                }
                Change::Close => state.closed = true,
            }
        }
    }

    fn record(&self, kind: &str, target: String, value: Option<String>) {
        let mut state = self.state.lock();
        let key = format!("{} {}", kind, target);
        let count = {
            let count = state.counts.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let now = Instant::now();
        let mut fired = Vec::new();
        for hook in &state.hooks {
            if hook.key == key && hook.occurrence.map_or(true, |n| n == count) {
                for change in &hook.changes {
                    fired.push((now + hook.after, change.clone()));
                }
            }
        }
        state.scheduled.extend(fired);
        state.log.push(Action {
            kind: kind.to_string(),
            target,
            value,
        });
        Self::apply_due(&mut state);
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        let mut state = self.state.lock();
        Self::apply_due(&mut state);
        f(&state)
    }
}

#[async_trait]
impl Page for FakePage {
    async fn add_init_script(&self, script: &str) -> E2eResult<()> {
        self.state.lock().init_scripts.push(script.to_string());
        Ok(())
    }

    async fn add_cookies(&self, cookies: &[Cookie]) -> E2eResult<()> {
        self.state.lock().cookies.extend_from_slice(cookies);
        Ok(())
    }

    async fn goto(&self, path: &str) -> E2eResult<()> {
        self.state.lock().url = format!("{}{}", BASE_URL, path);
        self.record("goto", path.to_string(), None);
        Ok(())
    }

    async fn url(&self) -> E2eResult<String> {
        let (closed, url) = self.read(|s| (s.closed, s.url.clone()));
        if closed {
            return Err(E2eError::BridgeClosed);
        }
        Ok(url)
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.record("fill", locator.describe(), Some(value.to_string()));
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.record("click", locator.describe(), None);
        Ok(())
    }

    async fn focus(&self, locator: &Locator) -> E2eResult<()> {
        self.record("focus", locator.describe(), None);
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str, delay: Duration) -> E2eResult<()> {
        tokio::time::sleep(delay * text.chars().count() as u32).await;
        self.record("type", locator.describe(), Some(text.to_string()));
        Ok(())
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.record("select", locator.describe(), Some(value.to_string()));
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()> {
        let target = locator.describe();
        let deadline = Instant::now() + timeout;
        loop {
            let present = self.read(|s| s.visible.contains(&target));
            let reached = match state {
                WaitState::Visible | WaitState::Attached => present,
                WaitState::Hidden | WaitState::Detached => !present,
            };
            if reached {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(E2eError::Timeout(format!("{} to be {:?}", target, state)));
            }
            tokio::time::sleep(TICK).await;
        }
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let target = locator.describe();
        Ok(self.read(|s| s.visible.contains(&target)))
    }

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let target = locator.describe();
        Ok(self.read(|s| {
            s.text
                .get(&target)
                .cloned()
                .or_else(|| s.visible.contains(&target).then(String::new))
        }))
    }

    async fn inner_html(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let target = locator.describe();
        Ok(self.read(|s| s.html.get(&target).cloned()))
    }

    async fn local_storage_item(&self, key: &str) -> E2eResult<Option<String>> {
        Ok(self.read(|s| s.storage.get(key).cloned()))
    }

    async fn click_expecting_dialog(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> E2eResult<Option<String>> {
        let target = locator.describe();
        self.record("click", target.clone(), None);
        let dialog = self.state.lock().dialogs.get(&target).cloned();
        match dialog {
            Some(message) => {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(Some(message))
            }
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        std::fs::write(path, b"")?;
        self.state.lock().screenshots.push(path.to_path_buf());
        Ok(())
    }
}

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
