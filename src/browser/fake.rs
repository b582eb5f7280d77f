//! Scripted in-memory [`BrowserSession`] for unit tests.

use crate::browser::{BrowserSession, ElementRef, Locator};
use crate::error::{AutomationError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum ClickEffect {
    Navigate(String),
    OpenWindow(String),
    Detach,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeElement {
    text: String,
    attributes: HashMap<String, String>,
    displayed: bool,
    on_click: Option<ClickEffect>,
}

impl FakeElement {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            attributes: HashMap::new(),
            displayed: true,
            on_click: None,
        }
    }

    pub(crate) fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub(crate) fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub(crate) fn navigates_to(mut self, url: &str) -> Self {
        self.on_click = Some(ClickEffect::Navigate(url.to_string()));
        self
    }

    pub(crate) fn opens_window(mut self, handle: &str) -> Self {
        self.on_click = Some(ClickEffect::OpenWindow(handle.to_string()));
        self
    }

    /// Clicking replaces the document, staling every handle.
    pub(crate) fn rerenders(mut self) -> Self {
        self.on_click = Some(ClickEffect::Detach);
        self
    }
}

#[derive(Default)]
struct State {
    urls: VecDeque<String>,
    ready_states: VecDeque<String>,
    title: String,
    registry: Vec<FakeElement>,
    by_locator: HashMap<String, Vec<usize>>,
    reveal_after: HashMap<String, u32>,
    generation: u32,
    windows: Vec<String>,
    pending_windows: Vec<(String, u32)>,
    active_window: String,
    stale_failures: HashMap<String, u32>,
    script_error: Option<String>,
    failing_screenshots: bool,
    calls: HashMap<String, u32>,
    clicked: Vec<String>,
    typed: Vec<(String, String)>,
    keys: Vec<String>,
    navigations: Vec<String>,
    scripts: Vec<String>,
    screenshots: Vec<PathBuf>,
}

impl State {
    fn record(&mut self, op: &str) -> u32 {
        let count = self.calls.entry(op.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn injected_stale(&mut self, op: &str) -> Result<()> {
        if let Some(left) = self.stale_failures.get_mut(op) {
            if *left > 0 {
                *left -= 1;
                return Err(AutomationError::StaleElement(format!(
                    "stale element reference: injected during {}",
                    op
                )));
            }
        }
        Ok(())
    }

    fn document(&self) -> String {
        format!("fake-doc-{}", self.generation)
    }

    fn element(&self, element: &ElementRef) -> Result<&FakeElement> {
        if element.document != self.document() {
            return Err(AutomationError::StaleElement(
                "stale element reference: document replaced".to_string(),
            ));
        }
        self.registry
            .get(element.index as usize)
            .ok_or_else(|| AutomationError::Browser(format!("no element #{}", element.index)))
    }

    /// Sequences yield their head until one value remains, which then sticks.
    fn next_of(seq: &mut VecDeque<String>) -> String {
        if seq.len() > 1 {
            seq.pop_front().unwrap_or_default()
        } else {
            seq.front().cloned().unwrap_or_default()
        }
    }

    fn set_url(&mut self, url: &str) {
        self.urls = VecDeque::from(vec![url.to_string()]);
    }
}

pub(crate) struct FakeSession {
    state: Mutex<State>,
}

impl FakeSession {
    pub(crate) fn new() -> Self {
        let state = State {
            urls: VecDeque::from(vec!["about:blank".to_string()]),
            ready_states: VecDeque::from(vec!["complete".to_string()]),
            windows: vec!["W1".to_string()],
            active_window: "W1".to_string(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn update(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub(crate) fn with_url(self, url: &str) -> Self {
        self.update(|s| s.set_url(url))
    }

    pub(crate) fn with_urls(self, urls: &[&str]) -> Self {
        self.update(|s| s.urls = urls.iter().map(|u| u.to_string()).collect())
    }

    pub(crate) fn with_title(self, title: &str) -> Self {
        self.update(|s| s.title = title.to_string())
    }

    pub(crate) fn with_ready_states(self, states: &[&str]) -> Self {
        self.update(|s| s.ready_states = states.iter().map(|r| r.to_string()).collect())
    }

    pub(crate) fn with_elements(self, locator: &Locator, elements: Vec<FakeElement>) -> Self {
        self.update(|s| {
            let start = s.registry.len();
            s.registry.extend(elements);
            let indices = (start..s.registry.len()).collect();
            s.by_locator.insert(locator.to_string(), indices);
        })
    }

    /// The first `polls` lookups of `locator` find nothing.
    pub(crate) fn reveal_after(self, locator: &Locator, polls: u32) -> Self {
        self.update(|s| {
            s.reveal_after.insert(locator.to_string(), polls);
        })
    }

    pub(crate) fn with_windows(self, handles: &[&str]) -> Self {
        self.update(|s| {
            s.windows = handles.iter().map(|h| h.to_string()).collect();
            s.active_window = s.windows.first().cloned().unwrap_or_default();
        })
    }

    /// `handle` shows up once `window_handles` has been called `polls` times.
    pub(crate) fn open_window_after(self, handle: &str, polls: u32) -> Self {
        self.update(|s| s.pending_windows.push((handle.to_string(), polls)))
    }

    /// The next `count` calls of `op` fail with a stale-element error.
    pub(crate) fn with_stale_failures(self, op: &str, count: u32) -> Self {
        self.update(|s| {
            s.stale_failures.insert(op.to_string(), count);
        })
    }

    pub(crate) fn with_script_error(self, message: &str) -> Self {
        self.update(|s| s.script_error = Some(message.to_string()))
    }

    pub(crate) fn failing_screenshots(self) -> Self {
        self.update(|s| s.failing_screenshots = true)
    }

    /// Replace the document; existing handles become stale.
    pub(crate) fn rerender(&self) {
        self.state.lock().unwrap().generation += 1;
    }

    pub(crate) fn calls(&self, op: &str) -> u32 {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub(crate) fn clicked(&self) -> Vec<String> {
        self.state.lock().unwrap().clicked.clone()
    }

    pub(crate) fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().keys.clone()
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub(crate) fn scripts(&self) -> Vec<String> {
        self.state.lock().unwrap().scripts.clone()
    }

    pub(crate) fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }

    pub(crate) fn active_window(&self) -> String {
        self.state.lock().unwrap().active_window.clone()
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.record("navigate");
        s.navigations.push(url.to_string());
        s.set_url(url);
        s.generation += 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let mut s = self.state.lock().unwrap();
        s.record("current_url");
        Ok(State::next_of(&mut s.urls))
    }

    async fn title(&self) -> Result<String> {
        let mut s = self.state.lock().unwrap();
        s.record("title");
        Ok(s.title.clone())
    }

    async fn page_source(&self) -> Result<String> {
        let mut s = self.state.lock().unwrap();
        s.record("page_source");
        let body: Vec<String> = s.registry.iter().map(|e| e.text.clone()).collect();
        Ok(format!("<html><body>{}</body></html>", body.join("")))
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        let mut s = self.state.lock().unwrap();
        s.record("execute_script");
        s.scripts.push(script.to_string());
        if let Some(message) = &s.script_error {
            return Err(AutomationError::Browser(message.clone()));
        }
        if script.contains("readyState") {
            return Ok(Value::String(State::next_of(&mut s.ready_states)));
        }
        Ok(Value::Null)
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let mut s = self.state.lock().unwrap();
        s.record("find_elements");
        s.injected_stale("find_elements")?;

        let key = locator.to_string();
        if let Some(left) = s.reveal_after.get_mut(&key) {
            if *left > 0 {
                *left -= 1;
                return Ok(Vec::new());
            }
        }

        let document = s.document();
        Ok(s.by_locator
            .get(&key)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| ElementRef {
                        document: document.clone(),
                        index: i as u32,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String> {
        let mut s = self.state.lock().unwrap();
        s.record("element_text");
        s.injected_stale("element_text")?;
        Ok(s.element(element)?.text.clone())
    }

    async fn element_attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let mut s = self.state.lock().unwrap();
        s.record("element_attribute");
        Ok(s.element(element)?.attributes.get(name).cloned())
    }

    async fn element_displayed(&self, element: &ElementRef) -> Result<bool> {
        let mut s = self.state.lock().unwrap();
        s.record("element_displayed");
        Ok(s.element(element)?.displayed)
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.record("click");
        s.injected_stale("click")?;
        let target = s.element(element)?.clone();
        s.clicked.push(target.text.clone());

        match target.on_click {
            Some(ClickEffect::Navigate(url)) => {
                s.set_url(&url);
                s.generation += 1;
            }
            Some(ClickEffect::OpenWindow(handle)) => s.windows.push(handle),
            Some(ClickEffect::Detach) => s.generation += 1,
            None => {}
        }
        Ok(())
    }

    async fn focus(&self, element: &ElementRef) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.record("focus");
        s.element(element)?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.record("type_text");
        let target = s.element(element)?.text.clone();
        s.typed.push((target, text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.record("press_key");
        s.keys.push(key.to_string());
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.record("scroll_into_view");
        s.element(element)?;
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        let mut s = self.state.lock().unwrap();
        let calls = s.record("window_handles");

        let (ready, waiting): (Vec<_>, Vec<_>) = s
            .pending_windows
            .drain(..)
            .partition(|(_, polls)| calls > *polls);
        s.pending_windows = waiting;
        s.windows.extend(ready.into_iter().map(|(handle, _)| handle));

        Ok(s.windows.clone())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.record("switch_to_window");
        if !s.windows.iter().any(|w| w == handle) {
            return Err(AutomationError::Browser(format!("No such window: {}", handle)));
        }
        s.active_window = handle.to_string();
        Ok(())
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.record("save_screenshot");
        if s.failing_screenshots {
            return Err(AutomationError::Browser("Failed to capture screenshot".to_string()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"\x89PNG\r\n\x1a\n")?;
        s.screenshots.push(path.to_path_buf());
        Ok(())
    }
}
