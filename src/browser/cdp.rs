use crate::browser::launcher::{allocate_cdp_port, build_command, find_chrome};
use crate::browser::{BrowserSession, ElementRef, Locator, LocatorStrategy};
use crate::config::schema::BrowserSettings;
use crate::error::{AutomationError, Result};
use crate::wait::{poll_until, WaitConfig};
use async_trait::async_trait;
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

type Pending = Arc<Mutex<HashMap<u32, tokio::sync::oneshot::Sender<Value>>>>;

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

/// Marker carried by script errors raised for detached or replaced elements.
const STALE_MARKER: &str = "stale element reference";

/// Window properties holding the per-document element registry.
const REGISTRY: &str = "__e2eRefs";
const DOCUMENT_TOKEN: &str = "__e2eDoc";
const NAV_MARKER: &str = "__e2eNavPending";

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_RETRIES: u32 = 30;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Deserialize)]
struct TargetInfo {
    id: String,
    #[serde(rename = "type")]
    target_type: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    ws_url: Option<String>,
}

/// CDP client over a raw page-target WebSocket.
pub struct CDPClient {
    ws_tx: Mutex<Option<Arc<Mutex<WsSink>>>>,
    responses: Pending,
    connected: Arc<AtomicBool>,
    /// Bumped per socket; only the newest reader may mark the client closed
    generation: Arc<AtomicU64>,
    msg_id: AtomicU32,
    /// DevTools HTTP endpoint, e.g. "http://127.0.0.1:9322"
    http_endpoint: String,
    http: reqwest::Client,
    active_target: Mutex<String>,
    /// Page targets in the order they were first seen
    known_targets: Mutex<Vec<String>>,
    page_load_timeout: Duration,
    /// Chrome process, when this client launched it
    chrome: std::sync::Mutex<Option<Child>>,
    user_data_dir: Option<PathBuf>,
}

impl CDPClient {
    fn new(
        http_endpoint: String,
        settings: &BrowserSettings,
        chrome: Option<Child>,
        user_data_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            ws_tx: Mutex::new(None),
            responses: Arc::new(Mutex::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            msg_id: AtomicU32::new(1),
            http_endpoint: http_endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            active_target: Mutex::new(String::new()),
            known_targets: Mutex::new(Vec::new()),
            page_load_timeout: settings.page_load_timeout(),
            chrome: std::sync::Mutex::new(chrome),
            user_data_dir,
        }
    }

    /// Launch a local Chrome with remote debugging enabled and attach to its
    /// first page.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let chrome_path = find_chrome(settings.chrome_path.as_deref()).ok_or_else(|| {
            AutomationError::Browser(
                "Chrome executable not found. Set browser.chrome_path or CHROME_PATH".to_string(),
            )
        })?;

        let cdp_port = allocate_cdp_port();
        let user_data_dir =
            std::env::temp_dir().join(format!("storefront-e2e-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&user_data_dir)?;

        let child = build_command(&chrome_path, settings, cdp_port, &user_data_dir)
            .spawn()
            .map_err(|e| AutomationError::Browser(format!("Failed to launch Chrome: {}", e)))?;

        tracing::info!(
            "Launched Chrome pid={} port={} headless={}",
            child.id(),
            cdp_port,
            settings.headless
        );

        let client = Self::new(
            format!("http://127.0.0.1:{}", cdp_port),
            settings,
            Some(child),
            Some(user_data_dir),
        );
        client.connect_first_page().await?;
        Ok(client)
    }

    /// Attach to an already running browser through its DevTools HTTP endpoint.
    pub async fn attach(endpoint: &str, settings: &BrowserSettings) -> Result<Self> {
        let client = Self::new(endpoint.to_string(), settings, None, None);
        client.connect_first_page().await?;
        tracing::info!("Attached to remote browser at {}", endpoint);
        Ok(client)
    }

    /// Launch or attach, depending on `browser.remote_endpoint`.
    pub async fn from_settings(settings: &BrowserSettings) -> Result<Self> {
        if settings.remote_endpoint.is_empty() {
            Self::launch(settings).await
        } else {
            Self::attach(&settings.remote_endpoint, settings).await
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn list_page_targets(&self) -> Result<Vec<TargetInfo>> {
        let url = format!("{}/json/list", self.http_endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AutomationError::Browser(format!("Connection error: {}", e)))?;

        if !response.status().is_success() {
            return Err(AutomationError::Browser(format!(
                "HTTP error listing targets: {}",
                response.status()
            )));
        }

        let targets: Vec<TargetInfo> = response.json().await.map_err(|e| {
            AutomationError::Browser(format!("Failed to parse targets response: {}", e))
        })?;

        Ok(targets
            .into_iter()
            .filter(|t| t.target_type == "page")
            .collect())
    }

    async fn connect_first_page(&self) -> Result<()> {
        let mut last_error = String::new();

        for attempt in 1..=CONNECT_RETRIES {
            match self.list_page_targets().await {
                Ok(targets) => match targets.first() {
                    Some(target) => return self.connect_target(target).await,
                    None => last_error = "No page target found".to_string(),
                },
                Err(e) => last_error = e.to_string(),
            }

            tracing::debug!("Retry {}/{}: {}", attempt, CONNECT_RETRIES, last_error);
            tokio::time::sleep(CONNECT_RETRY_DELAY).await;
        }

        Err(AutomationError::Browser(format!(
            "Failed to connect to Chrome after {} retries: {}",
            CONNECT_RETRIES, last_error
        )))
    }

    async fn connect_target(&self, target: &TargetInfo) -> Result<()> {
        let ws_url = target.ws_url.as_deref().ok_or_else(|| {
            AutomationError::Browser(format!("No webSocketDebuggerUrl for target {}", target.id))
        })?;

        tracing::debug!("Connecting to page target WebSocket: {}", ws_url);

        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| AutomationError::Browser(format!("Failed to connect WebSocket: {}", e)))?;
        let (tx, rx) = StreamExt::split(ws_stream);

        // Retire the previous reader before its socket closes
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(old) = self.ws_tx.lock().await.replace(Arc::new(Mutex::new(tx))) {
            let _ = old.lock().await.close().await;
        }
        self.connected.store(true, Ordering::SeqCst);
        tokio::spawn(route_responses(
            rx,
            self.responses.clone(),
            self.connected.clone(),
            self.generation.clone(),
            generation,
        ));

        *self.active_target.lock().await = target.id.clone();
        {
            let mut known = self.known_targets.lock().await;
            if !known.contains(&target.id) {
                known.push(target.id.clone());
            }
        }

        self.send_command("Page.enable", json!({})).await?;
        self.send_command("Runtime.enable", json!({})).await?;
        tracing::info!("CDP connected to target {} ({})", target.id, target.url);
        Ok(())
    }

    /// Send a CDP command and wait for its `result` object.
    async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        if !self.is_connected() {
            return Err(AutomationError::Browser("WebSocket not connected".to_string()));
        }
        let tx = self
            .ws_tx
            .lock()
            .await
            .clone()
            .ok_or_else(|| AutomationError::Browser("WebSocket not connected".to_string()))?;

        let id = self.msg_id.fetch_add(1, Ordering::SeqCst);
        let (resp_tx, resp_rx) = tokio::sync::oneshot::channel();
        self.responses.lock().await.insert(id, resp_tx);

        let command = json!({
            "id": id,
            "method": method,
            "params": params
        });

        let sent = tx
            .lock()
            .await
            .send(WsMessage::Text(command.to_string()))
            .await;
        if let Err(e) = sent {
            self.responses.lock().await.remove(&id);
            return Err(AutomationError::Browser(format!(
                "Failed to send {}: {}",
                method, e
            )));
        }

        let response = match tokio::time::timeout(COMMAND_TIMEOUT, resp_rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(AutomationError::Browser("WebSocket closed".to_string())),
            Err(_) => {
                self.responses.lock().await.remove(&id);
                return Err(AutomationError::Browser(format!(
                    "Command timeout: {}",
                    method
                )));
            }
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(AutomationError::Browser(format!("{} failed: {}", method, message)));
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Evaluate an expression in the active page and return it by value.
    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let sent = self
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true
                }),
            )
            .await;
        let result = match sent {
            Ok(result) => result,
            Err(AutomationError::Browser(message)) if is_context_lost(&message) => {
                return Err(AutomationError::StaleElement(format!(
                    "{}: {}",
                    STALE_MARKER, message
                )))
            }
            Err(e) => return Err(e),
        };

        if let Some(details) = result.get("exceptionDetails") {
            let description = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .or_else(|| details.get("text").and_then(|t| t.as_str()))
                .unwrap_or("script threw")
                .to_string();

            if description.contains(STALE_MARKER) {
                return Err(AutomationError::StaleElement(description));
            }
            return Err(AutomationError::Browser(format!("Script error: {}", description)));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Run `body` with `el` bound to the element behind `element`.
    async fn on_element(&self, element: &ElementRef, body: &str) -> Result<Value> {
        self.evaluate(&element_script(element, body)).await
    }

    /// Close the socket, then stop the browser this client launched.
    pub async fn close(&self) -> Result<()> {
        if let Some(tx) = self.ws_tx.lock().await.take() {
            let _ = tx.lock().await.close().await;
        }
        self.connected.store(false, Ordering::SeqCst);

        self.kill_chrome();

        if let Some(dir) = &self.user_data_dir {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }

        tracing::info!("CDP client closed ({})", self.http_endpoint);
        Ok(())
    }

    fn kill_chrome(&self) {
        if let Ok(mut guard) = self.chrome.lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

impl Drop for CDPClient {
    fn drop(&mut self) {
        // Ensure Chrome is killed when the client is dropped without close()
        self.kill_chrome();
    }
}

#[async_trait]
impl BrowserSession for CDPClient {
    async fn navigate(&self, url: &str) -> Result<()> {
        // Set on the outgoing document; absent once the new one is live.
        let _ = self.evaluate(&format!("window.{} = true", NAV_MARKER)).await;

        let result = self
            .send_command("Page.navigate", json!({ "url": url }))
            .await?;

        if let Some(error) = result
            .get("errorText")
            .and_then(|e| e.as_str())
            .filter(|e| !e.is_empty())
        {
            return Err(AutomationError::Browser(format!(
                "Navigation to {} failed: {}",
                url, error
            )));
        }

        // Same-document navigations carry no loader id
        let new_document = result.get("loaderId").is_some();
        let probe = if new_document {
            format!(
                "document.readyState === 'complete' && !window.{}",
                NAV_MARKER
            )
        } else {
            "document.readyState === 'complete'".to_string()
        };

        let config = WaitConfig::new(self.page_load_timeout, Duration::from_millis(100));
        let deadline = Instant::now() + self.page_load_timeout;
        let this = self;
        let probe = probe.as_str();
        poll_until(config, "document ready", || async move {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, this.evaluate(probe)).await {
                Ok(outcome) => document_ready(outcome),
                // Out of time; the next tick reports the timeout
                Err(_) => Ok(None),
            }
        })
        .await
        .map_err(|e| match e {
            AutomationError::WaitTimeout { timeout, .. } => AutomationError::PageLoadTimeout {
                url: url.to_string(),
                timeout,
            },
            other => other,
        })?;

        tracing::info!("Navigated to: {}", url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self
            .evaluate("window.location.href")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn title(&self) -> Result<String> {
        Ok(self
            .evaluate("document.title")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self
            .evaluate("document.documentElement ? document.documentElement.outerHTML : ''")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.evaluate(script).await
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let value = self.evaluate(&find_script(locator)).await?;

        let document = value
            .get("doc")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string();
        let refs = value
            .get("ids")
            .and_then(|ids| ids.as_array())
            .map(|ids| {
                ids.iter()
                    .filter_map(|i| i.as_u64())
                    .map(|index| ElementRef {
                        document: document.clone(),
                        index: index as u32,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(refs)
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String> {
        let value = self
            .on_element(
                element,
                "return (el.innerText !== undefined ? el.innerText : el.textContent) || '';",
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    async fn element_attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let name = js_string(name);
        let value = self
            .on_element(
                element,
                &format!(
                    "const p = el[{name}];
                     if (p !== undefined && p !== null && typeof p !== 'object' && typeof p !== 'function') return String(p);
                     return el.getAttribute({name});"
                ),
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn element_displayed(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .on_element(
                element,
                "const r = el.getBoundingClientRect();
                 const s = window.getComputedStyle(el);
                 return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';",
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        let point = self
            .on_element(
                element,
                "el.scrollIntoView({block: 'center', inline: 'center'});
                 const r = el.getBoundingClientRect();
                 if (r.width === 0 && r.height === 0) throw new Error('element not interactable');
                 return {x: r.left + r.width / 2, y: r.top + r.height / 2};",
            )
            .await?;

        let x = point.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let y = point.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0);

        self.send_command(
            "Input.dispatchMouseEvent",
            json!({ "type": "mouseMoved", "x": x, "y": y }),
        )
        .await?;
        for event in ["mousePressed", "mouseReleased"] {
            self.send_command(
                "Input.dispatchMouseEvent",
                json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1
                }),
            )
            .await?;
        }

        tracing::debug!("Clicked element #{} at ({:.0}, {:.0})", element.index, x, y);
        Ok(())
    }

    async fn focus(&self, element: &ElementRef) -> Result<()> {
        self.on_element(element, "el.focus(); return true;").await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.on_element(
            element,
            "el.focus();
             if ('value' in el) {
                 el.value = '';
                 el.dispatchEvent(new Event('input', {bubbles: true}));
             } else if (el.isContentEditable) {
                 el.textContent = '';
             }
             return true;",
        )
        .await?;

        self.send_command("Input.insertText", json!({ "text": text }))
            .await?;

        tracing::debug!("Typed {} chars into element #{}", text.chars().count(), element.index);
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let (key_code, text) = match key {
            "Enter" => (13, Some("\r".to_string())),
            "Tab" => (9, None),
            "Escape" => (27, None),
            "Backspace" => (8, None),
            "ArrowUp" => (38, None),
            "ArrowDown" => (40, None),
            "ArrowLeft" => (37, None),
            "ArrowRight" => (39, None),
            _ => (
                key.chars().next().map(|c| c.to_ascii_uppercase() as i32).unwrap_or(0),
                Some(key.to_string()),
            ),
        };

        let mut down = json!({
            "type": "keyDown",
            "key": key,
            "code": key,
            "windowsVirtualKeyCode": key_code
        });
        if let Some(text) = text {
            down["text"] = Value::String(text);
        }
        self.send_command("Input.dispatchKeyEvent", down).await?;

        self.send_command(
            "Input.dispatchKeyEvent",
            json!({
                "type": "keyUp",
                "key": key,
                "code": key,
                "windowsVirtualKeyCode": key_code
            }),
        )
        .await?;

        tracing::debug!("Pressed key: {}", key);
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()> {
        self.on_element(
            element,
            "el.scrollIntoView({block: 'center', inline: 'nearest'}); return true;",
        )
        .await?;
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        let live: Vec<String> = self
            .list_page_targets()
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let mut known = self.known_targets.lock().await;
        known.retain(|id| live.contains(id));
        // /json/list reports the newest target first
        for id in live.iter().rev() {
            if !known.contains(id) {
                known.push(id.clone());
            }
        }
        Ok(known.clone())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        if *self.active_target.lock().await == handle && self.is_connected() {
            return Ok(());
        }

        let target = self
            .list_page_targets()
            .await?
            .into_iter()
            .find(|t| t.id == handle)
            .ok_or_else(|| AutomationError::Browser(format!("No such window: {}", handle)))?;

        let activate = format!("{}/json/activate/{}", self.http_endpoint, handle);
        if let Err(e) = self.http.get(&activate).send().await {
            tracing::debug!("Failed to activate target {}: {}", handle, e);
        }

        self.connect_target(&target).await?;
        tracing::info!("Switched to window {}", handle);
        Ok(())
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        let result = self
            .send_command("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;

        let data = result
            .get("data")
            .and_then(|d| d.as_str())
            .ok_or_else(|| AutomationError::Browser("Failed to capture screenshot".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| AutomationError::Browser(format!("Invalid screenshot data: {}", e)))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;

        tracing::debug!("Screenshot written to {:?}", path);
        Ok(())
    }
}

/// Route command responses from one socket to their waiting callers until
/// the socket ends. If this socket is still the client's newest, the client
/// is marked disconnected and pending commands fail at once.
async fn route_responses<St>(
    mut rx: St,
    responses: Pending,
    connected: Arc<AtomicBool>,
    current: Arc<AtomicU64>,
    generation: u64,
) where
    St: futures::Stream<Item = std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    while let Some(msg) = StreamExt::next(&mut rx).await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                if let Ok(json) = serde_json::from_str::<Value>(&text) {
                    if let Some(id) = json.get("id").and_then(|i| i.as_u64()) {
                        if let Some(sender) = responses.lock().await.remove(&(id as u32)) {
                            let _ = sender.send(json);
                        }
                    }
                }
            }
            Ok(WsMessage::Close(_)) => {
                tracing::debug!("WebSocket closed");
                break;
            }
            Err(e) => {
                tracing::debug!("WebSocket error: {:?}", e);
                break;
            }
            _ => {}
        }
    }

    if current.load(Ordering::SeqCst) == generation {
        connected.store(false, Ordering::SeqCst);
        // Dropping the senders wakes every waiter with "WebSocket closed"
        responses.lock().await.clear();
    }
}

/// One readiness probe: `Some` once the document is complete, `None` while
/// a navigation has the context torn down. Anything else is a real failure.
fn document_ready(outcome: Result<Value>) -> Result<Option<()>> {
    match outcome {
        Ok(value) => Ok((value == Value::Bool(true)).then_some(())),
        Err(AutomationError::StaleElement(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The page's JavaScript context went away, usually because a navigation
/// replaced the document while a command was in flight.
fn is_context_lost(message: &str) -> bool {
    [
        "Execution context was destroyed",
        "Cannot find context with specified id",
        "Cannot find default execution context",
        "Inspected target navigated or closed",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

/// Encode `s` as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn find_script(locator: &Locator) -> String {
    let query = match locator.strategy {
        LocatorStrategy::Css => format!(
            "found = Array.from(document.querySelectorAll({}));",
            js_string(&locator.value)
        ),
        LocatorStrategy::XPath => format!(
            "const snap = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
             for (let i = 0; i < snap.snapshotLength; i++) {{
                 const n = snap.snapshotItem(i);
                 if (n.nodeType === 1) found.push(n);
             }}",
            js_string(&locator.value)
        ),
    };

    format!(
        "(function() {{
            if (!window.{doc}) {{
                window.{doc} = Math.random().toString(36).slice(2) + Date.now().toString(36);
                window.{reg} = [];
            }}
            const reg = window.{reg};
            let found = [];
            {query}
            const ids = found.map(el => {{
                let i = reg.indexOf(el);
                if (i < 0) {{ reg.push(el); i = reg.length - 1; }}
                return i;
            }});
            return {{doc: window.{doc}, ids: ids}};
        }})()",
        doc = DOCUMENT_TOKEN,
        reg = REGISTRY,
        query = query
    )
}

fn element_script(element: &ElementRef, body: &str) -> String {
    format!(
        "(function() {{
            const reg = window.{reg};
            if (!reg || window.{doc} !== {token}) throw new Error('{stale}: document replaced');
            const el = reg[{index}];
            if (!el || !el.isConnected) throw new Error('{stale}: element detached');
            {body}
        }})()",
        reg = REGISTRY,
        doc = DOCUMENT_TOKEN,
        token = js_string(&element.document),
        stale = STALE_MARKER,
        index = element.index,
        body = body
    )
}
