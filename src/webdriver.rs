use std::marker::PhantomData;
use std::time::Duration;

use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thirtyfour::common::command::{Command, FormatRequestData, MAGIC_ELEMENTID};
use thirtyfour::common::types::{ElementId as WireElementId, WindowHandle};
use thirtyfour::{RequestMethod, SessionId, TypingData};
use urlencoding::encode;

use crate::by::By;
use crate::driver::{Cookie, Driver, ElementId, ElementRect, Frame, Gesture, SearchContext};
use crate::error::{PageError, PageResult};
use crate::http::connection_sync::{HttpClientCreateParams, WebDriverHttpClientSync};
use crate::http::reqwest_sync::ReqwestDriverSync;
use crate::session::WebDriverSession;

const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// A browser or Appium session on a remote WebDriver server, over `reqwest`.
pub type RemoteDriver = GenericRemoteDriver<ReqwestDriverSync>;

/// A [`Driver`] that talks the W3C WebDriver protocol to a remote server.
///
/// The struct is generic over the HTTP client so that another client can be plugged in.
/// Most users want the [`RemoteDriver`] alias.
///
/// # Example:
/// ```no_run
/// use thirtyfour_pages::prelude::*;
///
/// fn main() -> PageResult<()> {
///     let caps = serde_json::json!({ "browserName": "firefox" });
///     let driver = RemoteDriver::new("http://localhost:4444/wd/hub", &caps)?;
///     driver.quit()?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct GenericRemoteDriver<T: WebDriverHttpClientSync> {
    session: WebDriverSession,
    capabilities: Value,
    native_strategies: bool,
    quit_on_drop: bool,
    phantom: PhantomData<T>,
}

impl<T: 'static> GenericRemoteDriver<T>
where
    T: WebDriverHttpClientSync,
{
    /// Start a new session on the server at `server_url`.
    pub fn new<C>(server_url: &str, capabilities: &C) -> PageResult<Self>
    where
        C: Serialize,
    {
        Self::new_with_timeout(server_url, capabilities, None)
    }

    /// Like [`new`](Self::new), with a timeout for every HTTP request including the
    /// session creation.
    pub fn new_with_timeout<C>(
        server_url: &str,
        capabilities: &C,
        timeout: Option<Duration>,
    ) -> PageResult<Self>
    where
        C: Serialize,
    {
        let params = HttpClientCreateParams {
            server_url: server_url.to_string(),
            timeout,
        };
        let conn = T::create(params)?;
        Self::start(conn, capabilities)
    }

    /// Start a new session over an existing connection.
    pub fn start<C>(conn: T, capabilities: &C) -> PageResult<Self>
    where
        C: Serialize,
    {
        let requested = serde_json::to_value(capabilities)?;
        let request = Command::NewSession(requested.clone()).format_request(&SessionId::from(String::new()));
        let response = conn.execute(request)?;
        let (session_id, capabilities) = parse_new_session(response)?;
        debug!("started session {}", session_id);

        let native_strategies = is_appium(&capabilities) || is_appium(&requested);
        Ok(GenericRemoteDriver {
            session: WebDriverSession::new(session_id, Box::new(conn)),
            capabilities,
            native_strategies,
            quit_on_drop: true,
            phantom: PhantomData,
        })
    }

    /// The capabilities returned by the server.
    pub fn capabilities(&self) -> &Value {
        &self.capabilities
    }

    pub fn session_id(&self) -> &SessionId {
        self.session.session_id()
    }

    /// Whether every locator strategy is sent to the server untranslated.
    ///
    /// Turned on automatically for Android and iOS sessions. Browsers need `Id`, `Name`
    /// and `ClassName` rewritten as CSS selectors.
    pub fn native_strategies(&self) -> bool {
        self.native_strategies
    }

    pub fn set_native_strategies(&mut self, native: bool) {
        self.native_strategies = native;
    }

    /// Whether dropping the driver ends the session. Defaults to true.
    pub fn set_quit_on_drop(&mut self, quit: bool) {
        self.quit_on_drop = quit;
    }

    /// End the session.
    pub fn quit(mut self) -> PageResult<()> {
        self.session.execute(Command::DeleteSession)?;
        self.quit_on_drop = false;
        Ok(())
    }

    /// Set the request timeout for the HTTP client.
    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.session.set_request_timeout(timeout);
    }

    fn cmd(&self, command: Command) -> PageResult<Value> {
        let mut response = self.session.execute(command)?;
        Ok(response.get_mut("value").map(Value::take).unwrap_or(Value::Null))
    }

    fn cmd_as<V: DeserializeOwned>(&self, command: Command) -> PageResult<V> {
        Ok(serde_json::from_value(self.cmd(command)?)?)
    }
}

fn parse_new_session(mut response: Value) -> PageResult<(SessionId, Value)> {
    // W3C servers nest the id inside "value", legacy ones put it at the top level.
    let mut value = response.get_mut("value").map(Value::take).unwrap_or(Value::Null);
    let session_id = value
        .get("sessionId")
        .or_else(|| response.get("sessionId"))
        .and_then(Value::as_str)
        .map(|id| SessionId::from(id.to_string()))
        .ok_or_else(|| PageError::FatalDriver(String::from("no session id in new session response")))?;
    let capabilities = match value.get_mut("capabilities").map(Value::take) {
        Some(caps) => caps,
        None => value,
    };
    Ok((session_id, capabilities))
}

fn is_appium(capabilities: &Value) -> bool {
    let platform = capabilities
        .get("platformName")
        .or_else(|| capabilities.pointer("/alwaysMatch/platformName"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    platform.eq_ignore_ascii_case("android") || platform.eq_ignore_ascii_case("ios")
}

fn parse_element_ids(value: Value) -> PageResult<Vec<ElementId>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            return Err(PageError::InvalidResponse(format!("expected a list of elements, got {}", other)))
        }
    };
    items
        .iter()
        .map(|item| {
            item.get(MAGIC_ELEMENTID)
                .or_else(|| item.get(LEGACY_ELEMENT_KEY))
                .and_then(Value::as_str)
                .map(ElementId::from)
                .ok_or_else(|| PageError::InvalidResponse(format!("not an element reference: {}", item)))
        })
        .collect()
}

/// Attribute and property values come back as arbitrary JSON; null means unset.
fn optional_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn wire(element: &ElementId) -> WireElementId {
    WireElementId::from(element.as_str().to_string())
}

/// Names end up in the URL path.
fn path_segment(name: &str) -> String {
    encode(name).into_owned()
}

/// The W3C pointer action sequence for `gesture`.
fn pointer_actions(gesture: Gesture<'_>) -> Value {
    let move_to = |element: &ElementId| {
        json!({ "type": "pointerMove", "duration": 100, "origin": element.to_json(), "x": 0, "y": 0 })
    };
    let press = |button: u8| json!({ "type": "pointerDown", "button": button });
    let release = |button: u8| json!({ "type": "pointerUp", "button": button });

    let steps = match gesture {
        Gesture::MoveTo(element) => vec![move_to(element)],
        Gesture::DoubleClick(element) => {
            vec![move_to(element), press(0), release(0), press(0), release(0)]
        }
        Gesture::ContextClick(element) => vec![move_to(element), press(2), release(2)],
        Gesture::DragAndDrop {
            source,
            target,
        } => vec![move_to(source), press(0), move_to(target), release(0)],
    };
    json!({
        "actions": [{
            "type": "pointer",
            "id": "mouse",
            "parameters": { "pointerType": "mouse" },
            "actions": steps,
        }]
    })
}

impl<T: 'static> Driver for GenericRemoteDriver<T>
where
    T: WebDriverHttpClientSync,
{
    fn find_elements(
        &self,
        context: SearchContext<'_>,
        by: By,
        value: &str,
    ) -> PageResult<Vec<ElementId>> {
        let selector = by.to_selector(value, self.native_strategies);
        let command = match context {
            SearchContext::Root => Command::FindElements(selector),
            SearchContext::Element(id) => Command::FindElementsFromElement(wire(id), selector),
        };
        parse_element_ids(self.cmd(command)?)
    }

    fn is_displayed(&self, element: &ElementId) -> PageResult<bool> {
        self.cmd_as(Command::IsElementDisplayed(wire(element)))
    }

    fn is_enabled(&self, element: &ElementId) -> PageResult<bool> {
        self.cmd_as(Command::IsElementEnabled(wire(element)))
    }

    fn is_selected(&self, element: &ElementId) -> PageResult<bool> {
        self.cmd_as(Command::IsElementSelected(wire(element)))
    }

    fn tag_name(&self, element: &ElementId) -> PageResult<String> {
        self.cmd_as(Command::GetElementTagName(wire(element)))
    }

    fn text(&self, element: &ElementId) -> PageResult<String> {
        self.cmd_as(Command::GetElementText(wire(element)))
    }

    fn attribute(&self, element: &ElementId, name: &str) -> PageResult<Option<String>> {
        let command = Command::GetElementAttribute(wire(element), path_segment(name));
        Ok(optional_string(self.cmd(command)?))
    }

    fn property(&self, element: &ElementId, name: &str) -> PageResult<Option<String>> {
        let command = Command::GetElementProperty(wire(element), path_segment(name));
        Ok(optional_string(self.cmd(command)?))
    }

    fn css_value(&self, element: &ElementId, name: &str) -> PageResult<String> {
        self.cmd_as(Command::GetElementCssValue(wire(element), path_segment(name)))
    }

    fn rect(&self, element: &ElementId) -> PageResult<ElementRect> {
        self.cmd_as(Command::GetElementRect(wire(element)))
    }

    fn click(&self, element: &ElementId) -> PageResult<()> {
        self.cmd(Command::ElementClick(wire(element))).map(|_| ())
    }

    fn clear(&self, element: &ElementId) -> PageResult<()> {
        self.cmd(Command::ElementClear(wire(element))).map(|_| ())
    }

    fn send_keys(&self, element: &ElementId, text: &str) -> PageResult<()> {
        self.cmd(Command::ElementSendKeys(wire(element), TypingData::from(text))).map(|_| ())
    }

    fn navigate(&self, url: &str) -> PageResult<()> {
        self.cmd(Command::NavigateTo(url.to_string())).map(|_| ())
    }

    fn current_url(&self) -> PageResult<String> {
        self.cmd_as(Command::GetCurrentUrl)
    }

    fn title(&self) -> PageResult<String> {
        self.cmd_as(Command::GetTitle)
    }

    fn refresh(&self) -> PageResult<()> {
        self.cmd(Command::Refresh).map(|_| ())
    }

    fn back(&self) -> PageResult<()> {
        self.cmd(Command::Back).map(|_| ())
    }

    fn forward(&self) -> PageResult<()> {
        self.cmd(Command::Forward).map(|_| ())
    }

    fn screenshot_png(&self) -> PageResult<Vec<u8>> {
        let encoded: String = self.cmd_as(Command::TakeScreenshot)?;
        Ok(base64::decode(&encoded)?)
    }

    fn cookies(&self) -> PageResult<Vec<Cookie>> {
        self.cmd_as(Command::GetAllCookies)
    }

    fn add_cookie(&self, cookie: &Cookie) -> PageResult<()> {
        self.cmd(Command::AddCookie(cookie.clone())).map(|_| ())
    }

    fn delete_cookie(&self, name: &str) -> PageResult<()> {
        let name = path_segment(name);
        self.cmd(Command::DeleteCookie(name)).map(|_| ())
    }

    fn delete_all_cookies(&self) -> PageResult<()> {
        self.cmd(Command::DeleteAllCookies).map(|_| ())
    }

    fn execute_script(&self, script: &str, args: Vec<Value>) -> PageResult<Value> {
        self.cmd(Command::ExecuteScript(script.to_string(), args))
    }

    fn perform(&self, gesture: Gesture<'_>) -> PageResult<()> {
        debug!("performing {:?}", gesture);
        self.session.execute_raw(RequestMethod::Post, "actions", pointer_actions(gesture)).map(|_| ())
    }

    fn window_handle(&self) -> PageResult<String> {
        self.cmd_as(Command::GetWindowHandle)
    }

    fn window_handles(&self) -> PageResult<Vec<String>> {
        self.cmd_as(Command::GetWindowHandles)
    }

    fn switch_to_window(&self, handle: &str) -> PageResult<()> {
        self.cmd(Command::SwitchToWindow(WindowHandle::from(handle.to_string()))).map(|_| ())
    }

    fn close_window(&self) -> PageResult<()> {
        self.cmd(Command::CloseWindow).map(|_| ())
    }

    fn switch_to_frame(&self, frame: Frame<'_>) -> PageResult<()> {
        let command = match frame {
            Frame::Default => Command::SwitchToFrameDefault,
            Frame::Index(index) => Command::SwitchToFrameNumber(index),
            Frame::Element(element) => Command::SwitchToFrameElement(wire(element)),
            Frame::Parent => Command::SwitchToParentFrame,
        };
        self.cmd(command).map(|_| ())
    }

    fn alert_text(&self) -> PageResult<String> {
        self.cmd_as(Command::GetAlertText)
    }

    fn accept_alert(&self) -> PageResult<()> {
        self.cmd(Command::AcceptAlert).map(|_| ())
    }

    fn dismiss_alert(&self) -> PageResult<()> {
        self.cmd(Command::DismissAlert).map(|_| ())
    }

    fn send_alert_text(&self, text: &str) -> PageResult<()> {
        self.cmd(Command::SendAlertText(TypingData::from(text))).map(|_| ())
    }
}

impl<T> Drop for GenericRemoteDriver<T>
where
    T: WebDriverHttpClientSync,
{
    /// Close the current session when the driver goes out of scope.
    fn drop(&mut self) {
        if self.quit_on_drop && !self.session.session_id().is_empty() {
            if let Err(e) = self.session.execute(Command::DeleteSession) {
                error!("Failed to close session: {:?}", e);
            }
        }
    }
}
