//! An in-memory [`Driver`] for unit-testing page objects without a browser.
//!
//! Elements are registered up front with [`MockDriver::add_element`] and wired to locators
//! with [`MockDriver::set_matches`]. Every per-element state is a script: values are consumed
//! one per query and the last one sticks, so "hidden twice, then shown" is
//! `MockElement::new().displayed_states(vec![false, false, true])`.
//!
//! ```
//! use std::sync::Arc;
//! use thirtyfour_pages::mock::{MockDriver, MockElement};
//! use thirtyfour_pages::prelude::*;
//!
//! const GREETING: Element = Element::new("greeting", By::Id, "greeting");
//!
//! let driver = Arc::new(MockDriver::new());
//! let id = driver.add_element(MockElement::new().texts(vec!["Hello"]));
//! driver.set_matches(By::Id, "greeting", vec![id]);
//!
//! let page = Page::new(driver.clone());
//! assert_eq!(GREETING.get(&page).unwrap().text().unwrap(), "Hello");
//! ```
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::by::By;
use crate::driver::{Cookie, Driver, ElementId, ElementRect, Frame, Gesture, SearchContext};
use crate::error::{PageError, PageResult};

/// What [`MockDriver::screenshot_png`](Driver::screenshot_png) returns: the PNG signature.
pub const MOCK_SCREENSHOT: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Values handed out one per query; the last one repeats forever.
#[derive(Debug, Clone)]
struct Script<T> {
    values: VecDeque<T>,
}

impl<T: Clone> Script<T> {
    fn one(value: T) -> Self {
        Script {
            values: VecDeque::from(vec![value]),
        }
    }

    /// `None` if `values` is empty, so callers can keep their current script.
    fn of<I: IntoIterator<Item = T>>(values: I) -> Option<Self> {
        let values: VecDeque<T> = values.into_iter().collect();
        if values.is_empty() {
            None
        } else {
            Some(Script {
                values,
            })
        }
    }

    fn next(&mut self) -> Option<T> {
        if self.values.len() > 1 {
            self.values.pop_front()
        } else {
            self.values.front().cloned()
        }
    }
}

/// Builder for a fake element.
///
/// Defaults: a displayed, enabled, unselected `<div>` with empty text.
#[derive(Debug, Clone)]
pub struct MockElement {
    tag: String,
    displayed: Script<bool>,
    enabled: Script<bool>,
    selected: Script<bool>,
    text: Script<String>,
    attributes: HashMap<String, String>,
    properties: HashMap<String, String>,
    css: HashMap<String, String>,
    rect: ElementRect,
}

impl Default for MockElement {
    fn default() -> Self {
        MockElement {
            tag: String::from("div"),
            displayed: Script::one(true),
            enabled: Script::one(true),
            selected: Script::one(false),
            text: Script::one(String::new()),
            attributes: HashMap::new(),
            properties: HashMap::new(),
            css: HashMap::new(),
            rect: ElementRect::default(),
        }
    }
}

impl MockElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn displayed(mut self, displayed: bool) -> Self {
        self.displayed = Script::one(displayed);
        self
    }

    pub fn displayed_states(mut self, states: Vec<bool>) -> Self {
        if let Some(script) = Script::of(states) {
            self.displayed = script;
        }
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Script::one(enabled);
        self
    }

    pub fn enabled_states(mut self, states: Vec<bool>) -> Self {
        if let Some(script) = Script::of(states) {
            self.enabled = script;
        }
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = Script::one(selected);
        self
    }

    /// Text values returned by successive `text` queries.
    pub fn texts<I>(mut self, texts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        if let Some(script) = Script::<String>::of(texts.into_iter().map(Into::into)) {
            self.text = script;
        }
        self
    }

    pub fn attribute<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn property<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn css<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.css.insert(name.into(), value.into());
        self
    }

    pub fn rect(mut self, rect: ElementRect) -> Self {
        self.rect = rect;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    parent: Option<ElementId>,
    by: By,
    value: String,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: usize,
    elements: HashMap<ElementId, MockElement>,
    stale: HashSet<ElementId>,
    matches: HashMap<MatchKey, Script<Vec<ElementId>>>,
    transient_errors: usize,
    ended: bool,
    find_count: usize,
    clicks: usize,
    typed: HashMap<ElementId, String>,
    history: Vec<String>,
    position: usize,
    visited: Vec<String>,
    title: String,
    cookies: Vec<Cookie>,
    scripts: Vec<String>,
    script_result: Value,
    gestures: Vec<String>,
    windows: Vec<String>,
    window: Option<String>,
    opened_windows: usize,
    frames: Vec<String>,
    alert: Option<String>,
}

impl MockState {
    /// Fails the call if the session ended or a transient error is pending.
    fn enter(&mut self) -> PageResult<()> {
        if self.ended {
            return Err(PageError::FatalDriver(String::from("session has ended")));
        }
        if self.transient_errors > 0 {
            self.transient_errors -= 1;
            return Err(PageError::StaleElement(String::from("injected transient failure")));
        }
        Ok(())
    }

    fn element(&mut self, id: &ElementId) -> PageResult<&mut MockElement> {
        if self.stale.contains(id) {
            return Err(PageError::StaleElement(format!("element {} is no longer attached", id)));
        }
        self.elements
            .get_mut(id)
            .ok_or_else(|| PageError::StaleElement(format!("unknown element {}", id)))
    }

    fn find(&mut self, key: &MatchKey) -> Vec<ElementId> {
        self.find_count += 1;
        let ids = self.matches.get_mut(key).and_then(Script::next).unwrap_or_default();
        ids.into_iter().filter(|id| !self.stale.contains(id)).collect()
    }

    fn current_url(&self) -> String {
        self.history.get(self.position).cloned().unwrap_or_else(|| String::from("about:blank"))
    }

    fn open_window(&mut self) -> String {
        self.opened_windows += 1;
        let handle = format!("window-{}", self.opened_windows);
        self.windows.push(handle.clone());
        handle
    }

    fn alert(&mut self) -> PageResult<&mut String> {
        self.alert.as_mut().ok_or_else(|| PageError::InvalidArgument(String::from("no such alert")))
    }
}

/// A scriptable in-memory [`Driver`].
///
/// Starts on a single window, `window-1`, with no alert open.
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        let mut state = MockState::default();
        let first = state.open_window();
        state.window = Some(first);
        MockDriver {
            state: Mutex::new(state),
        }
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_element<T, F>(&self, id: &ElementId, f: F) -> PageResult<T>
    where
        F: FnOnce(&mut MockElement) -> T,
    {
        let mut state = self.lock();
        state.enter()?;
        Ok(f(state.element(id)?))
    }

    /// Register an element and return its handle.
    pub fn add_element(&self, element: MockElement) -> ElementId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = ElementId::from(format!("mock-{}", state.next_id));
        state.elements.insert(id.clone(), element);
        id
    }

    /// Matches for `by`/`value` from the session root, for every query from now on.
    pub fn set_matches(&self, by: By, value: &str, ids: Vec<ElementId>) {
        self.set_matches_sequence(by, value, vec![ids]);
    }

    /// Match lists returned by successive queries; the last one sticks.
    pub fn set_matches_sequence(&self, by: By, value: &str, sequence: Vec<Vec<ElementId>>) {
        let key = MatchKey {
            parent: None,
            by,
            value: value.to_string(),
        };
        let mut state = self.lock();
        match Script::of(sequence) {
            Some(script) => state.matches.insert(key, script),
            None => state.matches.remove(&key),
        };
    }

    /// Matches for `by`/`value` searched below `parent`.
    pub fn set_child_matches(&self, parent: &ElementId, by: By, value: &str, ids: Vec<ElementId>) {
        let key = MatchKey {
            parent: Some(parent.clone()),
            by,
            value: value.to_string(),
        };
        self.lock().matches.insert(key, Script::one(ids));
    }

    /// Detach an element: every later operation on it fails as stale and queries skip it.
    pub fn make_stale(&self, id: &ElementId) {
        self.lock().stale.insert(id.clone());
    }

    /// Fail the next `count` driver calls with a stale-element error.
    pub fn inject_transient_errors(&self, count: usize) {
        self.lock().transient_errors = count;
    }

    /// Terminate the session: every later call fails with [`PageError::FatalDriver`].
    pub fn end_session(&self) {
        self.lock().ended = true;
    }

    pub fn set_title<S: Into<String>>(&self, title: S) {
        self.lock().title = title.into();
    }

    /// Number of `find_elements` calls served so far.
    pub fn find_count(&self) -> usize {
        self.lock().find_count
    }

    pub fn clicks(&self) -> usize {
        self.lock().clicks
    }

    /// Everything typed into `id` since it was last cleared.
    pub fn typed_text(&self, id: &ElementId) -> String {
        self.lock().typed.get(id).cloned().unwrap_or_default()
    }

    /// URLs passed to `navigate`, in order.
    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    /// Open a new window, as a link with `target="_blank"` would, and return its handle.
    /// The session stays on the current window.
    pub fn open_window(&self) -> String {
        self.lock().open_window()
    }

    /// Show an alert with `text` until it is accepted or dismissed.
    pub fn open_alert<S: Into<String>>(&self, text: S) {
        self.lock().alert = Some(text.into());
    }

    /// What every later `execute_script` call returns. `null` by default.
    pub fn set_script_result(&self, result: Value) {
        self.lock().script_result = result;
    }

    /// Scripts executed so far, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }

    /// Gestures performed so far, e.g. `"double_click mock-1"`.
    pub fn gestures(&self) -> Vec<String> {
        self.lock().gestures.clone()
    }

    /// The frames entered from the top-level document, outermost first. Index frames are
    /// recorded as their number.
    pub fn frames(&self) -> Vec<String> {
        self.lock().frames.clone()
    }
}

impl Driver for MockDriver {
    fn find_elements(
        &self,
        context: SearchContext<'_>,
        by: By,
        value: &str,
    ) -> PageResult<Vec<ElementId>> {
        let mut state = self.lock();
        state.enter()?;
        let parent = match context {
            SearchContext::Root => None,
            SearchContext::Element(id) => {
                state.element(id)?;
                Some(id.clone())
            }
        };
        let key = MatchKey {
            parent,
            by,
            value: value.to_string(),
        };
        Ok(state.find(&key))
    }

    fn is_displayed(&self, element: &ElementId) -> PageResult<bool> {
        self.with_element(element, |e| e.displayed.next().unwrap_or_default())
    }

    fn is_enabled(&self, element: &ElementId) -> PageResult<bool> {
        self.with_element(element, |e| e.enabled.next().unwrap_or_default())
    }

    fn is_selected(&self, element: &ElementId) -> PageResult<bool> {
        self.with_element(element, |e| e.selected.next().unwrap_or_default())
    }

    fn tag_name(&self, element: &ElementId) -> PageResult<String> {
        self.with_element(element, |e| e.tag.clone())
    }

    fn text(&self, element: &ElementId) -> PageResult<String> {
        self.with_element(element, |e| e.text.next().unwrap_or_default())
    }

    fn attribute(&self, element: &ElementId, name: &str) -> PageResult<Option<String>> {
        self.with_element(element, |e| e.attributes.get(name).cloned())
    }

    fn property(&self, element: &ElementId, name: &str) -> PageResult<Option<String>> {
        self.with_element(element, |e| e.properties.get(name).cloned())
    }

    fn css_value(&self, element: &ElementId, name: &str) -> PageResult<String> {
        self.with_element(element, |e| e.css.get(name).cloned().unwrap_or_default())
    }

    fn rect(&self, element: &ElementId) -> PageResult<ElementRect> {
        self.with_element(element, |e| e.rect)
    }

    /// Clicking an `<option>` toggles its selection.
    fn click(&self, element: &ElementId) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        let e = state.element(element)?;
        if e.tag.eq_ignore_ascii_case("option") {
            let selected = e.selected.next().unwrap_or_default();
            e.selected = Script::one(!selected);
        }
        state.clicks += 1;
        Ok(())
    }

    fn clear(&self, element: &ElementId) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        state.element(element)?;
        state.typed.insert(element.clone(), String::new());
        Ok(())
    }

    fn send_keys(&self, element: &ElementId, text: &str) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        state.element(element)?;
        state.typed.entry(element.clone()).or_default().push_str(text);
        Ok(())
    }

    fn navigate(&self, url: &str) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        if !state.history.is_empty() {
            let keep = state.position + 1;
            state.history.truncate(keep);
        }
        state.history.push(url.to_string());
        state.position = state.history.len() - 1;
        state.visited.push(url.to_string());
        Ok(())
    }

    fn current_url(&self) -> PageResult<String> {
        let mut state = self.lock();
        state.enter()?;
        Ok(state.current_url())
    }

    fn title(&self) -> PageResult<String> {
        let mut state = self.lock();
        state.enter()?;
        Ok(state.title.clone())
    }

    fn refresh(&self) -> PageResult<()> {
        self.lock().enter()
    }

    fn back(&self) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        state.position = state.position.saturating_sub(1);
        Ok(())
    }

    fn forward(&self) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        if state.position + 1 < state.history.len() {
            state.position += 1;
        }
        Ok(())
    }

    fn screenshot_png(&self) -> PageResult<Vec<u8>> {
        self.lock().enter()?;
        Ok(MOCK_SCREENSHOT.to_vec())
    }

    fn cookies(&self) -> PageResult<Vec<Cookie>> {
        let mut state = self.lock();
        state.enter()?;
        Ok(state.cookies.clone())
    }

    fn add_cookie(&self, cookie: &Cookie) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        state.cookies.retain(|c| c.name() != cookie.name());
        state.cookies.push(cookie.clone());
        Ok(())
    }

    fn delete_cookie(&self, name: &str) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        state.cookies.retain(|c| c.name() != name);
        Ok(())
    }

    fn delete_all_cookies(&self) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        state.cookies.clear();
        Ok(())
    }

    fn execute_script(&self, script: &str, args: Vec<Value>) -> PageResult<Value> {
        let mut state = self.lock();
        state.enter()?;
        for arg in &args {
            if let Some(id) = ElementId::from_json(arg) {
                state.element(&id)?;
            }
        }
        state.scripts.push(script.to_string());
        Ok(state.script_result.clone())
    }

    fn perform(&self, gesture: Gesture<'_>) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        let record = match gesture {
            Gesture::MoveTo(id) => {
                state.element(id)?;
                format!("move_to {}", id)
            }
            Gesture::DoubleClick(id) => {
                state.element(id)?;
                format!("double_click {}", id)
            }
            Gesture::ContextClick(id) => {
                state.element(id)?;
                format!("context_click {}", id)
            }
            Gesture::DragAndDrop {
                source,
                target,
            } => {
                state.element(source)?;
                state.element(target)?;
                format!("drag_and_drop {} {}", source, target)
            }
        };
        state.gestures.push(record);
        Ok(())
    }

    fn window_handle(&self) -> PageResult<String> {
        let mut state = self.lock();
        state.enter()?;
        state.window.clone().ok_or_else(|| PageError::InvalidArgument(String::from("no such window")))
    }

    fn window_handles(&self) -> PageResult<Vec<String>> {
        let mut state = self.lock();
        state.enter()?;
        Ok(state.windows.clone())
    }

    fn switch_to_window(&self, handle: &str) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        if !state.windows.iter().any(|w| w == handle) {
            return Err(PageError::InvalidArgument(format!("no such window: {}", handle)));
        }
        state.window = Some(handle.to_string());
        state.frames.clear();
        Ok(())
    }

    fn close_window(&self) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        let current = state
            .window
            .take()
            .ok_or_else(|| PageError::InvalidArgument(String::from("no such window")))?;
        state.windows.retain(|w| *w != current);
        state.frames.clear();
        Ok(())
    }

    fn switch_to_frame(&self, frame: Frame<'_>) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        match frame {
            Frame::Default => state.frames.clear(),
            Frame::Index(index) => state.frames.push(index.to_string()),
            Frame::Element(id) => {
                state.element(id)?;
                state.frames.push(id.to_string());
            }
            Frame::Parent => {
                state.frames.pop();
            }
        }
        Ok(())
    }

    fn alert_text(&self) -> PageResult<String> {
        let mut state = self.lock();
        state.enter()?;
        state.alert().map(|text| text.clone())
    }

    fn accept_alert(&self) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        state.alert()?;
        state.alert = None;
        Ok(())
    }

    fn dismiss_alert(&self) -> PageResult<()> {
        self.accept_alert()
    }

    /// The text replaces the alert's message, so tests can read back what was typed.
    fn send_alert_text(&self, text: &str) -> PageResult<()> {
        let mut state = self.lock();
        state.enter()?;
        *state.alert()? = text.to_string();
        Ok(())
    }
}
