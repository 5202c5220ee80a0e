use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thirtyfour::common::command::MAGIC_ELEMENTID;

use crate::by::By;
use crate::error::PageResult;

pub use thirtyfour::Cookie;

/// Opaque reference to a live UI element, as handed out by a [`Driver`].
///
/// A handle means nothing beyond the resolution that produced it. Once the element is
/// re-rendered the driver reports it as stale and it must be resolved again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(String);

impl ElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The element as a script argument or action origin.
    pub fn to_json(&self) -> Value {
        json!({ MAGIC_ELEMENTID: self.0 })
    }

    /// The element a script argument refers to, if it is one.
    pub fn from_json(value: &Value) -> Option<Self> {
        value.get(MAGIC_ELEMENTID).and_then(Value::as_str).map(ElementId::from)
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        ElementId(value)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        ElementId(value.to_string())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a lookup starts: the session root, or below an already resolved element.
#[derive(Debug, Clone, Copy)]
pub enum SearchContext<'a> {
    Root,
    Element(&'a ElementId),
}

/// Position and size of an element, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer point, rounded down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// Edges of an element, rounded down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Border {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
}

impl ElementRect {
    pub fn center(&self) -> Point {
        Point {
            x: (self.x + self.width / 2.0).floor() as i64,
            y: (self.y + self.height / 2.0).floor() as i64,
        }
    }

    pub fn border(&self) -> Border {
        Border {
            left: self.x.floor() as i64,
            right: (self.x + self.width).floor() as i64,
            top: self.y.floor() as i64,
            bottom: (self.y + self.height).floor() as i64,
        }
    }
}

/// Which browsing context a frame switch targets.
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    /// The top-level document.
    Default,
    Index(u16),
    Element(&'a ElementId),
    Parent,
}

/// Pointer gestures, performed with the W3C actions API.
#[derive(Debug, Clone, Copy)]
pub enum Gesture<'a> {
    MoveTo(&'a ElementId),
    DoubleClick(&'a ElementId),
    ContextClick(&'a ElementId),
    DragAndDrop {
        source: &'a ElementId,
        target: &'a ElementId,
    },
}

/// The automation driver that pages resolve against.
///
/// Implementations own the session and serialise their own I/O. Errors should use the
/// [`PageError`](crate::error::PageError) variants that describe them: `StaleElement` for
/// handles that are no longer attached, `FatalDriver` once the session is gone.
pub trait Driver: Debug + Send + Sync {
    /// Current matches for `by`/`value` below `context`, in document order. No match is
    /// an empty vec, not an error.
    fn find_elements(
        &self,
        context: SearchContext<'_>,
        by: By,
        value: &str,
    ) -> PageResult<Vec<ElementId>>;

    fn is_displayed(&self, element: &ElementId) -> PageResult<bool>;
    fn is_enabled(&self, element: &ElementId) -> PageResult<bool>;
    fn is_selected(&self, element: &ElementId) -> PageResult<bool>;
    fn tag_name(&self, element: &ElementId) -> PageResult<String>;
    fn text(&self, element: &ElementId) -> PageResult<String>;
    fn attribute(&self, element: &ElementId, name: &str) -> PageResult<Option<String>>;
    fn property(&self, element: &ElementId, name: &str) -> PageResult<Option<String>>;
    fn css_value(&self, element: &ElementId, name: &str) -> PageResult<String>;
    fn rect(&self, element: &ElementId) -> PageResult<ElementRect>;

    fn click(&self, element: &ElementId) -> PageResult<()>;
    fn clear(&self, element: &ElementId) -> PageResult<()>;
    fn send_keys(&self, element: &ElementId, text: &str) -> PageResult<()>;

    fn navigate(&self, url: &str) -> PageResult<()>;
    fn current_url(&self) -> PageResult<String>;
    fn title(&self) -> PageResult<String>;
    fn refresh(&self) -> PageResult<()>;
    fn back(&self) -> PageResult<()>;
    fn forward(&self) -> PageResult<()>;
    /// Screenshot of the current viewport as PNG bytes.
    fn screenshot_png(&self) -> PageResult<Vec<u8>>;
    fn cookies(&self) -> PageResult<Vec<Cookie>>;
    fn add_cookie(&self, cookie: &Cookie) -> PageResult<()>;
    fn delete_cookie(&self, name: &str) -> PageResult<()>;
    fn delete_all_cookies(&self) -> PageResult<()>;

    /// Run `script` synchronously in the current frame and return its result.
    /// Elements are passed in `args` as [`ElementId::to_json`].
    fn execute_script(&self, script: &str, args: Vec<Value>) -> PageResult<Value>;
    fn perform(&self, gesture: Gesture<'_>) -> PageResult<()>;

    fn window_handle(&self) -> PageResult<String>;
    fn window_handles(&self) -> PageResult<Vec<String>>;
    fn switch_to_window(&self, handle: &str) -> PageResult<()>;
    /// Close the current window. The session stays on no window until another one is
    /// switched to.
    fn close_window(&self) -> PageResult<()>;
    fn switch_to_frame(&self, frame: Frame<'_>) -> PageResult<()>;

    fn alert_text(&self) -> PageResult<String>;
    fn accept_alert(&self) -> PageResult<()>;
    fn dismiss_alert(&self) -> PageResult<()>;
    fn send_alert_text(&self, text: &str) -> PageResult<()>;
}
