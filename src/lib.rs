//! Page Objects for Selenium / Appium UI tests, on top of a synchronous WebDriver client.
//!
//! A page type declares its elements once, as associated constants. Each declaration pairs a
//! locator (strategy, value, optional index, timeout, poll interval and remark) with an
//! attribute name. Reading the attribute through a page instance never talks to the driver:
//! the element is only looked up when an operation needs it, through an explicit wait bounded
//! by the locator's timeout. Resolved handles are cached per page instance and dropped again
//! when they go stale.
//!
//! ## Features
//!
//! - Const-declarable [`Element`] / [`Elements`] descriptors, with unbound attributes that
//!   get their locator at runtime
//! - Per-instance locator rebinding and handle caching
//! - Explicit waits on element state: present, absent, visible, clickable, selected, text...
//! - Boolean `is_*` variants of every wait that return `false` instead of failing
//! - Call-scoped [`DynamicElement`] / [`DynamicElements`] built from runtime arguments
//! - `<select>` helper, screenshots, cookies, navigation
//! - Scripts, frames, windows, alerts, keyboard shortcuts and pointer gestures
//! - Mobile locator strategies (accessibility id, UiAutomator, iOS predicate / class chain)
//! - [`MockDriver`] for testing page objects without a browser
//!
//! ## Example
//!
//! The following example assumes you have a selenium server running at localhost:4444.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use thirtyfour_pages::prelude::*;
//!
//! struct SearchPage {
//!     page: Page,
//! }
//!
//! impl PageObject for SearchPage {
//!     fn page(&self) -> &Page {
//!         &self.page
//!     }
//! }
//!
//! impl SearchPage {
//!     const QUERY: Element = Element::new("query", By::Name, "q");
//!     const SUBMIT: Element = Element::new("submit", By::Css, "button[type=submit]");
//!     const RESULTS: Elements =
//!         Elements::new("results", By::Css, "#results li").timeout(Duration::from_secs(10));
//!
//!     fn search(&self, terms: &str) -> PageResult<Vec<String>> {
//!         Self::QUERY.get(self)?.clear()?.send_keys(terms)?;
//!         Self::SUBMIT.get(self)?.click()?;
//!         Self::RESULTS.get(self)?.texts()
//!     }
//! }
//!
//! fn main() -> PageResult<()> {
//!     let caps = serde_json::json!({ "browserName": "chrome" });
//!     let driver = RemoteDriver::new("http://localhost:4444/wd/hub", &caps)?;
//!     let search = SearchPage { page: Page::new(Arc::new(driver)) };
//!     search.page().get("http://webappdemo")?;
//!     for line in search.search("selenium")? {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::needless_doctest_main)]

pub use by::By;
pub use components::SelectElement;
pub use driver::{Border, Cookie, Driver, ElementId, ElementRect, Frame, Gesture, Point, SearchContext};
pub use dynamic::{DynamicElement, DynamicElements, LocatorFn};
pub use element::{Element, ElementRef};
pub use elements::{Elements, ElementsRef};
pub use error::{PageError, PageResult};
pub use locator::{Declaration, IntoLocator, Locator, LocatorBuilder, LocatorConfig};
pub use mock::{MockDriver, MockElement};
pub use page::{Page, PageId, PageObject, PageWaiter};
pub use session::WebDriverSession;
pub use thirtyfour::SessionId;
pub use webdriver::{GenericRemoteDriver, RemoteDriver};

pub mod prelude {
    pub use crate::by::By;
    pub use crate::dynamic::{DynamicElement, DynamicElements};
    pub use crate::element::Element;
    pub use crate::elements::Elements;
    pub use crate::error::{PageError, PageResult};
    pub use crate::locator::Locator;
    pub use crate::page::{Page, PageObject};
    pub use crate::query::{ElementPoller, ElementState};
    pub use crate::webdriver::RemoteDriver;
}

pub mod by;
pub mod components {
    pub mod select;

    pub use select::SelectElement;
}
pub mod config;
pub mod driver;
pub mod dynamic;
pub mod element;
pub mod elements;
pub mod error;
pub mod http {
    pub mod connection_sync;
    pub mod reqwest_sync;
}
pub mod locator;
pub mod mock;
pub mod page;
pub mod query {
    pub mod conditions;
    mod element_waiter;
    mod elements_waiter;
    mod poller;
    mod waiter;

    pub use conditions::ElementState;
    pub use element_waiter::ElementWaiter;
    pub use elements_waiter::ElementsWaiter;
    pub use poller::{ElementPoller, ElementPollerTicker};
    pub(crate) use waiter::timeout_message;
    pub use waiter::{FailurePolicy, Outcome, WaitEngine};
}
mod session;
mod webdriver;
