use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde_json::Value;
use stringmatch::Needle;

use crate::driver::{Cookie, Driver, ElementId, Frame};
use crate::error::{PageError, PageResult};
use crate::locator::Locator;
use crate::query::{ElementPoller, FailurePolicy, WaitEngine};

static NEXT_PAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one page instance, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// Identity of a declared attribute within one page instance: its name.
///
/// Every path to the same instance (the page object, or its `Page` directly) sees the same
/// binding and cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DescriptorKey(&'static str);

impl DescriptorKey {
    pub(crate) fn new(attribute: &'static str) -> Self {
        Self(attribute)
    }

    pub(crate) fn attribute(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for DescriptorKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cached resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolved {
    One(ElementId),
    Many(Vec<ElementId>),
}

/// A resolution together with the locator that produced it.
#[derive(Debug, Clone)]
struct CacheEntry {
    locator: Locator,
    resolved: Resolved,
}

/// The resolution context for page objects.
///
/// A `Page` owns one driver session reference plus the per-instance state of every
/// descriptor read through it: cached handles and locators rebound at runtime. Descriptors
/// themselves are plain constants shared by every instance of a page type.
///
/// A `Page` can be moved to another thread but not shared between threads. Use one page
/// (and one driver session) per thread.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use thirtyfour_pages::prelude::*;
///
/// struct LoginPage {
///     page: Page,
/// }
///
/// impl PageObject for LoginPage {
///     fn page(&self) -> &Page {
///         &self.page
///     }
/// }
///
/// impl LoginPage {
///     const USERNAME: Element = Element::new("username", By::Id, "user");
///     const SUBMIT: Element = Element::new("submit", By::Css, "button[type=submit]");
///
///     fn login(&self, user: &str) -> PageResult<()> {
///         Self::USERNAME.get(self)?.send_keys(user)?;
///         Self::SUBMIT.get(self)?.click()?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> PageResult<()> {
/// let driver = RemoteDriver::new("http://localhost:4444", &serde_json::json!({"browserName": "chrome"}))?;
/// let login = LoginPage { page: Page::new(Arc::new(driver)) };
/// login.page.get("http://localhost:8000/login")?;
/// login.login("alice")?;
/// # Ok(())
/// # }
/// ```
pub struct Page {
    id: PageId,
    driver: Arc<dyn Driver>,
    cache: RefCell<HashMap<DescriptorKey, CacheEntry>>,
    bindings: RefCell<HashMap<DescriptorKey, Locator>>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("driver", &self.driver)
            .field("cached", &self.cache.borrow().len())
            .field("rebound", &self.bindings.borrow().len())
            .finish()
    }
}

/// Anything that exposes a [`Page`] to resolve descriptors against.
pub trait PageObject {
    fn page(&self) -> &Page;
}

impl PageObject for Page {
    fn page(&self) -> &Page {
        self
    }
}

impl Page {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        let id = PageId(NEXT_PAGE_ID.fetch_add(1, Ordering::Relaxed));
        debug!("{}: created for {:?}", id, driver);
        Self {
            id,
            driver,
            cache: RefCell::new(HashMap::new()),
            bindings: RefCell::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    /// The driver collaborator for this instance.
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// A shared reference to the driver, e.g. to build another page on the same session.
    pub fn driver_arc(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }

    pub(crate) fn binding(&self, key: DescriptorKey) -> Option<Locator> {
        self.bindings.borrow().get(&key).cloned()
    }

    pub(crate) fn rebind(&self, key: DescriptorKey, locator: Locator) {
        debug!("{}: {} rebound to {}", self.id, key, locator);
        self.bindings.borrow_mut().insert(key, locator);
        self.invalidate(key);
    }

    /// The cached resolution for `key`, if it was produced by `locator`.
    ///
    /// Entries resolved through another locator (e.g. by a reference taken before a rebind)
    /// are misses.
    pub(crate) fn cached(&self, key: DescriptorKey, locator: &Locator) -> Option<Resolved> {
        match self.cache.borrow().get(&key) {
            Some(entry) if entry.locator == *locator => Some(entry.resolved.clone()),
            Some(entry) => {
                debug!("{}: {} cached for {}, not {}", self.id, key, entry.locator, locator);
                None
            }
            None => None,
        }
    }

    /// Cache `resolved` for `key`, unless `key` is now bound to a locator other than the
    /// one that produced it.
    pub(crate) fn store(&self, key: DescriptorKey, locator: &Locator, resolved: Resolved) {
        if let Some(bound) = self.bindings.borrow().get(&key) {
            if bound != locator {
                debug!("{}: {} not cached, it is bound to {} now", self.id, key, bound);
                return;
            }
        }
        let entry = CacheEntry {
            locator: locator.clone(),
            resolved,
        };
        self.cache.borrow_mut().insert(key, entry);
    }

    pub(crate) fn invalidate(&self, key: DescriptorKey) {
        if self.cache.borrow_mut().remove(&key).is_some() {
            debug!("{}: {} invalidated", self.id, key);
        }
    }

    /// Drop every cached handle. Rebound locators are kept.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.borrow_mut();
        debug!("{}: clearing {} cached handle(s)", self.id, cache.len());
        cache.clear();
    }

    /// Number of descriptors that currently hold a cached handle.
    pub fn cached_entries(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Navigate to the specified URL.
    pub fn get<S: AsRef<str>>(&self, url: S) -> PageResult<()> {
        self.clear_cache();
        self.driver.navigate(url.as_ref())
    }

    pub fn current_url(&self) -> PageResult<String> {
        self.driver.current_url()
    }

    pub fn title(&self) -> PageResult<String> {
        self.driver.title()
    }

    pub fn refresh(&self) -> PageResult<()> {
        self.clear_cache();
        self.driver.refresh()
    }

    pub fn back(&self) -> PageResult<()> {
        self.clear_cache();
        self.driver.back()
    }

    pub fn forward(&self) -> PageResult<()> {
        self.clear_cache();
        self.driver.forward()
    }

    /// Take a screenshot of the current window and return it as PNG bytes.
    pub fn screenshot_as_png(&self) -> PageResult<Vec<u8>> {
        self.driver.screenshot_png()
    }

    /// Take a screenshot of the current window and write it to the specified filename.
    pub fn save_screenshot<P: AsRef<Path>>(&self, path: P) -> PageResult<()> {
        let png = self.screenshot_as_png()?;
        let mut file = File::create(path)?;
        file.write_all(&png)?;
        Ok(())
    }

    pub fn cookies(&self) -> PageResult<Vec<Cookie>> {
        self.driver.cookies()
    }

    /// The cookie with the given name, if the browser has one.
    pub fn cookie(&self, name: &str) -> PageResult<Option<Cookie>> {
        Ok(self.driver.cookies()?.into_iter().find(|c| c.name() == name))
    }

    pub fn add_cookie(&self, cookie: &Cookie) -> PageResult<()> {
        self.driver.add_cookie(cookie)
    }

    pub fn delete_cookie(&self, name: &str) -> PageResult<()> {
        self.driver.delete_cookie(name)
    }

    pub fn delete_all_cookies(&self) -> PageResult<()> {
        self.driver.delete_all_cookies()
    }

    /// Run `script` synchronously in the current frame. Use [`ElementId::to_json`] to pass
    /// elements as arguments.
    pub fn execute_script(&self, script: &str, args: Vec<Value>) -> PageResult<Value> {
        self.driver.execute_script(script, args)
    }

    pub fn window_handle(&self) -> PageResult<String> {
        self.driver.window_handle()
    }

    pub fn window_handles(&self) -> PageResult<Vec<String>> {
        self.driver.window_handles()
    }

    /// Switch to another window. Cached handles belong to the old window and are dropped.
    pub fn switch_to_window(&self, handle: &str) -> PageResult<()> {
        self.clear_cache();
        self.driver.switch_to_window(handle)
    }

    /// Switch to the most recently opened window, e.g. after a link opened a new tab.
    pub fn switch_to_new_window(&self) -> PageResult<String> {
        let handle = self
            .window_handles()?
            .pop()
            .ok_or_else(|| PageError::InvalidResponse(String::from("the session has no windows")))?;
        self.switch_to_window(&handle)?;
        Ok(handle)
    }

    pub fn close_window(&self) -> PageResult<()> {
        self.clear_cache();
        self.driver.close_window()
    }

    /// Switch into the frame at `index` of the current document.
    pub fn switch_to_frame(&self, index: u16) -> PageResult<()> {
        self.switch_frame(Frame::Index(index))
    }

    pub fn switch_to_parent_frame(&self) -> PageResult<()> {
        self.switch_frame(Frame::Parent)
    }

    /// Switch back to the top-level document.
    pub fn switch_to_default_content(&self) -> PageResult<()> {
        self.switch_frame(Frame::Default)
    }

    pub(crate) fn switch_frame(&self, frame: Frame<'_>) -> PageResult<()> {
        self.clear_cache();
        self.driver.switch_to_frame(frame)
    }

    pub fn alert_text(&self) -> PageResult<String> {
        self.driver.alert_text()
    }

    pub fn accept_alert(&self) -> PageResult<()> {
        self.driver.accept_alert()
    }

    pub fn dismiss_alert(&self) -> PageResult<()> {
        self.driver.dismiss_alert()
    }

    /// Type into a prompt dialog.
    pub fn send_alert_text(&self, text: &str) -> PageResult<()> {
        self.driver.send_alert_text(text)
    }

    /// Explicit waits on the page itself, e.g. for a URL change after navigation.
    pub fn wait_until(&self) -> PageWaiter<'_> {
        PageWaiter {
            page: self,
            poller: crate::config::defaults().poller(),
            message: None,
        }
    }
}

/// Where a descriptor read stores its resolution.
#[derive(Debug)]
pub(crate) enum CacheSlot {
    /// Shared by every read of the descriptor through the same page.
    Shared(DescriptorKey),
    /// Private to one dynamic call.
    Call(RefCell<Option<Resolved>>),
}

/// A locator bound to a page for one descriptor read.
#[derive(Debug)]
pub(crate) struct Bound<'p> {
    page: &'p Page,
    attribute: &'static str,
    locator: Locator,
    slot: CacheSlot,
}

impl<'p> Bound<'p> {
    pub(crate) fn shared(page: &'p Page, key: DescriptorKey, locator: Locator) -> Self {
        Self {
            page,
            attribute: key.attribute(),
            locator,
            slot: CacheSlot::Shared(key),
        }
    }

    pub(crate) fn call_scoped(page: &'p Page, attribute: &'static str, locator: Locator) -> Self {
        Self {
            page,
            attribute,
            locator,
            slot: CacheSlot::Call(RefCell::new(None)),
        }
    }

    pub(crate) fn page(&self) -> &'p Page {
        self.page
    }

    pub(crate) fn driver(&self) -> &'p dyn Driver {
        self.page.driver()
    }

    pub(crate) fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub(crate) fn locator(&self) -> &Locator {
        &self.locator
    }

    pub(crate) fn remark(&self) -> String {
        self.locator.remark()
    }

    pub(crate) fn engine(&self, poller: ElementPoller) -> WaitEngine<'p> {
        WaitEngine::new(self.driver(), poller)
    }

    pub(crate) fn cached(&self) -> Option<Resolved> {
        match &self.slot {
            CacheSlot::Shared(key) => self.page.cached(*key, &self.locator),
            CacheSlot::Call(cell) => cell.borrow().clone(),
        }
    }

    pub(crate) fn cached_one(&self) -> Option<ElementId> {
        match self.cached() {
            Some(Resolved::One(id)) => {
                debug!("{}: {} cache hit", self.page.id, self.attribute);
                Some(id)
            }
            _ => None,
        }
    }

    pub(crate) fn cached_many(&self) -> Option<Vec<ElementId>> {
        match self.cached() {
            Some(Resolved::Many(ids)) => {
                debug!("{}: {} cache hit ({} element(s))", self.page.id, self.attribute, ids.len());
                Some(ids)
            }
            _ => None,
        }
    }

    pub(crate) fn store(&self, resolved: Resolved) {
        match &self.slot {
            CacheSlot::Shared(key) => self.page.store(*key, &self.locator, resolved),
            CacheSlot::Call(cell) => *cell.borrow_mut() = Some(resolved),
        }
    }

    pub(crate) fn invalidate(&self) {
        match &self.slot {
            CacheSlot::Shared(key) => self.page.invalidate(*key),
            CacheSlot::Call(cell) => *cell.borrow_mut() = None,
        }
    }
}

/// Explicit waits on page-level state (URL, title).
#[derive(Debug, Clone)]
pub struct PageWaiter<'p> {
    page: &'p Page,
    poller: ElementPoller,
    message: Option<String>,
}

impl<'p> PageWaiter<'p> {
    pub fn with_poller(mut self, poller: ElementPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn wait(self, timeout: Duration, interval: Duration) -> Self {
        self.with_poller(ElementPoller::TimeoutWithInterval(timeout, interval))
    }

    pub fn at_most(mut self, timeout: Duration) -> Self {
        self.poller = self.poller.with_timeout(timeout);
        self
    }

    pub fn every(mut self, interval: Duration) -> Self {
        self.poller = self.poller.with_interval(interval);
        self
    }

    /// Provide a human-readable error message to be returned in the case of timeout.
    pub fn error(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    fn until<F>(&self, what: &str, policy: FailurePolicy, mut check: F) -> PageResult<bool>
    where
        F: FnMut(&dyn Driver) -> PageResult<bool>,
    {
        let engine = WaitEngine::new(self.page.driver(), self.poller.clone());
        let outcome = engine.poll(what, |driver| Ok(check(driver)?.then(|| ())))?;
        let settled = policy.settle(outcome, || {
            PageError::Timeout(self.message.clone().unwrap_or_else(|| match self.poller.timeout() {
                Some(t) => format!("Waiting for {} timed out after {:?}.", what, t),
                None => format!("{} was not satisfied.", what),
            }))
        })?;
        Ok(settled.is_some())
    }

    pub fn url_is<N: Needle>(self, url: N) -> PageResult<()> {
        self.until("url", FailurePolicy::Raise, |d| Ok(url.is_match(&d.current_url()?))).map(|_| ())
    }

    pub fn url_contains(self, fragment: &str) -> PageResult<()> {
        self.until("url", FailurePolicy::Raise, |d| Ok(d.current_url()?.contains(fragment)))
            .map(|_| ())
    }

    pub fn title_is<N: Needle>(self, title: N) -> PageResult<()> {
        self.until("title", FailurePolicy::Raise, |d| Ok(title.is_match(&d.title()?))).map(|_| ())
    }

    pub fn title_contains(self, fragment: &str) -> PageResult<()> {
        self.until("title", FailurePolicy::Raise, |d| Ok(d.title()?.contains(fragment))).map(|_| ())
    }

    /// Like [`url_is`](Self::url_is) but reports `false` instead of timing out.
    pub fn url_matches<N: Needle>(self, url: N) -> PageResult<bool> {
        self.until("url", FailurePolicy::Falsy, |d| Ok(url.is_match(&d.current_url()?)))
    }

    /// Like [`title_is`](Self::title_is) but reports `false` instead of timing out.
    pub fn title_matches<N: Needle>(self, title: N) -> PageResult<bool> {
        self.until("title", FailurePolicy::Falsy, |d| Ok(title.is_match(&d.title()?)))
    }
}

#[cfg(test)]
/// This function checks that pages can move between threads. It is not intended to be executed.
fn _test_is_send() {
    fn is_send<T: Send>() {}
    is_send::<Page>();
    is_send::<PageId>();
    is_send::<crate::element::Element>();
    is_send::<crate::elements::Elements>();
}
