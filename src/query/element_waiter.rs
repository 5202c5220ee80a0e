use std::time::Duration;

use stringmatch::Needle;

use crate::driver::{Driver, ElementId};
use crate::element::ElementRef;
use crate::error::{PageError, PageResult};
use crate::page::{Bound, Resolved};
use crate::query::conditions::{self, ElementState, Lookup};
use crate::query::waiter::timeout_message;
use crate::query::{ElementPoller, FailurePolicy};

/// High-level interface for performing explicit waits on a single element, using the
/// builder pattern.
///
/// Terminals come in two flavours sharing the same polling loop. The plain ones (`visible`,
/// `clickable`...) return an error when the wait times out; the `is_*` / `matches_*` ones
/// return `Ok(false)` instead.
///
/// # Example:
/// ```no_run
/// # use std::time::Duration;
/// # use thirtyfour_pages::prelude::*;
/// # fn run(page: &Page) -> PageResult<()> {
/// const BANNER: Element = Element::new("banner", By::Css, ".banner");
/// let banner = BANNER.get(page)?;
/// // Wait until the element is displayed.
/// banner.wait_until().at_most(Duration::from_secs(5)).visible()?;
/// // Or just ask.
/// if banner.wait_until().at_most(Duration::from_secs(1)).is_clickable()? {
///     banner.click()?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ElementWaiter<'e, 'p> {
    element: &'e ElementRef<'p>,
    poller: ElementPoller,
    message: Option<String>,
}

/// Which handle each poll looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tracking {
    /// Query the locator on every poll.
    Locate,
    /// Start from the cached handle and keep polling it until it goes stale.
    Sticky,
}

/// The handle a singular wait is currently polling.
struct Target<'b, 'p> {
    bound: &'b Bound<'p>,
    tracking: Tracking,
    current: Option<ElementId>,
    last_len: Option<usize>,
}

impl<'b, 'p> Target<'b, 'p> {
    fn new(bound: &'b Bound<'p>, tracking: Tracking) -> Self {
        let current = match tracking {
            Tracking::Sticky => bound.cached_one(),
            Tracking::Locate => None,
        };
        Self {
            bound,
            tracking,
            current,
            last_len: None,
        }
    }

    fn lookup(&mut self, driver: &dyn Driver) -> PageResult<Option<ElementId>> {
        if self.tracking == Tracking::Locate {
            self.current = None;
        }
        if let Some(id) = &self.current {
            return Ok(Some(id.clone()));
        }
        match conditions::locate(driver, self.bound.locator())? {
            Lookup::Found(id) => {
                self.last_len = None;
                self.bound.store(Resolved::One(id.clone()));
                self.current = Some(id.clone());
                Ok(Some(id))
            }
            Lookup::Missing {
                len,
            } => {
                self.last_len = Some(len);
                self.bound.invalidate();
                Ok(None)
            }
        }
    }

    fn lost(&mut self) {
        self.current = None;
        self.bound.invalidate();
    }
}

fn state_check(
    state: ElementState,
    or_absent: bool,
) -> impl FnMut(&dyn Driver, Option<&ElementId>) -> PageResult<bool> {
    move |driver, current| match current {
        Some(id) => state.check(driver, id),
        None => Ok(or_absent),
    }
}

impl<'e, 'p> ElementWaiter<'e, 'p> {
    pub(crate) fn new(element: &'e ElementRef<'p>, poller: ElementPoller) -> Self {
        Self {
            element,
            poller,
            message: None,
        }
    }

    /// Use the specified ElementPoller for this ElementWaiter.
    /// This will not affect the locator's own timeout for other waits.
    pub fn with_poller(mut self, poller: ElementPoller) -> Self {
        self.poller = poller;
        self
    }

    /// Force this ElementWaiter to wait for the specified timeout, polling once
    /// after each interval.
    pub fn wait(self, timeout: Duration, interval: Duration) -> Self {
        self.with_poller(ElementPoller::TimeoutWithInterval(timeout, interval))
    }

    /// Override the timeout only.
    pub fn at_most(mut self, timeout: Duration) -> Self {
        self.poller = self.poller.with_timeout(timeout);
        self
    }

    /// Override the poll interval only.
    pub fn every(mut self, interval: Duration) -> Self {
        self.poller = self.poller.with_interval(interval);
        self
    }

    /// Provide a human-readable error message to be returned in the case of timeout.
    pub fn error(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    fn run<F>(
        &self,
        status: &str,
        policy: FailurePolicy,
        tracking: Tracking,
        mut check: F,
    ) -> PageResult<Option<Option<ElementId>>>
    where
        F: FnMut(&dyn Driver, Option<&ElementId>) -> PageResult<bool>,
    {
        let bound = self.element.bound();
        let mut target = Target::new(bound, tracking);
        let what = format!("{} [{}]", bound.remark(), status);
        let outcome = bound.engine(self.poller.clone()).poll(&what, |driver| {
            let current = target.lookup(driver)?;
            match check(driver, current.as_ref()) {
                Ok(true) => Ok(Some(current)),
                Ok(false) => Ok(None),
                Err(e) => {
                    if e.is_stale() {
                        target.lost();
                    }
                    Err(e)
                }
            }
        })?;
        let last_len = target.last_len;
        policy.settle(outcome, || self.timeout_error(status, last_len))
    }

    fn timeout_error(&self, status: &str, last_len: Option<usize>) -> PageError {
        let bound = self.element.bound();
        let remark = bound.remark();
        match (bound.locator().index(), last_len) {
            (Some(index), Some(len)) if len > 0 => PageError::IndexOutOfRange {
                remark,
                index,
                len,
            },
            _ => PageError::Timeout(
                self.message.clone().unwrap_or_else(|| timeout_message(&remark, status, &self.poller)),
            ),
        }
    }

    fn raise<F>(&self, status: &str, tracking: Tracking, check: F) -> PageResult<()>
    where
        F: FnMut(&dyn Driver, Option<&ElementId>) -> PageResult<bool>,
    {
        self.run(status, FailurePolicy::Raise, tracking, check).map(|_| ())
    }

    fn falsy<F>(&self, status: &str, tracking: Tracking, check: F) -> PageResult<bool>
    where
        F: FnMut(&dyn Driver, Option<&ElementId>) -> PageResult<bool>,
    {
        self.run(status, FailurePolicy::Falsy, tracking, check).map(|r| r.is_some())
    }

    /// Wait until the element is present and return its handle.
    pub fn present(self) -> PageResult<ElementId> {
        match self.run("present", FailurePolicy::Raise, Tracking::Locate, |_, c| Ok(c.is_some()))? {
            Some(Some(id)) => Ok(id),
            _ => Err(self.timeout_error("present", None)),
        }
    }

    /// Wait until the locator no longer matches (at its index).
    pub fn absent(self) -> PageResult<()> {
        self.raise("absent", Tracking::Locate, |_, c| Ok(c.is_none()))
    }

    pub fn state(self, state: ElementState) -> PageResult<()> {
        self.raise(state.label(), Tracking::Sticky, state_check(state, false))
    }

    /// Wait until the element is in `state` or has gone away.
    pub fn state_or_absent(self, state: ElementState) -> PageResult<()> {
        let status = format!("{} or absent", state.label());
        self.raise(&status, Tracking::Sticky, state_check(state, true))
    }

    pub fn visible(self) -> PageResult<()> {
        self.state(ElementState::Visible)
    }

    pub fn invisible(self) -> PageResult<()> {
        self.state(ElementState::Invisible)
    }

    pub fn invisible_or_absent(self) -> PageResult<()> {
        self.state_or_absent(ElementState::Invisible)
    }

    pub fn enabled(self) -> PageResult<()> {
        self.state(ElementState::Enabled)
    }

    pub fn disabled(self) -> PageResult<()> {
        self.state(ElementState::Disabled)
    }

    pub fn clickable(self) -> PageResult<()> {
        self.state(ElementState::Clickable)
    }

    pub fn unclickable(self) -> PageResult<()> {
        self.state(ElementState::Unclickable)
    }

    pub fn unclickable_or_absent(self) -> PageResult<()> {
        self.state_or_absent(ElementState::Unclickable)
    }

    pub fn selected(self) -> PageResult<()> {
        self.state(ElementState::Selected)
    }

    pub fn unselected(self) -> PageResult<()> {
        self.state(ElementState::Unselected)
    }

    pub fn has_text<N: Needle>(self, text: N) -> PageResult<()> {
        self.raise("text matched", Tracking::Sticky, |driver, current| match current {
            Some(id) => Ok(text.is_match(&driver.text(id)?)),
            None => Ok(false),
        })
    }

    pub fn has_attribute<S, N>(self, attribute_name: S, value: N) -> PageResult<()>
    where
        S: AsRef<str>,
        N: Needle,
    {
        let name = attribute_name.as_ref();
        let status = format!("{} matched", name);
        self.raise(&status, Tracking::Sticky, |driver, current| match current {
            Some(id) => Ok(driver.attribute(id, name)?.map_or(false, |v| value.is_match(&v))),
            None => Ok(false),
        })
    }

    pub fn has_property<S, N>(self, property_name: S, value: N) -> PageResult<()>
    where
        S: AsRef<str>,
        N: Needle,
    {
        let name = property_name.as_ref();
        let status = format!("{} matched", name);
        self.raise(&status, Tracking::Sticky, |driver, current| match current {
            Some(id) => Ok(driver.property(id, name)?.map_or(false, |v| value.is_match(&v))),
            None => Ok(false),
        })
    }

    /// Wait for a custom predicate on the element handle.
    pub fn condition<F>(self, status: &str, mut f: F) -> PageResult<()>
    where
        F: FnMut(&dyn Driver, &ElementId) -> PageResult<bool>,
    {
        self.raise(status, Tracking::Sticky, |driver, current| match current {
            Some(id) => f(driver, id),
            None => Ok(false),
        })
    }

    pub fn is_present(self) -> PageResult<bool> {
        self.falsy("present", Tracking::Locate, |_, c| Ok(c.is_some()))
    }

    pub fn is_absent(self) -> PageResult<bool> {
        self.falsy("absent", Tracking::Locate, |_, c| Ok(c.is_none()))
    }

    pub fn is_state(self, state: ElementState) -> PageResult<bool> {
        self.falsy(state.label(), Tracking::Sticky, state_check(state, false))
    }

    pub fn is_visible(self) -> PageResult<bool> {
        self.is_state(ElementState::Visible)
    }

    pub fn is_invisible(self) -> PageResult<bool> {
        self.is_state(ElementState::Invisible)
    }

    pub fn is_clickable(self) -> PageResult<bool> {
        self.is_state(ElementState::Clickable)
    }

    pub fn is_unclickable(self) -> PageResult<bool> {
        self.is_state(ElementState::Unclickable)
    }

    pub fn is_selected(self) -> PageResult<bool> {
        self.is_state(ElementState::Selected)
    }

    pub fn is_unselected(self) -> PageResult<bool> {
        self.is_state(ElementState::Unselected)
    }

    pub fn matches_text<N: Needle>(self, text: N) -> PageResult<bool> {
        self.falsy("text matched", Tracking::Sticky, |driver, current| match current {
            Some(id) => Ok(text.is_match(&driver.text(id)?)),
            None => Ok(false),
        })
    }

    pub fn matches_attribute<S, N>(self, attribute_name: S, value: N) -> PageResult<bool>
    where
        S: AsRef<str>,
        N: Needle,
    {
        let name = attribute_name.as_ref();
        let status = format!("{} matched", name);
        self.falsy(&status, Tracking::Sticky, |driver, current| match current {
            Some(id) => Ok(driver.attribute(id, name)?.map_or(false, |v| value.is_match(&v))),
            None => Ok(false),
        })
    }
}
