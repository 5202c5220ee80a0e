use std::time::Duration;

use crate::driver::{Driver, ElementId};
use crate::elements::ElementsRef;
use crate::error::{PageError, PageResult};
use crate::page::Resolved;
use crate::query::conditions::{self, ElementState};
use crate::query::waiter::timeout_message;
use crate::query::{ElementPoller, FailurePolicy};

/// Explicit waits over every element matching a locator.
///
/// Each poll queries the locator again, so elements appearing or disappearing while the
/// wait is running are taken into account.
#[derive(Debug, Clone)]
pub struct ElementsWaiter<'e, 'p> {
    elements: &'e ElementsRef<'p>,
    poller: ElementPoller,
    message: Option<String>,
}

/// How the members of a match set have to satisfy a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    /// At least one match, and at least one of them in the state.
    Any,
    /// At least one match, and all of them in the state.
    All,
    /// No match at all, or at least one in the state.
    AnyOrNone,
    /// Every match (possibly none) in the state.
    AllOrNone,
}

impl Quantifier {
    fn check(self, driver: &dyn Driver, ids: &[ElementId], state: ElementState) -> PageResult<bool> {
        if ids.is_empty() {
            return Ok(matches!(self, Quantifier::AnyOrNone | Quantifier::AllOrNone));
        }
        match self {
            Quantifier::Any | Quantifier::AnyOrNone => {
                for id in ids {
                    if state.check(driver, id)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Quantifier::All | Quantifier::AllOrNone => {
                for id in ids {
                    if !state.check(driver, id)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn label(self, state: ElementState) -> String {
        match self {
            Quantifier::Any => format!("any {}", state),
            Quantifier::All => format!("all {}", state),
            Quantifier::AnyOrNone => format!("any {} or absent", state),
            Quantifier::AllOrNone => format!("all {} or absent", state),
        }
    }
}

impl<'e, 'p> ElementsWaiter<'e, 'p> {
    pub(crate) fn new(elements: &'e ElementsRef<'p>, poller: ElementPoller) -> Self {
        Self {
            elements,
            poller,
            message: None,
        }
    }

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

    fn run<F>(
        &self,
        status: &str,
        policy: FailurePolicy,
        mut check: F,
    ) -> PageResult<Option<Vec<ElementId>>>
    where
        F: FnMut(&dyn Driver, &[ElementId]) -> PageResult<bool>,
    {
        let bound = self.elements.bound();
        let what = format!("{} [{}]", bound.remark(), status);
        let outcome = bound.engine(self.poller.clone()).poll(&what, |driver| {
            let ids = conditions::locate_all(driver, bound.locator())?;
            match check(driver, &ids) {
                Ok(true) => Ok(Some(ids)),
                Ok(false) => Ok(None),
                Err(e) => {
                    if e.is_stale() {
                        bound.invalidate();
                    }
                    Err(e)
                }
            }
        })?;
        let settled = policy.settle(outcome, || {
            PageError::Timeout(
                self.message
                    .clone()
                    .unwrap_or_else(|| timeout_message(&bound.remark(), status, &self.poller)),
            )
        })?;
        match &settled {
            Some(ids) if !ids.is_empty() => bound.store(Resolved::Many(ids.clone())),
            Some(_) => bound.invalidate(),
            None => {}
        }
        Ok(settled)
    }

    fn quantified(
        &self,
        quantifier: Quantifier,
        state: ElementState,
        policy: FailurePolicy,
    ) -> PageResult<Option<Vec<ElementId>>> {
        self.run(&quantifier.label(state), policy, |driver, ids| quantifier.check(driver, ids, state))
    }

    /// Wait until at least one element matches, and return all matches.
    pub fn all_present(self) -> PageResult<Vec<ElementId>> {
        Ok(self.run("all present", FailurePolicy::Raise, |_, ids| Ok(!ids.is_empty()))?.unwrap_or_default())
    }

    /// Wait until nothing matches.
    pub fn all_absent(self) -> PageResult<()> {
        self.run("all absent", FailurePolicy::Raise, |_, ids| Ok(ids.is_empty())).map(|_| ())
    }

    /// Wait until at least one match is in `state`.
    pub fn any(self, state: ElementState) -> PageResult<Vec<ElementId>> {
        Ok(self.quantified(Quantifier::Any, state, FailurePolicy::Raise)?.unwrap_or_default())
    }

    /// Wait until there is at least one match and every match is in `state`.
    pub fn all(self, state: ElementState) -> PageResult<Vec<ElementId>> {
        Ok(self.quantified(Quantifier::All, state, FailurePolicy::Raise)?.unwrap_or_default())
    }

    /// Wait until nothing matches or at least one match is in `state`.
    pub fn any_or_absent(self, state: ElementState) -> PageResult<()> {
        self.quantified(Quantifier::AnyOrNone, state, FailurePolicy::Raise).map(|_| ())
    }

    /// Wait until every match, if any, is in `state`.
    pub fn all_or_absent(self, state: ElementState) -> PageResult<()> {
        self.quantified(Quantifier::AllOrNone, state, FailurePolicy::Raise).map(|_| ())
    }

    pub fn any_visible(self) -> PageResult<Vec<ElementId>> {
        self.any(ElementState::Visible)
    }

    pub fn all_visible(self) -> PageResult<Vec<ElementId>> {
        self.all(ElementState::Visible)
    }

    pub fn are_all_present(self) -> PageResult<bool> {
        Ok(self.run("all present", FailurePolicy::Falsy, |_, ids| Ok(!ids.is_empty()))?.is_some())
    }

    pub fn are_all_absent(self) -> PageResult<bool> {
        Ok(self.run("all absent", FailurePolicy::Falsy, |_, ids| Ok(ids.is_empty()))?.is_some())
    }

    pub fn is_any(self, state: ElementState) -> PageResult<bool> {
        Ok(self.quantified(Quantifier::Any, state, FailurePolicy::Falsy)?.is_some())
    }

    pub fn is_all(self, state: ElementState) -> PageResult<bool> {
        Ok(self.quantified(Quantifier::All, state, FailurePolicy::Falsy)?.is_some())
    }

    pub fn are_any_visible(self) -> PageResult<bool> {
        self.is_any(ElementState::Visible)
    }

    pub fn are_all_visible(self) -> PageResult<bool> {
        self.is_all(ElementState::Visible)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::by::By;
    use crate::elements::Elements;
    use crate::mock::{MockDriver, MockElement};
    use crate::page::Page;

    const ROWS: Elements = Elements::new("rows", By::Css, "tr");

    fn fast() -> ElementPoller {
        ElementPoller::TimeoutWithInterval(Duration::from_millis(100), Duration::from_millis(10))
    }

    fn setup(displayed: &[bool]) -> (Arc<MockDriver>, Page) {
        let driver = Arc::new(MockDriver::new());
        let ids = displayed.iter().map(|d| driver.add_element(MockElement::new().displayed(*d))).collect();
        driver.set_matches(By::Css, "tr", ids);
        let page = Page::new(driver.clone());
        (driver, page)
    }

    #[test]
    fn any_versus_all() {
        let (_, page) = setup(&[false, true, false]);
        let rows = ROWS.get(&page).unwrap();
        assert!(rows.wait_until().with_poller(fast()).are_any_visible().unwrap());
        assert!(!rows.wait_until().with_poller(fast()).are_all_visible().unwrap());
        assert!(matches!(rows.wait_until().with_poller(fast()).all_visible(), Err(PageError::Timeout(_))));
        assert_eq!(rows.wait_until().with_poller(fast()).any_visible().unwrap().len(), 3);
    }

    #[test]
    fn empty_sets() {
        let (_, page) = setup(&[]);
        let rows = ROWS.get(&page).unwrap();
        assert!(!rows.wait_until().with_poller(fast()).is_any(ElementState::Visible).unwrap());
        rows.wait_until().with_poller(fast()).all_or_absent(ElementState::Invisible).unwrap();
        rows.wait_until().with_poller(fast()).any_or_absent(ElementState::Visible).unwrap();
        rows.wait_until().with_poller(fast()).all_absent().unwrap();
        assert!(!rows.wait_until().with_poller(fast()).are_all_present().unwrap());
        assert_eq!(page.cached_entries(), 0);
    }

    #[test]
    fn satisfied_waits_refresh_the_cache() {
        let (driver, page) = setup(&[true, true]);
        let rows = ROWS.get(&page).unwrap();
        let ids = rows.wait_until().with_poller(fast()).all_present().unwrap();
        assert_eq!(ids.len(), 2);
        let finds = driver.find_count();
        assert_eq!(rows.handles().unwrap(), ids);
        assert_eq!(driver.find_count(), finds);
    }
}
