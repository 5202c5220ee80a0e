use std::time::Duration;

use log::{debug, warn};

use crate::by::By;
use crate::driver::{Driver, ElementId, ElementRect};
use crate::element::{resolve_locator, ElementRef};
use crate::error::{PageError, PageResult};
use crate::locator::{Declaration, IntoLocator, Locator};
use crate::page::{Bound, DescriptorKey, PageObject, Resolved};
use crate::query::conditions::{self, ElementState};
use crate::query::{ElementsWaiter, FailurePolicy};

/// A declared multi-element attribute of a page type.
///
/// Works like [`Element`](crate::Element) but resolves to every match of the locator, in
/// document order. Any index on the locator is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elements {
    attribute: &'static str,
    declaration: Option<Declaration>,
}

impl Elements {
    pub const fn new(attribute: &'static str, by: By, value: &'static str) -> Self {
        Self {
            attribute,
            declaration: Some(Declaration::new(by, value)),
        }
    }

    pub const fn unbound(attribute: &'static str) -> Self {
        Self {
            attribute,
            declaration: None,
        }
    }

    pub const fn timeout(self, timeout: Duration) -> Self {
        Self {
            declaration: match self.declaration {
                Some(d) => Some(d.timeout(timeout)),
                None => None,
            },
            ..self
        }
    }

    pub const fn poll_interval(self, interval: Duration) -> Self {
        Self {
            declaration: match self.declaration {
                Some(d) => Some(d.poll_interval(interval)),
                None => None,
            },
            ..self
        }
    }

    pub const fn remark(self, remark: &'static str) -> Self {
        Self {
            declaration: match self.declaration {
                Some(d) => Some(d.remark(remark)),
                None => None,
            },
            ..self
        }
    }

    pub const fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn locator<P: PageObject + ?Sized>(&self, owner: &P) -> PageResult<Locator> {
        resolve_locator(owner, DescriptorKey::new(self.attribute), self.declaration)
    }

    /// Read the attribute through `owner`. Never touches the driver.
    pub fn get<'p, P: PageObject + ?Sized>(&self, owner: &'p P) -> PageResult<ElementsRef<'p>> {
        let key = DescriptorKey::new(self.attribute);
        let locator = resolve_locator(owner, key, self.declaration)?;
        Ok(ElementsRef::new(Bound::shared(owner.page(), key, locator)))
    }

    /// Bind a new locator for `owner` only.
    pub fn set<P, L>(&self, owner: &P, locator: L) -> PageResult<()>
    where
        P: PageObject + ?Sized,
        L: IntoLocator,
    {
        let locator = locator.into_locator()?;
        owner.page().rebind(DescriptorKey::new(self.attribute), locator);
        Ok(())
    }

    pub fn relocate<'p, P: PageObject + ?Sized>(&self, owner: &'p P) -> PageResult<ElementsRef<'p>> {
        owner.page().invalidate(DescriptorKey::new(self.attribute));
        self.get(owner)
    }
}

/// The resolvable match set of an [`Elements`] attribute on one page instance.
#[derive(Debug)]
pub struct ElementsRef<'p> {
    bound: Bound<'p>,
}

impl<'p> ElementsRef<'p> {
    pub(crate) fn new(bound: Bound<'p>) -> Self {
        Self {
            bound,
        }
    }

    pub(crate) fn bound(&self) -> &Bound<'p> {
        &self.bound
    }

    fn driver(&self) -> &'p dyn Driver {
        self.bound.driver()
    }

    pub fn attribute_name(&self) -> &'static str {
        self.bound.attribute()
    }

    pub fn locator(&self) -> &Locator {
        self.bound.locator()
    }

    pub fn remark(&self) -> String {
        self.bound.remark()
    }

    pub fn wait_until(&self) -> ElementsWaiter<'_, 'p> {
        ElementsWaiter::new(self, self.locator().poller())
    }

    /// The cached match set, or the result of waiting for at least one match.
    ///
    /// A timeout gives an empty vec rather than an error. Empty sets are not cached.
    pub fn handles(&self) -> PageResult<Vec<ElementId>> {
        if let Some(ids) = self.bound.cached_many() {
            return Ok(ids);
        }
        match self.wait_until().all_present() {
            Ok(ids) => Ok(ids),
            Err(PageError::Timeout(_)) => {
                debug!("{}: no element matched", self.remark());
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Query the current matches once, without waiting.
    pub fn locate_now(&self) -> PageResult<Vec<ElementId>> {
        let ids = conditions::locate_all(self.driver(), self.locator())?;
        if ids.is_empty() {
            self.bound.invalidate();
        } else {
            self.bound.store(Resolved::Many(ids.clone()));
        }
        Ok(ids)
    }

    pub fn relocate(&self) -> PageResult<Vec<ElementId>> {
        self.bound.invalidate();
        self.handles()
    }

    /// Number of matches, 0 if none showed up before the timeout.
    pub fn quantity(&self) -> PageResult<usize> {
        Ok(self.handles()?.len())
    }

    /// Apply `f` to each match, starting over once with a fresh match set if a handle goes
    /// stale midway.
    fn each<T, F>(&self, op: &str, ids: Vec<ElementId>, f: F) -> PageResult<Vec<T>>
    where
        F: Fn(&dyn Driver, &ElementId) -> PageResult<T>,
    {
        let driver = self.driver();
        let attempt = |ids: &[ElementId]| -> PageResult<Vec<T>> {
            ids.iter().map(|id| f(driver, id)).collect()
        };
        match attempt(&ids) {
            Err(e) if e.is_stale() => {
                warn!("{}: stale handle during {}, relocating", self.remark(), op);
                let ids = self.relocate()?;
                attempt(&ids)
            }
            r => r,
        }
    }

    pub fn texts(&self) -> PageResult<Vec<String>> {
        self.each("texts", self.handles()?, |d, id| d.text(id))
    }

    /// Wait until every match is visible, then return their texts.
    pub fn visible_texts(&self) -> PageResult<Vec<String>> {
        let ids = self.wait_until().all_visible()?;
        self.each("visible_texts", ids, |d, id| d.text(id))
    }

    /// Wait until at least one match is visible, then return the texts of the visible ones.
    pub fn any_visible_texts(&self) -> PageResult<Vec<String>> {
        let ids = self.wait_until().any_visible()?;
        let texts = self.each("any_visible_texts", ids, |d, id| {
            Ok(if d.is_displayed(id)? { Some(d.text(id)?) } else { None })
        })?;
        Ok(texts.into_iter().flatten().collect())
    }

    pub fn rects(&self) -> PageResult<Vec<ElementRect>> {
        self.each("rects", self.handles()?, |d, id| d.rect(id))
    }

    pub fn attributes(&self, name: &str) -> PageResult<Vec<Option<String>>> {
        self.each("attributes", self.handles()?, |d, id| d.attribute(id, name))
    }

    pub fn properties(&self, name: &str) -> PageResult<Vec<Option<String>>> {
        self.each("properties", self.handles()?, |d, id| d.property(id, name))
    }

    /// A single-element view of the match at `index`.
    ///
    /// The view has its own cache, separate from this attribute's.
    pub fn nth(&self, index: usize) -> ElementRef<'p> {
        ElementRef::new(Bound::call_scoped(
            self.bound.page(),
            self.bound.attribute(),
            self.locator().with_index(index),
        ))
    }

    /// Whether at least one match becomes visible before the timeout.
    pub fn any_visible(&self) -> PageResult<bool> {
        self.wait_until().are_any_visible()
    }

    /// Whether there are matches and all of them become visible before the timeout.
    pub fn all_visible(&self) -> PageResult<bool> {
        self.wait_until().are_all_visible()
    }

    /// Whether at least one match shows up before the timeout.
    pub fn all_present(&self) -> PageResult<bool> {
        self.wait_until().are_all_present()
    }

    pub fn wait_all_present(&self) -> PageResult<&Self> {
        self.wait_until().all_present()?;
        Ok(self)
    }

    pub fn wait_all_absent(&self) -> PageResult<&Self> {
        self.wait_until().all_absent()?;
        Ok(self)
    }

    pub fn wait_any_visible(&self) -> PageResult<&Self> {
        self.wait_until().any_visible()?;
        Ok(self)
    }

    pub fn wait_all_visible(&self) -> PageResult<&Self> {
        self.wait_until().all_visible()?;
        Ok(self)
    }

    /// Wait until every match is invisible or gone.
    pub fn wait_all_invisible(&self) -> PageResult<&Self> {
        self.wait_until().all_or_absent(ElementState::Invisible)?;
        Ok(self)
    }

    /// Click every match in order, waiting for each one to become clickable first.
    ///
    /// If a handle goes stale midway the match set is looked up again and the clicks start
    /// over once.
    pub fn click_all(&self) -> PageResult<&Self> {
        match self.click_each(&self.handles()?) {
            Err(e) if e.is_stale() => {
                warn!("{}: stale handle during click_all, relocating", self.remark());
                self.click_each(&self.relocate()?)?;
            }
            r => r?,
        }
        Ok(self)
    }

    fn click_each(&self, ids: &[ElementId]) -> PageResult<()> {
        let remark = self.remark();
        let poller = self.locator().poller();
        let what = format!("{} [clickable]", remark);
        for id in ids {
            let engine = self.bound.engine(poller.clone());
            // A stale handle never turns clickable, so it ends the wait instead of being polled.
            let outcome = engine.poll(&what, |d| match ElementState::Clickable.check(d, id) {
                Ok(clickable) => Ok(clickable.then(|| Ok(()))),
                Err(e) if e.is_stale() => Ok(Some(Err(e))),
                Err(e) => Err(e),
            })?;
            FailurePolicy::Raise
                .settle(outcome, || {
                    PageError::Timeout(crate::query::timeout_message(&remark, "clickable", &poller))
                })?
                .transpose()?;
            self.driver().click(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mock::{MockDriver, MockElement};
    use crate::page::Page;

    const ITEMS: Elements = Elements::new("items", By::Css, "li.item")
        .timeout(Duration::from_millis(150))
        .poll_interval(Duration::from_millis(10));

    fn setup() -> (Arc<MockDriver>, Page, Vec<ElementId>) {
        let driver = Arc::new(MockDriver::new());
        let ids: Vec<ElementId> = ["one", "two", "three"]
            .iter()
            .map(|t| driver.add_element(MockElement::new().texts(vec![*t]).displayed(*t != "two")))
            .collect();
        driver.set_matches(By::Css, "li.item", ids.clone());
        let page = Page::new(driver.clone());
        (driver, page, ids)
    }

    #[test]
    fn aggregate_reads() {
        let (_, page, _) = setup();
        let items = ITEMS.get(&page).unwrap();
        assert_eq!(items.quantity().unwrap(), 3);
        assert_eq!(items.texts().unwrap(), vec!["one", "two", "three"]);
        assert_eq!(items.any_visible_texts().unwrap(), vec!["one", "three"]);
        assert_eq!(items.attributes("missing").unwrap(), vec![None, None, None]);
    }

    #[test]
    fn no_matches_resolves_to_empty() {
        let driver = Arc::new(MockDriver::new());
        let page = Page::new(driver.clone());
        let items = ITEMS.get(&page).unwrap();
        assert_eq!(items.quantity().unwrap(), 0);
        assert!(items.texts().unwrap().is_empty());
        assert_eq!(page.cached_entries(), 0);
    }

    #[test]
    fn nth_is_a_single_element_view() {
        let (_, page, ids) = setup();
        let items = ITEMS.get(&page).unwrap();
        let second = items.nth(1);
        assert_eq!(second.handle().unwrap(), ids[1]);
        assert_eq!(second.remark(), "(li.item)[1]");
        assert_eq!(page.cached_entries(), 0);
    }

    #[test]
    fn click_all_clicks_each_match() {
        let (driver, page, _) = setup();
        let items = ITEMS.get(&page).unwrap();
        // "two" is hidden, so it never becomes clickable.
        assert!(matches!(items.click_all(), Err(PageError::Timeout(_))));
        assert_eq!(driver.clicks(), 1);
    }

    #[test]
    fn click_all_relocates_stale_matches() {
        let driver = Arc::new(MockDriver::new());
        let old: Vec<ElementId> = (0..2).map(|_| driver.add_element(MockElement::new())).collect();
        driver.set_matches(By::Css, "li.item", old.clone());
        let page = Page::new(driver.clone());
        let items = ITEMS.get(&page).unwrap();
        assert_eq!(items.quantity().unwrap(), 2);

        let fresh: Vec<ElementId> = (0..2).map(|_| driver.add_element(MockElement::new())).collect();
        old.iter().for_each(|id| driver.make_stale(id));
        driver.set_matches(By::Css, "li.item", fresh.clone());
        items.click_all().unwrap();
        assert_eq!(driver.clicks(), 2);
        assert_eq!(items.handles().unwrap(), fresh);
    }

    #[test]
    fn stale_reads_relocate_the_match_set() {
        let (driver, page, ids) = setup();
        let items = ITEMS.get(&page).unwrap();
        assert_eq!(items.quantity().unwrap(), 3);

        let fresh = driver.add_element(MockElement::new().texts(vec!["only"]));
        driver.make_stale(&ids[0]);
        driver.set_matches(By::Css, "li.item", vec![fresh]);
        assert_eq!(items.texts().unwrap(), vec!["only"]);
    }

    #[test]
    fn rebinding_is_per_instance() {
        let (driver, page, _) = setup();
        let other = Page::new(driver.clone());
        ITEMS.set(&page, (By::Css, "li")).unwrap();
        assert_eq!(ITEMS.locator(&page).unwrap().value(), "li");
        assert_eq!(ITEMS.locator(&other).unwrap().value(), "li.item");
    }
}
