use std::time::Duration;

use log::{debug, warn};
use thirtyfour::Keys;

use crate::by::By;
use crate::components::SelectElement;
use crate::driver::{Border, Driver, ElementId, ElementRect, Frame, Gesture, Point};
use crate::error::{no_such_element, PageError, PageResult};
use crate::locator::{Declaration, IntoLocator, Locator};
use crate::page::{Bound, DescriptorKey, PageObject, Resolved};
use crate::query::conditions::{self, Lookup};
use crate::query::ElementWaiter;

/// A declared single-element attribute of a page type.
///
/// An `Element` is a plain constant: it is shared by every instance of the page type and
/// holds no state of its own. Reading it through a page with [`get`](Element::get) gives an
/// [`ElementRef`] whose resolved handle is cached on that page instance.
///
/// ```
/// use std::time::Duration;
/// use thirtyfour_pages::{By, Element};
///
/// const SAVE: Element = Element::new("save", By::Css, "button.save")
///     .timeout(Duration::from_secs(5))
///     .remark("save button");
/// // Declared now, bound later with `Element::set`.
/// const RESULT_ROW: Element = Element::unbound("result_row");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    attribute: &'static str,
    declaration: Option<Declaration>,
}

impl Element {
    pub const fn new(attribute: &'static str, by: By, value: &'static str) -> Self {
        Self {
            attribute,
            declaration: Some(Declaration::new(by, value)),
        }
    }

    /// Declare the attribute without a locator. Reading it fails with
    /// [`PageError::UnboundLocator`] until one is bound with [`set`](Element::set).
    pub const fn unbound(attribute: &'static str) -> Self {
        Self {
            attribute,
            declaration: None,
        }
    }

    pub const fn index(self, index: usize) -> Self {
        Self {
            declaration: match self.declaration {
                Some(d) => Some(d.index(index)),
                None => None,
            },
            ..self
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

    /// The locator in effect for `owner`: a runtime binding if there is one, otherwise the
    /// declared one.
    pub fn locator<P: PageObject + ?Sized>(&self, owner: &P) -> PageResult<Locator> {
        resolve_locator(owner, DescriptorKey::new(self.attribute), self.declaration)
    }

    /// Read the attribute through `owner`.
    ///
    /// This never touches the driver. It fails only if no locator is bound or the declared
    /// one is invalid; lookup failures surface when an operation is attempted on the result.
    pub fn get<'p, P: PageObject + ?Sized>(&self, owner: &'p P) -> PageResult<ElementRef<'p>> {
        let key = DescriptorKey::new(self.attribute);
        let locator = resolve_locator(owner, key, self.declaration)?;
        Ok(ElementRef::new(Bound::shared(owner.page(), key, locator)))
    }

    /// Bind a new locator for `owner` only. Other page instances are unaffected.
    ///
    /// Tuples are read positionally as `(by, value, index, timeout, poll_interval, remark)`.
    pub fn set<P, L>(&self, owner: &P, locator: L) -> PageResult<()>
    where
        P: PageObject + ?Sized,
        L: IntoLocator,
    {
        let locator = locator.into_locator()?;
        owner.page().rebind(DescriptorKey::new(self.attribute), locator);
        Ok(())
    }

    /// Forget the cached handle for `owner`, so the next operation looks the element up again.
    pub fn relocate<'p, P: PageObject + ?Sized>(&self, owner: &'p P) -> PageResult<ElementRef<'p>> {
        owner.page().invalidate(DescriptorKey::new(self.attribute));
        self.get(owner)
    }
}

pub(crate) fn resolve_locator<P: PageObject + ?Sized>(
    owner: &P,
    key: DescriptorKey,
    declaration: Option<Declaration>,
) -> PageResult<Locator> {
    if let Some(locator) = owner.page().binding(key) {
        return Ok(locator);
    }
    match declaration {
        Some(d) => d.to_locator(),
        None => Err(PageError::UnboundLocator {
            attribute: key.to_string(),
        }),
    }
}

const SUBMIT_SCRIPT: &str = "var f = arguments[0].form || arguments[0]; \
    if (f.requestSubmit) { f.requestSubmit(); } else { f.submit(); }";

/// A resolvable single element on one page instance.
///
/// The handle is looked up lazily by the first operation that needs it (waiting for
/// presence), then cached. Actions wait for their own precondition first; for example
/// [`click`](ElementRef::click) waits until the element is clickable.
#[derive(Debug)]
pub struct ElementRef<'p> {
    bound: Bound<'p>,
}

impl<'p> ElementRef<'p> {
    pub(crate) fn new(bound: Bound<'p>) -> Self {
        Self {
            bound,
        }
    }

    pub(crate) fn bound(&self) -> &Bound<'p> {
        &self.bound
    }

    pub(crate) fn driver(&self) -> &'p dyn Driver {
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

    /// Return an ElementWaiter for more powerful explicit waits, starting from the
    /// locator's own timeout and poll interval.
    pub fn wait_until(&self) -> ElementWaiter<'_, 'p> {
        ElementWaiter::new(self, self.locator().poller())
    }

    /// The live handle: the cached one, or the result of waiting for presence.
    ///
    /// A presence timeout is reported as [`PageError::NoSuchElement`].
    pub fn handle(&self) -> PageResult<ElementId> {
        if let Some(id) = self.bound.cached_one() {
            return Ok(id);
        }
        self.wait_until().present().map_err(|e| match e {
            PageError::Timeout(message) => PageError::NoSuchElement(message),
            e => e,
        })
    }

    /// Look the element up once, without waiting. `None` if it is not there right now.
    pub fn locate_now(&self) -> PageResult<Option<ElementId>> {
        match conditions::locate(self.driver(), self.locator())? {
            Lookup::Found(id) => {
                self.bound.store(Resolved::One(id.clone()));
                Ok(Some(id))
            }
            Lookup::Missing {
                ..
            } => {
                self.bound.invalidate();
                Ok(None)
            }
        }
    }

    /// Drop the cached handle and wait for a fresh one.
    pub fn relocate(&self) -> PageResult<ElementId> {
        self.bound.invalidate();
        self.handle()
    }

    /// Run `op` on a handle from `resolve`, retrying once with a fresh handle if the first
    /// one turns out to be stale.
    fn retry_stale<T, R, F>(&self, op: &str, resolve: R, f: F) -> PageResult<T>
    where
        R: Fn(&Self) -> PageResult<ElementId>,
        F: Fn(&dyn Driver, &ElementId) -> PageResult<T>,
    {
        let id = resolve(self)?;
        match f(self.driver(), &id) {
            Err(e) if e.is_stale() => {
                warn!("{}: stale handle during {}, relocating", self.remark(), op);
                self.bound.invalidate();
                let id = resolve(self)?;
                f(self.driver(), &id)
            }
            r => r,
        }
    }

    fn read<T, F>(&self, op: &str, f: F) -> PageResult<T>
    where
        F: Fn(&dyn Driver, &ElementId) -> PageResult<T>,
    {
        self.retry_stale(op, Self::handle, f)
    }

    fn clickable_handle(&self) -> PageResult<ElementId> {
        self.wait_until().clickable()?;
        self.handle()
    }

    /// The clickable handle, or the present one if the element never becomes clickable.
    fn input_handle(&self) -> PageResult<ElementId> {
        if self.wait_until().is_clickable()? {
            return self.handle();
        }
        debug!("{}: not clickable, falling back to the present element", self.remark());
        self.bound.cached_one().ok_or_else(|| no_such_element(&self.remark()))
    }

    pub fn wait_present(&self) -> PageResult<&Self> {
        self.wait_until().present()?;
        Ok(self)
    }

    pub fn wait_absent(&self) -> PageResult<&Self> {
        self.wait_until().absent()?;
        Ok(self)
    }

    pub fn wait_visible(&self) -> PageResult<&Self> {
        self.wait_until().visible()?;
        Ok(self)
    }

    pub fn wait_invisible(&self) -> PageResult<&Self> {
        self.wait_until().invisible()?;
        Ok(self)
    }

    pub fn wait_clickable(&self) -> PageResult<&Self> {
        self.wait_until().clickable()?;
        Ok(self)
    }

    pub fn wait_unclickable(&self) -> PageResult<&Self> {
        self.wait_until().unclickable()?;
        Ok(self)
    }

    pub fn wait_selected(&self) -> PageResult<&Self> {
        self.wait_until().selected()?;
        Ok(self)
    }

    pub fn wait_unselected(&self) -> PageResult<&Self> {
        self.wait_until().unselected()?;
        Ok(self)
    }

    pub fn is_present(&self) -> PageResult<bool> {
        self.wait_until().is_present()
    }

    pub fn is_absent(&self) -> PageResult<bool> {
        self.wait_until().is_absent()
    }

    pub fn is_visible(&self) -> PageResult<bool> {
        self.wait_until().is_visible()
    }

    pub fn is_invisible(&self) -> PageResult<bool> {
        self.wait_until().is_invisible()
    }

    pub fn is_clickable(&self) -> PageResult<bool> {
        self.wait_until().is_clickable()
    }

    pub fn is_selected(&self) -> PageResult<bool> {
        self.wait_until().is_selected()
    }

    pub fn is_unselected(&self) -> PageResult<bool> {
        self.wait_until().is_unselected()
    }

    /// Whether the element is displayed right now. No waiting beyond resolution.
    pub fn is_displayed(&self) -> PageResult<bool> {
        self.read("is_displayed", |d, id| d.is_displayed(id))
    }

    /// Whether the element is enabled right now. No waiting beyond resolution.
    pub fn is_enabled(&self) -> PageResult<bool> {
        self.read("is_enabled", |d, id| d.is_enabled(id))
    }

    pub fn text(&self) -> PageResult<String> {
        self.read("text", |d, id| d.text(id))
    }

    /// Wait until the element is visible, then return its text.
    pub fn visible_text(&self) -> PageResult<String> {
        self.wait_until().visible()?;
        self.text()
    }

    pub fn tag_name(&self) -> PageResult<String> {
        self.read("tag_name", |d, id| d.tag_name(id))
    }

    pub fn attribute(&self, name: &str) -> PageResult<Option<String>> {
        self.read("attribute", |d, id| d.attribute(id, name))
    }

    pub fn property(&self, name: &str) -> PageResult<Option<String>> {
        self.read("property", |d, id| d.property(id, name))
    }

    pub fn css_value(&self, name: &str) -> PageResult<String> {
        self.read("css_value", |d, id| d.css_value(id, name))
    }

    pub fn rect(&self) -> PageResult<ElementRect> {
        self.read("rect", |d, id| d.rect(id))
    }

    pub fn center(&self) -> PageResult<Point> {
        Ok(self.rect()?.center())
    }

    pub fn border(&self) -> PageResult<Border> {
        Ok(self.rect()?.border())
    }

    /// Wait until the element is clickable, then click it.
    pub fn click(&self) -> PageResult<&Self> {
        self.retry_stale("click", Self::clickable_handle, |d, id| d.click(id))?;
        Ok(self)
    }

    /// Clear the element's contents.
    pub fn clear(&self) -> PageResult<&Self> {
        self.retry_stale("clear", Self::input_handle, |d, id| d.clear(id))?;
        Ok(self)
    }

    /// Type `text` into the element.
    pub fn send_keys<S: AsRef<str>>(&self, text: S) -> PageResult<&Self> {
        let text = text.as_ref();
        self.retry_stale("send_keys", Self::input_handle, |d, id| d.send_keys(id, text))?;
        Ok(self)
    }

    /// Submit the form the element belongs to, or the element itself if it is a form.
    pub fn submit(&self) -> PageResult<&Self> {
        self.read("submit", |d, id| d.execute_script(SUBMIT_SCRIPT, vec![id.to_json()]))?;
        Ok(self)
    }

    fn press(&self, op: &str, keys: &str) -> PageResult<&Self> {
        self.retry_stale(op, Self::input_handle, |d, id| d.send_keys(id, keys))?;
        Ok(self)
    }

    pub fn enter(&self) -> PageResult<&Self> {
        self.press("enter", &char::from(Keys::Enter).to_string())
    }

    pub fn tab(&self) -> PageResult<&Self> {
        self.press("tab", &char::from(Keys::Tab).to_string())
    }

    pub fn backspace(&self) -> PageResult<&Self> {
        self.press("backspace", &char::from(Keys::Backspace).to_string())
    }

    /// Select the element's whole contents with Ctrl+A.
    pub fn select_all(&self) -> PageResult<&Self> {
        self.press("select_all", &format!("{}a", char::from(Keys::Control)))
    }

    /// Move the pointer to the element's center.
    pub fn move_to(&self) -> PageResult<&Self> {
        self.read("move_to", |d, id| d.perform(Gesture::MoveTo(id)))?;
        Ok(self)
    }

    pub fn double_click(&self) -> PageResult<&Self> {
        self.retry_stale("double_click", Self::clickable_handle, |d, id| {
            d.perform(Gesture::DoubleClick(id))
        })?;
        Ok(self)
    }

    pub fn context_click(&self) -> PageResult<&Self> {
        self.retry_stale("context_click", Self::clickable_handle, |d, id| {
            d.perform(Gesture::ContextClick(id))
        })?;
        Ok(self)
    }

    /// Press the pointer on this element, move it onto `target` and release it there.
    pub fn drag_and_drop_to(&self, target: &ElementRef<'_>) -> PageResult<&Self> {
        let to = target.handle()?;
        let dropped = self.read("drag_and_drop", |d, id| {
            d.perform(Gesture::DragAndDrop {
                source: id,
                target: &to,
            })
        });
        match dropped {
            Err(e) if e.is_stale() => {
                warn!("{}: stale drop target, relocating", target.remark());
                let to = target.relocate()?;
                let from = self.handle()?;
                self.driver().perform(Gesture::DragAndDrop {
                    source: &from,
                    target: &to,
                })?;
            }
            r => r?,
        }
        Ok(self)
    }

    /// Switch the page into this `<iframe>` or `<frame>`. Every cached handle on the page
    /// is dropped, since they belong to the outer document.
    pub fn switch_to_frame(&self) -> PageResult<()> {
        let id = self.handle()?;
        match self.bound.page().switch_frame(Frame::Element(&id)) {
            Err(e) if e.is_stale() => {
                warn!("{}: stale frame handle, relocating", self.remark());
                let id = self.relocate()?;
                self.bound.page().switch_frame(Frame::Element(&id))
            }
            r => r,
        }
    }

    /// Treat the element as a `<select>`.
    pub fn select(&self) -> PageResult<SelectElement<'_, 'p>> {
        SelectElement::new(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mock::{MockDriver, MockElement};
    use crate::page::Page;

    const NAME: Element = Element::new("name", By::Id, "name")
        .timeout(Duration::from_millis(200))
        .poll_interval(Duration::from_millis(10));
    const LATER: Element = Element::unbound("later");

    fn setup() -> (Arc<MockDriver>, Page) {
        let driver = Arc::new(MockDriver::new());
        let page = Page::new(driver.clone());
        (driver, page)
    }

    #[test]
    fn reading_never_queries_the_driver() {
        let (driver, page) = setup();
        let name = NAME.get(&page).unwrap();
        assert_eq!(name.remark(), "name");
        assert_eq!(driver.find_count(), 0);
    }

    #[test]
    fn unbound_reads_fail() {
        let (_, page) = setup();
        match LATER.get(&page) {
            Err(PageError::UnboundLocator {
                attribute,
            }) => assert_eq!(attribute, "later"),
            r => panic!("unexpected result: {:?}", r),
        }
    }

    #[test]
    fn missing_element_fails_on_use() {
        let (_, page) = setup();
        let name = NAME.get(&page).unwrap();
        assert!(matches!(name.text(), Err(PageError::NoSuchElement(_))));
    }

    #[test]
    fn click_waits_for_clickable() {
        let (driver, page) = setup();
        let id = driver.add_element(MockElement::new().enabled_states(vec![false, false, true]));
        driver.set_matches(By::Id, "name", vec![id]);
        NAME.get(&page).unwrap().click().unwrap();
        assert_eq!(driver.clicks(), 1);
    }

    #[test]
    fn typing_falls_back_to_the_present_element() {
        let (driver, page) = setup();
        let id = driver.add_element(MockElement::new().enabled(false));
        driver.set_matches(By::Id, "name", vec![id.clone()]);
        NAME.get(&page).unwrap().clear().unwrap().send_keys("bob").unwrap();
        assert_eq!(driver.typed_text(&id), "bob");
    }

    #[test]
    fn stale_handles_are_retried_once() {
        let (driver, page) = setup();
        let old = driver.add_element(MockElement::new().texts(vec!["old"]));
        driver.set_matches(By::Id, "name", vec![old.clone()]);
        let name = NAME.get(&page).unwrap();
        assert_eq!(name.text().unwrap(), "old");

        let fresh = driver.add_element(MockElement::new().texts(vec!["fresh"]));
        driver.make_stale(&old);
        driver.set_matches(By::Id, "name", vec![fresh]);
        assert_eq!(name.text().unwrap(), "fresh");
    }

    #[test]
    fn locate_now_does_not_wait() {
        let (driver, page) = setup();
        let name = NAME.get(&page).unwrap();
        assert_eq!(name.locate_now().unwrap(), None);
        assert_eq!(driver.find_count(), 1);
        let id = driver.add_element(MockElement::new());
        driver.set_matches(By::Id, "name", vec![id.clone()]);
        assert_eq!(name.locate_now().unwrap(), Some(id));
        assert_eq!(page.cached_entries(), 1);
    }

    #[test]
    fn geometry() {
        let (driver, page) = setup();
        let id = driver.add_element(MockElement::new().rect(ElementRect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 4.0,
        }));
        driver.set_matches(By::Id, "name", vec![id]);
        let name = NAME.get(&page).unwrap();
        assert_eq!(
            name.center().unwrap(),
            Point {
                x: 5,
                y: 2
            }
        );
        assert_eq!(name.border().unwrap().right, 10);
    }

    #[test]
    fn submit_runs_against_the_element() {
        let (driver, page) = setup();
        let id = driver.add_element(MockElement::new().tag("input"));
        driver.set_matches(By::Id, "name", vec![id]);
        NAME.get(&page).unwrap().submit().unwrap();
        let scripts = driver.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("requestSubmit"));
    }

    #[test]
    fn keyboard_helpers() {
        let (driver, page) = setup();
        let id = driver.add_element(MockElement::new().tag("input"));
        driver.set_matches(By::Id, "name", vec![id.clone()]);
        let name = NAME.get(&page).unwrap();
        name.send_keys("bob").unwrap().select_all().unwrap().backspace().unwrap();
        name.tab().unwrap().enter().unwrap();
        let expected = format!(
            "bob{}a{}{}{}",
            char::from(Keys::Control),
            char::from(Keys::Backspace),
            char::from(Keys::Tab),
            char::from(Keys::Enter)
        );
        assert_eq!(driver.typed_text(&id), expected);
    }

    #[test]
    fn gestures() {
        let (driver, page) = setup();
        let source = driver.add_element(MockElement::new());
        let target = driver.add_element(MockElement::new());
        driver.set_matches(By::Id, "name", vec![source.clone()]);
        driver.set_matches(By::Css, ".bin", vec![target.clone()]);
        let bin = Element::new("bin", By::Css, ".bin").timeout(Duration::from_millis(100));

        let name = NAME.get(&page).unwrap();
        name.move_to().unwrap().double_click().unwrap().context_click().unwrap();
        name.drag_and_drop_to(&bin.get(&page).unwrap()).unwrap();
        assert_eq!(
            driver.gestures(),
            vec![
                format!("move_to {}", source),
                format!("double_click {}", source),
                format!("context_click {}", source),
                format!("drag_and_drop {} {}", source, target),
            ]
        );
    }

    #[test]
    fn stale_gestures_are_retried_once() {
        let (driver, page) = setup();
        let old = driver.add_element(MockElement::new());
        driver.set_matches(By::Id, "name", vec![old.clone()]);
        let name = NAME.get(&page).unwrap();
        name.handle().unwrap();

        let fresh = driver.add_element(MockElement::new());
        driver.make_stale(&old);
        driver.set_matches(By::Id, "name", vec![fresh.clone()]);
        name.double_click().unwrap();
        assert_eq!(driver.gestures(), vec![format!("double_click {}", fresh)]);
    }

    #[test]
    fn switching_into_a_frame_drops_the_cache() {
        let (driver, page) = setup();
        let frame = driver.add_element(MockElement::new().tag("iframe"));
        driver.set_matches(By::Id, "name", vec![frame.clone()]);
        NAME.get(&page).unwrap().switch_to_frame().unwrap();
        assert_eq!(driver.frames(), vec![frame.to_string()]);
        assert_eq!(page.cached_entries(), 0);
    }
}
