use std::fmt;

use crate::driver::{Driver, ElementId, SearchContext};
use crate::error::PageResult;
use crate::locator::Locator;

/// A state an element can be waited into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementState {
    Visible,
    Invisible,
    Enabled,
    Disabled,
    /// Displayed and enabled.
    Clickable,
    Unclickable,
    Selected,
    Unselected,
}

impl ElementState {
    pub fn check(self, driver: &dyn Driver, element: &ElementId) -> PageResult<bool> {
        match self {
            ElementState::Visible => driver.is_displayed(element),
            ElementState::Invisible => driver.is_displayed(element).map(|x| !x),
            ElementState::Enabled => driver.is_enabled(element),
            ElementState::Disabled => driver.is_enabled(element).map(|x| !x),
            ElementState::Clickable => is_clickable(driver, element),
            ElementState::Unclickable => is_clickable(driver, element).map(|x| !x),
            ElementState::Selected => driver.is_selected(element),
            ElementState::Unselected => driver.is_selected(element).map(|x| !x),
        }
    }

    /// The opposite state.
    pub fn negate(self) -> Self {
        match self {
            ElementState::Visible => ElementState::Invisible,
            ElementState::Invisible => ElementState::Visible,
            ElementState::Enabled => ElementState::Disabled,
            ElementState::Disabled => ElementState::Enabled,
            ElementState::Clickable => ElementState::Unclickable,
            ElementState::Unclickable => ElementState::Clickable,
            ElementState::Selected => ElementState::Unselected,
            ElementState::Unselected => ElementState::Selected,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ElementState::Visible => "visible",
            ElementState::Invisible => "invisible",
            ElementState::Enabled => "enabled",
            ElementState::Disabled => "disabled",
            ElementState::Clickable => "clickable",
            ElementState::Unclickable => "unclickable",
            ElementState::Selected => "selected",
            ElementState::Unselected => "unselected",
        }
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn is_clickable(driver: &dyn Driver, element: &ElementId) -> PageResult<bool> {
    Ok(driver.is_displayed(element)? && driver.is_enabled(element)?)
}

/// Result of a single indexed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup {
    Found(ElementId),
    /// The indexed match does not exist; `len` elements matched.
    Missing { len: usize },
}

/// All current matches for `locator`, ignoring its index.
pub(crate) fn locate_all(driver: &dyn Driver, locator: &Locator) -> PageResult<Vec<ElementId>> {
    driver.find_elements(SearchContext::Root, locator.by(), locator.value())
}

/// The match at the locator's index (first match by default).
pub(crate) fn locate(driver: &dyn Driver, locator: &Locator) -> PageResult<Lookup> {
    let mut matches = locate_all(driver, locator)?;
    let index = locator.index().unwrap_or(0);
    if index < matches.len() {
        Ok(Lookup::Found(matches.swap_remove(index)))
    } else {
        Ok(Lookup::Missing {
            len: matches.len(),
        })
    }
}
