// This wrapper is a fairly direct port of the Select class from the python
// selenium library at:
// https://github.com/SeleniumHQ/selenium/blob/trunk/py/selenium/webdriver/support/select.py

// Copyright 2021 Stephen Pryde and the thirtyfour_sync contributors
// Derived (and modified) from the Selenium project at https://github.com/SeleniumHQ/selenium.
//
// Copyright 2011-2020 Software Freedom Conservancy
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::by::By;
use crate::driver::{Driver, ElementId, SearchContext};
use crate::element::ElementRef;
use crate::error::{no_such_element, PageError, PageResult};

/// Set the selection state of the specified option.
fn set_selected(driver: &dyn Driver, option: &ElementId, select: bool) -> PageResult<()> {
    if driver.is_selected(option)? != select {
        driver.click(option)?;
    }
    Ok(())
}

/// Escape the specified string for use in Css or XPath selector.
pub fn escape_string(value: &str) -> String {
    let contains_single = value.contains('\'');
    let contains_double = value.contains('\"');
    if contains_single && contains_double {
        let mut result = vec![String::from("concat(")];
        for substring in value.split('\"') {
            result.push(format!("\"{}\"", substring));
            result.push(String::from(", '\"', "));
        }
        result.pop();
        if value.ends_with('\"') {
            result.push(String::from(", '\"'"));
        }
        return result.join("") + ")";
    }

    if contains_double {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}

/// Get the longest word in the specified string.
fn get_longest_token(value: &str) -> &str {
    let mut longest = "";
    for item in value.split(' ') {
        if item.len() > longest.len() {
            longest = item;
        }
    }
    longest
}

/// Convenience wrapper for `<select>` elements, obtained from [`ElementRef::select`].
///
/// Options are returned as raw handles; use the page's driver to inspect them further.
#[derive(Debug)]
pub struct SelectElement<'e, 'p> {
    element: &'e ElementRef<'p>,
    handle: ElementId,
    multiple: bool,
}

impl<'e, 'p> SelectElement<'e, 'p> {
    /// Wrap `element`, which must resolve to a `<select>`.
    pub fn new(element: &'e ElementRef<'p>) -> PageResult<Self> {
        let tag = element.tag_name()?;
        if !tag.eq_ignore_ascii_case("select") {
            return Err(PageError::InvalidArgument(format!(
                "{} is a <{}>, not a <select>",
                element.remark(),
                tag
            )));
        }
        let multiple = element.attribute("multiple")?.filter(|x| x != "false").is_some();
        let handle = element.handle()?;
        Ok(SelectElement {
            element,
            handle,
            multiple,
        })
    }

    fn driver(&self) -> &'p dyn Driver {
        self.element.driver()
    }

    fn find(&self, by: By, value: &str) -> PageResult<Vec<ElementId>> {
        self.driver().find_elements(SearchContext::Element(&self.handle), by, value)
    }

    fn require_multiple(&self, what: &str) -> PageResult<()> {
        if self.multiple {
            Ok(())
        } else {
            Err(PageError::InvalidArgument(format!("You may only {} of a multi-select", what)))
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Return a vec of all options belonging to this select tag.
    pub fn options(&self) -> PageResult<Vec<ElementId>> {
        self.find(By::Tag, "option")
    }

    /// Return a vec of all selected options belonging to this select tag.
    pub fn all_selected_options(&self) -> PageResult<Vec<ElementId>> {
        let mut selected = Vec::new();
        for option in self.options()? {
            if self.driver().is_selected(&option)? {
                selected.push(option);
            }
        }
        Ok(selected)
    }

    /// Return the first selected option in this select tag.
    pub fn first_selected_option(&self) -> PageResult<ElementId> {
        for option in self.options()? {
            if self.driver().is_selected(&option)? {
                return Ok(option);
            }
        }
        Err(no_such_element("No options are selected"))
    }

    /// Text of the first selected option.
    pub fn selected_text(&self) -> PageResult<String> {
        let option = self.first_selected_option()?;
        self.driver().text(&option)
    }

    /// Set selection state for all options.
    fn set_selection_all(&self, select: bool) -> PageResult<()> {
        for option in self.options()? {
            set_selected(self.driver(), &option, select)?;
        }
        Ok(())
    }

    /// Set the selection state of options matching the specified value.
    fn set_selection_by_value(&self, value: &str, select: bool) -> PageResult<()> {
        let selector = format!("option[value={}]", escape_string(value));
        let options = self.find(By::Css, &selector)?;
        if options.is_empty() {
            return Err(no_such_element(&format!("Could not locate element with value: {}", value)));
        }
        for option in options {
            set_selected(self.driver(), &option, select)?;
            if !self.multiple {
                break;
            }
        }
        Ok(())
    }

    /// Set the selection state of the option at the specified index. This is done by examining
    /// the "index" property of an element and not merely by counting.
    fn set_selection_by_index(&self, index: u32, select: bool) -> PageResult<()> {
        let str_index: String = index.to_string();
        for option in self.options()? {
            if self.driver().property(&option, "index")?.filter(|i| i == &str_index).is_some() {
                set_selected(self.driver(), &option, select)?;
                return Ok(());
            }
        }
        Err(no_such_element(&format!("Could not locate element with index {}", index)))
    }

    /// Set the selection state of options that display text matching the specified text.
    /// That is, when given "Bar" this would select an option like:
    ///
    /// `<option value="foo">Bar</option>`
    fn set_selection_by_visible_text(&self, text: &str, select: bool) -> PageResult<()> {
        let xpath = format!(".//option[normalize-space(.) = {}]", escape_string(text));
        let options = match self.find(By::XPath, &xpath) {
            Ok(elems) => elems,
            Err(PageError::NoSuchElement(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut matched = false;
        for option in &options {
            set_selected(self.driver(), option, select)?;
            if !self.multiple {
                return Ok(());
            }
            matched = true;
        }

        if options.is_empty() && text.contains(' ') {
            let substring_without_space = get_longest_token(text);
            let candidates = if substring_without_space.is_empty() {
                self.options()?
            } else {
                let xpath =
                    format!(".//option[contains(.,{})]", escape_string(substring_without_space));
                self.find(By::XPath, &xpath)?
            };
            for candidate in candidates {
                if text == self.driver().text(&candidate)? {
                    set_selected(self.driver(), &candidate, select)?;
                    if !self.multiple {
                        return Ok(());
                    }
                    matched = true;
                }
            }
        }

        if !matched {
            Err(no_such_element(&format!("Could not locate element with visible text: {}", text)))
        } else {
            Ok(())
        }
    }

    /// Select all options for this select tag.
    pub fn select_all(&self) -> PageResult<()> {
        self.require_multiple("select all options")?;
        self.set_selection_all(true)
    }

    /// Select options matching the specified value.
    pub fn select_by_value(&self, value: &str) -> PageResult<()> {
        self.set_selection_by_value(value, true)
    }

    /// Select the option matching the specified index. This is done by examining
    /// the "index" property of an element and not merely by counting.
    pub fn select_by_index(&self, index: u32) -> PageResult<()> {
        self.set_selection_by_index(index, true)
    }

    /// Select options with visible text matching the specified text.
    pub fn select_by_visible_text(&self, text: &str) -> PageResult<()> {
        self.set_selection_by_visible_text(text, true)
    }

    /// Deselect all options for this select tag.
    pub fn deselect_all(&self) -> PageResult<()> {
        self.require_multiple("deselect all options")?;
        self.set_selection_all(false)
    }

    /// Deselect options matching the specified value.
    pub fn deselect_by_value(&self, value: &str) -> PageResult<()> {
        self.require_multiple("deselect options")?;
        self.set_selection_by_value(value, false)
    }

    /// Deselect the option matching the specified index.
    pub fn deselect_by_index(&self, index: u32) -> PageResult<()> {
        self.require_multiple("deselect options")?;
        self.set_selection_by_index(index, false)
    }

    /// Deselect options with visible text matching the specified text.
    pub fn deselect_by_visible_text(&self, text: &str) -> PageResult<()> {
        self.require_multiple("deselect options")?;
        self.set_selection_by_visible_text(text, false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::element::Element;
    use crate::mock::{MockDriver, MockElement};
    use crate::page::Page;

    const COLOUR: Element = Element::new("colour", By::Id, "colour");

    fn select_fixture(multiple: bool) -> (Arc<MockDriver>, Page, Vec<ElementId>) {
        let driver = Arc::new(MockDriver::new());
        let mut select = MockElement::new().tag("select");
        if multiple {
            select = select.attribute("multiple", "true");
        }
        let select = driver.add_element(select);
        driver.set_matches(By::Id, "colour", vec![select.clone()]);

        let options: Vec<ElementId> = [("r", "Dark Red"), ("g", "Green"), ("b", "Blue")]
            .iter()
            .enumerate()
            .map(|(i, (value, text))| {
                driver.add_element(
                    MockElement::new()
                        .tag("option")
                        .texts(vec![*text])
                        .attribute("value", *value)
                        .property("index", i.to_string()),
                )
            })
            .collect();
        driver.set_child_matches(&select, By::Tag, "option", options.clone());
        driver.set_child_matches(&select, By::Css, "option[value=\"g\"]", vec![options[1].clone()]);
        driver.set_child_matches(
            &select,
            By::XPath,
            ".//option[contains(.,\"Dark\")]",
            vec![options[0].clone()],
        );
        let page = Page::new(driver.clone());
        (driver, page, options)
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_string("plain"), "\"plain\"");
        assert_eq!(escape_string("say \"hi\""), "'say \"hi\"'");
        assert_eq!(
            escape_string("it's \"x\" here"),
            "concat(\"it's \", '\"', \"x\", '\"', \" here\")"
        );
        assert_eq!(get_longest_token("a longest b"), "longest");
    }

    #[test]
    fn select_single_options() {
        let (driver, page, options) = select_fixture(false);
        let colour = COLOUR.get(&page).unwrap();
        let select = colour.select().unwrap();
        assert!(!select.is_multiple());

        select.select_by_value("g").unwrap();
        assert_eq!(select.first_selected_option().unwrap(), options[1]);

        select.select_by_index(2).unwrap();
        assert_eq!(select.all_selected_options().unwrap(), vec![options[1].clone(), options[2].clone()]);

        // Falls back to the longest token when no option matches exactly.
        select.select_by_visible_text("Dark Red").unwrap();
        assert!(driver.is_selected(&options[0]).unwrap());
        assert_eq!(select.selected_text().unwrap(), "Dark Red");

        assert!(matches!(select.select_by_value("x"), Err(PageError::NoSuchElement(_))));
        assert!(matches!(select.deselect_all(), Err(PageError::InvalidArgument(_))));
    }

    #[test]
    fn select_all_on_multi_select() {
        let (driver, page, options) = select_fixture(true);
        let colour = COLOUR.get(&page).unwrap();
        let select = colour.select().unwrap();
        select.select_all().unwrap();
        assert_eq!(select.all_selected_options().unwrap().len(), 3);
        select.deselect_by_index(0).unwrap();
        assert!(!driver.is_selected(&options[0]).unwrap());
        select.deselect_all().unwrap();
        assert!(select.all_selected_options().unwrap().is_empty());
    }

    #[test]
    fn rejects_non_select_elements() {
        let driver = Arc::new(MockDriver::new());
        let div = driver.add_element(MockElement::new());
        driver.set_matches(By::Id, "colour", vec![div]);
        let page = Page::new(driver.clone());
        let colour = COLOUR.get(&page).unwrap();
        assert!(matches!(colour.select(), Err(PageError::InvalidArgument(_))));
    }
}
