use std::fmt;
use std::str::FromStr;

use thirtyfour::common::command::Selector;
use thirtyfour::By as W3cBy;

use crate::error::{configuration, PageError};

/// Locator strategy.
///
/// The strategy only says *how* to look an element up; the lookup string lives on the
/// [`Locator`](crate::Locator). Browser strategies come first, followed by the
/// Appium-only mobile strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum By {
    Id,
    Name,
    XPath,
    Css,
    Tag,
    ClassName,
    LinkText,
    PartialLinkText,
    AccessibilityId,
    AndroidUiAutomator,
    IosPredicate,
    IosClassChain,
}

impl By {
    pub const ALL: [By; 12] = [
        By::Id,
        By::Name,
        By::XPath,
        By::Css,
        By::Tag,
        By::ClassName,
        By::LinkText,
        By::PartialLinkText,
        By::AccessibilityId,
        By::AndroidUiAutomator,
        By::IosPredicate,
        By::IosClassChain,
    ];

    /// The strategy name as sent over the wire by Selenium / Appium clients.
    pub const fn strategy(&self) -> &'static str {
        match self {
            By::Id => "id",
            By::Name => "name",
            By::XPath => "xpath",
            By::Css => "css selector",
            By::Tag => "tag name",
            By::ClassName => "class name",
            By::LinkText => "link text",
            By::PartialLinkText => "partial link text",
            By::AccessibilityId => "accessibility id",
            By::AndroidUiAutomator => "-android uiautomator",
            By::IosPredicate => "-ios predicate string",
            By::IosClassChain => "-ios class chain",
        }
    }

    /// Whether this is one of the Appium-only strategies.
    pub const fn is_mobile(&self) -> bool {
        matches!(
            self,
            By::AccessibilityId | By::AndroidUiAutomator | By::IosPredicate | By::IosClassChain
        )
    }

    /// The selector for the W3C find-element endpoints.
    ///
    /// W3C browsers only understand css/xpath/tag/link strategies, so `Id`, `Name` and
    /// `ClassName` are rewritten as escaped CSS selectors. Appium servers accept every
    /// strategy natively, so pass `native = true` for them.
    pub fn to_selector(self, value: &str, native: bool) -> Selector {
        if native || self.is_mobile() {
            return Selector::new(self.strategy(), value);
        }
        match self {
            By::Id => Selector::new("css selector", &format!("[id={}]", css_string(value))),
            By::Name => Selector::new("css selector", &format!("[name={}]", css_string(value))),
            By::ClassName => Selector::new("css selector", &format!(".{}", css_identifier(value))),
            By::XPath => W3cBy::XPath(value).get_w3c_selector(),
            By::Css => W3cBy::Css(value).get_w3c_selector(),
            By::Tag => W3cBy::Tag(value).get_w3c_selector(),
            By::LinkText => W3cBy::LinkText(value).get_w3c_selector(),
            By::PartialLinkText => W3cBy::PartialLinkText(value).get_w3c_selector(),
            mobile => Selector::new(mobile.strategy(), value),
        }
    }
}

/// Quote a string for use inside a CSS attribute selector.
fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Escape a string for use as a CSS identifier, following `CSS.escape`.
fn css_identifier(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let leading_dash = value.starts_with('-');
    for (i, c) in value.chars().enumerate() {
        match c {
            '\0' => escaped.push('\u{fffd}'),
            '0'..='9' if i == 0 || (i == 1 && leading_dash) => {
                escaped.push_str(&format!("\\{:x} ", c as u32));
            }
            '-' if i == 0 && value.len() == 1 => escaped.push_str("\\-"),
            c if c.is_ascii_control() => escaped.push_str(&format!("\\{:x} ", c as u32)),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => escaped.push(c),
            c => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }
    escaped
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.strategy())
    }
}

impl FromStr for By {
    type Err = PageError;

    /// Accepts the wire names (`"css selector"`, `"accessibility id"`...) as well as the
    /// short forms (`"css"`, `"tag"`, `"class"`, `"accessibility_id"`...), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', " ");
        let by = match normalized.as_str() {
            "id" => By::Id,
            "name" => By::Name,
            "xpath" => By::XPath,
            "css" | "css selector" => By::Css,
            "tag" | "tag name" => By::Tag,
            "class" | "class name" => By::ClassName,
            "link text" => By::LinkText,
            "partial link text" => By::PartialLinkText,
            "accessibility id" => By::AccessibilityId,
            "-android uiautomator" | "android uiautomator" => By::AndroidUiAutomator,
            "-ios predicate string" | "ios predicate" => By::IosPredicate,
            "-ios class chain" | "ios class chain" => By::IosClassChain,
            _ => return Err(configuration(format!("the locator strategy {:?} is undefined", s))),
        };
        Ok(by)
    }
}
