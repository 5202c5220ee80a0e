use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::by::By;
use crate::config;
use crate::error::{configuration, PageResult};
use crate::query::ElementPoller;

/// A validated, immutable element locator.
///
/// Positional (tuple) configuration always uses this order:
/// `(by, value, index, timeout, poll_interval, remark)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    by: By,
    value: String,
    index: Option<usize>,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    remark: Option<String>,
}

impl Locator {
    /// Shorthand for `Locator::builder(by, value).build()`.
    pub fn new<S: Into<String>>(by: By, value: S) -> PageResult<Self> {
        Self::builder(by, value).build()
    }

    pub fn builder<S: Into<String>>(by: By, value: S) -> LocatorBuilder {
        LocatorBuilder {
            by,
            value: value.into(),
            index: None,
            timeout: None,
            poll_interval: None,
            remark: None,
        }
    }

    pub fn by(&self) -> By {
        self.by
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The match to pick when a singular lookup finds several elements. `None` means first.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Timeout override, if any.
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Poll interval override, if any.
    pub fn poll_interval_override(&self) -> Option<Duration> {
        self.poll_interval
    }

    /// Effective timeout, falling back to the process-wide default.
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or_else(|| config::defaults().timeout())
    }

    /// Effective poll interval, falling back to the process-wide default.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.unwrap_or_else(|| config::defaults().poll_interval())
    }

    pub fn poller(&self) -> ElementPoller {
        ElementPoller::TimeoutWithInterval(self.timeout(), self.poll_interval())
    }

    /// A copy of this locator pointing at the match at `index`.
    pub fn with_index(&self, index: usize) -> Locator {
        Locator {
            index: Some(index),
            ..self.clone()
        }
    }

    /// Human-readable name used in logs and error messages.
    pub fn remark(&self) -> String {
        match (&self.remark, self.index) {
            (Some(remark), _) => remark.clone(),
            (None, Some(index)) => format!("({})[{}]", self.value, index),
            (None, None) => self.value.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}={:?}[{}]", self.by, self.value, index),
            None => write!(f, "{}={:?}", self.by, self.value),
        }
    }
}

/// Builder for [`Locator`]. All validation happens in [`build`](LocatorBuilder::build).
#[derive(Debug, Clone)]
pub struct LocatorBuilder {
    by: By,
    value: String,
    index: Option<usize>,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    remark: Option<String>,
}

impl LocatorBuilder {
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn remark<S: Into<String>>(mut self, remark: S) -> Self {
        self.remark = Some(remark.into());
        self
    }

    pub fn build(self) -> PageResult<Locator> {
        if self.value.is_empty() {
            return Err(configuration(format!("the {} locator value must not be empty", self.by)));
        }
        if self.timeout.map_or(false, |t| t.is_zero()) {
            return Err(configuration(format!(
                "timeout for {:?} must be greater than zero",
                self.value
            )));
        }
        if self.poll_interval.map_or(false, |t| t.is_zero()) {
            return Err(configuration(format!(
                "poll interval for {:?} must be greater than zero",
                self.value
            )));
        }
        Ok(Locator {
            by: self.by,
            value: self.value,
            index: self.index,
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            remark: self.remark,
        })
    }
}

/// Const-friendly locator configuration, used by statically declared descriptors.
///
/// It is validated when it is turned into a [`Locator`], i.e. the first time the
/// descriptor is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    by: By,
    value: &'static str,
    index: Option<usize>,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    remark: Option<&'static str>,
}

impl Declaration {
    pub const fn new(by: By, value: &'static str) -> Self {
        Self {
            by,
            value,
            index: None,
            timeout: None,
            poll_interval: None,
            remark: None,
        }
    }

    pub const fn index(self, index: usize) -> Self {
        Self {
            index: Some(index),
            ..self
        }
    }

    pub const fn timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    pub const fn poll_interval(self, interval: Duration) -> Self {
        Self {
            poll_interval: Some(interval),
            ..self
        }
    }

    pub const fn remark(self, remark: &'static str) -> Self {
        Self {
            remark: Some(remark),
            ..self
        }
    }

    pub fn to_locator(&self) -> PageResult<Locator> {
        let mut builder = Locator::builder(self.by, self.value);
        builder.index = self.index;
        builder.timeout = self.timeout;
        builder.poll_interval = self.poll_interval;
        builder.remark = self.remark.map(String::from);
        builder.build()
    }
}

/// Keyword-style configuration, e.g. loaded from JSON.
///
/// Durations are expressed in (fractional) seconds.
///
/// ```
/// # use thirtyfour_pages::{IntoLocator, LocatorConfig, By};
/// let config: LocatorConfig = serde_json::from_str(
///     r#"{"by": "css selector", "value": "button.save", "timeout": 2.5}"#,
/// ).unwrap();
/// let locator = config.into_locator().unwrap();
/// assert_eq!(locator.by(), By::Css);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocatorConfig {
    pub by: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// Anything that can be validated into a [`Locator`].
pub trait IntoLocator {
    fn into_locator(self) -> PageResult<Locator>;
}

impl IntoLocator for Locator {
    fn into_locator(self) -> PageResult<Locator> {
        Ok(self)
    }
}

impl IntoLocator for &Locator {
    fn into_locator(self) -> PageResult<Locator> {
        Ok(self.clone())
    }
}

impl IntoLocator for LocatorBuilder {
    fn into_locator(self) -> PageResult<Locator> {
        self.build()
    }
}

impl IntoLocator for Declaration {
    fn into_locator(self) -> PageResult<Locator> {
        self.to_locator()
    }
}

impl IntoLocator for LocatorConfig {
    fn into_locator(self) -> PageResult<Locator> {
        let mut builder = Locator::builder(self.by.parse()?, self.value);
        builder.index = self.index;
        if let Some(secs) = self.timeout {
            builder.timeout = Some(config::positive_seconds("timeout", secs)?);
        }
        if let Some(secs) = self.poll_interval {
            builder.poll_interval = Some(config::positive_seconds("poll_interval", secs)?);
        }
        builder.remark = self.remark;
        builder.build()
    }
}

impl<S: Into<String>> IntoLocator for (By, S) {
    fn into_locator(self) -> PageResult<Locator> {
        Locator::builder(self.0, self.1).build()
    }
}

impl<S: Into<String>> IntoLocator for (&str, S) {
    fn into_locator(self) -> PageResult<Locator> {
        Locator::builder(self.0.parse()?, self.1).build()
    }
}

impl<S: Into<String>> IntoLocator for (By, S, usize) {
    fn into_locator(self) -> PageResult<Locator> {
        Locator::builder(self.0, self.1).index(self.2).build()
    }
}

impl<S: Into<String>> IntoLocator for (By, S, usize, Duration) {
    fn into_locator(self) -> PageResult<Locator> {
        Locator::builder(self.0, self.1).index(self.2).timeout(self.3).build()
    }
}

impl<S: Into<String>> IntoLocator for (By, S, usize, Duration, Duration) {
    fn into_locator(self) -> PageResult<Locator> {
        Locator::builder(self.0, self.1).index(self.2).timeout(self.3).poll_interval(self.4).build()
    }
}

impl<S, R> IntoLocator for (By, S, usize, Duration, Duration, R)
where
    S: Into<String>,
    R: Into<String>,
{
    fn into_locator(self) -> PageResult<Locator> {
        Locator::builder(self.0, self.1)
            .index(self.2)
            .timeout(self.3)
            .poll_interval(self.4)
            .remark(self.5)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;

    #[test]
    fn empty_value_is_rejected() {
        assert!(matches!(Locator::new(By::Id, ""), Err(PageError::Configuration(_))));
    }

    #[test]
    fn zero_durations_are_rejected() {
        let r = Locator::builder(By::Id, "a").timeout(Duration::ZERO).build();
        assert!(matches!(r, Err(PageError::Configuration(_))));
        let r = Locator::builder(By::Id, "a").poll_interval(Duration::ZERO).build();
        assert!(matches!(r, Err(PageError::Configuration(_))));
    }

    #[test]
    fn remark_defaults_follow_value_and_index() {
        assert_eq!(Locator::new(By::Id, "save").unwrap().remark(), "save");
        let indexed = Locator::builder(By::Css, "li").index(2).build().unwrap();
        assert_eq!(indexed.remark(), "(li)[2]");
        let named = Locator::builder(By::Css, "li").remark("menu items").build().unwrap();
        assert_eq!(named.remark(), "menu items");
    }

    #[test]
    fn overrides_take_precedence_over_defaults() {
        let l = Locator::builder(By::Id, "a")
            .timeout(Duration::from_secs(3))
            .poll_interval(Duration::from_millis(20))
            .build()
            .unwrap();
        assert_eq!(l.timeout(), Duration::from_secs(3));
        assert_eq!(l.poll_interval(), Duration::from_millis(20));
        assert_eq!(
            l.poller(),
            ElementPoller::TimeoutWithInterval(Duration::from_secs(3), Duration::from_millis(20))
        );
    }

    #[test]
    fn positional_tuples() {
        let l = (By::XPath, "//a", 1usize, Duration::from_secs(2), Duration::from_millis(100), "link")
            .into_locator()
            .unwrap();
        assert_eq!(l.by(), By::XPath);
        assert_eq!(l.value(), "//a");
        assert_eq!(l.index(), Some(1));
        assert_eq!(l.timeout_override(), Some(Duration::from_secs(2)));
        assert_eq!(l.poll_interval_override(), Some(Duration::from_millis(100)));
        assert_eq!(l.remark(), "link");

        let l = ("css selector", String::from("div")).into_locator().unwrap();
        assert_eq!(l.by(), By::Css);
        assert!(matches!(("jquery", "div").into_locator(), Err(PageError::Configuration(_))));
    }

    #[test]
    fn declarations_validate_lazily() {
        const OK: Declaration = Declaration::new(By::Id, "a").index(3).remark("third");
        let l = OK.to_locator().unwrap();
        assert_eq!(l.index(), Some(3));
        assert_eq!(l.remark(), "third");

        const EMPTY: Declaration = Declaration::new(By::Id, "");
        assert!(matches!(EMPTY.to_locator(), Err(PageError::Configuration(_))));
    }

    #[test]
    fn keyword_config() {
        let config: LocatorConfig = serde_json::from_str(
            r#"{"by": "xpath", "value": "//li", "index": 0, "poll_interval": 0.1}"#,
        )
        .unwrap();
        let l = config.into_locator().unwrap();
        assert_eq!(l.by(), By::XPath);
        assert_eq!(l.index(), Some(0));
        assert_eq!(l.poll_interval_override(), Some(Duration::from_millis(100)));

        let bad = LocatorConfig {
            by: String::from("id"),
            value: String::from("x"),
            timeout: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(bad.into_locator(), Err(PageError::Configuration(_))));
    }
}
