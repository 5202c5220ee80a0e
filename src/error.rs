use thiserror::Error;
use thirtyfour::error::WebDriverError;

/// Result type used throughout this crate.
pub type PageResult<T> = Result<T, PageError>;

/// Everything that can go wrong while declaring, resolving or acting on page elements.
#[derive(Debug, Error)]
pub enum PageError {
    /// A locator was malformed (unknown strategy, empty value, zero timeout...).
    #[error("invalid locator configuration: {0}")]
    Configuration(String),
    /// The attribute was declared without a locator and none has been bound since.
    #[error("attribute `{attribute}` has no locator bound")]
    UnboundLocator { attribute: String },
    /// An explicit wait was not satisfied before its timeout elapsed.
    #[error("{0}")]
    Timeout(String),
    /// The element could not be found.
    #[error("no such element: {0}")]
    NoSuchElement(String),
    /// Elements matched the locator, but never enough to reach the configured index.
    #[error("index {index} is out of range for {remark}: {len} element(s) matched")]
    IndexOutOfRange { remark: String, index: usize, len: usize },
    /// The handle no longer refers to a live element.
    #[error("stale element reference: {0}")]
    StaleElement(String),
    /// The driver session is gone or the server cannot be talked to. Never retried.
    #[error("driver session failed: {0}")]
    FatalDriver(String),
    /// The operation does not apply to this element.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The server answered, but not with what the command expects.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Any other error reported by the WebDriver server.
    #[error("webdriver error: {0}")]
    WebDriver(WebDriverError),
    /// The server could not be reached in time. Retried by waits.
    #[error("http error: {0}")]
    Http(reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl From<WebDriverError> for PageError {
    fn from(error: WebDriverError) -> Self {
        match error {
            WebDriverError::NoSuchElement { .. } => PageError::NoSuchElement(error.to_string()),
            WebDriverError::StaleElementReference { .. } => PageError::StaleElement(error.to_string()),
            WebDriverError::InvalidSessionId { .. } | WebDriverError::SessionNotCreated { .. } => {
                PageError::FatalDriver(error.to_string())
            }
            e => PageError::WebDriver(e),
        }
    }
}

impl From<reqwest::Error> for PageError {
    /// Connection and timeout failures may clear up on their own; anything else (bad
    /// redirects, undecodable bodies, invalid requests) ends the session for good.
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            PageError::Http(error)
        } else {
            PageError::FatalDriver(format!("transport failure: {}", error))
        }
    }
}

impl PageError {
    /// Convert an error response from a WebDriver server into a `PageError`.
    pub fn parse(status: u16, body: String) -> Self {
        PageError::from(WebDriverError::parse(status, body))
    }

    /// True if the error means the handle no longer corresponds to a live element.
    pub fn is_stale(&self) -> bool {
        matches!(self, PageError::StaleElement(_) | PageError::NoSuchElement(_))
    }

    /// True if the error is expected to go away on its own, so a polling loop may retry.
    pub fn is_transient(&self) -> bool {
        match self {
            PageError::Http(_) => true,
            e => e.is_stale(),
        }
    }
}

pub(crate) fn no_such_element(message: &str) -> PageError {
    PageError::NoSuchElement(message.to_string())
}

pub(crate) fn configuration(message: impl Into<String>) -> PageError {
    PageError::Configuration(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_classified() {
        let body = r#"{"value": {"error": "stale element reference", "message": "gone"}}"#;
        assert!(matches!(PageError::parse(404, body.into()), PageError::StaleElement(_)));

        let body = r#"{"value": {"error": "no such element", "message": "nope"}}"#;
        assert!(matches!(PageError::parse(404, body.into()), PageError::NoSuchElement(_)));

        let body = r#"{"value": {"error": "invalid session id", "message": "closed"}}"#;
        assert!(matches!(PageError::parse(404, body.into()), PageError::FatalDriver(_)));

        let body = r#"{"value": {"error": "invalid selector", "message": "bad xpath"}}"#;
        let e = PageError::parse(400, body.into());
        assert!(matches!(e, PageError::WebDriver(_)));
        assert!(!e.is_transient());
    }

    #[test]
    fn broken_requests_are_fatal() {
        let err = reqwest::blocking::Client::new().get("not a url").send().unwrap_err();
        assert!(!err.is_timeout() && !err.is_connect());
        let e = PageError::from(err);
        assert!(matches!(e, PageError::FatalDriver(ref m) if m.starts_with("transport failure")));
        assert!(!e.is_transient());
    }

    #[test]
    fn classification() {
        assert!(PageError::StaleElement(String::new()).is_transient());
        assert!(PageError::NoSuchElement(String::new()).is_stale());
        assert!(!PageError::FatalDriver(String::new()).is_transient());
        assert!(!PageError::Timeout(String::new()).is_transient());
        assert!(!PageError::InvalidResponse(String::new()).is_transient());
    }
}
