use std::time::Duration;

use log::trace;
use serde_json::Value;
use thirtyfour::common::command::{Command, FormatRequestData};
use thirtyfour::{RequestData, RequestMethod, SessionId};

use crate::error::PageResult;
use crate::http::connection_sync::WebDriverHttpClientSync;

/// A live session together with the HTTP connection used to talk to it.
#[derive(Debug)]
pub struct WebDriverSession {
    session_id: SessionId,
    conn: Box<dyn WebDriverHttpClientSync>,
}

impl WebDriverSession {
    pub fn new(session_id: SessionId, conn: Box<dyn WebDriverHttpClientSync>) -> Self {
        Self {
            session_id,
            conn,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn execute(&self, command: Command) -> PageResult<Value> {
        self.conn.execute(command.format_request(&self.session_id))
    }

    /// Send a request for an endpoint below this session, e.g. `"actions"`.
    pub fn execute_raw(&self, method: RequestMethod, endpoint: &str, body: Value) -> PageResult<Value> {
        let url = format!("/session/{}/{}", self.session_id, endpoint);
        trace!("raw request to {}", url);
        self.conn.execute(RequestData::new(method, url).add_body(body))
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.conn.set_request_timeout(timeout);
    }
}
