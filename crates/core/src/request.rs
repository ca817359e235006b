//! Transport-opaque request and response surfaces.
//!
//! The core knows two things about the transport: requests can be matched
//! by declared parameter type for auto-injection, and responses expose a
//! redirect operation and an error-status operation, both invoked by the
//! engine on terminal outcomes. Everything else (headers, bodies, status)
//! exists so handlers and the trace facility have somewhere to write.
//!
//! [`PlainRequest`] and [`BufferedResponse`] are the in-memory
//! implementations used by tests, the dry-run command, and transport
//! adapters that drain the buffer after dispatch.

use std::collections::{BTreeMap, BTreeSet};

/// Inbound request as seen by the dispatch core.
pub trait Request: Send + Sync {
    /// The raw request path, including any trailing separator.
    fn path(&self) -> &str;

    /// A query parameter by name, if present.
    fn query(&self, name: &str) -> Option<String>;

    /// Role-check hook. The security realm itself is an external
    /// collaborator; the default denies everything.
    fn user_in_role(&self, _role: &str) -> bool {
        false
    }
}

/// Outbound response as seen by the dispatch core.
pub trait Response: Send {
    /// Current status code.
    fn status(&self) -> u16;

    /// Redirect to `location`. Invoked by the engine on the
    /// trailing-slash outcome.
    fn redirect(&mut self, location: &str);

    /// Set an error status with a short message body. Invoked by the
    /// engine on not-found and forbidden outcomes.
    fn send_error(&mut self, status: u16, message: &str);

    /// Append a response header.
    fn add_header(&mut self, name: &str, value: &str);

    /// Append to the response body.
    fn write(&mut self, body: &str);
}

/// Simple owned request: a path, query parameters, and granted roles.
#[derive(Debug, Clone, Default)]
pub struct PlainRequest {
    path: String,
    query: BTreeMap<String, String>,
    roles: BTreeSet<String>,
}

impl PlainRequest {
    pub fn new(path: impl Into<String>) -> Self {
        PlainRequest {
            path: path.into(),
            query: BTreeMap::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }
}

impl Request for PlainRequest {
    fn path(&self) -> &str {
        &self.path
    }

    fn query(&self, name: &str) -> Option<String> {
        self.query.get(name).cloned()
    }

    fn user_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Buffered response: records status, headers, body, and redirect target
/// for the transport adapter (or a test) to inspect afterwards.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    location: Option<String>,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedResponse {
    pub fn new() -> Self {
        BufferedResponse {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
            location: None,
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Redirect target, if the engine issued one.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl Response for BufferedResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn redirect(&mut self, location: &str) {
        self.status = 302;
        self.location = Some(location.to_owned());
        self.headers
            .push(("Location".to_owned(), location.to_owned()));
    }

    fn send_error(&mut self, status: u16, message: &str) {
        self.status = status;
        self.body = message.to_owned();
    }

    fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    fn write(&mut self, body: &str) {
        self.body.push_str(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_request_roles_and_query() {
        let req = PlainRequest::new("/a/b")
            .with_query("name", "value")
            .with_role("admin");
        assert_eq!(req.query("name").as_deref(), Some("value"));
        assert!(req.user_in_role("admin"));
        assert!(!req.user_in_role("operator"));
    }

    #[test]
    fn buffered_response_records_redirect() {
        let mut rsp = BufferedResponse::new();
        rsp.redirect("/a/");
        assert_eq!(rsp.status(), 302);
        assert_eq!(rsp.location(), Some("/a/"));
    }

    #[test]
    fn buffered_response_records_error() {
        let mut rsp = BufferedResponse::new();
        rsp.send_error(404, "not found");
        assert_eq!(rsp.status(), 404);
        assert_eq!(rsp.body(), "not found");
    }
}
