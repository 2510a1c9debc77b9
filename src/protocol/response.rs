//! HTTP response value types.
//!
//! Handlers produce a [`Response`] through [`ResponseBuilder`]; the defaults
//! (status 200, no headers, empty body) cover everything a handler leaves
//! unset. Headers keep the caller's casing and insertion order so one
//! serialization of a response is deterministic.

use bytes::Bytes;

/// Response value supplied by the application handler.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    close_connection: bool,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Headers exactly as supplied by the handler, in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive check for a caller-supplied header.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// When set, the connection is torn down after this response regardless
    /// of the keep-alive negotiation.
    pub fn close_connection(&self) -> bool {
        self.close_connection
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    close_connection: bool,
}

impl ResponseBuilder {
    fn new() -> Self {
        Self { status: 200, headers: Vec::new(), body: Bytes::new(), close_connection: false }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    pub fn close_connection(mut self, close: bool) -> Self {
        self.close_connection = close;
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
            close_connection: self.close_connection,
        }
    }
}

/// Reason phrase for a status code, from a fixed lookup table.
/// Codes outside the table map to `"Unknown"`.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let response = Response::builder().build();
        assert_eq!(response.status(), 200);
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
        assert!(!response.close_connection());
    }

    #[test]
    fn headers_keep_insertion_order_and_case() {
        let response = Response::builder()
            .header("X-First", "1")
            .header("x-second", "2")
            .header("X-First", "3")
            .build();
        let names: Vec<&str> = response.headers().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["X-First", "x-second", "X-First"]);
        assert!(response.has_header("x-first"));
        assert!(response.has_header("X-SECOND"));
        assert!(!response.has_header("x-third"));
    }

    #[test]
    fn reason_phrases() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(404), "Not Found");
        assert_eq!(reason_phrase(503), "Service Unavailable");
        assert_eq!(reason_phrase(299), "Unknown");
        assert_eq!(reason_phrase(418), "Unknown");
    }
}
