//! HTTP request value types.
//!
//! A [`Request`] is produced once per parse and never mutated afterwards. The
//! parser normalizes everything up front: the method is upper-cased into a
//! [`Method`], the path and query are percent-decoded, and header names are
//! lower-cased with surrounding whitespace trimmed so lookups are
//! case-insensitive.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::protocol::{ParseError, Query};

/// The seven request methods this engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "PATCH" => Ok(Method::Patch),
            _ => Err(ParseError::invalid_method(s)),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The protocol versions this engine accepts. The version token must match
/// `HTTP/1.0` or `HTTP/1.1` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP/1.0" => Ok(Version::Http10),
            "HTTP/1.1" => Ok(Version::Http11),
            _ => Err(ParseError::unsupported_version(s)),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Query,
    headers: HashMap<String, String>,
    body: Bytes,
    version: Version,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        query: Query,
        headers: HashMap<String, String>,
        body: Bytes,
        version: Version,
    ) -> Self {
        Self { method, path, query, headers, body, version }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The percent-decoded path with the query string stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Case-insensitive header lookup. The probe is lower-cased to match the
    /// normalized wire names.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// True when the peer asked to reuse this connection for another request.
    ///
    /// Reuse requires an explicit `Connection: keep-alive`, compared
    /// case-insensitively. The HTTP/1.1 implicit-keep-alive default is
    /// deliberately not applied.
    pub fn wants_keep_alive(&self) -> bool {
        self.header("connection").is_some_and(|v| v.eq_ignore_ascii_case("keep-alive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("GeT".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!(Method::Options.as_str(), "OPTIONS");
    }

    #[test]
    fn unknown_method_is_specific_error() {
        let err = "BREW".parse::<Method>().unwrap_err();
        assert!(matches!(err, ParseError::InvalidMethod { method } if method == "BREW"));
    }

    #[test]
    fn version_grammar_is_exact() {
        assert_eq!("HTTP/1.0".parse::<Version>().unwrap(), Version::Http10);
        assert_eq!("HTTP/1.1".parse::<Version>().unwrap(), Version::Http11);
        assert!(matches!("HTTP/2".parse::<Version>(), Err(ParseError::UnsupportedVersion { .. })));
        assert!(matches!("http/1.1".parse::<Version>(), Err(ParseError::UnsupportedVersion { .. })));
    }

    #[test]
    fn keep_alive_negotiation() {
        let request = |value: Option<&str>| {
            let mut headers = HashMap::new();
            if let Some(v) = value {
                headers.insert("connection".to_string(), v.to_string());
            }
            Request::new(Method::Get, "/".to_string(), Query::new(), headers, Bytes::new(), Version::Http11)
        };

        assert!(request(Some("keep-alive")).wants_keep_alive());
        assert!(request(Some("Keep-Alive")).wants_keep_alive());
        assert!(!request(Some("close")).wants_keep_alive());
        assert!(!request(None).wants_keep_alive());
    }
}
