//! Pure request parser: raw bytes in, [`Request`] value out.
//!
//! This is the second half of the framer/parser pair. The
//! [`RequestDecoder`](crate::codec::RequestDecoder) is responsible for
//! handing over exactly one complete message (headers plus a
//! content-length-sized body); this module turns those bytes into a
//! structured [`Request`] without performing any I/O or mutating its input.
//!
//! Acceptance rules:
//!
//! - the request line must be exactly three whitespace-separated tokens
//! - the method must be one of the seven supported verbs, case-insensitive
//! - the version must match `HTTP/1.0` or `HTTP/1.1` exactly
//! - header lines without a colon are skipped silently, not fatal
//! - header names are lower-cased, names and values trimmed
//! - path and query are percent-decoded; `+` becomes a space in the query
//!   component only

use std::collections::HashMap;

use bytes::Bytes;

use crate::protocol::{Method, ParseError, Query, Request, Version};

/// Parses one complete HTTP request message.
pub fn parse(bytes: &[u8]) -> Result<Request, ParseError> {
    let (header_end, body_start) =
        find_header_end(bytes).ok_or_else(|| ParseError::malformed_request("missing header terminator"))?;

    let header_block = String::from_utf8_lossy(&bytes[..header_end]);
    let mut lines = header_block.split('\n').map(|line| line.trim_end_matches('\r'));

    let request_line = lines.next().unwrap_or("");
    let (method, raw_target, version) = parse_request_line(request_line)?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        // no colon: skip the line rather than fail, this is observable policy
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    let (path, query) = parse_target(raw_target);
    let body = Bytes::copy_from_slice(&bytes[body_start..]);

    Ok(Request::new(method, path, query, headers, body, version))
}

/// Locates the blank line terminating the header section.
///
/// Returns `(header_end, body_start)`. CRLF framing is canonical; bare-LF
/// framing is accepted as well, matching the leniency of common fixtures.
pub(crate) fn find_header_end(bytes: &[u8]) -> Option<(usize, usize)> {
    let crlf = find(bytes, b"\r\n\r\n").map(|pos| (pos, pos + 4));
    let lf = find(bytes, b"\n\n").map(|pos| (pos, pos + 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn parse_request_line(line: &str) -> Result<(Method, &str, Version), ParseError> {
    let mut tokens = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(ParseError::invalid_request_line(line));
    };

    Ok((method.parse()?, target, version.parse()?))
}

/// Splits the request target on the first `?` and decodes both halves.
fn parse_target(target: &str) -> (String, Query) {
    match target.split_once('?') {
        Some((path, query_string)) => (percent_decode(path, false), parse_query(query_string)),
        None => (percent_decode(target, false), Query::new()),
    }
}

fn parse_query(query_string: &str) -> Query {
    let mut query = Query::new();
    if query_string.is_empty() {
        return query;
    }

    for pair in query_string.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            // a key with no `=` yields an empty value
            None => (pair, ""),
        };
        query.push(percent_decode(key, true), percent_decode(value, true));
    }
    query
}

/// Percent-decodes `%XX` escapes; with `plus_as_space`, `+` becomes a space
/// (the form-encoding convention, applied to the query component only).
/// Invalid escapes pass through verbatim.
pub(crate) fn percent_decode(input: &str, plus_as_space: bool) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' if plus_as_space => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    decoded.push(hi * 16 + lo);
                    i += 3;
                }
                _ => {
                    decoded.push(b'%');
                    i += 1;
                }
            },
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
