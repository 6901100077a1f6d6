//! Response wire formatting.
//!
//! Hand-rolled rather than routed through a JSON crate: the teacher's
//! own `protocol.rs` builds its wire format by hand (manual
//! `extend_from_slice` calls), and the two response shapes here are
//! fixed enough that doing the same avoids pulling in a dependency the
//! rest of this crate never otherwise needs.

use crate::http::Request;

/// Append a JSON-escaped copy of `s` (without surrounding quotes) to `out`.
fn escape_json_into(out: &mut Vec<u8>, s: &[u8]) {
    for &b in s {
        match b {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x20..=0x7e => out.push(b),
            _ => out.extend_from_slice(format!("\\u{:04x}", b).as_bytes()),
        }
    }
}

fn push_json_string(out: &mut Vec<u8>, s: &[u8]) {
    out.push(b'"');
    escape_json_into(out, s);
    out.push(b'"');
}

/// Build the `200 OK` JSON echo body: method, uri, version, headers,
/// and the raw request bytes, per spec §6.
fn build_echo_json(req: &Request<'_>, raw_request: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(raw_request.len() + 256);
    body.extend_from_slice(b"{\"method\":");
    push_json_string(&mut body, req.method.as_str().as_bytes());
    body.extend_from_slice(b",\"uri\":");
    push_json_string(&mut body, req.uri);
    body.extend_from_slice(b",\"version\":");
    push_json_string(&mut body, req.version.as_str().as_bytes());
    body.extend_from_slice(b",\"headers\":[");
    for (i, header) in req.headers().iter().flatten().enumerate() {
        if i > 0 {
            body.push(b',');
        }
        body.extend_from_slice(b"{\"name\":");
        push_json_string(&mut body, header.name);
        body.extend_from_slice(b",\"value\":");
        push_json_string(&mut body, header.value);
        body.push(b'}');
    }
    body.extend_from_slice(b"],\"raw_request\":");
    push_json_string(&mut body, raw_request);
    body.push(b'}');
    body
}

/// Build a complete `200 OK` response for a successfully parsed
/// request. Note: this reproduces the source's `Connection: keep-alive`
/// header even though the server always closes the connection after
/// sending (spec §6 open question — kept source-bug-compatible; see
/// DESIGN.md).
pub fn success_response(req: &Request<'_>, raw_request: &[u8]) -> Vec<u8> {
    let body = build_echo_json(req, raw_request);
    let mut out = Vec::with_capacity(body.len() + 128);
    out.extend_from_slice(b"HTTP/1.1 200 OK\r\n");
    out.extend_from_slice(b"Content-Type: application/json\r\n");
    out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    out.extend_from_slice(b"Connection: keep-alive\r\n\r\n");
    out.extend_from_slice(&body);
    out
}

/// Build the fixed `400 Bad Request` response for a parse error.
pub fn bad_request_response() -> &'static [u8] {
    b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{parse_head, ParseResult};

    #[test]
    fn success_response_contains_echoed_method() {
        let raw = b"GET /foo HTTP/1.1\r\nHost: a\r\n\r\n";
        let req = match parse_head(raw) {
            ParseResult::Complete(r) => r,
            _ => panic!("expected Complete"),
        };
        let resp = success_response(&req, raw);
        let text = String::from_utf8(resp).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("\"method\":\"GET\""));
        assert!(text.contains("\"uri\":\"/foo\""));
        assert!(text.contains("Connection: keep-alive"));
    }

    #[test]
    fn bad_request_has_zero_content_length_and_closes() {
        let resp = bad_request_response();
        let text = std::str::from_utf8(resp).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains("Content-Length: 0"));
        assert!(text.contains("Connection: close"));
    }

    #[test]
    fn json_escapes_quotes_in_header_value() {
        let raw = b"GET / HTTP/1.1\r\nX-Q: say \"hi\"\r\n\r\n";
        let req = match parse_head(raw) {
            ParseResult::Complete(r) => r,
            _ => panic!("expected Complete"),
        };
        let resp = success_response(&req, raw);
        let text = String::from_utf8(resp).unwrap();
        assert!(text.contains("say \\\"hi\\\""));
    }
}
