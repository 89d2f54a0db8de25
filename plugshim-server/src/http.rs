//! Minimal HTTP/1.1 framing for hub traffic.
//!
//! Hubs talk to an outlet with short, single-request connections. This module reads one
//! request off a stream and frames one response; nothing here knows about devices.

use std::collections::HashMap;
use std::fmt;

use plugshim_device::wire::{http_date, SERVER_BANNER};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::RequestError;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Response status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// One parsed request from a hub.
#[derive(Debug, Clone, Default)]
pub struct ControlRequest {
    pub method: String,
    /// Request path without any query string
    pub path: String,
    /// Header values keyed by lower-cased name
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ControlRequest {
    /// Look up a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn content_length(&self) -> Result<Option<usize>, RequestError> {
        self.header("content-length")
            .map(|value| {
                value.trim().parse::<usize>().map_err(|_| {
                    RequestError::Malformed(format!("invalid Content-Length '{}'", value))
                })
            })
            .transpose()
    }
}

/// Parse the request line and headers (everything before the blank line).
pub fn parse_head(head: &str) -> Result<ControlRequest, RequestError> {
    let mut lines = head.split('\n').map(|line| line.trim_end_matches('\r'));

    let start_line = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| RequestError::Malformed("empty request line".to_string()))?;

    let mut parts = start_line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version), None) => (method, target, version),
        _ => {
            return Err(RequestError::Malformed(format!(
                "bad request line '{}'",
                start_line
            )))
        }
    };

    if !version.starts_with("HTTP/") {
        return Err(RequestError::Malformed(format!("bad HTTP version '{}'", version)));
    }

    let path = target.split('?').next().unwrap_or(target).to_string();

    // lines without a colon are skipped; hubs are not always tidy
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    Ok(ControlRequest {
        method: method.to_string(),
        path,
        headers,
        body: String::new(),
    })
}

/// Read a single request from `reader`.
///
/// Reads until the blank line ending the headers, then up to `Content-Length` body
/// bytes. Without a `Content-Length`, the body is whatever arrived with the headers.
/// A peer that closes early gets whatever body it managed to send.
///
/// Callers bound the total time with a timeout.
pub async fn read_request<R>(reader: &mut R, max_size: usize) -> Result<ControlRequest, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 2048];

    let header_end = loop {
        if let Some(pos) = find_subsequence(&buffer, HEADER_TERMINATOR) {
            break pos;
        }
        if buffer.len() > max_size {
            return Err(RequestError::TooLarge(max_size));
        }

        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(if buffer.is_empty() {
                RequestError::Closed
            } else {
                RequestError::Incomplete
            });
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = std::str::from_utf8(&buffer[..header_end])
        .map_err(|_| RequestError::Malformed("headers are not valid UTF-8".to_string()))?;
    let mut request = parse_head(head)?;

    let mut body = buffer.split_off(header_end + HEADER_TERMINATOR.len());

    if let Some(length) = request.content_length()? {
        if length > max_size {
            return Err(RequestError::TooLarge(max_size));
        }
        while body.len() < length {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(length);
    }

    request.body = String::from_utf8_lossy(&body).into_owned();
    Ok(request)
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Frame `body` as a complete HTTP response.
///
/// `CONTENT-LENGTH` is the UTF-8 byte length of the body, not its character count:
/// `"föo"` is 4 bytes. Lines are joined with `\r\n` and a blank line separates headers
/// from the body.
pub fn add_http_headers(status: Status, body: &str) -> String {
    [
        format!("HTTP/1.1 {}", status),
        format!("CONTENT-LENGTH: {}", body.len()),
        r#"CONTENT-TYPE: text/xml; charset="utf-8""#.to_string(),
        format!("DATE: {}", http_date()),
        "LAST-MODIFIED: Sat, 01 Jan 2000 00:01:15 GMT".to_string(),
        format!("SERVER: {}", SERVER_BANNER),
        "X-User-Agent: plugshim".to_string(),
        "CONNECTION: close".to_string(),
        String::new(),
        body.to_string(),
    ]
    .join("\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_content_length_ascii() {
        assert!(add_http_headers(Status::Ok, "foo").contains("CONTENT-LENGTH: 3"));
    }

    #[test]
    fn test_content_length_counts_bytes() {
        assert!(add_http_headers(Status::Ok, "föo").contains("CONTENT-LENGTH: 4"));
        assert!(add_http_headers(Status::Ok, "☃").contains("CONTENT-LENGTH: 3"));
    }

    #[test]
    fn test_response_framing() {
        let response = add_http_headers(Status::NotFound, "");
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("CONNECTION: close\r\n\r\n"));
        assert!(response.contains("\r\nCONTENT-LENGTH: 0\r\n"));

        let response = add_http_headers(Status::Ok, "<x/>");
        let (head, body) = response.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(body, "<x/>");
    }

    proptest! {
        #[test]
        fn prop_content_length_matches_body_bytes(body in "\\PC*") {
            let response = add_http_headers(Status::Ok, &body);
            let expected = format!("CONTENT-LENGTH: {}\r\n", body.as_bytes().len());
            prop_assert!(response.contains(&expected));
            prop_assert!(response.ends_with(&body));
        }
    }

    #[test]
    fn test_parse_head_basic() {
        let request = parse_head(
            "POST /upnp/control/basicevent1?x=1 HTTP/1.1\r\nHost: 10.0.0.2:12345\r\nSOAPACTION: \"urn:Belkin:service:basicevent:1#GetBinaryState\"",
        )
        .unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/upnp/control/basicevent1");
        assert_eq!(request.header("host"), Some("10.0.0.2:12345"));
        assert_eq!(
            request.header("SoapAction"),
            Some("\"urn:Belkin:service:basicevent:1#GetBinaryState\"")
        );
    }

    #[test]
    fn test_parse_head_rejects_bad_start_line() {
        assert!(matches!(parse_head(""), Err(RequestError::Malformed(_))));
        assert!(matches!(parse_head("GET /setup.xml"), Err(RequestError::Malformed(_))));
        assert!(matches!(parse_head("GET /setup.xml FTP/1.0"), Err(RequestError::Malformed(_))));
        assert!(matches!(
            parse_head("GET /setup.xml HTTP/1.1 extra"),
            Err(RequestError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_head_skips_junk_lines() {
        let request = parse_head("GET / HTTP/1.1\r\nnot a header\r\nAccept: */*").unwrap();
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("ACCEPT"), Some("*/*"));
    }

    #[tokio::test]
    async fn test_read_request_with_content_length() {
        let raw = b"POST /upnp/control/basicevent1 HTTP/1.1\r\nContent-Length: 30\r\n\r\n<BinaryState>1</BinaryState>\r\nIGNORED";
        let mut reader = &raw[..];
        let request = read_request(&mut reader, 65536).await.unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.body, "<BinaryState>1</BinaryState>\r\n");
    }

    #[tokio::test]
    async fn test_read_request_body_split_across_reads() {
        let mut reader = tokio_test::io::Builder::new()
            .read(b"POST /upnp/control/basicevent1 HTTP/1.1\r\nCONTENT-LENGTH: 28\r\n\r\n")
            .read(b"<BinaryState>0")
            .read(b"</BinaryState>")
            .build();

        let request = read_request(&mut reader, 65536).await.unwrap();
        assert_eq!(request.body, "<BinaryState>0</BinaryState>");
    }

    #[tokio::test]
    async fn test_read_request_without_content_length() {
        let raw = b"GET /setup.xml HTTP/1.1\r\nHost: x\r\n\r\n";
        let mut reader = &raw[..];
        let request = read_request(&mut reader, 65536).await.unwrap();
        assert_eq!(request.path, "/setup.xml");
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_read_request_short_body() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 100\r\n\r\nabc";
        let mut reader = &raw[..];
        let request = read_request(&mut reader, 65536).await.unwrap();
        assert_eq!(request.body, "abc");
    }

    #[tokio::test]
    async fn test_read_request_errors() {
        let mut empty = &b""[..];
        assert!(matches!(read_request(&mut empty, 65536).await, Err(RequestError::Closed)));

        let mut partial = &b"GET /setup.xml HTTP/1.1\r\nHost: x\r\n"[..];
        assert!(matches!(
            read_request(&mut partial, 65536).await,
            Err(RequestError::Incomplete)
        ));

        let mut bad_length = &b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n"[..];
        assert!(matches!(
            read_request(&mut bad_length, 65536).await,
            Err(RequestError::Malformed(_))
        ));

        let huge = vec![b'a'; 10_000];
        let mut reader = &huge[..];
        assert!(matches!(
            read_request(&mut reader, 4096).await,
            Err(RequestError::TooLarge(4096))
        ));
    }
}
