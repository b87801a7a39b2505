//! The opening handshake: client request construction and the
//! incremental response parser (spec §4.D).

use crate::error::Error;
use crate::url::WsUrl;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Bounds how much of a malformed or slow-drip response this parser
/// will buffer before giving up, mirroring the teacher crate's 16 KiB
/// cap on the server-side header read.
const MAX_RESPONSE_HEADER_SIZE: usize = 16 * 1024;

/// Generates a fresh `Sec-WebSocket-Key`: 16 random bytes, base64
/// encoded. Resolves spec §9's open question — the source used a
/// constant key; a conforming client randomizes it per connection.
pub fn generate_websocket_key() -> String {
    let random_bytes: [u8; 16] = rand::random();
    BASE64_STANDARD.encode(random_bytes)
}

fn accept_digest(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// Builds the HTTP Upgrade request (spec §4.D).
pub fn build_request(url: &WsUrl, key: &str) -> String {
    format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: {}\r\nSec-WebSocket-Version: 13\r\n\r\n",
        url.request_target(),
        url.host_with_port(),
        key,
    )
}

/// What a `feed` call resolved to.
#[derive(Debug)]
pub enum HandshakeOutcome {
    Incomplete,
    /// The response validated; `trailing` is whatever bytes arrived
    /// past the `\r\n\r\n` terminator, which must be handed to the
    /// frame parser as its first input (spec §4.D).
    Complete { trailing: Vec<u8> },
}

/// Incremental parser for the 101 Switching Protocols response.
/// Accumulates bytes across `feed` calls until the header terminator
/// is seen, then validates the five significant fields in one pass.
pub struct HandshakeResponseParser {
    buffer: Vec<u8>,
    expected_accept: String,
}

impl HandshakeResponseParser {
    pub fn new(sent_key: &str) -> Self {
        Self {
            buffer: Vec::new(),
            expected_accept: accept_digest(sent_key),
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<HandshakeOutcome, Error> {
        self.buffer.extend_from_slice(bytes);

        let Some(terminator_start) = self.buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
            if self.buffer.len() > MAX_RESPONSE_HEADER_SIZE {
                return Err(Error::FailedToParseOpeningHandshakeResponse(
                    "opening handshake response exceeded the maximum header size",
                ));
            }
            return Ok(HandshakeOutcome::Incomplete);
        };

        let header_text = String::from_utf8_lossy(&self.buffer[..terminator_start]).into_owned();
        let trailing = self.buffer[terminator_start + 4..].to_vec();

        self.validate(&header_text)?;

        Ok(HandshakeOutcome::Complete { trailing })
    }

    fn validate(&self, header_text: &str) -> Result<(), Error> {
        let mut lines = header_text.split("\r\n");

        let status_line = lines
            .next()
            .ok_or(Error::FailedToParseOpeningHandshakeResponse("empty opening handshake response"))?;
        let status_code = status_line
            .split_whitespace()
            .nth(1)
            .ok_or(Error::FailedToParseOpeningHandshakeResponse("malformed HTTP status line"))?;
        if status_code != "101" {
            return Err(Error::InvalidOpeningHandshakeHttpStatus);
        }

        let mut upgrade = None;
        let mut connection = None;
        let mut accept = None;
        let mut saw_protocol = false;
        let mut saw_extensions = false;

        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            match name.trim().to_ascii_lowercase().as_str() {
                "upgrade" => upgrade = Some(value.trim().to_string()),
                "connection" => connection = Some(value.trim().to_string()),
                "sec-websocket-accept" => accept = Some(value.trim().to_string()),
                "sec-websocket-protocol" => saw_protocol = true,
                "sec-websocket-extensions" => saw_extensions = true,
                _ => {}
            }
        }

        let upgrade = upgrade.ok_or(Error::FailedToParseOpeningHandshakeResponse("missing Upgrade header"))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(Error::FailedToParseOpeningHandshakeResponse("Upgrade header was not \"websocket\""));
        }

        let connection = connection.ok_or(Error::FailedToParseOpeningHandshakeResponse("missing Connection header"))?;
        if !connection.eq_ignore_ascii_case("upgrade") {
            return Err(Error::FailedToParseOpeningHandshakeResponse("Connection header was not \"Upgrade\""));
        }

        let accept = accept.ok_or(Error::FailedToParseOpeningHandshakeResponse("missing Sec-WebSocket-Accept header"))?;
        if accept != self.expected_accept {
            return Err(Error::FailedToParseOpeningHandshakeResponse(
                "Sec-WebSocket-Accept did not match the expected digest",
            ));
        }

        if saw_protocol {
            return Err(Error::FailedToParseOpeningHandshakeResponse(
                "unsolicited Sec-WebSocket-Protocol in response",
            ));
        }
        if saw_extensions {
            return Err(Error::FailedToParseOpeningHandshakeResponse(
                "unsolicited Sec-WebSocket-Extensions in response",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_response(key: &str) -> String {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\n\r\n",
            accept_digest(key)
        )
    }

    #[test]
    fn build_request_contains_required_headers() {
        let url = WsUrl::parse("ws://example.com/chat?x=1").unwrap();
        let request = build_request(&url, "dGhlIHNhbXBsZSBub25jZQ==");
        assert!(request.starts_with("GET /chat?x=1 HTTP/1.1\r\n"));
        assert!(request.contains("Host: example.com:80\r\n"));
        assert!(request.contains("Upgrade: websocket\r\n"));
        assert!(request.contains("Connection: Upgrade\r\n"));
        assert!(request.contains("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n"));
        assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn generated_keys_are_valid_base64_of_16_bytes() {
        let key = generate_websocket_key();
        let decoded = BASE64_STANDARD.decode(key).unwrap();
        assert_eq!(decoded.len(), 16);
    }

    #[test]
    fn accepts_a_valid_response_and_surfaces_trailing_bytes() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let mut response = valid_response(key).into_bytes();
        response.extend_from_slice(b"leftover-frame-bytes");

        let mut parser = HandshakeResponseParser::new(key);
        match parser.feed(&response).unwrap() {
            HandshakeOutcome::Complete { trailing } => assert_eq!(trailing, b"leftover-frame-bytes"),
            HandshakeOutcome::Incomplete => panic!("expected a complete handshake"),
        }
    }

    #[test]
    fn reports_incomplete_until_terminator_arrives() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let response = valid_response(key);
        let (first, second) = response.as_bytes().split_at(response.len() - 10);

        let mut parser = HandshakeResponseParser::new(key);
        assert!(matches!(parser.feed(first).unwrap(), HandshakeOutcome::Incomplete));
        assert!(matches!(parser.feed(second).unwrap(), HandshakeOutcome::Complete { .. }));
    }

    #[test]
    fn non_101_status_is_rejected() {
        let mut parser = HandshakeResponseParser::new("key");
        let response = b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";
        assert!(matches!(parser.feed(response), Err(Error::InvalidOpeningHandshakeHttpStatus)));
    }

    #[test]
    fn missing_accept_header_is_rejected() {
        let mut parser = HandshakeResponseParser::new("key");
        let response = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";
        assert!(matches!(parser.feed(response), Err(Error::FailedToParseOpeningHandshakeResponse(_))));
    }

    #[test]
    fn wrong_accept_digest_is_rejected() {
        let mut parser = HandshakeResponseParser::new("key-one");
        let response = valid_response("a-different-key");
        assert!(matches!(parser.feed(response.as_bytes()), Err(Error::FailedToParseOpeningHandshakeResponse(_))));
    }

    #[test]
    fn unsolicited_extensions_are_rejected() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\nSec-WebSocket-Extensions: permessage-deflate\r\n\r\n",
            accept_digest(key)
        );
        let mut parser = HandshakeResponseParser::new(key);
        assert!(matches!(parser.feed(response.as_bytes()), Err(Error::FailedToParseOpeningHandshakeResponse(_))));
    }

    #[test]
    fn unsolicited_protocol_is_rejected() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let response = format!(
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\nSec-WebSocket-Protocol: chat\r\n\r\n",
            accept_digest(key)
        );
        let mut parser = HandshakeResponseParser::new(key);
        assert!(matches!(parser.feed(response.as_bytes()), Err(Error::FailedToParseOpeningHandshakeResponse(_))));
    }
}
