//! WebSocket URL decomposition (spec §4.E).

use crate::error::Error;
use url::Url;

/// A parsed `ws://`/`wss://` URL, decomposed into the fields the
/// opening handshake and the transport connect call need.
#[derive(Debug, Clone)]
pub struct WsUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: Option<String>,
}

impl WsUrl {
    /// Parses `url`, defaulting the port to 80 for `ws` and 443 for
    /// `wss`, and defaulting an empty path to `/`.
    pub fn parse(url: &str) -> Result<Self, Error> {
        let parsed = Url::parse(url)?;

        let default_port = match parsed.scheme() {
            "ws" => 80,
            "wss" => 443,
            _ => return Err(Error::InvalidUrl),
        };

        let host = parsed.host_str().ok_or(Error::URLNoHost)?.to_string();
        let port = parsed.port().unwrap_or(default_port);

        let path = match parsed.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host,
            port,
            path,
            query: parsed.query().map(str::to_string),
        })
    }

    /// Is this a `wss://` URL. The built-in `TcpTransport` cannot
    /// honor one; a caller pairing a TLS transport with this crate
    /// checks this before calling `Session::connect`.
    pub fn is_secure(&self) -> bool {
        self.scheme == "wss"
    }

    /// The `Host` header value / TCP connect target.
    pub fn host_with_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The request-target, including the query string if present.
    pub fn request_target(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_port_for_ws() {
        let url = WsUrl::parse("ws://example.com/chat").unwrap();
        assert_eq!(url.host, "example.com");
        assert_eq!(url.port, 80);
        assert_eq!(url.path, "/chat");
        assert_eq!(url.query, None);
    }

    #[test]
    fn defaults_port_for_wss() {
        let url = WsUrl::parse("wss://example.com").unwrap();
        assert_eq!(url.port, 443);
        assert!(url.is_secure());
        assert_eq!(url.path, "/");
    }

    #[test]
    fn explicit_port_and_query_are_preserved() {
        let url = WsUrl::parse("ws://localhost:9001/ws?agent=test").unwrap();
        assert_eq!(url.port, 9001);
        assert_eq!(url.query.as_deref(), Some("agent=test"));
        assert_eq!(url.request_target(), "/ws?agent=test");
        assert_eq!(url.host_with_port(), "localhost:9001");
    }

    #[test]
    fn rejects_non_ws_scheme() {
        assert!(matches!(WsUrl::parse("http://example.com"), Err(Error::InvalidUrl)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(WsUrl::parse("not a url").is_err());
    }
}
