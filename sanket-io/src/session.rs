//! Session tokens and the URIs derived from them.
//!
//! A [`SessionToken`] is generated once per mini-program activation and is
//! the only thing linking the beacon scanner to the web page that consumes
//! its readings:
//!
//! ```text
//! mini-program ──push(type=push&session=T)──▶ broker ──pull(type=pull&session=T)──▶ web page
//!      │                                                                          ▲
//!      └───────────── web app URI ?session=T (WebView src) ───────────────────────┘
//! ```
//!
//! The token is never persisted; a new activation means a new token.

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// URL-safe alphabet, 64 symbols
const TOKEN_ALPHABET: &[u8] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Length of generated tokens
pub const TOKEN_LENGTH: usize = 10;

/// Query parameter carrying the token on every derived URI
pub const SESSION_PARAM: &str = "session";

/// Opaque session token shared by the push and pull halves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from the thread-local RNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generate a token from the given RNG (deterministic in tests).
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let token = (0..TOKEN_LENGTH)
            .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect();
        Self(token)
    }

    /// Validate an externally supplied token.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::InvalidParameter("empty session token".into()));
        }
        if let Some(c) = raw.chars().find(|c| !c.is_ascii() || !TOKEN_ALPHABET.contains(&(*c as u8))) {
            return Err(Error::InvalidParameter(format!(
                "session token contains invalid character {:?}",
                c
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Extract the token from a URI's `session` query parameter.
    pub fn from_url(url: &Url) -> Result<Self> {
        let raw = query_value(url, SESSION_PARAM).ok_or_else(|| {
            Error::InvalidParameter(format!("no {} parameter in {}", SESSION_PARAM, url))
        })?;
        Self::parse(&raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of the broker a client sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerRole {
    /// Mini-program scanner publishing readings
    Push,
    /// Web page consuming readings
    Pull,
}

impl BrokerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerRole::Push => "push",
            BrokerRole::Pull => "pull",
        }
    }
}

/// Broker topic for one session.
///
/// Both roles route on the session alone, so a push topic and a pull topic
/// built from the same token always address the same channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerTopic {
    session: SessionToken,
}

impl BrokerTopic {
    pub fn new(session: &SessionToken) -> Self {
        Self {
            session: session.clone(),
        }
    }

    /// Routing key used by the broker.
    pub fn key(&self) -> &str {
        self.session.as_str()
    }

    pub fn session(&self) -> &SessionToken {
        &self.session
    }
}

/// Broker URIs derived from the configured base URI.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerEndpoints {
    /// Websocket push endpoint (`ws`/`wss`)
    pub websocket_push: Url,
    /// HTTP push fallback
    pub http_push: Url,
    /// Pull endpoint used by the web page
    pub pull: Url,
}

impl BrokerEndpoints {
    /// Derive all endpoints for `session` from `base_uri`.
    ///
    /// `http` maps to `ws` and `https` to `wss` for the websocket endpoint.
    pub fn derive(base_uri: &str, session: &SessionToken) -> Result<Self> {
        let base = Url::parse(base_uri)?;

        let mut websocket_push = with_query(&base, BrokerRole::Push, session);
        let ws_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => other,
        };
        websocket_push.set_scheme(ws_scheme).map_err(|_| {
            Error::InvalidParameter(format!("cannot use scheme {} for {}", ws_scheme, base))
        })?;

        Ok(Self {
            websocket_push,
            http_push: with_query(&base, BrokerRole::Push, session),
            pull: with_query(&base, BrokerRole::Pull, session),
        })
    }
}

/// Web app URI opened in the mini-program WebView.
///
/// The session always comes first; `extra` pairs (e.g. a shared location)
/// follow in order.
pub fn web_app_uri(base_uri: &str, session: &SessionToken, extra: &[(&str, String)]) -> Result<Url> {
    let mut url = Url::parse(base_uri)?;
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair(SESSION_PARAM, session.as_str());
        for (key, value) in extra {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// First value of query parameter `key`.
pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn with_query(base: &Url, role: BrokerRole, session: &SessionToken) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("type", role.as_str())
        .append_pair(SESSION_PARAM, session.as_str());
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generated_token_shape() {
        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), TOKEN_LENGTH);
        assert!(SessionToken::parse(token.as_str()).is_ok());
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = SessionToken::generate_with(&mut StdRng::seed_from_u64(7));
        let b = SessionToken::generate_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert!(SessionToken::parse("").is_err());
        assert!(SessionToken::parse("abc def").is_err());
        assert!(SessionToken::parse("abc&x=1").is_err());
    }

    #[test]
    fn test_websocket_scheme_mapping() {
        let session = SessionToken::parse("abcDEF_-12").unwrap();

        let secure = BrokerEndpoints::derive("https://broker.example.com/", &session).unwrap();
        assert_eq!(secure.websocket_push.scheme(), "wss");
        assert_eq!(secure.http_push.scheme(), "https");

        let plain = BrokerEndpoints::derive("http://127.0.0.1:8080/", &session).unwrap();
        assert_eq!(plain.websocket_push.scheme(), "ws");
        assert_eq!(plain.websocket_push.port(), Some(8080));
    }

    #[test]
    fn test_endpoint_roles() {
        let session = SessionToken::parse("tok").unwrap();
        let endpoints = BrokerEndpoints::derive("https://broker.example.com/", &session).unwrap();

        assert_eq!(query_value(&endpoints.websocket_push, "type").as_deref(), Some("push"));
        assert_eq!(query_value(&endpoints.http_push, "type").as_deref(), Some("push"));
        assert_eq!(query_value(&endpoints.pull, "type").as_deref(), Some("pull"));
    }

    #[test]
    fn test_web_app_uri_session_first() {
        let session = SessionToken::parse("tok").unwrap();
        let url = web_app_uri(
            "https://indoor.example.com/?stale=1",
            &session,
            &[("fcid", "F1".to_string())],
        )
        .unwrap();
        assert_eq!(url.query(), Some("session=tok&fcid=F1"));
    }

    #[test]
    fn test_from_url_missing_session() {
        let url = Url::parse("https://indoor.example.com/").unwrap();
        assert!(SessionToken::from_url(&url).is_err());
    }
}
