use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use url::form_urlencoded;

const COOKIE_NAME: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Notice,
    Error,
}

impl FlashKind {
    fn as_str(self) -> &'static str {
        match self {
            FlashKind::Notice => "notice",
            FlashKind::Error => "error",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "notice" => Some(FlashKind::Notice),
            "error" => Some(FlashKind::Error),
            _ => None,
        }
    }
}

/// Flash
///
/// A one-shot message carried across a redirect. It is written into the `flash` cookie by the
/// redirecting response and consumed by the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Notice,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// Set-Cookie value storing this message. The payload is form-urlencoded, which only produces
    /// characters that are legal in a cookie value.
    pub fn to_cookie(&self) -> HeaderValue {
        let payload = form_urlencoded::Serializer::new(String::new())
            .append_pair("kind", self.kind.as_str())
            .append_pair("message", &self.message)
            .finish();
        HeaderValue::from_str(&format!(
            "{COOKIE_NAME}={payload}; Path=/; HttpOnly; SameSite=Lax"
        ))
        .unwrap_or_else(|_| Self::clear_cookie())
    }

    /// Set-Cookie value expiring the flash once it has been shown.
    pub fn clear_cookie() -> HeaderValue {
        HeaderValue::from_static("flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
    }

    /// Reads the flash from a request's `Cookie` headers. Anything malformed reads as no flash.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let payload = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find_map(|(name, value)| (name == COOKIE_NAME).then_some(value))?;

        let mut kind = None;
        let mut message = None;
        for (key, value) in form_urlencoded::parse(payload.as_bytes()) {
            match key.as_ref() {
                "kind" => kind = FlashKind::parse(&value),
                "message" => message = Some(value.into_owned()),
                _ => {}
            }
        }

        Some(Flash {
            kind: kind?,
            message: message.filter(|m| !m.is_empty())?,
        })
    }
}

/// IncomingFlash
///
/// Extractor for the flash left by the previous redirect, if any. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct IncomingFlash(pub Option<Flash>);

impl<S> FromRequestParts<S> for IncomingFlash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(IncomingFlash(Flash::from_headers(&parts.headers)))
    }
}
