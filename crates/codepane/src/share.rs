//! Share tokens: a [`SourceSet`] packed into a URL fragment.
//!
//! Two token forms exist:
//!
//! - legacy: `base64(html + "|||" + css + "|||" + js)`, readable by every
//!   playground that ever produced links;
//! - framed: `v2.` + `base64("<len>:<html><len>:<css><len>:<js>")`, used only
//!   when the legacy form would not split back into the same three buffers.
//!
//! `.` is not part of the Base64 alphabet, so the prefix cannot collide with a
//! legacy token.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use thiserror::Error;

use crate::source::SourceSet;

pub const DELIMITER: &str = "|||";
const FRAMED_PREFIX: &str = "v2.";

/// Accepts tokens with or without trailing `=` padding, like `atob` does.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("share token is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("share token holds {found} sections, expected 3")]
    Arity { found: usize },

    #[error("framed share token is corrupt: {0}")]
    Frame(&'static str),
}

/// Opaque, URL-fragment-safe encoding of a [`SourceSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShareToken(String);

impl ShareToken {
    /// Wrap text taken from a URL fragment. Nothing is validated until
    /// [`decode`] runs.
    pub fn from_fragment(fragment: impl Into<String>) -> Self {
        Self(fragment.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_framed(&self) -> bool {
        self.0.starts_with(FRAMED_PREFIX)
    }
}

impl std::fmt::Display for ShareToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn encode(source: &SourceSet) -> ShareToken {
    let combined = format!("{}{DELIMITER}{}{DELIMITER}{}", source.html, source.css, source.js);
    let splits_back = {
        let mut parts = combined.split(DELIMITER);
        parts.next() == Some(source.html.as_str())
            && parts.next() == Some(source.css.as_str())
            && parts.next() == Some(source.js.as_str())
            && parts.next().is_none()
    };
    if splits_back {
        return ShareToken(STANDARD.encode(combined));
    }

    let mut framed = Vec::with_capacity(combined.len() + 24);
    for field in [&source.html, &source.css, &source.js] {
        framed.extend_from_slice(field.len().to_string().as_bytes());
        framed.push(b':');
        framed.extend_from_slice(field.as_bytes());
    }
    ShareToken(format!("{FRAMED_PREFIX}{}", STANDARD.encode(framed)))
}

pub fn decode(token: &ShareToken) -> Result<SourceSet, DecodeError> {
    let cleaned = normalize(token.as_str());
    if let Some(body) = cleaned.strip_prefix(FRAMED_PREFIX) {
        return decode_framed(&LENIENT.decode(body)?);
    }

    let text = bytes_to_text(LENIENT.decode(&cleaned)?);
    let parts: Vec<&str> = text.split(DELIMITER).collect();
    match parts.as_slice() {
        [html, css, js] => Ok(SourceSet::new(*html, *css, *js)),
        _ => Err(DecodeError::Arity { found: parts.len() }),
    }
}

fn decode_framed(bytes: &[u8]) -> Result<SourceSet, DecodeError> {
    let mut rest = bytes;
    let mut fields = Vec::with_capacity(3);
    while !rest.is_empty() {
        if fields.len() == 3 {
            return Err(DecodeError::Frame("trailing bytes after the third section"));
        }
        let colon = rest
            .iter()
            .position(|b| *b == b':')
            .ok_or(DecodeError::Frame("missing length separator"))?;
        let len: usize = std::str::from_utf8(&rest[..colon])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or(DecodeError::Frame("invalid section length"))?;
        let body = &rest[colon + 1..];
        if body.len() < len {
            return Err(DecodeError::Frame("section length exceeds token"));
        }
        fields.push(bytes_to_text(body[..len].to_vec()));
        rest = &body[len..];
    }

    let found = fields.len();
    let mut fields = fields.into_iter();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(html), Some(css), Some(js)) => Ok(SourceSet { html, css, js }),
        _ => Err(DecodeError::Arity { found }),
    }
}

/// Browsers hand fragments back with the `#`, sometimes percent-escaped.
fn normalize(token: &str) -> String {
    let token = token.trim().trim_start_matches('#');
    token
        .replace("%2B", "+")
        .replace("%2b", "+")
        .replace("%2F", "/")
        .replace("%2f", "/")
        .replace("%3D", "=")
        .replace("%3d", "=")
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect()
}

/// UTF-8 when possible; otherwise one char per byte, which is what `btoa`
/// produced for Latin-1 text.
fn bytes_to_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|err| err.into_bytes().into_iter().map(char::from).collect())
}

/// `<origin><path>#<token>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink(String);

impl ShareLink {
    pub fn new(origin: &str, path: &str, token: &ShareToken) -> Self {
        let origin = origin.trim_end_matches('/');
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self(format!("{origin}{path}#{token}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fragment of `url` (without `#`), if it has a non-empty one.
/// Text without any `#` is taken to be a bare token.
pub fn fragment_of(url: &str) -> Option<&str> {
    let fragment = match url.split_once('#') {
        Some((_, fragment)) => fragment,
        None if url.contains("://") => return None,
        None => url,
    };
    let fragment = fragment.trim();
    (!fragment.is_empty()).then_some(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn round_trip(source: &SourceSet) -> SourceSet {
        decode(&encode(source)).unwrap()
    }

    #[test]
    fn legacy_round_trip() {
        let source = SourceSet::new("<b>x</b>", "", "");
        let token = encode(&source);
        assert!(!token.is_framed());
        assert_eq!(round_trip(&source), source);
        assert_eq!(round_trip(&SourceSet::builtin()), SourceSet::builtin());
        assert_eq!(round_trip(&SourceSet::default()), SourceSet::default());
    }

    #[test]
    fn legacy_token_matches_btoa() {
        // btoa("<b>x</b>||||||")
        let token = encode(&SourceSet::new("<b>x</b>", "", ""));
        assert_eq!(token.as_str(), "PGI+eDwvYj58fHx8fHw=");
    }

    #[test]
    fn unicode_round_trip() {
        let source = SourceSet::new("<p>héllo ✓</p>", "p::after { content: '→' }", "console.log('日本')");
        assert_eq!(round_trip(&source), source);
    }

    #[test]
    fn delimiter_collisions_use_framed_form() {
        let cases = [
            SourceSet::new("a ||| b", "", ""),
            SourceSet::new("x|", "y", "z"),
            SourceSet::new("", "|", "|"),
            SourceSet::new("", "", "a || b ||| c"),
        ];
        for source in cases {
            let token = encode(&source);
            assert!(token.is_framed(), "{source:?} should need framing");
            assert_eq!(decode(&token).unwrap(), source);
        }
    }

    #[test]
    fn wrong_section_count_is_an_error() {
        let two = ShareToken::from_fragment(STANDARD.encode("a|||b"));
        assert!(matches!(decode(&two), Err(DecodeError::Arity { found: 2 })));

        let none = ShareToken::from_fragment(STANDARD.encode("just html"));
        assert!(matches!(decode(&none), Err(DecodeError::Arity { found: 1 })));

        let four = ShareToken::from_fragment(STANDARD.encode("a|||b|||c|||d"));
        assert!(matches!(decode(&four), Err(DecodeError::Arity { found: 4 })));
    }

    #[test]
    fn malformed_base64_is_an_error() {
        let token = ShareToken::from_fragment("not*base64!");
        assert!(matches!(decode(&token), Err(DecodeError::Encoding(_))));
    }

    #[test]
    fn corrupt_frames_are_errors() {
        let short = ShareToken::from_fragment(format!("v2.{}", STANDARD.encode("9:ab")));
        assert!(matches!(decode(&short), Err(DecodeError::Frame(_))));

        let two = ShareToken::from_fragment(format!("v2.{}", STANDARD.encode("1:a1:b")));
        assert!(matches!(decode(&two), Err(DecodeError::Arity { found: 2 })));

        let extra = ShareToken::from_fragment(format!("v2.{}", STANDARD.encode("0:0:0:1:x")));
        assert!(matches!(decode(&extra), Err(DecodeError::Frame(_))));
    }

    #[test]
    fn accepts_fragment_noise() {
        let source = SourceSet::new("<i>hi</i>", "i{}", "1");
        let token = encode(&source);
        let noisy = format!(
            "#{}\n",
            token.as_str().trim_end_matches('=').replace('+', "%2B").replace('/', "%2F")
        );
        assert_eq!(decode(&ShareToken::from_fragment(noisy)).unwrap(), source);
    }

    #[test]
    fn latin1_tokens_from_btoa() {
        // btoa("caf\u{e9}||||||") encodes é as the single byte 0xE9.
        let token = ShareToken::from_fragment(STANDARD.encode(b"caf\xe9||||||"));
        assert_eq!(decode(&token).unwrap().html, "café");
    }

    #[test]
    fn share_link_format() {
        let token = encode(&SourceSet::new("<b>x</b>", "", ""));
        let link = ShareLink::new("http://localhost:8080/", "index.html", &token);
        assert_eq!(link.as_str(), "http://localhost:8080/index.html#PGI+eDwvYj58fHx8fHw=");
        assert_eq!(fragment_of(link.as_str()), Some(token.as_str()));
    }

    #[test]
    fn fragment_lookup() {
        assert_eq!(fragment_of("http://host/page"), None);
        assert_eq!(fragment_of("http://host/page#"), None);
        assert_eq!(fragment_of("#abc"), Some("abc"));
        assert_eq!(fragment_of("abc="), Some("abc="));
    }
}
