//! HMAC-SHA1 request signing.
//!
//! Mapping services that meter anonymous traffic accept a digital signature
//! computed over the request path and query with a shared URL-signing
//! secret. Signing is pure and deterministic: the same path, query and
//! secret always produce the same signature.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Errors from request signing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignError {
    /// The URL (or path/query) to sign was empty.
    #[error("a URL to sign is required")]
    MissingUrl,

    /// The signing secret was empty.
    #[error("a signing secret is required")]
    MissingSecret,

    /// The secret was not valid URL-safe base64.
    #[error("signing secret is not valid URL-safe base64")]
    MalformedSecret,

    /// A full URL could not be parsed into path and query.
    #[error("cannot sign malformed URL {0:?}")]
    MalformedUrl(String),
}

/// Signs `path + "?" + query` with a URL-safe-base64 signing secret.
///
/// The secret is base64-decoded to its binary form, an HMAC-SHA1 digest is
/// computed over the path-and-query string, and the digest is re-encoded as
/// URL-safe base64 for embedding in a query parameter.
pub fn sign(path: &str, query: &str, secret: &str) -> Result<String, SignError> {
    if path.is_empty() || query.is_empty() {
        return Err(SignError::MissingUrl);
    }
    let key = decode_secret(secret)?;

    let to_sign = format!("{}?{}", path, query);
    // HMAC accepts keys of any length, so new_from_slice cannot fail here.
    let mut mac =
        HmacSha1::new_from_slice(&key).map_err(|_| SignError::MalformedSecret)?;
    mac.update(to_sign.as_bytes());

    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}

/// Signs a full request URL, returning it with `&signature=...` appended.
///
/// Only the path and query participate in the digest; the scheme and host
/// are carried through unchanged.
pub fn sign_url(url: &str, secret: &str) -> Result<String, SignError> {
    if url.is_empty() {
        return Err(SignError::MissingUrl);
    }

    let parsed =
        reqwest::Url::parse(url).map_err(|_| SignError::MalformedUrl(url.to_string()))?;
    let query = parsed
        .query()
        .ok_or_else(|| SignError::MalformedUrl(url.to_string()))?;

    let signature = sign(parsed.path(), query, secret)?;
    Ok(format!("{}&signature={}", url, signature))
}

/// Decodes the URL-safe-base64 secret, accepting both padded and unpadded
/// forms (issued secrets are typically unpadded).
fn decode_secret(secret: &str) -> Result<Vec<u8>, SignError> {
    if secret.is_empty() {
        return Err(SignError::MissingSecret);
    }
    URL_SAFE
        .decode(secret)
        .or_else(|_| URL_SAFE_NO_PAD.decode(secret))
        .map_err(|_| SignError::MalformedSecret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "dGVzdF9zaWduaW5nX3NlY3JldA=="; // "test_signing_secret"
    const OTHER_SECRET: &str = "b3RoZXJfc2VjcmV0X2tleQ=="; // "other_secret_key"

    #[test]
    fn test_signing_is_deterministic() {
        let a = sign("/maps/api/streetview", "location=40.0,-74.0&size=640x640", SECRET).unwrap();
        let b = sign("/maps/api/streetview", "location=40.0,-74.0&size=640x640", SECRET).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_query_change_changes_signature() {
        let a = sign("/maps/api/streetview", "location=40.0,-74.0", SECRET).unwrap();
        let b = sign("/maps/api/streetview", "location=40.0,-74.1", SECRET).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_secret_changes_signature() {
        let a = sign("/maps/api/streetview", "location=40.0,-74.0", SECRET).unwrap();
        let b = sign("/maps/api/streetview", "location=40.0,-74.0", OTHER_SECRET).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_is_url_safe() {
        let sig = sign("/maps/api/streetview", "location=40.0,-74.0", SECRET).unwrap();
        assert!(sig
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=')));
    }

    #[test]
    fn test_unpadded_secret_accepted() {
        let padded = sign("/p", "q=1", "c2VjcmV0MDE=").unwrap();
        let unpadded = sign("/p", "q=1", "c2VjcmV0MDE").unwrap();
        assert_eq!(padded, unpadded);
    }

    #[test]
    fn test_missing_inputs_rejected() {
        assert_eq!(sign("", "q=1", SECRET).unwrap_err(), SignError::MissingUrl);
        assert_eq!(sign("/p", "", SECRET).unwrap_err(), SignError::MissingUrl);
        assert_eq!(sign("/p", "q=1", "").unwrap_err(), SignError::MissingSecret);
        assert_eq!(sign_url("", SECRET).unwrap_err(), SignError::MissingUrl);
    }

    #[test]
    fn test_invalid_secret_rejected() {
        assert_eq!(
            sign("/p", "q=1", "!!not-base64!!").unwrap_err(),
            SignError::MalformedSecret
        );
    }

    #[test]
    fn test_sign_url_appends_signature() {
        let url = "https://maps.example.com/maps/api/streetview?location=40.0,-74.0&size=640x640";
        let signed = sign_url(url, SECRET).unwrap();

        assert!(signed.starts_with(url));
        let sig = signed.rsplit("&signature=").next().unwrap();
        let expected = sign("/maps/api/streetview", "location=40.0,-74.0&size=640x640", SECRET)
            .unwrap();
        assert_eq!(sig, expected);
    }

    #[test]
    fn test_sign_url_requires_query() {
        assert!(matches!(
            sign_url("https://maps.example.com/maps/api/streetview", SECRET),
            Err(SignError::MalformedUrl(_))
        ));
    }
}
