//! Session tokens
//!
//! A session token is an HS256 JSON Web Token carrying the session seed:
//!
//! ```text
//! base64url({"alg":"HS256","typ":"JWT"}) . base64url({"seed":N,"iat":T}) . base64url(sig)
//! ```
//!
//! `sig` is HMAC-SHA256 over the first two segments, keyed with the signing
//! secret from the persisted secret state. Tokens never expire; they stay
//! valid for as long as the secret state does.
//!
//! Verification fails closed. Every failure is reported as
//! [`Error::InvalidToken`] and callers must not tell clients which check
//! failed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// The only signature algorithm accepted
const ALGORITHM: &str = "HS256";

/// Claims embedded in a session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Random per-session seed, the key for oracle lookups and rate limiting
    pub seed: u32,

    /// Issue time (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Issue a token for a fresh session seed drawn from the OS random source
pub fn issue(key: &[u8], now_secs: i64) -> Result<(String, SessionClaims)> {
    let claims = SessionClaims {
        seed: OsRng.next_u32(),
        iat: Some(now_secs),
    };
    let token = sign(key, &claims)?;
    Ok((token, claims))
}

/// Sign the given claims
pub fn sign(key: &[u8], claims: &SessionClaims) -> Result<String> {
    let header = Header {
        alg: ALGORITHM.to_string(),
        typ: Some("JWT".to_string()),
    };
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
    );
    let signature = URL_SAFE_NO_PAD.encode(hmac_sha256(key, signing_input.as_bytes()));
    Ok(format!("{}.{}", signing_input, signature))
}

/// Verify a token's signature and return its claims
pub fn verify(key: &[u8], token: &str) -> Result<SessionClaims> {
    let mut segments = token.trim().split('.');
    let (header_b64, claims_b64, signature_b64) =
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(c), Some(s), None) => (h, c, s),
            _ => return Err(invalid("expected three segments")),
        };

    let header: Header = decode_segment(header_b64)?;
    if header.alg != ALGORITHM {
        return Err(invalid("unsupported algorithm"));
    }

    let provided = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| invalid("signature is not base64url"))?;
    let signed_len = header_b64.len() + 1 + claims_b64.len();
    let expected = hmac_sha256(key, token.trim()[..signed_len].as_bytes());
    if !constant_time_eq(&expected, &provided) {
        return Err(invalid("signature mismatch"));
    }

    decode_segment(claims_b64)
}

/// Strip an optional `Bearer ` scheme from an Authorization header value
pub fn token_from_header(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| invalid("segment is not base64url"))?;
    serde_json::from_slice(&bytes).map_err(|_| invalid("segment is not valid JSON"))
}

fn invalid(reason: &str) -> Error {
    Error::InvalidToken(reason.to_string())
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    const BLOCK_SIZE: usize = 64;
    let mut key_block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let digest = Sha256::digest(key);
        key_block[..digest.len()].copy_from_slice(&digest);
    } else {
        key_block[..key.len()].copy_from_slice(key);
    }

    let mut inner_pad = [0u8; BLOCK_SIZE];
    let mut outer_pad = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        inner_pad[i] = key_block[i] ^ 0x36;
        outer_pad[i] = key_block[i] ^ 0x5c;
    }

    let mut inner = Sha256::new();
    inner.update(inner_pad);
    inner.update(message);
    let inner_hash = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(outer_pad);
    outer.update(inner_hash);
    outer.finalize().into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test-secret";

    #[test]
    fn test_hmac_reference_vector() {
        let mac = hmac_sha256(b"key", b"The quick brown fox jumps over the lazy dog");
        let hex: String = mac.iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(
            hex,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_sign_matches_reference_jwt() {
        let claims = SessionClaims {
            seed: 12345,
            iat: Some(1_700_000_000),
        };
        assert_eq!(
            sign(KEY, &claims).unwrap(),
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.\
             eyJzZWVkIjoxMjM0NSwiaWF0IjoxNzAwMDAwMDAwfQ.\
             bQ7bVJjL9vWjWCrTe2T85QeeWYuXmzNQOdimb4QvkS4"
        );
    }

    #[test]
    fn test_issue_then_verify_round_trip() {
        let (token, claims) = issue(KEY, 1_700_000_000).unwrap();
        let verified = verify(KEY, &token).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(verified.iat, Some(1_700_000_000));
    }

    #[test]
    fn test_flipped_byte_rejected() {
        let (token, _) = issue(KEY, 0).unwrap();
        for position in [0, token.len() / 2, token.len() - 1] {
            let mut bytes = token.clone().into_bytes();
            bytes[position] = if bytes[position] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert!(
                matches!(verify(KEY, &tampered), Err(Error::InvalidToken(_))),
                "tampering at {} went unnoticed",
                position
            );
        }
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (token, _) = issue(KEY, 0).unwrap();
        assert!(matches!(
            verify(b"other-secret", &token),
            Err(Error::InvalidToken(_))
        ));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert!(matches!(verify(KEY, token), Err(Error::InvalidToken(_))));
        }
    }

    #[test]
    fn test_alg_none_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"seed":1}"#);
        let token = format!("{}.{}.", header, claims);
        assert!(matches!(verify(KEY, &token), Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_signed_but_malformed_claims_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"seed":-1}"#);
        let input = format!("{}.{}", header, claims);
        let sig = URL_SAFE_NO_PAD.encode(hmac_sha256(KEY, input.as_bytes()));
        let token = format!("{}.{}", input, sig);
        assert!(matches!(verify(KEY, &token), Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_claims_without_iat_accepted() {
        let claims = SessionClaims { seed: 9, iat: None };
        let token = sign(KEY, &claims).unwrap();
        assert_eq!(verify(KEY, &token).unwrap(), claims);
    }

    #[test]
    fn test_token_from_header() {
        assert_eq!(token_from_header("abc.def.ghi"), "abc.def.ghi");
        assert_eq!(token_from_header("Bearer abc.def.ghi"), "abc.def.ghi");
        assert_eq!(token_from_header("  abc.def.ghi \n"), "abc.def.ghi");
    }
}
