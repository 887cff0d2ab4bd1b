// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request authentication for the external access-control system.
//!
//! Two schemes are supported: an HMAC-SHA256 request signature carried in
//! `X-API-Key` / `X-Timestamp` / `X-Signature` headers, and RFC 2617 Digest
//! authentication negotiated through a `401` challenge.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{LazyLock, Mutex};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use gatepass_core::GatepassError;
use hmac::{Hmac, Mac};
use md5::{Digest as _, Md5};
use rand::RngCore;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

static CHALLENGE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)=(?:"((?:[^"\\]|\\.)*)"|([^,\s]+))"#)
        .expect("digest parameter pattern compiles")
});

/// Signs requests with HMAC-SHA256 over method, path, timestamp and body.
pub struct HmacSigner {
    api_key: SecretString,
    api_secret: SecretString,
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl HmacSigner {
    pub fn new(api_key: SecretString, api_secret: SecretString) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }

    /// Base64 HMAC-SHA256 of `METHOD\npath\ntimestamp\nbody`.
    pub fn sign_message(&self, method: &str, path: &str, timestamp: &str, body: &str) -> String {
        let message = format!("{method}\n{path}\n{timestamp}\n{body}");
        sign(self.api_secret.expose_secret().as_bytes(), message.as_bytes())
    }

    /// Authentication headers for one request. `body` must be the exact
    /// string sent on the wire, or `{}` when the request has no body.
    pub fn headers(&self, method: &str, path: &str, body: &str) -> Result<HeaderMap, GatepassError> {
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = self.sign_message(method, path, &timestamp, body);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", header_value(self.api_key.expose_secret())?);
        headers.insert("x-timestamp", header_value(&timestamp)?);
        headers.insert("x-signature", header_value(&signature)?);
        Ok(headers)
    }
}

fn sign(key: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(message);
    BASE64.encode(mac.finalize().into_bytes())
}

fn header_value(value: &str) -> Result<HeaderValue, GatepassError> {
    HeaderValue::from_str(value)
        .map_err(|e| GatepassError::Auth(format!("invalid credential header value: {e}")))
}

/// Parameters of a `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value.
    pub fn parse(header: &str) -> Result<Self, GatepassError> {
        if !header.to_ascii_lowercase().contains("digest") {
            return Err(GatepassError::Auth(
                "server does not support digest authentication".into(),
            ));
        }

        let mut realm = None;
        let mut nonce = None;
        let mut qop = None;
        let mut opaque = None;
        let mut algorithm = None;

        for caps in CHALLENGE_PARAM.captures_iter(header) {
            let value = match (caps.get(2), caps.get(3)) {
                (Some(quoted), _) => unescape(quoted.as_str()),
                (None, Some(token)) => token.as_str().to_string(),
                (None, None) => continue,
            };
            match &caps[1] {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "qop" => qop = Some(value),
                "opaque" => opaque = Some(value),
                "algorithm" => algorithm = Some(value),
                _ => {}
            }
        }

        match (realm, nonce) {
            (Some(realm), Some(nonce)) => Ok(Self {
                realm,
                nonce,
                qop,
                opaque,
                algorithm,
            }),
            _ => Err(GatepassError::Auth("could not parse digest challenge".into())),
        }
    }

    /// Only `auth` is negotiated; `auth-int` would require hashing the body.
    fn selected_qop(&self) -> Option<&'static str> {
        self.qop
            .as_deref()?
            .split(',')
            .any(|option| option.trim().eq_ignore_ascii_case("auth"))
            .then_some("auth")
    }
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

/// RFC 2617 Digest credentials with a per-instance nonce counter.
///
/// The most recent challenge is cached so later requests can authenticate
/// up front instead of paying a `401` round trip every time.
pub struct DigestAuth {
    username: String,
    password: SecretString,
    nc: AtomicU32,
    challenge: Mutex<Option<DigestChallenge>>,
}

impl std::fmt::Debug for DigestAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("nc", &self.nc.load(Ordering::Relaxed))
            .finish()
    }
}

impl DigestAuth {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            nc: AtomicU32::new(0),
            challenge: Mutex::new(None),
        }
    }

    /// Challenge from the last `401`, if one has been seen.
    pub fn cached_challenge(&self) -> Option<DigestChallenge> {
        self.challenge
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn remember(&self, challenge: DigestChallenge) {
        *self
            .challenge
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(challenge);
    }

    /// Build an `Authorization` header value, advancing the nonce counter.
    pub fn authorization(&self, challenge: &DigestChallenge, method: &str, uri: &str) -> String {
        let nc = self.nc.fetch_add(1, Ordering::SeqCst) + 1;
        let mut raw = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut raw);
        self.authorization_with(challenge, method, uri, nc, &hex::encode(raw))
    }

    fn authorization_with(
        &self,
        challenge: &DigestChallenge,
        method: &str,
        uri: &str,
        nc: u32,
        cnonce: &str,
    ) -> String {
        let nc = format!("{nc:08x}");
        let ha1 = md5_hex(&format!(
            "{}:{}:{}",
            self.username,
            challenge.realm,
            self.password.expose_secret()
        ));
        let ha2 = md5_hex(&format!("{method}:{uri}"));

        let qop = challenge.selected_qop();
        let response = if let Some(qop) = qop {
            md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:{qop}:{ha2}", challenge.nonce))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce))
        };

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{uri}", response="{response}""#,
            self.username, challenge.realm, challenge.nonce
        );
        if let Some(qop) = qop {
            header.push_str(&format!(r#", qop={qop}, nc={nc}, cnonce="{cnonce}""#));
        }
        if let Some(opaque) = challenge.opaque.as_deref() {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        if let Some(algorithm) = challenge.algorithm.as_deref() {
            header.push_str(&format!(r#", algorithm="{algorithm}""#));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mufasa() -> DigestAuth {
        DigestAuth::new("Mufasa", SecretString::from("Circle Of Life"))
    }

    fn rfc_challenge(qop: Option<&str>) -> DigestChallenge {
        DigestChallenge {
            realm: "testrealm@host.com".into(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".into(),
            qop: qop.map(String::from),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".into()),
            algorithm: None,
        }
    }

    #[test]
    fn hmac_matches_rfc4231_vector() {
        let signer = HmacSigner::new(SecretString::from("key"), SecretString::from("Jefe"));
        let mac = sign(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(mac, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
        // sign_message joins its parts with newlines before signing.
        assert_eq!(
            signer.sign_message("POST", "/person/single", "1700000000000", r#"{"a":1}"#),
            sign(b"Jefe", b"POST\n/person/single\n1700000000000\n{\"a\":1}")
        );
    }

    #[test]
    fn hmac_signature_is_stable_for_fixed_inputs() {
        let signer = HmacSigner::new(SecretString::from("k"), SecretString::from("secret"));
        assert_eq!(
            signer.sign_message("POST", "/person/single", "1700000000000", r#"{"a":1}"#),
            "s5lj0mdiG69hPyApyva6m838W2x5EzVjUxlm5vq99iQ="
        );
    }

    #[test]
    fn hmac_headers_are_populated() {
        let signer = HmacSigner::new(SecretString::from("my-key"), SecretString::from("s"));
        let headers = signer.headers("GET", "/system/status", "{}").unwrap();
        assert_eq!(headers["x-api-key"], "my-key");
        let ts: i64 = headers["x-timestamp"].to_str().unwrap().parse().unwrap();
        assert!(ts > 1_600_000_000_000);
        let expected = signer.sign_message(
            "GET",
            "/system/status",
            headers["x-timestamp"].to_str().unwrap(),
            "{}",
        );
        assert_eq!(headers["x-signature"], expected.as_str());
    }

    #[test]
    fn debug_output_hides_credentials() {
        let signer = HmacSigner::new(SecretString::from("visible?"), SecretString::from("nope"));
        let debug = format!("{signer:?}");
        assert!(!debug.contains("visible?"));
        let digest = mufasa();
        assert!(!format!("{digest:?}").contains("Circle Of Life"));
    }

    #[test]
    fn parse_full_challenge() {
        let header = r#"Digest realm="testrealm@host.com", qop="auth", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41", algorithm=MD5"#;
        let challenge = DigestChallenge::parse(header).unwrap();
        assert_eq!(challenge.realm, "testrealm@host.com");
        assert_eq!(challenge.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(
            challenge.opaque.as_deref(),
            Some("5ccc069c403ebaf9f0171e9517f40e41")
        );
        assert_eq!(challenge.algorithm.as_deref(), Some("MD5"));
    }

    #[test]
    fn parse_keeps_commas_inside_quoted_values() {
        let header = r#"Digest realm="Hik, Inc", qop="auth,auth-int", nonce="abc", opaque="x=\"y\"""#;
        let challenge = DigestChallenge::parse(header).unwrap();
        assert_eq!(challenge.realm, "Hik, Inc");
        assert_eq!(challenge.nonce, "abc");
        assert_eq!(challenge.qop.as_deref(), Some("auth,auth-int"));
        assert_eq!(challenge.opaque.as_deref(), Some(r#"x="y""#));
        assert_eq!(challenge.selected_qop(), Some("auth"));
    }

    #[test]
    fn auth_int_only_falls_back_to_legacy_response() {
        let auth = mufasa();
        let header = auth.authorization_with(
            &rfc_challenge(Some("auth-int")),
            "GET",
            "/dir/index.html",
            1,
            "ignored",
        );
        assert!(header.contains(r#"response="670fd8c2df070c60b045671b8b24ff02""#), "{header}");
        assert!(!header.contains("qop="));
    }

    #[test]
    fn parse_rejects_non_digest_header() {
        let err = DigestChallenge::parse(r#"Basic realm="x""#).unwrap_err();
        assert!(err.to_string().contains("does not support digest"), "{err}");
    }

    #[test]
    fn parse_rejects_missing_nonce() {
        let err = DigestChallenge::parse(r#"Digest realm="x", qop="auth""#).unwrap_err();
        assert!(err.to_string().contains("could not parse"), "{err}");
    }

    #[test]
    fn digest_response_matches_rfc2617_vector() {
        let auth = mufasa();
        let header = auth.authorization_with(
            &rfc_challenge(Some("auth")),
            "GET",
            "/dir/index.html",
            1,
            "0a4f113b",
        );
        assert!(header.starts_with(r#"Digest username="Mufasa", realm="testrealm@host.com""#));
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#), "{header}");
        assert!(header.contains(r#"qop=auth, nc=00000001, cnonce="0a4f113b""#));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
        assert!(!header.contains("algorithm"));
    }

    #[test]
    fn digest_without_qop_uses_legacy_response() {
        let auth = mufasa();
        let header =
            auth.authorization_with(&rfc_challenge(None), "GET", "/dir/index.html", 1, "ignored");
        assert!(header.contains(r#"response="670fd8c2df070c60b045671b8b24ff02""#), "{header}");
        assert!(!header.contains("nc="));
    }

    #[test]
    fn nonce_count_increases_per_request() {
        let auth = mufasa();
        let challenge = rfc_challenge(Some("auth"));
        let first = auth.authorization(&challenge, "GET", "/a");
        let second = auth.authorization(&challenge, "GET", "/a");
        assert!(first.contains("nc=00000001"), "{first}");
        assert!(second.contains("nc=00000002"), "{second}");
    }

    #[test]
    fn challenge_cache_round_trip() {
        let auth = mufasa();
        assert!(auth.cached_challenge().is_none());
        auth.remember(rfc_challenge(Some("auth")));
        assert_eq!(auth.cached_challenge(), Some(rfc_challenge(Some("auth"))));
    }
}
