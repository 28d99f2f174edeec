//! Challenge-response computation for the `login_sid.lua` handshake.
//!
//! The device issues one of two challenge formats:
//! - `2$<iter1>$<salt1>$<iter2>$<salt2>`: PBKDF2-HMAC-SHA256 applied twice,
//!   first over the password, then over the first hash.
//! - anything else: the legacy MD5 scheme over the UTF-16LE encoding of
//!   `<challenge>-<password>`.
//!
//! Parsing and computation are separate steps so either can be tested alone.

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use sha2::Sha256;

const PBKDF2_PREFIX: &str = "2$";
const HASH_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeSpec {
    Legacy(String),
    Pbkdf2(Pbkdf2Params),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    pub iterations1: u32,
    pub salt1: Vec<u8>,
    pub iterations2: u32,
    pub salt2: Vec<u8>,
    /// Second salt exactly as the device sent it; echoed back in the response.
    pub salt2_hex: String,
}

impl ChallengeSpec {
    /// Parse a raw challenge string.
    /// # Errors
    /// Returns [`Error::MalformedChallenge`] if a `2$` challenge does not have exactly
    /// five fields, a positive iteration count in both count fields and hex salts.
    pub fn parse(challenge: &str) -> Result<Self> {
        if !challenge.starts_with(PBKDF2_PREFIX) {
            return Ok(Self::Legacy(challenge.to_string()));
        }

        let fields: Vec<&str> = challenge.split('$').collect();
        let [_version, iter1, salt1, iter2, salt2] = fields.as_slice() else {
            return Err(Error::malformed(format!(
                "expected 5 fields, found {}",
                fields.len()
            )));
        };

        Ok(Self::Pbkdf2(Pbkdf2Params {
            iterations1: parse_iterations(iter1)?,
            salt1: parse_salt(salt1)?,
            iterations2: parse_iterations(iter2)?,
            salt2: parse_salt(salt2)?,
            salt2_hex: (*salt2).to_string(),
        }))
    }

    /// Response token for this challenge and `password`.
    #[must_use]
    pub fn respond(&self, password: &str) -> String {
        match self {
            Self::Legacy(challenge) => md5_response(challenge, password),
            Self::Pbkdf2(params) => pbkdf2_response(params, password),
        }
    }
}

/// Parse `challenge` and compute the response token for `password`.
/// # Errors
/// Returns [`Error::MalformedChallenge`] for an unparseable PBKDF2 challenge.
pub fn compute_response(challenge: &str, password: &str) -> Result<String> {
    Ok(ChallengeSpec::parse(challenge)?.respond(password))
}

fn parse_iterations(raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(0) => Err(Error::malformed("iteration count must be positive")),
        Ok(n) => Ok(n),
        Err(e) => Err(Error::malformed(format!(
            "invalid iteration count {raw:?}: {e}"
        ))),
    }
}

fn parse_salt(raw: &str) -> Result<Vec<u8>> {
    hex::decode(raw).map_err(|e| Error::malformed(format!("invalid salt {raw:?}: {e}")))
}

fn pbkdf2_response(params: &Pbkdf2Params, password: &str) -> String {
    let mut hash1 = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        &params.salt1,
        params.iterations1,
        &mut hash1,
    );

    let mut hash2 = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(&hash1, &params.salt2, params.iterations2, &mut hash2);

    format!("{}${}", params.salt2_hex, hex::encode(hash2))
}

fn md5_response(challenge: &str, password: &str) -> String {
    let utf16le: Vec<u8> = format!("{challenge}-{password}")
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();

    format!("{challenge}-{}", hex::encode(Md5::digest(&utf16le)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_prefix() {
        assert!(matches!(
            ChallengeSpec::parse("1234567z").unwrap(),
            ChallengeSpec::Legacy(_)
        ));
        assert!(matches!(
            ChallengeSpec::parse("2$1$abcd$1$ef01").unwrap(),
            ChallengeSpec::Pbkdf2(_)
        ));
        // only the literal "2$" prefix selects PBKDF2
        assert!(matches!(
            ChallengeSpec::parse("20$1$abcd$1$ef01").unwrap(),
            ChallengeSpec::Legacy(_)
        ));
    }

    #[test]
    fn parses_pbkdf2_fields() {
        let spec = ChallengeSpec::parse("2$60000$abcd$6000$EF01").unwrap();
        assert_eq!(
            spec,
            ChallengeSpec::Pbkdf2(Pbkdf2Params {
                iterations1: 60000,
                salt1: vec![0xab, 0xcd],
                iterations2: 6000,
                salt2: vec![0xef, 0x01],
                salt2_hex: "EF01".to_string(),
            })
        );
    }

    #[test]
    fn legacy_known_vectors() {
        assert_eq!(
            compute_response("1234567z", "test").unwrap(),
            "1234567z-4c907b965a8e77d30d3bc232c2ad63c2"
        );
        assert_eq!(
            compute_response("1234567z", "äbc").unwrap(),
            "1234567z-9e224a41eeefa284df7bb0f26c2913e2"
        );
    }

    #[test]
    fn pbkdf2_known_vector() {
        assert_eq!(
            compute_response("2$10000$5A1711$2000$5A1722", "1example!").unwrap(),
            "5A1722$1798a1672bca7c6463d6b245f82b53703b0f50813401b03e4045a5861e689adb"
        );
    }

    #[test]
    fn pbkdf2_response_shape() {
        let response = compute_response("2$1$abcd$1$ef01", "p").unwrap();
        assert_eq!(
            response,
            "ef01$bda4b598cdec431acb9ac2864093bb657d7c1c129e618b3c5607c9b1f4298aa5"
        );

        let (salt, hash) = response.split_once('$').unwrap();
        assert_eq!(salt, "ef01");
        assert_eq!(hash.len(), 64);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn password_changes_response() {
        let a = compute_response("2$1$abcd$1$ef01", "p").unwrap();
        let b = compute_response("2$1$abcd$1$ef01", "q").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, compute_response("2$1$abcd$1$ef01", "p").unwrap());

        let c = compute_response("1234567z", "p").unwrap();
        let d = compute_response("1234567z", "q").unwrap();
        assert_ne!(c, d);
    }

    #[test]
    fn rejects_wrong_field_count() {
        for challenge in ["2$1$abcd$1", "2$1$abcd$1$ef01$00", "2$"] {
            let err = ChallengeSpec::parse(challenge).unwrap_err();
            assert!(err.to_string().contains("expected 5 fields"), "{challenge}");
        }
    }

    #[test]
    fn rejects_bad_iteration_counts() {
        for challenge in ["2$0$abcd$1$ef01", "2$x$abcd$1$ef01", "2$1$abcd$-5$ef01"] {
            let err = ChallengeSpec::parse(challenge).unwrap_err();
            assert!(err.to_string().contains("iteration count"), "{challenge}");
        }
    }

    #[test]
    fn rejects_bad_salts() {
        for challenge in ["2$1$abc$1$ef01", "2$1$abcd$1$zz"] {
            let err = ChallengeSpec::parse(challenge).unwrap_err();
            assert!(err.to_string().contains("invalid salt"), "{challenge}");
        }
    }
}
