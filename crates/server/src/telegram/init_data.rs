//! Mini-app `initData` signature verification.
//!
//! Implements Telegram's web app data validation:
//! <https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app>
//!
//! 1. Parse the query string and pull out `hash`
//! 2. Sort the remaining pairs by key and join them as `key=value` lines
//! 3. `secret_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)`
//! 4. `hash == hex(HMAC_SHA256(key = secret_key, msg = data_check_string))`
//!
//! Nothing in the payload is trusted until step 4 passes.

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument};
use tvguide_core::UserId;
use url::form_urlencoded;

use super::error::InitDataError;

/// HMAC key used to derive the signing key from the bot token.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Reserved field carrying the signature.
const HASH_FIELD: &str = "hash";

/// Field carrying the JSON-encoded user.
const USER_FIELD: &str = "user";

/// Field carrying the unix timestamp the payload was issued at.
const AUTH_DATE_FIELD: &str = "auth_date";

/// Telegram user extracted from a verified `initData` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allows_write_to_pm: Option<bool>,
}

/// Verifies `initData` payloads signed with the bot token.
#[derive(Clone)]
pub struct InitDataVerifier {
    bot_token: SecretString,
    max_age: Option<Duration>,
}

impl std::fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("bot_token", &"[REDACTED]")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl InitDataVerifier {
    /// Create a verifier for the given bot token.
    #[must_use]
    pub const fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            max_age: None,
        }
    }

    /// Also reject payloads whose `auth_date` is older than `max_age`.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Verify a raw `initData` string and extract the user.
    ///
    /// # Errors
    ///
    /// Returns an [`InitDataError`] describing the first check that failed.
    /// The verifier never panics and performs no I/O.
    #[instrument(skip_all)]
    pub fn verify(&self, init_data: &str) -> Result<AuthenticatedUser, InitDataError> {
        if init_data.trim().is_empty() {
            return Err(InitDataError::Empty);
        }

        let mut hash = None;
        let mut pairs = Vec::new();
        for (key, value) in form_urlencoded::parse(init_data.as_bytes()) {
            if key == HASH_FIELD {
                if hash.is_none() {
                    hash = Some(value.into_owned());
                }
            } else {
                pairs.push((key.into_owned(), value.into_owned()));
            }
        }

        let hash = hash.ok_or(InitDataError::MissingHash)?;
        let expected = self.compute_hash(&data_check_string(pairs.clone()))?;

        if !constant_time_compare(&expected, &hash) {
            return Err(InitDataError::SignatureMismatch);
        }

        debug!("initData signature verified");

        if let Some(max_age) = self.max_age {
            check_freshness(&pairs, max_age)?;
        }

        let user_json = pairs
            .iter()
            .find(|(key, _)| key == USER_FIELD)
            .map(|(_, value)| value.as_str())
            .ok_or(InitDataError::MissingUser)?;

        let user: AuthenticatedUser = serde_json::from_str(user_json)
            .map_err(|e| InitDataError::InvalidUser(e.to_string()))?;
        if user.id.as_i64() == 0 {
            return Err(InitDataError::InvalidUser("id is zero".to_string()));
        }

        Ok(user)
    }

    /// Build a signed `initData` string from key/value pairs.
    ///
    /// Any `hash` pair in the input is ignored. Used by tests and the CLI to
    /// produce payloads for local development.
    ///
    /// # Errors
    ///
    /// Returns an error if the HMAC key cannot be initialised.
    pub fn sign(&self, pairs: &[(&str, &str)]) -> Result<String, InitDataError> {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .filter(|(key, _)| *key != HASH_FIELD)
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();

        let hash = self.compute_hash(&data_check_string(owned.clone()))?;

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &owned {
            serializer.append_pair(key, value);
        }
        serializer.append_pair(HASH_FIELD, &hash);

        Ok(serializer.finish())
    }

    /// Lowercase hex HMAC of the data-check string under the derived key.
    fn compute_hash(&self, data_check_string: &str) -> Result<String, InitDataError> {
        let mut key_mac = Hmac::<Sha256>::new_from_slice(WEB_APP_DATA_KEY)
            .map_err(|e| InitDataError::Key(e.to_string()))?;
        key_mac.update(self.bot_token.expose_secret().as_bytes());
        let secret_key = key_mac.finalize().into_bytes();

        let mut mac = Hmac::<Sha256>::new_from_slice(&secret_key)
            .map_err(|e| InitDataError::Key(e.to_string()))?;
        mac.update(data_check_string.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Sort pairs by key (stable, byte-wise) and join them as `key=value` lines.
fn data_check_string(mut pairs: Vec<(String, String)>) -> String {
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_freshness(pairs: &[(String, String)], max_age: Duration) -> Result<(), InitDataError> {
    let auth_date = pairs
        .iter()
        .find(|(key, _)| key == AUTH_DATE_FIELD)
        .and_then(|(_, value)| value.parse::<i64>().ok())
        .ok_or(InitDataError::MissingAuthDate)?;

    let max_age_secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    let age = chrono::Utc::now().timestamp().saturating_sub(auth_date);

    if age > max_age_secs {
        return Err(InitDataError::Expired);
    }

    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const BOT_TOKEN: &str = "7312095864:AAGk2Vq9xRbT1mZcWp4LsYd8NhJf3Ue6OiQ";
    const USER_JSON: &str = r#"{"id":42,"first_name":"Ada","username":"ada_l","language_code":"en"}"#;

    fn verifier() -> InitDataVerifier {
        InitDataVerifier::new(SecretString::from(BOT_TOKEN))
    }

    fn sample_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", USER_JSON),
            ("auth_date", "1712345678"),
        ]
    }

    fn encode(pairs: &[(String, String)], hash: &str) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            serializer.append_pair(key, value);
        }
        serializer.append_pair("hash", hash);
        serializer.finish()
    }

    /// Compute the signature independently of `compute_hash`.
    fn reference_hash(token: &str, check: &str) -> String {
        let mut key_mac = Hmac::<Sha256>::new_from_slice(b"WebAppData").unwrap();
        key_mac.update(token.as_bytes());
        let key = key_mac.finalize().into_bytes();
        let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
        mac.update(check.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn hash_of(init_data: &str) -> String {
        form_urlencoded::parse(init_data.as_bytes())
            .find(|(k, _)| k == "hash")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_data_check_string_sorted_by_key() {
        let check = data_check_string(vec![
            ("user".to_string(), "{}".to_string()),
            ("auth_date".to_string(), "1".to_string()),
            ("query_id".to_string(), "q".to_string()),
        ]);
        assert_eq!(check, "auth_date=1\nquery_id=q\nuser={}");
    }

    #[test]
    fn test_sign_matches_reference_algorithm() {
        let init_data = verifier().sign(&sample_pairs()).unwrap();
        let check = format!("auth_date=1712345678\nquery_id=AAHdF6IQAAAAAN0XohDhrOrc\nuser={USER_JSON}");

        assert_eq!(hash_of(&init_data), reference_hash(BOT_TOKEN, &check));
    }

    #[test]
    fn test_verify_valid_payload() {
        let init_data = verifier().sign(&sample_pairs()).unwrap();
        let user = verifier().verify(&init_data).unwrap();

        assert_eq!(user.id, UserId::new(42));
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.username.as_deref(), Some("ada_l"));
        assert_eq!(user.last_name, None);
    }

    #[test]
    fn test_verify_is_deterministic() {
        let init_data = verifier().sign(&sample_pairs()).unwrap();
        let first = verifier().verify(&init_data);
        for _ in 0..10 {
            assert_eq!(verifier().verify(&init_data), first);
        }

        let bad = init_data.replace("auth_date=1712345678", "auth_date=1712345679");
        let first_bad = verifier().verify(&bad);
        assert!(first_bad.is_err());
        for _ in 0..10 {
            assert_eq!(verifier().verify(&bad), first_bad);
        }
    }

    #[test]
    fn test_verify_is_independent_of_pair_order() {
        let init_data = verifier().sign(&sample_pairs()).unwrap();
        let hash = hash_of(&init_data);

        let mut pairs: Vec<(String, String)> = sample_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        pairs.reverse();
        assert!(verifier().verify(&encode(&pairs, &hash)).is_ok());

        pairs.rotate_left(1);
        assert!(verifier().verify(&encode(&pairs, &hash)).is_ok());

        // hash first instead of last
        let mut hash_first = form_urlencoded::Serializer::new(String::new());
        hash_first.append_pair("hash", &hash);
        for (key, value) in &pairs {
            hash_first.append_pair(key, value);
        }
        assert!(verifier().verify(&hash_first.finish()).is_ok());
    }

    #[test]
    fn test_any_single_character_change_in_a_field_is_rejected() {
        let init_data = verifier().sign(&sample_pairs()).unwrap();
        let hash = hash_of(&init_data);
        let originals: Vec<(String, String)> = sample_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for field in 0..originals.len() {
            let value: Vec<char> = originals[field].1.chars().collect();
            for position in 0..value.len() {
                let mut tampered_value = value.clone();
                tampered_value[position] = if value[position] == 'x' { 'y' } else { 'x' };

                let mut tampered = originals.clone();
                tampered[field].1 = tampered_value.into_iter().collect();

                assert!(
                    verifier().verify(&encode(&tampered, &hash)).is_err(),
                    "change at {field}:{position} was accepted"
                );
            }
        }
    }

    #[test]
    fn test_any_single_character_change_in_hash_is_rejected() {
        let init_data = verifier().sign(&sample_pairs()).unwrap();
        let hash: Vec<char> = hash_of(&init_data).chars().collect();
        let pairs: Vec<(String, String)> = sample_pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for position in 0..hash.len() {
            let mut tampered = hash.clone();
            tampered[position] = if hash[position] == '0' { '1' } else { '0' };
            let tampered: String = tampered.into_iter().collect();

            assert_eq!(
                verifier().verify(&encode(&pairs, &tampered)),
                Err(InitDataError::SignatureMismatch)
            );
        }
    }

    #[test]
    fn test_uppercase_hash_is_rejected() {
        let init_data = verifier().sign(&sample_pairs()).unwrap();
        let hash = hash_of(&init_data);
        let upper = init_data.replace(&hash, &hash.to_uppercase());

        assert_eq!(
            verifier().verify(&upper),
            Err(InitDataError::SignatureMismatch)
        );
    }

    #[test]
    fn test_wrong_bot_token_is_rejected() {
        let init_data = verifier().sign(&sample_pairs()).unwrap();
        let other = InitDataVerifier::new(SecretString::from("7312095864:BBGk2Vq9xRbT1mZcWp4LsYd8NhJf3Ue6OiQ"));

        assert_eq!(
            other.verify(&init_data),
            Err(InitDataError::SignatureMismatch)
        );
    }

    #[test]
    fn test_missing_hash_or_empty_payload() {
        assert_eq!(verifier().verify(""), Err(InitDataError::Empty));
        assert_eq!(
            verifier().verify("auth_date=1&user=%7B%22id%22%3A1%7D"),
            Err(InitDataError::MissingHash)
        );
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        assert!(verifier().verify("%%%not a query string&&&=").is_err());
        assert!(verifier().verify("hash").is_err());
    }

    #[test]
    fn test_signed_payload_without_user() {
        let init_data = verifier().sign(&[("auth_date", "1712345678")]).unwrap();
        assert_eq!(
            verifier().verify(&init_data),
            Err(InitDataError::MissingUser)
        );
    }

    #[test]
    fn test_signed_payload_with_malformed_user() {
        let not_json = verifier().sign(&[("user", "{not json")]).unwrap();
        assert!(matches!(
            verifier().verify(&not_json),
            Err(InitDataError::InvalidUser(_))
        ));

        let no_id = verifier().sign(&[("user", r#"{"first_name":"Ada"}"#)]).unwrap();
        assert!(matches!(
            verifier().verify(&no_id),
            Err(InitDataError::InvalidUser(_))
        ));

        let string_id = verifier().sign(&[("user", r#"{"id":"42"}"#)]).unwrap();
        assert!(matches!(
            verifier().verify(&string_id),
            Err(InitDataError::InvalidUser(_))
        ));

        let zero_id = verifier()
            .sign(&[("user", r#"{"id":0,"first_name":"Ada"}"#)])
            .unwrap();
        assert!(matches!(
            verifier().verify(&zero_id),
            Err(InitDataError::InvalidUser(_))
        ));
    }

    #[test]
    fn test_sign_ignores_supplied_hash() {
        let init_data = verifier()
            .sign(&[("hash", "deadbeef"), ("user", r#"{"id":7}"#)])
            .unwrap();
        assert!(!init_data.contains("deadbeef"));
        assert_eq!(verifier().verify(&init_data).unwrap().id, UserId::new(7));
    }

    #[test]
    fn test_max_age_rejects_stale_payload() {
        let verifier = verifier().with_max_age(Duration::from_secs(3600));
        let stale = verifier.sign(&sample_pairs()).unwrap();
        assert_eq!(verifier.verify(&stale), Err(InitDataError::Expired));

        let now = chrono::Utc::now().timestamp().to_string();
        let fresh = verifier
            .sign(&[("auth_date", now.as_str()), ("user", USER_JSON)])
            .unwrap();
        assert!(verifier.verify(&fresh).is_ok());

        let undated = verifier.sign(&[("user", USER_JSON)]).unwrap();
        assert_eq!(
            verifier.verify(&undated),
            Err(InitDataError::MissingAuthDate)
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug_output = format!("{:?}", verifier());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(BOT_TOKEN));
    }
}
