use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::core::config::Settings;

const ARGON2_MEMORY_KIB: u32 = 19_456;
const ARGON2_TIME: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("password hashing failed")]
    Hashing,
    #[error("password verification failed")]
    Verification,
    #[error("jwt encoding failed")]
    JwtEncoding,
    #[error("jwt decoding failed")]
    JwtDecoding,
    #[error("unsupported jwt algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

impl Claims {
    fn issue(subject: &str, lifetime: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            sub: subject.to_owned(),
            iat: now.unix_timestamp(),
            exp: (now + lifetime).unix_timestamp(),
        }
    }
}

fn argon2() -> Result<Argon2<'static>, argon2::Error> {
    argon2::Params::new(ARGON2_MEMORY_KIB, ARGON2_TIME, ARGON2_PARALLELISM, None)
        .map(|params| Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
}

pub(crate) fn hash_password(password: &str) -> Result<String, SecurityError> {
    let salt = SaltString::generate(&mut OsRng);
    let hasher = argon2().map_err(|_| SecurityError::Hashing)?;
    hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| SecurityError::Hashing)
}

/// `Ok(false)` on a wrong password, `Err` when the stored hash is unusable.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, SecurityError> {
    let stored = PasswordHash::new(hash).map_err(|_| SecurityError::Verification)?;
    let hasher = argon2().map_err(|_| SecurityError::Verification)?;

    match hasher.verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(SecurityError::Verification),
    }
}

/// Signs a token for `subject` (a user id). `expires_in` overrides the configured lifetime.
pub(crate) fn create_access_token(
    subject: &str,
    settings: &Settings,
    expires_in: Option<Duration>,
) -> Result<String, SecurityError> {
    let algorithm = jwt_algorithm(settings)?;
    let lifetime = expires_in
        .unwrap_or_else(|| Duration::minutes(settings.security().access_token_expire_minutes as i64));
    let key = EncodingKey::from_secret(settings.security().secret_key.as_bytes());

    encode(&Header::new(algorithm), &Claims::issue(subject, lifetime), &key)
        .map_err(|_| SecurityError::JwtEncoding)
}

pub(crate) fn verify_token(token: &str, settings: &Settings) -> Result<Claims, SecurityError> {
    let mut validation = Validation::new(jwt_algorithm(settings)?);
    validation.set_required_spec_claims(&["exp", "sub"]);
    let key = DecodingKey::from_secret(settings.security().secret_key.as_bytes());

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| SecurityError::JwtDecoding)
}

fn jwt_algorithm(settings: &Settings) -> Result<Algorithm, SecurityError> {
    let name = settings.security().algorithm.as_str();
    [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512]
        .into_iter()
        .find(|algorithm| format!("{algorithm:?}") == name)
        .ok_or_else(|| SecurityError::UnsupportedAlgorithm(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn wrong_password_verifies_false() {
        let hash = hash_password("correct-horse-battery-staple").expect("hash");
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn token_carries_subject_and_rejects_tampering() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let token =
            create_access_token("user-123", &settings, Some(Duration::minutes(1))).expect("token");
        let claims = verify_token(&token, &settings).expect("claims");
        assert_eq!(claims.sub, "user-123");
        assert!(claims.exp > claims.iat);

        let tampered = format!("{token}x");
        assert!(verify_token(&tampered, &settings).is_err());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");

        let token = create_access_token("user-123", &settings, Some(Duration::minutes(-10)))
            .expect("token");
        assert!(verify_token(&token, &settings).is_err());
    }

    #[tokio::test]
    async fn unknown_algorithm_is_reported() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("ALGORITHM", "RS256");
        let settings = Settings::load();
        std::env::remove_var("ALGORITHM");
        let settings = settings.expect("settings");

        assert!(matches!(
            create_access_token("user-123", &settings, None),
            Err(SecurityError::UnsupportedAlgorithm(name)) if name == "RS256"
        ));
    }
}
