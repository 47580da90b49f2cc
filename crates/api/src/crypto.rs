//! Password, token and one-time-code primitives.
//!
//! Everything here draws from a cryptographically secure source: Argon2 salts
//! from the OS RNG, tokens and OTP digits from the thread-local CSPRNG. An
//! unavailable entropy source is a hard failure, never a silent fallback.

use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use rand::Rng;

/// Bearer tokens are this many random bytes, hex encoded.
pub const SESSION_ID_BYTES: usize = 32;
pub const OTP_LENGTH: usize = 6;

/// A well-formed Argon2 hash that matches no input, used to keep the
/// login path's timing uniform when the account doesn't exist.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Slow salted hash for passwords and OTP codes.
pub fn hash(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|err| anyhow!("password hashing failed: {err}"))?;

    Ok(hash.to_string())
}

/// Verify a secret against a stored hash. A malformed hash verifies false.
pub fn verify(secret: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// Generate an opaque bearer token: 32 random bytes, hex encoded.
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; SESSION_ID_BYTES] = rng.random();
    hex::encode(bytes)
}

/// Generate a fixed-width numeric one-time code. Each digit is drawn
/// independently so leading zeros survive.
pub fn generate_otp(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
