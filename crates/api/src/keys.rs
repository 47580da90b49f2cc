//! Cache key derivation for credentials.
//!
//! Every ephemeral credential lives under a key built from a fixed purpose
//! tag, so the five families can never collide with each other:
//!
//! ```text
//! {email}-{role}-reg-otp       → pending signup (JSON)
//! access-{token}               → session payload (JSON)
//! refresh-{token}              → session payload (JSON)
//! {email}-{role}-reset-token   → password reset token (raw)
//! {email}-{role}-reset-otp     → password reset code (hashed)
//! ```
//!
//! Emails cannot end in a role/tag suffix and tokens are hex, so the families
//! stay disjoint for any real input. That is a formatting assumption, not a
//! cryptographic guarantee.

use shared::api::UserRole;

pub fn signup_otp(email: &str, role: UserRole) -> String {
    format!("{email}-{role}-reg-otp")
}

pub fn access_token(token: &str) -> String {
    format!("access-{token}")
}

pub fn refresh_token(token: &str) -> String {
    format!("refresh-{token}")
}

pub fn pass_reset_token(email: &str, role: UserRole) -> String {
    format!("{email}-{role}-reset-token")
}

pub fn pass_reset_otp(email: &str, role: UserRole) -> String {
    format!("{email}-{role}-reset-otp")
}
