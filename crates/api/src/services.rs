//! External service abstractions.
//!
//! Each external collaborator is behind a trait so handlers can be tested
//! against mocks.
//!
//! - **email** - Transactional email via SMTP (lettre). Sends are spawned as
//!   fire-and-forget tasks at call sites; failures are logged, never surfaced.
//! - **ai** - Medicine-name suggestions via Gemini. Best-effort: any failure
//!   degrades to an empty suggestion list.

mod ai;
mod email;

pub use ai::{GeminiSuggester, MedicineSuggester};
pub use email::{COMPANY, EmailSender, SmtpEmailSender};

#[cfg(test)]
pub use ai::MockMedicineSuggester;
#[cfg(test)]
pub use email::MockEmailSender;
