//! Email sending abstraction (SMTP via lettre).

use anyhow::Result;
use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub const COMPANY: &str = "MedLink";

/// Email sender abstraction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send the signup verification code.
    async fn send_signup_verification(&self, to: &str, otp_code: &str, validity: &str)
    -> Result<()>;

    /// Send the password reset link plus OTP code.
    async fn send_password_reset(
        &self,
        to: &str,
        link: &str,
        otp_code: &str,
        validity: &str,
    ) -> Result<()>;
}

/// SMTP sender using lettre's async transport.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(smtp_url: &str, email_domain: &str) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(smtp_url)?.build();
        let from = Mailbox::new(
            Some(COMPANY.to_owned()),
            format!("noreply@{email_domain}").parse()?,
        );

        Ok(Self { transport, from })
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to.parse()?))
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport.send(email).await?;

        Ok(())
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_signup_verification(
        &self,
        to: &str,
        otp_code: &str,
        validity: &str,
    ) -> Result<()> {
        self.send(
            to,
            "Almost Done! Verify Your Account Now",
            format!(
                "Your {COMPANY} verification code is: {otp_code}\n\n\
                 The code expires in {validity}.",
            ),
        )
        .await
    }

    async fn send_password_reset(
        &self,
        to: &str,
        link: &str,
        otp_code: &str,
        validity: &str,
    ) -> Result<()> {
        self.send(
            to,
            "Reset Your Password",
            format!(
                "Reset your {COMPANY} password here: {link}\n\n\
                 Or enter this code instead: {otp_code}\n\n\
                 Both expire in {validity}.",
            ),
        )
        .await
    }
}
