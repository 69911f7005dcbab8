//! Outgoing mail.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("mail delivery to {recipient} failed: {reason}")]
	Delivery { recipient: String, reason: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
	/// Sends a freshly generated password to its owner.
	async fn send_new_password(&self, email: &str, password: &str) -> Result<(), Error>;
}

/// A [`Mailer`] that only records deliveries in the log.
///
/// The password itself is emitted at `TRACE` so it stays out of ordinary logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
	async fn send_new_password(&self, email: &str, password: &str) -> Result<(), Error> {
		tracing::info!(recipient = email, "sending new password");
		tracing::trace!(recipient = email, password, "new password mail body");

		Ok(())
	}
}
