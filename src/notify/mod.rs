//! Outbound email notifications.
//!
//! Delivery is fire-and-forget: [`Notifier::dispatch`] renders the message,
//! spawns the send on the runtime and returns immediately. A failed send is
//! logged and dropped; it never reaches the caller of the operation that
//! produced the notice.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::passes::repo_types::Pass;

pub mod smtp;
pub mod templates;

/// A lifecycle event that results in an email.
#[derive(Debug, Clone)]
pub enum Notice {
    PassCreated(Pass),
    PassApproved(Pass),
    PassRejected(Pass),
    ResetCode {
        name: String,
        email: String,
        code: String,
        ttl_minutes: i64,
    },
}

impl Notice {
    pub fn kind(&self) -> &'static str {
        match self {
            Notice::PassCreated(_) => "pass_created",
            Notice::PassApproved(_) => "pass_approved",
            Notice::PassRejected(_) => "pass_rejected",
            Notice::ResetCode { .. } => "reset_code",
        }
    }
}

/// A rendered message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to_address: String,
    pub to_name: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Queues `notice` for delivery without waiting on the transport.
    pub fn dispatch(&self, notice: Notice) -> JoinHandle<()> {
        let mailer = Arc::clone(&self.mailer);
        let kind = notice.kind();
        let mail = templates::render(&notice);
        tokio::spawn(async move {
            match mailer.send(&mail).await {
                Ok(()) => info!(kind, to = %mail.to_address, "notification sent"),
                Err(e) => warn!(kind, to = %mail.to_address, error = %e, "notification failed"),
            }
        })
    }
}
