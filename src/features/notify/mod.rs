//! # Notification Feature
//!
//! Outbound push messages to a single user.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod line;

use anyhow::Result;
use async_trait::async_trait;

pub use line::LineNotifier;

/// Delivers a text message to one user. An `Err` means the message was not
/// accepted and may be retried later.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn push(&self, user_id: &str, text: &str) -> Result<()>;
}
