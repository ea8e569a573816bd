//! # Reminders Feature
//!
//! One-shot "truck is coming" reminders with background delivery.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod model;
pub mod request;
pub mod scheduler;
pub mod store;

pub use model::{DueState, NewReminder, Reminder, ReminderError, ReminderStatus};
pub use request::{ReminderRequest, RequestError, DEFAULT_ADVANCE_MINUTES};
pub use scheduler::{reminder_message, PassReport, ReminderScheduler, SchedulerConfig};
pub use store::{MemoryStore, ReminderStore};
