//! # Features Module
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//!
//! ## Changelog
//! - 2.0.0: Collection stops, notifications and arrival reminders

pub mod collection;
pub mod notify;
pub mod reminders;

pub use collection::{Candidate, Catalog, CollectionPoint, Coordinate, HttpCatalog, Matcher, StopSearch, TimeWindow};
pub use notify::{LineNotifier, Notifier};
pub use reminders::{MemoryStore, Reminder, ReminderScheduler, ReminderStatus, ReminderStore};
