// Core layer - shared configuration and time handling
pub mod core;

// Features layer - catalog matching, notifications, reminders
pub mod features;

// Infrastructure
pub mod database;

pub use core::Config;
pub use database::{Database, Favorite, User};

pub use features::{
    // Collection
    Candidate, Catalog, CollectionPoint, Coordinate, HttpCatalog, Matcher, StopSearch, TimeWindow,
    // Notify
    LineNotifier, Notifier,
    // Reminders
    MemoryStore, Reminder, ReminderScheduler, ReminderStatus, ReminderStore,
};
