//! Reminder records and their status machine.
//!
//! ```text
//! active ──▶ sent
//!    │──────▶ expired
//!    └──────▶ cancelled
//! ```
//! Every non-active status is terminal. `cancelled` may also overwrite a
//! terminal status (cancellation is unconditional).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// The store could not be reached or rejected the operation
    #[error("Reminder store unavailable: {0}")]
    Store(String),

    /// The notification sink refused a push
    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Reminder not found: {0}")]
    NotFound(String),

    #[error("Invalid reminder status: {0}")]
    InvalidStatus(String),

    #[error("Advance notice out of range: {0} minutes")]
    InvalidAdvance(i64),
}

impl ReminderError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        ReminderError::Store(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderStatus {
    /// Waiting for its notification window
    Active,
    /// Notification delivered
    Sent,
    /// Notification window missed
    Expired,
    /// Withdrawn by the user or an operator
    Cancelled,
}

impl ReminderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReminderStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Active => "active",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Expired => "expired",
            ReminderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ReminderStatus::Active),
            "sent" => Ok(ReminderStatus::Sent),
            "expired" => Ok(ReminderStatus::Expired),
            "cancelled" => Ok(ReminderStatus::Cancelled),
            _ => Err(ReminderError::InvalidStatus(s.to_string())),
        }
    }
}

/// Fields supplied by the user when asking to be reminded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub user_id: String,
    pub stop_name: String,
    pub route_id: String,
    pub eta: DateTime<Utc>,
    pub advance_minutes: i64,
}

/// A persisted reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    pub stop_name: String,
    pub route_id: String,
    /// When the truck is expected at the stop
    pub eta: DateTime<Utc>,
    pub advance_minutes: i64,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `eta - advance_minutes`, checked
pub fn notify_at(eta: DateTime<Utc>, advance_minutes: i64) -> Option<DateTime<Utc>> {
    Duration::try_minutes(advance_minutes).and_then(|advance| eta.checked_sub_signed(advance))
}

/// What a dispatch pass should do with an active reminder at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    /// Before the notification window
    TooEarly,
    /// Inside `[notify_at, eta]`
    Due,
    /// After the ETA without a delivered notification
    Missed,
}

impl Reminder {
    /// Start of the notification window, or `None` when `advance_minutes`
    /// reaches outside the representable time range
    pub fn notify_at(&self) -> Option<DateTime<Utc>> {
        notify_at(self.eta, self.advance_minutes)
    }

    /// A reminder whose window cannot be computed is `Missed` so dispatch
    /// retires it.
    pub fn due_state(&self, now: DateTime<Utc>) -> DueState {
        let Some(notify_at) = self.notify_at() else {
            return DueState::Missed;
        };
        if now < notify_at {
            DueState::TooEarly
        } else if now > self.eta {
            DueState::Missed
        } else {
            DueState::Due
        }
    }

    /// Whole minutes from `now` until the ETA, truncated toward zero
    pub fn minutes_until_arrival(&self, now: DateTime<Utc>) -> i64 {
        (self.eta - now).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reminder(advance_minutes: i64) -> Reminder {
        let eta = Utc.with_ymd_and_hms(2024, 5, 2, 11, 0, 0).unwrap();
        Reminder {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            stop_name: "Stop".to_string(),
            route_id: "V1".to_string(),
            eta,
            advance_minutes,
            status: ReminderStatus::Active,
            created_at: eta - Duration::hours(12),
            updated_at: eta - Duration::hours(12),
        }
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            ReminderStatus::Active,
            ReminderStatus::Sent,
            ReminderStatus::Expired,
            ReminderStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<ReminderStatus>(), Ok(status));
        }
        assert_eq!("SENT".parse::<ReminderStatus>(), Ok(ReminderStatus::Sent));
        assert!(matches!(
            "done".parse::<ReminderStatus>(),
            Err(ReminderError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_only_active_is_not_terminal() {
        assert!(!ReminderStatus::Active.is_terminal());
        assert!(ReminderStatus::Sent.is_terminal());
        assert!(ReminderStatus::Expired.is_terminal());
        assert!(ReminderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_due_state_boundaries() {
        let r = reminder(10);
        let notify_at = r.notify_at().unwrap();
        assert_eq!(notify_at, r.eta - Duration::minutes(10));

        assert_eq!(
            r.due_state(notify_at - Duration::seconds(1)),
            DueState::TooEarly
        );
        assert_eq!(r.due_state(notify_at), DueState::Due);
        assert_eq!(r.due_state(r.eta), DueState::Due);
        assert_eq!(r.due_state(r.eta + Duration::seconds(1)), DueState::Missed);
    }

    #[test]
    fn test_zero_advance_is_due_only_at_eta() {
        let r = reminder(0);
        assert_eq!(
            r.due_state(r.eta - Duration::seconds(1)),
            DueState::TooEarly
        );
        assert_eq!(r.due_state(r.eta), DueState::Due);
    }

    #[test]
    fn test_out_of_range_advance_is_missed() {
        let r = reminder(1_000_000_000_000);
        assert_eq!(r.notify_at(), None);
        assert_eq!(r.due_state(r.eta - Duration::minutes(5)), DueState::Missed);

        let r = reminder(i64::MAX);
        assert_eq!(r.notify_at(), None);
        assert_eq!(r.due_state(r.eta), DueState::Missed);
    }

    #[test]
    fn test_minutes_until_arrival_truncates() {
        let r = reminder(10);
        assert_eq!(r.minutes_until_arrival(r.eta - Duration::seconds(590)), 9);
        assert_eq!(r.minutes_until_arrival(r.eta - Duration::seconds(30)), 0);
        assert_eq!(r.minutes_until_arrival(r.eta), 0);
    }
}
