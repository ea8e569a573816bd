//! Persistence seam for reminders.
//!
//! The scheduler only needs simple single-document operations; whatever
//! atomicity the backing store offers for one update is all it relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::model::{NewReminder, Reminder, ReminderError, ReminderStatus};

#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Persist a new reminder as `active` and return it with its assigned id
    async fn create_reminder(
        &self,
        new: &NewReminder,
        now: DateTime<Utc>,
    ) -> Result<Reminder, ReminderError>;

    async fn get_reminder(&self, id: &str) -> Result<Option<Reminder>, ReminderError>;

    /// Active reminders whose ETA is strictly after `after`, ETA ascending
    async fn get_active_reminders(
        &self,
        after: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, ReminderError>;

    /// Overwrite the status and touch `updated_at`. Unknown ids are `NotFound`.
    async fn update_reminder_status(
        &self,
        id: &str,
        status: ReminderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), ReminderError>;

    /// A user's active reminders, ETA ascending
    async fn get_user_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, ReminderError>;
}

/// Process-local store used by tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    reminders: DashMap<String, (u64, Reminder)>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    fn collect_sorted(&self, keep: impl Fn(&Reminder) -> bool) -> Vec<Reminder> {
        let mut rows: Vec<(u64, Reminder)> = self
            .reminders
            .iter()
            .filter(|entry| keep(&entry.value().1))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|(seq_a, a), (seq_b, b)| a.eta.cmp(&b.eta).then(seq_a.cmp(seq_b)));
        rows.into_iter().map(|(_, r)| r).collect()
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn create_reminder(
        &self,
        new: &NewReminder,
        now: DateTime<Utc>,
    ) -> Result<Reminder, ReminderError> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let reminder = Reminder {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id.clone(),
            stop_name: new.stop_name.clone(),
            route_id: new.route_id.clone(),
            eta: new.eta,
            advance_minutes: new.advance_minutes,
            status: ReminderStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.reminders
            .insert(reminder.id.clone(), (seq, reminder.clone()));
        Ok(reminder)
    }

    async fn get_reminder(&self, id: &str) -> Result<Option<Reminder>, ReminderError> {
        Ok(self.reminders.get(id).map(|entry| entry.value().1.clone()))
    }

    async fn get_active_reminders(
        &self,
        after: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, ReminderError> {
        Ok(self.collect_sorted(|r| r.status == ReminderStatus::Active && r.eta > after))
    }

    async fn update_reminder_status(
        &self,
        id: &str,
        status: ReminderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), ReminderError> {
        let mut entry = self
            .reminders
            .get_mut(id)
            .ok_or_else(|| ReminderError::NotFound(id.to_string()))?;
        entry.1.status = status;
        entry.1.updated_at = now;
        Ok(())
    }

    async fn get_user_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, ReminderError> {
        Ok(self.collect_sorted(|r| r.user_id == user_id && r.status == ReminderStatus::Active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn new_reminder(user: &str, eta: DateTime<Utc>) -> NewReminder {
        NewReminder {
            user_id: user.to_string(),
            stop_name: "Stop".to_string(),
            route_id: "V1".to_string(),
            eta,
            advance_minutes: 10,
        }
    }

    #[tokio::test]
    async fn test_memory_store_active_filter_and_order() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let late = store
            .create_reminder(&new_reminder("u1", now + Duration::hours(2)), now)
            .await
            .unwrap();
        let early = store
            .create_reminder(&new_reminder("u1", now + Duration::hours(1)), now)
            .await
            .unwrap();
        let past = store
            .create_reminder(&new_reminder("u2", now - Duration::hours(1)), now)
            .await
            .unwrap();
        assert_eq!(late.status, ReminderStatus::Active);
        assert_eq!(late.created_at, now);

        let active = store.get_active_reminders(now).await.unwrap();
        let ids: Vec<_> = active.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, [early.id.as_str(), late.id.as_str()]);

        store
            .update_reminder_status(&early.id, ReminderStatus::Sent, now)
            .await
            .unwrap();
        let active = store
            .get_active_reminders(now - Duration::hours(2))
            .await
            .unwrap();
        let ids: Vec<_> = active.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, [past.id.as_str(), late.id.as_str()]);
    }

    #[tokio::test]
    async fn test_memory_store_update_unknown_is_not_found() {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert_eq!(
            store
                .update_reminder_status("missing", ReminderStatus::Cancelled, now)
                .await,
            Err(ReminderError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_memory_store_user_reminders() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create_reminder(&new_reminder("u1", now), now)
            .await
            .unwrap();
        store
            .create_reminder(&new_reminder("u2", now), now)
            .await
            .unwrap();
        let mine = store.get_user_reminders("u1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, "u1");
    }
}
