//! # Reminder Scheduler
//!
//! Owns every reminder status change. A dispatch pass walks active reminders
//! one at a time in fetch order and either waits, notifies, or expires each.
//! A cleanup pass expires active reminders whose ETA fell behind the
//! retention cutoff without ever being seen by dispatch.
//!
//! A failed push leaves the reminder active so the next pass retries it; the
//! retries stop once the ETA passes and dispatch marks it expired. Overlapping
//! passes are harmless because a reminder moved out of `active` by one pass
//! is absent from the next pass's fetch.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: ETA-relative reminders with explicit status machine and cleanup pass
//! - 1.0.0: Initial release with fixed-time reminders

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::model::{notify_at, DueState, NewReminder, Reminder, ReminderError, ReminderStatus};
use super::store::ReminderStore;
use crate::core::Config;
use crate::features::notify::Notifier;

/// Timing knobs for the background loops
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub dispatch_interval: std::time::Duration,
    pub cleanup_interval: std::time::Duration,
    /// Dispatch also looks at reminders whose ETA is up to this far in the past
    pub horizon: Duration,
    /// Cleanup expires active reminders with an ETA older than this
    pub retention: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: std::time::Duration::from_secs(60),
            cleanup_interval: std::time::Duration::from_secs(3600),
            horizon: Duration::minutes(5),
            retention: Duration::hours(24),
        }
    }
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dispatch_interval: config.dispatch_interval,
            cleanup_interval: config.cleanup_interval,
            horizon: config.dispatch_horizon,
            ..Self::default()
        }
    }
}

/// Counts from one dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub examined: usize,
    /// Not yet inside the notification window
    pub waiting: usize,
    pub sent: usize,
    pub expired: usize,
    /// Push or status write failed; reminder left as it was
    pub failed: usize,
}

enum Outcome {
    Waiting,
    Sent,
    Expired,
    Failed,
    Skipped,
}

/// Text pushed to the user when a reminder fires
pub fn reminder_message(stop_name: &str, minutes_until_arrival: i64) -> String {
    if minutes_until_arrival <= 0 {
        format!("🗑️ 垃圾車提醒\n\n垃圾車即將抵達 {stop_name}！\n請準備好垃圾袋出門。")
    } else {
        format!(
            "🗑️ 垃圾車提醒\n\n垃圾車將在 {minutes_until_arrival} 分鐘後抵達 {stop_name}\n請準備好垃圾袋。"
        )
    }
}

pub struct ReminderScheduler<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: SchedulerConfig,
}

impl<S, N> ReminderScheduler<S, N>
where
    S: ReminderStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: SchedulerConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a reminder `advance_minutes` before `eta`. Duplicates are allowed.
    pub async fn create(
        &self,
        user_id: &str,
        stop_name: &str,
        route_id: &str,
        eta: DateTime<Utc>,
        advance_minutes: i64,
    ) -> Result<Reminder, ReminderError> {
        if advance_minutes < 0 || notify_at(eta, advance_minutes).is_none() {
            return Err(ReminderError::InvalidAdvance(advance_minutes));
        }
        let new = NewReminder {
            user_id: user_id.to_string(),
            stop_name: stop_name.to_string(),
            route_id: route_id.to_string(),
            eta,
            advance_minutes,
        };
        let reminder = self.store.create_reminder(&new, Utc::now()).await?;
        info!(
            "Created reminder {} for user {} at {} ({} min before {})",
            reminder.id, user_id, stop_name, advance_minutes, eta
        );
        Ok(reminder)
    }

    /// Cancel regardless of the current status
    pub async fn cancel(&self, reminder_id: &str) -> Result<(), ReminderError> {
        self.store
            .update_reminder_status(reminder_id, ReminderStatus::Cancelled, Utc::now())
            .await?;
        info!("Cancelled reminder {reminder_id}");
        Ok(())
    }

    pub async fn user_reminders(&self, user_id: &str) -> Result<Vec<Reminder>, ReminderError> {
        self.store.get_user_reminders(user_id).await
    }

    /// Dispatch pass at the current instant. This is the entry point for
    /// external time-based triggers as well as the in-process ticker.
    pub async fn dispatch_due(&self) -> Result<PassReport, ReminderError> {
        self.process_reminders(Utc::now()).await
    }

    /// Dispatch pass as of `now`, over reminders with an ETA inside the horizon
    pub async fn process_reminders(&self, now: DateTime<Utc>) -> Result<PassReport, ReminderError> {
        self.process_reminders_after(now - self.config.horizon, now)
            .await
    }

    /// Dispatch pass over active reminders with an ETA strictly after `after`.
    /// A failed fetch aborts the pass before anything is written.
    pub async fn process_reminders_after(
        &self,
        after: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<PassReport, ReminderError> {
        let reminders = self.store.get_active_reminders(after).await?;
        info!(
            "Found {} active reminders to process at {}",
            reminders.len(),
            now.format("%Y-%m-%d %H:%M:%S")
        );

        let mut report = PassReport::default();
        for reminder in &reminders {
            report.examined += 1;
            match self.process_one(reminder, now).await {
                Outcome::Waiting => report.waiting += 1,
                Outcome::Sent => report.sent += 1,
                Outcome::Expired => report.expired += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Skipped => {}
            }
        }

        if report.sent + report.expired + report.failed > 0 {
            info!(
                "Dispatch pass: {} sent, {} expired, {} failed, {} waiting",
                report.sent, report.expired, report.failed, report.waiting
            );
        }
        Ok(report)
    }

    async fn process_one(&self, reminder: &Reminder, now: DateTime<Utc>) -> Outcome {
        if reminder.status != ReminderStatus::Active {
            debug!(
                "Reminder {} is {}, skipping",
                reminder.id, reminder.status
            );
            return Outcome::Skipped;
        }

        match reminder.due_state(now) {
            DueState::TooEarly => {
                debug!(
                    "Reminder {}: too early (notify at {:?}, now {})",
                    reminder.id,
                    reminder.notify_at(),
                    now
                );
                Outcome::Waiting
            }
            DueState::Missed => {
                debug!("Reminder {}: ETA {} has passed", reminder.id, reminder.eta);
                match self
                    .store
                    .update_reminder_status(&reminder.id, ReminderStatus::Expired, now)
                    .await
                {
                    Ok(()) => Outcome::Expired,
                    Err(e) => {
                        error!("Failed to mark reminder {} expired: {e}", reminder.id);
                        Outcome::Failed
                    }
                }
            }
            DueState::Due => {
                let text = reminder_message(
                    &reminder.stop_name,
                    reminder.minutes_until_arrival(now),
                );
                if let Err(e) = self.notifier.push(&reminder.user_id, &text).await {
                    warn!(
                        "Failed to notify user {} for reminder {}: {e:#}",
                        reminder.user_id, reminder.id
                    );
                    return Outcome::Failed;
                }

                match self
                    .store
                    .update_reminder_status(&reminder.id, ReminderStatus::Sent, now)
                    .await
                {
                    Ok(()) => {
                        info!(
                            "Sent reminder {} to user {} for stop {}",
                            reminder.id, reminder.user_id, reminder.stop_name
                        );
                        Outcome::Sent
                    }
                    Err(e) => {
                        error!(
                            "Reminder {} was delivered but its status was not saved: {e}",
                            reminder.id
                        );
                        Outcome::Failed
                    }
                }
            }
        }
    }

    /// Expire active reminders whose ETA is older than `now - retention`.
    /// Returns how many were expired.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<usize, ReminderError> {
        let cutoff = now - self.config.retention;
        let reminders = self
            .store
            .get_active_reminders(DateTime::<Utc>::MIN_UTC)
            .await?;

        let mut expired = 0;
        for reminder in reminders.iter().filter(|r| r.eta < cutoff) {
            match self
                .store
                .update_reminder_status(&reminder.id, ReminderStatus::Expired, now)
                .await
            {
                Ok(()) => expired += 1,
                Err(e) => error!("Failed to clean up reminder {}: {e}", reminder.id),
            }
        }

        if expired > 0 {
            info!("Cleanup expired {expired} stale reminders");
        }
        Ok(expired)
    }

    /// Run dispatch and cleanup on their own intervals until `shutdown` flips
    /// to `true` or its sender is dropped. The two loops never wait on each
    /// other, and a pass in progress always finishes before its loop stops.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        info!(
            "Reminder scheduler started (dispatch every {:?}, cleanup every {:?})",
            self.config.dispatch_interval, self.config.cleanup_interval
        );

        tokio::join!(
            self.dispatch_loop(shutdown.clone()),
            self.cleanup_loop(shutdown)
        );

        info!("Reminder scheduler stopped");
    }

    async fn dispatch_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.dispatch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.dispatch_due().await {
                        error!("Error processing reminders: {e}");
                    }
                }
            }
        }
        debug!("Dispatch loop stopped");
    }

    async fn cleanup_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.cleanup_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.cleanup_expired(Utc::now()).await {
                        error!("Error cleaning up expired reminders: {e}");
                    }
                }
            }
        }
        debug!("Cleanup loop stopped");
    }
}
