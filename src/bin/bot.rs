use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;

use garbage_bot::core::Config;
use garbage_bot::database::Database;
use garbage_bot::features::notify::LineNotifier;
use garbage_bot::features::reminders::{ReminderScheduler, SchedulerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting garbage collection reminder bot...");
    info!("Service timezone: {}", config.timezone);

    let database = Database::new(&config.database_path).await?;
    let notifier = LineNotifier::new(config.channel_access_token.clone())?;

    let scheduler = Arc::new(ReminderScheduler::new(
        Arc::new(database),
        Arc::new(notifier),
        SchedulerConfig::from_config(&config),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown requested, waiting for the scheduler to finish its pass...");

    // Receiver also stops if the sender is dropped, so a failed send is fine
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task ended abnormally: {e}");
    }

    info!("Bye");
    Ok(())
}
