use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio::time::{MissedTickBehavior, interval};

use crate::config::IngestConfig;
use crate::services::dashboard::DashboardService;
use crate::services::protocol_ingestor::ProtocolIngestor;
use crate::services::sync_status::{self, intervals, jobs};

/// Longest wait between sync-status checks
const MAX_POLL_PERIOD: Duration = Duration::from_secs(60);

/// How often the job checks whether a run is due. Shorter than the run
/// interval so a due run starts within one poll period.
pub fn poll_period(run_interval: Duration) -> Duration {
    run_interval.min(MAX_POLL_PERIOD)
}

pub async fn start_protocol_sync_job(
    db: DatabaseConnection,
    ingestor: Arc<ProtocolIngestor>,
    dashboard: DashboardService,
    config: IngestConfig,
) {
    tokio::spawn(async move {
        let min_interval = i32::try_from(config.interval.as_secs())
            .unwrap_or(intervals::PROTOCOL_INGESTION);
        // First tick fires immediately, so a fresh deployment ingests on startup
        let mut ticker = interval(poll_period(config.interval));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match sync_status::should_sync(&db, jobs::PROTOCOL_INGESTION, min_interval).await {
                Ok(true) => {
                    tracing::info!("Starting scheduled protocol ingestion");
                    run_once(&db, &ingestor, &dashboard, config.run_timeout, min_interval).await;
                }
                Ok(false) => {
                    tracing::debug!("Skipping scheduled protocol ingestion (recently synced)");
                }
                Err(e) => {
                    tracing::warn!("Failed to check sync status: {}", e);
                }
            }
        }
    });
}

async fn run_once(
    db: &DatabaseConnection,
    ingestor: &ProtocolIngestor,
    dashboard: &DashboardService,
    run_timeout: Duration,
    min_interval: i32,
) {
    let result = ingestor.run_with_timeout(run_timeout).await;

    // Partial writes are visible even when the run failed
    dashboard.invalidate();

    if result.success {
        if let Err(e) =
            sync_status::record_success(db, jobs::PROTOCOL_INGESTION, min_interval, &result).await
        {
            tracing::warn!("Failed to record sync success: {}", e);
        }
    } else {
        let message = result
            .error
            .as_ref()
            .map(|e| format!("{} ({}): {}", e.kind, e.phase, e.message))
            .unwrap_or_else(|| "unknown failure".to_string());
        tracing::error!(run_id = %result.run_id, "Protocol ingestion failed: {}", message);
        if let Err(e) =
            sync_status::record_failure(db, jobs::PROTOCOL_INGESTION, &message, min_interval).await
        {
            tracing::warn!("Failed to record sync failure: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_period_is_capped() {
        assert_eq!(poll_period(Duration::from_secs(3600)), Duration::from_secs(60));
        assert_eq!(poll_period(Duration::from_secs(30)), Duration::from_secs(30));
    }
}
