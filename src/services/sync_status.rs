//! Sync status bookkeeping for scheduled jobs
//!
//! Tracks when each job last ran successfully so a restart does not trigger
//! a redundant full ingestion.

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entities::sync_status::{self, Entity as SyncStatus};
use crate::models::run::RunResult;

/// Job names for tracking sync status
pub mod jobs {
    pub const PROTOCOL_INGESTION: &str = "protocol_ingestion";
}

/// Default minimum intervals between syncs (in seconds)
pub mod intervals {
    pub const PROTOCOL_INGESTION: i32 = 3600; // 1 hour
}

async fn find(db: &DatabaseConnection, job_name: &str) -> Result<Option<sync_status::Model>, DbErr> {
    SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await
}

/// True once `min_interval_secs` has passed since `last_success`.
///
/// `last_success` is the start of the last successful run, so run duration
/// does not push the next run back.
pub fn is_due(last_success: NaiveDateTime, now: NaiveDateTime, min_interval_secs: i32) -> bool {
    now.signed_duration_since(last_success) >= Duration::seconds(i64::from(min_interval_secs))
}

/// Check if a sync job should run based on last successful sync time.
///
/// True on first run, when no run has ever succeeded, or when
/// `min_interval_secs` (the caller's configured interval) has elapsed.
pub async fn should_sync(
    db: &DatabaseConnection,
    job_name: &str,
    min_interval_secs: i32,
) -> Result<bool, DbErr> {
    let Some(record) = find(db, job_name).await? else {
        tracing::info!(job = job_name, "First run detected, will sync");
        return Ok(true);
    };

    let Some(last_success) = record.last_success_at else {
        tracing::info!(job = job_name, "No previous successful sync, will sync");
        return Ok(true);
    };

    let now = Utc::now().naive_utc();
    let elapsed = now.signed_duration_since(last_success);

    if is_due(last_success, now, min_interval_secs) {
        tracing::info!(
            job = job_name,
            elapsed_secs = elapsed.num_seconds(),
            min_interval_secs,
            "Interval elapsed, will sync"
        );
        Ok(true)
    } else {
        tracing::debug!(
            job = job_name,
            elapsed_secs = elapsed.num_seconds(),
            next_in_secs = min_interval_secs as i64 - elapsed.num_seconds(),
            "Skipping sync, ran recently"
        );
        Ok(false)
    }
}

/// Record a completed run with its protocol counts.
///
/// `last_success_at` is the run's start time.
pub async fn record_success(
    db: &DatabaseConnection,
    job_name: &str,
    min_interval_secs: i32,
    result: &RunResult,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();
    let started_at = result.started_at.naive_utc();
    let processed = result.protocols_processed as i64;
    let failed = result.protocols_failed as i64;

    match find(db, job_name).await? {
        Some(record) => {
            let success_count = record.success_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_success_at = Set(Some(started_at));
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(None);
            active_model.success_count = Set(success_count);
            active_model.last_processed = Set(processed);
            active_model.last_failed = Set(failed);
            active_model.min_interval_secs = Set(min_interval_secs);
            active_model.update(db).await?;
        }
        None => {
            sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(Some(started_at)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                success_count: Set(1),
                error_count: Set(0),
                last_processed: Set(processed),
                last_failed: Set(failed),
                min_interval_secs: Set(min_interval_secs),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    tracing::debug!(job = job_name, processed, failed, "Recorded successful sync");
    Ok(())
}

/// Record a failed run attempt
pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    error: &str,
    min_interval_secs: i32,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();

    match find(db, job_name).await? {
        Some(record) => {
            let error_count = record.error_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(Some(error.to_string()));
            active_model.error_count = Set(error_count);
            active_model.min_interval_secs = Set(min_interval_secs);
            active_model.update(db).await?;
        }
        None => {
            sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(None),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                success_count: Set(0),
                error_count: Set(1),
                last_processed: Set(0),
                last_failed: Set(0),
                min_interval_secs: Set(min_interval_secs),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    tracing::debug!(job = job_name, error, "Recorded failed sync");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(secs: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::seconds(secs)
    }

    #[test]
    fn test_long_run_does_not_delay_next_interval() {
        // Run started at t=0 and took 10 minutes; next tick lands at t=3600
        let started = at(0);
        assert!(is_due(started, at(3600), 3600));
        assert!(!is_due(started, at(3599), 3600));
    }

    #[test]
    fn test_not_due_when_stamped_at_run_end() {
        let finished = at(600);
        assert!(!is_due(finished, at(3600), 3600));
        assert!(is_due(finished, at(4200), 3600));
    }

    #[test]
    fn test_shorter_configured_interval_applies() {
        assert!(is_due(at(0), at(1800), 1800));
        assert!(!is_due(at(0), at(1800), 3600));
    }
}
