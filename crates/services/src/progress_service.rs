use std::sync::Arc;

use storage::repository::WallRepository;
use wall_core::model::UserId;
use wall_core::progress::{ProgressAggregator, ProgressReport, Timeframe};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Loads a wall snapshot and runs the aggregator over it.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    aggregator: ProgressAggregator,
    wall: Arc<dyn WallRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, aggregator: ProgressAggregator, wall: Arc<dyn WallRepository>) -> Self {
        Self {
            clock,
            aggregator,
            wall,
        }
    }

    /// Progress report for `timeframe`, evaluated at the clock's current time.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn report(
        &self,
        user: &UserId,
        timeframe: Timeframe,
    ) -> Result<ProgressReport, ProgressServiceError> {
        let protocols = self.wall.list_protocols(user).await?;
        let now = self.clock.now();
        let report = self.aggregator.summarize(&protocols, timeframe, now);
        tracing::debug!(
            user = %user,
            timeframe = %timeframe,
            protocols = protocols.len(),
            overall = report.overall_progress,
            "progress report computed"
        );
        Ok(report)
    }

    /// Same as [`Self::report`], taking the raw `day`/`week`/`month` selector.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` for an unknown selector.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn report_for(
        &self,
        user: &UserId,
        selector: &str,
    ) -> Result<ProgressReport, ProgressServiceError> {
        let timeframe: Timeframe = selector.parse()?;
        self.report(user, timeframe).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use storage::repository::InMemoryRepository;
    use wall_core::CalendarPolicy;
    use wall_core::model::{ProtocolDetails, ProtocolId, TrackedProtocol};
    use wall_core::progress::ProgressError;
    use wall_core::time::{fixed_now, noon_utc};

    async fn seeded_repo(days_done: &[(&str, &[u32])]) -> Arc<InMemoryRepository> {
        let repo = Arc::new(InMemoryRepository::new());
        let user = UserId::new("u").unwrap();
        let policy = CalendarPolicy::default();
        for (title, days) in days_done {
            let mut protocol = TrackedProtocol::new(
                ProtocolId::new(title.to_lowercase()).unwrap(),
                ProtocolDetails::titled(*title),
                fixed_now(),
            )
            .unwrap();
            for &d in *days {
                protocol.toggle_completion(NaiveDate::from_ymd_opt(2024, 1, d).unwrap(), None, &policy);
            }
            repo.insert_protocol(&user, &protocol).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn report_uses_injected_clock() {
        let repo = seeded_repo(&[("A", &[1, 2, 3]), ("B", &[1, 2, 3])]).await;
        let service = ProgressService::new(
            Clock::fixed(noon_utc(2024, 1, 3)),
            ProgressAggregator::default(),
            repo,
        );

        let report = service
            .report(&UserId::new("u").unwrap(), Timeframe::Day)
            .await
            .unwrap();
        assert_eq!(report.daily_compliance, 100);
        assert_eq!(report.current_streak, 3);
        assert_eq!(report.longest_streak, 3);
    }

    #[tokio::test]
    async fn unknown_selector_is_rejected() {
        let repo = seeded_repo(&[]).await;
        let service = ProgressService::new(Clock::fixed(fixed_now()), ProgressAggregator::default(), repo);

        let err = service
            .report_for(&UserId::new("u").unwrap(), "year")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::Progress(ProgressError::InvalidTimeframe(_))
        ));
    }

    #[tokio::test]
    async fn empty_wall_reports_zeros() {
        let repo = seeded_repo(&[]).await;
        let service = ProgressService::new(Clock::fixed(fixed_now()), ProgressAggregator::default(), repo);

        let report = service
            .report_for(&UserId::new("u").unwrap(), "month")
            .await
            .unwrap();
        assert_eq!(report.daily_compliance, 0);
        assert_eq!(report.overall_progress, 0);
        assert_eq!(report.current_streak, 0);
        assert!(report.top_performing.is_empty());
        assert!(report.needs_attention.is_empty());
    }
}
