//! Context monitor: maps backend usage reports onto a three-level warning.
//!
//! Refresh failures are logged and swallowed; the previous status stays in
//! place. A critical status carries a fork recommendation but the monitor
//! never forks on its own.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use colloquy_common::{MessageId, SessionId};
use colloquy_config::ContextConfig;

use crate::backend::{ContextReport, ContextSource};
use crate::error::TransportError;

const DEFAULT_RECOMMENDATION: &str =
    "This conversation is close to the model's context limit. Fork it into a new session to keep responses accurate.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Ok,
    Warn,
    Critical,
}

/// A user-approvable suggestion attached to a critical status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub message: String,
    /// Branch point for the suggested fork (the newest message).
    pub fork_at: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextStatus {
    pub current_tokens: u64,
    pub limit: u64,
    pub percentage: f64,
    pub warning_level: WarningLevel,
    pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextThresholds {
    pub warn_percent: f64,
    pub critical_percent: f64,
}

impl ContextThresholds {
    /// `< warn` is ok, `warn..=critical` warns, `> critical` is critical.
    pub fn level(&self, percentage: f64) -> WarningLevel {
        if percentage > self.critical_percent {
            WarningLevel::Critical
        } else if percentage >= self.warn_percent {
            WarningLevel::Warn
        } else {
            WarningLevel::Ok
        }
    }
}

impl Default for ContextThresholds {
    fn default() -> Self {
        Self::from(&ContextConfig::default())
    }
}

impl From<&ContextConfig> for ContextThresholds {
    fn from(config: &ContextConfig) -> Self {
        Self {
            warn_percent: config.warn_percent,
            critical_percent: config.critical_percent,
        }
    }
}

#[derive(Debug, Default)]
pub struct ContextMonitor {
    thresholds: ContextThresholds,
    status: Option<ContextStatus>,
    /// Store revision the current status describes.
    applied_revision: Option<u64>,
    /// Store revision a query is outstanding for.
    requested_revision: Option<u64>,
    /// Store revision whose last query failed. Not retried until the store
    /// moves on or a poll forces it.
    failed_revision: Option<u64>,
    consecutive_failures: u32,
}

impl ContextMonitor {
    pub fn new(thresholds: ContextThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn thresholds(&self) -> ContextThresholds {
        self.thresholds
    }

    pub fn status(&self) -> Option<&ContextStatus> {
        self.status.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Turn a raw report into a status. Pure.
    pub fn evaluate(&self, report: &ContextReport, fork_at: Option<MessageId>) -> ContextStatus {
        let percentage = if report.percentage.is_finite() {
            report.percentage
        } else if report.limit > 0 {
            report.current_tokens as f64 * 100.0 / report.limit as f64
        } else {
            0.0
        };
        let warning_level = self.thresholds.level(percentage);
        let recommendation = (warning_level == WarningLevel::Critical).then(|| Recommendation {
            message: report
                .recommendation
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
            fork_at,
        });
        ContextStatus {
            current_tokens: report.current_tokens,
            limit: report.limit,
            percentage,
            warning_level,
            recommendation,
        }
    }

    /// Whether the status is stale for `revision` and no query is pending or
    /// has already failed for it.
    pub fn needs_refresh(&self, revision: u64) -> bool {
        self.applied_revision != Some(revision)
            && self.requested_revision != Some(revision)
            && self.failed_revision != Some(revision)
    }

    pub fn request_pending(&self) -> bool {
        self.requested_revision.is_some()
    }

    pub fn mark_requested(&mut self, revision: u64) {
        self.requested_revision = Some(revision);
    }

    /// Drop the outstanding-query marker so the next check can retry.
    pub fn clear_request(&mut self) {
        self.requested_revision = None;
    }

    /// Install the result of a query issued at `revision`. Results older than
    /// the one already applied are discarded.
    pub fn apply(
        &mut self,
        revision: u64,
        report: &ContextReport,
        fork_at: Option<MessageId>,
    ) -> Option<&ContextStatus> {
        if self.requested_revision == Some(revision) {
            self.requested_revision = None;
        }
        if self.applied_revision.is_some_and(|applied| applied > revision) {
            debug!(revision, "discarding out-of-date context report");
            return None;
        }
        let status = self.evaluate(report, fork_at);
        debug!(
            revision,
            percentage = status.percentage,
            level = ?status.warning_level,
            "context status updated"
        );
        self.status = Some(status);
        self.applied_revision = Some(revision);
        self.failed_revision = None;
        self.consecutive_failures = 0;
        self.status.as_ref()
    }

    /// Log a failed query and keep the previous status.
    pub fn record_failure(&mut self, session_id: &SessionId, revision: u64, error: &TransportError) {
        if self.requested_revision == Some(revision) {
            self.requested_revision = None;
        }
        self.failed_revision = Some(revision);
        self.consecutive_failures += 1;
        warn!(
            session = %session_id,
            revision,
            failures = self.consecutive_failures,
            "context refresh failed, keeping previous status: {error}"
        );
    }

    /// Query `source` and apply the result. Never fails: on transport error
    /// the previous status is returned.
    pub async fn refresh(
        &mut self,
        source: &dyn ContextSource,
        session_id: &SessionId,
        revision: u64,
        fork_at: Option<MessageId>,
    ) -> Option<&ContextStatus> {
        self.mark_requested(revision);
        match source.context_status(session_id).await {
            Ok(report) => {
                self.apply(revision, &report, fork_at);
            }
            Err(e) => self.record_failure(session_id, revision, &e),
        }
        self.status.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn report(percentage: f64) -> ContextReport {
        ContextReport {
            current_tokens: (percentage * 1000.0) as u64,
            limit: 100_000,
            percentage,
            recommendation: None,
        }
    }

    #[test]
    fn critical_above_90_with_recommendation() {
        let monitor = ContextMonitor::new(ContextThresholds::default());
        let status = monitor.evaluate(&report(92.0), Some(MessageId::from("m-9")));
        assert_eq!(status.warning_level, WarningLevel::Critical);
        let rec = status.recommendation.unwrap();
        assert!(!rec.message.is_empty());
        assert_eq!(rec.fork_at, Some(MessageId::from("m-9")));
    }

    #[test]
    fn ok_below_75_without_recommendation() {
        let monitor = ContextMonitor::new(ContextThresholds::default());
        let status = monitor.evaluate(&report(40.0), None);
        assert_eq!(status.warning_level, WarningLevel::Ok);
        assert!(status.recommendation.is_none());
    }

    #[test]
    fn threshold_boundaries() {
        let t = ContextThresholds::default();
        assert_eq!(t.level(74.9), WarningLevel::Ok);
        assert_eq!(t.level(75.0), WarningLevel::Warn);
        assert_eq!(t.level(90.0), WarningLevel::Warn);
        assert_eq!(t.level(90.1), WarningLevel::Critical);
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = ContextConfig {
            warn_percent: 50.0,
            critical_percent: 60.0,
            ..ContextConfig::default()
        };
        let t = ContextThresholds::from(&config);
        assert_eq!(t.level(55.0), WarningLevel::Warn);
        assert_eq!(t.level(61.0), WarningLevel::Critical);
    }

    #[test]
    fn warn_level_drops_backend_recommendation() {
        let monitor = ContextMonitor::new(ContextThresholds::default());
        let mut r = report(80.0);
        r.recommendation = Some("trim history".into());
        let status = monitor.evaluate(&r, None);
        assert_eq!(status.warning_level, WarningLevel::Warn);
        assert!(status.recommendation.is_none());
    }

    #[test]
    fn backend_recommendation_is_used_when_critical() {
        let monitor = ContextMonitor::new(ContextThresholds::default());
        let mut r = report(97.0);
        r.recommendation = Some("Start a fresh session".into());
        let status = monitor.evaluate(&r, None);
        assert_eq!(
            status.recommendation.unwrap().message,
            "Start a fresh session"
        );
    }

    #[test]
    fn non_finite_percentage_is_recomputed() {
        let monitor = ContextMonitor::new(ContextThresholds::default());
        let r = ContextReport {
            current_tokens: 95,
            limit: 100,
            percentage: f64::NAN,
            recommendation: None,
        };
        let status = monitor.evaluate(&r, None);
        assert_eq!(status.percentage, 95.0);
        assert_eq!(status.warning_level, WarningLevel::Critical);
    }

    #[test]
    fn older_reports_do_not_overwrite_newer() {
        let mut monitor = ContextMonitor::default();
        monitor.apply(5, &report(50.0), None);
        assert!(monitor.apply(3, &report(10.0), None).is_none());
        assert_eq!(monitor.status().unwrap().percentage, 50.0);
    }

    #[test]
    fn needs_refresh_tracks_requests_and_results() {
        let mut monitor = ContextMonitor::default();
        assert!(monitor.needs_refresh(1));
        monitor.mark_requested(1);
        assert!(!monitor.needs_refresh(1));
        monitor.apply(1, &report(10.0), None);
        assert!(!monitor.needs_refresh(1));
        assert!(monitor.needs_refresh(2));
    }

    struct Scripted(Mutex<Vec<Result<ContextReport, TransportError>>>);

    #[async_trait]
    impl ContextSource for Scripted {
        async fn context_status(
            &self,
            _session_id: &SessionId,
        ) -> Result<ContextReport, TransportError> {
            self.0.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_status() {
        let source = Scripted(Mutex::new(vec![
            Ok(report(80.0)),
            Err(TransportError::Network("down".into())),
        ]));
        let session = SessionId::from("s");
        let mut monitor = ContextMonitor::default();

        let first = monitor.refresh(&source, &session, 1, None).await.cloned();
        assert_eq!(first.unwrap().warning_level, WarningLevel::Warn);

        let second = monitor.refresh(&source, &session, 2, None).await.cloned();
        assert_eq!(second.unwrap().percentage, 80.0);
        assert_eq!(monitor.consecutive_failures(), 1);
        assert!(!monitor.needs_refresh(2));
        assert!(monitor.needs_refresh(3));
    }

    #[test]
    fn failed_revision_is_not_retried_until_store_moves() {
        let mut monitor = ContextMonitor::default();
        let session = SessionId::from("s");
        monitor.mark_requested(4);
        monitor.record_failure(&session, 4, &TransportError::Timeout);
        assert!(!monitor.request_pending());
        assert!(!monitor.needs_refresh(4));
        assert!(monitor.needs_refresh(5));

        // A forced retry that succeeds clears the failure.
        monitor.mark_requested(4);
        monitor.apply(4, &report(30.0), None);
        assert!(!monitor.needs_refresh(4));
        assert_eq!(monitor.consecutive_failures(), 0);
        assert_eq!(monitor.status().unwrap().percentage, 30.0);
    }
}
