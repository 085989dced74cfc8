//! Bounded-concurrency batch dispatcher.
//!
//! One tokio task per input row, held to at most `workers` in flight by a
//! counting semaphore. Tasks deliver `{index, status, line}` through an mpsc
//! channel and the collector writes each line into a pre-sized slot addressed
//! by the row's original index, so output order matches input order no matter
//! which searches finish first. A failed row never aborts its siblings; it is
//! counted, logged, and its slot rendered as a failed marker row.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::client::{Screener, SearchQuery};
use crate::config::ScreenConfig;
use crate::error::{Result, ScreenError};
use crate::format;
use crate::rows::{self, InputRow};

/// Terminal state of one dispatched row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    Succeeded,
    /// The search failed; the reason travels here, not in the CSV.
    Failed(String),
}

/// Completed work for one row.
#[derive(Debug, Clone)]
pub struct RowReport {
    /// Zero-based input row index.
    pub index: usize,
    pub status: RowStatus,
    /// The formatted output line for this row.
    pub line: String,
}

/// Result of a whole batch.
#[derive(Debug)]
pub struct BatchReport {
    /// Output lines; the synthesized header sits at slot 0 and row `i` of
    /// the input at slot `i + 1`.
    pub lines: Vec<String>,
    /// Per-row reports in completion order.
    pub reports: Vec<RowReport>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    /// Render the batch as CSV text.
    pub fn to_csv(&self) -> String {
        self.lines.join("\n")
    }
}

/// Screen every data row of `input` concurrently and reassemble the output
/// in input order.
///
/// The first line of `input` is the header. At most `config.workers` rows are
/// in flight at once; each row's network budget is its own, so one slow row
/// only delays itself. Returns an error only when the output row count does
/// not match the input row count or when every row failed; partial failure is
/// reported through the counts.
pub async fn run_batch(
    input: &str,
    screener: Arc<dyn Screener>,
    config: &ScreenConfig,
) -> Result<BatchReport> {
    let (header, data_rows) = rows::parse(input);
    let total = data_rows.len();
    info!(rows = total, workers = config.workers, "processing rows");

    let mut lines = vec![String::new(); total + 1];
    lines[0] = format::format_header(&header, &config.separator);

    let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
    let (tx, mut rx) = mpsc::channel::<RowReport>(total.max(1));

    for row in data_rows {
        // Acquire before spawning so no more than `workers` tasks exist.
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break, // semaphore closed; surfaces as a row-count mismatch
        };
        let screener = Arc::clone(&screener);
        let tx = tx.clone();
        let config = config.clone();

        tokio::spawn(async move {
            let report = screen_row(row, screener.as_ref(), &config).await;
            let _ = tx.send(report).await;
            drop(permit);
        });
    }
    // Close the channel once every task's sender is dropped.
    drop(tx);

    let mut reports = Vec::with_capacity(total);
    while let Some(report) = rx.recv().await {
        lines[report.index + 1] = report.line.clone();
        reports.push(report);
    }

    if reports.len() != total {
        return Err(ScreenError::RowCountMismatch {
            got: reports.len(),
            want: total,
        });
    }

    let succeeded = reports
        .iter()
        .filter(|r| r.status == RowStatus::Succeeded)
        .count();
    let failed = total - succeeded;
    if total > 0 && succeeded == 0 {
        return Err(ScreenError::AllRowsFailed(total));
    }

    info!(total, succeeded, failed, "checks complete");
    Ok(BatchReport {
        lines,
        reports,
        succeeded,
        failed,
    })
}

/// Screen one row end to end: derive the subject, search, classify, format.
async fn screen_row(row: InputRow, screener: &dyn Screener, config: &ScreenConfig) -> RowReport {
    let subject = row.subject();
    let query = SearchQuery::new(subject.clone(), row.index, config);

    match screener.screen(query).await {
        Ok(result) => {
            if result.is_set {
                debug!(subject = %subject, score = result.score, "candidate resolved");
            } else {
                debug!(subject = %subject, "no hits");
            }
            RowReport {
                index: row.index,
                status: RowStatus::Succeeded,
                line: format::format_row(&row.raw, &result, config.threshold, &config.separator),
            }
        }
        Err(err) => {
            warn!(subject = %subject, error = %err, "problem searching row");
            RowReport {
                index: row.index,
                status: RowStatus::Failed(err.to_string()),
                line: format::format_failed_row(&row.raw, &config.separator),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::client::{Candidate, MockScreener, ScreenResult};

    /// Stub that resolves every subject after a per-row delay. Rows with a
    /// higher index finish *earlier* (delay shrinks with index), which is the
    /// adversarial completion order for the ordering invariant.
    struct InvertedDelayScreener {
        total: usize,
        step: Duration,
    }

    #[async_trait]
    impl Screener for InvertedDelayScreener {
        async fn screen(&self, query: SearchQuery) -> Result<ScreenResult> {
            let slots = (self.total - query.row) as u32;
            tokio::time::sleep(self.step * slots).await;
            Ok(ScreenResult::empty())
        }
    }

    /// Stub that tracks how many searches are in flight at once.
    struct GaugeScreener {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl GaugeScreener {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Screener for GaugeScreener {
        async fn screen(&self, _query: SearchQuery) -> Result<ScreenResult> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ScreenResult::empty())
        }
    }

    fn config(workers: usize) -> ScreenConfig {
        ScreenConfig {
            workers,
            ..Default::default()
        }
    }

    fn csv(rows: usize) -> String {
        let mut input = String::from("id,last,first\n");
        for i in 0..rows {
            input.push_str(&format!("{},Last{},First{}\n", i, i, i));
        }
        input
    }

    #[tokio::test]
    async fn test_output_order_matches_input_under_reordered_completion() {
        let rows = 20;
        let screener = Arc::new(InvertedDelayScreener {
            total: rows,
            step: Duration::from_millis(1),
        });

        let report = run_batch(&csv(rows), screener, &config(8)).await.unwrap();

        assert_eq!(report.lines.len(), rows + 1);
        assert!(report.lines[0].starts_with("id,last,first,Result"));
        for i in 0..rows {
            let prefix = format!("{},Last{},First{},", i, i, i);
            assert!(
                report.lines[i + 1].starts_with(&prefix),
                "slot {} holds {:?}",
                i + 1,
                report.lines[i + 1]
            );
        }
    }

    #[tokio::test]
    async fn test_worker_limit_caps_in_flight_searches() {
        let screener = Arc::new(GaugeScreener::new());
        let gauge = Arc::clone(&screener);

        let report = run_batch(&csv(1000), screener, &config(4)).await.unwrap();

        assert_eq!(report.succeeded, 1000);
        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak in-flight was {}", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_header_only_input_yields_header_only_output() {
        let screener = Arc::new(GaugeScreener::new());
        let report = run_batch("id,last,first\n", screener, &config(2))
            .await
            .unwrap();

        assert_eq!(report.lines.len(), 1);
        assert!(report.reports.is_empty());
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_match_scenario_exact_columns() {
        let mut mock = MockScreener::new();
        mock.expect_screen().returning(|_| {
            Ok(ScreenResult {
                is_set: true,
                score: 0.995,
                candidate: Some(Candidate {
                    entity_id: "007".to_string(),
                    name: "Smith, John".to_string(),
                    sdn_type: "individual".to_string(),
                    programs: vec![],
                    score: 0.995,
                    remarks: String::new(),
                }),
            })
        });

        let report = run_batch("id,last,first\n123,Smith,John", Arc::new(mock), &config(1))
            .await
            .unwrap();

        assert_eq!(report.succeeded, 1);
        assert!(
            report.lines[1].starts_with("123,Smith,John,MATCH,John Smith,007,0.99,[],"),
            "{}",
            report.lines[1]
        );
    }

    #[tokio::test]
    async fn test_clear_scenario_empty_result_fields() {
        let mut mock = MockScreener::new();
        mock.expect_screen().returning(|_| Ok(ScreenResult::empty()));

        let report = run_batch("id,last,first\n123,Smith,John", Arc::new(mock), &config(1))
            .await
            .unwrap();

        assert!(
            report.lines[1].starts_with("123,Smith,John,Clear,,,,,"),
            "{}",
            report.lines[1]
        );
    }

    #[tokio::test]
    async fn test_row_failure_does_not_abort_batch() {
        let mut mock = MockScreener::new();
        mock.expect_screen().returning(|query| {
            if query.row == 1 {
                Err(ScreenError::EmptySubject { row: query.row })
            } else {
                Ok(ScreenResult::empty())
            }
        });

        let report = run_batch(&csv(3), Arc::new(mock), &config(2)).await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        let failed = report.reports.iter().find(|r| r.index == 1).unwrap();
        match &failed.status {
            RowStatus::Failed(reason) => assert!(reason.contains("empty subject")),
            RowStatus::Succeeded => panic!("row 1 should have failed"),
        }
        // The failed slot still belongs to row 1 and stays unlabeled.
        assert!(report.lines[2].starts_with("1,Last1,First1,,"));
    }

    #[tokio::test]
    async fn test_all_rows_failing_is_a_batch_error() {
        let mut mock = MockScreener::new();
        mock.expect_screen()
            .returning(|query| Err(ScreenError::EmptySubject { row: query.row }));

        let err = run_batch(&csv(2), Arc::new(mock), &config(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ScreenError::AllRowsFailed(2)));
    }

    #[tokio::test]
    async fn test_row_count_is_preserved() {
        let mut mock = MockScreener::new();
        mock.expect_screen().returning(|_| Ok(ScreenResult::empty()));

        let rows = 57;
        let report = run_batch(&csv(rows), Arc::new(mock), &config(16))
            .await
            .unwrap();
        assert_eq!(report.lines.len(), rows + 1);
        assert_eq!(report.reports.len(), rows);
    }
}
