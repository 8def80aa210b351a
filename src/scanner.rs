//!
//! src/scanner.rs  Oct 18th, 2026
//!
//! Drives the scan: fetches each batch of identifiers concurrently, then
//! logs, filters and announces the results one by one in ascending order
//!
//!

use std::{io::Write, ops::Range};

use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::artists::ArtistSet;
use crate::errors::ScoutError;
use crate::sink::ScanLog;
use crate::types::{
    LogEntry, NotificationPayload, ReleaseStatus, TrackId, TrackMetadata, match_message
};

/// Catalog preview lookup. Failures are logged by the implementor and
/// come back as `None`.
#[async_trait]
pub trait PreviewSource: Send + Sync {
    async fn fetch_preview(&self, id: TrackId) -> Option<TrackMetadata>;
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn release_status(&self, id: TrackId) -> ReleaseStatus;
}

#[async_trait]
pub trait Notify: Send + Sync {
    /// True only when the message was accepted
    async fn send(&self, payload: &NotificationPayload) -> bool;
}

/// Splits `[start, end)` into consecutive half-open ranges of at most `size`
pub fn batch_ranges(start: TrackId, end: TrackId, size: usize) ->
    impl Iterator<Item = Range<TrackId>> {
    let step = size.max(1);
    (start..end)
        .step_by(step)
        .map(move |i| i..i.saturating_add(step as u64).min(end))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Cancelled,
    /// Too many fetches failed in a row
    Aborted { consecutive_failures: u32 },
}

/// Consecutive failed fetches, reset by any success
#[derive(Debug, Clone, Copy)]
struct ErrorBudget {
    limit: Option<u32>,
    consecutive: u32,
}

impl ErrorBudget {
    fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.consecutive >= limit)
    }

    fn record(&mut self, ok: bool) {
        if ok {
            self.consecutive = 0;
        } else {
            self.consecutive += 1;
        }
    }
}

pub struct BatchScanner<P, S, N> {
    preview: P,
    status: S,
    notifier: N,
    artists: ArtistSet,
    chat_id: String,
    batch_size: usize,
    error_limit: Option<u32>,

    // handles interrupt
    shutdown: CancellationToken
}

impl<P, S, N> BatchScanner<P, S, N>
where
    P: PreviewSource,
    S: StatusSource,
    N: Notify,
{
    pub fn new(
        preview: P,
        status: S,
        notifier: N,
        artists: ArtistSet,
        chat_id: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            preview,
            status,
            notifier,
            artists,
            chat_id: chat_id.into(),
            batch_size: batch_size.max(1),
            error_limit: None,
            shutdown: CancellationToken::new()
        }
    }

    pub fn with_error_limit(mut self, limit: Option<u32>) -> Self {
        self.error_limit = limit;
        self
    }

    pub fn shutdown(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Visits every identifier in `[start, end)` exactly once. The log is
    /// flushed after each batch and on every way out.
    pub async fn scan<W: Write>(
        &self,
        start: TrackId,
        end: TrackId,
        log: &mut ScanLog<W>
    ) -> Result<ScanOutcome, ScoutError> {
        info!(
            start, end,
            batch_size = self.batch_size,
            artists = self.artists.len(),
            "scan.start"
        );
        if start >= end {
            warn!(start, end, "scan.empty_range");
        }
        if self.artists.is_empty() {
            warn!("scan.no_artists");
        }

        let mut budget = ErrorBudget { limit: self.error_limit, consecutive: 0 };

        for batch in batch_ranges(start, end, self.batch_size) {
            if self.shutdown.is_cancelled() {
                return self.stop(log, ScanOutcome::Cancelled);
            }

            let fetches = batch.clone().map(|id| self.preview.fetch_preview(id));
            let results = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(batch_start = batch.start, "scan.batch.interrupted");
                    return self.stop(log, ScanOutcome::Cancelled);
                }
                results = join_all(fetches) => results,
            };

            for (id, result) in batch.clone().zip(results) {
                if budget.exhausted() {
                    warn!(id, consecutive_failures = budget.consecutive, "scan.error_limit");
                    return self.stop(log, ScanOutcome::Aborted {
                        consecutive_failures: budget.consecutive
                    });
                }
                budget.record(result.is_some());

                let Some(meta) = result else { continue };
                log.append(&LogEntry { id, meta: &meta })?;
                self.announce_if_unreleased(id, &meta).await;
            }

            log.flush()?;
            debug!(batch_start = batch.start, batch_end = batch.end, "scan.batch");
        }

        self.stop(log, ScanOutcome::Completed)
    }

    async fn announce_if_unreleased(&self, id: TrackId, meta: &TrackMetadata) {
        if !self.artists.matches(&meta.artist) {
            return;
        }
        if !self.status.release_status(id).await.is_unreleased() {
            return;
        }

        info!(id, artist = %meta.artist, title = %meta.title, album = %meta.album, "scan.match");
        let payload = NotificationPayload::html(&self.chat_id, match_message(id, meta));
        self.notifier.send(&payload).await;
    }

    fn stop<W: Write>(&self, log: &mut ScanLog<W>, outcome: ScanOutcome) ->
        Result<ScanOutcome, ScoutError> {
        log.flush()?;
        info!(outcome = ?outcome, "scan.stop");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    fn meta(title: &str, artist: &str, album: &str) -> TrackMetadata {
        TrackMetadata {
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
        }
    }

    /// Identifiers not in `tracks` answer as a failed fetch. Lower ids
    /// yield more often so completions arrive out of order.
    #[derive(Default)]
    struct FakeCatalog {
        tracks: HashMap<TrackId, TrackMetadata>,
        calls: Mutex<Vec<TrackId>>,
    }

    impl FakeCatalog {
        fn with(tracks: &[(TrackId, TrackMetadata)]) -> Self {
            Self { tracks: tracks.iter().cloned().collect(), ..Self::default() }
        }

        fn calls(&self) -> Vec<TrackId> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PreviewSource for FakeCatalog {
        async fn fetch_preview(&self, id: TrackId) -> Option<TrackMetadata> {
            self.calls.lock().unwrap().push(id);
            for _ in 0..(64 - id % 64) {
                tokio::task::yield_now().await;
            }
            self.tracks.get(&id).cloned()
        }
    }

    #[async_trait]
    impl<'a, T: PreviewSource> PreviewSource for &'a T {
        async fn fetch_preview(&self, id: TrackId) -> Option<TrackMetadata> {
            (**self).fetch_preview(id).await
        }
    }

    /// Unlisted identifiers are released
    #[derive(Default)]
    struct FakeStatus {
        statuses: HashMap<TrackId, ReleaseStatus>,
        calls: Mutex<Vec<TrackId>>,
    }

    #[async_trait]
    impl StatusSource for FakeStatus {
        async fn release_status(&self, id: TrackId) -> ReleaseStatus {
            self.calls.lock().unwrap().push(id);
            self.statuses.get(&id).copied().unwrap_or(ReleaseStatus::Released)
        }
    }

    #[async_trait]
    impl<'a, T: StatusSource> StatusSource for &'a T {
        async fn release_status(&self, id: TrackId) -> ReleaseStatus {
            (**self).release_status(id).await
        }
    }

    /// Records payloads; optionally cancels a token on first send
    #[derive(Default)]
    struct FakeNotify {
        sent: Mutex<Vec<NotificationPayload>>,
        cancel_on_send: Mutex<Option<CancellationToken>>,
    }

    impl FakeNotify {
        fn sent(&self) -> Vec<NotificationPayload> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notify for FakeNotify {
        async fn send(&self, payload: &NotificationPayload) -> bool {
            self.sent.lock().unwrap().push(payload.clone());
            if let Some(token) = self.cancel_on_send.lock().unwrap().as_ref() {
                token.cancel();
            }
            true
        }
    }

    #[async_trait]
    impl<'a, T: Notify> Notify for &'a T {
        async fn send(&self, payload: &NotificationPayload) -> bool {
            (**self).send(payload).await
        }
    }

    fn drake() -> ArtistSet {
        ["drake"].into_iter().collect()
    }

    fn log_lines(log: ScanLog<Vec<u8>>) -> Vec<String> {
        let bytes = log.close().unwrap();
        String::from_utf8(bytes).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn batch_ranges_cover_range_once() {
        let ranges: Vec<_> = batch_ranges(10, 33, 5).collect();
        assert_eq!(ranges, vec![10..15, 15..20, 20..25, 25..30, 30..33]);
        assert_eq!(ranges.len(), (33 - 10_usize).div_ceil(5));

        assert_eq!(batch_ranges(0, 50, 50).count(), 1);
        assert_eq!(batch_ranges(0, 51, 50).count(), 2);
        assert_eq!(batch_ranges(5, 5, 50).count(), 0);
        assert_eq!(batch_ranges(9, 5, 50).count(), 0);
    }

    #[test]
    fn error_budget_resets_on_success() {
        let mut budget = ErrorBudget { limit: Some(2), consecutive: 0 };
        budget.record(false);
        assert!(!budget.exhausted());
        budget.record(true);
        budget.record(false);
        budget.record(false);
        assert!(budget.exhausted());

        let mut unlimited = ErrorBudget { limit: None, consecutive: 0 };
        (0..1000).for_each(|_| unlimited.record(false));
        assert!(!unlimited.exhausted());
    }

    #[tokio::test]
    async fn every_identifier_is_fetched_exactly_once() {
        let catalog = FakeCatalog::default();
        let notify = FakeNotify::default();
        let scanner = BatchScanner::new(
            &catalog, FakeStatus::default(), &notify, drake(), "-100", 7);
        let mut log = ScanLog::new(Vec::new());

        let outcome = scanner.scan(100, 150, &mut log).await.unwrap();
        assert_eq!(outcome, ScanOutcome::Completed);

        let mut calls = catalog.calls();
        let dispatched = calls.clone();
        calls.sort_unstable();
        assert_eq!(calls, (100..150).collect::<Vec<_>>());
        // dispatch order is ascending as well
        assert_eq!(dispatched, calls);
        assert!(log_lines(log).is_empty());
        assert!(notify.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_preview_writes_nothing() {
        let catalog = FakeCatalog::with(&[(2, meta("X", "Drake", "Y"))]);
        let status = FakeStatus::default();
        let notify = FakeNotify::default();
        let scanner = BatchScanner::new(&catalog, &status, &notify, drake(), "-100", 50);
        let mut log = ScanLog::new(Vec::new());

        scanner.scan(1, 2, &mut log).await.unwrap();

        assert!(log_lines(log).is_empty());
        assert!(status.calls.lock().unwrap().is_empty());
        assert!(notify.sent().is_empty());
    }

    #[tokio::test]
    async fn unreleased_match_logs_and_notifies_once() {
        let catalog = FakeCatalog::with(&[(4021, meta("X", "Drake", "Y"))]);
        let status = FakeStatus {
            statuses: HashMap::from([(4021, ReleaseStatus::Unreleased)]),
            ..FakeStatus::default()
        };
        let notify = FakeNotify::default();
        let scanner = BatchScanner::new(&catalog, &status, &notify, drake(), "-100", 50);
        let mut log = ScanLog::new(Vec::new());

        scanner.scan(4000, 4050, &mut log).await.unwrap();

        assert_eq!(log_lines(log), vec!["4021!Drake!X!Y"]);
        let sent = notify.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "-100");
        assert_eq!(sent[0].parse_mode, "HTML");
        for needle in ["4021", "X", "Drake", "Y"] {
            assert!(sent[0].text.contains(needle), "missing {needle}");
        }
    }

    #[tokio::test]
    async fn inconclusive_status_logs_without_notifying() {
        let catalog = FakeCatalog::with(&[(8, meta("X", "Future, Drake", "Y"))]);
        let status = FakeStatus {
            statuses: HashMap::from([(8, ReleaseStatus::Unknown)]),
            ..FakeStatus::default()
        };
        let notify = FakeNotify::default();
        let scanner = BatchScanner::new(&catalog, &status, &notify, drake(), "-100", 50);
        let mut log = ScanLog::new(Vec::new());

        scanner.scan(0, 10, &mut log).await.unwrap();

        assert_eq!(log_lines(log), vec!["8!Future, Drake!X!Y"]);
        assert_eq!(*status.calls.lock().unwrap(), vec![8]);
        assert!(notify.sent().is_empty());
    }

    #[tokio::test]
    async fn unmatched_artist_skips_status_check() {
        let catalog = FakeCatalog::with(&[(3, meta("X", "Adele", "Y"))]);
        let status = FakeStatus {
            statuses: HashMap::from([(3, ReleaseStatus::Unreleased)]),
            ..FakeStatus::default()
        };
        let notify = FakeNotify::default();
        let scanner = BatchScanner::new(&catalog, &status, &notify, drake(), "-100", 50);
        let mut log = ScanLog::new(Vec::new());

        scanner.scan(0, 5, &mut log).await.unwrap();

        assert_eq!(log_lines(log), vec!["3!Adele!X!Y"]);
        assert!(status.calls.lock().unwrap().is_empty());
        assert!(notify.sent().is_empty());
    }

    #[tokio::test]
    async fn results_are_processed_in_ascending_order() {
        let tracks: Vec<_> = (0..20)
            .map(|id| (id, meta(&format!("t{id}"), "Drake", "a")))
            .collect();
        let catalog = FakeCatalog::with(&tracks);
        let status = FakeStatus {
            statuses: (0..20).map(|id| (id, ReleaseStatus::Unreleased)).collect(),
            ..FakeStatus::default()
        };
        let notify = FakeNotify::default();
        let scanner = BatchScanner::new(&catalog, &status, &notify, drake(), "-100", 8);
        let mut log = ScanLog::new(Vec::new());

        scanner.scan(0, 20, &mut log).await.unwrap();

        let ids: Vec<TrackId> = log_lines(log).iter()
            .map(|l| l.split('!').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
        assert_eq!(*status.calls.lock().unwrap(), (0..20).collect::<Vec<_>>());
        assert_eq!(notify.sent().len(), 20);
    }

    #[tokio::test]
    async fn rerun_appends_identical_entries() {
        let catalog = FakeCatalog::with(&[
            (1, meta("A", "Drake", "L")),
            (4, meta("B", "SZA", "M")),
        ]);
        let scanner = BatchScanner::new(
            &catalog, FakeStatus::default(), FakeNotify::default(), drake(), "-100", 2);
        let mut log = ScanLog::new(Vec::new());

        scanner.scan(0, 6, &mut log).await.unwrap();
        scanner.scan(0, 6, &mut log).await.unwrap();

        let lines = log_lines(log);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[..2], lines[2..]);
    }

    #[tokio::test]
    async fn consecutive_failures_abort_the_scan() {
        let catalog = FakeCatalog::with(&[(2, meta("A", "B", "C"))]);
        let scanner = BatchScanner::new(
            &catalog, FakeStatus::default(), FakeNotify::default(), drake(), "-100", 4)
            .with_error_limit(Some(3));
        let mut log = ScanLog::new(Vec::new());

        let outcome = scanner.scan(0, 40, &mut log).await.unwrap();

        // 0,1 fail, 2 resets, 3..=5 exhaust the budget before 6 is handled
        assert_eq!(outcome, ScanOutcome::Aborted { consecutive_failures: 3 });
        assert_eq!(log_lines(log), vec!["2!B!A!C"]);
        assert_eq!(catalog.calls().len(), 8);
    }

    #[tokio::test]
    async fn failures_without_limit_never_abort() {
        let catalog = FakeCatalog::default();
        let scanner = BatchScanner::new(
            &catalog, FakeStatus::default(), FakeNotify::default(), drake(), "-100", 10);
        let mut log = ScanLog::new(Vec::new());

        let outcome = scanner.scan(0, 100, &mut log).await.unwrap();
        assert_eq!(outcome, ScanOutcome::Completed);
        assert_eq!(catalog.calls().len(), 100);
    }

    #[tokio::test]
    async fn cancelled_before_start_fetches_nothing() {
        let catalog = FakeCatalog::default();
        let scanner = BatchScanner::new(
            &catalog, FakeStatus::default(), FakeNotify::default(), drake(), "-100", 10);
        scanner.shutdown().cancel();
        let mut log = ScanLog::new(Vec::new());

        let outcome = scanner.scan(0, 100, &mut log).await.unwrap();
        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn cancellation_finishes_current_batch_then_stops() {
        let catalog = FakeCatalog::with(&[
            (2, meta("X", "Drake", "Y")),
            (3, meta("Z", "Drake", "Y")),
        ]);
        let status = FakeStatus {
            statuses: HashMap::from([(2, ReleaseStatus::Unreleased)]),
            ..FakeStatus::default()
        };
        let notify = FakeNotify::default();
        let scanner = BatchScanner::new(&catalog, &status, &notify, drake(), "-100", 5);
        *notify.cancel_on_send.lock().unwrap() = Some(scanner.shutdown());
        let mut log = ScanLog::new(Vec::new());

        let outcome = scanner.scan(0, 20, &mut log).await.unwrap();

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert_eq!(catalog.calls(), (0..5).collect::<Vec<_>>());
        assert_eq!(log_lines(log), vec!["2!Drake!X!Y", "3!Drake!Z!Y"]);
        assert_eq!(notify.sent().len(), 1);
    }

    /// Every id resolves except `stall_at`, which cancels the scan and
    /// then never completes
    #[derive(Default)]
    struct StallingCatalog {
        stall_at: TrackId,
        token: Mutex<Option<CancellationToken>>,
        calls: Mutex<Vec<TrackId>>,
    }

    #[async_trait]
    impl PreviewSource for StallingCatalog {
        async fn fetch_preview(&self, id: TrackId) -> Option<TrackMetadata> {
            self.calls.lock().unwrap().push(id);
            if id == self.stall_at {
                let token = self.token.lock().unwrap().clone();
                if let Some(token) = token {
                    token.cancel();
                }
                std::future::pending::<()>().await;
            }
            Some(meta("X", "Drake", "Y"))
        }
    }

    #[tokio::test]
    async fn cancellation_during_fetches_drops_the_batch() {
        let catalog = StallingCatalog { stall_at: 2, ..StallingCatalog::default() };
        let notify = FakeNotify::default();
        let scanner = BatchScanner::new(
            &catalog, FakeStatus::default(), &notify, drake(), "-100", 4);
        *catalog.token.lock().unwrap() = Some(scanner.shutdown());
        let mut log = ScanLog::new(Vec::new());

        let outcome = scanner.scan(0, 12, &mut log).await.unwrap();

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert_eq!(*catalog.calls.lock().unwrap(), (0..4).collect::<Vec<_>>());
        assert!(log_lines(log).is_empty());
        assert!(notify.sent().is_empty());
    }
}
