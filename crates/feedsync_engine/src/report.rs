//! Sync results handed to the orchestration layer.

use feedsync_store::LocalId;
use serde::Serialize;

/// A row-level failure, keyed by the row's natural identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Natural identifier of the failed row (or anchor).
    pub key: String,
    /// What went wrong.
    pub message: String,
}

impl RowError {
    /// Creates a row error.
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// How one row was reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new local record was created.
    Inserted(LocalId),
    /// The local record differed and was updated.
    Updated(LocalId),
    /// The local record already matched.
    Unchanged(LocalId),
}

impl Outcome {
    /// Returns the local id of the reconciled record.
    pub fn id(&self) -> LocalId {
        match self {
            Outcome::Inserted(id) | Outcome::Updated(id) | Outcome::Unchanged(id) => *id,
        }
    }
}

/// Aggregated counts of one sync step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    /// Resource name.
    pub resource: &'static str,
    /// Rows considered (excluded rows are not counted).
    pub total: u64,
    /// Rows inserted.
    pub inserted: u64,
    /// Rows updated.
    pub updated: u64,
    /// Rows skipped: unchanged, or missing a required relation.
    pub skipped: u64,
    /// Stored rows deleted because the feed no longer has them.
    pub removed: u64,
    /// Row-level errors.
    pub errors: Vec<RowError>,
    /// True if the circuit breaker stopped the step early.
    pub aborted: bool,
}

impl SyncReport {
    /// Creates an empty report.
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            ..Self::default()
        }
    }

    /// Rows that went through without error.
    pub fn successes(&self) -> u64 {
        self.inserted + self.updated + self.skipped
    }

    /// Adds the counts and errors of another report.
    pub fn absorb(&mut self, other: SyncReport) {
        self.total += other.total;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.removed += other.removed;
        self.errors.extend(other.errors);
        self.aborted |= other.aborted;
    }
}

/// Result of one batch of a paged sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Counts for this batch.
    #[serde(flatten)]
    pub report: SyncReport,
    /// Offset this batch started at.
    pub offset: u64,
    /// Requested batch size.
    pub limit: u64,
    /// Total eligible items, when known.
    pub total_all: Option<u64>,
    /// Offset of the next batch, if there is one.
    pub next_offset: Option<u64>,
    /// True if the caller should request another batch.
    pub has_more: bool,
    /// Progress after this batch, when it can be computed.
    pub progress_percent: Option<u8>,
}

impl BatchReport {
    /// A single-shot step that covers the whole resource.
    pub fn complete(report: SyncReport) -> Self {
        Self {
            limit: report.total,
            report,
            offset: 0,
            total_all: None,
            next_offset: None,
            has_more: false,
            progress_percent: Some(100),
        }
    }

    /// A batch of a paged step.
    ///
    /// With a known `total_all` the continuation comes from it; otherwise
    /// a full page (`page_len == limit`) is taken to mean there is more.
    pub fn paged(
        report: SyncReport,
        offset: u64,
        limit: u64,
        total_all: Option<u64>,
        page_len: u64,
    ) -> Self {
        let next = offset.saturating_add(limit);
        let (has_more, progress) = if report.aborted {
            (false, None)
        } else {
            match total_all {
                Some(total) => (
                    limit > 0 && next < total,
                    Some(progress_percent(next.min(total), total)),
                ),
                None => {
                    let more = limit > 0 && page_len >= limit;
                    (more, (!more).then_some(100))
                }
            }
        };

        Self {
            report,
            offset,
            limit,
            total_all,
            next_offset: has_more.then_some(next),
            has_more,
            progress_percent: progress,
        }
    }
}

/// `min(100, round(next / total * 100))`, and 100 for an empty total.
pub fn progress_percent(next: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (u128::from(next) * 100 + u128::from(total) / 2) / u128::from(total);
    percent.min(100) as u8
}

/// Running counters for one step, with the circuit breaker.
#[derive(Debug)]
pub(crate) struct Tally {
    report: SyncReport,
    consecutive_errors: u32,
    threshold: u32,
}

impl Tally {
    pub(crate) fn new(resource: &'static str, threshold: u32) -> Self {
        Self {
            report: SyncReport::new(resource),
            consecutive_errors: 0,
            threshold,
        }
    }

    pub(crate) fn record(&mut self, outcome: Outcome) {
        self.report.total += 1;
        match outcome {
            Outcome::Inserted(_) => self.report.inserted += 1,
            Outcome::Updated(_) => self.report.updated += 1,
            Outcome::Unchanged(_) => self.report.skipped += 1,
        }
        self.consecutive_errors = 0;
    }

    pub(crate) fn skip(&mut self) {
        self.report.total += 1;
        self.report.skipped += 1;
        self.consecutive_errors = 0;
    }

    /// Counts stored rows deleted to mirror the feed. Not part of `total`.
    pub(crate) fn removed(&mut self, count: u64) {
        self.report.removed += count;
    }

    /// Records a failed row. Returns true if the breaker tripped.
    pub(crate) fn row_error(&mut self, key: impl Into<String>, message: impl Into<String>) -> bool {
        self.report.total += 1;
        self.fail(RowError::new(key, message))
    }

    /// Records a failed anchor lookup, which has no rows to count.
    pub(crate) fn anchor_error(
        &mut self,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> bool {
        self.fail(RowError::new(key, message))
    }

    /// Records an error that does not count toward the breaker.
    pub(crate) fn note(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.report.errors.push(RowError::new(key, message));
    }

    fn fail(&mut self, error: RowError) -> bool {
        self.report.errors.push(error);
        self.consecutive_errors += 1;

        let tripped = self.threshold > 0
            && self.consecutive_errors >= self.threshold
            && self.report.successes() == 0;
        if tripped && !self.report.aborted {
            self.report.aborted = true;
            self.report.errors.push(RowError::new(
                "circuit-breaker",
                format!(
                    "aborted after {} consecutive errors with no successful row",
                    self.consecutive_errors
                ),
            ));
        }
        tripped
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.report.aborted
    }

    pub(crate) fn finish(self) -> SyncReport {
        self.report
    }
}
