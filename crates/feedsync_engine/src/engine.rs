//! Sync engine facade.

use crate::batch::{run_batch, StepContext};
use crate::client::FeederClient;
use crate::config::SyncConfig;
use crate::detail;
use crate::error::SyncResult;
use crate::http::HttpClient;
use crate::pause::{Pacer, Pause, ThreadPause};
use crate::report::{BatchReport, SyncReport};
use crate::resource::{Paging, Resource};
use crate::secret::CredentialProvider;
use crate::transport::FeederTransport;
use feedsync_store::Store;
use std::sync::Arc;
use tracing::{info, info_span};
use uuid::Uuid;

/// Pulls feeder data into a local store.
///
/// Each operation runs synchronously and issues its remote calls one at
/// a time. Concurrent runs of the same resource must be serialized by
/// the caller.
pub struct SyncEngine<T: FeederTransport, S: Store> {
    transport: T,
    store: S,
    config: SyncConfig,
    pacer: Pacer,
}

impl<C: HttpClient, S: Store> SyncEngine<FeederClient<C>, S> {
    /// Creates an engine talking to the feeder through `http`.
    pub fn connect(
        http: C,
        credentials: Arc<dyn CredentialProvider>,
        store: S,
        config: SyncConfig,
    ) -> Self {
        let client = FeederClient::new(http, credentials, config.retry.clone());
        Self::new(client, store, config)
    }
}

#[cfg(feature = "reqwest-client")]
impl<S: Store> SyncEngine<FeederClient<crate::http::ReqwestClient>, S> {
    /// Creates an engine over blocking HTTP, honoring [`SyncConfig::timeout`].
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn over_http(
        credentials: Arc<dyn CredentialProvider>,
        store: S,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let http = crate::http::ReqwestClient::from_config(&config)?;
        Ok(Self::connect(http, credentials, store, config))
    }
}

impl<T: FeederTransport, S: Store> SyncEngine<T, S> {
    /// Creates an engine.
    pub fn new(transport: T, store: S, config: SyncConfig) -> Self {
        let pacer = Pacer::new(
            Arc::new(ThreadPause),
            config.call_delay,
            config.failure_cooldown,
        );
        Self {
            transport,
            store,
            config,
            pacer,
        }
    }

    /// Replaces the pause used between calls.
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pacer = Pacer::new(pause, self.config.call_delay, self.config.failure_cooldown);
        self
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn step(&self) -> StepContext<'_> {
        StepContext {
            transport: &self.transport,
            store: &self.store,
            config: &self.config,
            pacer: &self.pacer,
        }
    }

    /// Runs one batch of a resource.
    ///
    /// Bulk resources ignore `offset` and `limit` and always complete in
    /// one batch. Repeat with `next_offset` while `has_more` is true.
    pub fn sync_batch(&self, resource: Resource, offset: u64, limit: u64) -> SyncResult<BatchReport> {
        let span = info_span!("sync_batch", resource = %resource, run_id = %Uuid::new_v4(), offset, limit);
        let _guard = span.enter();

        self.pacer.reset();
        let batch = run_batch(self.step(), resource.spec(), offset, limit)?;
        info!(
            inserted = batch.report.inserted,
            updated = batch.report.updated,
            skipped = batch.report.skipped,
            errors = batch.report.errors.len(),
            has_more = batch.has_more,
            next_offset = ?batch.next_offset,
            "batch complete"
        );
        Ok(batch)
    }

    /// Runs a resource to completion, batch after batch.
    pub fn sync(&self, resource: Resource) -> SyncResult<SyncReport> {
        let span = info_span!("sync", resource = %resource, run_id = %Uuid::new_v4());
        let _guard = span.enter();

        self.pacer.reset();
        let limit = u64::from(self.config.batch_limit.max(1));
        let mut report = SyncReport::new(resource.name());
        let mut offset = 0;

        loop {
            let batch = run_batch(self.step(), resource.spec(), offset, limit)?;
            let next = batch.next_offset;
            let has_more = batch.has_more;
            report.absorb(batch.report);

            match next {
                Some(next) if has_more && !matches!(resource.spec().paging, Paging::Bulk) => {
                    offset = next;
                }
                _ => break,
            }
        }

        info!(
            total = report.total,
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            errors = report.errors.len(),
            aborted = report.aborted,
            "sync complete"
        );
        Ok(report)
    }

    /// Syncs study programs.
    pub fn sync_programs(&self) -> SyncResult<SyncReport> {
        self.sync(Resource::Programs)
    }

    /// Syncs terms inside the configured window.
    pub fn sync_terms(&self) -> SyncResult<SyncReport> {
        self.sync(Resource::Terms)
    }

    /// Syncs the course catalogue. Requires programs.
    pub fn sync_courses(&self) -> SyncResult<SyncReport> {
        self.sync(Resource::Courses)
    }

    /// Syncs lecturers.
    pub fn sync_lecturers(&self) -> SyncResult<SyncReport> {
        self.sync(Resource::Lecturers)
    }

    /// Syncs student registrations.
    pub fn sync_students(&self) -> SyncResult<SyncReport> {
        self.sync(Resource::Students)
    }

    /// Syncs every reference table into one report.
    pub fn sync_references(&self) -> SyncResult<SyncReport> {
        let mut report = SyncReport::new("references");
        for resource in [Resource::Religions, Resource::StudentStatuses] {
            report.absorb(self.sync(resource)?);
        }
        Ok(report)
    }

    /// Syncs one batch of per-student enrollments.
    pub fn sync_enrollments(&self, offset: u64, limit: u64) -> SyncResult<BatchReport> {
        self.sync_batch(Resource::Enrollments, offset, limit)
    }

    /// Syncs one batch of per-student grade history.
    pub fn sync_grades(&self, offset: u64, limit: u64) -> SyncResult<BatchReport> {
        self.sync_batch(Resource::Grades, offset, limit)
    }

    /// Refreshes the detail fields of one student, by registration id.
    pub fn sync_student_detail(&self, remote_id: &str) -> SyncResult<SyncReport> {
        let span = info_span!("sync_student_detail", student = remote_id, run_id = %Uuid::new_v4());
        let _guard = span.enter();

        self.pacer.reset();
        let report = detail::sync_student_detail(self.step(), remote_id)?;
        info!(
            updated = report.updated,
            errors = report.errors.len(),
            "student detail complete"
        );
        Ok(report)
    }

    /// Runs every resource to completion in dependency order.
    ///
    /// Stops at the first step that fails; row-level errors do not stop it.
    pub fn sync_all(&self) -> SyncResult<Vec<SyncReport>> {
        Resource::ALL
            .into_iter()
            .map(|resource| self.sync(resource))
            .collect()
    }
}
