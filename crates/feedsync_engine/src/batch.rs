//! Batch and pagination controller.
//!
//! Every step is independently complete: a batch commits what it wrote
//! and reports where the next one should start. Three fetch modes:
//!
//! - bulk: one call, no continuation
//! - offset: one paged call; the feeder's total decides `has_more` when it
//!   is reported, otherwise a full page does
//! - anchored: one call per local anchor record in a stable slice of the
//!   anchor table; the anchor count is the authoritative total

use crate::backfill::LecturerBackfill;
use crate::config::SyncConfig;
use crate::enrollment::fold_enrollments;
use crate::error::SyncResult;
use crate::mapping::MapContext;
use crate::pause::Pacer;
use crate::reconcile::fold_rows;
use crate::report::{BatchReport, Tally};
use crate::resolver::Resolvers;
use crate::resource::{Fold, Paging, ResourceSpec};
use crate::transport::FeederTransport;
use feedsync_protocol::{FeederRequest, Filter, Row};
use feedsync_store::{EntityKind, Store};
use tracing::{debug, warn};

/// Borrowed collaborators of one step.
#[derive(Clone, Copy)]
pub(crate) struct StepContext<'a> {
    pub(crate) transport: &'a dyn FeederTransport,
    pub(crate) store: &'a dyn Store,
    pub(crate) config: &'a SyncConfig,
    pub(crate) pacer: &'a Pacer,
}

impl<'a> StepContext<'a> {
    fn resolvers(&self, spec: &ResourceSpec) -> SyncResult<Resolvers> {
        Resolvers::build(self.store, spec.requires, spec.optional)
    }

    fn map_context<'r>(
        &self,
        resolvers: &'r Resolvers,
        anchor: Option<&'r feedsync_store::StoredRecord>,
    ) -> MapContext<'r> {
        MapContext {
            resolvers,
            anchor,
            current_year: self.config.effective_year(),
            term_window: self.config.term_window,
        }
    }

    fn tally(&self, spec: &ResourceSpec) -> Tally {
        Tally::new(spec.resource.name(), self.config.circuit_breaker)
    }
}

/// Runs one batch of `spec` in the mode its paging calls for.
pub(crate) fn run_batch(
    ctx: StepContext<'_>,
    spec: &ResourceSpec,
    offset: u64,
    limit: u64,
) -> SyncResult<BatchReport> {
    match spec.paging {
        Paging::Bulk => run_bulk(ctx, spec),
        Paging::Offset => run_offset(ctx, spec, offset, limit),
        Paging::Anchored {
            anchor,
            filter_field,
        } => run_anchored(ctx, spec, anchor, filter_field, offset, limit),
    }
}

fn run_bulk(ctx: StepContext<'_>, spec: &ResourceSpec) -> SyncResult<BatchReport> {
    let resolvers = ctx.resolvers(spec)?;

    ctx.pacer.before_call();
    let rows = ctx.transport.call(FeederRequest::new(spec.action))?.into_rows()?;
    debug!(resource = spec.resource.name(), rows = rows.len(), "fetched");

    let mut tally = ctx.tally(spec);
    fold_rows(
        ctx.store,
        spec,
        &rows,
        &ctx.map_context(&resolvers, None),
        &mut tally,
        1,
    )?;
    Ok(BatchReport::complete(tally.finish()))
}

fn run_offset(
    ctx: StepContext<'_>,
    spec: &ResourceSpec,
    offset: u64,
    limit: u64,
) -> SyncResult<BatchReport> {
    let resolvers = ctx.resolvers(spec)?;

    let page_limit = u32::try_from(limit).unwrap_or(u32::MAX);
    let page_offset = u32::try_from(offset).unwrap_or(u32::MAX);
    let mut request = FeederRequest::new(spec.action).with_page(page_limit, page_offset);
    if let Some(order) = spec.order {
        request = request.with_order(order);
    }

    ctx.pacer.before_call();
    let response = ctx.transport.call(request)?;
    let total = response.total;
    let rows = response.into_rows()?;
    debug!(
        resource = spec.resource.name(),
        offset,
        limit,
        rows = rows.len(),
        total = ?total,
        "fetched page"
    );

    let mut tally = ctx.tally(spec);
    fold_rows(
        ctx.store,
        spec,
        &rows,
        &ctx.map_context(&resolvers, None),
        &mut tally,
        offset + 1,
    )?;
    Ok(BatchReport::paged(
        tally.finish(),
        offset,
        limit,
        total,
        rows.len() as u64,
    ))
}

fn run_anchored(
    ctx: StepContext<'_>,
    spec: &ResourceSpec,
    anchor_kind: EntityKind,
    filter_field: &str,
    offset: u64,
    limit: u64,
) -> SyncResult<BatchReport> {
    let resource = spec.resource.name();
    let resolvers = ctx.resolvers(spec)?;
    let total_all = ctx.store.count(anchor_kind)?;
    let anchors = ctx.store.slice(anchor_kind, offset, limit)?;
    debug!(resource, offset, limit, total_all, anchors = anchors.len(), "anchored batch");

    let mut tally = ctx.tally(spec);
    let mut backfill = LecturerBackfill::new(ctx.transport, ctx.pacer, &resolvers);
    let mut scratch: Vec<Row> = Vec::new();
    let release_interval = ctx.config.release_interval.max(1);

    for (i, anchor) in anchors.iter().enumerate() {
        if tally.is_aborted() {
            break;
        }
        let Some(remote_id) = anchor.key.remote_id() else {
            tally.anchor_error(anchor.key.to_string(), "anchor has no remote id");
            continue;
        };

        ctx.pacer.before_call();
        let request =
            FeederRequest::new(spec.action).with_filter(Filter::eq(filter_field, remote_id));
        let fetched = ctx
            .transport
            .call(request)
            .and_then(|response| Ok(response.into_rows()?));

        match fetched {
            Ok(rows) => scratch.extend(rows),
            Err(e) if e.aborts_step() => return Err(e),
            Err(e) => {
                warn!(resource, anchor = remote_id, error = %e, "anchor fetch failed");
                if tally.anchor_error(remote_id, e.to_string()) {
                    warn!(resource, "circuit breaker tripped");
                }
                ctx.pacer.after_failure();
                continue;
            }
        }

        let map_ctx = ctx.map_context(&resolvers, Some(anchor));
        match spec.fold {
            Fold::Rows => fold_rows(ctx.store, spec, &scratch, &map_ctx, &mut tally, 1)?,
            Fold::Enrollments => fold_enrollments(
                ctx.store,
                spec,
                anchor,
                &scratch,
                &map_ctx,
                &mut backfill,
                &mut tally,
            )?,
        }

        scratch.clear();
        if (i + 1) % release_interval == 0 {
            scratch.shrink_to_fit();
            backfill.clear();
            debug!(resource, processed = i + 1, "released buffers");
        }
    }

    Ok(BatchReport::paged(
        tally.finish(),
        offset,
        limit,
        Some(total_all),
        anchors.len() as u64,
    ))
}
