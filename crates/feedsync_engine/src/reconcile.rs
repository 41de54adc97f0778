//! Idempotent create-or-update of mapped rows.

use crate::error::SyncResult;
use crate::mapping::{MapContext, Mapped, Mapping};
use crate::report::{Outcome, Tally};
use crate::resource::ResourceSpec;
use feedsync_protocol::Row;
use feedsync_store::{EntityKind, Store};
use tracing::{debug, warn};

/// Inserts `mapped` if its key is new, otherwise updates the fields that differ.
pub fn upsert(store: &dyn Store, kind: EntityKind, mapped: Mapped) -> SyncResult<Outcome> {
    let Some(existing) = store.find_by_key(kind, &mapped.key)? else {
        let id = store.insert(kind, mapped.key, mapped.fields)?;
        return Ok(Outcome::Inserted(id));
    };

    let patch = mapped.fields.diff(&existing.record);
    if patch.is_empty() {
        return Ok(Outcome::Unchanged(existing.id));
    }
    store.update(kind, existing.id, &patch)?;
    Ok(Outcome::Updated(existing.id))
}

/// Names a row in error reports: the first non-empty label field, or its
/// 1-based position.
pub(crate) fn row_label(spec: &ResourceSpec, row: &Row, position: u64) -> String {
    row.first_text(spec.label_fields)
        .unwrap_or_else(|| format!("row #{position}"))
}

enum Processed {
    Written(Outcome),
    Skipped(String),
    Excluded,
}

fn process(store: &dyn Store, spec: &ResourceSpec, row: &Row, ctx: &MapContext<'_>) -> SyncResult<Processed> {
    Ok(match (spec.map)(row, ctx)? {
        Mapping::Upsert(mapped) => Processed::Written(upsert(store, spec.kind, mapped)?),
        Mapping::Skip(reason) => Processed::Skipped(reason),
        Mapping::Exclude => Processed::Excluded,
    })
}

/// Maps and upserts every row, isolating failures per row.
///
/// `first_position` is the 1-based position of `rows[0]` within the step.
/// Stops early when the circuit breaker trips.
pub(crate) fn fold_rows(
    store: &dyn Store,
    spec: &ResourceSpec,
    rows: &[Row],
    ctx: &MapContext<'_>,
    tally: &mut Tally,
    first_position: u64,
) -> SyncResult<()> {
    let resource = spec.resource.name();

    for (i, row) in rows.iter().enumerate() {
        if tally.is_aborted() {
            break;
        }
        let label = row_label(spec, row, first_position + i as u64);

        match process(store, spec, row, ctx) {
            Ok(Processed::Written(outcome)) => tally.record(outcome),
            Ok(Processed::Skipped(reason)) => {
                debug!(resource, row = %label, reason = %reason, "row skipped");
                tally.skip();
            }
            Ok(Processed::Excluded) => {
                debug!(resource, row = %label, "row excluded");
            }
            Err(e) if e.aborts_step() => return Err(e),
            Err(e) => {
                warn!(resource, row = %label, error = %e, "row failed");
                if tally.row_error(label, e.to_string()) {
                    warn!(resource, "circuit breaker tripped");
                }
            }
        }
    }
    Ok(())
}
