//! Single-student detail sync.

use crate::batch::StepContext;
use crate::error::{SyncError, SyncResult};
use crate::mapping;
use crate::report::{Outcome, SyncReport, Tally};
use feedsync_protocol::{Action, FeederRequest, Filter};
use feedsync_store::{EntityKind, NaturalKey};
use tracing::{debug, warn};

pub(crate) const RESOURCE: &str = "student_detail";

/// Refreshes the detail fields of one stored student.
///
/// The biodata comes from the person record; the status code comes from
/// a separate lookup of the registration. A failed status lookup is
/// reported but does not stop the biodata update.
pub(crate) fn sync_student_detail(ctx: StepContext<'_>, remote_id: &str) -> SyncResult<SyncReport> {
    let student = ctx
        .store
        .find_by_key(EntityKind::Student, &NaturalKey::remote(remote_id))?
        .ok_or_else(|| {
            SyncError::Precondition(format!("student {remote_id} is not synced locally"))
        })?;
    let person_id = student
        .record
        .text("person_id")
        .map(str::to_string)
        .ok_or_else(|| SyncError::Precondition(format!("student {remote_id} has no person id")))?;

    ctx.pacer.before_call();
    let rows = ctx
        .transport
        .call(
            FeederRequest::new(Action::StudentBiodata)
                .with_filter(Filter::eq("id_mahasiswa", &person_id)),
        )?
        .into_rows()?;
    let biodata = rows.first().ok_or_else(|| SyncError::MissingRemoteRecord {
        action: Action::StudentBiodata,
        key: person_id.clone(),
    })?;
    let mut fields = mapping::biodata(biodata);

    let mut tally = Tally::new(RESOURCE, 0);

    ctx.pacer.before_call();
    let status = ctx
        .transport
        .call(
            FeederRequest::new(Action::Students)
                .with_filter(Filter::eq("id_registrasi_mahasiswa", remote_id)),
        )
        .and_then(|response| Ok(response.into_rows()?));
    match status {
        Ok(rows) => match rows.first().and_then(|row| row.text("id_status_mahasiswa")) {
            Some(code) => fields.set("status_code", code),
            None => debug!(student = remote_id, "no status reported"),
        },
        Err(e) if e.aborts_step() => return Err(e),
        Err(e) => {
            warn!(student = remote_id, error = %e, "status lookup failed");
            tally.note(remote_id, format!("status lookup failed: {e}"));
            ctx.pacer.after_failure();
        }
    }

    let patch = fields.diff(&student.record);
    if patch.is_empty() {
        tally.record(Outcome::Unchanged(student.id));
    } else {
        ctx.store.update(EntityKind::Student, student.id, &patch)?;
        tally.record(Outcome::Updated(student.id));
    }
    Ok(tally.finish())
}
