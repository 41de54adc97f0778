//! Enrollment headers and their class lines.
//!
//! The lines of one student are grouped by term. Each group becomes one
//! enrollment header `(student, term)` and its lines are replaced as a
//! whole: if any line is new, changed or gone, every stored line of the
//! header is deleted and the fetched set is inserted, so dropped classes
//! disappear. A stored header whose term no longer appears in the fetch
//! loses all of its lines, unless some fetched line failed to map. Lines
//! are lecturer-backfilled before they are compared.

use crate::backfill::LecturerBackfill;
use crate::error::{SyncError, SyncResult};
use crate::mapping::{MapContext, Mapped, Mapping};
use crate::reconcile::{row_label, upsert};
use crate::report::{Outcome, Tally};
use crate::resource::ResourceSpec;
use feedsync_protocol::Row;
use feedsync_store::{
    EntityKind, FieldValue, KeyPart, LocalId, NaturalKey, Record, Store, StoredRecord,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

struct Line {
    label: String,
    section: String,
    fields: Record,
}

#[derive(PartialEq)]
enum Change {
    New,
    Changed,
    Same,
}

fn split_key(mapped: &Mapped) -> SyncResult<(LocalId, String)> {
    match &mapped.key {
        NaturalKey::Composite(parts) => match parts.as_slice() {
            [KeyPart::Ref(term), KeyPart::Text(section)] => Ok((*term, section.clone())),
            _ => Err(SyncError::mapping("key", format!("unexpected line key {}", mapped.key))),
        },
        NaturalKey::Remote(_) => Err(SyncError::mapping(
            "key",
            format!("unexpected line key {}", mapped.key),
        )),
    }
}

/// Reconciles the enrollment lines fetched for one student.
pub(crate) fn fold_enrollments(
    store: &dyn Store,
    spec: &ResourceSpec,
    student: &StoredRecord,
    rows: &[Row],
    ctx: &MapContext<'_>,
    backfill: &mut LecturerBackfill<'_>,
    tally: &mut Tally,
) -> SyncResult<()> {
    let resource = spec.resource.name();
    let mut groups: BTreeMap<LocalId, Vec<Line>> = BTreeMap::new();
    let mut unmapped = false;

    for (i, row) in rows.iter().enumerate() {
        let label = row_label(spec, row, i as u64 + 1);
        let mapped = match (spec.map)(row, ctx).and_then(|m| match m {
            Mapping::Upsert(mapped) => split_key(&mapped).map(|key| Some((key, mapped.fields))),
            Mapping::Skip(reason) => {
                debug!(resource, row = %label, reason = %reason, "line skipped");
                Ok(None)
            }
            Mapping::Exclude => Ok(None),
        }) {
            Ok(mapped) => mapped,
            Err(e) if e.aborts_step() => return Err(e),
            Err(e) => {
                warn!(resource, row = %label, error = %e, "line failed");
                tally.row_error(label, e.to_string());
                unmapped = true;
                continue;
            }
        };

        let Some(((term, section), fields)) = mapped else {
            tally.skip();
            continue;
        };

        let lines = groups.entry(term).or_default();
        if lines.iter().any(|l| l.section == section) {
            tally.row_error(label, format!("duplicate class section {section} in term {term}"));
            continue;
        }
        lines.push(Line {
            label,
            section,
            fields,
        });
    }

    backfill.prefetch(
        groups
            .values()
            .flatten()
            .map(|line| line.section.as_str()),
    );

    let fetched_terms: BTreeSet<LocalId> = groups.keys().copied().collect();
    for (term, mut lines) in groups {
        if tally.is_aborted() {
            break;
        }
        for line in &mut lines {
            backfill.apply(&line.section, &mut line.fields);
        }
        if let Err(e) = write_header(store, student.id, term, lines, tally) {
            if e.aborts_step() {
                return Err(e);
            }
            warn!(resource, student = %student.key, term = %term, error = %e, "enrollment failed");
            tally.row_error(format!("{}/{term}", student.key), e.to_string());
        }
    }

    if tally.is_aborted() || unmapped {
        return Ok(());
    }
    clear_vanished_terms(store, student, &fetched_terms, tally)
}

/// Empties the headers of terms the feed no longer lists for `student`.
fn clear_vanished_terms(
    store: &dyn Store,
    student: &StoredRecord,
    fetched_terms: &BTreeSet<LocalId>,
    tally: &mut Tally,
) -> SyncResult<()> {
    let headers = store.find_where(
        EntityKind::Enrollment,
        "student",
        &FieldValue::Ref(student.id),
    )?;
    for header in headers {
        let Some(term) = header.record.reference("term") else {
            continue;
        };
        if fetched_terms.contains(&term) {
            continue;
        }
        let cleared = store
            .delete_where(EntityKind::EnrollmentDetail, "enrollment", &FieldValue::Ref(header.id))
            .and_then(|removed| {
                if removed > 0 {
                    let emptied = Record::new().with("credits", 0i64);
                    store.update(EntityKind::Enrollment, header.id, &emptied)?;
                }
                Ok(removed)
            });
        match cleared {
            Ok(0) => {}
            Ok(removed) => {
                debug!(enrollment = %header.id, term = %term, removed, "term no longer enrolled");
                tally.removed(removed as u64);
            }
            Err(e) => {
                warn!(student = %student.key, term = %term, error = %e, "clearing enrollment failed");
                tally.row_error(format!("{}/{term}", student.key), e.to_string());
            }
        }
    }
    Ok(())
}

fn write_header(
    store: &dyn Store,
    student: LocalId,
    term: LocalId,
    lines: Vec<Line>,
    tally: &mut Tally,
) -> SyncResult<()> {
    let credits: i64 = lines.iter().filter_map(|l| l.fields.int("credits")).sum();
    let header = upsert(
        store,
        EntityKind::Enrollment,
        Mapped::new(
            NaturalKey::composite([student, term]),
            Record::new()
                .with("student", student)
                .with("term", term)
                .with("credits", credits),
        ),
    )?
    .id();

    let link = FieldValue::Ref(header);
    let existing: HashMap<NaturalKey, StoredRecord> = store
        .find_where(EntityKind::EnrollmentDetail, "enrollment", &link)?
        .into_iter()
        .map(|stored| (stored.key.clone(), stored))
        .collect();

    let mut lines: Vec<(NaturalKey, Line, Change)> = lines
        .into_iter()
        .map(|mut line| {
            line.fields.set("enrollment", header);
            let key = NaturalKey::composite([KeyPart::Ref(header), KeyPart::Text(line.section.clone())]);
            let change = match existing.get(&key) {
                None => Change::New,
                Some(stored) if line.fields.diff(&stored.record).is_empty() => Change::Same,
                Some(_) => Change::Changed,
            };
            (key, line, change)
        })
        .collect();

    let dropped = existing
        .keys()
        .filter(|key| !lines.iter().any(|(k, _, _)| k == *key))
        .count();

    if dropped == 0 && lines.iter().all(|(_, _, change)| *change == Change::Same) {
        for (key, _, _) in &lines {
            if let Some(stored) = existing.get(key) {
                tally.record(Outcome::Unchanged(stored.id));
            }
        }
        return Ok(());
    }

    let removed = store.delete_where(EntityKind::EnrollmentDetail, "enrollment", &link)?;
    debug!(enrollment = %header, removed, dropped, "replacing enrollment lines");
    tally.removed(dropped as u64);

    for (key, line, change) in lines.drain(..) {
        match store.insert(EntityKind::EnrollmentDetail, key, line.fields) {
            Ok(id) => tally.record(match change {
                Change::New => Outcome::Inserted(id),
                Change::Changed => Outcome::Updated(id),
                Change::Same => Outcome::Unchanged(id),
            }),
            Err(e) => {
                warn!(row = %line.label, error = %e, "line insert failed");
                tally.row_error(line.label, e.to_string());
            }
        }
    }
    Ok(())
}
