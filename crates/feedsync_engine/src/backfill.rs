//! Lecturer backfill for enrollment lines.
//!
//! Enrollment payloads do not say who teaches a class section. For each
//! distinct section a secondary lookup returns the teaching lecturers;
//! the first one is taken as authoritative. A failed lookup never fails
//! the enclosing sync: the affected lines simply carry no lecturer.

use crate::pause::Pacer;
use crate::resolver::Resolvers;
use crate::transport::FeederTransport;
use feedsync_protocol::{Action, FeederRequest, Filter};
use feedsync_store::{EntityKind, FieldValue, LocalId, Record};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The lecturer teaching one class section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLecturer {
    /// Local lecturer, if the remote lecturer is known locally.
    pub lecturer: Option<LocalId>,
    /// Display name.
    pub name: Option<String>,
}

/// Looks up and applies section lecturers, caching per batch.
pub struct LecturerBackfill<'a> {
    transport: &'a dyn FeederTransport,
    pacer: &'a Pacer,
    resolvers: &'a Resolvers,
    /// `None` marks a section whose lookup failed or found nobody.
    cache: HashMap<String, Option<SectionLecturer>>,
}

impl<'a> LecturerBackfill<'a> {
    /// Creates an empty backfill.
    pub fn new(transport: &'a dyn FeederTransport, pacer: &'a Pacer, resolvers: &'a Resolvers) -> Self {
        Self {
            transport,
            pacer,
            resolvers,
            cache: HashMap::new(),
        }
    }

    /// Looks up every section not seen before. Duplicates cost one call.
    pub fn prefetch<'s>(&mut self, sections: impl IntoIterator<Item = &'s str>) {
        for section in sections {
            if self.cache.contains_key(section) {
                continue;
            }
            let found = self.lookup(section);
            self.cache.insert(section.to_string(), found);
        }
    }

    fn lookup(&self, section: &str) -> Option<SectionLecturer> {
        self.pacer.before_call();
        let request = FeederRequest::new(Action::SectionLecturers)
            .with_filter(Filter::eq("id_kelas_kuliah", section));

        let rows = match self.transport.call(request).and_then(|r| Ok(r.into_rows()?)) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(section, error = %e, "section lecturer lookup failed");
                self.pacer.after_failure();
                return None;
            }
        };

        let Some(first) = rows.first() else {
            debug!(section, "no lecturer for section");
            return None;
        };
        let remote_id = first.text("id_dosen");
        let lecturer = self
            .resolvers
            .resolve(EntityKind::Lecturer, remote_id.as_deref());
        let name = first.text("nama_dosen");
        if lecturer.is_none() {
            debug!(section, lecturer = ?remote_id, "lecturer not known locally, keeping name only");
        }
        Some(SectionLecturer { lecturer, name })
    }

    fn get(&self, section: &str) -> Option<&SectionLecturer> {
        self.cache.get(section).and_then(Option::as_ref)
    }

    /// Writes the section's lecturer onto an enrollment line.
    pub fn apply(&self, section: &str, line: &mut Record) {
        if let Some(found) = self.get(section) {
            line.set("lecturer", found.lecturer);
            line.set(
                "lecturer_name",
                found.name.clone().map_or(FieldValue::Null, FieldValue::Text),
            );
        }
    }

    /// Forgets every cached lookup; later sections are looked up again.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.cache.shrink_to_fit();
    }
}
