//! The table of synchronizable resources.

use crate::error::{SyncError, SyncResult};
use crate::mapping::{self, MapFn};
use feedsync_protocol::Action;
use feedsync_store::EntityKind;
use serde::Serialize;
use std::fmt;

/// A synchronizable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Study programs.
    Programs,
    /// Academic terms.
    Terms,
    /// Course catalogue.
    Courses,
    /// Lecturers.
    Lecturers,
    /// Student registrations.
    Students,
    /// Religion reference codes.
    Religions,
    /// Student status reference codes.
    StudentStatuses,
    /// Per-student enrollments (headers and class lines).
    Enrollments,
    /// Per-student grade history.
    Grades,
}

/// How a resource is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// One call returns everything.
    Bulk,
    /// The feeder pages the resource with limit/offset.
    Offset,
    /// One call per local anchor record, filtered by its remote id.
    Anchored {
        /// Kind of the anchor records.
        anchor: EntityKind,
        /// Filter field that carries the anchor's remote id.
        filter_field: &'static str,
    },
}

/// How fetched rows are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// Each row is upserted on its own.
    Rows,
    /// Rows are enrollment lines: grouped into headers, lecturer-backfilled
    /// and replaced per header.
    Enrollments,
}

/// Static description of one resource.
#[derive(Clone, Copy)]
pub struct ResourceSpec {
    /// The resource.
    pub resource: Resource,
    /// Remote action that lists it.
    pub action: Action,
    /// Local kind it is stored as.
    pub kind: EntityKind,
    /// Kinds that must be present locally before the sync may run.
    pub requires: &'static [EntityKind],
    /// Kinds resolved when present.
    pub optional: &'static [EntityKind],
    /// Fetch mode.
    pub paging: Paging,
    /// Write mode.
    pub fold: Fold,
    /// Ordering expression sent with paged requests.
    pub order: Option<&'static str>,
    /// Row fields tried, in order, to name a row in error reports.
    pub label_fields: &'static [&'static str],
    /// Row mapping.
    pub map: MapFn,
}

impl fmt::Debug for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSpec")
            .field("resource", &self.resource)
            .field("action", &self.action)
            .field("kind", &self.kind)
            .field("paging", &self.paging)
            .field("fold", &self.fold)
            .finish_non_exhaustive()
    }
}

const STUDENT_ANCHOR: Paging = Paging::Anchored {
    anchor: EntityKind::Student,
    filter_field: "id_registrasi_mahasiswa",
};

static SPECS: [ResourceSpec; 9] = [
    ResourceSpec {
        resource: Resource::Programs,
        action: Action::Programs,
        kind: EntityKind::Program,
        requires: &[],
        optional: &[],
        paging: Paging::Bulk,
        fold: Fold::Rows,
        order: None,
        label_fields: &["id_prodi", "kode_program_studi"],
        map: mapping::program,
    },
    ResourceSpec {
        resource: Resource::Terms,
        action: Action::Terms,
        kind: EntityKind::Term,
        requires: &[],
        optional: &[],
        paging: Paging::Bulk,
        fold: Fold::Rows,
        order: None,
        label_fields: &["id_semester", "nama_semester"],
        map: mapping::term,
    },
    ResourceSpec {
        resource: Resource::Courses,
        action: Action::Courses,
        kind: EntityKind::Course,
        requires: &[EntityKind::Program],
        optional: &[],
        paging: Paging::Offset,
        fold: Fold::Rows,
        order: Some("id_matkul"),
        label_fields: &["id_matkul", "kode_mata_kuliah"],
        map: mapping::course,
    },
    ResourceSpec {
        resource: Resource::Lecturers,
        action: Action::Lecturers,
        kind: EntityKind::Lecturer,
        requires: &[],
        optional: &[],
        paging: Paging::Offset,
        fold: Fold::Rows,
        order: Some("id_dosen"),
        label_fields: &["id_dosen", "nidn"],
        map: mapping::lecturer,
    },
    ResourceSpec {
        resource: Resource::Students,
        action: Action::Students,
        kind: EntityKind::Student,
        requires: &[],
        optional: &[EntityKind::Program, EntityKind::Term],
        paging: Paging::Offset,
        fold: Fold::Rows,
        order: Some("id_registrasi_mahasiswa"),
        label_fields: &["id_registrasi_mahasiswa", "nim"],
        map: mapping::student,
    },
    ResourceSpec {
        resource: Resource::Religions,
        action: Action::Religions,
        kind: EntityKind::ReferenceCode,
        requires: &[],
        optional: &[],
        paging: Paging::Bulk,
        fold: Fold::Rows,
        order: None,
        label_fields: &["id_agama"],
        map: mapping::religion,
    },
    ResourceSpec {
        resource: Resource::StudentStatuses,
        action: Action::StudentStatuses,
        kind: EntityKind::ReferenceCode,
        requires: &[],
        optional: &[],
        paging: Paging::Bulk,
        fold: Fold::Rows,
        order: None,
        label_fields: &["id_status_mahasiswa"],
        map: mapping::student_status,
    },
    ResourceSpec {
        resource: Resource::Enrollments,
        action: Action::StudentEnrollments,
        kind: EntityKind::Enrollment,
        requires: &[EntityKind::Student, EntityKind::Term, EntityKind::Course],
        optional: &[EntityKind::Lecturer],
        paging: STUDENT_ANCHOR,
        fold: Fold::Enrollments,
        order: None,
        label_fields: &["id_kelas", "id_matkul"],
        map: mapping::enrollment_line,
    },
    ResourceSpec {
        resource: Resource::Grades,
        action: Action::StudentGrades,
        kind: EntityKind::Grade,
        requires: &[EntityKind::Student, EntityKind::Term, EntityKind::Course],
        optional: &[],
        paging: STUDENT_ANCHOR,
        fold: Fold::Rows,
        order: None,
        label_fields: &["id_matkul", "id_periode"],
        map: mapping::grade,
    },
];

impl Resource {
    /// All resources in dependency order.
    pub const ALL: [Resource; 9] = [
        Resource::Programs,
        Resource::Terms,
        Resource::Religions,
        Resource::StudentStatuses,
        Resource::Courses,
        Resource::Lecturers,
        Resource::Students,
        Resource::Enrollments,
        Resource::Grades,
    ];

    /// Returns the resource name used in reports and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Programs => "programs",
            Resource::Terms => "terms",
            Resource::Courses => "courses",
            Resource::Lecturers => "lecturers",
            Resource::Students => "students",
            Resource::Religions => "religions",
            Resource::StudentStatuses => "student_statuses",
            Resource::Enrollments => "enrollments",
            Resource::Grades => "grades",
        }
    }

    /// Looks a resource up by name.
    pub fn from_name(name: &str) -> SyncResult<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| SyncError::UnknownResource(name.to_string()))
    }

    /// Returns the static description of the resource.
    pub fn spec(&self) -> &'static ResourceSpec {
        let index = match self {
            Resource::Programs => 0,
            Resource::Terms => 1,
            Resource::Courses => 2,
            Resource::Lecturers => 3,
            Resource::Students => 4,
            Resource::Religions => 5,
            Resource::StudentStatuses => 6,
            Resource::Enrollments => 7,
            Resource::Grades => 8,
        };
        &SPECS[index]
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Resource {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
