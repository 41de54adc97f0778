//! Entity kinds.

use serde::Serialize;
use std::fmt;

/// The kinds of entity kept in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Study program.
    Program,
    /// Academic term.
    Term,
    /// Course in the catalogue.
    Course,
    /// Lecturer.
    Lecturer,
    /// Student registration.
    Student,
    /// Enrollment header, one per student and term.
    Enrollment,
    /// Enrollment line item, one per class section.
    EnrollmentDetail,
    /// Grade, one per student, course and term.
    Grade,
    /// Entry of a reference table.
    ReferenceCode,
}

impl EntityKind {
    /// All entity kinds in dependency order.
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Program,
        EntityKind::Term,
        EntityKind::Course,
        EntityKind::Lecturer,
        EntityKind::Student,
        EntityKind::Enrollment,
        EntityKind::EnrollmentDetail,
        EntityKind::Grade,
        EntityKind::ReferenceCode,
    ];

    /// Returns the snake-case name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Program => "program",
            EntityKind::Term => "term",
            EntityKind::Course => "course",
            EntityKind::Lecturer => "lecturer",
            EntityKind::Student => "student",
            EntityKind::Enrollment => "enrollment",
            EntityKind::EnrollmentDetail => "enrollment_detail",
            EntityKind::Grade => "grade",
            EntityKind::ReferenceCode => "reference_code",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = EntityKind::ALL.iter().map(EntityKind::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EntityKind::ALL.len());
    }
}
