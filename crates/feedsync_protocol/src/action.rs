//! Remote action names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An action understood by the feeder endpoint.
///
/// Every request names exactly one action in its `act` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Exchanges credentials for a bearer token.
    #[serde(rename = "GetToken")]
    Token,
    /// Study programs.
    #[serde(rename = "GetProdi")]
    Programs,
    /// Academic terms.
    #[serde(rename = "GetSemester")]
    Terms,
    /// Course catalogue.
    #[serde(rename = "GetListMataKuliah")]
    Courses,
    /// Lecturers.
    #[serde(rename = "GetListDosen")]
    Lecturers,
    /// Student registrations, including the tracked status code.
    #[serde(rename = "GetListMahasiswa")]
    Students,
    /// Personal details of one student.
    #[serde(rename = "GetBiodataMahasiswa")]
    StudentBiodata,
    /// Class enrollments of one student.
    #[serde(rename = "GetKRSMahasiswa")]
    StudentEnrollments,
    /// Grade history of one student.
    #[serde(rename = "GetRiwayatNilaiMahasiswa")]
    StudentGrades,
    /// Lecturers teaching one class section.
    #[serde(rename = "GetDosenPengajarKelasKuliah")]
    SectionLecturers,
    /// Religion reference table.
    #[serde(rename = "GetAgama")]
    Religions,
    /// Student status reference table.
    #[serde(rename = "GetStatusMahasiswa")]
    StudentStatuses,
}

impl Action {
    /// All known actions.
    pub const ALL: [Action; 12] = [
        Action::Token,
        Action::Programs,
        Action::Terms,
        Action::Courses,
        Action::Lecturers,
        Action::Students,
        Action::StudentBiodata,
        Action::StudentEnrollments,
        Action::StudentGrades,
        Action::SectionLecturers,
        Action::Religions,
        Action::StudentStatuses,
    ];

    /// Returns the wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Token => "GetToken",
            Action::Programs => "GetProdi",
            Action::Terms => "GetSemester",
            Action::Courses => "GetListMataKuliah",
            Action::Lecturers => "GetListDosen",
            Action::Students => "GetListMahasiswa",
            Action::StudentBiodata => "GetBiodataMahasiswa",
            Action::StudentEnrollments => "GetKRSMahasiswa",
            Action::StudentGrades => "GetRiwayatNilaiMahasiswa",
            Action::SectionLecturers => "GetDosenPengajarKelasKuliah",
            Action::Religions => "GetAgama",
            Action::StudentStatuses => "GetStatusMahasiswa",
        }
    }

    /// Looks up an action by its wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    /// Returns true if the request must carry a bearer token.
    pub fn requires_token(&self) -> bool {
        !matches!(self, Action::Token)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
