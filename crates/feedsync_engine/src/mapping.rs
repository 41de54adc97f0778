//! Row extraction per resource.
//!
//! Every mapping function reads the loosely-typed feeder row once, at the
//! top, into explicit optional fields and then builds the local record.
//! Defaults: blank text is null, blank numbers are null, an unresolvable
//! optional relation is null. A present but malformed value is an error
//! for that row.

use crate::error::{SyncError, SyncResult};
use crate::resolver::Resolvers;
use crate::term::{parse_parity, parse_year, TermWindow};
use feedsync_protocol::Row;
use feedsync_store::{EntityKind, FieldValue, KeyPart, LocalId, NaturalKey, Record, StoredRecord};

/// Reference-table category of religions.
pub const RELIGION: &str = "religion";
/// Reference-table category of student statuses.
pub const STUDENT_STATUS: &str = "student_status";

/// A row translated into a local record.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped {
    /// Key the record is reconciled on.
    pub key: NaturalKey,
    /// Mapped fields; only these take part in diffs.
    pub fields: Record,
}

impl Mapped {
    /// Creates a mapped row.
    pub fn new(key: NaturalKey, fields: Record) -> Self {
        Self { key, fields }
    }
}

/// What to do with one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    /// Create or update the record.
    Upsert(Mapped),
    /// Leave it alone: a required relation is missing. Counted as skipped.
    Skip(String),
    /// Drop it without counting it.
    Exclude,
}

/// Everything a mapping function may consult.
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    /// Resolver maps of the run.
    pub resolvers: &'a Resolvers,
    /// Local record the rows were fetched for, in anchored steps.
    pub anchor: Option<&'a StoredRecord>,
    /// Year the term window is computed from.
    pub current_year: i32,
    /// Sane range of term ids.
    pub term_window: TermWindow,
}

impl<'a> MapContext<'a> {
    fn anchor(&self) -> SyncResult<&'a StoredRecord> {
        self.anchor
            .ok_or_else(|| SyncError::Precondition("anchored mapping without an anchor".into()))
    }

    fn resolve(&self, kind: EntityKind, remote_id: Option<&str>) -> Option<LocalId> {
        self.resolvers.resolve(kind, remote_id)
    }
}

/// Maps one row.
pub type MapFn = fn(&Row, &MapContext<'_>) -> SyncResult<Mapping>;

fn int(row: &Row, key: &str) -> SyncResult<Option<i64>> {
    Ok(row.int(key)?)
}

fn decimal(row: &Row, key: &str) -> SyncResult<Option<f64>> {
    Ok(row.decimal(key)?)
}

fn missing(kind: EntityKind, remote_id: Option<&str>) -> Mapping {
    Mapping::Skip(format!(
        "{kind} {} not found locally",
        remote_id.unwrap_or("(blank)")
    ))
}

/// `GetProdi` row to a program.
pub fn program(row: &Row, _ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    let id = row.require_text("id_prodi")?;
    let code = row.text("kode_program_studi");
    let name = row.text("nama_program_studi");
    let level = row.text("nama_jenjang_pendidikan");
    let status = row.text("status");

    Ok(Mapping::Upsert(Mapped::new(
        NaturalKey::remote(id),
        Record::new()
            .with("code", code)
            .with("name", name)
            .with("level", level)
            .with("status", status),
    )))
}

/// `GetSemester` row to a term. Ids outside the term window are excluded.
pub fn term(row: &Row, ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    let id = row.require_text("id_semester")?;
    let name = row.text("nama_semester");
    let active = row.flag("a_periode_aktif");

    let numeric: i64 = id
        .parse()
        .map_err(|_| SyncError::mapping("id_semester", format!("{id:?} is not numeric")))?;
    if !ctx.term_window.contains(numeric, ctx.current_year) {
        return Ok(Mapping::Exclude);
    }

    let label = name.as_deref().unwrap_or_default();
    let year = parse_year(label).map(i64::from);
    let parity = parse_parity(label).map_or("none", |p| p.as_str());

    Ok(Mapping::Upsert(Mapped::new(
        NaturalKey::remote(id),
        Record::new()
            .with("name", name)
            .with("year", year)
            .with("parity", parity)
            .with("active", active),
    )))
}

/// `GetListMataKuliah` row to a course. The program is required.
pub fn course(row: &Row, ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    let id = row.require_text("id_matkul")?;
    let program_id = row.text("id_prodi");
    let code = row.text("kode_mata_kuliah");
    let name = row.text("nama_mata_kuliah");
    let credits = int(row, "sks_mata_kuliah")?;

    let Some(program) = ctx.resolve(EntityKind::Program, program_id.as_deref()) else {
        return Ok(missing(EntityKind::Program, program_id.as_deref()));
    };

    Ok(Mapping::Upsert(Mapped::new(
        NaturalKey::remote(id),
        Record::new()
            .with("code", code)
            .with("name", name)
            .with("credits", credits)
            .with("program", program),
    )))
}

/// `GetListDosen` row to a lecturer.
pub fn lecturer(row: &Row, _ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    let id = row.require_text("id_dosen")?;
    let nidn = row.text("nidn");
    let name = row.text("nama_dosen");
    let gender = row.text("jenis_kelamin");
    let status = row.text("nama_status_aktif");

    Ok(Mapping::Upsert(Mapped::new(
        NaturalKey::remote(id),
        Record::new()
            .with("nidn", nidn)
            .with("name", name)
            .with("gender", gender)
            .with("status", status),
    )))
}

/// `GetListMahasiswa` row to a student.
///
/// Program and entry term are optional relations: unresolved ids leave
/// them null.
pub fn student(row: &Row, ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    let id = row.require_text("id_registrasi_mahasiswa")?;
    let person_id = row.text("id_mahasiswa");
    let nim = row.text("nim");
    let name = row.text("nama_mahasiswa");
    let gender = row.text("jenis_kelamin");
    let program_id = row.text("id_prodi");
    let term_id = row.text("id_periode");
    let status_code = row.text("id_status_mahasiswa");

    let program = ctx.resolve(EntityKind::Program, program_id.as_deref());
    let entry_term = ctx.resolve(EntityKind::Term, term_id.as_deref());

    Ok(Mapping::Upsert(Mapped::new(
        NaturalKey::remote(id),
        Record::new()
            .with("person_id", person_id)
            .with("nim", nim)
            .with("name", name)
            .with("gender", gender)
            .with("program", program)
            .with("entry_term", entry_term)
            .with("status_code", status_code),
    )))
}

/// `GetKRSMahasiswa` row to an enrollment line of the anchor student.
///
/// The key is scoped to the student: `(term, section id)`. The enrollment
/// step re-keys the line under its header before storing it. Lecturer
/// fields start null and are filled by the lecturer backfill.
pub fn enrollment_line(row: &Row, ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    ctx.anchor()?;
    let term_id = row.text("id_periode");
    let course_id = row.text("id_matkul");
    let section_id = row.require_text("id_kelas")?;
    let section_name = row.text("nama_kelas_kuliah");
    let credits = int(row, "sks_mata_kuliah")?;

    let Some(term) = ctx.resolve(EntityKind::Term, term_id.as_deref()) else {
        return Ok(missing(EntityKind::Term, term_id.as_deref()));
    };
    let Some(course) = ctx.resolve(EntityKind::Course, course_id.as_deref()) else {
        return Ok(missing(EntityKind::Course, course_id.as_deref()));
    };

    Ok(Mapping::Upsert(Mapped::new(
        NaturalKey::composite([KeyPart::Ref(term), KeyPart::Text(section_id.clone())]),
        Record::new()
            .with("course", course)
            .with("section_id", section_id)
            .with("section_name", section_name)
            .with("credits", credits)
            .with("lecturer", FieldValue::Null)
            .with("lecturer_name", FieldValue::Null),
    )))
}

/// `GetRiwayatNilaiMahasiswa` row to a grade of the anchor student.
pub fn grade(row: &Row, ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    let student = ctx.anchor()?.id;
    let term_id = row.text("id_periode");
    let course_id = row.text("id_matkul");
    let score = decimal(row, "nilai_angka")?;
    let letter = row.text("nilai_huruf");
    let index = decimal(row, "nilai_indeks")?;

    let Some(term) = ctx.resolve(EntityKind::Term, term_id.as_deref()) else {
        return Ok(missing(EntityKind::Term, term_id.as_deref()));
    };
    let Some(course) = ctx.resolve(EntityKind::Course, course_id.as_deref()) else {
        return Ok(missing(EntityKind::Course, course_id.as_deref()));
    };

    Ok(Mapping::Upsert(Mapped::new(
        NaturalKey::composite([student, course, term]),
        Record::new()
            .with("student", student)
            .with("course", course)
            .with("term", term)
            .with("score", score)
            .with("letter", letter)
            .with("index", index),
    )))
}

fn reference(category: &str, code: String, name: Option<String>) -> Mapping {
    Mapping::Upsert(Mapped::new(
        NaturalKey::composite([category, code.as_str()]),
        Record::new()
            .with("category", category)
            .with("code", code)
            .with("name", name),
    ))
}

/// `GetAgama` row to a reference code.
pub fn religion(row: &Row, _ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    let code = row.require_text("id_agama")?;
    let name = row.text("nama_agama");
    Ok(reference(RELIGION, code, name))
}

/// `GetStatusMahasiswa` row to a reference code.
pub fn student_status(row: &Row, _ctx: &MapContext<'_>) -> SyncResult<Mapping> {
    let code = row.require_text("id_status_mahasiswa")?;
    let name = row.text("nama_status_mahasiswa");
    Ok(reference(STUDENT_STATUS, code, name))
}

/// `GetBiodataMahasiswa` row to the detail fields of a student.
pub fn biodata(row: &Row) -> Record {
    let birth_place = row.text("tempat_lahir");
    let birth_date = row.text("tanggal_lahir");
    let religion_code = row.text("id_agama");
    let email = row.text("email");
    let phone = row.text("handphone");
    let mother_name = row.text("nama_ibu_kandung");

    Record::new()
        .with("birth_place", birth_place)
        .with("birth_date", birth_date)
        .with("religion_code", religion_code)
        .with("email", email)
        .with("phone", phone)
        .with("mother_name", mother_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_store::{MemoryStore, Store};

    fn with_ctx<R>(store: &MemoryStore, anchor: Option<&StoredRecord>, f: impl FnOnce(&MapContext<'_>) -> R) -> R {
        let resolvers = Resolvers::build(
            store,
            &[],
            &[EntityKind::Program, EntityKind::Term, EntityKind::Course],
        )
        .unwrap();
        let ctx = MapContext {
            resolvers: &resolvers,
            anchor,
            current_year: 2025,
            term_window: TermWindow::default(),
        };
        f(&ctx)
    }

    fn upserted(mapping: Mapping) -> Mapped {
        match mapping {
            Mapping::Upsert(mapped) => mapped,
            other => panic!("expected upsert, got {other:?}"),
        }
    }

    #[test]
    fn term_fields_and_window() {
        let store = MemoryStore::new();
        with_ctx(&store, None, |ctx| {
            let row = Row::new()
                .with("id_semester", "20241")
                .with("nama_semester", "2024/2025 Ganjil")
                .with("a_periode_aktif", "1");
            let mapped = upserted(term(&row, ctx).unwrap());
            assert_eq!(mapped.key, NaturalKey::remote("20241"));
            assert_eq!(mapped.fields.int("year"), Some(2024));
            assert_eq!(mapped.fields.text("parity"), Some("odd"));
            assert_eq!(mapped.fields.get("active"), Some(&FieldValue::Bool(true)));

            let future = Row::new().with("id_semester", "20351");
            assert_eq!(term(&future, ctx).unwrap(), Mapping::Exclude);

            let boundary = Row::new().with("id_semester", "20263");
            assert!(matches!(term(&boundary, ctx).unwrap(), Mapping::Upsert(_)));

            let garbage = Row::new().with("id_semester", "2024A");
            assert!(matches!(term(&garbage, ctx), Err(SyncError::Mapping { .. })));
        });
    }

    #[test]
    fn course_requires_program() {
        let store = MemoryStore::new();
        let program = store
            .insert(EntityKind::Program, NaturalKey::remote("P1"), Record::new())
            .unwrap();
        with_ctx(&store, None, |ctx| {
            let row = Row::new()
                .with("id_matkul", "MK1")
                .with("id_prodi", "P1")
                .with("sks_mata_kuliah", "3");
            let mapped = upserted(course(&row, ctx).unwrap());
            assert_eq!(mapped.fields.reference("program"), Some(program));
            assert_eq!(mapped.fields.int("credits"), Some(3));

            let orphan = Row::new().with("id_matkul", "MK2").with("id_prodi", "P9");
            assert!(matches!(course(&orphan, ctx).unwrap(), Mapping::Skip(_)));

            let bad = Row::new()
                .with("id_matkul", "MK3")
                .with("id_prodi", "P1")
                .with("sks_mata_kuliah", "three");
            assert!(course(&bad, ctx).is_err());
        });
    }

    #[test]
    fn student_tolerates_unknown_program() {
        let store = MemoryStore::new();
        with_ctx(&store, None, |ctx| {
            let row = Row::new()
                .with("id_registrasi_mahasiswa", "R1")
                .with("id_mahasiswa", "M1")
                .with("nim", "2101")
                .with("id_prodi", "P404");
            let mapped = upserted(student(&row, ctx).unwrap());
            assert_eq!(mapped.fields.get("program"), Some(&FieldValue::Null));
            assert_eq!(mapped.fields.text("person_id"), Some("M1"));
        });
    }

    #[test]
    fn grade_keyed_by_student_course_term() {
        let store = MemoryStore::new();
        let term_id = store
            .insert(EntityKind::Term, NaturalKey::remote("20241"), Record::new())
            .unwrap();
        let course_id = store
            .insert(EntityKind::Course, NaturalKey::remote("MK1"), Record::new())
            .unwrap();
        store
            .insert(EntityKind::Student, NaturalKey::remote("R1"), Record::new())
            .unwrap();
        let anchor = store.dump(EntityKind::Student).remove(0);

        with_ctx(&store, Some(&anchor), |ctx| {
            let row = Row::new()
                .with("id_periode", "20241")
                .with("id_matkul", "MK1")
                .with("nilai_angka", "85,5")
                .with("nilai_huruf", "A");
            let mapped = upserted(grade(&row, ctx).unwrap());
            assert_eq!(
                mapped.key,
                NaturalKey::composite([anchor.id, course_id, term_id])
            );
            assert_eq!(mapped.fields.decimal("score"), Some(85.5));
        });
    }

    #[test]
    fn anchored_mapping_needs_anchor() {
        let store = MemoryStore::new();
        with_ctx(&store, None, |ctx| {
            let row = Row::new().with("id_kelas", "K1");
            assert!(matches!(
                enrollment_line(&row, ctx),
                Err(SyncError::Precondition(_))
            ));
        });
    }

    #[test]
    fn reference_codes() {
        let store = MemoryStore::new();
        with_ctx(&store, None, |ctx| {
            let row = Row::new().with("id_agama", 1).with("nama_agama", "Islam");
            let mapped = upserted(religion(&row, ctx).unwrap());
            assert_eq!(mapped.key, NaturalKey::composite(["religion", "1"]));
            assert_eq!(mapped.fields.text("name"), Some("Islam"));
        });
    }
}
