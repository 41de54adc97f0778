//! Feeder row fixtures.
//!
//! Builders for the rows each feeder action returns, using the feeder's
//! own field names. Optional fields can be added with [`Row::with`].

use feedsync_protocol::Row;

/// A `GetProdi` row.
pub fn program_row(id: &str, code: &str, name: &str) -> Row {
    Row::new()
        .with("id_prodi", id)
        .with("kode_program_studi", code)
        .with("nama_program_studi", name)
        .with("nama_jenjang_pendidikan", "S1")
        .with("status", "A")
}

/// A `GetSemester` row.
pub fn term_row(id: &str, name: &str) -> Row {
    Row::new()
        .with("id_semester", id)
        .with("nama_semester", name)
        .with("a_periode_aktif", "0")
}

/// A `GetListMataKuliah` row.
pub fn course_row(id: &str, program: &str, code: &str, credits: i64) -> Row {
    Row::new()
        .with("id_matkul", id)
        .with("id_prodi", program)
        .with("kode_mata_kuliah", code)
        .with("nama_mata_kuliah", format!("Course {code}"))
        .with("sks_mata_kuliah", credits.to_string())
}

/// A `GetListDosen` row.
pub fn lecturer_row(id: &str, name: &str) -> Row {
    Row::new()
        .with("id_dosen", id)
        .with("nidn", format!("NIDN-{id}"))
        .with("nama_dosen", name)
        .with("jenis_kelamin", "L")
        .with("nama_status_aktif", "Aktif")
}

/// A `GetListMahasiswa` row.
pub fn student_row(registration: &str, person: &str, program: &str, entry_term: &str) -> Row {
    Row::new()
        .with("id_registrasi_mahasiswa", registration)
        .with("id_mahasiswa", person)
        .with("nim", format!("NIM-{registration}"))
        .with("nama_mahasiswa", format!("Student {registration}"))
        .with("jenis_kelamin", "P")
        .with("id_prodi", program)
        .with("id_periode", entry_term)
        .with("id_status_mahasiswa", "A")
}

/// A `GetKRSMahasiswa` row.
pub fn enrollment_row(registration: &str, term: &str, course: &str, section: &str, credits: i64) -> Row {
    Row::new()
        .with("id_registrasi_mahasiswa", registration)
        .with("id_periode", term)
        .with("id_matkul", course)
        .with("id_kelas", section)
        .with("nama_kelas_kuliah", format!("Class {section}"))
        .with("sks_mata_kuliah", credits)
}

/// A `GetRiwayatNilaiMahasiswa` row.
pub fn grade_row(registration: &str, term: &str, course: &str, score: f64, letter: &str) -> Row {
    Row::new()
        .with("id_registrasi_mahasiswa", registration)
        .with("id_periode", term)
        .with("id_matkul", course)
        .with("nilai_angka", score)
        .with("nilai_huruf", letter)
        .with("nilai_indeks", "4.00")
}

/// A `GetDosenPengajarKelasKuliah` row.
pub fn section_lecturer_row(section: &str, lecturer: &str, name: &str) -> Row {
    Row::new()
        .with("id_kelas_kuliah", section)
        .with("id_dosen", lecturer)
        .with("nama_dosen", name)
}

/// A `GetBiodataMahasiswa` row.
pub fn biodata_row(person: &str, birth_place: &str, email: &str) -> Row {
    Row::new()
        .with("id_mahasiswa", person)
        .with("tempat_lahir", birth_place)
        .with("tanggal_lahir", "2003-04-05")
        .with("id_agama", "1")
        .with("email", email)
        .with("handphone", "0812000000")
        .with("nama_ibu_kandung", "Siti")
}

/// A `GetAgama` row.
pub fn religion_row(id: &str, name: &str) -> Row {
    Row::new().with("id_agama", id).with("nama_agama", name)
}

/// A `GetStatusMahasiswa` row.
pub fn status_row(id: &str, name: &str) -> Row {
    Row::new()
        .with("id_status_mahasiswa", id)
        .with("nama_status_mahasiswa", name)
}
