//! Reconciliation behavior against the fake feeder.

use feedsync_engine::{SyncError, SyncReport};
use feedsync_protocol::{Action, Row};
use feedsync_store::{EntityKind, FieldValue, MemoryStore, NaturalKey, Store};
use feedsync_testkit::fixtures::*;
use feedsync_testkit::generators::program_rows;
use feedsync_testkit::{test_config, FakeFeeder, FlakyStore, Harness};
use proptest::prelude::*;

fn assert_quiet(report: &SyncReport) {
    assert_eq!(report.inserted, 0, "{report:?}");
    assert_eq!(report.updated, 0, "{report:?}");
    assert_eq!(report.skipped, report.total, "{report:?}");
    assert!(report.errors.is_empty(), "{report:?}");
}

fn seed_references(harness: &Harness) {
    harness.feeder.set_rows(
        Action::Religions,
        vec![religion_row("1", "Islam"), religion_row("2", "Kristen")],
    );
    harness.feeder.set_rows(
        Action::StudentStatuses,
        vec![status_row("A", "Aktif"), status_row("L", "Lulus")],
    );
}

#[test]
fn second_run_changes_nothing() {
    let harness = Harness::new();
    harness.seed_catalogue(3);
    seed_references(&harness);
    let engine = &harness.engine;

    let first = [
        engine.sync_programs().unwrap(),
        engine.sync_terms().unwrap(),
        engine.sync_courses().unwrap(),
        engine.sync_lecturers().unwrap(),
        engine.sync_students().unwrap(),
        engine.sync_references().unwrap(),
    ];
    let inserted: Vec<u64> = first.iter().map(|r| r.inserted).collect();
    assert_eq!(inserted, vec![2, 3, 3, 2, 3, 4]);

    for report in [
        engine.sync_programs().unwrap(),
        engine.sync_terms().unwrap(),
        engine.sync_courses().unwrap(),
        engine.sync_lecturers().unwrap(),
        engine.sync_students().unwrap(),
        engine.sync_references().unwrap(),
    ] {
        assert!(report.total > 0);
        assert_quiet(&report);
    }

    assert_eq!(harness.store().dump(EntityKind::Program).len(), 2);
    assert_eq!(harness.store().dump(EntityKind::ReferenceCode).len(), 4);
}

#[test]
fn changed_remote_field_converges() {
    let harness = Harness::new();
    harness.seed_catalogue(0);
    harness.engine.sync_programs().unwrap();

    harness.feeder.set_rows(
        Action::Programs,
        vec![
            program_row("P1", "55201", "Informatics Engineering"),
            program_row("P2", "61201", "Management"),
        ],
    );
    let report = harness.engine.sync_programs().unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 1);

    let stored = harness
        .store()
        .find_by_key(EntityKind::Program, &NaturalKey::remote("P1"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.record.text("name"), Some("Informatics Engineering"));
    assert_eq!(harness.store().dump(EntityKind::Program).len(), 2);
}

#[test]
fn dependent_sync_refuses_to_run_without_dependencies() {
    let harness = Harness::new();
    harness.seed_catalogue(2);

    let err = harness.engine.sync_courses().unwrap_err();
    assert!(matches!(err, SyncError::Precondition(_)), "{err}");
    assert!(harness.store().dump(EntityKind::Course).is_empty());
    assert!(harness.feeder.calls().is_empty());

    assert!(matches!(
        harness.engine.sync_enrollments(0, 50),
        Err(SyncError::Precondition(_))
    ));
    assert!(matches!(
        harness.engine.sync_grades(0, 50),
        Err(SyncError::Precondition(_))
    ));
    assert!(harness.feeder.calls().is_empty());
}

#[test]
fn course_with_unknown_program_is_skipped() {
    let harness = Harness::new();
    harness.seed_catalogue(0);
    harness.feeder.add_rows(Action::Courses, [course_row("MK9", "P404", "XX999", 2)]);
    harness.engine.sync_programs().unwrap();

    let report = harness.engine.sync_courses().unwrap();
    assert_eq!(report.total, 4);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.skipped, 1);
    assert!(harness
        .store()
        .find_by_key(EntityKind::Course, &NaturalKey::remote("MK9"))
        .unwrap()
        .is_none());
}

#[test]
fn student_with_unknown_program_is_inserted() {
    let harness = Harness::new();
    harness.seed_catalogue(0);
    harness.feeder.set_rows(
        Action::Students,
        vec![student_row("R1", "M1", "P404", "29991")],
    );

    let report = harness.engine.sync_students().unwrap();
    assert_eq!(report.inserted, 1);
    let stored = harness.store().dump(EntityKind::Student).remove(0);
    assert_eq!(stored.record.get("program"), Some(&FieldValue::Null));
    assert_eq!(stored.record.get("entry_term"), Some(&FieldValue::Null));
}

#[test]
fn one_bad_row_does_not_stop_the_rest() {
    let harness = Harness::new();
    let rows: Vec<Row> = (1..=10)
        .map(|i| {
            if i == 5 {
                Row::new().with("nama_program_studi", "nameless")
            } else {
                program_row(&format!("P{i}"), &format!("C{i}"), "Program")
            }
        })
        .collect();
    harness.feeder.set_rows(Action::Programs, rows);

    let report = harness.engine.sync_programs().unwrap();
    assert_eq!(report.total, 10);
    assert_eq!(report.inserted, 9);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].key, "row #5");
    assert!(!report.aborted);
}

#[test]
fn store_failure_is_keyed_by_natural_id() {
    let store = FlakyStore::new(MemoryStore::new());
    store.fail_writes(EntityKind::Program, "P2");
    let harness = Harness::build(
        FakeFeeder::new(feedsync_testkit::harness::USERNAME, feedsync_testkit::harness::PASSWORD),
        store,
        test_config(),
    );
    harness.feeder.set_rows(
        Action::Programs,
        vec![
            program_row("P1", "A", "One"),
            program_row("P2", "B", "Two"),
            program_row("P3", "C", "Three"),
        ],
    );

    let report = harness.engine.sync_programs().unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].key, "P2");

    harness.store().heal();
    let report = harness.engine.sync_programs().unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped, 2);
}

#[test]
fn terms_outside_the_window_are_excluded() {
    let harness = Harness::new();
    harness.feeder.set_rows(
        Action::Terms,
        vec![
            term_row("20241", "2024/2025 Ganjil"),
            term_row("20263", "2026/2027 Pendek"),
            term_row("20351", "2035/2036 Ganjil"),
            term_row("19741", "1974/1975 Ganjil"),
        ],
    );

    let report = harness.engine.sync_terms().unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 0);
    assert!(report.errors.is_empty());

    let ids: Vec<String> = harness
        .store()
        .dump(EntityKind::Term)
        .into_iter()
        .map(|t| t.key.to_string())
        .collect();
    assert_eq!(ids, vec!["20241", "20263"]);

    let short = harness
        .store()
        .find_by_key(EntityKind::Term, &NaturalKey::remote("20263"))
        .unwrap()
        .unwrap();
    assert_eq!(short.record.text("parity"), Some("none"));
    assert_eq!(short.record.int("year"), Some(2026));
}

#[test]
fn non_numeric_term_id_is_a_row_error() {
    let harness = Harness::new();
    harness.feeder.set_rows(
        Action::Terms,
        vec![term_row("2024A", "2024/2025 Ganjil"), term_row("20242", "2024/2025 Genap")],
    );

    let report = harness.engine.sync_terms().unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].key, "2024A");
}

#[test]
fn sync_all_runs_in_dependency_order() {
    let harness = Harness::new();
    harness.seed_catalogue(2);
    seed_references(&harness);
    harness.feeder.set_rows(
        Action::StudentEnrollments,
        vec![enrollment_row("R001", "20241", "MK1", "K1", 3)],
    );
    harness.feeder.set_rows(
        Action::StudentGrades,
        vec![grade_row("R002", "20241", "MK3", 77.5, "B")],
    );

    let reports = harness.engine.sync_all().unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.resource).collect();
    assert_eq!(
        names,
        vec![
            "programs",
            "terms",
            "religions",
            "student_statuses",
            "courses",
            "lecturers",
            "students",
            "enrollments",
            "grades"
        ]
    );
    assert!(reports.iter().all(|r| r.errors.is_empty()));
    assert_eq!(harness.store().dump(EntityKind::EnrollmentDetail).len(), 1);
    assert_eq!(harness.store().dump(EntityKind::Grade).len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn program_sync_is_idempotent(rows in program_rows(20)) {
        let harness = Harness::new();
        harness.feeder.set_rows(Action::Programs, rows.clone());

        let first = harness.engine.sync_programs().unwrap();
        prop_assert_eq!(first.inserted, rows.len() as u64);

        let second = harness.engine.sync_programs().unwrap();
        prop_assert_eq!(second.inserted, 0);
        prop_assert_eq!(second.updated, 0);
        prop_assert_eq!(second.skipped, rows.len() as u64);
    }
}
