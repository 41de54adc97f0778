//! Engine wiring for integration tests.

use crate::feeder::FakeFeeder;
use crate::fixtures::{course_row, lecturer_row, program_row, student_row, term_row};
use crate::pause::RecordingPause;
use feedsync_engine::{FeederClient, RetryConfig, StaticCredentials, SyncConfig, SyncEngine};
use feedsync_protocol::Action;
use feedsync_store::{MemoryStore, Store};
use std::sync::Arc;
use std::time::Duration;

/// Endpoint URL used by the harness.
pub const FEEDER_URL: &str = "http://feeder.test/ws/live2.php";
/// Username accepted by the harness feeder.
pub const USERNAME: &str = "operator";
/// Password accepted by the harness feeder.
pub const PASSWORD: &str = "s3cret";
/// Year the harness pins for the term window.
pub const YEAR: i32 = 2025;
/// Base retry delay of the harness.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);
/// Delay between calls of the harness.
pub const CALL_DELAY: Duration = Duration::from_millis(5);
/// Cooldown after a per-item failure of the harness.
pub const COOLDOWN: Duration = Duration::from_millis(50);

/// The engine type the harness builds.
pub type TestEngine<S> = SyncEngine<FeederClient<Arc<FakeFeeder>>, S>;

/// Configuration used by the harness.
pub fn test_config() -> SyncConfig {
    SyncConfig::new()
        .with_retry(RetryConfig::new(3).with_initial_delay(RETRY_DELAY))
        .with_call_delay(CALL_DELAY)
        .with_failure_cooldown(COOLDOWN)
        .with_batch_limit(50)
        .with_circuit_breaker(5)
        .with_current_year(YEAR)
}

/// A fake feeder, a recording pause and an engine wired to both.
pub struct Harness<S: Store = MemoryStore> {
    /// The fake feeder.
    pub feeder: Arc<FakeFeeder>,
    /// Every pause requested by the client and the engine.
    pub pause: Arc<RecordingPause>,
    /// The engine under test.
    pub engine: TestEngine<S>,
}

impl Harness<MemoryStore> {
    /// Creates a harness over an empty memory store.
    pub fn new() -> Self {
        Self::build(FakeFeeder::new(USERNAME, PASSWORD), MemoryStore::new(), test_config())
    }
}

impl Default for Harness<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> Harness<S> {
    /// Creates a harness from its parts.
    pub fn build(feeder: FakeFeeder, store: S, config: SyncConfig) -> Self {
        crate::init_test_logging();
        let feeder = Arc::new(feeder);
        let pause = Arc::new(RecordingPause::new());
        let client = FeederClient::new(
            feeder.clone(),
            Arc::new(StaticCredentials::new(FEEDER_URL, USERNAME, PASSWORD)),
            config.retry.clone(),
        )
        .with_pause(pause.clone());
        let engine = SyncEngine::new(client, store, config).with_pause(pause.clone());
        Self {
            feeder,
            pause,
            engine,
        }
    }

    /// Returns the store behind the engine.
    pub fn store(&self) -> &S {
        self.engine.store()
    }

    /// Serves a small catalogue: two programs, three terms, three courses,
    /// two lecturers and `students` students.
    pub fn seed_catalogue(&self, students: usize) {
        self.feeder.set_rows(
            Action::Programs,
            vec![
                program_row("P1", "55201", "Informatics"),
                program_row("P2", "61201", "Management"),
            ],
        );
        self.feeder.set_rows(
            Action::Terms,
            vec![
                term_row("20231", "2023/2024 Ganjil"),
                term_row("20232", "2023/2024 Genap"),
                term_row("20241", "2024/2025 Ganjil"),
            ],
        );
        self.feeder.set_rows(
            Action::Courses,
            vec![
                course_row("MK1", "P1", "IF101", 3),
                course_row("MK2", "P1", "IF102", 2),
                course_row("MK3", "P2", "MN101", 4),
            ],
        );
        self.feeder.set_rows(
            Action::Lecturers,
            vec![lecturer_row("D1", "Dr. Ani"), lecturer_row("D2", "Dr. Budi")],
        );
        self.feeder.set_rows(
            Action::Students,
            (1..=students)
                .map(|i| student_row(&format!("R{i:03}"), &format!("M{i:03}"), "P1", "20231"))
                .collect(),
        );
    }

    /// Syncs programs, terms, courses, lecturers and students.
    pub fn sync_catalogue(&self) {
        self.engine.sync_programs().expect("programs");
        self.engine.sync_terms().expect("terms");
        self.engine.sync_courses().expect("courses");
        self.engine.sync_lecturers().expect("lecturers");
        self.engine.sync_students().expect("students");
    }
}
