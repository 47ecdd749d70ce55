//! Run lifecycle: load fixtures, ask questions, score, tear down.
//!
//! All notes are created and acknowledged before the first question is
//! asked. Notes created by the run are deleted on every exit path: the
//! normal path releases them explicitly to collect failures into the report,
//! and [`Fixtures`]'s `Drop` covers errors and panics.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult, ServiceError};
use crate::metrics::{Metrics, Outcome};
use crate::note::{Note, TestCase};
use crate::report::{RunReport, TeardownFailure};
use crate::run::{RunContext, RunIdentity};
use crate::service::NoteService;

pub const SKIPPED_INTERRUPTED: &str = "skipped: run interrupted";

/// Shared interrupt flag, set from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker threads for the question phase.
    pub jobs: usize,
    /// Pause between the last create and the first question.
    pub settle: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            settle: Duration::ZERO,
        }
    }
}

/// Progress hooks. Called from worker threads when `jobs > 1`.
pub trait Observer: Sync {
    fn note_created(&self, _index: usize, _total: usize, _title: &str) {}
    fn case_finished(&self, _index: usize, _total: usize, _outcome: &Outcome) {}
}

pub struct Silent;

impl Observer for Silent {}

// ---------------------------------------------------------------------------
// Fixture ownership
// ---------------------------------------------------------------------------

/// Owns the notes created for a run and deletes them when released or
/// dropped.
pub struct Fixtures<'a> {
    service: &'a dyn NoteService,
    ctx: RunContext,
}

impl<'a> Fixtures<'a> {
    pub fn new(service: &'a dyn NoteService, identity: RunIdentity) -> Self {
        Self {
            service,
            ctx: RunContext::new(identity),
        }
    }

    pub fn identity(&self) -> &RunIdentity {
        self.ctx.identity()
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.ctx
    }

    /// Delete every note created so far and return the ones that failed.
    pub fn release(mut self) -> Vec<TeardownFailure> {
        teardown(self.service, &mut self.ctx)
    }
}

impl Drop for Fixtures<'_> {
    fn drop(&mut self) {
        if !self.ctx.created().is_empty() {
            let _ = teardown(self.service, &mut self.ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Create every note, in order. Any failure aborts the load.
pub fn load_fixtures(
    service: &dyn NoteService,
    ctx: &mut RunContext,
    notes: &[Note],
    cancel: &CancelFlag,
    observer: &dyn Observer,
) -> HarnessResult<()> {
    let total = notes.len();
    for (i, note) in notes.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(HarnessError::Interrupted {
                created: ctx.created().len(),
            });
        }
        let id = service
            .create_note(ctx.identity(), note)
            .and_then(|id| {
                if id.trim().is_empty() {
                    Err(ServiceError::MissingId)
                } else {
                    Ok(id)
                }
            })
            .map_err(|source| HarnessError::Setup {
                title: note.title.clone(),
                source,
            })?;
        debug!(run = %ctx.identity(), %id, title = %note.title, "note created");
        ctx.record(id, note.title.clone());
        observer.note_created(i, total, &note.title);
    }
    info!(run = %ctx.identity(), count = total, "fixtures loaded");
    Ok(())
}

/// Ask every question. Never fails: call errors become incorrect outcomes.
/// Outcomes are returned in case order regardless of `jobs`.
pub fn run_questions(
    service: &dyn NoteService,
    run: &RunIdentity,
    cases: &[TestCase],
    jobs: usize,
    cancel: &CancelFlag,
    observer: &dyn Observer,
) -> Vec<Outcome> {
    let jobs = jobs.clamp(1, cases.len().max(1));
    if jobs == 1 {
        return cases
            .iter()
            .enumerate()
            .map(|(i, case)| ask_one(service, run, case, i, cases.len(), cancel, observer))
            .collect();
    }

    let next = AtomicUsize::new(0);
    let mut slots: Vec<Option<Outcome>> = vec![None; cases.len()];

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..jobs)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        let Some(case) = cases.get(i) else { break };
                        done.push((
                            i,
                            ask_one(service, run, case, i, cases.len(), cancel, observer),
                        ));
                    }
                    done
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (i, outcome) in done {
                        slots[i] = Some(outcome);
                    }
                }
                Err(_) => warn!("question worker panicked"),
            }
        }
    });

    slots
        .into_iter()
        .zip(cases)
        .map(|(slot, case)| slot.unwrap_or_else(|| Outcome::failed(case, "worker panicked", 0)))
        .collect()
}

fn ask_one(
    service: &dyn NoteService,
    run: &RunIdentity,
    case: &TestCase,
    index: usize,
    total: usize,
    cancel: &CancelFlag,
    observer: &dyn Observer,
) -> Outcome {
    let outcome = if cancel.is_cancelled() {
        Outcome::failed(case, SKIPPED_INTERRUPTED, 0)
    } else {
        let t0 = Instant::now();
        let result = service.ask(run, &case.question);
        let latency_ms = t0.elapsed().as_millis() as u64;
        if let Err(e) = &result {
            warn!(question = %case.question, "query failed: {e}");
        }
        Outcome::evaluate(case, result, latency_ms)
    };
    observer.case_finished(index, total, &outcome);
    outcome
}

/// Delete every note recorded in `ctx`. Failures are logged and returned,
/// never raised.
pub fn teardown(service: &dyn NoteService, ctx: &mut RunContext) -> Vec<TeardownFailure> {
    let mut failures = Vec::new();
    let created = ctx.drain_created();
    let total = created.len();
    for note in created {
        match service.delete_note(ctx.identity(), &note.id) {
            Ok(()) => debug!(run = %ctx.identity(), id = %note.id, "note deleted"),
            Err(e) => {
                warn!(
                    run = %ctx.identity(),
                    id = %note.id,
                    title = %note.title,
                    "failed to delete note, reconcile manually: {e}"
                );
                failures.push(TeardownFailure {
                    id: note.id,
                    title: note.title,
                    error: e.to_string(),
                });
            }
        }
    }
    info!(
        run = %ctx.identity(),
        deleted = total - failures.len(),
        leaked = failures.len(),
        "fixtures torn down"
    );
    failures
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Load, ask, score and tear down. Returns `Err` only for setup failures;
/// the notes created before the failure are still deleted.
pub fn run_accuracy(
    service: &dyn NoteService,
    identity: RunIdentity,
    notes: &[Note],
    cases: &[TestCase],
    opts: &RunOptions,
    cancel: &CancelFlag,
    observer: &dyn Observer,
) -> HarnessResult<RunReport> {
    let started_at = Utc::now();
    let mut fixtures = Fixtures::new(service, identity);

    if let Err(e) = load_fixtures(service, fixtures.context_mut(), notes, cancel, observer) {
        let leaked = fixtures.release();
        if !leaked.is_empty() {
            warn!("{} notes leaked after aborted setup", leaked.len());
        }
        return Err(e);
    }
    let notes_loaded = fixtures.context().created().len();

    if !opts.settle.is_zero() {
        debug!("waiting {:?} for indexing", opts.settle);
        std::thread::sleep(opts.settle);
    }

    let identity = fixtures.identity().clone();
    let outcomes = run_questions(service, &identity, cases, opts.jobs, cancel, observer);
    let metrics = Metrics::from_outcomes(&outcomes);
    let leaked = fixtures.release();

    Ok(RunReport {
        identity,
        started_at,
        finished_at: Utc::now(),
        notes_loaded,
        metrics,
        outcomes,
        leaked,
        interrupted: cancel.is_cancelled(),
    })
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;
    use crate::error::ServiceResult;
    use crate::note::Reply;

    /// In-memory stand-in for the service. Answers a question by returning
    /// the text of every note in the asking run whose title shares a word
    /// with the question; unscoped reads are impossible by construction.
    #[derive(Default)]
    pub struct FakeService {
        pub notes: Mutex<HashMap<String, BTreeMap<String, Note>>>,
        pub next_id: AtomicUsize,
        pub fail_create_titles: HashSet<String>,
        pub fail_delete_ids: HashSet<String>,
        pub fail_questions: HashSet<String>,
        pub asked: Mutex<Vec<(String, usize)>>,
    }

    impl FakeService {
        pub fn remaining(&self, run: &RunIdentity) -> usize {
            self.notes
                .lock()
                .unwrap()
                .get(run.as_str())
                .map_or(0, BTreeMap::len)
        }
    }

    impl NoteService for FakeService {
        fn create_note(&self, run: &RunIdentity, note: &Note) -> ServiceResult<String> {
            if self.fail_create_titles.contains(&note.title) {
                return Err(ServiceError::Status {
                    status: 500,
                    body: "boom".into(),
                    retry_after: None,
                });
            }
            let id = format!("n{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.notes
                .lock()
                .unwrap()
                .entry(run.as_str().to_string())
                .or_default()
                .insert(id.clone(), note.clone());
            Ok(id)
        }

        fn delete_note(&self, run: &RunIdentity, id: &str) -> ServiceResult<()> {
            if self.fail_delete_ids.contains(id) {
                return Err(ServiceError::Transport("connection reset".into()));
            }
            if let Some(notes) = self.notes.lock().unwrap().get_mut(run.as_str()) {
                notes.remove(id);
            }
            Ok(())
        }

        fn ask(&self, run: &RunIdentity, question: &str) -> ServiceResult<Reply> {
            let loaded = self.remaining(run);
            self.asked
                .lock()
                .unwrap()
                .push((question.to_string(), loaded));
            if self.fail_questions.contains(question) {
                return Err(ServiceError::Timeout(Duration::from_secs(30)));
            }
            let q = question.to_lowercase();
            let notes = self.notes.lock().unwrap();
            let text = notes
                .get(run.as_str())
                .map(|ns| {
                    ns.values()
                        .filter(|n| {
                            n.title
                                .to_lowercase()
                                .split_whitespace()
                                .any(|w| w.len() > 3 && q.contains(w))
                        })
                        .map(|n| n.text.clone())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            Ok(Reply::text(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeService;
    use super::*;

    fn corpus() -> (Vec<Note>, Vec<TestCase>) {
        let notes = vec![
            Note::new(
                "TechCorp Earnings",
                "TechCorp reported revenue of $847 million. CEO is Marcus Chen.",
            ),
            Note::new("Lakers Season", "Lakers finished with 52 wins."),
            Note::new("Apollo Mission", "Apollo 11 launched July 16, 1969."),
        ];
        let cases = vec![
            TestCase::new("What was TechCorp revenue?", ["847 million", "847"]),
            TestCase::new("Who is the TechCorp CEO?", ["Marcus Chen"]),
            TestCase::new("How many wins did the Lakers have?", ["52"]),
            TestCase::new("Who commanded the mission?", ["Armstrong"]),
        ];
        (notes, cases)
    }

    fn run(service: &FakeService, jobs: usize) -> HarnessResult<RunReport> {
        let (notes, cases) = corpus();
        let opts = RunOptions {
            jobs,
            ..RunOptions::default()
        };
        run_accuracy(
            service,
            RunIdentity::from_raw("run-a"),
            &notes,
            &cases,
            &opts,
            &CancelFlag::new(),
            &Silent,
        )
    }

    #[test]
    fn test_end_to_end_scores_and_cleans_up() {
        let service = FakeService::default();
        let report = run(&service, 1).unwrap();

        assert_eq!(report.notes_loaded, 3);
        assert_eq!(report.metrics.total, 4);
        assert_eq!(report.metrics.true_positives, 3);
        assert!((report.metrics.recall - 0.75).abs() < 1e-9);
        assert!(report.leaked.is_empty());
        assert!(!report.interrupted);
        assert_eq!(service.remaining(&RunIdentity::from_raw("run-a")), 0);
    }

    #[test]
    fn test_all_notes_exist_before_first_question() {
        let service = FakeService::default();
        run(&service, 1).unwrap();
        let asked = service.asked.lock().unwrap();
        assert_eq!(asked.len(), 4);
        assert!(asked.iter().all(|(_, loaded)| *loaded == 3));
    }

    #[test]
    fn test_parallel_run_preserves_case_order() {
        let service = FakeService::default();
        let report = run(&service, 3).unwrap();
        let (_, cases) = corpus();
        let questions: Vec<_> = report.outcomes.iter().map(|o| o.question.clone()).collect();
        let expected: Vec<_> = cases.iter().map(|c| c.question.clone()).collect();
        assert_eq!(questions, expected);
        assert_eq!(report.metrics.true_positives, 3);
        assert_eq!(service.remaining(&RunIdentity::from_raw("run-a")), 0);
    }

    #[test]
    fn test_setup_failure_aborts_before_questions_and_tears_down() {
        let mut service = FakeService::default();
        service
            .fail_create_titles
            .insert("Apollo Mission".to_string());

        let err = run(&service, 1).unwrap_err();
        match err {
            HarnessError::Setup { title, source } => {
                assert_eq!(title, "Apollo Mission");
                assert!(matches!(source, ServiceError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(service.asked.lock().unwrap().is_empty());
        assert_eq!(service.remaining(&RunIdentity::from_raw("run-a")), 0);
    }

    #[test]
    fn test_query_failure_is_absorbed() {
        let mut service = FakeService::default();
        service
            .fail_questions
            .insert("Who is the TechCorp CEO?".to_string());

        let report = run(&service, 1).unwrap();
        let failed = &report.outcomes[1];
        assert!(!failed.correct);
        assert!(failed.error.is_some());
        assert_eq!(report.metrics.true_positives, 2);
        assert_eq!(report.metrics.total, 4);
    }

    #[test]
    fn test_teardown_failure_is_reported_not_raised() {
        let mut service = FakeService::default();
        // ids are assigned sequentially from n0
        service.fail_delete_ids.insert("n1".to_string());

        let report = run(&service, 1).unwrap();
        assert_eq!(report.leaked.len(), 1);
        assert_eq!(report.leaked[0].id, "n1");
        assert_eq!(report.leaked[0].title, "Lakers Season");
        assert!((report.metrics.recall - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_interrupt_skips_remaining_questions() {
        let service = FakeService::default();
        let (notes, cases) = corpus();
        let cancel = CancelFlag::new();

        struct CancelAfterFirst(CancelFlag);
        impl Observer for CancelAfterFirst {
            fn case_finished(&self, index: usize, _total: usize, _outcome: &Outcome) {
                if index == 0 {
                    self.0.cancel();
                }
            }
        }

        let report = run_accuracy(
            &service,
            RunIdentity::from_raw("run-a"),
            &notes,
            &cases,
            &RunOptions::default(),
            &cancel,
            &CancelAfterFirst(cancel.clone()),
        )
        .unwrap();

        assert!(report.interrupted);
        assert!(report.outcomes[0].correct);
        assert!(report.outcomes[1..]
            .iter()
            .all(|o| o.error.as_deref() == Some(SKIPPED_INTERRUPTED)));
        assert_eq!(report.metrics.total, 4);
        assert_eq!(service.asked.lock().unwrap().len(), 1);
        assert_eq!(service.remaining(&RunIdentity::from_raw("run-a")), 0);
    }

    #[test]
    fn test_interrupt_during_load_tears_down() {
        let service = FakeService::default();
        let (notes, cases) = corpus();
        let cancel = CancelFlag::new();

        struct CancelOnFirstNote(CancelFlag);
        impl Observer for CancelOnFirstNote {
            fn note_created(&self, _index: usize, _total: usize, _title: &str) {
                self.0.cancel();
            }
        }

        let err = run_accuracy(
            &service,
            RunIdentity::from_raw("run-a"),
            &notes,
            &cases,
            &RunOptions::default(),
            &cancel,
            &CancelOnFirstNote(cancel.clone()),
        )
        .unwrap_err();

        assert!(matches!(err, HarnessError::Interrupted { created: 1 }));
        assert_eq!(service.remaining(&RunIdentity::from_raw("run-a")), 0);
    }

    #[test]
    fn test_fixtures_drop_releases_on_panic() {
        let service = FakeService::default();
        let identity = RunIdentity::from_raw("run-p");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut fixtures = Fixtures::new(&service, identity.clone());
            let (notes, _) = corpus();
            load_fixtures(
                &service,
                fixtures.context_mut(),
                &notes,
                &CancelFlag::new(),
                &Silent,
            )
            .unwrap();
            panic!("evaluator blew up");
        }));
        assert!(result.is_err());
        assert_eq!(service.remaining(&identity), 0);
    }

    #[test]
    fn test_double_delete_is_not_fatal() {
        let service = FakeService::default();
        let run = RunIdentity::from_raw("run-d");
        let id = service
            .create_note(&run, &Note::new("Title", "Body"))
            .unwrap();
        assert!(service.delete_note(&run, &id).is_ok());
        assert!(service.delete_note(&run, &id).is_ok());
    }

    #[test]
    fn test_runs_are_isolated() {
        let service = FakeService::default();
        let a = RunIdentity::from_raw("run-a");
        let b = RunIdentity::from_raw("run-b");
        service
            .create_note(&a, &Note::new("Canary Vault", "The canary code is ZX-4417."))
            .unwrap();

        let from_b = service.ask(&b, "What is the canary code?").unwrap();
        let from_a = service.ask(&a, "What is the canary code?").unwrap();
        assert!(!crate::matcher::is_correct(&from_b.text, &["ZX-4417"]));
        assert!(crate::matcher::is_correct(&from_a.text, &["ZX-4417"]));
    }
}
