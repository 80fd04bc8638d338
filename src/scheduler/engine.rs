//! Multi-attempt timetable generation.
//!
//! # Algorithm
//!
//! One attempt = CSP search with a fresh seed, then local-search refinement,
//! then full validation and scoring. On top of that:
//!
//! - [`Scheduler::generate`]: one attempt.
//! - [`Scheduler::generate_with_retry`]: best of `n` attempts.
//! - [`Scheduler::generate_multiple`]: distinct feasible timetables, with
//!   relaxation once attempts keep failing.
//!
//! Attempt `k` is seeded with `base_seed + k`, so a fixed base seed makes the
//! whole run reproducible.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::hash::schedule_hash;
use crate::config::EngineConfig;
use crate::csp::{CspSolver, SolveStats};
use crate::models::{
    ClassInfo, ConstraintKind, ConstraintViolation, MultipleScheduleResult, ScheduleConfig,
    ScheduleResult, Subject, Teacher, TimeSlot,
};
use crate::optimizer::LocalSearchOptimizer;
use crate::relaxation::ConstraintRelaxer;
use crate::validation::validate_input;
use crate::validator::{ConstraintValidator, MoveError};

/// Severity tag of a progress message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Success,
    Warning,
    Error,
}

/// A caller-visible progress message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    pub severity: LogSeverity,
}

/// Receives progress messages.
pub type LogSink = Box<dyn FnMut(&LogEvent) + Send>;

/// Polled between attempts; `true` stops the run.
pub type CancelCheck = Box<dyn Fn() -> bool + Send>;

/// Timetable generator for one set of inputs.
///
/// Relaxations applied by [`Scheduler::generate_multiple`] persist for the
/// scheduler's lifetime.
///
/// # Example
///
/// ```
/// use u_timetable::config::EngineConfig;
/// use u_timetable::models::{ClassInfo, ScheduleConfig, Subject, Teacher};
/// use u_timetable::scheduler::Scheduler;
///
/// let mut scheduler = Scheduler::new(
///     ScheduleConfig::weekdays(1),
///     vec![ClassInfo::new("c1", 1, 1)],
///     vec![Subject::new("math", 5).with_grade(1)],
///     vec![Teacher::new("T1", 20).with_subject("math")],
/// )
/// .with_engine_config(EngineConfig::default().with_seed(7));
///
/// let result = scheduler.generate();
/// assert_eq!(result.entries.len(), 5);
/// assert!(result.is_feasible());
/// ```
pub struct Scheduler {
    config: ScheduleConfig,
    classes: Vec<ClassInfo>,
    subjects: Vec<Subject>,
    teachers: Vec<Teacher>,
    disabled: Vec<ConstraintKind>,
    engine: EngineConfig,
    base_seed: u64,
    attempts: u64,
    log_sink: Option<LogSink>,
    cancel: Option<CancelCheck>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("classes", &self.classes.len())
            .field("subjects", &self.subjects.len())
            .field("teachers", &self.teachers.len())
            .field("disabled", &self.disabled)
            .field("base_seed", &self.base_seed)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler with the default engine configuration.
    pub fn new(
        config: ScheduleConfig,
        classes: Vec<ClassInfo>,
        subjects: Vec<Subject>,
        teachers: Vec<Teacher>,
    ) -> Self {
        Self {
            config,
            classes,
            subjects,
            teachers,
            disabled: Vec::new(),
            engine: EngineConfig::default(),
            base_seed: clock_seed(),
            attempts: 0,
            log_sink: None,
            cancel: None,
        }
    }

    /// Sets the engine configuration (and its seed, if any).
    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        if let Some(seed) = engine.seed {
            self.base_seed = seed;
        }
        self.engine = engine;
        self
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    /// Sends progress messages to `sink`.
    pub fn with_log_sink(mut self, sink: impl FnMut(&LogEvent) + Send + 'static) -> Self {
        self.log_sink = Some(Box::new(sink));
        self
    }

    /// Stops between attempts once `check` returns `true`.
    pub fn with_cancel(mut self, check: impl Fn() -> bool + Send + 'static) -> Self {
        self.cancel = Some(Box::new(check));
        self
    }

    /// Stops between attempts once `flag` is set.
    pub fn with_cancel_flag(self, flag: Arc<AtomicBool>) -> Self {
        self.with_cancel(move || flag.load(Ordering::Relaxed))
    }

    /// Subjects in use (relaxed, if relaxation happened).
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Teachers in use (relaxed, if relaxation happened).
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    /// Rules disabled by relaxation.
    pub fn disabled_constraints(&self) -> &[ConstraintKind] {
        &self.disabled
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|check| check())
    }

    /// Single attempt.
    pub fn generate(&mut self) -> ScheduleResult {
        self.report_input_problems();
        self.log(LogSeverity::Info, "Generating timetable");
        let result = self.attempt();
        self.report_result(&result);
        result
    }

    /// Best of `max_retries` attempts.
    ///
    /// Keeps the lowest-scoring attempt without critical violations; if none
    /// succeeds, falls back to one more plain attempt.
    pub fn generate_with_retry(&mut self, max_retries: u32) -> ScheduleResult {
        self.report_input_problems();
        let mut best: Option<ScheduleResult> = None;

        for retry in 1..=max_retries {
            if self.is_cancelled() {
                self.log(LogSeverity::Warning, "Generation cancelled");
                break;
            }
            self.log(LogSeverity::Info, format!("Attempt {retry}/{max_retries}"));
            let result = self.attempt();
            if result.is_feasible() && best.as_ref().map_or(true, |b| result.score < b.score) {
                best = Some(result);
            }
        }

        let result = match best {
            Some(result) => result,
            None => {
                self.log(LogSeverity::Warning, "No attempt succeeded, trying once more");
                self.attempt()
            }
        };
        self.report_result(&result);
        result
    }

    /// Up to `min_count` distinct feasible timetables within `max_attempts`
    /// attempts, ranked by ascending score.
    ///
    /// After `failures_before_relaxation` failed attempts in a row, and while
    /// fewer than `max_relaxation_rounds` rounds were applied, the first
    /// actionable suggestion for the last failure is applied to the inputs of
    /// every later attempt.
    pub fn generate_multiple(
        &mut self,
        min_count: u32,
        max_attempts: u32,
    ) -> MultipleScheduleResult {
        self.report_input_problems();
        let mut out = MultipleScheduleResult {
            relaxation_applicable: true,
            ..MultipleScheduleResult::default()
        };
        let mut seen: HashSet<u64> = HashSet::new();
        let mut failures = 0;

        while (out.results.len() as u32) < min_count && out.generation_attempts < max_attempts {
            if self.is_cancelled() {
                self.log(LogSeverity::Warning, "Generation cancelled");
                break;
            }
            out.generation_attempts += 1;
            let result = self.attempt();

            if result.is_feasible() {
                failures = 0;
                if seen.insert(schedule_hash(&result.entries)) {
                    self.log(
                        LogSeverity::Success,
                        format!(
                            "Timetable {} found (score {:.1})",
                            out.results.len() + 1,
                            result.score
                        ),
                    );
                    out.results.push(result);
                } else {
                    self.log(LogSeverity::Info, "Duplicate timetable skipped");
                }
                continue;
            }

            failures += 1;
            if failures >= self.engine.failures_before_relaxation
                && out.relaxation_attempts < self.engine.max_relaxation_rounds
                && out.relaxation_applicable
            {
                failures = 0;
                match self.relax(&result.violations) {
                    Some(description) => {
                        out.relaxation_attempts += 1;
                        self.log(LogSeverity::Warning, format!("Relaxing: {description}"));
                        out.applied_relaxations.push(description);
                    }
                    None => {
                        out.relaxation_applicable = false;
                        self.log(LogSeverity::Warning, "No applicable relaxation left");
                    }
                }
            }
        }

        out.results.sort_by(|a, b| a.score.total_cmp(&b.score));
        info!(
            event = "generate_multiple_end",
            found = out.results.len(),
            attempts = out.generation_attempts,
            relaxations = out.relaxation_attempts,
        );
        if out.results.is_empty() {
            self.log(LogSeverity::Error, "No feasible timetable found");
        } else {
            self.log(
                LogSeverity::Success,
                format!(
                    "{} timetable(s) in {} attempts",
                    out.results.len(),
                    out.generation_attempts
                ),
            );
        }
        out
    }

    /// Checks a manual move inside a generated result.
    pub fn check_move(
        &self,
        result: &ScheduleResult,
        entry_id: &str,
        target: &TimeSlot,
    ) -> Result<Vec<ConstraintViolation>, MoveError> {
        ConstraintValidator::new(&self.config, &result.classes, &result.subjects, &result.teachers)
            .with_weights(self.engine.weights.clone())
            .with_disabled(self.disabled.iter().copied())
            .check_move(&result.entries, entry_id, target)
    }

    fn attempt(&mut self) -> ScheduleResult {
        let seed = self.base_seed.wrapping_add(self.attempts);
        self.attempts += 1;

        let (result, stats) = self.solve_once(seed);
        info!(
            event = "attempt_end",
            attempt = self.attempts,
            seed,
            nodes = stats.nodes,
            budget_exhausted = stats.budget_exhausted,
            entries = result.entries.len(),
            score = result.score,
        );
        result
    }

    fn solve_once(&self, seed: u64) -> (ScheduleResult, SolveStats) {
        let validator =
            ConstraintValidator::new(&self.config, &self.classes, &self.subjects, &self.teachers)
                .with_weights(self.engine.weights.clone())
                .with_disabled(self.disabled.iter().copied());
        let solver = CspSolver::new(&validator).with_max_nodes(self.engine.max_backtracks);
        let outcome = solver.solve(&mut ChaCha8Rng::seed_from_u64(seed));

        let mut result = ScheduleResult::empty(
            self.classes.clone(),
            self.subjects.clone(),
            self.teachers.clone(),
            self.config.days.clone(),
        );
        if outcome.is_solved() {
            let entries = LocalSearchOptimizer::new(&validator)
                .with_max_iterations(self.engine.optimizer_iterations)
                .optimize(outcome.entries);
            result.violations = validator.validate_all(&entries);
            result.score = validator.calculate_score(&entries);
            result.entries = entries;
        } else {
            // Diagnose what the deepest partial assignment could not satisfy.
            result.violations = validator.validate_all(&outcome.deepest);
        }
        (result, outcome.stats)
    }

    /// Applies the first actionable suggestion; returns its description.
    fn relax(&mut self, violations: &[ConstraintViolation]) -> Option<String> {
        let mut relaxer = ConstraintRelaxer::new(&self.subjects, &self.teachers)
            .with_policy(self.engine.relaxation)
            .with_disabled(self.disabled.iter().copied());
        let suggestion = relaxer
            .generate_suggestions(violations)
            .into_iter()
            .find(|s| s.is_actionable())?;
        let applied = relaxer.apply_relaxation(&suggestion)?;

        self.subjects = applied.subjects;
        self.teachers = applied.teachers;
        self.disabled = applied.disabled;
        Some(applied.description)
    }

    fn report_input_problems(&mut self) {
        let Err(problems) =
            validate_input(&self.config, &self.classes, &self.subjects, &self.teachers)
        else {
            return;
        };
        for problem in problems {
            self.log(LogSeverity::Warning, problem.message);
        }
    }

    fn report_result(&mut self, result: &ScheduleResult) {
        if result.is_feasible() {
            self.log(
                LogSeverity::Success,
                format!(
                    "Timetable generated: {} lessons, score {:.1}",
                    result.entries.len(),
                    result.score
                ),
            );
        } else {
            self.log(LogSeverity::Error, "Timetable generation failed");
        }
    }

    fn log(&mut self, severity: LogSeverity, message: impl Into<String>) {
        let event = LogEvent {
            message: message.into(),
            severity,
        };
        match severity {
            LogSeverity::Info | LogSeverity::Success => {
                info!(event = "log", message = %event.message)
            }
            LogSeverity::Warning => warn!(event = "log", message = %event.message),
            LogSeverity::Error => error!(event = "log", message = %event.message),
        }
        if let Some(sink) = self.log_sink.as_mut() {
            sink(&event);
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
