//! Message boundary to the host.
//!
//! The host sends one [`EngineRequest`] and receives a stream of
//! [`EngineEvent`]s: progress logs followed by exactly one final result.
//! [`EngineHandle::spawn`] runs the request on a dedicated thread; the host
//! reads events from a channel and may raise the cancellation flag, which is
//! honored between attempts.
//!
//! # Wire format
//!
//! ```json
//! { "kind": "log", "message": "Attempt 1/5", "severity": "info" }
//! { "kind": "multi-result", "value": { "results": [ ... ], ... } }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, EngineConfig};
use crate::models::{
    ClassInfo, MultipleScheduleResult, ScheduleConfig, ScheduleResult, Subject, Teacher,
};
use crate::scheduler::{LogEvent, LogSeverity, Scheduler};

/// Errors at the message boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to decode request: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("engine channel closed before a result was sent")]
    ChannelClosed,

    #[error("engine thread panicked")]
    WorkerPanicked,
}

/// Which generation entry point to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// One attempt; answers with `result`.
    Single,
    /// Best of `retry_count` attempts; answers with `result`.
    Retry,
    /// Several distinct timetables; answers with `multi-result`.
    #[default]
    Multiple,
}

/// Input snapshot sent by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRequest {
    pub config: ScheduleConfig,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub classes: Vec<ClassInfo>,
    /// Overrides `EngineConfig::min_count`.
    #[serde(default)]
    pub min_count: Option<u32>,
    /// Overrides `EngineConfig::max_attempts`.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub mode: RunMode,
    /// Engine tuning; defaults apply when absent. Its keys are the snake_case
    /// names used in the TOML file (`max_backtracks`, `weights.room_change`).
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Message sent to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EngineEvent {
    Log { message: String, severity: LogSeverity },
    Result { value: Box<ScheduleResult> },
    MultiResult { value: Box<MultipleScheduleResult> },
}

impl EngineEvent {
    /// Whether this is the closing event of a run.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Log { .. })
    }

    /// JSON encoding of the event.
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(EngineError::Encode)
    }
}

impl From<&LogEvent> for EngineEvent {
    fn from(event: &LogEvent) -> Self {
        Self::Log {
            message: event.message.clone(),
            severity: event.severity,
        }
    }
}

/// Runs a request to completion on the current thread.
///
/// Log events go to `events`; the final event is returned.
///
/// # Errors
///
/// Returns [`EngineError::Config`] if the request's engine configuration
/// fails [`EngineConfig::validate`].
pub fn run_request(
    request: EngineRequest,
    events: Sender<EngineEvent>,
    cancel: Arc<AtomicBool>,
) -> Result<EngineEvent, EngineError> {
    request.engine.validate()?;
    Ok(execute(request, events, cancel))
}

fn execute(
    request: EngineRequest,
    events: Sender<EngineEvent>,
    cancel: Arc<AtomicBool>,
) -> EngineEvent {
    let EngineRequest {
        config,
        subjects,
        teachers,
        classes,
        min_count,
        max_attempts,
        mode,
        engine,
    } = request;
    let min_count = min_count.unwrap_or(engine.min_count);
    let max_attempts = max_attempts.unwrap_or(engine.max_attempts);
    let retry_count = engine.retry_count;

    info!(
        event = "request_start",
        classes = classes.len(),
        subjects = subjects.len(),
        teachers = teachers.len(),
        ?mode,
    );

    let mut scheduler = Scheduler::new(config, classes, subjects, teachers)
        .with_engine_config(engine)
        .with_cancel_flag(cancel)
        .with_log_sink(move |event| {
            // A closed channel means the host stopped listening.
            let _ = events.send(EngineEvent::from(event));
        });

    match mode {
        RunMode::Single => EngineEvent::Result {
            value: Box::new(scheduler.generate()),
        },
        RunMode::Retry => EngineEvent::Result {
            value: Box::new(scheduler.generate_with_retry(retry_count)),
        },
        RunMode::Multiple => EngineEvent::MultiResult {
            value: Box::new(scheduler.generate_multiple(min_count, max_attempts)),
        },
    }
}

/// Decodes a JSON request, runs it, and returns every event as a JSON line.
pub fn run_json(input: &str) -> Result<Vec<String>, EngineError> {
    let request: EngineRequest = serde_json::from_str(input).map_err(EngineError::Decode)?;
    let (tx, rx) = mpsc::channel();
    let last = run_request(request, tx, Arc::new(AtomicBool::new(false)))?;

    rx.into_iter()
        .chain(std::iter::once(last))
        .map(|event| event.to_json())
        .collect()
}

/// A request running on its own thread.
#[derive(Debug)]
pub struct EngineHandle {
    events: Receiver<EngineEvent>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Starts `request` on a new thread.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] without starting a thread if the
    /// engine configuration is invalid.
    pub fn spawn(request: EngineRequest) -> Result<Self, EngineError> {
        request.engine.validate()?;
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let thread = thread::spawn(move || {
            let last = execute(request, tx.clone(), flag);
            let _ = tx.send(last);
        });

        Ok(Self {
            events: rx,
            cancel,
            thread: Some(thread),
        })
    }

    /// Asks the run to stop after the current attempt.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Next event, if one is ready.
    pub fn try_next(&self) -> Result<Option<EngineEvent>, EngineError> {
        match self.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(EngineError::ChannelClosed),
        }
    }

    /// Blocks for the next event.
    pub fn recv(&self) -> Result<EngineEvent, EngineError> {
        self.events.recv().map_err(|_| EngineError::ChannelClosed)
    }

    /// Blocks until the final event, passing log events to `on_log`.
    pub fn wait(
        mut self,
        mut on_log: impl FnMut(&EngineEvent),
    ) -> Result<EngineEvent, EngineError> {
        let result = loop {
            match self.events.recv() {
                Ok(event) if event.is_final() => break Ok(event),
                Ok(event) => on_log(&event),
                Err(_) => break Err(EngineError::ChannelClosed),
            }
        };

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                return Err(EngineError::WorkerPanicked);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: RunMode) -> EngineRequest {
        EngineRequest {
            config: ScheduleConfig::weekdays(2),
            subjects: vec![Subject::new("math", 4).with_grade(1)],
            teachers: vec![Teacher::new("T1", 20).with_subject("math")],
            classes: vec![ClassInfo::new("c1", 1, 1)],
            min_count: Some(2),
            max_attempts: Some(10),
            mode,
            engine: EngineConfig::default().with_seed(3),
        }
    }

    #[test]
    fn test_run_request_single() {
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let last = run_request(request(RunMode::Single), tx, cancel).unwrap();

        match last {
            EngineEvent::Result { value } => assert_eq!(value.entries.len(), 4),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_iter().all(|e| !e.is_final()));
    }

    #[test]
    fn test_run_json_lines() {
        let input = serde_json::to_string(&request(RunMode::Multiple)).unwrap();
        let lines = run_json(&input).unwrap();

        let last: serde_json::Value = serde_json::from_str(lines.last().unwrap()).unwrap();
        assert_eq!(last["kind"], "multi-result");
        assert_eq!(last["value"]["results"].as_array().map(Vec::len), Some(2));

        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["kind"], "log");
        assert!(first["severity"].is_string());
    }

    #[test]
    fn test_minimal_request_uses_defaults() {
        let input = r#"{
            "config": { "days": ["Mon", "Tue"], "maxPeriodsPerDay": 2 },
            "subjects": [{ "id": "math", "weeklyHours": 2, "targetGrades": [1] }],
            "teachers": [{ "id": "T1", "maxWeeklyHours": 10, "subjectIds": ["math"] }],
            "classes": [{ "id": "c1", "grade": 1, "classNumber": 1 }],
            "mode": "single"
        }"#;
        let lines = run_json(input).unwrap();
        let last: serde_json::Value = serde_json::from_str(lines.last().unwrap()).unwrap();
        assert_eq!(last["kind"], "result");
        assert_eq!(last["value"]["entries"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_decode_error() {
        let err = run_json("{ not json").unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn test_handle_streams_and_finishes() {
        let handle = EngineHandle::spawn(request(RunMode::Multiple)).unwrap();
        let mut logs = 0;
        let last = handle.wait(|_| logs += 1).unwrap();

        assert!(logs > 0);
        match last {
            EngineEvent::MultiResult { value } => assert_eq!(value.results.len(), 2),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_handle_cancelled_before_start() {
        let mut req = request(RunMode::Multiple);
        req.min_count = Some(1_000);
        req.max_attempts = Some(1_000);
        let handle = EngineHandle::spawn(req).unwrap();
        handle.cancel();
        assert!(handle.is_cancelled());

        match handle.wait(|_| {}).unwrap() {
            EngineEvent::MultiResult { value } => assert!(value.generation_attempts < 1_000),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_engine_config_rejected() {
        let input = r#"{
            "config": { "days": ["Mon"], "maxPeriodsPerDay": 2 },
            "subjects": [],
            "teachers": [],
            "classes": [],
            "engine": { "max_backtracks": 500, "weights": { "room_change": -1.0 } }
        }"#;
        let err = run_json(input).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::Invalid(_))));
        assert!(err.to_string().contains("room change"));

        let mut req = request(RunMode::Single);
        req.engine.max_attempts = 0;
        assert!(matches!(EngineHandle::spawn(req.clone()), Err(EngineError::Config(_))));

        let (tx, rx) = mpsc::channel();
        assert!(run_request(req, tx, Arc::new(AtomicBool::new(false))).is_err());
        assert!(rx.try_iter().next().is_none());
    }

    #[test]
    fn test_log_event_wire_format() {
        let event = EngineEvent::Log {
            message: "hello".into(),
            severity: LogSeverity::Warning,
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "log");
        assert_eq!(json["severity"], "warning");
        assert!(!event.is_final());
    }
}
