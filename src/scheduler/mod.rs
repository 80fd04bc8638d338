//! Timetable generation and KPI evaluation.
//!
//! Drives the solver, optimizer, and relaxer across attempts and summarizes
//! the resulting timetables.
//!
//! # Algorithm
//!
//! `Scheduler` runs independent seeded attempts (search, then local search,
//! then validation), keeps the feasible ones, deduplicates them by a
//! structural hash, and ranks them by score. When attempts keep failing it
//! weakens the input through the relaxer.
//!
//! # KPI
//!
//! `TimetableKpi` computes fill rate, teacher load, idle gaps, and days used.
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Pillay (2014), "A survey of school timetabling research"

mod engine;
mod hash;
mod kpi;

pub use engine::{CancelCheck, LogEvent, LogSeverity, LogSink, Scheduler};
pub use hash::{schedule_hash, structure_keys};
pub use kpi::TimetableKpi;
