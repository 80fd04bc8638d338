//! School timetabling engine.
//!
//! Assigns weekly class periods to classes, subjects, and teachers so that
//! the hard rules always hold (no double-booked teacher, class, or special
//! room; no lesson in a teacher's blocked slot; contiguous block lessons) and
//! the soft preferences are approximately optimized.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Subject`, `Teacher`, `ClassInfo`,
//!   `ScheduleConfig`, `TimetableEntry`, `ConstraintViolation`, `ScheduleResult`
//! - **`csp`**: Variable/domain construction and backtracking search
//! - **`validator`**: Hard and soft rule checks, scoring, manual-move checks
//! - **`optimizer`**: Pairwise-swap local search
//! - **`relaxation`**: Rule relaxation for infeasible inputs
//! - **`scheduler`**: Single, best-of-N, and multi-result generation; KPIs
//! - **`validation`**: Input integrity checks (duplicate IDs, unknown references)
//! - **`config`**: Engine tuning loaded from TOML
//! - **`worker`**: Request/event message boundary and background runner
//!
//! # Example
//!
//! ```
//! use u_timetable::models::{ClassInfo, ScheduleConfig, Subject, Teacher};
//! use u_timetable::scheduler::Scheduler;
//!
//! let mut scheduler = Scheduler::new(
//!     ScheduleConfig::weekdays(4),
//!     vec![ClassInfo::new("1-1", 1, 1), ClassInfo::new("1-2", 1, 2)],
//!     vec![
//!         Subject::new("math", 4).with_grade(1),
//!         Subject::new("science", 4).with_grade(1).with_special_room("lab").with_block(2),
//!     ],
//!     vec![
//!         Teacher::new("kim", 12).with_subject("math"),
//!         Teacher::new("lee", 12).with_subject("science"),
//!     ],
//! )
//! .with_seed(2024);
//!
//! let ranked = scheduler.generate_multiple(2, 20);
//! let best = ranked.best().expect("a feasible timetable");
//! assert!(!best.has_critical_violations());
//! assert_eq!(best.entries.len(), 16);
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", Ch. 6
//! - Pillay (2014), "A survey of school timetabling research"

pub mod config;
pub mod csp;
pub mod models;
pub mod optimizer;
pub mod relaxation;
pub mod scheduler;
pub mod validation;
pub mod validator;
pub mod worker;
