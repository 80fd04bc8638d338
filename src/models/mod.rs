//! Timetabling domain models.
//!
//! Provides the shared vocabulary of the engine: the inputs (classes,
//! subjects, teachers, weekly grid) and the outputs (entries, violations,
//! results). These types carry no scheduling behavior.
//!
//! # Domain Mappings
//!
//! | u-timetable | Job-shop analogue |
//! |-------------|-------------------|
//! | Subject × Class | Task |
//! | TimetableEntry | Assignment |
//! | Teacher / special room | Resource |
//! | ScheduleConfig | Calendar |

mod class_info;
mod config;
mod entry;
mod schedule;
mod subject;
mod teacher;
mod violation;

pub use class_info::ClassInfo;
pub use config::{GradeSettings, ScheduleConfig, TimeSlot};
pub use entry::TimetableEntry;
pub use schedule::{MultipleScheduleResult, ScheduleResult};
pub use subject::Subject;
pub use teacher::Teacher;
pub use violation::{ConstraintKind, ConstraintViolation, Severity, ViolationDetails};
