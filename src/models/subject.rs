//! Subject model.
//!
//! A subject is a unit of teaching demand: a number of weekly periods a
//! class must receive, plus the placement rules that shape them (block
//! lessons, co-teaching, special rooms, fixed slots).

use serde::{Deserialize, Serialize};

use super::TimeSlot;

/// A subject to be timetabled.
///
/// # Block lessons
/// When `is_block_class` is set, `block_hours` must be in `[2, 4]` and not
/// exceed `weekly_hours`. Checking this is the caller's job; see
/// [`crate::validation::validate_input`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Unique subject identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Periods per week each targeted class must receive.
    pub weekly_hours: u32,
    /// Special room type (e.g. "lab", "gym"). `None` = ordinary classroom.
    #[serde(default)]
    pub special_room: Option<String>,
    /// Whether lessons are taught as contiguous blocks.
    #[serde(default)]
    pub is_block_class: bool,
    /// Contiguous periods per block.
    #[serde(default)]
    pub block_hours: u32,
    /// Whether two or more teachers teach every lesson together.
    #[serde(default)]
    pub is_co_teaching: bool,
    /// Teachers that co-teach this subject.
    #[serde(default)]
    pub co_teaching_teachers: Vec<String>,
    /// Whether the subject is taught by an external instructor.
    #[serde(default)]
    pub is_external_instructor: bool,
    /// External instructors prefer all lessons on one day.
    #[serde(default)]
    pub prefer_concentrated_day: bool,
    /// Grades this subject is taught to.
    #[serde(default)]
    pub target_grades: Vec<u32>,
    /// Fixed slots, consumed positionally by the generated lessons.
    #[serde(default)]
    pub fixed_times: Vec<TimeSlot>,
    /// Secondary ordering key (lower = scheduled earlier).
    #[serde(default)]
    pub priority: i32,
}

impl Subject {
    /// Creates a subject with the given weekly hours.
    pub fn new(id: impl Into<String>, weekly_hours: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            weekly_hours,
            special_room: None,
            is_block_class: false,
            block_hours: 0,
            is_co_teaching: false,
            co_teaching_teachers: Vec::new(),
            is_external_instructor: false,
            prefer_concentrated_day: false,
            target_grades: Vec::new(),
            fixed_times: Vec::new(),
            priority: 0,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Requires a special room.
    pub fn with_special_room(mut self, room: impl Into<String>) -> Self {
        self.special_room = Some(room.into());
        self
    }

    /// Teaches the subject in contiguous blocks of `block_hours`.
    pub fn with_block(mut self, block_hours: u32) -> Self {
        self.is_block_class = true;
        self.block_hours = block_hours;
        self
    }

    /// Marks the subject as co-taught by the given teachers.
    pub fn with_co_teachers(mut self, teacher_ids: Vec<String>) -> Self {
        self.is_co_teaching = true;
        self.co_teaching_teachers = teacher_ids;
        self
    }

    /// Marks the subject as taught by an external instructor.
    pub fn with_external_instructor(mut self, prefer_concentrated_day: bool) -> Self {
        self.is_external_instructor = true;
        self.prefer_concentrated_day = prefer_concentrated_day;
        self
    }

    /// Adds a target grade.
    pub fn with_grade(mut self, grade: u32) -> Self {
        self.target_grades.push(grade);
        self
    }

    /// Sets the target grades.
    pub fn with_grades(mut self, grades: Vec<u32>) -> Self {
        self.target_grades = grades;
        self
    }

    /// Adds a fixed slot.
    pub fn with_fixed_time(mut self, slot: TimeSlot) -> Self {
        self.fixed_times.push(slot);
        self
    }

    /// Sets the ordering priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Whether this subject is taught to the given grade.
    #[inline]
    pub fn targets_grade(&self, grade: u32) -> bool {
        self.target_grades.contains(&grade)
    }

    /// Effective block length (1 for ordinary subjects).
    #[inline]
    pub fn effective_block_hours(&self) -> u32 {
        if self.is_block_class && self.block_hours > 1 {
            self.block_hours
        } else {
            1
        }
    }
}
