//! Teacher model.
//!
//! Teachers are the people that perform lessons. Each has a set of
//! subjects they can teach, a weekly load cap, and blocked slots.

use serde::{Deserialize, Serialize};

use super::TimeSlot;

/// A teacher that can be assigned to lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Subjects this teacher is qualified for.
    #[serde(default)]
    pub subject_ids: Vec<String>,
    /// Maximum periods per week.
    pub max_weekly_hours: u32,
    /// Slots the teacher cannot teach.
    #[serde(default)]
    pub unavailable_times: Vec<TimeSlot>,
    /// Priority teachers have their day preferences enforced more strongly.
    #[serde(default)]
    pub is_priority: bool,
    /// Teacher from outside the school.
    #[serde(default)]
    pub is_external: bool,
    /// Days the teacher prefers to work. Empty = no preference.
    #[serde(default)]
    pub preferred_days: Vec<String>,
}

impl Teacher {
    /// Creates a teacher with the given weekly cap.
    pub fn new(id: impl Into<String>, max_weekly_hours: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            subject_ids: Vec::new(),
            max_weekly_hours,
            unavailable_times: Vec::new(),
            is_priority: false,
            is_external: false,
            preferred_days: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a subject the teacher can teach.
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_ids.push(subject_id.into());
        self
    }

    /// Adds an unavailable slot.
    pub fn with_unavailable(mut self, slot: TimeSlot) -> Self {
        self.unavailable_times.push(slot);
        self
    }

    /// Marks the teacher as a priority teacher.
    pub fn with_priority(mut self) -> Self {
        self.is_priority = true;
        self
    }

    /// Marks the teacher as external.
    pub fn with_external(mut self) -> Self {
        self.is_external = true;
        self
    }

    /// Adds a preferred working day.
    pub fn with_preferred_day(mut self, day: impl Into<String>) -> Self {
        self.preferred_days.push(day.into());
        self
    }

    /// Whether the teacher is qualified for a subject.
    #[inline]
    pub fn teaches(&self, subject_id: &str) -> bool {
        self.subject_ids.iter().any(|s| s == subject_id)
    }

    /// Whether the teacher can teach at the given slot.
    pub fn is_available_at(&self, day: &str, period: u32) -> bool {
        !self
            .unavailable_times
            .iter()
            .any(|t| t.period == period && t.day == day)
    }

    /// Whether the given day is acceptable under the teacher's preferences.
    pub fn prefers_day(&self, day: &str) -> bool {
        self.preferred_days.is_empty() || self.preferred_days.iter().any(|d| d == day)
    }
}
