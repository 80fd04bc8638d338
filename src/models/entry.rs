//! Timetable entry model.
//!
//! An entry is one lesson placed at one `(day, period)` cell. A block lesson
//! of `n` periods produces `n` entries sharing `block_start_period`.

use serde::{Deserialize, Serialize};

use super::TimeSlot;

/// A single placed lesson.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    /// Entry identifier, stable across manual moves.
    pub id: String,
    /// Class receiving the lesson.
    pub class_id: String,
    /// Subject taught.
    pub subject_id: String,
    /// Teachers present (more than one for co-teaching).
    pub teacher_ids: Vec<String>,
    /// Day label.
    pub day: String,
    /// Period (1-based).
    pub period: u32,
    /// Special room used, if any.
    #[serde(default)]
    pub room: Option<String>,
    /// Whether the entry belongs to a block lesson.
    #[serde(default)]
    pub is_block: bool,
    /// First period of the block this entry belongs to.
    #[serde(default)]
    pub block_start_period: Option<u32>,
    /// Whether the entry was placed on a subject's fixed slot.
    #[serde(default)]
    pub is_fixed: bool,
}

impl TimetableEntry {
    /// Creates an ordinary entry.
    pub fn new(
        id: impl Into<String>,
        class_id: impl Into<String>,
        subject_id: impl Into<String>,
        teacher_ids: Vec<String>,
        day: impl Into<String>,
        period: u32,
    ) -> Self {
        Self {
            id: id.into(),
            class_id: class_id.into(),
            subject_id: subject_id.into(),
            teacher_ids,
            day: day.into(),
            period,
            room: None,
            is_block: false,
            block_start_period: None,
            is_fixed: false,
        }
    }

    /// Sets the room.
    pub fn with_room(mut self, room: Option<String>) -> Self {
        self.room = room;
        self
    }

    /// Marks the entry as part of a block starting at `start_period`.
    pub fn with_block_start(mut self, start_period: u32) -> Self {
        self.is_block = true;
        self.block_start_period = Some(start_period);
        self
    }

    /// Marks the entry as placed on a fixed slot.
    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.is_fixed = fixed;
        self
    }

    /// The entry's cell.
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.day.clone(), self.period)
    }

    /// Whether the entry sits at the given cell.
    #[inline]
    pub fn is_at(&self, day: &str, period: u32) -> bool {
        self.period == period && self.day == day
    }

    /// Whether a teacher is part of this lesson.
    #[inline]
    pub fn has_teacher(&self, teacher_id: &str) -> bool {
        self.teacher_ids.iter().any(|t| t == teacher_id)
    }

    /// A copy of this entry moved to another cell (same id).
    pub fn moved_to(&self, day: impl Into<String>, period: u32) -> Self {
        Self {
            day: day.into(),
            period,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let e = TimetableEntry::new("e1", "c1", "sci", vec!["T1".into()], "Mon", 2)
            .with_room(Some("lab".into()))
            .with_block_start(2);

        assert!(e.is_block);
        assert_eq!(e.block_start_period, Some(2));
        assert!(e.is_at("Mon", 2));
        assert!(e.has_teacher("T1"));
        assert_eq!(e.slot(), TimeSlot::new("Mon", 2));
    }

    #[test]
    fn test_moved_to_keeps_id() {
        let e = TimetableEntry::new("e1", "c1", "math", vec!["T1".into()], "Mon", 1);
        let m = e.moved_to("Wed", 4);
        assert_eq!(m.id, "e1");
        assert!(m.is_at("Wed", 4));
        assert!(e.is_at("Mon", 1));
    }
}
