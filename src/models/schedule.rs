//! Timetable (solution) model.
//!
//! A result is a full set of placed lessons together with the inputs it was
//! built from, the violations found in it, and its soft-constraint score.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

use super::{ClassInfo, ConstraintViolation, Subject, Teacher, TimetableEntry};

/// A generated timetable.
///
/// `score` is `+∞` when no timetable could be built. It serializes as
/// `null` in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    /// Placed lessons.
    pub entries: Vec<TimetableEntry>,
    /// Classes the timetable was built for.
    pub classes: Vec<ClassInfo>,
    /// Subjects as used for this timetable (possibly relaxed).
    pub subjects: Vec<Subject>,
    /// Teachers as used for this timetable (possibly relaxed).
    pub teachers: Vec<Teacher>,
    /// Violations found in `entries`.
    pub violations: Vec<ConstraintViolation>,
    /// Weighted soft-constraint score (lower is better).
    #[serde(serialize_with = "serialize_score", deserialize_with = "deserialize_score")]
    pub score: f64,
    /// Working days, in week order.
    pub days: Vec<String>,
}

/// A ranked set of distinct timetables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleScheduleResult {
    /// Results sorted by ascending score; index 0 is the best.
    pub results: Vec<ScheduleResult>,
    /// Number of solver attempts made.
    pub generation_attempts: u32,
    /// Number of relaxation rounds applied.
    pub relaxation_attempts: u32,
    /// Whether a relaxation could still be applied to the input.
    pub relaxation_applicable: bool,
    /// Descriptions of applied relaxations, in order.
    #[serde(default)]
    pub applied_relaxations: Vec<String>,
}

impl ScheduleResult {
    /// An empty (failed) result for the given inputs.
    pub fn empty(
        classes: Vec<ClassInfo>,
        subjects: Vec<Subject>,
        teachers: Vec<Teacher>,
        days: Vec<String>,
    ) -> Self {
        Self {
            entries: Vec::new(),
            classes,
            subjects,
            teachers,
            violations: Vec::new(),
            score: f64::INFINITY,
            days,
        }
    }

    /// Whether no lessons were placed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any critical violation is present.
    pub fn has_critical_violations(&self) -> bool {
        self.violations.iter().any(|v| v.is_critical())
    }

    /// Whether the result is a usable timetable.
    pub fn is_feasible(&self) -> bool {
        !self.is_empty() && !self.has_critical_violations()
    }

    /// Number of placed lessons.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Finds an entry by id.
    pub fn entry(&self, entry_id: &str) -> Option<&TimetableEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    /// Lessons of a class.
    pub fn entries_for_class(&self, class_id: &str) -> Vec<&TimetableEntry> {
        self.entries.iter().filter(|e| e.class_id == class_id).collect()
    }

    /// Lessons taught by a teacher.
    pub fn entries_for_teacher(&self, teacher_id: &str) -> Vec<&TimetableEntry> {
        self.entries
            .iter()
            .filter(|e| e.has_teacher(teacher_id))
            .collect()
    }

    /// Periods per teacher.
    pub fn teacher_hours(&self) -> HashMap<String, u32> {
        let mut hours: HashMap<String, u32> = HashMap::new();
        for e in &self.entries {
            for t in &e.teacher_ids {
                *hours.entry(t.clone()).or_insert(0) += 1;
            }
        }
        hours
    }

    /// Periods placed for a (class, subject) pair.
    pub fn hours_for(&self, class_id: &str, subject_id: &str) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.class_id == class_id && e.subject_id == subject_id)
            .count() as u32
    }
}

impl MultipleScheduleResult {
    /// The best result, if any.
    pub fn best(&self) -> Option<&ScheduleResult> {
        self.results.first()
    }
}

fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if score.is_finite() {
        serializer.serialize_some(score)
    } else {
        serializer.serialize_none()
    }
}

fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstraintKind, ScheduleConfig};

    fn sample_result() -> ScheduleResult {
        let config = ScheduleConfig::weekdays(2);
        let mut r = ScheduleResult::empty(
            vec![ClassInfo::new("c1", 1, 1)],
            vec![Subject::new("math", 2).with_grade(1)],
            vec![Teacher::new("T1", 10).with_subject("math")],
            config.days.clone(),
        );
        r.entries = vec![
            TimetableEntry::new("e1", "c1", "math", vec!["T1".into()], "Mon", 1),
            TimetableEntry::new("e2", "c1", "math", vec!["T1".into()], "Tue", 1),
        ];
        r.score = 12.5;
        r
    }

    #[test]
    fn test_empty_result() {
        let r = ScheduleResult::empty(vec![], vec![], vec![], vec![]);
        assert!(r.is_empty());
        assert!(r.score.is_infinite());
        assert!(!r.is_feasible());
    }

    #[test]
    fn test_queries() {
        let r = sample_result();
        assert_eq!(r.entry_count(), 2);
        assert_eq!(r.entries_for_class("c1").len(), 2);
        assert_eq!(r.entries_for_teacher("T1").len(), 2);
        assert_eq!(r.teacher_hours()["T1"], 2);
        assert_eq!(r.hours_for("c1", "math"), 2);
        assert!(r.entry("e2").is_some());
        assert!(r.is_feasible());
    }

    #[test]
    fn test_critical_flag() {
        let mut r = sample_result();
        r.violations
            .push(ConstraintViolation::new(ConstraintKind::ClassConflict, "clash"));
        assert!(r.has_critical_violations());
        assert!(!r.is_feasible());
    }

    #[test]
    fn test_infinite_score_serializes_as_null() {
        let r = ScheduleResult::empty(vec![], vec![], vec![], vec!["Mon".into()]);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json["score"].is_null());

        let back: ScheduleResult = serde_json::from_value(json).unwrap();
        assert!(back.score.is_infinite());
    }

    #[test]
    fn test_finite_score_serializes() {
        let json = serde_json::to_value(sample_result()).unwrap();
        assert_eq!(json["score"], 12.5);
    }
}
