//! Constraint validation and scoring.
//!
//! Classifies placed lessons against the hard rules (critical) and the
//! weighted soft rules (high, medium, low), and reduces the soft rules to
//! a single fitness score.
//!
//! # Rules
//!
//! | Severity | Rules |
//! |----------|-------|
//! | Critical | double-booking, teacher unavailable, block contiguity, outside class grid |
//! | High | weekly hours unmet, teacher overload, priority teacher preference |
//! | Medium | ≥3 consecutive periods, back-to-back up to lunch |
//! | Low | preferred day mismatch, external instructor spread, room change |
//!
//! [`ConstraintValidator::has_critical_violations`] is the cheap path used on
//! every partial assignment during search; [`ConstraintValidator::validate_all`]
//! and [`ConstraintValidator::calculate_score`] run once per candidate.

mod hard;
mod soft;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::config::ScoreWeights;
use crate::models::{
    ClassInfo, ConstraintKind, ConstraintViolation, ScheduleConfig, Subject, Teacher,
    TimeSlot, TimetableEntry,
};

/// Why a manual move could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("unknown entry: {0}")]
    UnknownEntry(String),

    #[error("slot {day} period {period} is outside the weekly grid")]
    OutsideGrid { day: String, period: u32 },
}

/// Validates timetables for one set of inputs.
#[derive(Debug, Clone)]
pub struct ConstraintValidator<'a> {
    config: &'a ScheduleConfig,
    classes: HashMap<&'a str, &'a ClassInfo>,
    subjects: HashMap<&'a str, &'a Subject>,
    teachers: HashMap<&'a str, &'a Teacher>,
    class_list: &'a [ClassInfo],
    subject_list: &'a [Subject],
    teacher_list: &'a [Teacher],
    weights: ScoreWeights,
    disabled: HashSet<ConstraintKind>,
}

impl<'a> ConstraintValidator<'a> {
    /// Creates a validator with default weights and every rule enabled.
    pub fn new(
        config: &'a ScheduleConfig,
        classes: &'a [ClassInfo],
        subjects: &'a [Subject],
        teachers: &'a [Teacher],
    ) -> Self {
        Self {
            config,
            classes: classes.iter().map(|c| (c.id.as_str(), c)).collect(),
            subjects: subjects.iter().map(|s| (s.id.as_str(), s)).collect(),
            teachers: teachers.iter().map(|t| (t.id.as_str(), t)).collect(),
            class_list: classes,
            subject_list: subjects,
            teacher_list: teachers,
            weights: ScoreWeights::default(),
            disabled: HashSet::new(),
        }
    }

    /// Sets the soft-constraint weights.
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Disables rules (typically as a result of relaxation).
    pub fn with_disabled(mut self, kinds: impl IntoIterator<Item = ConstraintKind>) -> Self {
        self.disabled.extend(kinds);
        self
    }

    /// Whether a rule is checked.
    #[inline]
    pub fn is_enabled(&self, kind: ConstraintKind) -> bool {
        !self.disabled.contains(&kind)
    }

    /// Weekly grid in use.
    pub fn config(&self) -> &ScheduleConfig {
        self.config
    }

    /// Looks up a class.
    pub fn class(&self, class_id: &str) -> Option<&'a ClassInfo> {
        self.classes.get(class_id).copied()
    }

    /// Looks up a subject.
    pub fn subject(&self, subject_id: &str) -> Option<&'a Subject> {
        self.subjects.get(subject_id).copied()
    }

    /// Looks up a teacher.
    pub fn teacher(&self, teacher_id: &str) -> Option<&'a Teacher> {
        self.teachers.get(teacher_id).copied()
    }

    /// Last period of a class on a day (0 if the class has no lessons that day).
    pub fn periods_for_class(&self, class_id: &str, day: &str) -> u32 {
        match self.class(class_id) {
            Some(c) => self.config.periods_for(c.grade, day),
            None => self.config.periods_on(day),
        }
    }

    /// Whether `(day, period)` is a cell of the class's weekly grid.
    pub fn in_class_grid(&self, class_id: &str, day: &str, period: u32) -> bool {
        period >= 1 && period <= self.periods_for_class(class_id, day)
    }

    /// Lunch marker for a class.
    pub fn lunch_for_class(&self, class_id: &str) -> Option<u32> {
        self.class(class_id)
            .and_then(|c| c.lunch_period)
            .or(self.config.lunch_after_period)
    }

    /// Fast hard-rule check.
    pub fn has_critical_violations(&self, entries: &[TimetableEntry]) -> bool {
        hard::has_critical(self, entries)
    }

    /// Every critical violation.
    pub fn critical_violations(&self, entries: &[TimetableEntry]) -> Vec<ConstraintViolation> {
        hard::collect(self, entries)
    }

    /// Full classification, ordered critical → high → medium → low.
    pub fn validate_all(&self, entries: &[TimetableEntry]) -> Vec<ConstraintViolation> {
        let mut violations = hard::collect(self, entries);
        violations.extend(soft::collect(self, entries));
        violations.sort_by(|a, b| b.severity.cmp(&a.severity));
        violations
    }

    /// Weighted penalty (lower is better).
    pub fn calculate_score(&self, entries: &[TimetableEntry]) -> f64 {
        let critical = hard::collect(self, entries).len() as f64 * self.weights.critical;
        critical + self.score_violations(&soft::collect(self, entries))
    }

    /// Weighted penalty of already-classified violations.
    pub fn score_violations(&self, violations: &[ConstraintViolation]) -> f64 {
        violations
            .iter()
            .filter(|v| self.is_enabled(v.kind))
            .map(|v| self.weights.weight(v.kind) * penalty_units(v))
            .sum()
    }

    /// Checks a manual move of one entry to `target`.
    ///
    /// Returns the critical violations present after the move that were not
    /// present before. The timetable is not re-optimized.
    pub fn check_move(
        &self,
        entries: &[TimetableEntry],
        entry_id: &str,
        target: &TimeSlot,
    ) -> Result<Vec<ConstraintViolation>, MoveError> {
        let index = entries
            .iter()
            .position(|e| e.id == entry_id)
            .ok_or_else(|| MoveError::UnknownEntry(entry_id.to_string()))?;

        if !self.in_class_grid(&entries[index].class_id, &target.day, target.period) {
            return Err(MoveError::OutsideGrid {
                day: target.day.clone(),
                period: target.period,
            });
        }

        let before = hard::collect(self, entries);
        let mut moved = entries.to_vec();
        moved[index] = entries[index].moved_to(target.day.clone(), target.period);
        let after = hard::collect(self, &moved);

        Ok(after.into_iter().filter(|v| !before.contains(v)).collect())
    }

    pub(crate) fn classes(&self) -> &'a [ClassInfo] {
        self.class_list
    }

    pub(crate) fn subjects(&self) -> &'a [Subject] {
        self.subject_list
    }

    pub(crate) fn teachers(&self) -> &'a [Teacher] {
        self.teacher_list
    }
}

/// Multiplier applied to a rule's weight.
fn penalty_units(v: &ConstraintViolation) -> f64 {
    let amount = v.details.amount.unwrap_or(1) as f64;
    match v.kind {
        ConstraintKind::HoursUnmet
        | ConstraintKind::TeacherOverload
        | ConstraintKind::ExternalSpread => amount,
        ConstraintKind::ConsecutivePeriods => (amount - 2.0).max(1.0),
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        id: &str,
        class: &str,
        subject: &str,
        teacher: &str,
        day: &str,
        period: u32,
    ) -> TimetableEntry {
        TimetableEntry::new(id, class, subject, vec![teacher.to_string()], day, period)
    }

    fn fixture() -> (ScheduleConfig, Vec<ClassInfo>, Vec<Subject>, Vec<Teacher>) {
        let config = ScheduleConfig::weekdays(6).with_lunch_after(4);
        let classes = vec![ClassInfo::new("c1", 1, 1), ClassInfo::new("c2", 1, 2)];
        let subjects = vec![
            Subject::new("math", 2).with_grade(1),
            Subject::new("sci", 2).with_grade(1).with_special_room("lab"),
        ];
        let teachers = vec![
            Teacher::new("T1", 10).with_subject("math"),
            Teacher::new("T2", 10)
                .with_subject("sci")
                .with_unavailable(TimeSlot::new("Fri", 1)),
        ];
        (config, classes, subjects, teachers)
    }

    #[test]
    fn test_clean_timetable() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let entries = vec![
            entry("e1", "c1", "math", "T1", "Mon", 1),
            entry("e2", "c1", "math", "T1", "Tue", 1),
            entry("e3", "c2", "math", "T1", "Mon", 2),
            entry("e4", "c2", "math", "T1", "Tue", 2),
        ];
        assert!(!v.has_critical_violations(&entries));
        let all = v.validate_all(&entries);
        // Science is missing for both classes.
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|x| x.kind == ConstraintKind::HoursUnmet));
        assert_eq!(v.calculate_score(&entries), 400.0);
    }

    #[test]
    fn test_ordering_critical_first() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let entries = vec![
            entry("e1", "c1", "math", "T1", "Mon", 1),
            entry("e2", "c2", "math", "T1", "Mon", 1),
        ];
        let all = v.validate_all(&entries);
        assert!(all[0].is_critical());
        assert!(all.windows(2).all(|w| w[0].severity >= w[1].severity));
    }

    #[test]
    fn test_disabled_rule_not_scored() {
        let (config, classes, subjects, teachers) = fixture();
        let entries = vec![entry("e1", "c1", "math", "T1", "Mon", 1)];
        let full = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let relaxed = ConstraintValidator::new(&config, &classes, &subjects, &teachers)
            .with_disabled([ConstraintKind::HoursUnmet]);
        assert!(full.calculate_score(&entries) > 0.0);
        assert_eq!(relaxed.calculate_score(&entries), 0.0);
    }

    #[test]
    fn test_check_move() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let entries = vec![
            entry("e1", "c1", "math", "T1", "Mon", 1),
            entry("e2", "c2", "math", "T1", "Tue", 3),
        ];

        let ok = v.check_move(&entries, "e2", &TimeSlot::new("Wed", 3)).unwrap();
        assert!(ok.is_empty());

        let clash = v.check_move(&entries, "e2", &TimeSlot::new("Mon", 1)).unwrap();
        assert_eq!(clash.len(), 1);
        assert_eq!(clash[0].kind, ConstraintKind::TeacherConflict);

        assert_eq!(
            v.check_move(&entries, "nope", &TimeSlot::new("Mon", 1)),
            Err(MoveError::UnknownEntry("nope".into()))
        );
        assert!(matches!(
            v.check_move(&entries, "e1", &TimeSlot::new("Mon", 9)),
            Err(MoveError::OutsideGrid { .. })
        ));
    }

    #[test]
    fn test_lunch_lookup() {
        let (config, mut classes, subjects, teachers) = fixture();
        classes[1].lunch_period = Some(3);
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        assert_eq!(v.lunch_for_class("c1"), Some(4));
        assert_eq!(v.lunch_for_class("c2"), Some(3));
    }
}
