//! Input validation for timetabling problems.
//!
//! Checks the structural quality of the input before scheduling. Detects:
//! - Duplicate IDs
//! - References to unknown teachers, subjects, or days
//! - Block sizes outside `2..=4` or above the weekly hours
//! - Co-teaching subjects with fewer than two teachers
//! - Subjects no teacher can teach
//! - Classes whose weekly demand exceeds their grid
//!
//! These are warnings for the caller: the engine still runs and reports
//! what it could not place.

use std::collections::HashSet;

use crate::models::{ClassInfo, ScheduleConfig, Subject, Teacher, TimeSlot};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// The weekly grid has no days or no periods.
    EmptyGrid,
    /// A reference to a teacher that doesn't exist.
    UnknownTeacher,
    /// A teacher lists a subject that doesn't exist.
    UnknownSubject,
    /// A slot or preference names a day not in the grid.
    UnknownDay,
    /// A slot period is 0 or beyond the day's last period.
    InvalidPeriod,
    /// Block hours outside `2..=4` or above the weekly hours.
    InvalidBlockHours,
    /// A co-taught subject lists fewer than two teachers.
    CoTeachingTooSmall,
    /// A subject taught to some class has no qualified teacher.
    NoQualifiedTeacher,
    /// A class needs more periods than its grid offers.
    CapacityExceeded,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the input data for a timetabling problem.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(
    config: &ScheduleConfig,
    classes: &[ClassInfo],
    subjects: &[Subject],
    teachers: &[Teacher],
) -> ValidationResult {
    let mut errors = Vec::new();

    if config.days.is_empty() || config.max_period() == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyGrid,
            "The weekly grid has no days or no periods",
        ));
    }

    check_unique("class", classes.iter().map(|c| c.id.as_str()), &mut errors);
    check_unique("subject", subjects.iter().map(|s| s.id.as_str()), &mut errors);
    check_unique("teacher", teachers.iter().map(|t| t.id.as_str()), &mut errors);

    let subject_ids: HashSet<&str> = subjects.iter().map(|s| s.id.as_str()).collect();
    let teacher_ids: HashSet<&str> = teachers.iter().map(|t| t.id.as_str()).collect();
    let grades: HashSet<u32> = classes.iter().map(|c| c.grade).collect();

    for s in subjects {
        if s.is_block_class
            && (!(2..=4).contains(&s.block_hours) || s.block_hours > s.weekly_hours)
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidBlockHours,
                format!(
                    "Subject '{}' has block hours {} (weekly hours {})",
                    s.id, s.block_hours, s.weekly_hours
                ),
            ));
        }

        if s.is_co_teaching {
            if s.co_teaching_teachers.len() < 2 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::CoTeachingTooSmall,
                    format!("Co-taught subject '{}' lists fewer than two teachers", s.id),
                ));
            }
            for t in s.co_teaching_teachers.iter().filter(|t| !teacher_ids.contains(t.as_str())) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownTeacher,
                    format!("Subject '{}' references unknown co-teacher '{t}'", s.id),
                ));
            }
        }

        for slot in &s.fixed_times {
            check_slot(config, slot, &format!("Fixed time of subject '{}'", s.id), &mut errors);
        }

        let taught = s.target_grades.iter().any(|g| grades.contains(g));
        if taught
            && s.weekly_hours > 0
            && !s.is_co_teaching
            && !teachers.iter().any(|t| t.teaches(&s.id))
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::NoQualifiedTeacher,
                format!("No teacher can teach subject '{}'", s.id),
            ));
        }
    }

    for t in teachers {
        for id in t.subject_ids.iter().filter(|id| !subject_ids.contains(id.as_str())) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownSubject,
                format!("Teacher '{}' references unknown subject '{id}'", t.id),
            ));
        }
        for slot in &t.unavailable_times {
            let what = format!("Unavailable time of teacher '{}'", t.id);
            check_slot(config, slot, &what, &mut errors);
        }
        for day in t.preferred_days.iter().filter(|d| !config.has_day(d)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownDay,
                format!("Teacher '{}' prefers unknown day '{day}'", t.id),
            ));
        }
    }

    for c in classes {
        let demand: u32 = subjects
            .iter()
            .filter(|s| s.targets_grade(c.grade))
            .map(|s| s.weekly_hours)
            .sum();
        let capacity: u32 = config.days.iter().map(|d| config.periods_for(c.grade, d)).sum();
        if demand > capacity {
            errors.push(ValidationError::new(
                ValidationErrorKind::CapacityExceeded,
                format!(
                    "Class '{}' needs {demand} periods but its week has {capacity}",
                    c.id
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unique<'a>(
    entity: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {entity} ID: {id}"),
            ));
        }
    }
}

fn check_slot(
    config: &ScheduleConfig,
    slot: &TimeSlot,
    what: &str,
    errors: &mut Vec<ValidationError>,
) {
    if !config.has_day(&slot.day) {
        errors.push(ValidationError::new(
            ValidationErrorKind::UnknownDay,
            format!("{what} uses unknown day '{}'", slot.day),
        ));
    } else if slot.period == 0 || slot.period > config.max_period() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidPeriod,
            format!("{what} uses invalid period {} on {}", slot.period, slot.day),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (ScheduleConfig, Vec<ClassInfo>, Vec<Subject>, Vec<Teacher>) {
        let config = ScheduleConfig::weekdays(6);
        let classes = vec![ClassInfo::new("c1", 1, 1), ClassInfo::new("c2", 1, 2)];
        let subjects = vec![
            Subject::new("math", 5).with_grade(1),
            Subject::new("sci", 4).with_grade(1).with_block(2),
            Subject::new("pe", 2)
                .with_grade(1)
                .with_co_teachers(vec!["T1".into(), "T2".into()]),
        ];
        let teachers = vec![
            Teacher::new("T1", 20).with_subject("math").with_subject("pe"),
            Teacher::new("T2", 20).with_subject("sci").with_subject("pe"),
        ];
        (config, classes, subjects, teachers)
    }

    fn kinds(result: ValidationResult) -> Vec<ValidationErrorKind> {
        result.err().unwrap_or_default().into_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_valid_input() {
        let (config, classes, subjects, teachers) = sample();
        assert!(validate_input(&config, &classes, &subjects, &teachers).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let (config, mut classes, subjects, mut teachers) = sample();
        classes.push(ClassInfo::new("c1", 2, 1));
        teachers.push(Teacher::new("T2", 5));
        let found = kinds(validate_input(&config, &classes, &subjects, &teachers));
        assert_eq!(
            found.iter().filter(|k| **k == ValidationErrorKind::DuplicateId).count(),
            2
        );
    }

    #[test]
    fn test_block_hours_range() {
        let (config, classes, mut subjects, teachers) = sample();
        subjects[1].block_hours = 5;
        let found = kinds(validate_input(&config, &classes, &subjects, &teachers));
        assert!(found.contains(&ValidationErrorKind::InvalidBlockHours));
    }

    #[test]
    fn test_co_teaching_references() {
        let (config, classes, mut subjects, teachers) = sample();
        subjects[2].co_teaching_teachers = vec!["ghost".into()];
        let found = kinds(validate_input(&config, &classes, &subjects, &teachers));
        assert!(found.contains(&ValidationErrorKind::CoTeachingTooSmall));
        assert!(found.contains(&ValidationErrorKind::UnknownTeacher));
    }

    #[test]
    fn test_unknown_days_and_periods() {
        let (config, classes, mut subjects, mut teachers) = sample();
        subjects[0].fixed_times.push(TimeSlot::new("Sun", 1));
        teachers[0].unavailable_times.push(TimeSlot::new("Mon", 9));
        teachers[1].preferred_days.push("Sat".into());
        let found = kinds(validate_input(&config, &classes, &subjects, &teachers));
        assert_eq!(
            found.iter().filter(|k| **k == ValidationErrorKind::UnknownDay).count(),
            2
        );
        assert!(found.contains(&ValidationErrorKind::InvalidPeriod));
    }

    #[test]
    fn test_unknown_subject_and_no_teacher() {
        let (config, classes, mut subjects, mut teachers) = sample();
        subjects.push(Subject::new("art", 1).with_grade(1));
        teachers[0].subject_ids.push("music".into());
        let found = kinds(validate_input(&config, &classes, &subjects, &teachers));
        assert!(found.contains(&ValidationErrorKind::NoQualifiedTeacher));
        assert!(found.contains(&ValidationErrorKind::UnknownSubject));
    }

    #[test]
    fn test_capacity_and_empty_grid() {
        let (_, classes, subjects, teachers) = sample();
        let small = ScheduleConfig::weekdays(2);
        let found = kinds(validate_input(&small, &classes, &subjects, &teachers));
        assert!(found.contains(&ValidationErrorKind::CapacityExceeded));

        let empty = ScheduleConfig::new(Vec::new(), 0);
        let found = kinds(validate_input(&empty, &[], &[], &[]));
        assert_eq!(found, vec![ValidationErrorKind::EmptyGrid]);
    }
}
