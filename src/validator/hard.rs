//! Hard (critical) rules.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::ConstraintValidator;
use crate::models::{ConstraintKind, ConstraintViolation, TimetableEntry, ViolationDetails};

type Cell<'e> = (&'e str, &'e str, u32);

/// Whether two entries at the same cell may share a teacher.
///
/// Lessons of the same co-taught subject held jointly for several classes
/// count as one lesson.
fn shares_co_teaching(v: &ConstraintValidator<'_>, a: &TimetableEntry, b: &TimetableEntry) -> bool {
    a.subject_id == b.subject_id
        && v.subject(&a.subject_id).is_some_and(|s| s.is_co_teaching)
}

/// Ordinary lessons must sit inside their class's grid. Block lessons are
/// bounded by the block rule.
fn outside_grid(v: &ConstraintValidator<'_>, e: &TimetableEntry) -> bool {
    !e.is_block && !v.in_class_grid(&e.class_id, &e.day, e.period)
}

pub(super) fn has_critical(v: &ConstraintValidator<'_>, entries: &[TimetableEntry]) -> bool {
    let check_teacher = v.is_enabled(ConstraintKind::TeacherConflict);
    let check_class = v.is_enabled(ConstraintKind::ClassConflict);
    let check_room = v.is_enabled(ConstraintKind::RoomConflict);
    let check_unavailable = v.is_enabled(ConstraintKind::TeacherUnavailable);
    let check_grid = v.is_enabled(ConstraintKind::OutsideGrid);

    let mut teacher_cells: HashMap<Cell<'_>, &TimetableEntry> =
        HashMap::with_capacity(entries.len());
    let mut class_cells: HashSet<Cell<'_>> = HashSet::with_capacity(entries.len());
    let mut room_cells: HashSet<Cell<'_>> = HashSet::new();

    for e in entries {
        if check_grid && outside_grid(v, e) {
            return true;
        }
        if check_class && !class_cells.insert((e.class_id.as_str(), e.day.as_str(), e.period)) {
            return true;
        }
        if check_room {
            if let Some(room) = &e.room {
                if !room_cells.insert((room.as_str(), e.day.as_str(), e.period)) {
                    return true;
                }
            }
        }
        for t in &e.teacher_ids {
            if check_unavailable
                && v.teacher(t).is_some_and(|teacher| !teacher.is_available_at(&e.day, e.period))
            {
                return true;
            }
            if check_teacher {
                let cell = (t.as_str(), e.day.as_str(), e.period);
                if let Some(other) = teacher_cells.insert(cell, e) {
                    if !shares_co_teaching(v, other, e) {
                        return true;
                    }
                }
            }
        }
    }

    v.is_enabled(ConstraintKind::BlockContiguity) && !block_violations(v, entries).is_empty()
}

pub(super) fn collect(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
) -> Vec<ConstraintViolation> {
    let mut out = Vec::new();
    let mut teacher_cells: HashMap<Cell<'_>, &TimetableEntry> =
        HashMap::with_capacity(entries.len());
    let mut class_cells: HashMap<Cell<'_>, &TimetableEntry> = HashMap::with_capacity(entries.len());
    let mut room_cells: HashMap<Cell<'_>, &TimetableEntry> = HashMap::new();

    for e in entries {
        let cell_details = || ViolationDetails {
            class_id: Some(e.class_id.clone()),
            subject_id: Some(e.subject_id.clone()),
            day: Some(e.day.clone()),
            period: Some(e.period),
            ..Default::default()
        };

        if v.is_enabled(ConstraintKind::OutsideGrid) && outside_grid(v, e) {
            out.push(
                ConstraintViolation::new(
                    ConstraintKind::OutsideGrid,
                    format!(
                        "Class {} has no period {} on {}",
                        e.class_id, e.period, e.day
                    ),
                )
                .with_entry(&e.id)
                .with_details(cell_details()),
            );
        }

        let class_cell = (e.class_id.as_str(), e.day.as_str(), e.period);
        if let Some(other) = class_cells.insert(class_cell, e) {
            if v.is_enabled(ConstraintKind::ClassConflict) {
                out.push(
                    ConstraintViolation::new(
                        ConstraintKind::ClassConflict,
                        format!(
                            "Class {} has {} and {} at {} period {}",
                            e.class_id, other.subject_id, e.subject_id, e.day, e.period
                        ),
                    )
                    .with_entry(&e.id)
                    .with_details(cell_details()),
                );
            }
        }

        if let Some(room) = &e.room {
            if let Some(other) = room_cells.insert((room.as_str(), e.day.as_str(), e.period), e) {
                if v.is_enabled(ConstraintKind::RoomConflict) {
                    out.push(
                        ConstraintViolation::new(
                            ConstraintKind::RoomConflict,
                            format!(
                                "Room {} is used by {} and {} at {} period {}",
                                room, other.class_id, e.class_id, e.day, e.period
                            ),
                        )
                        .with_entry(&e.id)
                        .with_details(cell_details()),
                    );
                }
            }
        }

        for t in &e.teacher_ids {
            let teacher_details = || ViolationDetails {
                teacher_id: Some(t.clone()),
                ..cell_details()
            };

            if v.is_enabled(ConstraintKind::TeacherUnavailable)
                && v.teacher(t).is_some_and(|teacher| !teacher.is_available_at(&e.day, e.period))
            {
                out.push(
                    ConstraintViolation::new(
                        ConstraintKind::TeacherUnavailable,
                        format!("Teacher {} is unavailable at {} period {}", t, e.day, e.period),
                    )
                    .with_entry(&e.id)
                    .with_details(teacher_details()),
                );
            }

            if let Some(other) = teacher_cells.insert((t.as_str(), e.day.as_str(), e.period), e) {
                if v.is_enabled(ConstraintKind::TeacherConflict)
                    && !shares_co_teaching(v, other, e)
                {
                    out.push(
                        ConstraintViolation::new(
                            ConstraintKind::TeacherConflict,
                            format!(
                                "Teacher {} teaches {} and {} at {} period {}",
                                t, other.class_id, e.class_id, e.day, e.period
                            ),
                        )
                        .with_entry(&e.id)
                        .with_details(teacher_details()),
                    );
                }
            }
        }
    }

    if v.is_enabled(ConstraintKind::BlockContiguity) {
        out.extend(block_violations(v, entries));
    }
    out
}

/// Block lessons must form a run of exactly `block_hours` periods starting at
/// `block_start_period`, inside the day's period bound.
fn block_violations(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
) -> Vec<ConstraintViolation> {
    let mut groups: BTreeMap<(&str, &str, &str, u32), Vec<u32>> = BTreeMap::new();
    let mut out = Vec::new();

    for e in entries.iter().filter(|e| e.is_block) {
        match e.block_start_period {
            Some(start) => groups
                .entry((e.class_id.as_str(), e.subject_id.as_str(), e.day.as_str(), start))
                .or_default()
                .push(e.period),
            None => out.push(
                ConstraintViolation::new(
                    ConstraintKind::BlockContiguity,
                    format!("Block lesson {} has no start period", e.id),
                )
                .with_entry(&e.id),
            ),
        }
    }

    for ((class_id, subject_id, day, start), mut periods) in groups {
        let Some(subject) = v.subject(subject_id) else {
            continue;
        };
        let length = subject.effective_block_hours();
        let bound = v.periods_for_class(class_id, day);
        periods.sort_unstable();

        let expected: Vec<u32> = (start..start + length).collect();
        if periods != expected || start + length - 1 > bound {
            out.push(
                ConstraintViolation::new(
                    ConstraintKind::BlockContiguity,
                    format!(
                        "Block of {} for class {} on {} from period {} is not {} contiguous \
                         periods within period {}",
                        subject_id, class_id, day, start, length, bound
                    ),
                )
                .with_details(ViolationDetails {
                    class_id: Some(class_id.to_string()),
                    subject_id: Some(subject_id.to_string()),
                    day: Some(day.to_string()),
                    period: Some(start),
                    amount: Some(periods.len() as u32),
                    ..Default::default()
                }),
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassInfo, GradeSettings, ScheduleConfig, Subject, Teacher, TimeSlot};

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
        let config = ScheduleConfig::weekdays(4);
        let classes = vec![ClassInfo::new("c1", 1, 1), ClassInfo::new("c2", 1, 2)];
        let subjects = vec![
            Subject::new("math", 3).with_grade(1),
            Subject::new("lab", 2).with_grade(1).with_special_room("lab").with_block(2),
            Subject::new("team", 2)
                .with_grade(1)
                .with_co_teachers(vec!["T1".into(), "T2".into()]),
        ];
        let teachers = vec![
            Teacher::new("T1", 20)
                .with_subject("math")
                .with_unavailable(TimeSlot::new("Wed", 2)),
            Teacher::new("T2", 20).with_subject("lab"),
        ];
        (config, classes, subjects, teachers)
    }

    #[test]
    fn test_teacher_conflict() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let entries = vec![
            entry("e1", "c1", "math", "T1", "Mon", 1),
            entry("e2", "c2", "math", "T1", "Mon", 1),
        ];
        assert!(has_critical(&v, &entries));
        let found = collect(&v, &entries);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ConstraintKind::TeacherConflict);
        assert_eq!(found[0].entry_id.as_deref(), Some("e2"));
    }

    #[test]
    fn test_joint_co_teaching_is_not_a_conflict() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let pair = vec!["T1".to_string(), "T2".to_string()];
        let entries = vec![
            TimetableEntry::new("e1", "c1", "team", pair.clone(), "Mon", 1),
            TimetableEntry::new("e2", "c2", "team", pair, "Mon", 1),
        ];
        assert!(!has_critical(&v, &entries));
        assert!(collect(&v, &entries).is_empty());
    }

    #[test]
    fn test_class_conflict() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let entries = vec![
            entry("e1", "c1", "math", "T1", "Mon", 1),
            entry("e2", "c1", "lab", "T2", "Mon", 1),
        ];
        assert!(has_critical(&v, &entries));
        assert_eq!(collect(&v, &entries)[0].kind, ConstraintKind::ClassConflict);
    }

    #[test]
    fn test_unavailable() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let entries = vec![entry("e1", "c1", "math", "T1", "Wed", 2)];
        assert!(has_critical(&v, &entries));
        assert_eq!(collect(&v, &entries)[0].kind, ConstraintKind::TeacherUnavailable);
    }

    #[test]
    fn test_room_conflict() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
        let entries = vec![
            entry("e1", "c1", "lab", "T2", "Mon", 1).with_room(Some("lab".into())),
            entry("e2", "c2", "lab", "T9", "Mon", 1).with_room(Some("lab".into())),
        ];
        let found = collect(&v, &entries);
        assert!(found.iter().any(|x| x.kind == ConstraintKind::RoomConflict));
    }

    #[test]
    fn test_block_contiguity() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);

        let good = vec![
            entry("e1", "c1", "lab", "T2", "Tue", 2).with_block_start(2),
            entry("e2", "c1", "lab", "T2", "Tue", 3).with_block_start(2),
        ];
        assert!(!has_critical(&v, &good));

        let gap = vec![
            entry("e1", "c1", "lab", "T2", "Tue", 1).with_block_start(1),
            entry("e2", "c1", "lab", "T2", "Tue", 3).with_block_start(1),
        ];
        assert!(has_critical(&v, &gap));

        let overflow = vec![
            entry("e1", "c1", "lab", "T2", "Tue", 4).with_block_start(4),
            entry("e2", "c1", "lab", "T2", "Tue", 5).with_block_start(4),
        ];
        let found = collect(&v, &overflow);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ConstraintKind::BlockContiguity);
    }

    #[test]
    fn test_disabled_rule_skipped() {
        let (config, classes, subjects, teachers) = fixture();
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers)
            .with_disabled([ConstraintKind::TeacherUnavailable]);
        let entries = vec![entry("e1", "c1", "math", "T1", "Wed", 2)];
        assert!(!has_critical(&v, &entries));
        assert!(collect(&v, &entries).is_empty());
    }

    #[test]
    fn test_outside_class_grid() {
        let config = ScheduleConfig::weekdays(4).with_grade_settings(
            1,
            GradeSettings {
                days: Some(vec!["Mon".into()]),
                max_periods_per_day: Some(3),
                ..Default::default()
            },
        );
        let classes = vec![ClassInfo::new("c1", 1, 1), ClassInfo::new("c2", 2, 1)];
        let subjects = vec![Subject::new("math", 2).with_grades(vec![1, 2])];
        let teachers = vec![Teacher::new("T1", 20).with_subject("math")];
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);

        let inside = vec![
            entry("e1", "c1", "math", "T1", "Mon", 3),
            entry("e2", "c2", "math", "T1", "Tue", 4),
        ];
        assert!(!has_critical(&v, &inside));
        assert!(collect(&v, &inside).is_empty());

        for (day, period) in [("Tue", 1), ("Mon", 4), ("Mon", 0)] {
            let entries = vec![entry("e1", "c1", "math", "T1", day, period)];
            assert!(has_critical(&v, &entries), "{day} {period}");
            let found = collect(&v, &entries);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].kind, ConstraintKind::OutsideGrid);
            assert_eq!(found[0].entry_id.as_deref(), Some("e1"));
        }

        let relaxed = v.clone().with_disabled([ConstraintKind::OutsideGrid]);
        assert!(!has_critical(&relaxed, &[entry("e1", "c1", "math", "T1", "Tue", 1)]));
    }
}
