//! Soft rules (high, medium, low).
//!
//! Each evaluator scans the entry list and reports its own violations.
//! Grouping uses ordered maps so the output order is stable for a given
//! input.

use std::collections::{BTreeMap, BTreeSet};

use super::ConstraintValidator;
use crate::models::{ConstraintKind, ConstraintViolation, TimetableEntry, ViolationDetails};

type Evaluator = fn(&ConstraintValidator<'_>, &[TimetableEntry], &mut Vec<ConstraintViolation>);

const EVALUATORS: [(ConstraintKind, Evaluator); 8] = [
    (ConstraintKind::HoursUnmet, hours_unmet),
    (ConstraintKind::TeacherOverload, teacher_overload),
    (ConstraintKind::PriorityTeacherPreference, priority_preference),
    (ConstraintKind::ConsecutivePeriods, consecutive_periods),
    (ConstraintKind::PreLunchConcentration, pre_lunch_concentration),
    (ConstraintKind::PreferredDayMismatch, preferred_day_mismatch),
    (ConstraintKind::ExternalSpread, external_spread),
    (ConstraintKind::RoomChange, room_change),
];

pub(super) fn collect(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
) -> Vec<ConstraintViolation> {
    let mut out = Vec::new();
    for (kind, evaluate) in EVALUATORS {
        if v.is_enabled(kind) {
            evaluate(v, entries, &mut out);
        }
    }
    out
}

/// Sorted periods per (teacher, day).
fn teacher_days<'e>(entries: &'e [TimetableEntry]) -> BTreeMap<(&'e str, &'e str), Vec<u32>> {
    let mut map: BTreeMap<(&str, &str), Vec<u32>> = BTreeMap::new();
    for e in entries {
        for t in &e.teacher_ids {
            map.entry((t.as_str(), e.day.as_str())).or_default().push(e.period);
        }
    }
    for periods in map.values_mut() {
        periods.sort_unstable();
        periods.dedup();
    }
    map
}

fn hours_unmet(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
    out: &mut Vec<ConstraintViolation>,
) {
    let mut placed: BTreeMap<(&str, &str), u32> = BTreeMap::new();
    for e in entries {
        *placed.entry((e.class_id.as_str(), e.subject_id.as_str())).or_insert(0) += 1;
    }

    for class in v.classes() {
        for subject in v.subjects().iter().filter(|s| s.targets_grade(class.grade)) {
            let have = placed
                .get(&(class.id.as_str(), subject.id.as_str()))
                .copied()
                .unwrap_or(0);
            if have < subject.weekly_hours {
                let missing = subject.weekly_hours - have;
                out.push(
                    ConstraintViolation::new(
                        ConstraintKind::HoursUnmet,
                        format!(
                            "Class {} has {} of {} weekly periods of {}",
                            class.name, have, subject.weekly_hours, subject.id
                        ),
                    )
                    .with_details(ViolationDetails {
                        class_id: Some(class.id.clone()),
                        subject_id: Some(subject.id.clone()),
                        amount: Some(missing),
                        ..Default::default()
                    }),
                );
            }
        }
    }
}

fn teacher_overload(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
    out: &mut Vec<ConstraintViolation>,
) {
    let mut hours: BTreeMap<&str, u32> = BTreeMap::new();
    for e in entries {
        for t in &e.teacher_ids {
            *hours.entry(t.as_str()).or_insert(0) += 1;
        }
    }

    for (teacher_id, count) in hours {
        let Some(teacher) = v.teacher(teacher_id) else {
            continue;
        };
        if count > teacher.max_weekly_hours {
            out.push(
                ConstraintViolation::new(
                    ConstraintKind::TeacherOverload,
                    format!(
                        "Teacher {} teaches {} periods, cap is {}",
                        teacher_id, count, teacher.max_weekly_hours
                    ),
                )
                .with_details(ViolationDetails {
                    teacher_id: Some(teacher_id.to_string()),
                    amount: Some(count - teacher.max_weekly_hours),
                    ..Default::default()
                }),
            );
        }
    }
}

fn priority_preference(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
    out: &mut Vec<ConstraintViolation>,
) {
    for e in entries {
        for t in &e.teacher_ids {
            let Some(teacher) = v.teacher(t) else {
                continue;
            };
            if teacher.is_priority && !teacher.prefers_day(&e.day) {
                out.push(
                    ConstraintViolation::new(
                        ConstraintKind::PriorityTeacherPreference,
                        format!(
                            "Priority teacher {} is scheduled on non-preferred day {}",
                            t, e.day
                        ),
                    )
                    .with_entry(&e.id)
                    .with_details(ViolationDetails {
                        teacher_id: Some(t.clone()),
                        day: Some(e.day.clone()),
                        period: Some(e.period),
                        ..Default::default()
                    }),
                );
            }
        }
    }
}

fn consecutive_periods(
    _v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
    out: &mut Vec<ConstraintViolation>,
) {
    for ((teacher_id, day), periods) in teacher_days(entries) {
        let mut run_start = 0;
        for i in 1..=periods.len() {
            let continues = i < periods.len() && periods[i] == periods[i - 1] + 1;
            if continues {
                continue;
            }
            let length = (i - run_start) as u32;
            if length >= 3 {
                out.push(
                    ConstraintViolation::new(
                        ConstraintKind::ConsecutivePeriods,
                        format!(
                            "Teacher {} teaches {} consecutive periods on {} from period {}",
                            teacher_id, length, day, periods[run_start]
                        ),
                    )
                    .with_details(ViolationDetails {
                        teacher_id: Some(teacher_id.to_string()),
                        day: Some(day.to_string()),
                        period: Some(periods[run_start]),
                        amount: Some(length),
                        ..Default::default()
                    }),
                );
            }
            run_start = i;
        }
    }
}

fn pre_lunch_concentration(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
    out: &mut Vec<ConstraintViolation>,
) {
    // Teacher cells, to look up the period before each pre-lunch lesson.
    let busy: BTreeSet<(&str, &str, u32)> = entries
        .iter()
        .flat_map(|e| e.teacher_ids.iter().map(move |t| (t.as_str(), e.day.as_str(), e.period)))
        .collect();

    for e in entries {
        let Some(lunch) = v.lunch_for_class(&e.class_id) else {
            continue;
        };
        if lunch < 2 || e.period != lunch {
            continue;
        }
        for t in &e.teacher_ids {
            if busy.contains(&(t.as_str(), e.day.as_str(), lunch - 1)) {
                out.push(
                    ConstraintViolation::new(
                        ConstraintKind::PreLunchConcentration,
                        format!(
                            "Teacher {} teaches periods {} and {} right before lunch on {}",
                            t,
                            lunch - 1,
                            lunch,
                            e.day
                        ),
                    )
                    .with_entry(&e.id)
                    .with_details(ViolationDetails {
                        teacher_id: Some(t.clone()),
                        day: Some(e.day.clone()),
                        period: Some(lunch),
                        ..Default::default()
                    }),
                );
            }
        }
    }
}

fn preferred_day_mismatch(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
    out: &mut Vec<ConstraintViolation>,
) {
    for (teacher_id, day) in teacher_days(entries).into_keys() {
        let Some(teacher) = v.teacher(teacher_id) else {
            continue;
        };
        if !teacher.is_priority && !teacher.prefers_day(day) {
            out.push(
                ConstraintViolation::new(
                    ConstraintKind::PreferredDayMismatch,
                    format!("Teacher {} works on non-preferred day {}", teacher_id, day),
                )
                .with_details(ViolationDetails {
                    teacher_id: Some(teacher_id.to_string()),
                    day: Some(day.to_string()),
                    ..Default::default()
                }),
            );
        }
    }
}

fn external_spread(
    v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
    out: &mut Vec<ConstraintViolation>,
) {
    let mut days: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
    for e in entries {
        let concentrated = v
            .subject(&e.subject_id)
            .is_some_and(|s| s.is_external_instructor && s.prefer_concentrated_day);
        if !concentrated {
            continue;
        }
        for t in &e.teacher_ids {
            days.entry((e.subject_id.as_str(), t.as_str()))
                .or_default()
                .insert(e.day.as_str());
        }
    }

    for ((subject_id, teacher_id), used) in days {
        if used.len() > 1 {
            out.push(
                ConstraintViolation::new(
                    ConstraintKind::ExternalSpread,
                    format!(
                        "External instructor {} teaches {} on {} days",
                        teacher_id,
                        subject_id,
                        used.len()
                    ),
                )
                .with_details(ViolationDetails {
                    subject_id: Some(subject_id.to_string()),
                    teacher_id: Some(teacher_id.to_string()),
                    amount: Some(used.len() as u32 - 1),
                    ..Default::default()
                }),
            );
        }
    }
}

fn room_change(
    _v: &ConstraintValidator<'_>,
    entries: &[TimetableEntry],
    out: &mut Vec<ConstraintViolation>,
) {
    let mut rooms: BTreeMap<(&str, &str, u32), &str> = BTreeMap::new();
    for e in entries {
        if let Some(room) = &e.room {
            rooms.insert((e.class_id.as_str(), e.day.as_str(), e.period), room.as_str());
        }
    }

    for (&(class_id, day, period), &room) in &rooms {
        let Some(&next) = rooms.get(&(class_id, day, period + 1)) else {
            continue;
        };
        if next != room {
            out.push(
                ConstraintViolation::new(
                    ConstraintKind::RoomChange,
                    format!(
                        "Class {} moves from {} to {} between periods {} and {} on {}",
                        class_id,
                        room,
                        next,
                        period,
                        period + 1,
                        day
                    ),
                )
                .with_details(ViolationDetails {
                    class_id: Some(class_id.to_string()),
                    day: Some(day.to_string()),
                    period: Some(period),
                    ..Default::default()
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassInfo, ScheduleConfig, Subject, Teacher};

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

    fn kinds(found: &[ConstraintViolation]) -> Vec<ConstraintKind> {
        found.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_hours_and_overload() {
        let config = ScheduleConfig::weekdays(5);
        let classes = vec![ClassInfo::new("c1", 1, 1)];
        let subjects = vec![Subject::new("a", 3).with_grade(1), Subject::new("b", 1).with_grade(2)];
        let teachers = vec![Teacher::new("T1", 1).with_subject("a")];
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);

        let entries = vec![
            entry("e1", "c1", "a", "T1", "Mon", 1),
            entry("e2", "c1", "a", "T1", "Tue", 1),
        ];
        let mut out = Vec::new();
        hours_unmet(&v, &entries, &mut out);
        teacher_overload(&v, &entries, &mut out);

        // Subject b targets grade 2 and is ignored for c1.
        assert_eq!(kinds(&out), vec![ConstraintKind::HoursUnmet, ConstraintKind::TeacherOverload]);
        assert_eq!(out[0].details.amount, Some(1));
        assert_eq!(out[0].details.subject_id.as_deref(), Some("a"));
        assert_eq!(out[1].details.amount, Some(1));
    }

    #[test]
    fn test_consecutive_runs() {
        let config = ScheduleConfig::weekdays(6);
        let classes = vec![ClassInfo::new("c1", 1, 1), ClassInfo::new("c2", 1, 2)];
        let subjects = vec![Subject::new("a", 4).with_grade(1)];
        let teachers = vec![Teacher::new("T1", 20).with_subject("a")];
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);

        let entries = vec![
            entry("e1", "c1", "a", "T1", "Mon", 1),
            entry("e2", "c2", "a", "T1", "Mon", 2),
            entry("e3", "c1", "a", "T1", "Mon", 3),
            entry("e4", "c2", "a", "T1", "Mon", 5),
        ];
        let mut out = Vec::new();
        consecutive_periods(&v, &entries, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].details.amount, Some(3));
        assert_eq!(out[0].details.period, Some(1));
    }

    #[test]
    fn test_pre_lunch() {
        let config = ScheduleConfig::weekdays(6).with_lunch_after(4);
        let classes = vec![ClassInfo::new("c1", 1, 1), ClassInfo::new("c2", 1, 2)];
        let subjects = vec![Subject::new("a", 4).with_grade(1)];
        let teachers = vec![Teacher::new("T1", 20).with_subject("a")];
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);

        let entries = vec![
            entry("e1", "c1", "a", "T1", "Mon", 3),
            entry("e2", "c2", "a", "T1", "Mon", 4),
            entry("e3", "c2", "a", "T1", "Tue", 4),
        ];
        let mut out = Vec::new();
        pre_lunch_concentration(&v, &entries, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entry_id.as_deref(), Some("e2"));
    }

    #[test]
    fn test_day_preferences() {
        let config = ScheduleConfig::weekdays(6);
        let classes = vec![ClassInfo::new("c1", 1, 1)];
        let subjects = vec![Subject::new("a", 2).with_grade(1), Subject::new("b", 2).with_grade(1)];
        let teachers = vec![
            Teacher::new("P", 20).with_subject("a").with_priority().with_preferred_day("Mon"),
            Teacher::new("N", 20).with_subject("b").with_preferred_day("Mon"),
        ];
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);

        let entries = vec![
            entry("e1", "c1", "a", "P", "Mon", 1),
            entry("e2", "c1", "a", "P", "Tue", 1),
            entry("e3", "c1", "b", "N", "Wed", 1),
            entry("e4", "c1", "b", "N", "Wed", 2),
        ];
        let found = collect(&v, &entries);
        assert_eq!(
            kinds(&found),
            vec![ConstraintKind::PriorityTeacherPreference, ConstraintKind::PreferredDayMismatch]
        );
    }

    #[test]
    fn test_external_spread() {
        let config = ScheduleConfig::weekdays(6);
        let classes = vec![ClassInfo::new("c1", 1, 1)];
        let subjects = vec![Subject::new("art", 3).with_grade(1).with_external_instructor(true)];
        let teachers = vec![Teacher::new("X", 20).with_subject("art").with_external()];
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);

        let entries = vec![
            entry("e1", "c1", "art", "X", "Mon", 1),
            entry("e2", "c1", "art", "X", "Wed", 1),
            entry("e3", "c1", "art", "X", "Fri", 1),
        ];
        let mut out = Vec::new();
        external_spread(&v, &entries, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].details.amount, Some(2));
    }

    #[test]
    fn test_room_change() {
        let config = ScheduleConfig::weekdays(6);
        let classes = vec![ClassInfo::new("c1", 1, 1)];
        let subjects = vec![
            Subject::new("sci", 1).with_grade(1).with_special_room("lab"),
            Subject::new("pe", 1).with_grade(1).with_special_room("gym"),
        ];
        let teachers = vec![];
        let v = ConstraintValidator::new(&config, &classes, &subjects, &teachers);

        let entries = vec![
            entry("e1", "c1", "sci", "T1", "Mon", 1).with_room(Some("lab".into())),
            entry("e2", "c1", "pe", "T2", "Mon", 2).with_room(Some("gym".into())),
        ];
        let mut out = Vec::new();
        room_change(&v, &entries, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ConstraintKind::RoomChange);
    }
}
