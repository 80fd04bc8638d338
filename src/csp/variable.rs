//! Variable and domain construction.
//!
//! Expands (class × subject) demand into atomic placement units. A subject
//! with `weekly_hours = 5` and 2-period blocks becomes two block variables
//! and one single-period variable per targeted class.

use std::collections::HashSet;

use crate::models::{ClassInfo, ScheduleConfig, Subject, Teacher, TimeSlot};

/// Ordering tiers (lower = placed earlier).
pub const PRIORITY_CO_TEACHING: i32 = 100;
pub const PRIORITY_BLOCK: i32 = 200;
pub const PRIORITY_SPECIAL_ROOM: i32 = 300;
pub const PRIORITY_EXTERNAL: i32 = 400;
pub const PRIORITY_TEACHER: i32 = 500;
pub const PRIORITY_DEFAULT: i32 = 600;

/// One unit to place: `hours_to_assign` consecutive periods of a subject for a
/// class.
#[derive(Debug, Clone, PartialEq)]
pub struct CspVariable {
    pub class_id: String,
    pub grade: u32,
    pub subject_id: String,
    /// Candidate teacher sets. Co-taught units have a single set holding all
    /// co-teachers; ordinary units have one singleton set per qualified teacher.
    pub teacher_options: Vec<Vec<String>>,
    /// 1 for ordinary units, `block_hours` for block units.
    pub hours_to_assign: u32,
    pub is_block: bool,
    pub room: Option<String>,
    /// Ordering tier.
    pub priority: i32,
    /// Tiebreak inside a tier (the subject's own priority).
    pub subject_priority: i32,
    pub fixed_slot: Option<TimeSlot>,
}

/// A candidate start cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CspDomain {
    pub day: String,
    pub period: u32,
}

/// Builds variables and domains from the inputs.
#[derive(Debug, Clone)]
pub struct VariableBuilder<'a> {
    config: &'a ScheduleConfig,
    classes: &'a [ClassInfo],
    subjects: &'a [Subject],
    teachers: &'a [Teacher],
}

impl<'a> VariableBuilder<'a> {
    /// Creates a builder.
    pub fn new(
        config: &'a ScheduleConfig,
        classes: &'a [ClassInfo],
        subjects: &'a [Subject],
        teachers: &'a [Teacher],
    ) -> Self {
        Self {
            config,
            classes,
            subjects,
            teachers,
        }
    }

    /// Teachers qualified for a subject.
    pub fn eligible_teachers(&self, subject: &Subject) -> Vec<&'a Teacher> {
        self.teachers.iter().filter(|t| t.teaches(&subject.id)).collect()
    }

    /// Teacher sets that may teach a subject.
    fn teacher_options(&self, subject: &Subject) -> Vec<Vec<String>> {
        if subject.is_co_teaching {
            let known: HashSet<&str> = self.teachers.iter().map(|t| t.id.as_str()).collect();
            let mut team: Vec<String> = subject
                .co_teaching_teachers
                .iter()
                .filter(|id| known.contains(id.as_str()))
                .cloned()
                .collect();
            if team.is_empty() {
                team = self
                    .eligible_teachers(subject)
                    .into_iter()
                    .map(|t| t.id.clone())
                    .collect();
            }
            if team.is_empty() {
                Vec::new()
            } else {
                vec![team]
            }
        } else {
            self.eligible_teachers(subject)
                .into_iter()
                .map(|t| vec![t.id.clone()])
                .collect()
        }
    }

    /// Ordering tier of a subject.
    pub fn priority_of(&self, subject: &Subject) -> i32 {
        if subject.is_co_teaching {
            PRIORITY_CO_TEACHING
        } else if subject.is_block_class {
            PRIORITY_BLOCK
        } else if subject.special_room.is_some() {
            PRIORITY_SPECIAL_ROOM
        } else if subject.is_external_instructor {
            PRIORITY_EXTERNAL
        } else if self.eligible_teachers(subject).iter().any(|t| t.is_priority) {
            PRIORITY_TEACHER
        } else {
            PRIORITY_DEFAULT
        }
    }

    /// Builds every variable.
    ///
    /// Pairs with no qualified teacher produce no variables; their hours
    /// surface later as unmet-hours violations.
    pub fn build(&self) -> Vec<CspVariable> {
        let mut variables = Vec::new();

        for class in self.classes {
            for subject in self.subjects.iter().filter(|s| s.targets_grade(class.grade)) {
                let options = self.teacher_options(subject);
                if options.is_empty() {
                    continue;
                }
                let priority = self.priority_of(subject);

                let block = subject.effective_block_hours();
                let (chunks, singles) = if block > 1 {
                    (subject.weekly_hours / block, subject.weekly_hours % block)
                } else {
                    (0, subject.weekly_hours)
                };

                let units = (0..chunks).map(|_| block).chain((0..singles).map(|_| 1));
                for (index, hours) in units.enumerate() {
                    variables.push(CspVariable {
                        class_id: class.id.clone(),
                        grade: class.grade,
                        subject_id: subject.id.clone(),
                        teacher_options: options.clone(),
                        hours_to_assign: hours,
                        is_block: hours > 1,
                        room: subject.special_room.clone(),
                        priority,
                        subject_priority: subject.priority,
                        fixed_slot: subject.fixed_times.get(index).cloned(),
                    });
                }
            }
        }

        variables
    }

    /// Candidate cells for a grade: its days × periods `1..=bound(day)`.
    pub fn domain(&self, grade: u32) -> Vec<CspDomain> {
        self.config
            .days_for_grade(grade)
            .into_iter()
            .flat_map(|day| {
                (1..=self.config.periods_for(grade, day)).map(move |period| CspDomain {
                    day: day.to_string(),
                    period,
                })
            })
            .collect()
    }
}
