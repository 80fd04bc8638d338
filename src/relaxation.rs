//! Constraint relaxation for inputs the search cannot satisfy.
//!
//! Turns the violations of a failed attempt into [`RelaxationSuggestion`]s,
//! one per distinct rule, ordered from the least to the most severe. A
//! suggestion carries a [`RelaxationAction`] only when the
//! [`RelaxationPolicy`] allows relaxing its severity; critical rules are
//! reported as unsolvable and never relaxed under the default policy.
//!
//! The relaxer works on its own copies of the subjects and teachers. The
//! caller's data is never touched; the relaxed copies are handed back from
//! [`ConstraintRelaxer::apply_relaxation`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::RelaxationPolicy;
use crate::models::{ConstraintKind, ConstraintViolation, Severity, Subject, Teacher};

/// A concrete weakening of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelaxationAction {
    /// Stop checking and scoring a rule.
    DisableConstraint { kind: ConstraintKind },
    /// Lower a subject's weekly hours by one.
    #[serde(rename_all = "camelCase")]
    ReduceWeeklyHours { subject_id: String },
    /// Treat a priority teacher as an ordinary one.
    #[serde(rename_all = "camelCase")]
    ClearTeacherPriority { teacher_id: String },
    /// Let an external instructor's lessons spread over several days.
    #[serde(rename_all = "camelCase")]
    ClearConcentratedDay { subject_id: String },
    /// Schedule a block subject as single periods.
    #[serde(rename_all = "camelCase")]
    ClearBlockClass { subject_id: String },
}

/// A proposed relaxation for one broken rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaxationSuggestion {
    pub kind: ConstraintKind,
    pub severity: Severity,
    pub message: String,
    /// `None` when the policy forbids relaxing this severity.
    #[serde(default)]
    pub action: Option<RelaxationAction>,
}

impl RelaxationSuggestion {
    /// Whether the suggestion can be applied.
    pub fn is_actionable(&self) -> bool {
        self.action.is_some()
    }
}

/// Outcome of an applied relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedRelaxation {
    /// Human-readable summary.
    pub description: String,
    /// Every rule disabled so far, including earlier rounds.
    pub disabled: Vec<ConstraintKind>,
    /// Relaxed subject set.
    pub subjects: Vec<Subject>,
    /// Relaxed teacher set.
    pub teachers: Vec<Teacher>,
}

/// Proposes and applies relaxations over private copies of the input.
#[derive(Debug, Clone)]
pub struct ConstraintRelaxer {
    subjects: Vec<Subject>,
    teachers: Vec<Teacher>,
    disabled: BTreeSet<ConstraintKind>,
    policy: RelaxationPolicy,
}

impl ConstraintRelaxer {
    /// Creates a relaxer with the default policy (low and medium only).
    pub fn new(subjects: &[Subject], teachers: &[Teacher]) -> Self {
        Self {
            subjects: subjects.to_vec(),
            teachers: teachers.to_vec(),
            disabled: BTreeSet::new(),
            policy: RelaxationPolicy::default(),
        }
    }

    /// Sets which severities may be relaxed.
    pub fn with_policy(mut self, policy: RelaxationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Starts from rules already disabled in earlier rounds.
    pub fn with_disabled(mut self, kinds: impl IntoIterator<Item = ConstraintKind>) -> Self {
        self.disabled.extend(kinds);
        self
    }

    /// Current subject copies.
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Current teacher copies.
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    /// One suggestion per distinct rule in `violations`, the first violation
    /// of each rule deciding the target. Sorted by ascending severity.
    pub fn generate_suggestions(
        &self,
        violations: &[ConstraintViolation],
    ) -> Vec<RelaxationSuggestion> {
        let mut seen = BTreeSet::new();
        let mut suggestions: Vec<RelaxationSuggestion> = violations
            .iter()
            .filter(|v| seen.insert(v.kind))
            .map(|v| self.suggest(v))
            .collect();
        suggestions.sort_by_key(|s| s.severity.rank());
        suggestions
    }

    fn suggest(&self, violation: &ConstraintViolation) -> RelaxationSuggestion {
        let kind = violation.kind;
        let severity = kind.severity();

        if !self.policy.allows(severity) {
            let message = if severity == Severity::Critical {
                format!(
                    "The {} rule cannot be relaxed; the input is unsolvable as given ({})",
                    kind, violation.message
                )
            } else {
                format!(
                    "Relaxing {} rules is disabled; adjust the input ({})",
                    severity, violation.message
                )
            };
            return RelaxationSuggestion {
                kind,
                severity,
                message,
                action: None,
            };
        }

        let action = self.action_for(violation);
        let message = match &action {
            Some(action) => format!("Relax {}: {}", kind, describe(action)),
            None => format!("No relaxation available for {} ({})", kind, violation.message),
        };
        RelaxationSuggestion {
            kind,
            severity,
            message,
            action,
        }
    }

    fn action_for(&self, violation: &ConstraintViolation) -> Option<RelaxationAction> {
        let details = &violation.details;
        let subject = |id: &Option<String>| {
            id.as_deref()
                .and_then(|id| self.subjects.iter().find(|s| s.id == id))
        };

        let action = match violation.kind {
            ConstraintKind::HoursUnmet => subject(&details.subject_id)
                .filter(|s| s.weekly_hours > 0)
                .map(|s| RelaxationAction::ReduceWeeklyHours {
                    subject_id: s.id.clone(),
                }),
            ConstraintKind::PriorityTeacherPreference => details
                .teacher_id
                .as_deref()
                .and_then(|id| self.teachers.iter().find(|t| t.id == id && t.is_priority))
                .map(|t| RelaxationAction::ClearTeacherPriority {
                    teacher_id: t.id.clone(),
                }),
            ConstraintKind::ExternalSpread => subject(&details.subject_id)
                .filter(|s| s.prefer_concentrated_day)
                .map(|s| RelaxationAction::ClearConcentratedDay {
                    subject_id: s.id.clone(),
                }),
            ConstraintKind::BlockContiguity => subject(&details.subject_id)
                .filter(|s| s.is_block_class)
                .map(|s| RelaxationAction::ClearBlockClass {
                    subject_id: s.id.clone(),
                }),
            kind => Some(RelaxationAction::DisableConstraint { kind }),
        };

        action.filter(|a| match a {
            RelaxationAction::DisableConstraint { kind } => !self.disabled.contains(kind),
            _ => true,
        })
    }

    /// Applies a suggestion to the internal copies.
    ///
    /// Returns `None` for suggestions without an action or whose target no
    /// longer exists.
    pub fn apply_relaxation(
        &mut self,
        suggestion: &RelaxationSuggestion,
    ) -> Option<AppliedRelaxation> {
        let action = suggestion.action.as_ref()?;

        match action {
            RelaxationAction::DisableConstraint { kind } => {
                self.disabled.insert(*kind);
            }
            RelaxationAction::ReduceWeeklyHours { subject_id } => {
                let s = self
                    .subjects
                    .iter_mut()
                    .find(|s| &s.id == subject_id && s.weekly_hours > 0)?;
                s.weekly_hours -= 1;
                s.fixed_times.truncate(s.weekly_hours as usize);
                if s.is_block_class && s.block_hours > s.weekly_hours {
                    s.is_block_class = false;
                }
            }
            RelaxationAction::ClearTeacherPriority { teacher_id } => {
                self.teachers.iter_mut().find(|t| &t.id == teacher_id)?.is_priority = false;
            }
            RelaxationAction::ClearConcentratedDay { subject_id } => {
                self.subjects
                    .iter_mut()
                    .find(|s| &s.id == subject_id)?
                    .prefer_concentrated_day = false;
            }
            RelaxationAction::ClearBlockClass { subject_id } => {
                self.subjects.iter_mut().find(|s| &s.id == subject_id)?.is_block_class = false;
            }
        }

        Some(AppliedRelaxation {
            description: describe(action),
            disabled: self.disabled.iter().copied().collect(),
            subjects: self.subjects.clone(),
            teachers: self.teachers.clone(),
        })
    }
}

fn describe(action: &RelaxationAction) -> String {
    match action {
        RelaxationAction::DisableConstraint { kind } => format!("disable the {kind} rule"),
        RelaxationAction::ReduceWeeklyHours { subject_id } => {
            format!("reduce weekly hours of {subject_id} by one")
        }
        RelaxationAction::ClearTeacherPriority { teacher_id } => {
            format!("drop priority status of teacher {teacher_id}")
        }
        RelaxationAction::ClearConcentratedDay { subject_id } => {
            format!("allow {subject_id} on several days")
        }
        RelaxationAction::ClearBlockClass { subject_id } => {
            format!("schedule {subject_id} as single periods")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViolationDetails;

    fn violation(
        kind: ConstraintKind,
        subject: Option<&str>,
        teacher: Option<&str>,
    ) -> ConstraintViolation {
        ConstraintViolation::new(kind, format!("{kind} broken")).with_details(ViolationDetails {
            subject_id: subject.map(String::from),
            teacher_id: teacher.map(String::from),
            ..Default::default()
        })
    }

    fn fixture() -> (Vec<Subject>, Vec<Teacher>) {
        let subjects = vec![
            Subject::new("math", 5).with_grade(1),
            Subject::new("sci", 4).with_grade(1).with_block(2),
            Subject::new("art", 2).with_grade(1).with_external_instructor(true),
        ];
        let teachers = vec![Teacher::new("T1", 20).with_subject("math").with_priority()];
        (subjects, teachers)
    }

    #[test]
    fn test_one_suggestion_per_kind_sorted() {
        let (subjects, teachers) = fixture();
        let relaxer = ConstraintRelaxer::new(&subjects, &teachers);
        let violations = vec![
            violation(ConstraintKind::TeacherConflict, None, Some("T1")),
            violation(ConstraintKind::HoursUnmet, Some("math"), None),
            violation(ConstraintKind::RoomChange, None, None),
            violation(ConstraintKind::HoursUnmet, Some("sci"), None),
            violation(ConstraintKind::ConsecutivePeriods, None, Some("T1")),
        ];

        let suggestions = relaxer.generate_suggestions(&violations);
        assert_eq!(suggestions.len(), 4);
        let ranks: Vec<u8> = suggestions.iter().map(|s| s.severity.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_default_policy_gates_actions() {
        let (subjects, teachers) = fixture();
        let relaxer = ConstraintRelaxer::new(&subjects, &teachers);
        let violations = vec![
            violation(ConstraintKind::ClassConflict, None, None),
            violation(ConstraintKind::HoursUnmet, Some("math"), None),
            violation(ConstraintKind::PreLunchConcentration, None, Some("T1")),
        ];
        let suggestions = relaxer.generate_suggestions(&violations);

        let critical = suggestions.iter().find(|s| s.severity == Severity::Critical).unwrap();
        assert!(critical.action.is_none());
        assert!(critical.message.contains("unsolvable"));

        let high = suggestions.iter().find(|s| s.severity == Severity::High).unwrap();
        assert!(high.action.is_none());

        let medium = suggestions.iter().find(|s| s.severity == Severity::Medium).unwrap();
        assert_eq!(
            medium.action,
            Some(RelaxationAction::DisableConstraint {
                kind: ConstraintKind::PreLunchConcentration
            })
        );
    }

    #[test]
    fn test_reduce_hours_leaves_caller_untouched() {
        let (subjects, teachers) = fixture();
        let policy = RelaxationPolicy {
            allow_high: true,
            ..RelaxationPolicy::default()
        };
        let mut relaxer = ConstraintRelaxer::new(&subjects, &teachers).with_policy(policy);
        let unmet = violation(ConstraintKind::HoursUnmet, Some("math"), None);
        let suggestions = relaxer.generate_suggestions(&[unmet]);

        let applied = relaxer.apply_relaxation(&suggestions[0]).unwrap();
        assert_eq!(applied.subjects[0].weekly_hours, 4);
        assert_eq!(subjects[0].weekly_hours, 5);
        assert!(applied.description.contains("math"));
    }

    #[test]
    fn test_flag_actions() {
        let (subjects, teachers) = fixture();
        let policy = RelaxationPolicy {
            allow_high: true,
            allow_critical: true,
            ..RelaxationPolicy::default()
        };
        let mut relaxer = ConstraintRelaxer::new(&subjects, &teachers).with_policy(policy);
        let violations = vec![
            violation(ConstraintKind::PriorityTeacherPreference, None, Some("T1")),
            violation(ConstraintKind::ExternalSpread, Some("art"), Some("T9")),
            violation(ConstraintKind::BlockContiguity, Some("sci"), None),
        ];
        for s in relaxer.generate_suggestions(&violations) {
            assert!(relaxer.apply_relaxation(&s).is_some());
        }

        assert!(!relaxer.teachers()[0].is_priority);
        assert!(!relaxer.subjects()[2].prefer_concentrated_day);
        assert!(!relaxer.subjects()[1].is_block_class);
    }

    #[test]
    fn test_disabled_rule_is_not_suggested_again() {
        let (subjects, teachers) = fixture();
        let relaxer = ConstraintRelaxer::new(&subjects, &teachers)
            .with_disabled([ConstraintKind::RoomChange]);
        let suggestions =
            relaxer.generate_suggestions(&[violation(ConstraintKind::RoomChange, None, None)]);
        assert_eq!(suggestions.len(), 1);
        assert!(!suggestions[0].is_actionable());
    }

    #[test]
    fn test_action_wire_format() {
        let action = RelaxationAction::ReduceWeeklyHours {
            subject_id: "math".into(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "reduce-weekly-hours");
        assert_eq!(json["subjectId"], "math");
    }
}
