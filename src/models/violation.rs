//! Constraint violations and their classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Violation severity. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic preference.
    Low,
    /// Pedagogical quality issue.
    Medium,
    /// Requirement not met, schedule still usable.
    High,
    /// Hard rule broken, schedule invalid.
    Critical,
}

impl Severity {
    /// Numeric rank: low=0 … critical=3.
    #[inline]
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// The rule a violation breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintKind {
    /// A teacher is in two lessons at once.
    TeacherConflict,
    /// A class has two lessons at once.
    ClassConflict,
    /// A teacher is placed on a blocked slot.
    TeacherUnavailable,
    /// A special room is used by two lessons at once.
    RoomConflict,
    /// A block lesson is not a contiguous run inside the day.
    BlockContiguity,
    /// A lesson sits on a day or period its class does not have.
    OutsideGrid,
    /// A class receives fewer periods of a subject than required.
    HoursUnmet,
    /// A teacher exceeds the weekly cap.
    TeacherOverload,
    /// A priority teacher teaches outside their preferred days.
    PriorityTeacherPreference,
    /// A teacher teaches three or more consecutive periods.
    ConsecutivePeriods,
    /// A teacher teaches back-to-back right up to lunch.
    PreLunchConcentration,
    /// A teacher teaches outside their preferred days.
    PreferredDayMismatch,
    /// An external instructor's lessons are spread over several days.
    ExternalSpread,
    /// A class switches special rooms between consecutive periods.
    RoomChange,
}

impl ConstraintKind {
    /// Every kind, in declaration order.
    pub const ALL: [ConstraintKind; 14] = [
        Self::TeacherConflict,
        Self::ClassConflict,
        Self::TeacherUnavailable,
        Self::RoomConflict,
        Self::BlockContiguity,
        Self::OutsideGrid,
        Self::HoursUnmet,
        Self::TeacherOverload,
        Self::PriorityTeacherPreference,
        Self::ConsecutivePeriods,
        Self::PreLunchConcentration,
        Self::PreferredDayMismatch,
        Self::ExternalSpread,
        Self::RoomChange,
    ];

    /// Severity of violations of this kind.
    pub fn severity(self) -> Severity {
        match self {
            Self::TeacherConflict
            | Self::ClassConflict
            | Self::TeacherUnavailable
            | Self::RoomConflict
            | Self::BlockContiguity
            | Self::OutsideGrid => Severity::Critical,
            Self::HoursUnmet | Self::TeacherOverload | Self::PriorityTeacherPreference => {
                Severity::High
            }
            Self::ConsecutivePeriods | Self::PreLunchConcentration => Severity::Medium,
            Self::PreferredDayMismatch | Self::ExternalSpread | Self::RoomChange => Severity::Low,
        }
    }

    /// Whether this kind is a hard rule.
    #[inline]
    pub fn is_critical(self) -> bool {
        self.severity() == Severity::Critical
    }

    /// Short label for messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::TeacherConflict => "teacher double-booking",
            Self::ClassConflict => "class double-booking",
            Self::TeacherUnavailable => "teacher unavailable",
            Self::RoomConflict => "room double-booking",
            Self::BlockContiguity => "block contiguity",
            Self::OutsideGrid => "outside class grid",
            Self::HoursUnmet => "weekly hours unmet",
            Self::TeacherOverload => "teacher overload",
            Self::PriorityTeacherPreference => "priority teacher preference",
            Self::ConsecutivePeriods => "consecutive periods",
            Self::PreLunchConcentration => "pre-lunch concentration",
            Self::PreferredDayMismatch => "preferred day mismatch",
            Self::ExternalSpread => "external instructor spread",
            Self::RoomChange => "room change",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured context of a violation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    /// Magnitude (missing hours, hours over cap, run length, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,
}

/// A broken rule found in a timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintViolation {
    /// Severity (derived from `kind`).
    pub severity: Severity,
    /// Rule broken.
    pub kind: ConstraintKind,
    /// Human-readable description.
    pub message: String,
    /// Offending entry, if a single one is responsible.
    #[serde(default)]
    pub entry_id: Option<String>,
    /// Structured context.
    #[serde(default)]
    pub details: ViolationDetails,
}

impl ConstraintViolation {
    /// Creates a violation of the given kind.
    pub fn new(kind: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            message: message.into(),
            entry_id: None,
            details: ViolationDetails::default(),
        }
    }

    /// Sets the offending entry.
    pub fn with_entry(mut self, entry_id: impl Into<String>) -> Self {
        self.entry_id = Some(entry_id.into());
        self
    }

    /// Sets the structured context.
    pub fn with_details(mut self, details: ViolationDetails) -> Self {
        self.details = details;
        self
    }

    /// Whether this violation invalidates the timetable.
    #[inline]
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}
