//! Weekly grid configuration.
//!
//! Defines the school week: which days are taught, how many periods each
//! day has, and where lunch falls.
//!
//! # Period bound precedence
//! For a class of grade `g` on day `d` the last period is resolved as:
//! 1. `grade_settings[g].periods_per_day[d]`
//! 2. `grade_settings[g].max_periods_per_day`
//! 3. `periods_per_day[d]`
//! 4. `max_periods_per_day`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A `(day, period)` cell of the weekly grid. Periods are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Day label, must appear in [`ScheduleConfig::days`].
    pub day: String,
    /// Period number (1-based).
    pub period: u32,
}

impl TimeSlot {
    /// Creates a slot.
    pub fn new(day: impl Into<String>, period: u32) -> Self {
        Self {
            day: day.into(),
            period,
        }
    }
}

/// Per-grade overrides of the weekly grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSettings {
    /// Days taught to this grade (subset of the config days).
    #[serde(default)]
    pub days: Option<Vec<String>>,
    /// Grade-wide period cap.
    #[serde(default)]
    pub max_periods_per_day: Option<u32>,
    /// Per-day period caps.
    #[serde(default)]
    pub periods_per_day: HashMap<String, u32>,
}

/// Weekly grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    /// Working days, in week order.
    pub days: Vec<String>,
    /// Global period cap (≥ 1).
    pub max_periods_per_day: u32,
    /// Per-day period caps.
    #[serde(default)]
    pub periods_per_day: HashMap<String, u32>,
    /// Lunch break follows this period. `None` = no lunch break.
    #[serde(default)]
    pub lunch_after_period: Option<u32>,
    /// Per-grade overrides.
    #[serde(default)]
    pub grade_settings: HashMap<u32, GradeSettings>,
}

impl ScheduleConfig {
    /// Creates a config with the given days and period cap.
    pub fn new(days: Vec<String>, max_periods_per_day: u32) -> Self {
        Self {
            days,
            max_periods_per_day,
            periods_per_day: HashMap::new(),
            lunch_after_period: None,
            grade_settings: HashMap::new(),
        }
    }

    /// Monday to Friday with the given period cap.
    pub fn weekdays(max_periods_per_day: u32) -> Self {
        Self::new(
            ["Mon", "Tue", "Wed", "Thu", "Fri"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            max_periods_per_day,
        )
    }

    /// Sets a per-day period cap.
    pub fn with_day_periods(mut self, day: impl Into<String>, periods: u32) -> Self {
        self.periods_per_day.insert(day.into(), periods);
        self
    }

    /// Sets the lunch marker.
    pub fn with_lunch_after(mut self, period: u32) -> Self {
        self.lunch_after_period = Some(period);
        self
    }

    /// Sets overrides for a grade.
    pub fn with_grade_settings(mut self, grade: u32, settings: GradeSettings) -> Self {
        self.grade_settings.insert(grade, settings);
        self
    }

    /// Position of a day in the week, if configured.
    pub fn day_index(&self, day: &str) -> Option<usize> {
        self.days.iter().position(|d| d == day)
    }

    /// Whether a day is configured.
    #[inline]
    pub fn has_day(&self, day: &str) -> bool {
        self.day_index(day).is_some()
    }

    /// Days taught to a grade, in week order.
    pub fn days_for_grade(&self, grade: u32) -> Vec<&str> {
        match self.grade_settings.get(&grade).and_then(|g| g.days.as_ref()) {
            Some(subset) => self
                .days
                .iter()
                .filter(|d| subset.contains(d))
                .map(String::as_str)
                .collect(),
            None => self.days.iter().map(String::as_str).collect(),
        }
    }

    /// Last period on a day, ignoring grade overrides.
    pub fn periods_on(&self, day: &str) -> u32 {
        self.periods_per_day
            .get(day)
            .copied()
            .unwrap_or(self.max_periods_per_day)
    }

    /// Last period for a grade on a day. Returns 0 when the grade does not
    /// attend on that day.
    pub fn periods_for(&self, grade: u32, day: &str) -> u32 {
        let Some(settings) = self.grade_settings.get(&grade) else {
            return if self.has_day(day) { self.periods_on(day) } else { 0 };
        };
        if let Some(days) = &settings.days {
            if !days.iter().any(|d| d == day) {
                return 0;
            }
        }
        if !self.has_day(day) {
            return 0;
        }
        settings
            .periods_per_day
            .get(day)
            .copied()
            .or(settings.max_periods_per_day)
            .unwrap_or_else(|| self.periods_on(day))
    }

    /// Largest period number anywhere in the grid.
    pub fn max_period(&self) -> u32 {
        let day_max = self.periods_per_day.values().copied().max().unwrap_or(0);
        let grade_max = self
            .grade_settings
            .values()
            .flat_map(|g| g.periods_per_day.values().copied().chain(g.max_periods_per_day))
            .max()
            .unwrap_or(0);
        self.max_periods_per_day.max(day_max).max(grade_max)
    }
}
