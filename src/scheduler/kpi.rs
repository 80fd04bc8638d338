//! Timetable quality metrics (KPIs).
//!
//! Summarizes a generated timetable for comparison between candidates.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Fill rate | Placed periods / required periods |
//! | Teacher load | Periods taught / `max_weekly_hours`, per teacher |
//! | Idle gaps | Free periods between a teacher's first and last lesson of a day |
//! | Days used | Distinct days a teacher works |
//!
//! # Reference
//! Schaerf (1999), "A Survey of Automated Timetabling", Sec. 2

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{ScheduleResult, Severity};

/// Timetable performance indicators.
#[derive(Debug, Clone)]
pub struct TimetableKpi {
    /// Periods placed.
    pub placed_periods: u32,
    /// Periods required by all (class, subject) pairs.
    pub required_periods: u32,
    /// `placed / required` (1.0 when nothing is required).
    pub fill_rate: f64,
    /// Per-teacher load relative to the weekly cap.
    pub load_by_teacher: HashMap<String, f64>,
    /// Mean teacher load.
    pub avg_teacher_load: f64,
    /// Sum of idle gaps over all teachers and days.
    pub teacher_idle_gaps: u32,
    /// Mean distinct working days per teacher with lessons.
    pub avg_teacher_days: f64,
    /// Violations per severity.
    pub violations_by_severity: HashMap<Severity, usize>,
}

impl TimetableKpi {
    /// Computes KPIs from a result.
    pub fn calculate(result: &ScheduleResult) -> Self {
        let placed_periods = result.entries.len() as u32;
        let required_periods: u32 = result
            .classes
            .iter()
            .map(|c| {
                result
                    .subjects
                    .iter()
                    .filter(|s| s.targets_grade(c.grade))
                    .map(|s| s.weekly_hours)
                    .sum::<u32>()
            })
            .sum();
        let fill_rate = if required_periods == 0 {
            1.0
        } else {
            f64::from(placed_periods) / f64::from(required_periods)
        };

        // Teacher load
        let hours = result.teacher_hours();
        let load_by_teacher: HashMap<String, f64> = result
            .teachers
            .iter()
            .filter(|t| t.max_weekly_hours > 0)
            .map(|t| {
                let taught = hours.get(&t.id).copied().unwrap_or(0);
                (t.id.clone(), f64::from(taught) / f64::from(t.max_weekly_hours))
            })
            .collect();
        let avg_teacher_load = if load_by_teacher.is_empty() {
            0.0
        } else {
            load_by_teacher.values().sum::<f64>() / load_by_teacher.len() as f64
        };

        // Idle gaps and days per teacher
        let mut periods: BTreeMap<(&str, &str), BTreeSet<u32>> = BTreeMap::new();
        for e in &result.entries {
            for t in &e.teacher_ids {
                periods.entry((t.as_str(), e.day.as_str())).or_default().insert(e.period);
            }
        }
        let mut teacher_idle_gaps = 0;
        let mut days_by_teacher: BTreeMap<&str, u32> = BTreeMap::new();
        for (&(teacher, _), set) in &periods {
            if let (Some(first), Some(last)) = (set.first(), set.last()) {
                teacher_idle_gaps += last - first + 1 - set.len() as u32;
            }
            *days_by_teacher.entry(teacher).or_insert(0) += 1;
        }
        let avg_teacher_days = if days_by_teacher.is_empty() {
            0.0
        } else {
            f64::from(days_by_teacher.values().sum::<u32>()) / days_by_teacher.len() as f64
        };

        let mut violations_by_severity = HashMap::new();
        for v in &result.violations {
            *violations_by_severity.entry(v.severity).or_insert(0) += 1;
        }

        Self {
            placed_periods,
            required_periods,
            fill_rate,
            load_by_teacher,
            avg_teacher_load,
            teacher_idle_gaps,
            avg_teacher_days,
            violations_by_severity,
        }
    }

    /// Number of violations of a severity.
    pub fn violations(&self, severity: Severity) -> usize {
        self.violations_by_severity.get(&severity).copied().unwrap_or(0)
    }

    /// Whether the timetable meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_fill_rate: f64, max_idle_gaps: u32) -> bool {
        self.violations(Severity::Critical) == 0
            && self.fill_rate >= min_fill_rate
            && self.teacher_idle_gaps <= max_idle_gaps
    }
}
