//! Local-search refinement of a feasible timetable.
//!
//! # Algorithm
//!
//! Hill climbing over pairwise swaps: for every unordered pair of movable
//! entries, exchange their `(day, period)` cells, keep the swap if it
//! introduces no critical violation and strictly lowers the score, revert
//! otherwise. Sweeps repeat until one yields no improvement or the sweep
//! limit is reached.
//!
//! After each sweep a teacher-day consolidation pass moves a teacher's
//! lessons toward the day already holding most of them, swapping with a
//! lesson of the same class on that day. These swaps are kept when the score
//! does not increase.
//!
//! Block and fixed entries are never moved, and no entry is moved to a cell
//! outside its class's grid.
//!
//! # Reference
//! Aarts & Lenstra (2003), "Local Search in Combinatorial Optimization", Ch. 1

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::TimetableEntry;
use crate::validator::ConstraintValidator;

/// Counters from one optimizer run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizeStats {
    /// Full sweeps performed.
    pub sweeps: u32,
    /// Pairwise swaps kept.
    pub swaps: u32,
    /// Consolidation swaps kept.
    pub consolidations: u32,
    pub initial_score: f64,
    pub final_score: f64,
}

/// Pairwise-swap hill climber.
#[derive(Debug, Clone)]
pub struct LocalSearchOptimizer<'a> {
    validator: &'a ConstraintValidator<'a>,
    max_iterations: u32,
}

impl<'a> LocalSearchOptimizer<'a> {
    /// Creates an optimizer with the default sweep limit (100).
    pub fn new(validator: &'a ConstraintValidator<'a>) -> Self {
        Self {
            validator,
            max_iterations: 100,
        }
    }

    /// Sets the sweep limit.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Optimizes a timetable, discarding the counters.
    pub fn optimize(&self, entries: Vec<TimetableEntry>) -> Vec<TimetableEntry> {
        self.optimize_with_stats(entries).0
    }

    /// Optimizes a timetable.
    ///
    /// The returned timetable never scores higher than the input and never
    /// has more critical violations.
    pub fn optimize_with_stats(
        &self,
        mut entries: Vec<TimetableEntry>,
    ) -> (Vec<TimetableEntry>, OptimizeStats) {
        let mut stats = OptimizeStats {
            initial_score: self.validator.calculate_score(&entries),
            ..OptimizeStats::default()
        };
        let critical_budget = self.validator.critical_violations(&entries).len();
        let mut score = stats.initial_score;

        while stats.sweeps < self.max_iterations {
            stats.sweeps += 1;
            let improved = self.sweep(&mut entries, &mut score, critical_budget, &mut stats);
            stats.consolidations += self.consolidate(&mut entries, &mut score, critical_budget);
            if !improved {
                break;
            }
        }

        stats.final_score = score;
        debug!(
            event = "optimize_end",
            sweeps = stats.sweeps,
            swaps = stats.swaps,
            consolidations = stats.consolidations,
            initial_score = stats.initial_score,
            final_score = stats.final_score,
        );
        (entries, stats)
    }

    /// One pass over all pairs. Returns whether any swap was kept.
    fn sweep(
        &self,
        entries: &mut [TimetableEntry],
        score: &mut f64,
        critical_budget: usize,
        stats: &mut OptimizeStats,
    ) -> bool {
        let mut improved = false;
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                if !self.can_swap(&entries[i], &entries[j]) {
                    continue;
                }
                swap_cells(entries, i, j);
                if self.within_critical_budget(entries, critical_budget) {
                    let candidate = self.validator.calculate_score(entries);
                    if candidate < *score {
                        *score = candidate;
                        stats.swaps += 1;
                        improved = true;
                        continue;
                    }
                }
                swap_cells(entries, i, j);
            }
        }
        improved
    }

    /// Moves each teacher's off-day lessons toward the teacher's busiest day.
    /// Returns the number of swaps kept.
    fn consolidate(
        &self,
        entries: &mut [TimetableEntry],
        score: &mut f64,
        critical_budget: usize,
    ) -> u32 {
        let config = self.validator.config();
        let mut kept = 0;

        let mut teachers: Vec<String> = entries
            .iter()
            .flat_map(|e| e.teacher_ids.iter().cloned())
            .collect();
        teachers.sort();
        teachers.dedup();

        for teacher in &teachers {
            let mut per_day: BTreeMap<usize, usize> = BTreeMap::new();
            for e in entries.iter().filter(|e| e.has_teacher(teacher)) {
                if let Some(day) = config.day_index(&e.day) {
                    *per_day.entry(day).or_insert(0) += 1;
                }
            }
            // Busiest day; the earliest wins a tie.
            let Some(dominant) = per_day
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                .map(|(&day, _)| config.days[day].clone())
            else {
                continue;
            };

            for i in 0..entries.len() {
                let e = &entries[i];
                if !e.has_teacher(teacher) || e.day == dominant || e.is_block || e.is_fixed {
                    continue;
                }
                let partners: Vec<usize> = (0..entries.len())
                    .filter(|&j| {
                        let p = &entries[j];
                        p.day == dominant
                            && p.class_id == entries[i].class_id
                            && !p.has_teacher(teacher)
                            && self.can_swap(&entries[i], p)
                    })
                    .collect();

                for j in partners {
                    swap_cells(entries, i, j);
                    if self.within_critical_budget(entries, critical_budget) {
                        let candidate = self.validator.calculate_score(entries);
                        if candidate <= *score {
                            *score = candidate;
                            kept += 1;
                            break;
                        }
                    }
                    swap_cells(entries, i, j);
                }
            }
        }
        kept
    }

    /// Allowed move whose two target cells lie inside each entry's class grid.
    fn can_swap(&self, a: &TimetableEntry, b: &TimetableEntry) -> bool {
        swappable(a, b)
            && self.validator.in_class_grid(&a.class_id, &b.day, b.period)
            && self.validator.in_class_grid(&b.class_id, &a.day, a.period)
    }

    fn within_critical_budget(&self, entries: &[TimetableEntry], budget: usize) -> bool {
        if budget == 0 {
            !self.validator.has_critical_violations(entries)
        } else {
            self.validator.critical_violations(entries).len() <= budget
        }
    }
}

/// Whether exchanging the cells of two entries is a real, allowed move.
fn swappable(a: &TimetableEntry, b: &TimetableEntry) -> bool {
    if a.is_block || b.is_block || a.is_fixed || b.is_fixed {
        return false;
    }
    if a.day == b.day && a.period == b.period {
        return false;
    }
    // Same lesson of the same class: swapping changes nothing.
    !(a.class_id == b.class_id
        && a.subject_id == b.subject_id
        && a.teacher_ids == b.teacher_ids
        && a.room == b.room)
}

fn swap_cells(entries: &mut [TimetableEntry], i: usize, j: usize) {
    let (day, period) = (entries[i].day.clone(), entries[i].period);
    entries[i].day = std::mem::replace(&mut entries[j].day, day);
    entries[i].period = std::mem::replace(&mut entries[j].period, period);
}
