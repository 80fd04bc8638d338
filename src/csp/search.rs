//! Backtracking search.
//!
//! # Algorithm
//!
//! 1. Pick the unassigned variable with the fewest valid start cells (MRV).
//!    A variable with none is picked at once so the branch fails fast; ties
//!    go to the lower priority tier, then the lower subject priority.
//! 2. Shuffle its valid (cell, teacher) values with the caller's RNG.
//! 3. Place `hours_to_assign` consecutive periods, re-run the critical check
//!    on all placed entries, and recurse only if it passes.
//! 4. On failure pop the trail and try the next value.
//!
//! Placed entries live in one arena vector. Each assignment pushes a trail
//! record holding the arena length before it, so backtracking truncates
//! instead of cloning.
//!
//! # Reference
//! Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", Ch. 6.3

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::variable::{CspVariable, VariableBuilder};
use crate::models::{ConstraintKind, TimetableEntry};
use crate::validator::ConstraintValidator;

/// Search counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Placements tried.
    pub nodes: u64,
    /// Placements undone.
    pub backtracks: u64,
    /// Whether the node budget ran out.
    pub budget_exhausted: bool,
}

/// Outcome of one solver run.
#[derive(Debug, Clone, Default)]
pub struct SolveOutcome {
    /// Complete timetable, or empty if the search failed.
    pub entries: Vec<TimetableEntry>,
    /// Largest partial assignment reached (for diagnostics on failure).
    pub deepest: Vec<TimetableEntry>,
    pub stats: SolveStats,
}

impl SolveOutcome {
    /// Whether a complete timetable was found.
    pub fn is_solved(&self) -> bool {
        !self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    day: usize,
    period: u32,
}

/// A variable with its ids resolved to indices.
#[derive(Debug, Clone)]
struct Prepared {
    class: usize,
    options: Vec<Vec<usize>>,
    room: Option<usize>,
    group: usize,
    domain: usize,
    fixed: Option<Cell>,
}

#[derive(Debug, Clone, Copy)]
struct TrailRecord {
    variable: usize,
    option: usize,
    arena_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Solved,
    Failed,
    Aborted,
}

/// Boolean occupancy grids indexed by `(row, day, period)`.
#[derive(Debug, Clone)]
struct Occupancy {
    days: usize,
    width: usize,
    teacher: Vec<bool>,
    class: Vec<bool>,
    room: Vec<bool>,
}

impl Occupancy {
    fn new(days: usize, width: usize, teachers: usize, classes: usize, rooms: usize) -> Self {
        let size = |rows: usize| vec![false; rows * days * width];
        Self {
            days,
            width,
            teacher: size(teachers),
            class: size(classes),
            room: size(rooms),
        }
    }

    #[inline]
    fn index(&self, row: usize, day: usize, period: u32) -> usize {
        (row * self.days + day) * self.width + period as usize
    }
}

#[derive(Debug)]
struct SearchState {
    entries: Vec<TimetableEntry>,
    trail: Vec<TrailRecord>,
    unassigned: Vec<usize>,
    occupancy: Occupancy,
    /// Teacher option bound to each (class, subject) group, with use count.
    group_binding: Vec<Option<(usize, u32)>>,
    deepest: Vec<TimetableEntry>,
    stats: SolveStats,
}

/// CSP solver for one attempt.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use u_timetable::csp::CspSolver;
/// use u_timetable::models::{ClassInfo, ScheduleConfig, Subject, Teacher};
/// use u_timetable::validator::ConstraintValidator;
///
/// let config = ScheduleConfig::weekdays(1);
/// let classes = vec![ClassInfo::new("c1", 1, 1)];
/// let subjects = vec![Subject::new("math", 5).with_grade(1)];
/// let teachers = vec![Teacher::new("T1", 20).with_subject("math")];
///
/// let validator = ConstraintValidator::new(&config, &classes, &subjects, &teachers);
/// let solver = CspSolver::new(&validator);
/// let outcome = solver.solve(&mut ChaCha8Rng::seed_from_u64(7));
/// assert_eq!(outcome.entries.len(), 5);
/// ```
#[derive(Debug)]
pub struct CspSolver<'a> {
    validator: &'a ConstraintValidator<'a>,
    variables: Vec<CspVariable>,
    prepared: Vec<Prepared>,
    domains: Vec<Vec<Cell>>,
    /// Last period per (class, day); 0 = no lessons.
    class_bounds: Vec<Vec<u32>>,
    /// Blocked cells per teacher.
    unavailable: Vec<bool>,
    teacher_count: usize,
    class_count: usize,
    room_count: usize,
    group_count: usize,
    days: usize,
    width: usize,
    max_nodes: u64,
}

impl<'a> CspSolver<'a> {
    /// Creates a solver over every variable the inputs expand to.
    pub fn new(validator: &'a ConstraintValidator<'a>) -> Self {
        let builder = VariableBuilder::new(
            validator.config(),
            validator.classes(),
            validator.subjects(),
            validator.teachers(),
        );
        Self::with_variables(validator, builder.build())
    }

    /// Creates a solver over a given variable list.
    pub fn with_variables(
        validator: &'a ConstraintValidator<'a>,
        variables: Vec<CspVariable>,
    ) -> Self {
        let config = validator.config();
        let builder = VariableBuilder::new(
            config,
            validator.classes(),
            validator.subjects(),
            validator.teachers(),
        );
        let days = config.days.len();
        let width = config.max_period() as usize + 1;

        let teacher_index: HashMap<&str, usize> = validator
            .teachers()
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let class_index: HashMap<&str, usize> = validator
            .classes()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();

        let class_bounds: Vec<Vec<u32>> = validator
            .classes()
            .iter()
            .map(|c| {
                config
                    .days
                    .iter()
                    .map(|d| config.periods_for(c.grade, d))
                    .collect()
            })
            .collect();

        let mut unavailable = vec![false; validator.teachers().len() * days * width];
        for (row, teacher) in validator.teachers().iter().enumerate() {
            for slot in &teacher.unavailable_times {
                if let Some(day) = config.day_index(&slot.day) {
                    if (slot.period as usize) < width {
                        unavailable[(row * days + day) * width + slot.period as usize] = true;
                    }
                }
            }
        }

        let mut rooms: HashMap<String, usize> = HashMap::new();
        let mut groups: HashMap<(String, String), usize> = HashMap::new();
        let mut grade_domains: HashMap<u32, usize> = HashMap::new();
        let mut domains: Vec<Vec<Cell>> = Vec::new();
        let mut prepared = Vec::with_capacity(variables.len());
        let mut kept = Vec::with_capacity(variables.len());

        for variable in variables {
            // Variables for unknown classes cannot be placed on any grid.
            let Some(&class) = class_index.get(variable.class_id.as_str()) else {
                continue;
            };
            let options: Vec<Vec<usize>> = variable
                .teacher_options
                .iter()
                .filter_map(|set| {
                    set.iter()
                        .map(|t| teacher_index.get(t.as_str()).copied())
                        .collect::<Option<Vec<usize>>>()
                })
                .collect();

            let room = variable.room.as_ref().map(|r| {
                let next = rooms.len();
                *rooms.entry(r.clone()).or_insert(next)
            });
            let next_group = groups.len();
            let group = *groups
                .entry((variable.class_id.clone(), variable.subject_id.clone()))
                .or_insert(next_group);
            let domain = *grade_domains.entry(variable.grade).or_insert_with(|| {
                domains.push(
                    builder
                        .domain(variable.grade)
                        .into_iter()
                        .filter_map(|d| {
                            config.day_index(&d.day).map(|day| Cell {
                                day,
                                period: d.period,
                            })
                        })
                        .collect(),
                );
                domains.len() - 1
            });
            let fixed = variable.fixed_slot.as_ref().map(|slot| Cell {
                day: config.day_index(&slot.day).unwrap_or(usize::MAX),
                period: slot.period,
            });

            prepared.push(Prepared {
                class,
                options,
                room,
                group,
                domain,
                fixed,
            });
            kept.push(variable);
        }

        Self {
            validator,
            variables: kept,
            prepared,
            domains,
            class_bounds,
            unavailable,
            teacher_count: validator.teachers().len(),
            class_count: validator.classes().len(),
            room_count: rooms.len(),
            group_count: groups.len(),
            days,
            width,
            max_nodes: u64::MAX,
        }
    }

    /// Caps the number of placements one run may try.
    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.max_nodes = max_nodes.max(1);
        self
    }

    /// Variables this solver places.
    pub fn variables(&self) -> &[CspVariable] {
        &self.variables
    }

    /// Runs the search.
    ///
    /// The result depends only on the inputs and the RNG state, so two
    /// solvers over the same inputs with equally seeded RNGs return the same
    /// entries.
    pub fn solve<R: Rng + ?Sized>(&self, rng: &mut R) -> SolveOutcome {
        let mut state = self.initial_state();

        let step = self.search(&mut state, rng);
        debug!(
            event = "solve_end",
            variables = self.variables.len(),
            nodes = state.stats.nodes,
            backtracks = state.stats.backtracks,
            solved = step == Step::Solved,
        );

        let entries = if step == Step::Solved {
            std::mem::take(&mut state.entries)
        } else {
            Vec::new()
        };
        SolveOutcome {
            deepest: if step == Step::Solved {
                entries.clone()
            } else {
                state.deepest
            },
            entries,
            stats: state.stats,
        }
    }

    fn initial_state(&self) -> SearchState {
        SearchState {
            entries: Vec::new(),
            trail: Vec::with_capacity(self.variables.len()),
            unassigned: (0..self.variables.len()).collect(),
            occupancy: Occupancy::new(
                self.days,
                self.width,
                self.teacher_count,
                self.class_count,
                self.room_count,
            ),
            group_binding: vec![None; self.group_count],
            deepest: Vec::new(),
            stats: SolveStats::default(),
        }
    }

    fn search<R: Rng + ?Sized>(&self, state: &mut SearchState, rng: &mut R) -> Step {
        if state.unassigned.is_empty() {
            return if self.validator.has_critical_violations(&state.entries) {
                Step::Failed
            } else {
                Step::Solved
            };
        }

        let position = self.select_variable(state);
        let variable = state.unassigned.remove(position);
        let mut values = self.valid_values(state, variable);
        values.shuffle(rng);

        for (cell, option) in values {
            state.stats.nodes += 1;
            if state.stats.nodes > self.max_nodes {
                state.stats.budget_exhausted = true;
                return Step::Aborted;
            }

            self.place(state, variable, cell, option);
            if !self.validator.has_critical_violations(&state.entries) {
                if state.entries.len() > state.deepest.len() {
                    state.deepest.clone_from(&state.entries);
                }
                match self.search(state, rng) {
                    Step::Solved => return Step::Solved,
                    Step::Aborted => return Step::Aborted,
                    Step::Failed => {}
                }
            }
            self.undo(state);
            state.stats.backtracks += 1;
        }

        state.unassigned.insert(position, variable);
        Step::Failed
    }

    /// Position in `unassigned` of the most constrained variable.
    fn select_variable(&self, state: &SearchState) -> usize {
        let mut best = 0;
        let mut best_key = (usize::MAX, i32::MAX, i32::MAX);

        for (position, &variable) in state.unassigned.iter().enumerate() {
            let count = self.count_values(state, variable);
            if count == 0 {
                return position;
            }
            let v = &self.variables[variable];
            let key = (count, v.priority, v.subject_priority);
            if key < best_key {
                best_key = key;
                best = position;
            }
        }
        best
    }

    fn candidate_options(&self, state: &SearchState, variable: usize) -> std::ops::Range<usize> {
        let prepared = &self.prepared[variable];
        match state.group_binding[prepared.group] {
            Some((option, _)) => option..option + 1,
            None => 0..prepared.options.len(),
        }
    }

    fn count_values(&self, state: &SearchState, variable: usize) -> usize {
        let prepared = &self.prepared[variable];
        let mut count = 0;
        for &cell in &self.domains[prepared.domain] {
            for option in self.candidate_options(state, variable) {
                if self.fits(state, variable, cell, option) {
                    count += 1;
                }
            }
        }
        count
    }

    fn valid_values(&self, state: &SearchState, variable: usize) -> Vec<(Cell, usize)> {
        let prepared = &self.prepared[variable];
        let mut values = Vec::new();
        for &cell in &self.domains[prepared.domain] {
            for option in self.candidate_options(state, variable) {
                if self.fits(state, variable, cell, option) {
                    values.push((cell, option));
                }
            }
        }
        values
    }

    /// Whether the whole run of `hours_to_assign` periods starting at `cell`
    /// stays inside the day and every period passes the single-cell filter.
    fn fits(&self, state: &SearchState, variable: usize, cell: Cell, option: usize) -> bool {
        let prepared = &self.prepared[variable];
        if let Some(fixed) = prepared.fixed {
            if fixed != cell {
                return false;
            }
        }
        let hours = self.variables[variable].hours_to_assign;
        let bound = self.class_bounds[prepared.class][cell.day];
        if cell.period + hours - 1 > bound {
            return false;
        }
        (0..hours).all(|h| self.cell_free(state, prepared, option, cell.day, cell.period + h))
    }

    fn cell_free(
        &self,
        state: &SearchState,
        prepared: &Prepared,
        option: usize,
        day: usize,
        period: u32,
    ) -> bool {
        let occ = &state.occupancy;
        let v = self.validator;

        if v.is_enabled(ConstraintKind::ClassConflict)
            && occ.class[occ.index(prepared.class, day, period)]
        {
            return false;
        }
        if let Some(room) = prepared.room {
            if v.is_enabled(ConstraintKind::RoomConflict)
                && occ.room[occ.index(room, day, period)]
            {
                return false;
            }
        }
        prepared.options[option].iter().all(|&t| {
            let index = occ.index(t, day, period);
            !(v.is_enabled(ConstraintKind::TeacherUnavailable) && self.unavailable[index])
                && !(v.is_enabled(ConstraintKind::TeacherConflict) && occ.teacher[index])
        })
    }

    fn place(&self, state: &mut SearchState, variable: usize, cell: Cell, option: usize) {
        let prepared = &self.prepared[variable];
        let source = &self.variables[variable];
        let day = &self.validator.config().days[cell.day];

        state.trail.push(TrailRecord {
            variable,
            option,
            arena_len: state.entries.len(),
        });

        for h in 0..source.hours_to_assign {
            let period = cell.period + h;
            let mut entry = TimetableEntry::new(
                format!("{}-{}-{}", source.class_id, source.subject_id, state.entries.len()),
                &source.class_id,
                &source.subject_id,
                source.teacher_options[option].clone(),
                day.clone(),
                period,
            )
            .with_room(source.room.clone())
            .with_fixed(prepared.fixed.is_some());
            if source.is_block {
                entry = entry.with_block_start(cell.period);
            }
            state.entries.push(entry);
            self.mark(state, prepared, option, cell.day, period, true);
        }

        let binding = &mut state.group_binding[prepared.group];
        *binding = match *binding {
            Some((bound, uses)) => Some((bound, uses + 1)),
            None => Some((option, 1)),
        };
    }

    fn undo(&self, state: &mut SearchState) {
        let Some(record) = state.trail.pop() else {
            return;
        };
        let prepared = &self.prepared[record.variable];
        let config = self.validator.config();

        for index in record.arena_len..state.entries.len() {
            let entry = &state.entries[index];
            let (day, period) = (config.day_index(&entry.day).unwrap_or(0), entry.period);
            self.mark(state, prepared, record.option, day, period, false);
        }
        state.entries.truncate(record.arena_len);

        let binding = &mut state.group_binding[prepared.group];
        *binding = match *binding {
            Some((bound, uses)) if uses > 1 => Some((bound, uses - 1)),
            _ => None,
        };
    }

    fn mark(
        &self,
        state: &mut SearchState,
        prepared: &Prepared,
        option: usize,
        day: usize,
        period: u32,
        value: bool,
    ) {
        let occ = &mut state.occupancy;
        let index = occ.index(prepared.class, day, period);
        occ.class[index] = value;
        if let Some(room) = prepared.room {
            let index = occ.index(room, day, period);
            occ.room[index] = value;
        }
        for &t in &prepared.options[option] {
            let index = occ.index(t, day, period);
            occ.teacher[index] = value;
        }
    }
}
