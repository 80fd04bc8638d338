//! CSP formulation of weekly timetabling.
//!
//! Each (class, subject) demand becomes one or more variables (see
//! [`VariableBuilder`]); each variable takes a start cell and a teacher set.
//! [`CspSolver`] assigns all of them with chronological backtracking,
//! MRV ordering and randomized value order, re-checking the critical rules
//! after every placement.
//!
//! # Reference
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", Ch. 6
//! - Schaerf (1999), "A Survey of Automated Timetabling"

mod search;
mod variable;

pub use search::{CspSolver, SolveOutcome, SolveStats};
pub use variable::{
    CspDomain, CspVariable, VariableBuilder, PRIORITY_BLOCK, PRIORITY_CO_TEACHING,
    PRIORITY_DEFAULT, PRIORITY_EXTERNAL, PRIORITY_SPECIAL_ROOM, PRIORITY_TEACHER,
};
