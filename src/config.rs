//! Engine configuration.
//!
//! Search budgets, orchestration limits, relaxation policy, and the
//! soft-constraint weight table. Loadable from TOML.
//!
//! # Example
//!
//! ```
//! use u_timetable::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     seed = 42
//!     max_backtracks = 5000
//!
//!     [relaxation]
//!     allow_high = true
//!
//!     [weights]
//!     consecutive_periods = 25.0
//! "#).unwrap();
//!
//! assert_eq!(config.seed, Some(42));
//! assert!(config.relaxation.allow_high);
//! assert!(!config.relaxation.allow_critical);
//! assert_eq!(config.weights.consecutive_periods, 25.0);
//! assert_eq!(config.optimizer_iterations, 100);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ConstraintKind, Severity};

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base random seed. `None` = derive from the clock.
    pub seed: Option<u64>,
    /// Search nodes a single solver attempt may expand before giving up.
    pub max_backtracks: u64,
    /// Maximum optimizer sweeps.
    pub optimizer_iterations: u32,
    /// Attempts made by `generate_with_retry`.
    pub retry_count: u32,
    /// Distinct results `generate_multiple` tries to collect.
    pub min_count: u32,
    /// Attempt cap for `generate_multiple`.
    pub max_attempts: u32,
    /// Failed attempts before a relaxation round is triggered.
    pub failures_before_relaxation: u32,
    /// Maximum relaxation rounds.
    pub max_relaxation_rounds: u32,
    /// Which severities may be relaxed automatically.
    pub relaxation: RelaxationPolicy,
    /// Soft-constraint weights.
    pub weights: ScoreWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_backtracks: 20_000,
            optimizer_iterations: 100,
            retry_count: 5,
            min_count: 3,
            max_attempts: 30,
            failures_before_relaxation: 10,
            max_relaxation_rounds: 3,
            relaxation: RelaxationPolicy::default(),
            weights: ScoreWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, contains invalid TOML, or
    /// fails [`EngineConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_backtracks == 0 {
            return Err(ConfigError::Invalid("max_backtracks must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if self.failures_before_relaxation == 0 {
            return Err(ConfigError::Invalid(
                "failures_before_relaxation must be at least 1".into(),
            ));
        }
        if let Some(kind) = self.weights.negative_kind() {
            return Err(ConfigError::Invalid(format!("weight for {kind} is negative")));
        }
        Ok(())
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the search node budget.
    pub fn with_max_backtracks(mut self, max_backtracks: u64) -> Self {
        self.max_backtracks = max_backtracks;
        self
    }

    /// Sets the relaxation policy.
    pub fn with_relaxation(mut self, policy: RelaxationPolicy) -> Self {
        self.relaxation = policy;
        self
    }
}

/// Which severities the relaxer may act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelaxationPolicy {
    pub allow_low: bool,
    pub allow_medium: bool,
    pub allow_high: bool,
    /// Critical rules are never relaxed automatically unless this is set.
    pub allow_critical: bool,
}

impl Default for RelaxationPolicy {
    fn default() -> Self {
        Self {
            allow_low: true,
            allow_medium: true,
            allow_high: false,
            allow_critical: false,
        }
    }
}

impl RelaxationPolicy {
    /// Whether a severity level may be relaxed.
    pub fn allows(&self, severity: Severity) -> bool {
        match severity {
            Severity::Low => self.allow_low,
            Severity::Medium => self.allow_medium,
            Severity::High => self.allow_high,
            Severity::Critical => self.allow_critical,
        }
    }
}

/// Penalty per violation (or per unit of `amount`) for each rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Flat penalty per critical violation.
    pub critical: f64,
    /// Per missing period.
    pub hours_unmet: f64,
    /// Per period over the cap.
    pub teacher_overload: f64,
    pub priority_teacher_preference: f64,
    /// Per period beyond the second in a run.
    pub consecutive_periods: f64,
    pub pre_lunch_concentration: f64,
    pub preferred_day_mismatch: f64,
    /// Per extra day used.
    pub external_spread: f64,
    pub room_change: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            critical: 10_000.0,
            hours_unmet: 100.0,
            teacher_overload: 50.0,
            priority_teacher_preference: 30.0,
            consecutive_periods: 10.0,
            pre_lunch_concentration: 5.0,
            preferred_day_mismatch: 3.0,
            external_spread: 4.0,
            room_change: 2.0,
        }
    }
}

impl ScoreWeights {
    /// Weight for a rule.
    pub fn weight(&self, kind: ConstraintKind) -> f64 {
        match kind {
            ConstraintKind::TeacherConflict
            | ConstraintKind::ClassConflict
            | ConstraintKind::TeacherUnavailable
            | ConstraintKind::RoomConflict
            | ConstraintKind::BlockContiguity
            | ConstraintKind::OutsideGrid => self.critical,
            ConstraintKind::HoursUnmet => self.hours_unmet,
            ConstraintKind::TeacherOverload => self.teacher_overload,
            ConstraintKind::PriorityTeacherPreference => self.priority_teacher_preference,
            ConstraintKind::ConsecutivePeriods => self.consecutive_periods,
            ConstraintKind::PreLunchConcentration => self.pre_lunch_concentration,
            ConstraintKind::PreferredDayMismatch => self.preferred_day_mismatch,
            ConstraintKind::ExternalSpread => self.external_spread,
            ConstraintKind::RoomChange => self.room_change,
        }
    }

    fn negative_kind(&self) -> Option<ConstraintKind> {
        ConstraintKind::ALL
            .into_iter()
            .find(|&k| self.weight(k) < 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.optimizer_iterations, 100);
        assert_eq!(c.failures_before_relaxation, 10);
        assert_eq!(c.max_relaxation_rounds, 3);
        assert!(c.relaxation.allows(Severity::Low));
        assert!(c.relaxation.allows(Severity::Medium));
        assert!(!c.relaxation.allows(Severity::High));
        assert!(!c.relaxation.allows(Severity::Critical));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let c = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(c, EngineConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        let err = EngineConfig::from_toml_str("max_attempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_toml_str("[weights]\nroom_change = -1.0").unwrap_err();
        assert!(err.to_string().contains("room change"));
    }

    #[test]
    fn test_parse_error() {
        let err = EngineConfig::from_toml_str("seed = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let c = EngineConfig::load("does/not/exist.toml").unwrap_or_default();
        assert_eq!(c.max_attempts, 30);
    }

    #[test]
    fn test_weight_lookup() {
        let w = ScoreWeights::default();
        assert_eq!(w.weight(ConstraintKind::RoomConflict), w.critical);
        assert_eq!(w.weight(ConstraintKind::HoursUnmet), 100.0);
    }
}
