//! School class model.

use serde::{Deserialize, Serialize};

/// A school class (homeroom) that receives lessons.
///
/// The `id` is the identity of the class and does not change once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    /// Unique class identifier.
    pub id: String,
    /// Grade (year) of the class.
    pub grade: u32,
    /// Class number within the grade.
    pub class_number: u32,
    /// Display name (e.g. "1-2").
    #[serde(default)]
    pub name: String,
    /// Lunch marker overriding [`super::ScheduleConfig::lunch_after_period`].
    #[serde(default)]
    pub lunch_period: Option<u32>,
}

impl ClassInfo {
    /// Creates a class. The display name defaults to `"{grade}-{class_number}"`.
    pub fn new(id: impl Into<String>, grade: u32, class_number: u32) -> Self {
        Self {
            id: id.into(),
            grade,
            class_number,
            name: format!("{grade}-{class_number}"),
            lunch_period: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a class-specific lunch marker.
    pub fn with_lunch_period(mut self, period: u32) -> Self {
        self.lunch_period = Some(period);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name() {
        let c = ClassInfo::new("c1", 2, 3);
        assert_eq!(c.name, "2-3");
        assert_eq!(c.lunch_period, None);
    }

    #[test]
    fn test_lunch_override() {
        let c = ClassInfo::new("c1", 1, 1).with_lunch_period(3);
        assert_eq!(c.lunch_period, Some(3));
    }
}
