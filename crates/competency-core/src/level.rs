//! # Proficiency Levels
//!
//! The five ordinal proficiency levels shared by every competency.
//!
//! | Value | Name         |
//! |-------|--------------|
//! | 1     | Beginner     |
//! | 2     | Elementary   |
//! | 3     | Intermediate |
//! | 4     | Advanced     |
//! | 5     | Expert       |
//!
//! All comparisons operate on the raw ordinal.

use crate::CompetencyError;
use crate::primitives::{MAX_LEVEL, MIN_LEVEL};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordinal proficiency level in `[1, 5]`.
///
/// Serialized as its ordinal value; deserializing an out-of-range number fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum CompetencyLevel {
    Beginner = 1,
    Elementary = 2,
    Intermediate = 3,
    Advanced = 4,
    Expert = 5,
}

impl CompetencyLevel {
    /// Every level, lowest first.
    pub const ALL: [CompetencyLevel; 5] = [
        CompetencyLevel::Beginner,
        CompetencyLevel::Elementary,
        CompetencyLevel::Intermediate,
        CompetencyLevel::Advanced,
        CompetencyLevel::Expert,
    ];

    /// Build a level from its ordinal value.
    pub fn from_value(value: u8) -> Result<Self, CompetencyError> {
        match value {
            1 => Ok(Self::Beginner),
            2 => Ok(Self::Elementary),
            3 => Ok(Self::Intermediate),
            4 => Ok(Self::Advanced),
            5 => Ok(Self::Expert),
            other => Err(CompetencyError::validation(format!(
                "Level {} is outside {}..={}",
                other, MIN_LEVEL, MAX_LEVEL
            ))),
        }
    }

    /// Build a level from its name (`"beginner"`, `"Expert"`, ...).
    pub fn from_name(name: &str) -> Result<Self, CompetencyError> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CompetencyError::validation(format!("Invalid level: {}", name)))
    }

    /// The raw ordinal value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Elementary => "Elementary",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
            Self::Expert => "Expert",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Beginner => "Basic awareness; needs guidance for routine tasks",
            Self::Elementary => "Handles simple tasks independently",
            Self::Intermediate => "Works independently on typical tasks",
            Self::Advanced => "Handles complex tasks and guides others",
            Self::Expert => "Recognised authority; shapes practice across the organisation",
        }
    }

    #[must_use]
    pub fn is_lower_than(self, other: CompetencyLevel) -> bool {
        self.value() < other.value()
    }

    #[must_use]
    pub fn is_above(self, other: CompetencyLevel) -> bool {
        self.value() > other.value()
    }

    /// True when this level satisfies `required`.
    #[must_use]
    pub fn meets_requirement(self, required: CompetencyLevel) -> bool {
        self.value() >= required.value()
    }

    /// Signed distance from this level to `target` (`target - self`).
    ///
    /// Negative when this level is already above the target.
    #[must_use]
    pub fn gap_to(self, target: CompetencyLevel) -> i8 {
        target.value() as i8 - self.value() as i8
    }

    /// The level above this one, if any.
    #[must_use]
    pub fn next(self) -> Option<CompetencyLevel> {
        Self::from_value(self.value().saturating_add(1)).ok()
    }

    /// The level below this one, if any.
    #[must_use]
    pub fn previous(self) -> Option<CompetencyLevel> {
        Self::from_value(self.value().saturating_sub(1)).ok()
    }
}

impl TryFrom<u8> for CompetencyLevel {
    type Error = CompetencyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<CompetencyLevel> for u8 {
    fn from(level: CompetencyLevel) -> Self {
        level.value()
    }
}

impl fmt::Display for CompetencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.value())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_ordinal() {
        let values: Vec<u8> = CompetencyLevel::ALL.iter().map(|l| l.value()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn from_value_rejects_out_of_range() {
        assert!(CompetencyLevel::from_value(0).is_err());
        assert!(CompetencyLevel::from_value(6).is_err());
        assert_eq!(
            CompetencyLevel::from_value(3).expect("level"),
            CompetencyLevel::Intermediate
        );
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(
            CompetencyLevel::from_name("advanced").expect("level"),
            CompetencyLevel::Advanced
        );
        assert_eq!(
            CompetencyLevel::from_name(" EXPERT ").expect("level"),
            CompetencyLevel::Expert
        );
        assert!(CompetencyLevel::from_name("guru").is_err());
    }

    #[test]
    fn gap_to_is_signed() {
        assert_eq!(
            CompetencyLevel::Beginner.gap_to(CompetencyLevel::Advanced),
            3
        );
        assert_eq!(CompetencyLevel::Expert.gap_to(CompetencyLevel::Elementary), -3);
        assert_eq!(CompetencyLevel::Advanced.gap_to(CompetencyLevel::Advanced), 0);
    }

    #[test]
    fn meets_requirement_and_comparisons() {
        assert!(CompetencyLevel::Advanced.meets_requirement(CompetencyLevel::Advanced));
        assert!(CompetencyLevel::Expert.meets_requirement(CompetencyLevel::Beginner));
        assert!(!CompetencyLevel::Elementary.meets_requirement(CompetencyLevel::Intermediate));
        assert!(CompetencyLevel::Beginner.is_lower_than(CompetencyLevel::Elementary));
        assert!(!CompetencyLevel::Advanced.is_above(CompetencyLevel::Advanced));
    }

    #[test]
    fn next_and_previous_stop_at_bounds() {
        assert_eq!(CompetencyLevel::Expert.next(), None);
        assert_eq!(CompetencyLevel::Beginner.previous(), None);
        assert_eq!(
            CompetencyLevel::Elementary.next(),
            Some(CompetencyLevel::Intermediate)
        );
    }

    #[test]
    fn serde_uses_ordinal() {
        let bytes = postcard::to_stdvec(&CompetencyLevel::Advanced).expect("encode");
        assert_eq!(bytes, vec![4]);

        let out_of_range: Result<CompetencyLevel, _> = postcard::from_bytes(&[9]);
        assert!(out_of_range.is_err());
    }

    #[test]
    fn display_includes_value() {
        assert_eq!(CompetencyLevel::Intermediate.to_string(), "Intermediate (3)");
    }
}
