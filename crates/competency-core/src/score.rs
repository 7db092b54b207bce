//! # Assessment Scores
//!
//! A score is either a raw percentage or points over a maximum. Both forms are
//! normalized to hundredths of a percent so that every comparison stays in
//! integer arithmetic.

use crate::CompetencyError;
use crate::primitives::{DEFAULT_PASSING_THRESHOLD, FULL_SCORE, SCORE_SCALE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter grade derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Lower bound of each grade in whole percent, best grade first.
    const TABLE: [(u32, Grade); 4] = [
        (90, Grade::A),
        (80, Grade::B),
        (70, Grade::C),
        (60, Grade::D),
    ];

    fn for_hundredths(hundredths: u32) -> Self {
        Self::TABLE
            .iter()
            .find(|(floor, _)| hundredths >= floor * SCORE_SCALE)
            .map_or(Grade::F, |(_, grade)| *grade)
    }

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Grade::A => 'A',
            Grade::B => 'B',
            Grade::C => 'C',
            Grade::D => 'D',
            Grade::F => 'F',
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A normalized assessment score in `[0, 100]` percent.
///
/// Stored as hundredths of a percent (`0..=10000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AssessmentScore {
    hundredths: u32,
}

impl AssessmentScore {
    /// Score from a whole percentage.
    pub fn from_percentage(percentage: u8) -> Result<Self, CompetencyError> {
        if percentage > 100 {
            return Err(CompetencyError::validation(format!(
                "Score must be between 0 and 100, got {}",
                percentage
            )));
        }
        Ok(Self {
            hundredths: u32::from(percentage) * SCORE_SCALE,
        })
    }

    /// Score from points over a maximum, truncated to a hundredth of a percent.
    ///
    /// Truncation keeps a ratio below a threshold or grade cutoff below it.
    pub fn from_points(points: u32, max_points: u32) -> Result<Self, CompetencyError> {
        if max_points == 0 {
            return Err(CompetencyError::validation(
                "Maximum points must be greater than zero",
            ));
        }
        if points > max_points {
            return Err(CompetencyError::validation(format!(
                "Points {} exceed maximum {}",
                points, max_points
            )));
        }

        let hundredths = u64::from(points) * u64::from(FULL_SCORE) / u64::from(max_points);

        Ok(Self {
            hundredths: hundredths as u32,
        })
    }

    /// Score from hundredths of a percent.
    pub fn from_hundredths(hundredths: u32) -> Result<Self, CompetencyError> {
        if hundredths > FULL_SCORE {
            return Err(CompetencyError::validation(format!(
                "Score {} hundredths exceeds {}",
                hundredths, FULL_SCORE
            )));
        }
        Ok(Self { hundredths })
    }

    /// The score in hundredths of a percent.
    #[must_use]
    pub const fn hundredths(self) -> u32 {
        self.hundredths
    }

    /// The score rounded half-up to a whole percent.
    #[must_use]
    pub fn rounded_percentage(self) -> u8 {
        ((self.hundredths + SCORE_SCALE / 2) / SCORE_SCALE) as u8
    }

    /// True when the score reaches `threshold` percent.
    #[must_use]
    pub fn is_passing(self, threshold: u8) -> bool {
        self.hundredths >= u32::from(threshold) * SCORE_SCALE
    }

    /// True when the score reaches the default threshold of 70%.
    #[must_use]
    pub fn is_passing_default(self) -> bool {
        self.is_passing(DEFAULT_PASSING_THRESHOLD)
    }

    /// Letter grade for the score, A at 90% down to F below 60%.
    #[must_use]
    pub fn grade(self) -> Grade {
        Grade::for_hundredths(self.hundredths)
    }
}

impl TryFrom<u32> for AssessmentScore {
    type Error = CompetencyError;

    fn try_from(hundredths: u32) -> Result<Self, Self::Error> {
        Self::from_hundredths(hundredths)
    }
}

impl From<AssessmentScore> for u32 {
    fn from(score: AssessmentScore) -> Self {
        score.hundredths
    }
}

impl fmt::Display for AssessmentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}%",
            self.hundredths / SCORE_SCALE,
            self.hundredths % SCORE_SCALE
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_bounds() {
        assert!(AssessmentScore::from_percentage(0).is_ok());
        assert!(AssessmentScore::from_percentage(100).is_ok());
        assert!(AssessmentScore::from_percentage(101).is_err());
    }

    #[test]
    fn points_are_normalized() {
        let score = AssessmentScore::from_points(45, 50).expect("score");
        assert_eq!(score.hundredths(), 9000);
        assert_eq!(score.rounded_percentage(), 90);

        // 2/3 = 66.666..% -> 66.66%
        let third = AssessmentScore::from_points(2, 3).expect("score");
        assert_eq!(third.hundredths(), 6666);
        assert_eq!(third.rounded_percentage(), 67);
    }

    #[test]
    fn points_validation() {
        assert!(AssessmentScore::from_points(1, 0).is_err());
        assert!(AssessmentScore::from_points(11, 10).is_err());
        assert!(AssessmentScore::from_points(0, 10).is_ok());
    }

    #[test]
    fn passing_threshold_boundary() {
        let below = AssessmentScore::from_points(6999, 10000).expect("score");
        let at = AssessmentScore::from_percentage(70).expect("score");

        assert!(!below.is_passing_default());
        assert!(at.is_passing_default());
        assert!(!at.is_passing(80));
    }

    #[test]
    fn fraction_below_threshold_does_not_pass() {
        let just_below = AssessmentScore::from_points(69_995, 100_000).expect("score");
        assert_eq!(just_below.hundredths(), 6999);
        assert!(!just_below.is_passing_default());

        let exact = AssessmentScore::from_points(70_000, 100_000).expect("score");
        assert!(exact.is_passing_default());

        let near_ninety = AssessmentScore::from_points(89_995, 100_000).expect("score");
        assert!(!near_ninety.is_passing(90));
        assert!(AssessmentScore::from_points(9, 10).expect("score").is_passing(90));
    }

    #[test]
    fn fraction_below_cutoff_keeps_lower_grade() {
        for (cutoff, grade) in Grade::TABLE {
            let max = 100_000;
            let at = AssessmentScore::from_points(cutoff * 1000, max).expect("score");
            let below = AssessmentScore::from_points(cutoff * 1000 - 5, max).expect("score");

            assert_eq!(at.grade(), grade, "{cutoff}% exactly");
            assert!(below.grade() > grade, "{cutoff}% minus a fraction");
        }
    }

    #[test]
    fn grade_table() {
        let grade = |p| AssessmentScore::from_percentage(p).expect("score").grade();
        assert_eq!(grade(100), Grade::A);
        assert_eq!(grade(90), Grade::A);
        assert_eq!(grade(89), Grade::B);
        assert_eq!(grade(80), Grade::B);
        assert_eq!(grade(70), Grade::C);
        assert_eq!(grade(60), Grade::D);
        assert_eq!(grade(59), Grade::F);
        assert_eq!(grade(0), Grade::F);
    }

    #[test]
    fn display_shows_two_decimals() {
        let score = AssessmentScore::from_points(2, 3).expect("score");
        assert_eq!(score.to_string(), "66.66%");
        assert_eq!(Grade::B.to_string(), "B");
    }
}
