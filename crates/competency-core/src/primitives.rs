//! # Engine Primitives
//!
//! Hardcoded constants for the competency engine.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Callers that need a different passing threshold or validity window pass it
//! explicitly to the operations that accept one.

/// Lowest ordinal proficiency level.
pub const MIN_LEVEL: u8 = 1;

/// Highest ordinal proficiency level.
pub const MAX_LEVEL: u8 = 5;

/// Default passing threshold for an assessment score, in whole percent.
pub const DEFAULT_PASSING_THRESHOLD: u8 = 70;

/// Scores are stored as hundredths of a percent (fixed-point, no floats).
pub const SCORE_SCALE: u32 = 100;

/// Full score expressed in hundredths of a percent.
pub const FULL_SCORE: u32 = 100 * SCORE_SCALE;

/// Assessments older than this many days are considered stale.
pub const ASSESSMENT_VALIDITY_DAYS: i64 = 365;

/// Score (whole percent) at which the next level is recommended.
pub const NEXT_LEVEL_SCORE: u8 = 80;

/// Magic bytes for the workspace snapshot header.
///
/// - File Header = Magic Bytes ("CMPT") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"CMPT";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// GAP ANALYSIS LIMITS
// =============================================================================

/// Number of core competencies named by the high-priority recommendation.
pub const HIGH_PRIORITY_LIMIT: usize = 3;

/// A gap of exactly this many levels is a "quick win".
pub const QUICK_WIN_GAP: u8 = 1;

/// Number of core gaps reported as `priority_gaps`.
pub const PRIORITY_GAP_LIMIT: usize = 5;

/// Core gaps scheduled into development phase 1.
pub const PHASE_ONE_CORE_LIMIT: usize = 3;

/// Nice-to-have gaps pulled forward into development phase 2.
pub const PHASE_TWO_NICE_TO_HAVE_LIMIT: usize = 2;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a competency code.
pub const MAX_CODE_LENGTH: usize = 32;

/// Maximum length of names and titles.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum length of free-text comments and descriptions.
pub const MAX_TEXT_LENGTH: usize = 65536;

/// Maximum number of competencies accepted by a single bulk create.
pub const MAX_BULK_SIZE: usize = 10000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bounds() {
        assert_eq!(MIN_LEVEL, 1);
        assert_eq!(MAX_LEVEL, 5);
    }

    #[test]
    fn full_score_is_ten_thousand_hundredths() {
        assert_eq!(FULL_SCORE, 10_000);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"CMPT");
    }
}
