//! # Core Type Definitions
//!
//! This module contains the identifiers and the error type shared by every
//! component of the engine:
//! - Aggregate identifiers (`CompetencyId`, `AssessmentId`, `MatrixId`, ...)
//! - External references (`UserId`, `PositionId`, `CourseId`)
//! - Error types (`CompetencyError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers:
//! - Are plain `u64` newtypes (no random UUIDs)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Serialize as bare numbers

use crate::level::CompetencyLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw identifier value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }

            /// The identifier that follows this one.
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{:04}"), self.0)
            }
        }
    };
}

define_id!(
    /// A person known to the surrounding system (subject, assessor, confirmer).
    UserId,
    "USER"
);
define_id!(
    /// Identity of a competency definition in the catalog.
    CompetencyId,
    "COMP"
);
define_id!(
    /// Identity of a single recorded assessment.
    AssessmentId,
    "ASSESS"
);
define_id!(
    /// Identity of a tracked (user, competency) pair.
    UserCompetencyId,
    "UCOMP"
);
define_id!(
    /// Identity of a position's competency matrix.
    MatrixId,
    "MATRIX"
);
define_id!(
    /// An organisational position. Positions live outside the engine.
    PositionId,
    "POS"
);
define_id!(
    /// Identity of a development program.
    ProgramId,
    "PROG"
);
define_id!(
    /// Identity of a track inside a program.
    TrackId,
    "TRACK"
);
define_id!(
    /// A course reference. Course content lives outside the engine.
    CourseId,
    "COURSE"
);
define_id!(
    /// Identity of a program enrollment.
    EnrollmentId,
    "ENROLL"
);

// =============================================================================
// ERROR TYPES
// =============================================================================

/// The four domain error families, plus snapshot encoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    Validation,
    InvalidStateTransition,
    DuplicateKey,
    Serialization,
}

/// Errors raised by the engine.
///
/// - No silent failures
/// - Use `Result<T, CompetencyError>` for fallible operations
/// - The engine never panics; all errors are returned to the caller unmodified
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompetencyError {
    /// The referenced competency does not exist.
    #[error("Competency not found: {0}")]
    CompetencyNotFound(CompetencyId),

    /// No competency carries the given code.
    #[error("Competency code not found: {0}")]
    CodeNotFound(String),

    /// The referenced assessment does not exist.
    #[error("Assessment not found: {0}")]
    AssessmentNotFound(AssessmentId),

    /// The (user, competency) pair is not tracked.
    #[error("User competency not found: {user} / {competency}")]
    UserCompetencyNotFound {
        user: UserId,
        competency: CompetencyId,
    },

    /// The referenced matrix does not exist.
    #[error("Competency matrix not found: {0}")]
    MatrixNotFound(MatrixId),

    /// The position has no active matrix.
    #[error("No active competency matrix found for position {0}")]
    NoActiveMatrix(PositionId),

    /// The referenced program does not exist.
    #[error("Program not found: {0}")]
    ProgramNotFound(ProgramId),

    /// The referenced track does not exist.
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    /// The user is not enrolled in the program.
    #[error("Enrollment not found: {user} / {program}")]
    EnrollmentNotFound { user: UserId, program: ProgramId },

    /// The user has not started the track.
    #[error("Track progress not found: {user} / {track}")]
    TrackProgressNotFound { user: UserId, track: TrackId },

    /// Input failed validation (level range, percentages, empty fields...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The assessment has already been confirmed.
    #[error("Assessment is already confirmed: {0}")]
    AlreadyConfirmed(AssessmentId),

    /// Confirmed assessments are immutable.
    #[error("Cannot update confirmed assessment: {0}")]
    AssessmentConfirmed(AssessmentId),

    /// A target level must be strictly above the current level.
    #[error("Target level cannot be below or equal to current level ({target} <= {current})")]
    InvalidTarget {
        current: CompetencyLevel,
        target: CompetencyLevel,
    },

    /// The course is already in the completed set of the track.
    #[error("Course {course} is already completed in track {track}")]
    AlreadyCompleted { track: TrackId, course: CourseId },

    /// A lifecycle operation is not allowed from the current state.
    #[error("Invalid state transition: cannot {action} {entity} while {state}")]
    InvalidStateTransition {
        entity: &'static str,
        action: &'static str,
        state: String,
    },

    /// A unique key (competency code, matrix id, enrollment...) already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CompetencyError {
    /// Classify the error into its family.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CompetencyNotFound(_)
            | Self::CodeNotFound(_)
            | Self::AssessmentNotFound(_)
            | Self::UserCompetencyNotFound { .. }
            | Self::MatrixNotFound(_)
            | Self::NoActiveMatrix(_)
            | Self::ProgramNotFound(_)
            | Self::TrackNotFound(_)
            | Self::EnrollmentNotFound { .. }
            | Self::TrackProgressNotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::AlreadyConfirmed(_)
            | Self::AssessmentConfirmed(_)
            | Self::InvalidTarget { .. }
            | Self::AlreadyCompleted { .. }
            | Self::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            Self::DuplicateKey(_) => ErrorKind::DuplicateKey,
            Self::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    /// Shorthand for a validation failure.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a rejected lifecycle transition.
    pub(crate) fn transition(
        entity: &'static str,
        action: &'static str,
        state: impl fmt::Debug,
    ) -> Self {
        Self::InvalidStateTransition {
            entity,
            action,
            state: format!("{:?}", state),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(AssessmentId(7).to_string(), "ASSESS-0007");
        assert_eq!(CompetencyId(12345).to_string(), "COMP-12345");
    }

    #[test]
    fn id_next_saturates() {
        assert_eq!(UserId(1).next(), UserId(2));
        assert_eq!(UserId(u64::MAX).next(), UserId(u64::MAX));
    }

    #[test]
    fn ids_order_numerically() {
        let mut ids = vec![MatrixId(3), MatrixId(1), MatrixId(2)];
        ids.sort();
        assert_eq!(ids, vec![MatrixId(1), MatrixId(2), MatrixId(3)]);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            CompetencyError::CompetencyNotFound(CompetencyId(1)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CompetencyError::validation("bad").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CompetencyError::AlreadyConfirmed(AssessmentId(1)).kind(),
            ErrorKind::InvalidStateTransition
        );
        assert_eq!(
            CompetencyError::DuplicateKey("TECH-001".into()).kind(),
            ErrorKind::DuplicateKey
        );
    }

    #[test]
    fn transition_error_message() {
        let err = CompetencyError::transition("enrollment", "start", "Completed");
        assert_eq!(
            err.to_string(),
            "Invalid state transition: cannot start enrollment while \"Completed\""
        );
    }
}
