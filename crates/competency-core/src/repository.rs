//! # Repository Interfaces
//!
//! The narrow capability traits the engine needs from its collaborators.
//!
//! Every lookup is fallible so that persistent or remote implementations can
//! report I/O failures through the same `CompetencyError` channel. Lookups
//! return owned values for storage compatibility. The in-memory arenas in this
//! crate (`CompetencyCatalog`, `AssessmentWorkflow`, `MatrixRegistry`)
//! implement these traits and are what tests use.

use crate::assessment::CompetencyAssessment;
use crate::catalog::Competency;
use crate::matrix::CompetencyMatrix;
use crate::types::{CompetencyId, CourseId, MatrixId, PositionId, TrackId, UserId};
use crate::CompetencyError;

/// Resolve competency definitions.
pub trait CompetencyLookup {
    /// Find a competency by identity.
    fn competency_by_id(&self, id: CompetencyId) -> Result<Option<Competency>, CompetencyError>;

    /// Find a competency by its unique code (case-insensitive).
    fn competency_by_code(&self, code: &str) -> Result<Option<Competency>, CompetencyError>;
}

/// Read recorded assessments.
pub trait AssessmentHistory {
    /// Every assessment whose subject is `user`, oldest first.
    fn assessments_for_user(&self, user: UserId)
    -> Result<Vec<CompetencyAssessment>, CompetencyError>;

    /// Every assessment of `competency`, oldest first.
    fn assessments_for_competency(
        &self,
        competency: CompetencyId,
    ) -> Result<Vec<CompetencyAssessment>, CompetencyError>;
}

/// Resolve competency matrices.
pub trait MatrixLookup {
    /// Find a matrix by identity.
    fn matrix_by_id(&self, id: MatrixId) -> Result<Option<CompetencyMatrix>, CompetencyError>;

    /// Every matrix attached to `position`, in insertion order.
    fn matrices_by_position(
        &self,
        position: PositionId,
    ) -> Result<Vec<CompetencyMatrix>, CompetencyError>;
}

/// Supplies which courses of a track a user has completed.
///
/// Implemented by the learning-management side (course enrollments,
/// certificates); the engine only consumes it.
pub trait CourseCompletionSource {
    fn completed_courses(&self, user: UserId, track: TrackId)
    -> Result<Vec<CourseId>, CompetencyError>;
}
