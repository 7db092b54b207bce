//! # competency-core
//!
//! The deterministic Competency Assessment & Gap-Analysis Engine - THE LOGIC.
//!
//! This crate records skill assessments, tracks each user's current and target
//! proficiency per competency, and compares assessed levels against a
//! position's competency matrix to produce completeness scores, prioritized
//! gaps and a phased development plan. Program/track completion tracking uses
//! the same percentage-against-threshold idiom and lives here too.
//!
//! ## Architectural Constraints
//!
//! - Synchronous and single-threaded; no async, no network, no file I/O
//! - Integer arithmetic only (scores are fixed-point hundredths)
//! - `BTreeMap`/`BTreeSet` everywhere, so every report is deterministic
//! - Time is never read from the clock: operations take `now` explicitly
//! - Domain events are returned to the caller, never buffered in entities
//!
//! Data flows one way: catalog and assessments are recorded, the calculator
//! aggregates them, and callers receive read-only reports.

// =============================================================================
// MODULES
// =============================================================================

pub mod assessment;
pub mod catalog;
pub mod events;
pub mod formats;
pub mod level;
pub mod matrix;
pub mod primitives;
pub mod program;
pub mod repository;
pub mod score;
pub mod tracker;
pub mod types;
pub mod workspace;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    AssessmentId, CompetencyError, CompetencyId, CourseId, EnrollmentId, ErrorKind, MatrixId,
    PositionId, ProgramId, TrackId, UserCompetencyId, UserId,
};

pub use events::{DomainEvent, Recorded};
pub use level::CompetencyLevel;
pub use score::{AssessmentScore, Grade};

// =============================================================================
// RE-EXPORTS: Components
// =============================================================================

pub use assessment::{
    AssessmentComparison, AssessmentDraft, AssessmentStatistics, AssessmentType,
    AssessmentWorkflow, ChangeDirection, CompetencyAssessment, LevelProgress,
};
pub use catalog::{
    BulkCreateSummary, Competency, CompetencyCatalog, CompetencyCategory, CompetencyCode,
    CompetencyDraft, CompetencySummary, CompetencyTree, MetadataValue,
};
pub use matrix::{
    CompetencyMatrix, Completeness, DevelopmentPhase, GapAnalysis, GapEntry, GapGroups,
    MatrixCalculator, MatrixDraft, MatrixProgressReport, MatrixRegistry, PositionComparison,
    Priority, Recommendation, Requirement, RequirementDetail, RequirementType, UserComparison,
};
pub use program::{
    CompletionCriteria, EnrollmentStatus, Program, ProgramDraft, ProgramEnrollment,
    ProgramProgressTracker, ProgramSnapshot, ProgramStatus, Track, TrackDraft, TrackProgress,
    TrackSnapshot,
};
pub use repository::{AssessmentHistory, CompetencyLookup, CourseCompletionSource, MatrixLookup};
pub use tracker::{UserCompetency, UserCompetencyTracker};
pub use workspace::{Workspace, WorkspaceStats};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{SnapshotHeader, workspace_from_bytes, workspace_to_bytes};
