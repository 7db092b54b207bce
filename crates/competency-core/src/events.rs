//! # Domain Events
//!
//! State changes are announced as values, not through shared buffers.
//!
//! Every mutating operation hands its events back to the caller, either as a
//! bare [`DomainEvent`] (entity methods) or bundled with the operation's result
//! in a [`Recorded`] (service methods). The caller decides whether to forward
//! them to notification or analytics collaborators. Delivery is the caller's
//! concern; the engine only guarantees one event per state change.

use crate::level::CompetencyLevel;
use crate::types::{AssessmentId, CompetencyId, ProgramId, TrackId, UserId};
use serde::{Deserialize, Serialize};

/// A state change raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    CompetencyCreated {
        competency: CompetencyId,
        code: String,
    },
    CompetencyUpdated {
        competency: CompetencyId,
    },
    CompetencyDeactivated {
        competency: CompetencyId,
    },
    AssessmentCreated {
        assessment: AssessmentId,
        competency: CompetencyId,
        subject: UserId,
        assessor: UserId,
    },
    AssessmentUpdated {
        assessment: AssessmentId,
    },
    AssessmentConfirmed {
        assessment: AssessmentId,
        confirmer: UserId,
    },
    UserCompetencyCreated {
        user: UserId,
        competency: CompetencyId,
        level: CompetencyLevel,
    },
    TargetLevelSet {
        user: UserId,
        competency: CompetencyId,
        target: CompetencyLevel,
    },
    UserCompetencyProgressUpdated {
        user: UserId,
        competency: CompetencyId,
        previous: CompetencyLevel,
        current: CompetencyLevel,
    },
    ProgramCreated {
        program: ProgramId,
        code: String,
    },
    ProgramPublished {
        program: ProgramId,
    },
    ProgramArchived {
        program: ProgramId,
    },
    UserEnrolledInProgram {
        user: UserId,
        program: ProgramId,
    },
    TrackCompleted {
        user: UserId,
        track: TrackId,
    },
    EnrollmentCompleted {
        user: UserId,
        program: ProgramId,
    },
}

impl DomainEvent {
    /// Stable snake_case name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CompetencyCreated { .. } => "competency_created",
            Self::CompetencyUpdated { .. } => "competency_updated",
            Self::CompetencyDeactivated { .. } => "competency_deactivated",
            Self::AssessmentCreated { .. } => "assessment_created",
            Self::AssessmentUpdated { .. } => "assessment_updated",
            Self::AssessmentConfirmed { .. } => "assessment_confirmed",
            Self::UserCompetencyCreated { .. } => "user_competency_created",
            Self::TargetLevelSet { .. } => "target_level_set",
            Self::UserCompetencyProgressUpdated { .. } => "user_competency_progress_updated",
            Self::ProgramCreated { .. } => "program_created",
            Self::ProgramPublished { .. } => "program_published",
            Self::ProgramArchived { .. } => "program_archived",
            Self::UserEnrolledInProgram { .. } => "user_enrolled_in_program",
            Self::TrackCompleted { .. } => "track_completed",
            Self::EnrollmentCompleted { .. } => "enrollment_completed",
        }
    }
}

/// The result of a mutating service operation together with the events it raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded<T> {
    pub value: T,
    pub events: Vec<DomainEvent>,
}

impl<T> Recorded<T> {
    /// A value with a single event.
    pub fn new(value: T, event: DomainEvent) -> Self {
        Self {
            value,
            events: vec![event],
        }
    }

    /// A value with any number of events (possibly none).
    pub fn with_events(value: T, events: Vec<DomainEvent>) -> Self {
        Self { value, events }
    }

    /// Transform the value, keeping the events.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Recorded<U> {
        Recorded {
            value: f(self.value),
            events: self.events,
        }
    }

    /// Append another event raised by the same operation.
    pub fn push(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    /// Split into the value and the drained events.
    pub fn into_parts(self) -> (T, Vec<DomainEvent>) {
        (self.value, self.events)
    }
}
