//! # Development Programs
//!
//! A program groups ordered tracks of courses. Completion uses the same
//! percentage-against-threshold rule as the matrix calculator, expressed by
//! [`CompletionCriteria`].
//!
//! ```text
//! Program:    Draft --publish--> Active --archive--> Archived
//! Enrollment: Enrolled --start--> InProgress <--suspend/resume--> Suspended
//!                                 InProgress --complete--> Completed
//! ```

pub mod progress;

use crate::events::{DomainEvent, Recorded};
use crate::primitives::{MAX_NAME_LENGTH, MAX_TEXT_LENGTH};
use crate::types::{CourseId, ProgramId, TrackId};
use crate::CompetencyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use progress::{
    EnrollmentStatus, ProgramEnrollment, ProgramProgressTracker, ProgramSnapshot, TrackProgress,
    TrackSnapshot,
};

// =============================================================================
// COMPLETION CRITERIA
// =============================================================================

/// When a set of items counts as complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionCriteria {
    #[default]
    RequireAll,
    RequirePercentage(u8),
}

impl CompletionCriteria {
    #[must_use]
    pub const fn require_all() -> Self {
        Self::RequireAll
    }

    /// # Errors
    /// `Validation` if `percentage > 100`.
    pub fn require_percentage(percentage: u8) -> Result<Self, CompetencyError> {
        if percentage > 100 {
            return Err(CompetencyError::validation(format!(
                "Required percentage must be between 0 and 100, got {}",
                percentage
            )));
        }
        Ok(Self::RequirePercentage(percentage))
    }

    #[must_use]
    pub const fn required_percentage(self) -> u8 {
        match self {
            Self::RequireAll => 100,
            Self::RequirePercentage(p) => p,
        }
    }

    /// `100 * completed >= P * total`. Nothing is met when `total == 0`.
    #[must_use]
    pub fn is_met(self, completed: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        let done = (completed as u128) * 100;
        let needed = u128::from(self.required_percentage()) * total as u128;
        done >= needed
    }
}

// =============================================================================
// TRACK
// =============================================================================

/// An ordered set of courses inside a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    id: TrackId,
    program: ProgramId,
    title: String,
    order: u32,
    courses: Vec<CourseId>,
    required: bool,
}

impl Track {
    /// # Errors
    /// `Validation` on an empty title or a repeated course.
    pub fn new(
        id: TrackId,
        program: ProgramId,
        draft: TrackDraft,
    ) -> Result<Self, CompetencyError> {
        let title = validate_title(&draft.title, "Track title")?;
        let mut seen = BTreeSet::new();
        if let Some(course) = draft.courses.iter().find(|c| !seen.insert(**c)) {
            return Err(CompetencyError::validation(format!(
                "Course {} appears twice in track {}",
                course, title
            )));
        }

        Ok(Self {
            id,
            program,
            title,
            order: draft.order,
            courses: draft.courses,
            required: draft.required,
        })
    }

    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[must_use]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn courses(&self) -> &[CourseId] {
        &self.courses
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn total_courses(&self) -> usize {
        self.courses.len()
    }

    #[must_use]
    pub fn contains(&self, course: CourseId) -> bool {
        self.courses.contains(&course)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDraft {
    pub title: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub courses: Vec<CourseId>,
    #[serde(default)]
    pub required: bool,
}

// =============================================================================
// PROGRAM
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    Draft,
    Active,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    id: ProgramId,
    code: String,
    title: String,
    description: String,
    status: ProgramStatus,
    criteria: CompletionCriteria,
    tracks: Vec<TrackId>,
}

impl Program {
    /// Create a draft program.
    pub fn create(id: ProgramId, draft: ProgramDraft) -> Result<Recorded<Self>, CompetencyError> {
        let code = draft.code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(CompetencyError::validation("Program code cannot be empty"));
        }
        let title = validate_title(&draft.title, "Program title")?;
        if draft.description.len() > MAX_TEXT_LENGTH {
            return Err(CompetencyError::validation(format!(
                "Description exceeds {} bytes",
                MAX_TEXT_LENGTH
            )));
        }
        if let CompletionCriteria::RequirePercentage(p) = draft.criteria {
            CompletionCriteria::require_percentage(p)?;
        }

        let event = DomainEvent::ProgramCreated {
            program: id,
            code: code.clone(),
        };
        Ok(Recorded::new(
            Self {
                id,
                code,
                title,
                description: draft.description.trim().to_string(),
                status: ProgramStatus::Draft,
                criteria: draft.criteria,
                tracks: Vec::new(),
            },
            event,
        ))
    }

    #[must_use]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn status(&self) -> ProgramStatus {
        self.status
    }

    #[must_use]
    pub fn criteria(&self) -> CompletionCriteria {
        self.criteria
    }

    /// Track ids in display order.
    #[must_use]
    pub fn tracks(&self) -> &[TrackId] {
        &self.tracks
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ProgramStatus::Active
    }

    /// Attach a track. Archived programs are frozen.
    pub(crate) fn attach_track(&mut self, track: TrackId) -> Result<(), CompetencyError> {
        if self.status == ProgramStatus::Archived {
            return Err(CompetencyError::transition("program", "add track to", self.status));
        }
        self.tracks.push(track);
        Ok(())
    }

    /// Reorder tracks by the key supplied by the caller.
    pub(crate) fn sort_tracks_by_key(&mut self, key: impl Fn(TrackId) -> (u32, TrackId)) {
        self.tracks.sort_by_key(|id| key(*id));
    }

    /// Draft -> Active. Requires at least one track.
    pub fn publish(&mut self) -> Result<DomainEvent, CompetencyError> {
        if self.status != ProgramStatus::Draft {
            return Err(CompetencyError::transition("program", "publish", self.status));
        }
        if self.tracks.is_empty() {
            return Err(CompetencyError::validation(
                "Program must have at least one track to be published",
            ));
        }
        self.status = ProgramStatus::Active;
        Ok(DomainEvent::ProgramPublished { program: self.id })
    }

    /// Active -> Archived. Archived is terminal.
    pub fn archive(&mut self) -> Result<DomainEvent, CompetencyError> {
        if self.status != ProgramStatus::Active {
            return Err(CompetencyError::transition("program", "archive", self.status));
        }
        self.status = ProgramStatus::Archived;
        Ok(DomainEvent::ProgramArchived { program: self.id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDraft {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub criteria: CompletionCriteria,
}

fn validate_title(title: &str, what: &str) -> Result<String, CompetencyError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CompetencyError::validation(format!("{} cannot be empty", what)));
    }
    if title.len() > MAX_NAME_LENGTH {
        return Err(CompetencyError::validation(format!(
            "{} exceeds {} bytes",
            what, MAX_NAME_LENGTH
        )));
    }
    Ok(title.to_string())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProgramDraft {
        ProgramDraft {
            code: "onboard-2025".to_string(),
            title: "Onboarding".to_string(),
            description: "First ninety days".to_string(),
            criteria: CompletionCriteria::require_all(),
        }
    }

    #[test]
    fn require_all_needs_every_item() {
        let all = CompletionCriteria::require_all();
        assert!(all.is_met(3, 3));
        assert!(!all.is_met(2, 3));
        assert!(!all.is_met(0, 0));
    }

    #[test]
    fn require_percentage_boundary() {
        let half = CompletionCriteria::require_percentage(50).expect("criteria");
        assert!(half.is_met(1, 2));
        assert!(!half.is_met(1, 3));
        assert!(half.is_met(2, 3));

        let none = CompletionCriteria::require_percentage(0).expect("criteria");
        assert!(none.is_met(0, 5));
        assert!(!none.is_met(0, 0));

        assert!(CompletionCriteria::require_percentage(101).is_err());
    }

    #[test]
    fn program_code_is_normalized() {
        let recorded = Program::create(ProgramId(1), draft()).expect("create");
        assert_eq!(recorded.value.code(), "ONBOARD-2025");
        assert_eq!(recorded.value.status(), ProgramStatus::Draft);
        assert_eq!(
            recorded.events,
            vec![DomainEvent::ProgramCreated {
                program: ProgramId(1),
                code: "ONBOARD-2025".to_string()
            }]
        );
    }

    #[test]
    fn empty_title_or_code_rejected() {
        let mut bad = draft();
        bad.title = " ".to_string();
        assert!(Program::create(ProgramId(1), bad).is_err());

        let mut bad = draft();
        bad.code = String::new();
        assert!(Program::create(ProgramId(1), bad).is_err());
    }

    #[test]
    fn publish_requires_track_and_archive_is_terminal() {
        let mut program = Program::create(ProgramId(1), draft()).expect("create").value;
        assert_eq!(
            program.publish().expect_err("no tracks").kind(),
            crate::ErrorKind::Validation
        );

        program.attach_track(TrackId(1)).expect("track");
        program.publish().expect("publish");
        assert!(program.is_active());
        assert_eq!(
            program.publish().expect_err("twice").kind(),
            crate::ErrorKind::InvalidStateTransition
        );

        program.archive().expect("archive");
        assert!(program.archive().is_err());
        assert!(program.attach_track(TrackId(2)).is_err());
    }

    #[test]
    fn draft_cannot_be_archived() {
        let mut program = Program::create(ProgramId(1), draft()).expect("create").value;
        assert!(program.archive().is_err());
    }

    #[test]
    fn track_rejects_repeated_course() {
        let err = Track::new(
            TrackId(1),
            ProgramId(1),
            TrackDraft {
                title: "Basics".to_string(),
                order: 1,
                courses: vec![CourseId(1), CourseId(2), CourseId(1)],
                required: true,
            },
        )
        .expect_err("repeat");
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }
}
