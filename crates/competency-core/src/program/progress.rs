//! # Program Progress
//!
//! Course completion inside tracks, track completion inside programs, and
//! program enrollments.
//!
//! Track percentage is `floor(100 * completed / total)` and never rounds up.
//! Enrollment progress is recomputed from the program's counted tracks: the
//! tracks flagged required, or every track when none is. The enrollment
//! completes once the program's [`CompletionCriteria`] is met by the number of
//! completed counted tracks.

use super::{CompletionCriteria, Program, ProgramDraft, ProgramStatus, Track, TrackDraft};
use crate::events::{DomainEvent, Recorded};
use crate::repository::CourseCompletionSource;
use crate::types::{CourseId, EnrollmentId, ProgramId, TrackId, UserId};
use crate::CompetencyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// `floor(100 * part / whole)`, 0 for an empty whole.
fn floor_percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    (part.saturating_mul(100) / whole).min(100) as u8
}

// =============================================================================
// TRACK PROGRESS
// =============================================================================

/// Completion state of one track for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackProgress {
    user: UserId,
    track: TrackId,
    total_courses: usize,
    completed: BTreeSet<CourseId>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TrackProgress {
    /// # Errors
    /// `Validation` if the track has no courses.
    pub fn start(
        user: UserId,
        track: TrackId,
        total_courses: usize,
        now: DateTime<Utc>,
    ) -> Result<Self, CompetencyError> {
        if total_courses == 0 {
            return Err(CompetencyError::validation(format!(
                "Track {} has no courses",
                track
            )));
        }
        Ok(Self {
            user,
            track,
            total_courses,
            completed: BTreeSet::new(),
            started_at: now,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn track(&self) -> TrackId {
        self.track
    }

    #[must_use]
    pub fn total_courses(&self) -> usize {
        self.total_courses
    }

    #[must_use]
    pub fn completed_courses(&self) -> &BTreeSet<CourseId> {
        &self.completed
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.len() == self.total_courses
    }

    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        floor_percentage(self.completed.len(), self.total_courses)
    }

    /// Add a course to the completed set.
    ///
    /// Returns `TrackCompleted` when this course completes the track.
    ///
    /// # Errors
    /// - `AlreadyCompleted` if the course is already in the set
    /// - `InvalidStateTransition` if every course is already done
    pub fn mark_course_completed(
        &mut self,
        course: CourseId,
        now: DateTime<Utc>,
    ) -> Result<Option<DomainEvent>, CompetencyError> {
        if self.completed.contains(&course) {
            return Err(CompetencyError::AlreadyCompleted {
                track: self.track,
                course,
            });
        }
        if self.is_completed() {
            return Err(CompetencyError::transition(
                "track",
                "complete a course in",
                "Completed",
            ));
        }

        self.completed.insert(course);
        if !self.is_completed() {
            return Ok(None);
        }

        self.completed_at = Some(now);
        Ok(Some(DomainEvent::TrackCompleted {
            user: self.user,
            track: self.track,
        }))
    }
}

// =============================================================================
// ENROLLMENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    InProgress,
    Suspended,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEnrollment {
    id: EnrollmentId,
    user: UserId,
    program: ProgramId,
    status: EnrollmentStatus,
    progress: u8,
    enrolled_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl ProgramEnrollment {
    pub fn enroll(
        id: EnrollmentId,
        user: UserId,
        program: ProgramId,
        now: DateTime<Utc>,
    ) -> Recorded<Self> {
        Recorded::new(
            Self {
                id,
                user,
                program,
                status: EnrollmentStatus::Enrolled,
                progress: 0,
                enrolled_at: now,
                started_at: None,
                completed_at: None,
            },
            DomainEvent::UserEnrolledInProgram { user, program },
        )
    }

    #[must_use]
    pub fn id(&self) -> EnrollmentId {
        self.id
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    #[must_use]
    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    fn require(
        &self,
        expected: EnrollmentStatus,
        action: &'static str,
    ) -> Result<(), CompetencyError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(CompetencyError::transition("enrollment", action, self.status))
        }
    }

    /// Enrolled -> InProgress.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), CompetencyError> {
        self.require(EnrollmentStatus::Enrolled, "start")?;
        self.status = EnrollmentStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// InProgress -> Suspended.
    pub fn suspend(&mut self) -> Result<(), CompetencyError> {
        self.require(EnrollmentStatus::InProgress, "suspend")?;
        self.status = EnrollmentStatus::Suspended;
        Ok(())
    }

    /// Suspended -> InProgress.
    pub fn resume(&mut self) -> Result<(), CompetencyError> {
        self.require(EnrollmentStatus::Suspended, "resume")?;
        self.status = EnrollmentStatus::InProgress;
        Ok(())
    }

    /// InProgress -> Completed, progress becomes 100.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<DomainEvent, CompetencyError> {
        self.require(EnrollmentStatus::InProgress, "complete")?;
        self.status = EnrollmentStatus::Completed;
        self.progress = 100;
        self.completed_at = Some(now);
        Ok(DomainEvent::EnrollmentCompleted {
            user: self.user,
            program: self.program,
        })
    }

    /// Set progress while in progress. 100 completes the enrollment.
    ///
    /// # Errors
    /// - `Validation` if `progress > 100`
    /// - `InvalidStateTransition` unless in progress
    pub fn update_progress(
        &mut self,
        progress: u8,
        now: DateTime<Utc>,
    ) -> Result<Option<DomainEvent>, CompetencyError> {
        if progress > 100 {
            return Err(CompetencyError::validation(format!(
                "Progress must be between 0 and 100, got {}",
                progress
            )));
        }
        self.require(EnrollmentStatus::InProgress, "update progress of")?;

        if progress == 100 {
            return self.complete(now).map(Some);
        }
        self.progress = progress;
        Ok(None)
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub track: TrackId,
    pub title: String,
    pub order: u32,
    pub required: bool,
    pub total_courses: usize,
    pub completed_courses: usize,
    pub percentage: u8,
    pub completed: bool,
}

/// Read-only view of one user's standing in a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSnapshot {
    pub program: ProgramId,
    pub code: String,
    pub title: String,
    pub status: ProgramStatus,
    pub criteria: CompletionCriteria,
    pub enrollment: Option<EnrollmentStatus>,
    pub progress: u8,
    pub tracks: Vec<TrackSnapshot>,
}

/// Counted-track totals for one user in one program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CountedProgress {
    tracks: usize,
    completed_tracks: usize,
    courses: usize,
    completed_courses: usize,
}

// =============================================================================
// TRACKER
// =============================================================================

/// In-memory arena for programs, tracks, enrollments and track progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramProgressTracker {
    programs: BTreeMap<ProgramId, Program>,
    tracks: BTreeMap<TrackId, Track>,
    enrollments: BTreeMap<(UserId, ProgramId), ProgramEnrollment>,
    progress: BTreeMap<(UserId, TrackId), TrackProgress>,
    next_program: u64,
    next_track: u64,
    next_enrollment: u64,
}

impl ProgramProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }

    pub fn enrollments(&self) -> impl Iterator<Item = &ProgramEnrollment> {
        self.enrollments.values()
    }

    pub fn program(&self, id: ProgramId) -> Result<&Program, CompetencyError> {
        self.programs.get(&id).ok_or(CompetencyError::ProgramNotFound(id))
    }

    fn program_mut(&mut self, id: ProgramId) -> Result<&mut Program, CompetencyError> {
        self.programs
            .get_mut(&id)
            .ok_or(CompetencyError::ProgramNotFound(id))
    }

    pub fn track(&self, id: TrackId) -> Result<&Track, CompetencyError> {
        self.tracks.get(&id).ok_or(CompetencyError::TrackNotFound(id))
    }

    pub fn enrollment(
        &self,
        user: UserId,
        program: ProgramId,
    ) -> Result<&ProgramEnrollment, CompetencyError> {
        self.enrollments
            .get(&(user, program))
            .ok_or(CompetencyError::EnrollmentNotFound { user, program })
    }

    fn enrollment_mut(
        &mut self,
        user: UserId,
        program: ProgramId,
    ) -> Result<&mut ProgramEnrollment, CompetencyError> {
        self.enrollments
            .get_mut(&(user, program))
            .ok_or(CompetencyError::EnrollmentNotFound { user, program })
    }

    pub fn track_progress(
        &self,
        user: UserId,
        track: TrackId,
    ) -> Result<&TrackProgress, CompetencyError> {
        self.progress
            .get(&(user, track))
            .ok_or(CompetencyError::TrackProgressNotFound { user, track })
    }

    // -------------------------------------------------------------------------
    // Programs
    // -------------------------------------------------------------------------

    /// Create a draft program.
    ///
    /// # Errors
    /// - `DuplicateKey` if the code is taken
    /// - `Validation` on an empty code or title
    pub fn create_program(
        &mut self,
        draft: ProgramDraft,
    ) -> Result<Recorded<ProgramId>, CompetencyError> {
        let code = draft.code.trim().to_ascii_uppercase();
        if self.programs.values().any(|p| p.code() == code) {
            return Err(CompetencyError::DuplicateKey(format!(
                "Program with code {} already exists",
                code
            )));
        }

        let id = ProgramId(self.next_program.saturating_add(1));
        let (program, events) = Program::create(id, draft)?.into_parts();
        self.next_program = id.value();
        tracing::debug!(program = %id, code = %program.code(), "program created");
        self.programs.insert(id, program);
        Ok(Recorded::with_events(id, events))
    }

    /// Add a track; the program's tracks stay sorted by `order`.
    pub fn add_track(
        &mut self,
        program: ProgramId,
        draft: TrackDraft,
    ) -> Result<TrackId, CompetencyError> {
        let id = TrackId(self.next_track.saturating_add(1));
        let track = Track::new(id, program, draft)?;

        let orders: BTreeMap<TrackId, u32> = self
            .tracks
            .values()
            .filter(|t| t.program() == program)
            .map(|t| (t.id(), t.order()))
            .chain(std::iter::once((id, track.order())))
            .collect();

        let entry = self.program_mut(program)?;
        entry.attach_track(id)?;
        entry.sort_tracks_by_key(|t| (orders.get(&t).copied().unwrap_or(u32::MAX), t));

        self.next_track = id.value();
        self.tracks.insert(id, track);
        Ok(id)
    }

    pub fn publish(&mut self, program: ProgramId) -> Result<Recorded<()>, CompetencyError> {
        let event = self.program_mut(program)?.publish()?;
        tracing::debug!(program = %program, "program published");
        Ok(Recorded::new((), event))
    }

    pub fn archive(&mut self, program: ProgramId) -> Result<Recorded<()>, CompetencyError> {
        let event = self.program_mut(program)?.archive()?;
        Ok(Recorded::new((), event))
    }

    // -------------------------------------------------------------------------
    // Enrollments
    // -------------------------------------------------------------------------

    /// Enroll `user` in an active program. One enrollment per pair.
    pub fn enroll(
        &mut self,
        user: UserId,
        program: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<Recorded<EnrollmentId>, CompetencyError> {
        let status = self.program(program)?.status();
        if status != ProgramStatus::Active {
            return Err(CompetencyError::transition("program", "enroll in", status));
        }
        if self.enrollments.contains_key(&(user, program)) {
            return Err(CompetencyError::DuplicateKey(format!(
                "{} is already enrolled in {}",
                user, program
            )));
        }

        let id = EnrollmentId(self.next_enrollment.saturating_add(1));
        let (enrollment, events) = ProgramEnrollment::enroll(id, user, program, now).into_parts();
        self.next_enrollment = id.value();
        self.enrollments.insert((user, program), enrollment);
        tracing::debug!(user = %user, program = %program, "user enrolled");
        Ok(Recorded::with_events(id, events))
    }

    pub fn start_enrollment(
        &mut self,
        user: UserId,
        program: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<(), CompetencyError> {
        self.enrollment_mut(user, program)?.start(now)
    }

    pub fn suspend(&mut self, user: UserId, program: ProgramId) -> Result<(), CompetencyError> {
        self.enrollment_mut(user, program)?.suspend()
    }

    pub fn resume(&mut self, user: UserId, program: ProgramId) -> Result<(), CompetencyError> {
        self.enrollment_mut(user, program)?.resume()
    }

    /// Set enrollment progress by hand.
    pub fn update_enrollment_progress(
        &mut self,
        user: UserId,
        program: ProgramId,
        progress: u8,
        now: DateTime<Utc>,
    ) -> Result<Recorded<()>, CompetencyError> {
        let event = self.enrollment_mut(user, program)?.update_progress(progress, now)?;
        Ok(Recorded::with_events((), event.into_iter().collect()))
    }

    // -------------------------------------------------------------------------
    // Tracks
    // -------------------------------------------------------------------------

    /// Begin tracking `user` through `track`.
    ///
    /// # Errors
    /// - `TrackNotFound` if the track is unknown
    /// - `DuplicateKey` if already started
    /// - `Validation` if the track has no courses
    pub fn start_track(
        &mut self,
        user: UserId,
        track: TrackId,
        now: DateTime<Utc>,
    ) -> Result<(), CompetencyError> {
        let total = self.track(track)?.total_courses();
        if self.progress.contains_key(&(user, track)) {
            return Err(CompetencyError::DuplicateKey(format!(
                "{} has already started {}",
                user, track
            )));
        }
        let progress = TrackProgress::start(user, track, total, now)?;
        self.progress.insert((user, track), progress);
        Ok(())
    }

    /// Mark `course` completed and refresh the program enrollment.
    ///
    /// Returns the track percentage. An enrollment still in `Enrolled` is
    /// started; a suspended or completed one is left untouched.
    pub fn record_course_completion(
        &mut self,
        user: UserId,
        track: TrackId,
        course: CourseId,
        now: DateTime<Utc>,
    ) -> Result<Recorded<u8>, CompetencyError> {
        let definition = self.track(track)?;
        if !definition.contains(course) {
            return Err(CompetencyError::validation(format!(
                "Course {} is not part of track {}",
                course, track
            )));
        }
        let program = definition.program();

        let progress = self
            .progress
            .get_mut(&(user, track))
            .ok_or(CompetencyError::TrackProgressNotFound { user, track })?;
        let mut events: Vec<DomainEvent> = progress
            .mark_course_completed(course, now)?
            .into_iter()
            .collect();
        let percentage = progress.progress_percentage();

        tracing::debug!(
            user = %user,
            track = %track,
            course = %course,
            percentage,
            "course completed"
        );
        events.extend(self.refresh_enrollment(user, program, now)?);
        Ok(Recorded::with_events(percentage, events))
    }

    /// Pull completed courses from `source` and record the new ones.
    ///
    /// Starts the track if needed. Returns how many courses were newly recorded.
    pub fn sync_track<S: CourseCompletionSource + ?Sized>(
        &mut self,
        user: UserId,
        track: TrackId,
        source: &S,
        now: DateTime<Utc>,
    ) -> Result<Recorded<usize>, CompetencyError> {
        let courses = self.track(track)?.courses().to_vec();
        let reported: BTreeSet<CourseId> = source
            .completed_courses(user, track)?
            .into_iter()
            .collect();

        if !self.progress.contains_key(&(user, track)) {
            self.start_track(user, track, now)?;
        }

        let mut recorded = Recorded::with_events(0usize, Vec::new());
        for course in courses.into_iter().filter(|c| reported.contains(c)) {
            if self.track_progress(user, track)?.completed_courses().contains(&course) {
                continue;
            }
            let (_, events) = self.record_course_completion(user, track, course, now)?.into_parts();
            recorded.value += 1;
            for event in events {
                recorded.push(event);
            }
        }
        Ok(recorded)
    }

    fn counted_progress(&self, user: UserId, program: &Program) -> CountedProgress {
        let tracks: Vec<&Track> = program
            .tracks()
            .iter()
            .filter_map(|id| self.tracks.get(id))
            .collect();
        let any_required = tracks.iter().any(|t| t.is_required());

        let mut counted = CountedProgress::default();
        for track in tracks.into_iter().filter(|t| !any_required || t.is_required()) {
            counted.tracks += 1;
            counted.courses += track.total_courses();
            if let Some(progress) = self.progress.get(&(user, track.id())) {
                counted.completed_courses += progress.completed_count();
                if progress.is_completed() {
                    counted.completed_tracks += 1;
                }
            }
        }
        counted
    }

    fn refresh_enrollment(
        &mut self,
        user: UserId,
        program: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>, CompetencyError> {
        let Some(status) = self
            .enrollments
            .get(&(user, program))
            .map(ProgramEnrollment::status)
        else {
            return Ok(Vec::new());
        };
        if matches!(status, EnrollmentStatus::Suspended | EnrollmentStatus::Completed) {
            tracing::debug!(user = %user, program = %program, ?status, "enrollment not refreshed");
            return Ok(Vec::new());
        }

        let definition = self.program(program)?;
        let criteria = definition.criteria();
        let counted = self.counted_progress(user, definition);

        let enrollment = self.enrollment_mut(user, program)?;
        if enrollment.status() == EnrollmentStatus::Enrolled {
            enrollment.start(now)?;
        }

        if criteria.is_met(counted.completed_tracks, counted.tracks) {
            tracing::debug!(user = %user, program = %program, "program completion criteria met");
            return Ok(vec![enrollment.complete(now)?]);
        }
        let percentage = floor_percentage(counted.completed_courses, counted.courses);
        Ok(enrollment.update_progress(percentage, now)?.into_iter().collect())
    }

    /// Status of `user` in `program` with per-track detail.
    pub fn program_snapshot(
        &self,
        user: UserId,
        program: ProgramId,
    ) -> Result<ProgramSnapshot, CompetencyError> {
        let definition = self.program(program)?;
        let enrollment = self.enrollments.get(&(user, program));

        let tracks = definition
            .tracks()
            .iter()
            .filter_map(|id| self.tracks.get(id))
            .map(|track| {
                let progress = self.progress.get(&(user, track.id()));
                TrackSnapshot {
                    track: track.id(),
                    title: track.title().to_string(),
                    order: track.order(),
                    required: track.is_required(),
                    total_courses: track.total_courses(),
                    completed_courses: progress.map_or(0, TrackProgress::completed_count),
                    percentage: progress.map_or(0, TrackProgress::progress_percentage),
                    completed: progress.is_some_and(TrackProgress::is_completed),
                }
            })
            .collect();

        Ok(ProgramSnapshot {
            program,
            code: definition.code().to_string(),
            title: definition.title().to_string(),
            status: definition.status(),
            criteria: definition.criteria(),
            enrollment: enrollment.map(ProgramEnrollment::status),
            progress: enrollment.map_or(0, ProgramEnrollment::progress),
            tracks,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
