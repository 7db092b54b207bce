//! # Assessment Workflow
//!
//! Records single assessment events (self or manager) of a user's level in one
//! competency, with an optional confirmation step.
//!
//! Lifecycle: created unconfirmed, then either updated while unconfirmed or
//! confirmed. Confirmation is terminal for mutability.

use crate::events::{DomainEvent, Recorded};
use crate::level::CompetencyLevel;
use crate::primitives::{ASSESSMENT_VALIDITY_DAYS, MAX_TEXT_LENGTH, NEXT_LEVEL_SCORE};
use crate::repository::{AssessmentHistory, CompetencyLookup};
use crate::score::AssessmentScore;
use crate::types::{AssessmentId, CompetencyId, UserId};
use crate::CompetencyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Who gave the assessment relative to its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentType {
    #[serde(rename = "self")]
    SelfAssessment,
    Manager,
}

// =============================================================================
// ASSESSMENT
// =============================================================================

/// A recorded judgment of a user's level in one competency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyAssessment {
    id: AssessmentId,
    competency: CompetencyId,
    subject: UserId,
    assessor: UserId,
    level: CompetencyLevel,
    score: AssessmentScore,
    comment: Option<String>,
    assessed_at: DateTime<Utc>,
    confirmed_by: Option<UserId>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl CompetencyAssessment {
    /// Record a new, unconfirmed assessment taken at `assessed_at`.
    pub fn create(
        id: AssessmentId,
        draft: AssessmentDraft,
        assessed_at: DateTime<Utc>,
    ) -> Result<Recorded<Self>, CompetencyError> {
        let comment = normalize_comment(draft.comment)?;
        let event = DomainEvent::AssessmentCreated {
            assessment: id,
            competency: draft.competency,
            subject: draft.subject,
            assessor: draft.assessor,
        };

        Ok(Recorded::new(
            Self {
                id,
                competency: draft.competency,
                subject: draft.subject,
                assessor: draft.assessor,
                level: draft.level,
                score: draft.score,
                comment,
                assessed_at,
                confirmed_by: None,
                confirmed_at: None,
            },
            event,
        ))
    }

    #[must_use]
    pub fn id(&self) -> AssessmentId {
        self.id
    }

    #[must_use]
    pub fn competency(&self) -> CompetencyId {
        self.competency
    }

    #[must_use]
    pub fn subject(&self) -> UserId {
        self.subject
    }

    #[must_use]
    pub fn assessor(&self) -> UserId {
        self.assessor
    }

    #[must_use]
    pub fn level(&self) -> CompetencyLevel {
        self.level
    }

    #[must_use]
    pub fn score(&self) -> AssessmentScore {
        self.score
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    #[must_use]
    pub fn assessed_at(&self) -> DateTime<Utc> {
        self.assessed_at
    }

    #[must_use]
    pub fn confirmed_by(&self) -> Option<UserId> {
        self.confirmed_by
    }

    #[must_use]
    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }

    #[must_use]
    pub fn is_self_assessment(&self) -> bool {
        self.subject == self.assessor
    }

    #[must_use]
    pub fn assessment_type(&self) -> AssessmentType {
        if self.is_self_assessment() {
            AssessmentType::SelfAssessment
        } else {
            AssessmentType::Manager
        }
    }

    /// Whole days elapsed between the assessment and `now`.
    #[must_use]
    pub fn days_since_assessment(&self, now: DateTime<Utc>) -> i64 {
        (now - self.assessed_at).num_days()
    }

    /// `target - level`; negative when the assessed level is above the target.
    #[must_use]
    pub fn gap_to_target(&self, target: CompetencyLevel) -> i8 {
        self.level.gap_to(target)
    }

    /// True while the assessment is younger than `validity_days`.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>, validity_days: i64) -> bool {
        self.days_since_assessment(now) <= validity_days
    }

    /// The level to aim for next: one step up on a strong score, otherwise the same.
    #[must_use]
    pub fn recommend_next_level(&self) -> CompetencyLevel {
        if self.score.is_passing(NEXT_LEVEL_SCORE) {
            self.level.next().unwrap_or(self.level)
        } else {
            self.level
        }
    }

    /// Confirm the assessment.
    ///
    /// # Errors
    /// `AlreadyConfirmed` if it was confirmed before.
    pub fn confirm(
        &mut self,
        confirmer: UserId,
        now: DateTime<Utc>,
    ) -> Result<DomainEvent, CompetencyError> {
        if self.is_confirmed() {
            return Err(CompetencyError::AlreadyConfirmed(self.id));
        }
        self.confirmed_by = Some(confirmer);
        self.confirmed_at = Some(now);
        Ok(DomainEvent::AssessmentConfirmed {
            assessment: self.id,
            confirmer,
        })
    }

    /// Replace level, score and comment.
    ///
    /// # Errors
    /// `AssessmentConfirmed` if confirmed; nothing is changed in that case.
    pub fn update(
        &mut self,
        level: CompetencyLevel,
        score: AssessmentScore,
        comment: Option<String>,
    ) -> Result<DomainEvent, CompetencyError> {
        if self.is_confirmed() {
            return Err(CompetencyError::AssessmentConfirmed(self.id));
        }
        let comment = normalize_comment(comment)?;
        self.level = level;
        self.score = score;
        self.comment = comment;
        Ok(DomainEvent::AssessmentUpdated {
            assessment: self.id,
        })
    }
}

fn normalize_comment(comment: Option<String>) -> Result<Option<String>, CompetencyError> {
    match comment {
        Some(text) if text.len() > MAX_TEXT_LENGTH => Err(CompetencyError::validation(format!(
            "Comment exceeds {} bytes",
            MAX_TEXT_LENGTH
        ))),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => Ok(Some(text.trim().to_string())),
        None => Ok(None),
    }
}

/// Input for recording an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentDraft {
    pub competency: CompetencyId,
    pub subject: UserId,
    pub assessor: UserId,
    pub level: CompetencyLevel,
    pub score: AssessmentScore,
    #[serde(default)]
    pub comment: Option<String>,
}

// =============================================================================
// DERIVED REPORTS
// =============================================================================

/// Per-user assessment counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentStatistics {
    pub total: usize,
    pub confirmed: usize,
    pub self_assessments: usize,
    /// Mean score in hundredths of a percent, rounded down. Zero when empty.
    pub average_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Improvement,
    Regression,
    Unchanged,
}

/// Difference between an earlier and a later assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentComparison {
    pub level_change: i8,
    /// Score delta in hundredths of a percent.
    pub score_change: i32,
    pub direction: ChangeDirection,
    pub is_progress: bool,
}

/// Progress along a level path `from -> current -> target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub total_gap: i8,
    pub completed: i8,
    pub remaining: i8,
    pub percentage: u8,
}

impl LevelProgress {
    /// Percentage is `floor(100 * completed / total_gap)`; a non-positive
    /// total gap counts as complete.
    #[must_use]
    pub fn between(
        from: CompetencyLevel,
        current: CompetencyLevel,
        target: CompetencyLevel,
    ) -> Self {
        let total_gap = from.gap_to(target);
        let completed = from.gap_to(current).max(0);
        let remaining = current.gap_to(target).max(0);

        let percentage = if total_gap <= 0 {
            100
        } else {
            let raw = i32::from(completed) * 100 / i32::from(total_gap);
            raw.clamp(0, 100) as u8
        };

        Self {
            total_gap,
            completed,
            remaining,
            percentage,
        }
    }
}

/// Compare an earlier assessment with a later one.
///
/// The level change decides the direction; the score breaks a level tie.
#[must_use]
pub fn compare(
    earlier: &CompetencyAssessment,
    later: &CompetencyAssessment,
) -> AssessmentComparison {
    let level_change = earlier.level.gap_to(later.level);
    let score_change = later.score.hundredths() as i32 - earlier.score.hundredths() as i32;

    let direction = match level_change.cmp(&0).then(score_change.cmp(&0)) {
        Ordering::Greater => ChangeDirection::Improvement,
        Ordering::Less => ChangeDirection::Regression,
        Ordering::Equal => ChangeDirection::Unchanged,
    };

    AssessmentComparison {
        level_change,
        score_change,
        direction,
        is_progress: direction == ChangeDirection::Improvement,
    }
}

// =============================================================================
// WORKFLOW
// =============================================================================

fn check_offered_level<C: CompetencyLookup + ?Sized>(
    competencies: &C,
    competency: CompetencyId,
    level: CompetencyLevel,
) -> Result<(), CompetencyError> {
    let found = competencies
        .competency_by_id(competency)?
        .ok_or(CompetencyError::CompetencyNotFound(competency))?;
    if !found.has_level(level) {
        return Err(CompetencyError::validation(format!(
            "Level {} is not defined for competency {}",
            level,
            found.code()
        )));
    }
    Ok(())
}

/// In-memory arena of assessments keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentWorkflow {
    assessments: BTreeMap<AssessmentId, CompetencyAssessment>,
    next_id: u64,
}

impl AssessmentWorkflow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assessments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompetencyAssessment> {
        self.assessments.values()
    }

    /// Record an assessment.
    ///
    /// # Errors
    /// - `CompetencyNotFound` if the competency is unknown to `competencies`
    /// - `Validation` if the competency does not define the assessed level
    pub fn create<C: CompetencyLookup + ?Sized>(
        &mut self,
        competencies: &C,
        draft: AssessmentDraft,
        now: DateTime<Utc>,
    ) -> Result<Recorded<AssessmentId>, CompetencyError> {
        check_offered_level(competencies, draft.competency, draft.level)?;

        let id = AssessmentId(self.next_id.saturating_add(1));
        let (assessment, events) = CompetencyAssessment::create(id, draft, now)?.into_parts();
        self.next_id = id.value();

        tracing::debug!(
            assessment = %id,
            competency = %assessment.competency,
            subject = %assessment.subject,
            level = assessment.level.value(),
            "assessment recorded"
        );
        self.assessments.insert(id, assessment);

        Ok(Recorded::with_events(id, events))
    }

    pub fn get(&self, id: AssessmentId) -> Result<&CompetencyAssessment, CompetencyError> {
        self.assessments
            .get(&id)
            .ok_or(CompetencyError::AssessmentNotFound(id))
    }

    fn get_mut(&mut self, id: AssessmentId) -> Result<&mut CompetencyAssessment, CompetencyError> {
        self.assessments
            .get_mut(&id)
            .ok_or(CompetencyError::AssessmentNotFound(id))
    }

    pub fn confirm(
        &mut self,
        id: AssessmentId,
        confirmer: UserId,
        now: DateTime<Utc>,
    ) -> Result<Recorded<()>, CompetencyError> {
        let event = self.get_mut(id)?.confirm(confirmer, now)?;
        tracing::debug!(assessment = %id, confirmer = %confirmer, "assessment confirmed");
        Ok(Recorded::new((), event))
    }

    /// Revise an unconfirmed assessment.
    ///
    /// # Errors
    /// - `AssessmentConfirmed` once the assessment is confirmed
    /// - `Validation` if the competency does not define `level`
    pub fn update<C: CompetencyLookup + ?Sized>(
        &mut self,
        competencies: &C,
        id: AssessmentId,
        level: CompetencyLevel,
        score: AssessmentScore,
        comment: Option<String>,
    ) -> Result<Recorded<()>, CompetencyError> {
        let assessment = self.get(id)?;
        if assessment.is_confirmed() {
            return Err(CompetencyError::AssessmentConfirmed(id));
        }
        check_offered_level(competencies, assessment.competency, level)?;

        let event = self.get_mut(id)?.update(level, score, comment)?;
        Ok(Recorded::new((), event))
    }

    /// The newest `limit` assessments of `user` in `competency`, newest first.
    #[must_use]
    pub fn history(
        &self,
        user: UserId,
        competency: CompetencyId,
        limit: usize,
    ) -> Vec<&CompetencyAssessment> {
        let mut matching: Vec<&CompetencyAssessment> = self
            .iter()
            .filter(|a| a.subject == user && a.competency == competency)
            .collect();
        matching.sort_by(|a, b| b.assessed_at.cmp(&a.assessed_at).then(b.id.cmp(&a.id)));
        matching.truncate(limit);
        matching
    }

    /// Assessments still awaiting confirmation.
    #[must_use]
    pub fn pending_confirmation(&self) -> Vec<&CompetencyAssessment> {
        self.iter().filter(|a| !a.is_confirmed()).collect()
    }

    #[must_use]
    pub fn statistics(&self, user: UserId) -> AssessmentStatistics {
        let mut stats = AssessmentStatistics::default();
        let mut score_sum: u64 = 0;

        for assessment in self.iter().filter(|a| a.subject == user) {
            stats.total += 1;
            if assessment.is_confirmed() {
                stats.confirmed += 1;
            }
            if assessment.is_self_assessment() {
                stats.self_assessments += 1;
            }
            score_sum += u64::from(assessment.score.hundredths());
        }

        if stats.total > 0 {
            stats.average_score = (score_sum / stats.total as u64) as u32;
        }
        stats
    }

    /// Whether the assessment is younger than the standard validity window.
    pub fn is_valid(&self, id: AssessmentId, now: DateTime<Utc>) -> Result<bool, CompetencyError> {
        Ok(self.get(id)?.is_current(now, ASSESSMENT_VALIDITY_DAYS))
    }

    /// Compare two recorded assessments, `earlier` first.
    pub fn compare(
        &self,
        earlier: AssessmentId,
        later: AssessmentId,
    ) -> Result<AssessmentComparison, CompetencyError> {
        Ok(compare(self.get(earlier)?, self.get(later)?))
    }

    /// Progress along the path `from -> current -> target`.
    #[must_use]
    pub fn level_progress(
        from: CompetencyLevel,
        current: CompetencyLevel,
        target: CompetencyLevel,
    ) -> LevelProgress {
        LevelProgress::between(from, current, target)
    }
}

impl AssessmentHistory for AssessmentWorkflow {
    fn assessments_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<CompetencyAssessment>, CompetencyError> {
        Ok(self.iter().filter(|a| a.subject == user).cloned().collect())
    }

    fn assessments_for_competency(
        &self,
        competency: CompetencyId,
    ) -> Result<Vec<CompetencyAssessment>, CompetencyError> {
        Ok(self
            .iter()
            .filter(|a| a.competency == competency)
            .cloned()
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
