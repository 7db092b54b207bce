//! # User Competency Tracker
//!
//! Per (user, competency) current level, optional target level and the derived
//! progress percentage.
//!
//! ## Progress formula
//!
//! ```text
//! no target          -> 0
//! current >= target  -> 100
//! otherwise          -> round(100 * (current - 1) / (target - 1))
//! ```
//!
//! The interpolation assumes every tracked competency starts at level 1, even
//! when the first recorded level is higher.

use crate::assessment::CompetencyAssessment;
use crate::events::{DomainEvent, Recorded};
use crate::level::CompetencyLevel;
use crate::types::{CompetencyId, UserCompetencyId, UserId};
use crate::CompetencyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// USER COMPETENCY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCompetency {
    id: UserCompetencyId,
    user: UserId,
    competency: CompetencyId,
    current: CompetencyLevel,
    target: Option<CompetencyLevel>,
    last_updated: DateTime<Utc>,
}

impl UserCompetency {
    /// Start tracking a competency at `current`.
    ///
    /// # Errors
    /// `InvalidTarget` if `target` is not strictly above `current`.
    pub fn create(
        id: UserCompetencyId,
        user: UserId,
        competency: CompetencyId,
        current: CompetencyLevel,
        target: Option<CompetencyLevel>,
        now: DateTime<Utc>,
    ) -> Result<Recorded<Self>, CompetencyError> {
        if let Some(target) = target {
            check_target(current, target)?;
        }

        Ok(Recorded::new(
            Self {
                id,
                user,
                competency,
                current,
                target,
                last_updated: now,
            },
            DomainEvent::UserCompetencyCreated {
                user,
                competency,
                level: current,
            },
        ))
    }

    #[must_use]
    pub fn id(&self) -> UserCompetencyId {
        self.id
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn competency(&self) -> CompetencyId {
        self.competency
    }

    #[must_use]
    pub fn current_level(&self) -> CompetencyLevel {
        self.current
    }

    #[must_use]
    pub fn target_level(&self) -> Option<CompetencyLevel> {
        self.target
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    #[must_use]
    pub fn has_target_level(&self) -> bool {
        self.target.is_some()
    }

    /// Set a new target.
    ///
    /// # Errors
    /// `InvalidTarget` if `target <= current`. The old target is kept.
    pub fn set_target_level(
        &mut self,
        target: CompetencyLevel,
    ) -> Result<DomainEvent, CompetencyError> {
        check_target(self.current, target)?;
        self.target = Some(target);
        Ok(DomainEvent::TargetLevelSet {
            user: self.user,
            competency: self.competency,
            target,
        })
    }

    pub fn remove_target_level(&mut self) {
        self.target = None;
    }

    /// Replace the current level and stamp `last_updated`.
    pub fn update_progress(&mut self, level: CompetencyLevel, now: DateTime<Utc>) -> DomainEvent {
        let previous = self.current;
        self.current = level;
        self.last_updated = now;
        DomainEvent::UserCompetencyProgressUpdated {
            user: self.user,
            competency: self.competency,
            previous,
            current: level,
        }
    }

    /// Progress toward the target in `[0, 100]`.
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        let Some(target) = self.target else {
            return 0;
        };
        if self.current.meets_requirement(target) {
            return 100;
        }

        let done = u32::from(self.current.value() - 1);
        let span = u32::from(target.value() - 1);
        if span == 0 {
            return 100;
        }
        // round half-up
        let percent = (200 * done + span) / (2 * span);
        percent.min(100) as u8
    }

    #[must_use]
    pub fn is_target_reached(&self) -> bool {
        self.target
            .is_some_and(|target| self.current.meets_requirement(target))
    }

    /// Levels left to reach the target, never negative. `None` without a target.
    #[must_use]
    pub fn gap_to_target(&self) -> Option<i8> {
        self.target.map(|target| self.current.gap_to(target).max(0))
    }

    #[must_use]
    pub fn days_since_last_update(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_days()
    }
}

fn check_target(current: CompetencyLevel, target: CompetencyLevel) -> Result<(), CompetencyError> {
    if target.is_above(current) {
        Ok(())
    } else {
        Err(CompetencyError::InvalidTarget { current, target })
    }
}

// =============================================================================
// TRACKER
// =============================================================================

/// In-memory arena keyed by (user, competency).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCompetencyTracker {
    entries: BTreeMap<(UserId, CompetencyId), UserCompetency>,
    next_id: u64,
}

impl UserCompetencyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserCompetency> {
        self.entries.values()
    }

    /// Start tracking a (user, competency) pair.
    ///
    /// # Errors
    /// - `DuplicateKey` if the pair is already tracked
    /// - `InvalidTarget` if `target` is not above `current`
    pub fn create(
        &mut self,
        user: UserId,
        competency: CompetencyId,
        current: CompetencyLevel,
        target: Option<CompetencyLevel>,
        now: DateTime<Utc>,
    ) -> Result<Recorded<UserCompetencyId>, CompetencyError> {
        if self.entries.contains_key(&(user, competency)) {
            return Err(CompetencyError::DuplicateKey(format!(
                "{} already tracks {}",
                user, competency
            )));
        }

        let id = UserCompetencyId(self.next_id.saturating_add(1));
        let (entry, events) =
            UserCompetency::create(id, user, competency, current, target, now)?.into_parts();
        self.next_id = id.value();
        self.entries.insert((user, competency), entry);

        tracing::debug!(
            user = %user,
            competency = %competency,
            level = current.value(),
            "tracking started"
        );
        Ok(Recorded::with_events(id, events))
    }

    pub fn get(
        &self,
        user: UserId,
        competency: CompetencyId,
    ) -> Result<&UserCompetency, CompetencyError> {
        self.entries
            .get(&(user, competency))
            .ok_or(CompetencyError::UserCompetencyNotFound { user, competency })
    }

    fn get_mut(
        &mut self,
        user: UserId,
        competency: CompetencyId,
    ) -> Result<&mut UserCompetency, CompetencyError> {
        self.entries
            .get_mut(&(user, competency))
            .ok_or(CompetencyError::UserCompetencyNotFound { user, competency })
    }

    /// Every tracked competency of `user`, ordered by competency id.
    #[must_use]
    pub fn for_user(&self, user: UserId) -> Vec<&UserCompetency> {
        self.entries
            .range((user, CompetencyId(0))..=(user, CompetencyId(u64::MAX)))
            .map(|(_, entry)| entry)
            .collect()
    }

    pub fn set_target_level(
        &mut self,
        user: UserId,
        competency: CompetencyId,
        target: CompetencyLevel,
    ) -> Result<Recorded<()>, CompetencyError> {
        let event = self.get_mut(user, competency)?.set_target_level(target)?;
        Ok(Recorded::new((), event))
    }

    pub fn remove_target_level(
        &mut self,
        user: UserId,
        competency: CompetencyId,
    ) -> Result<(), CompetencyError> {
        self.get_mut(user, competency)?.remove_target_level();
        Ok(())
    }

    pub fn update_progress(
        &mut self,
        user: UserId,
        competency: CompetencyId,
        level: CompetencyLevel,
        now: DateTime<Utc>,
    ) -> Result<Recorded<()>, CompetencyError> {
        let event = self.get_mut(user, competency)?.update_progress(level, now);
        Ok(Recorded::new((), event))
    }

    /// Fold a recorded assessment into the tracker.
    ///
    /// Creates the pair at the assessed level, or advances the existing entry
    /// to it.
    pub fn apply_assessment(
        &mut self,
        assessment: &CompetencyAssessment,
        now: DateTime<Utc>,
    ) -> Result<Recorded<UserCompetencyId>, CompetencyError> {
        let user = assessment.subject();
        let competency = assessment.competency();

        match self.entries.get_mut(&(user, competency)) {
            Some(entry) => {
                let event = entry.update_progress(assessment.level(), now);
                Ok(Recorded::new(entry.id(), event))
            }
            None => self.create(user, competency, assessment.level(), None, now),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
