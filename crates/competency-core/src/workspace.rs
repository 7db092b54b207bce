//! # Workspace
//!
//! Aggregates every in-memory component so the binary can load, query and
//! snapshot them as one unit. Components stay independent: the workspace only
//! wires calls that span two of them.

use crate::assessment::{AssessmentDraft, AssessmentWorkflow};
use crate::catalog::CompetencyCatalog;
use crate::events::Recorded;
use crate::matrix::{MatrixCalculator, MatrixRegistry};
use crate::program::ProgramProgressTracker;
use crate::tracker::UserCompetencyTracker;
use crate::types::{AssessmentId, UserId};
use crate::CompetencyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counts per component, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceStats {
    pub competencies: usize,
    pub active_competencies: usize,
    pub assessments: usize,
    pub pending_confirmation: usize,
    pub tracked_competencies: usize,
    pub matrices: usize,
    pub programs: usize,
    pub enrollments: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    pub catalog: CompetencyCatalog,
    pub assessments: AssessmentWorkflow,
    pub tracker: UserCompetencyTracker,
    pub matrices: MatrixRegistry,
    pub programs: ProgramProgressTracker,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an assessment and fold its level into the tracker.
    pub fn record_assessment(
        &mut self,
        draft: AssessmentDraft,
        now: DateTime<Utc>,
    ) -> Result<Recorded<AssessmentId>, CompetencyError> {
        let mut recorded = self.assessments.create(&self.catalog, draft, now)?;
        let assessment = self.assessments.get(recorded.value)?;
        let (_, events) = self.tracker.apply_assessment(assessment, now)?.into_parts();
        for event in events {
            recorded.push(event);
        }
        Ok(recorded)
    }

    /// Confirm an assessment.
    pub fn confirm_assessment(
        &mut self,
        id: AssessmentId,
        confirmer: UserId,
        now: DateTime<Utc>,
    ) -> Result<Recorded<()>, CompetencyError> {
        self.assessments.confirm(id, confirmer, now)
    }

    /// A calculator over this workspace's matrices and assessments.
    #[must_use]
    pub fn calculator(&self) -> MatrixCalculator<'_, MatrixRegistry, AssessmentWorkflow> {
        MatrixCalculator::new(&self.matrices, &self.assessments)
    }

    #[must_use]
    pub fn stats(&self) -> WorkspaceStats {
        WorkspaceStats {
            competencies: self.catalog.len(),
            active_competencies: self.catalog.active().len(),
            assessments: self.assessments.len(),
            pending_confirmation: self.assessments.pending_confirmation().len(),
            tracked_competencies: self.tracker.len(),
            matrices: self.matrices.len(),
            programs: self.programs.programs().count(),
            enrollments: self.programs.enrollments().count(),
        }
    }
}
