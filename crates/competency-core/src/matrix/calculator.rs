//! # Matrix Calculator
//!
//! Compares a user's confirmed assessment levels with a position's matrix.
//!
//! For every requirement the user's level is the highest *confirmed* level
//! recorded for that competency, or 0 when there is none. Then:
//!
//! ```text
//! gap        = max(0, required - user)
//! satisfied  = user >= required
//! percentage = floor(100 * satisfied / count), 100 for an empty group
//! ```
//!
//! All arithmetic is integer. Results are plain serde structures.

use super::plan::{self, DevelopmentPhase, GapEntry, GapGroups, Recommendation};
use super::{CompetencyMatrix, RequirementType};
use crate::level::CompetencyLevel;
use crate::primitives::PRIORITY_GAP_LIMIT;
use crate::repository::{AssessmentHistory, MatrixLookup};
use crate::types::{CompetencyId, MatrixId, PositionId, UserId};
use crate::CompetencyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// REPORTS
// =============================================================================

/// How one requirement compares with the user's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDetail {
    pub competency: CompetencyId,
    pub required_level: CompetencyLevel,
    /// Highest confirmed level, 0 when never assessed.
    pub user_level: u8,
    #[serde(rename = "type")]
    pub requirement_type: RequirementType,
    pub is_satisfied: bool,
    pub gap: u8,
}

/// Satisfied share of the requirements, overall and per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub overall_percentage: u8,
    pub core_percentage: u8,
    pub nice_to_have_percentage: u8,
    pub total_requirements: usize,
    pub satisfied_requirements: usize,
}

impl Completeness {
    /// Aggregate per-requirement details.
    #[must_use]
    pub fn from_details(details: &[RequirementDetail]) -> Self {
        let count = |kind: Option<RequirementType>| {
            let mut total = 0usize;
            let mut satisfied = 0usize;
            for detail in details
                .iter()
                .filter(|d| kind.is_none_or(|k| d.requirement_type == k))
            {
                total += 1;
                if detail.is_satisfied {
                    satisfied += 1;
                }
            }
            (satisfied, total)
        };

        let (satisfied, total) = count(None);
        let (core_satisfied, core_total) = count(Some(RequirementType::Core));
        let (nice_satisfied, nice_total) = count(Some(RequirementType::NiceToHave));

        Self {
            overall_percentage: percentage(satisfied, total),
            core_percentage: percentage(core_satisfied, core_total),
            nice_to_have_percentage: percentage(nice_satisfied, nice_total),
            total_requirements: total,
            satisfied_requirements: satisfied,
        }
    }

    /// The placeholder given to a user whose calculation failed.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            overall_percentage: 0,
            core_percentage: 0,
            nice_to_have_percentage: 0,
            total_requirements: 0,
            satisfied_requirements: 0,
        }
    }
}

/// `floor(100 * part / whole)`; an empty group counts as fully satisfied.
fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 100;
    }
    (part.saturating_mul(100) / whole).min(100) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixProgressReport {
    pub user: UserId,
    pub matrix: MatrixId,
    pub matrix_name: String,
    pub position: PositionId,
    pub completeness: Completeness,
    pub requirements: Vec<RequirementDetail>,
    pub recommendations: Vec<Recommendation>,
    pub calculated_at: DateTime<Utc>,
}

impl MatrixProgressReport {
    /// Sum of all requirement gaps.
    #[must_use]
    pub fn total_gap(&self) -> u64 {
        self.requirements.iter().map(|d| u64::from(d.gap)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub user: UserId,
    pub matrix: MatrixId,
    pub gaps: GapGroups,
    pub priority_gaps: Vec<GapEntry>,
    pub total_core_gaps: usize,
    pub total_nice_to_have_gaps: usize,
    pub total_optional_gaps: usize,
    pub development_plan: Vec<DevelopmentPhase>,
}

/// One row of a position comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserComparison {
    pub user: UserId,
    pub overall_percentage: u8,
    pub core_percentage: u8,
    pub nice_to_have_percentage: u8,
    /// `u64::MAX` when the calculation failed.
    pub total_gap: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionComparison {
    pub position: PositionId,
    pub matrix: MatrixId,
    pub matrix_name: String,
    pub comparisons: Vec<UserComparison>,
}

// =============================================================================
// CALCULATOR
// =============================================================================

/// Read-only calculator over a matrix source and an assessment source.
pub struct MatrixCalculator<'a, M: ?Sized, A: ?Sized> {
    matrices: &'a M,
    assessments: &'a A,
}

impl<'a, M, A> MatrixCalculator<'a, M, A>
where
    M: MatrixLookup + ?Sized,
    A: AssessmentHistory + ?Sized,
{
    pub fn new(matrices: &'a M, assessments: &'a A) -> Self {
        Self {
            matrices,
            assessments,
        }
    }

    fn matrix(&self, id: MatrixId) -> Result<CompetencyMatrix, CompetencyError> {
        self.matrices
            .matrix_by_id(id)?
            .ok_or(CompetencyError::MatrixNotFound(id))
    }

    /// Highest confirmed level per competency.
    fn confirmed_levels(
        &self,
        user: UserId,
    ) -> Result<BTreeMap<CompetencyId, u8>, CompetencyError> {
        let mut levels: BTreeMap<CompetencyId, u8> = BTreeMap::new();
        for assessment in self
            .assessments
            .assessments_for_user(user)?
            .iter()
            .filter(|a| a.is_confirmed())
        {
            let level = assessment.level().value();
            levels
                .entry(assessment.competency())
                .and_modify(|best| *best = (*best).max(level))
                .or_insert(level);
        }
        Ok(levels)
    }

    /// Per-requirement comparison of `user` against `matrix`.
    pub fn requirement_details(
        &self,
        user: UserId,
        matrix: &CompetencyMatrix,
    ) -> Result<Vec<RequirementDetail>, CompetencyError> {
        let levels = self.confirmed_levels(user)?;
        Ok(matrix
            .requirements()
            .iter()
            .map(|requirement| {
                let user_level = levels.get(&requirement.competency).copied().unwrap_or(0);
                RequirementDetail {
                    competency: requirement.competency,
                    required_level: requirement.required_level,
                    user_level,
                    requirement_type: requirement.requirement_type,
                    is_satisfied: requirement.is_satisfied_by(user_level),
                    gap: requirement.gap(user_level),
                }
            })
            .collect())
    }

    /// Progress report of `user` against the matrix `matrix_id`.
    ///
    /// # Errors
    /// - `MatrixNotFound` if the matrix is unknown
    /// - any error raised by the lookups
    pub fn calculate_user_matrix_progress(
        &self,
        user: UserId,
        matrix_id: MatrixId,
        now: DateTime<Utc>,
    ) -> Result<MatrixProgressReport, CompetencyError> {
        let matrix = self.matrix(matrix_id)?;
        self.progress_against(user, &matrix, now)
    }

    fn progress_against(
        &self,
        user: UserId,
        matrix: &CompetencyMatrix,
        now: DateTime<Utc>,
    ) -> Result<MatrixProgressReport, CompetencyError> {
        let requirements = self.requirement_details(user, matrix)?;
        let completeness = Completeness::from_details(&requirements);
        let recommendations = plan::generate_recommendations(&requirements);

        tracing::debug!(
            user = %user,
            matrix = %matrix.id(),
            overall = completeness.overall_percentage,
            "matrix progress calculated"
        );

        Ok(MatrixProgressReport {
            user,
            matrix: matrix.id(),
            matrix_name: matrix.name().to_string(),
            position: matrix.position(),
            completeness,
            requirements,
            recommendations,
            calculated_at: now,
        })
    }

    /// Gaps grouped by type, the top core gaps and the development plan.
    pub fn competency_gap_analysis(
        &self,
        user: UserId,
        matrix_id: MatrixId,
    ) -> Result<GapAnalysis, CompetencyError> {
        let matrix = self.matrix(matrix_id)?;
        let details = self.requirement_details(user, &matrix)?;
        let gaps = GapGroups::from_details(&details);

        Ok(GapAnalysis {
            user,
            matrix: matrix_id,
            priority_gaps: gaps.core.iter().take(PRIORITY_GAP_LIMIT).copied().collect(),
            total_core_gaps: gaps.core.len(),
            total_nice_to_have_gaps: gaps.nice_to_have.len(),
            total_optional_gaps: gaps.optional.len(),
            development_plan: plan::generate_development_plan(&gaps),
            gaps,
        })
    }

    /// Rank `users` against the first active matrix of `position`.
    ///
    /// Ordering: overall completeness descending, then total gap ascending,
    /// then input order. A user whose calculation fails is kept with 0% and
    /// `total_gap = u64::MAX` so they sort last.
    ///
    /// # Errors
    /// `NoActiveMatrix` if the position has no active matrix.
    pub fn compare_users_for_position(
        &self,
        position: PositionId,
        users: &[UserId],
        now: DateTime<Utc>,
    ) -> Result<PositionComparison, CompetencyError> {
        let matrix = self
            .matrices
            .matrices_by_position(position)?
            .into_iter()
            .find(CompetencyMatrix::is_active)
            .ok_or(CompetencyError::NoActiveMatrix(position))?;

        let mut comparisons: Vec<UserComparison> = users
            .iter()
            .map(|&user| match self.progress_against(user, &matrix, now) {
                Ok(report) => UserComparison {
                    user,
                    overall_percentage: report.completeness.overall_percentage,
                    core_percentage: report.completeness.core_percentage,
                    nice_to_have_percentage: report.completeness.nice_to_have_percentage,
                    total_gap: report.total_gap(),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(
                        user = %user,
                        position = %position,
                        error = %e,
                        "user comparison failed"
                    );
                    let zero = Completeness::zero();
                    UserComparison {
                        user,
                        overall_percentage: zero.overall_percentage,
                        core_percentage: zero.core_percentage,
                        nice_to_have_percentage: zero.nice_to_have_percentage,
                        total_gap: u64::MAX,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        comparisons.sort_by(|a, b| {
            b.overall_percentage
                .cmp(&a.overall_percentage)
                .then(a.total_gap.cmp(&b.total_gap))
        });

        Ok(PositionComparison {
            position,
            matrix: matrix.id(),
            matrix_name: matrix.name().to_string(),
            comparisons,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{AssessmentDraft, CompetencyAssessment};
    use crate::matrix::{MatrixDraft, MatrixRegistry, Requirement};
    use crate::score::AssessmentScore;
    use crate::types::AssessmentId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single().expect("valid date")
    }

    /// Assessment source backed by a plain list.
    struct Assessments(Vec<CompetencyAssessment>);

    impl Assessments {
        fn record(&mut self, user: u64, competency: u64, level: u8, confirmed: bool) {
            let id = AssessmentId(self.0.len() as u64 + 1);
            let mut assessment = CompetencyAssessment::create(
                id,
                AssessmentDraft {
                    competency: CompetencyId(competency),
                    subject: UserId(user),
                    assessor: UserId(100),
                    level: CompetencyLevel::from_value(level).expect("level"),
                    score: AssessmentScore::from_percentage(75).expect("score"),
                    comment: None,
                },
                now(),
            )
            .expect("assessment")
            .value;
            if confirmed {
                assessment.confirm(UserId(100), now()).expect("confirm");
            }
            self.0.push(assessment);
        }
    }

    impl AssessmentHistory for Assessments {
        fn assessments_for_user(
            &self,
            user: UserId,
        ) -> Result<Vec<CompetencyAssessment>, CompetencyError> {
            Ok(self.0.iter().filter(|a| a.subject() == user).cloned().collect())
        }

        fn assessments_for_competency(
            &self,
            competency: CompetencyId,
        ) -> Result<Vec<CompetencyAssessment>, CompetencyError> {
            Ok(self
                .0
                .iter()
                .filter(|a| a.competency() == competency)
                .cloned()
                .collect())
        }
    }

    fn registry() -> (MatrixRegistry, MatrixId) {
        let mut registry = MatrixRegistry::new();
        let id = registry
            .create(MatrixDraft {
                name: "Backend Developer".to_string(),
                position: PositionId(1),
                requirements: vec![
                    Requirement::new(
                        CompetencyId(1),
                        CompetencyLevel::Intermediate,
                        RequirementType::Core,
                    ),
                    Requirement::new(
                        CompetencyId(2),
                        CompetencyLevel::Advanced,
                        RequirementType::Core,
                    ),
                    Requirement::new(
                        CompetencyId(3),
                        CompetencyLevel::Elementary,
                        RequirementType::NiceToHave,
                    ),
                ],
                active: true,
            })
            .expect("matrix");
        (registry, id)
    }

    #[test]
    fn only_confirmed_levels_count() {
        let (registry, matrix) = registry();
        let mut assessments = Assessments(Vec::new());
        assessments.record(1, 1, 5, false);
        assessments.record(1, 1, 2, true);
        assessments.record(1, 1, 3, true);

        let calculator = MatrixCalculator::new(&registry, &assessments);
        let report = calculator
            .calculate_user_matrix_progress(UserId(1), matrix, now())
            .expect("progress");

        assert_eq!(report.requirements[0].user_level, 3);
        assert!(report.requirements[0].is_satisfied);
        assert_eq!(report.requirements[1].user_level, 0);
        assert_eq!(report.requirements[1].gap, 4);
        assert_eq!(report.calculated_at, now());
    }

    #[test]
    fn completeness_percentages() {
        let (registry, matrix) = registry();
        let mut assessments = Assessments(Vec::new());
        assessments.record(1, 1, 2, true);
        assessments.record(1, 2, 4, true);
        assessments.record(1, 3, 1, true);

        let calculator = MatrixCalculator::new(&registry, &assessments);
        let report = calculator
            .calculate_user_matrix_progress(UserId(1), matrix, now())
            .expect("progress");

        assert_eq!(report.completeness.core_percentage, 50);
        assert_eq!(report.completeness.nice_to_have_percentage, 0);
        assert_eq!(report.completeness.overall_percentage, 33);
        assert_eq!(report.total_gap(), 2);
    }

    #[test]
    fn empty_matrix_is_fully_complete() {
        let mut registry = MatrixRegistry::new();
        let matrix = registry
            .create(MatrixDraft {
                name: "Intern".to_string(),
                position: PositionId(2),
                requirements: Vec::new(),
                active: true,
            })
            .expect("matrix");
        let assessments = Assessments(Vec::new());

        let report = MatrixCalculator::new(&registry, &assessments)
            .calculate_user_matrix_progress(UserId(1), matrix, now())
            .expect("progress");
        assert_eq!(report.completeness.overall_percentage, 100);
        assert_eq!(report.completeness.core_percentage, 100);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn unknown_matrix_is_not_found() {
        let (registry, _) = registry();
        let assessments = Assessments(Vec::new());
        let err = MatrixCalculator::new(&registry, &assessments)
            .calculate_user_matrix_progress(UserId(1), MatrixId(42), now())
            .expect_err("missing");
        assert_eq!(err, CompetencyError::MatrixNotFound(MatrixId(42)));
    }

    #[test]
    fn gap_analysis_groups_and_plans() {
        let (registry, matrix) = registry();
        let assessments = Assessments(Vec::new());

        let analysis = MatrixCalculator::new(&registry, &assessments)
            .competency_gap_analysis(UserId(1), matrix)
            .expect("analysis");

        assert_eq!(analysis.total_core_gaps, 2);
        assert_eq!(analysis.total_nice_to_have_gaps, 1);
        assert_eq!(analysis.priority_gaps[0].competency, CompetencyId(2));
        assert_eq!(analysis.development_plan.len(), 2);
        assert_eq!(analysis.development_plan[0].phase, 1);
        assert_eq!(analysis.development_plan[1].phase, 2);
    }

    #[test]
    fn compare_requires_active_matrix() {
        let mut registry = MatrixRegistry::new();
        registry
            .create(MatrixDraft {
                name: "Old".to_string(),
                position: PositionId(3),
                requirements: Vec::new(),
                active: false,
            })
            .expect("matrix");
        let assessments = Assessments(Vec::new());

        let err = MatrixCalculator::new(&registry, &assessments)
            .compare_users_for_position(PositionId(3), &[UserId(1)], now())
            .expect_err("inactive");
        assert_eq!(err, CompetencyError::NoActiveMatrix(PositionId(3)));
    }

    #[test]
    fn compare_ties_break_on_total_gap() {
        let (registry, _) = registry();
        let mut assessments = Assessments(Vec::new());
        // Both satisfy nothing; user 2 is closer.
        assessments.record(2, 1, 2, true);
        assessments.record(2, 2, 3, true);

        let ranking = MatrixCalculator::new(&registry, &assessments)
            .compare_users_for_position(PositionId(1), &[UserId(1), UserId(2)], now())
            .expect("compare");

        let order: Vec<UserId> = ranking.comparisons.iter().map(|c| c.user).collect();
        assert_eq!(order, vec![UserId(2), UserId(1)]);
        assert_eq!(ranking.matrix_name, "Backend Developer");
    }
}
