//! # Scenario Tier Tests (S1-S5)
//!
//! End-to-end scenarios through the public API. If ANY tier fails, the
//! engine is INVALID.
//!
//! ## Tiers
//! - S1: Matrix progress and recommendations
//! - S2: Position comparison with a failing user
//! - S3: Track completion
//! - S4: Target level validation
//! - S5: Confirmed assessments are immutable

use chrono::{DateTime, TimeZone, Utc};
use competency_core::{
    AssessmentDraft, AssessmentHistory, AssessmentScore, AssessmentWorkflow, CompetencyAssessment,
    CompetencyCatalog, CompetencyCategory, CompetencyDraft, CompetencyError, CompetencyId,
    CompetencyLevel, MatrixCalculator, MatrixDraft, MatrixRegistry, PositionId, Priority,
    Requirement, RequirementType, UserId,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).single().expect("valid date")
}

fn level(value: u8) -> CompetencyLevel {
    CompetencyLevel::from_value(value).expect("level")
}

/// Catalog with three competencies: SQL, API design, communication.
fn catalog() -> (CompetencyCatalog, [CompetencyId; 3]) {
    let mut catalog = CompetencyCatalog::new();
    let mut create = |code: &str, name: &str| {
        catalog
            .create(CompetencyDraft {
                code: code.to_string(),
                name: name.to_string(),
                description: String::new(),
                category: CompetencyCategory::Technical,
                parent: None,
                levels: None,
            })
            .expect("competency")
            .value
    };
    let ids = [
        create("TECH-SQL-001", "SQL"),
        create("TECH-API-001", "API Design"),
        create("SOFT-COMM-001", "Communication"),
    ];
    (catalog, ids)
}

/// Record a confirmed assessment.
fn assess(
    workflow: &mut AssessmentWorkflow,
    catalog: &CompetencyCatalog,
    user: UserId,
    competency: CompetencyId,
    value: u8,
) {
    let id = workflow
        .create(
            catalog,
            AssessmentDraft {
                competency,
                subject: user,
                assessor: UserId(900),
                level: level(value),
                score: AssessmentScore::from_percentage(80).expect("score"),
                comment: None,
            },
            now(),
        )
        .expect("assessment")
        .value;
    workflow.confirm(id, UserId(900), now()).expect("confirm");
}

/// Matrix: two core requirements (3, 4) and one nice-to-have (2).
fn matrix(registry: &mut MatrixRegistry, ids: [CompetencyId; 3]) -> competency_core::MatrixId {
    registry
        .create(MatrixDraft {
            name: "Backend Developer".to_string(),
            position: PositionId(10),
            requirements: vec![
                Requirement::new(ids[0], level(3), RequirementType::Core),
                Requirement::new(ids[1], level(4), RequirementType::Core),
                Requirement::new(ids[2], level(2), RequirementType::NiceToHave),
            ],
            active: true,
        })
        .expect("matrix")
}

// =============================================================================
// TIER S1: MATRIX PROGRESS
// =============================================================================

mod s1_matrix_progress {
    use super::*;

    /// S1.1: user levels {2, 4, 1} against {3, 4, 2}.
    #[test]
    fn completeness_gaps_and_recommendations() {
        let (catalog, ids) = catalog();
        let mut workflow = AssessmentWorkflow::new();
        let user = UserId(1);
        assess(&mut workflow, &catalog, user, ids[0], 2);
        assess(&mut workflow, &catalog, user, ids[1], 4);
        assess(&mut workflow, &catalog, user, ids[2], 1);

        let mut registry = MatrixRegistry::new();
        let matrix = matrix(&mut registry, ids);
        let calculator = MatrixCalculator::new(&registry, &workflow);

        let report = calculator
            .calculate_user_matrix_progress(user, matrix, now())
            .expect("progress");
        assert_eq!(report.completeness.core_percentage, 50);
        assert_eq!(report.completeness.nice_to_have_percentage, 0);
        assert_eq!(report.position, PositionId(10));

        let high = report
            .recommendations
            .iter()
            .find(|r| r.priority == Priority::High)
            .expect("high priority");
        assert_eq!(high.competencies, vec![ids[0]]);

        let quick = report
            .recommendations
            .iter()
            .find(|r| r.priority == Priority::Medium)
            .expect("quick win");
        assert_eq!(quick.competencies, vec![ids[0], ids[2]]);

        let analysis = calculator
            .competency_gap_analysis(user, matrix)
            .expect("analysis");
        assert_eq!(analysis.gaps.core.len(), 1);
        assert_eq!(analysis.gaps.core[0].gap, 1);
        assert_eq!(analysis.gaps.nice_to_have.len(), 1);
        assert_eq!(analysis.gaps.nice_to_have[0].gap, 1);
        assert!(analysis.gaps.optional.is_empty());
    }

    /// S1.2: unconfirmed assessments are ignored.
    #[test]
    fn unconfirmed_assessment_ignored() {
        let (catalog, ids) = catalog();
        let mut workflow = AssessmentWorkflow::new();
        workflow
            .create(
                &catalog,
                AssessmentDraft {
                    competency: ids[0],
                    subject: UserId(1),
                    assessor: UserId(1),
                    level: level(5),
                    score: AssessmentScore::from_percentage(99).expect("score"),
                    comment: None,
                },
                now(),
            )
            .expect("assessment");

        let mut registry = MatrixRegistry::new();
        let matrix = matrix(&mut registry, ids);
        let report = MatrixCalculator::new(&registry, &workflow)
            .calculate_user_matrix_progress(UserId(1), matrix, now())
            .expect("progress");

        assert_eq!(report.requirements[0].user_level, 0);
        assert_eq!(report.completeness.overall_percentage, 0);
    }
}

// =============================================================================
// TIER S2: POSITION COMPARISON
// =============================================================================

mod s2_position_comparison {
    use super::*;

    /// Assessment source that fails for one user.
    struct FailingFor<'a> {
        inner: &'a AssessmentWorkflow,
        broken: UserId,
    }

    impl AssessmentHistory for FailingFor<'_> {
        fn assessments_for_user(
            &self,
            user: UserId,
        ) -> Result<Vec<CompetencyAssessment>, CompetencyError> {
            if user == self.broken {
                return Err(CompetencyError::Validation("storage offline".to_string()));
            }
            self.inner.assessments_for_user(user)
        }

        fn assessments_for_competency(
            &self,
            competency: CompetencyId,
        ) -> Result<Vec<CompetencyAssessment>, CompetencyError> {
            self.inner.assessments_for_competency(competency)
        }
    }

    /// S2.1: the failing user is kept, last, with the worst placeholder.
    #[test]
    fn failing_user_ranked_last() {
        let (catalog, ids) = catalog();
        let mut workflow = AssessmentWorkflow::new();
        let (a, b, c) = (UserId(1), UserId(2), UserId(3));
        assess(&mut workflow, &catalog, a, ids[0], 3);
        assess(&mut workflow, &catalog, c, ids[0], 3);
        assess(&mut workflow, &catalog, c, ids[1], 4);
        assess(&mut workflow, &catalog, c, ids[2], 2);

        let mut registry = MatrixRegistry::new();
        matrix(&mut registry, ids);
        let source = FailingFor {
            inner: &workflow,
            broken: b,
        };

        let ranking = MatrixCalculator::new(&registry, &source)
            .compare_users_for_position(PositionId(10), &[a, b, c], now())
            .expect("compare");

        let order: Vec<UserId> = ranking.comparisons.iter().map(|r| r.user).collect();
        assert_eq!(order, vec![c, a, b]);

        let failed = &ranking.comparisons[2];
        assert_eq!(failed.overall_percentage, 0);
        assert_eq!(failed.total_gap, u64::MAX);
        assert!(failed.error.as_deref().is_some_and(|e| e.contains("storage offline")));

        assert_eq!(ranking.comparisons[0].overall_percentage, 100);
        assert_eq!(ranking.comparisons[1].overall_percentage, 33);
    }

    /// S2.2: an unknown position fails as not found.
    #[test]
    fn unknown_position_not_found() {
        let registry = MatrixRegistry::new();
        let workflow = AssessmentWorkflow::new();
        let err = MatrixCalculator::new(&registry, &workflow)
            .compare_users_for_position(PositionId(99), &[UserId(1)], now())
            .expect_err("no matrix");
        assert_eq!(err.kind(), competency_core::ErrorKind::NotFound);
    }
}

// =============================================================================
// TIER S3: TRACK COMPLETION
// =============================================================================

mod s3_track_completion {
    use super::*;
    use competency_core::{CourseId, TrackId, TrackProgress};

    /// S3.1: one of three courses is 33%, never 34%.
    #[test]
    fn percentage_floors_then_completes() {
        let mut progress =
            TrackProgress::start(UserId(1), TrackId(1), 3, now()).expect("start");

        progress
            .mark_course_completed(CourseId(1), now())
            .expect("first");
        assert_eq!(progress.progress_percentage(), 33);
        assert!(progress.completed_at().is_none());

        progress
            .mark_course_completed(CourseId(2), now())
            .expect("second");
        progress
            .mark_course_completed(CourseId(3), now())
            .expect("third");

        assert!(progress.is_completed());
        assert_eq!(progress.progress_percentage(), 100);
        assert!(progress.completed_at().is_some());
    }
}

// =============================================================================
// TIER S4: TARGET LEVEL
// =============================================================================

mod s4_target_level {
    use super::*;
    use competency_core::{ErrorKind, UserCompetencyTracker};

    /// S4.1: a target below the current level is rejected.
    #[test]
    fn target_below_current_rejected() {
        let mut tracker = UserCompetencyTracker::new();
        tracker
            .create(UserId(1), CompetencyId(1), level(3), None, now())
            .expect("create");

        let err = tracker
            .set_target_level(UserId(1), CompetencyId(1), level(2))
            .expect_err("invalid target");
        assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
        assert!(matches!(err, CompetencyError::InvalidTarget { .. }));
        assert_eq!(
            tracker
                .get(UserId(1), CompetencyId(1))
                .expect("get")
                .target_level(),
            None
        );
    }
}

// =============================================================================
// TIER S5: CONFIRMED ASSESSMENT
// =============================================================================

mod s5_confirmed_assessment {
    use super::*;

    /// S5.1: update after confirm fails and changes nothing.
    #[test]
    fn update_after_confirm_rejected() {
        let (catalog, ids) = catalog();
        let mut workflow = AssessmentWorkflow::new();
        let id = workflow
            .create(
                &catalog,
                AssessmentDraft {
                    competency: ids[1],
                    subject: UserId(5),
                    assessor: UserId(6),
                    level: level(3),
                    score: AssessmentScore::from_points(7, 10).expect("score"),
                    comment: Some("solid".to_string()),
                },
                now(),
            )
            .expect("assessment")
            .value;
        workflow.confirm(id, UserId(6), now()).expect("confirm");

        let result = workflow.update(
            &catalog,
            id,
            level(5),
            AssessmentScore::from_percentage(100).expect("score"),
            None,
        );
        assert!(matches!(result, Err(CompetencyError::AssessmentConfirmed(_))));

        let assessment = workflow.get(id).expect("get");
        assert_eq!(assessment.level(), level(3));
        assert_eq!(assessment.score().hundredths(), 7000);
        assert_eq!(assessment.comment(), Some("solid"));
    }
}
