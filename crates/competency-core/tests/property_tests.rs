//! # Property-Based Tests
//!
//! Invariants of levels, progress, gaps, development plans and completion
//! criteria, checked over generated inputs.

use chrono::{DateTime, TimeZone, Utc};
use competency_core::{
    CompetencyId, CompetencyLevel, CompletionCriteria, GapGroups, Requirement, RequirementDetail,
    RequirementType, UserCompetencyTracker, UserId, matrix::generate_development_plan,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).single().expect("valid date")
}

fn level(value: u8) -> CompetencyLevel {
    CompetencyLevel::from_value(value).expect("level")
}

fn requirement_type() -> impl Strategy<Value = RequirementType> {
    prop_oneof![
        Just(RequirementType::Core),
        Just(RequirementType::NiceToHave),
        Just(RequirementType::Optional),
    ]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// `gap_to` is antisymmetric and agrees with `meets_requirement`.
    #[test]
    fn level_gap_matches_ordering(a in 1u8..=5, b in 1u8..=5) {
        let (a, b) = (level(a), level(b));

        prop_assert_eq!(a.gap_to(b), -b.gap_to(a));
        prop_assert_eq!(a.meets_requirement(b), a.gap_to(b) <= 0);
        prop_assert_eq!(a.gap_to(a), 0);
    }

    /// Out-of-range levels never parse.
    #[test]
    fn level_range_enforced(value in 6u8..=255) {
        prop_assert!(CompetencyLevel::from_value(value).is_err());
        prop_assert!(CompetencyLevel::from_value(0).is_err());
    }

    /// Progress stays within bounds and is 100 once the target is reached.
    #[test]
    fn progress_bounded(current in 1u8..=4, bump in 1u8..=4, reached in 1u8..=5) {
        let target = (current + bump).min(5);
        prop_assume!(target > current);

        let mut tracker = UserCompetencyTracker::new();
        let (user, competency) = (UserId(1), CompetencyId(1));
        tracker
            .create(user, competency, level(current), Some(level(target)), now())
            .expect("create");

        let before = tracker.get(user, competency).expect("get").progress_percentage();
        prop_assert!(before <= 100);
        prop_assert!(before < 100);

        tracker
            .update_progress(user, competency, level(reached), now())
            .expect("update");
        let entry = tracker.get(user, competency).expect("get");
        let after = entry.progress_percentage();

        prop_assert!(after <= 100);
        prop_assert_eq!(after == 100, reached >= target);
        prop_assert_eq!(entry.is_target_reached(), reached >= target);
        prop_assert!(entry.gap_to_target().is_some_and(|g| g >= 0));
    }

    /// A requirement is satisfied exactly when its gap is zero.
    #[test]
    fn requirement_gap_consistent(
        required in 1u8..=5,
        user in 0u8..=5,
        kind in requirement_type()
    ) {
        let requirement = Requirement::new(CompetencyId(1), level(required), kind);

        let gap = requirement.gap(user);
        prop_assert_eq!(requirement.is_satisfied_by(user), gap == 0);
        prop_assert_eq!(gap, required.saturating_sub(user));
    }

    /// Development phases partition the gaps and none is empty.
    #[test]
    fn plan_partitions_gaps(rows in vec((requirement_type(), 1u8..=5, 0u8..=5), 0..20)) {
        let details: Vec<RequirementDetail> = rows
            .iter()
            .enumerate()
            .map(|(i, &(kind, required, user))| RequirementDetail {
                competency: CompetencyId(i as u64 + 1),
                required_level: level(required),
                user_level: user,
                requirement_type: kind,
                is_satisfied: user >= required,
                gap: required.saturating_sub(user),
            })
            .collect();

        let groups = GapGroups::from_details(&details);
        let plan = generate_development_plan(&groups);

        let planned: Vec<CompetencyId> = plan
            .iter()
            .flat_map(|phase| phase.competencies.iter().map(|g| g.competency))
            .collect();
        let unique: BTreeSet<CompetencyId> = planned.iter().copied().collect();
        let expected: BTreeSet<CompetencyId> = details
            .iter()
            .filter(|d| d.gap > 0)
            .map(|d| d.competency)
            .collect();

        prop_assert_eq!(planned.len(), unique.len());
        prop_assert_eq!(unique, expected);
        prop_assert_eq!(groups.total(), planned.len());
        prop_assert!(plan.iter().all(|phase| !phase.competencies.is_empty()));
    }

    /// `RequireAll` is met only when every unit is complete.
    #[test]
    fn require_all_needs_everything(total in 1usize..500) {
        let criteria = CompletionCriteria::require_all();

        prop_assert!(criteria.is_met(total, total));
        prop_assert!(!criteria.is_met(total - 1, total));
    }

    /// A percentage criteria is monotonic in the completed count.
    #[test]
    fn percentage_criteria_monotonic(
        percentage in 0u8..=100,
        total in 1usize..200,
        done in 0usize..200
    ) {
        let criteria = CompletionCriteria::require_percentage(percentage).expect("criteria");
        let done = done.min(total);

        if criteria.is_met(done, total) && done < total {
            prop_assert!(criteria.is_met(done + 1, total));
        }
        prop_assert!(!criteria.is_met(done, 0));
    }
}
