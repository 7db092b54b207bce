//! # Recommendations & Development Plan
//!
//! Turns per-requirement gaps into advice:
//!
//! | Output | Rule |
//! |--------|------|
//! | High priority | top 3 core gaps, if any core gap exists |
//! | Medium priority | every requirement whose gap is exactly 1 |
//! | Phase 1 (3-6 months) | top 3 core gaps |
//! | Phase 2 (6-9 months) | remaining core gaps + top 2 nice-to-have gaps |
//! | Phase 3 (9-12 months) | remaining nice-to-have gaps + all optional gaps |
//!
//! Phases with no competencies are omitted, never padded.

use super::RequirementType;
use super::calculator::RequirementDetail;
use crate::level::CompetencyLevel;
use crate::primitives::{
    HIGH_PRIORITY_LIMIT, PHASE_ONE_CORE_LIMIT, PHASE_TWO_NICE_TO_HAVE_LIMIT, QUICK_WIN_GAP,
};
use crate::types::CompetencyId;
use serde::{Deserialize, Serialize};

// =============================================================================
// GAPS
// =============================================================================

/// A requirement the user does not yet satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapEntry {
    pub competency: CompetencyId,
    /// 0 when never assessed.
    pub current_level: u8,
    pub required_level: CompetencyLevel,
    pub gap: u8,
}

/// Gaps grouped by requirement type, each group largest gap first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapGroups {
    pub core: Vec<GapEntry>,
    #[serde(rename = "nice-to-have")]
    pub nice_to_have: Vec<GapEntry>,
    pub optional: Vec<GapEntry>,
}

impl GapGroups {
    /// Collect every detail with a positive gap.
    ///
    /// Sorting is stable, so equal gaps keep requirement order.
    #[must_use]
    pub fn from_details(details: &[RequirementDetail]) -> Self {
        let mut groups = Self::default();
        for detail in details.iter().filter(|d| d.gap > 0) {
            let entry = GapEntry {
                competency: detail.competency,
                current_level: detail.user_level,
                required_level: detail.required_level,
                gap: detail.gap,
            };
            match detail.requirement_type {
                RequirementType::Core => groups.core.push(entry),
                RequirementType::NiceToHave => groups.nice_to_have.push(entry),
                RequirementType::Optional => groups.optional.push(entry),
            }
        }

        for group in [&mut groups.core, &mut groups.nice_to_have, &mut groups.optional] {
            group.sort_by(|a, b| b.gap.cmp(&a.gap));
        }
        groups
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.core.len() + self.nice_to_have.len() + self.optional.len()
    }
}

// =============================================================================
// RECOMMENDATIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub message: String,
    pub competencies: Vec<CompetencyId>,
}

/// Build the recommendation list. Both entries, one or none may appear.
#[must_use]
pub fn generate_recommendations(details: &[RequirementDetail]) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let mut core_gaps: Vec<&RequirementDetail> = details
        .iter()
        .filter(|d| d.requirement_type == RequirementType::Core && d.gap > 0)
        .collect();
    core_gaps.sort_by(|a, b| b.gap.cmp(&a.gap));

    if !core_gaps.is_empty() {
        recommendations.push(Recommendation {
            priority: Priority::High,
            message: "Focus on improving core competencies with the largest gaps".to_string(),
            competencies: core_gaps
                .iter()
                .take(HIGH_PRIORITY_LIMIT)
                .map(|d| d.competency)
                .collect(),
        });
    }

    let quick_wins: Vec<CompetencyId> = details
        .iter()
        .filter(|d| d.gap == QUICK_WIN_GAP)
        .map(|d| d.competency)
        .collect();

    if !quick_wins.is_empty() {
        recommendations.push(Recommendation {
            priority: Priority::Medium,
            message: "Quick wins: competencies that need only 1 level improvement".to_string(),
            competencies: quick_wins,
        });
    }

    recommendations
}

// =============================================================================
// DEVELOPMENT PLAN
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentPhase {
    pub phase: u8,
    pub duration: String,
    pub focus: String,
    pub competencies: Vec<GapEntry>,
}

impl DevelopmentPhase {
    fn build(phase: u8, duration: &str, focus: &str, competencies: Vec<GapEntry>) -> Option<Self> {
        if competencies.is_empty() {
            return None;
        }
        Some(Self {
            phase,
            duration: duration.to_string(),
            focus: focus.to_string(),
            competencies,
        })
    }
}

/// Split grouped gaps into up to three phases. The phases partition the gaps.
#[must_use]
pub fn generate_development_plan(groups: &GapGroups) -> Vec<DevelopmentPhase> {
    let core_split = groups.core.len().min(PHASE_ONE_CORE_LIMIT);
    let nice_split = groups.nice_to_have.len().min(PHASE_TWO_NICE_TO_HAVE_LIMIT);
    let (core_first, core_rest) = groups.core.split_at(core_split);
    let (nice_first, nice_rest) = groups.nice_to_have.split_at(nice_split);

    let phase_one = core_first.to_vec();
    let phase_two = [core_rest, nice_first].concat();
    let phase_three = [nice_rest, groups.optional.as_slice()].concat();

    [
        DevelopmentPhase::build(1, "3-6 months", "Core competencies", phase_one),
        DevelopmentPhase::build(
            2,
            "6-9 months",
            "Complete core competencies and high-priority nice-to-have",
            phase_two,
        ),
        DevelopmentPhase::build(
            3,
            "9-12 months",
            "Nice-to-have and optional competencies",
            phase_three,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(competency: u64, kind: RequirementType, required: u8, user: u8) -> RequirementDetail {
        let required_level = CompetencyLevel::from_value(required).expect("level");
        RequirementDetail {
            competency: CompetencyId(competency),
            required_level,
            user_level: user,
            requirement_type: kind,
            is_satisfied: user >= required,
            gap: required.saturating_sub(user),
        }
    }

    fn gap(competency: u64, size: u8) -> GapEntry {
        GapEntry {
            competency: CompetencyId(competency),
            current_level: 0,
            required_level: CompetencyLevel::Expert,
            gap: size,
        }
    }

    #[test]
    fn no_gaps_no_recommendations() {
        let details = vec![detail(1, RequirementType::Core, 3, 4)];
        assert!(generate_recommendations(&details).is_empty());
        assert!(generate_development_plan(&GapGroups::from_details(&details)).is_empty());
    }

    #[test]
    fn high_priority_names_three_largest_core_gaps() {
        let details = vec![
            detail(1, RequirementType::Core, 3, 2),
            detail(2, RequirementType::Core, 5, 1),
            detail(3, RequirementType::Core, 4, 1),
            detail(4, RequirementType::Core, 4, 0),
            detail(5, RequirementType::Optional, 5, 0),
        ];

        let recommendations = generate_recommendations(&details);
        assert_eq!(recommendations[0].priority, Priority::High);
        assert_eq!(
            recommendations[0].competencies,
            vec![CompetencyId(2), CompetencyId(4), CompetencyId(3)]
        );
        assert_eq!(recommendations[1].priority, Priority::Medium);
        assert_eq!(recommendations[1].competencies, vec![CompetencyId(1)]);
    }

    #[test]
    fn ties_keep_requirement_order() {
        let details = vec![
            detail(7, RequirementType::Core, 3, 1),
            detail(3, RequirementType::Core, 4, 2),
            detail(5, RequirementType::Core, 2, 0),
        ];
        let groups = GapGroups::from_details(&details);
        let order: Vec<CompetencyId> = groups.core.iter().map(|g| g.competency).collect();
        assert_eq!(order, vec![CompetencyId(7), CompetencyId(3), CompetencyId(5)]);
    }

    #[test]
    fn quick_wins_only_without_core_gaps() {
        let details = vec![
            detail(1, RequirementType::Core, 3, 3),
            detail(2, RequirementType::NiceToHave, 2, 1),
        ];
        let recommendations = generate_recommendations(&details);
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].priority, Priority::Medium);
    }

    #[test]
    fn plan_splits_core_and_nice_to_have() {
        let groups = GapGroups {
            core: vec![gap(1, 4), gap(2, 3), gap(3, 2), gap(4, 1)],
            nice_to_have: vec![gap(5, 3), gap(6, 2), gap(7, 1)],
            optional: vec![gap(8, 2)],
        };

        let plan = generate_development_plan(&groups);
        assert_eq!(plan.len(), 3);

        let ids = |phase: &DevelopmentPhase| -> Vec<u64> {
            phase.competencies.iter().map(|g| g.competency.value()).collect()
        };
        assert_eq!(ids(&plan[0]), vec![1, 2, 3]);
        assert_eq!(ids(&plan[1]), vec![4, 5, 6]);
        assert_eq!(ids(&plan[2]), vec![7, 8]);
        assert_eq!(plan[0].duration, "3-6 months");
        assert_eq!(plan[2].focus, "Nice-to-have and optional competencies");
    }

    #[test]
    fn empty_phases_are_omitted() {
        let groups = GapGroups {
            core: Vec::new(),
            nice_to_have: vec![gap(5, 1)],
            optional: Vec::new(),
        };

        let plan = generate_development_plan(&groups);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].phase, 2);
    }

    #[test]
    fn optional_only_lands_in_phase_three() {
        let groups = GapGroups {
            core: Vec::new(),
            nice_to_have: Vec::new(),
            optional: vec![gap(9, 2), gap(10, 1)],
        };
        let plan = generate_development_plan(&groups);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].phase, 3);
        assert_eq!(groups.total(), 2);
    }
}
