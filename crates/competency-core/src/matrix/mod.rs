//! # Competency Matrices
//!
//! A matrix belongs to a position and lists the competencies the position
//! requires, each at a required level and tagged core, nice-to-have or
//! optional.
//!
//! - `calculator`: per-user progress, gap analysis and position comparison.
//! - `plan`: recommendations and the phased development plan.

pub mod calculator;
pub mod plan;

use crate::level::CompetencyLevel;
use crate::primitives::MAX_NAME_LENGTH;
use crate::repository::MatrixLookup;
use crate::types::{CompetencyId, MatrixId, PositionId};
use crate::CompetencyError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use calculator::{
    Completeness, GapAnalysis, MatrixCalculator, MatrixProgressReport, PositionComparison,
    RequirementDetail, UserComparison,
};
pub use plan::{
    DevelopmentPhase, GapEntry, GapGroups, Priority, Recommendation, generate_development_plan,
    generate_recommendations,
};

/// How strongly a position needs a competency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequirementType {
    #[serde(rename = "core")]
    Core,
    #[serde(rename = "nice-to-have")]
    NiceToHave,
    #[serde(rename = "optional")]
    Optional,
}

impl RequirementType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::NiceToHave => "nice-to-have",
            Self::Optional => "optional",
        }
    }
}

/// One required competency of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub competency: CompetencyId,
    pub required_level: CompetencyLevel,
    #[serde(rename = "type")]
    pub requirement_type: RequirementType,
}

impl Requirement {
    #[must_use]
    pub const fn new(
        competency: CompetencyId,
        required_level: CompetencyLevel,
        requirement_type: RequirementType,
    ) -> Self {
        Self {
            competency,
            required_level,
            requirement_type,
        }
    }

    /// `user_level` is an ordinal where 0 means "never assessed".
    #[must_use]
    pub fn is_satisfied_by(&self, user_level: u8) -> bool {
        user_level >= self.required_level.value()
    }

    /// Levels missing to satisfy the requirement, never negative.
    #[must_use]
    pub fn gap(&self, user_level: u8) -> u8 {
        self.required_level.value().saturating_sub(user_level)
    }
}

// =============================================================================
// MATRIX
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyMatrix {
    id: MatrixId,
    name: String,
    position: PositionId,
    active: bool,
    requirements: Vec<Requirement>,
}

impl CompetencyMatrix {
    /// Build an active matrix.
    ///
    /// # Errors
    /// - `Validation` on an empty name
    /// - `DuplicateKey` if a competency is listed twice
    pub fn new(
        id: MatrixId,
        name: &str,
        position: PositionId,
        requirements: Vec<Requirement>,
    ) -> Result<Self, CompetencyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CompetencyError::validation("Matrix name cannot be empty"));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(CompetencyError::validation(format!(
                "Matrix name exceeds {} bytes",
                MAX_NAME_LENGTH
            )));
        }

        let mut seen = BTreeSet::new();
        for requirement in &requirements {
            if !seen.insert(requirement.competency) {
                return Err(duplicate_requirement(id, requirement.competency));
            }
        }

        Ok(Self {
            id,
            name: name.to_string(),
            position,
            active: true,
            requirements,
        })
    }

    #[must_use]
    pub fn id(&self) -> MatrixId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn position(&self) -> PositionId {
        self.position
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Append a requirement.
    pub fn add_requirement(&mut self, requirement: Requirement) -> Result<(), CompetencyError> {
        if self
            .requirements
            .iter()
            .any(|r| r.competency == requirement.competency)
        {
            return Err(duplicate_requirement(self.id, requirement.competency));
        }
        self.requirements.push(requirement);
        Ok(())
    }

    /// Remove the requirement for `competency`, if present.
    pub fn remove_requirement(&mut self, competency: CompetencyId) -> Option<Requirement> {
        let index = self
            .requirements
            .iter()
            .position(|r| r.competency == competency)?;
        Some(self.requirements.remove(index))
    }
}

fn duplicate_requirement(matrix: MatrixId, competency: CompetencyId) -> CompetencyError {
    CompetencyError::DuplicateKey(format!(
        "{} already requires {}",
        matrix, competency
    ))
}

/// Input for registering a matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixDraft {
    pub name: String,
    pub position: PositionId,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

// =============================================================================
// REGISTRY
// =============================================================================

/// In-memory arena of matrices keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrixRegistry {
    matrices: BTreeMap<MatrixId, CompetencyMatrix>,
}

impl MatrixRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompetencyMatrix> {
        self.matrices.values()
    }

    /// Register an already-built matrix.
    ///
    /// # Errors
    /// `DuplicateKey` if the id is taken.
    pub fn insert(&mut self, matrix: CompetencyMatrix) -> Result<(), CompetencyError> {
        if self.matrices.contains_key(&matrix.id) {
            return Err(CompetencyError::DuplicateKey(format!(
                "Matrix {} already exists",
                matrix.id
            )));
        }
        tracing::debug!(matrix = %matrix.id, position = %matrix.position, "matrix registered");
        self.matrices.insert(matrix.id, matrix);
        Ok(())
    }

    /// Build and register a matrix under the next free id.
    pub fn create(&mut self, draft: MatrixDraft) -> Result<MatrixId, CompetencyError> {
        let id = self
            .matrices
            .keys()
            .next_back()
            .map_or(MatrixId(1), |last| last.next());
        let mut matrix =
            CompetencyMatrix::new(id, &draft.name, draft.position, draft.requirements)?;
        if !draft.active {
            matrix.deactivate();
        }
        self.insert(matrix)?;
        Ok(id)
    }

    pub fn get(&self, id: MatrixId) -> Result<&CompetencyMatrix, CompetencyError> {
        self.matrices.get(&id).ok_or(CompetencyError::MatrixNotFound(id))
    }

    pub fn get_mut(&mut self, id: MatrixId) -> Result<&mut CompetencyMatrix, CompetencyError> {
        self.matrices
            .get_mut(&id)
            .ok_or(CompetencyError::MatrixNotFound(id))
    }
}

impl MatrixLookup for MatrixRegistry {
    fn matrix_by_id(&self, id: MatrixId) -> Result<Option<CompetencyMatrix>, CompetencyError> {
        Ok(self.matrices.get(&id).cloned())
    }

    fn matrices_by_position(
        &self,
        position: PositionId,
    ) -> Result<Vec<CompetencyMatrix>, CompetencyError> {
        Ok(self
            .iter()
            .filter(|m| m.position == position)
            .cloned()
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn core(competency: u64, level: CompetencyLevel) -> Requirement {
        Requirement::new(CompetencyId(competency), level, RequirementType::Core)
    }

    #[test]
    fn requirement_gap_and_satisfaction() {
        let requirement = core(1, CompetencyLevel::Advanced);
        assert_eq!(requirement.gap(0), 4);
        assert_eq!(requirement.gap(2), 2);
        assert_eq!(requirement.gap(5), 0);
        assert!(requirement.is_satisfied_by(4));
        assert!(!requirement.is_satisfied_by(3));
    }

    #[test]
    fn requirement_type_names() {
        assert_eq!(RequirementType::NiceToHave.as_str(), "nice-to-have");
        assert_eq!(RequirementType::Optional.as_str(), "optional");
        assert!(RequirementType::Core < RequirementType::NiceToHave);
    }

    #[test]
    fn duplicate_competency_rejected() {
        let err = CompetencyMatrix::new(
            MatrixId(1),
            "Backend Developer",
            PositionId(1),
            vec![core(1, CompetencyLevel::Advanced), core(1, CompetencyLevel::Expert)],
        )
        .expect_err("duplicate");
        assert_eq!(err.kind(), crate::ErrorKind::DuplicateKey);

        let mut matrix = CompetencyMatrix::new(
            MatrixId(1),
            "Backend Developer",
            PositionId(1),
            vec![core(1, CompetencyLevel::Advanced)],
        )
        .expect("matrix");
        assert!(matrix.add_requirement(core(1, CompetencyLevel::Beginner)).is_err());
        assert!(matrix.add_requirement(core(2, CompetencyLevel::Beginner)).is_ok());
        assert!(matrix.remove_requirement(CompetencyId(1)).is_some());
        assert_eq!(matrix.requirements().len(), 1);
    }

    #[test]
    fn empty_name_rejected() {
        assert!(CompetencyMatrix::new(MatrixId(1), "  ", PositionId(1), Vec::new()).is_err());
    }

    #[test]
    fn registry_insert_and_lookup() {
        let mut registry = MatrixRegistry::new();
        let first = registry
            .create(MatrixDraft {
                name: "Backend Developer".to_string(),
                position: PositionId(7),
                requirements: vec![core(1, CompetencyLevel::Intermediate)],
                active: false,
            })
            .expect("create");
        let second = registry
            .create(MatrixDraft {
                name: "Backend Developer v2".to_string(),
                position: PositionId(7),
                requirements: Vec::new(),
                active: true,
            })
            .expect("create");

        assert_eq!(first, MatrixId(1));
        assert_eq!(second, MatrixId(2));
        assert!(!registry.get(first).expect("get").is_active());

        let by_position = registry.matrices_by_position(PositionId(7)).expect("lookup");
        assert_eq!(by_position.len(), 2);
        assert!(registry.matrix_by_id(MatrixId(9)).expect("lookup").is_none());

        let copy = registry.get(first).expect("get").clone();
        let err = registry.insert(copy).expect_err("duplicate id");
        assert_eq!(err.kind(), crate::ErrorKind::DuplicateKey);
    }
}
