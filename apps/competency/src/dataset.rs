//! # Dataset Loading
//!
//! The binary reads its data from one file, in one of two formats:
//!
//! - A binary workspace snapshot (`CMPT` header, see `competency_core::formats`)
//! - A JSON dataset of drafts, replayed through the engine operations
//!
//! Replaying a dataset goes through the same validation as live use: codes
//! must be unique, assessments must reference known competencies at an
//! offered level, enrollments need a published program.
//!
//! ```json
//! {
//!   "now": "2025-06-01T00:00:00Z",
//!   "competencies": [{ "code": "TECH-001", "name": "SQL", "category": "technical" }],
//!   "assessments": [{ "competency": "TECH-001", "subject": 1, "assessor": 2,
//!                     "level": 3, "score": 80, "confirmed_by": 2 }],
//!   "matrices": [{ "name": "Backend", "position": 10,
//!                  "requirements": [{ "competency": "TECH-001", "level": 3, "type": "core" }] }],
//!   "programs": [{ "code": "ONB", "title": "Onboarding",
//!                  "tracks": [{ "title": "Basics", "courses": [1, 2] }],
//!                  "enrollments": [{ "user": 1,
//!                                    "completions": [{ "track": 0, "courses": [1] }] }] }]
//! }
//! ```

use crate::error::AppError;
use chrono::{DateTime, Utc};
use competency_core::{
    AssessmentDraft, AssessmentScore, CompetencyDraft, CompetencyError, CompetencyId,
    CompetencyLevel, CompletionCriteria, CourseCompletionSource, CourseId, MatrixDraft,
    ProgramDraft, ProgramId, Requirement, RequirementType, TrackDraft, TrackId, UserId, Workspace,
    formats::{MAX_SNAPSHOT_SIZE, workspace_from_bytes},
    primitives::{MAGIC_BYTES, MAX_BULK_SIZE},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// JSON datasets above this size are rejected unread.
pub const MAX_DATASET_FILE_SIZE: u64 = 100 * 1024 * 1024;

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    /// Reference time for every report. Defaults to the wall clock.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    #[serde(default)]
    pub competencies: Vec<CompetencyDraft>,
    #[serde(default)]
    pub assessments: Vec<AssessmentRecord>,
    #[serde(default)]
    pub targets: Vec<TargetRecord>,
    #[serde(default)]
    pub matrices: Vec<MatrixRecord>,
    #[serde(default)]
    pub programs: Vec<ProgramRecord>,
}

/// An assessment, referencing its competency by code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentRecord {
    pub competency: String,
    pub subject: UserId,
    pub assessor: UserId,
    pub level: CompetencyLevel,
    /// Whole percentage.
    pub score: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub assessed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confirmed_by: Option<UserId>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// A target level for an already-assessed (user, competency) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetRecord {
    pub user: UserId,
    pub competency: String,
    pub level: CompetencyLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixRecord {
    pub name: String,
    pub position: competency_core::PositionId,
    #[serde(default)]
    pub requirements: Vec<RequirementRecord>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementRecord {
    pub competency: String,
    pub level: CompetencyLevel,
    #[serde(rename = "type")]
    pub requirement_type: RequirementType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramRecord {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub criteria: CompletionCriteria,
    #[serde(default)]
    pub tracks: Vec<TrackDraft>,
    /// Publish after the tracks are attached. Enrollments need it.
    #[serde(default = "default_true")]
    pub publish: bool,
    #[serde(default)]
    pub enrollments: Vec<EnrollmentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrollmentRecord {
    pub user: UserId,
    #[serde(default)]
    pub completions: Vec<CompletionRecord>,
}

/// Completed courses in one track, by the track's index in `tracks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionRecord {
    pub track: usize,
    pub courses: Vec<CourseId>,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// COMPLETION SOURCE
// =============================================================================

/// Course completions listed in a dataset, fed to `sync_track`.
#[derive(Debug, Default)]
struct ListedCompletions(BTreeMap<(UserId, TrackId), Vec<CourseId>>);

impl CourseCompletionSource for ListedCompletions {
    fn completed_courses(
        &self,
        user: UserId,
        track: TrackId,
    ) -> Result<Vec<CourseId>, CompetencyError> {
        Ok(self.0.get(&(user, track)).cloned().unwrap_or_default())
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Dataset {
    pub fn from_json(bytes: &[u8]) -> Result<Self, AppError> {
        let dataset: Self = serde_json::from_slice(bytes)?;
        let largest = [
            dataset.competencies.len(),
            dataset.assessments.len(),
            dataset.matrices.len(),
            dataset.programs.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        if largest > MAX_BULK_SIZE {
            return Err(AppError::Dataset(format!(
                "{} records in one section exceeds maximum {}",
                largest, MAX_BULK_SIZE
            )));
        }
        Ok(dataset)
    }

    /// Replay the dataset into a fresh workspace.
    ///
    /// Returns the workspace and the reference time (`now` from the dataset,
    /// else `fallback_now`).
    pub fn into_workspace(
        self,
        fallback_now: DateTime<Utc>,
    ) -> Result<(Workspace, DateTime<Utc>), AppError> {
        let now = self.now.unwrap_or(fallback_now);
        let mut workspace = Workspace::new();

        for draft in self.competencies {
            workspace.catalog.create(draft)?;
        }

        for record in self.assessments {
            let competency = resolve_code(&workspace, &record.competency)?;
            let assessed_at = record.assessed_at.unwrap_or(now);
            let draft = AssessmentDraft {
                competency,
                subject: record.subject,
                assessor: record.assessor,
                level: record.level,
                score: AssessmentScore::from_percentage(record.score)?,
                comment: record.comment,
            };
            let id = workspace.record_assessment(draft, assessed_at)?.value;
            if let Some(confirmer) = record.confirmed_by {
                let confirmed_at = record.confirmed_at.unwrap_or(assessed_at);
                workspace.confirm_assessment(id, confirmer, confirmed_at)?;
            }
        }

        for record in self.targets {
            let competency = resolve_code(&workspace, &record.competency)?;
            workspace
                .tracker
                .set_target_level(record.user, competency, record.level)?;
        }

        for record in self.matrices {
            let requirements = record
                .requirements
                .iter()
                .map(|r| {
                    resolve_code(&workspace, &r.competency)
                        .map(|id| Requirement::new(id, r.level, r.requirement_type))
                })
                .collect::<Result<Vec<_>, _>>()?;
            workspace.matrices.create(MatrixDraft {
                name: record.name,
                position: record.position,
                requirements,
                active: record.active,
            })?;
        }

        for record in self.programs {
            load_program(&mut workspace, record, now)?;
        }

        tracing::info!(
            competencies = workspace.catalog.len(),
            assessments = workspace.assessments.len(),
            matrices = workspace.matrices.len(),
            "dataset loaded"
        );
        Ok((workspace, now))
    }
}

fn resolve_code(workspace: &Workspace, code: &str) -> Result<CompetencyId, CompetencyError> {
    workspace
        .catalog
        .by_code(code)
        .map(|c| c.id())
        .ok_or_else(|| CompetencyError::CodeNotFound(code.to_string()))
}

fn load_program(
    workspace: &mut Workspace,
    record: ProgramRecord,
    now: DateTime<Utc>,
) -> Result<ProgramId, AppError> {
    let programs = &mut workspace.programs;
    let program = programs
        .create_program(ProgramDraft {
            code: record.code,
            title: record.title,
            description: record.description,
            criteria: record.criteria,
        })?
        .value;

    let tracks = record
        .tracks
        .into_iter()
        .map(|draft| programs.add_track(program, draft))
        .collect::<Result<Vec<TrackId>, _>>()?;

    if record.publish {
        programs.publish(program)?;
    }

    for enrollment in record.enrollments {
        programs.enroll(enrollment.user, program, now)?;

        let mut listed = ListedCompletions::default();
        for completion in enrollment.completions {
            let track = tracks.get(completion.track).copied().ok_or_else(|| {
                AppError::Dataset(format!(
                    "completion references track index {} but program {} has {} tracks",
                    completion.track,
                    program,
                    tracks.len()
                ))
            })?;
            listed
                .0
                .entry((enrollment.user, track))
                .or_default()
                .extend(completion.courses);
        }

        let touched: Vec<TrackId> = listed.0.keys().map(|&(_, track)| track).collect();
        for track in touched {
            programs.sync_track(enrollment.user, track, &listed, now)?;
        }
    }
    Ok(program)
}

// =============================================================================
// FILE ACCESS
// =============================================================================

/// Load a workspace from `path`, sniffing the format from its first bytes.
pub fn load_workspace(
    path: &Path,
    fallback_now: DateTime<Utc>,
) -> Result<(Workspace, DateTime<Utc>), AppError> {
    let metadata = std::fs::metadata(path).map_err(|e| AppError::io(path, e))?;
    if !metadata.is_file() {
        return Err(AppError::Argument(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    let limit = MAX_DATASET_FILE_SIZE.max(MAX_SNAPSHOT_SIZE as u64);
    if metadata.len() > limit {
        return Err(AppError::Dataset(format!(
            "{} is {} bytes, maximum is {}",
            path.display(),
            metadata.len(),
            limit
        )));
    }

    let bytes = std::fs::read(path).map_err(|e| AppError::io(path, e))?;
    if bytes.starts_with(MAGIC_BYTES) {
        tracing::debug!(path = %path.display(), "reading workspace snapshot");
        let workspace = workspace_from_bytes(&bytes)?;
        return Ok((workspace, fallback_now));
    }

    tracing::debug!(path = %path.display(), "reading JSON dataset");
    Dataset::from_json(&bytes)?.into_workspace(fallback_now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use competency_core::CompetencyCategory;

    fn draft(code: &str) -> CompetencyDraft {
        CompetencyDraft {
            code: code.to_string(),
            name: code.to_string(),
            description: String::new(),
            category: CompetencyCategory::Technical,
            parent: None,
            levels: None,
        }
    }

    #[test]
    fn unknown_code_is_not_found() {
        let dataset = Dataset {
            competencies: vec![draft("TECH-001")],
            targets: vec![TargetRecord {
                user: UserId(1),
                competency: "TECH-404".to_string(),
                level: CompetencyLevel::Expert,
            }],
            ..Dataset::default()
        };
        let err = dataset
            .into_workspace(Utc::now())
            .expect_err("unknown code");
        assert!(matches!(
            err,
            AppError::Core(CompetencyError::CodeNotFound(ref code)) if code == "TECH-404"
        ));
    }

    #[test]
    fn listed_completions_default_empty() {
        let listed = ListedCompletions::default();
        assert!(
            listed
                .completed_courses(UserId(1), TrackId(1))
                .expect("source")
                .is_empty()
        );
    }
}
