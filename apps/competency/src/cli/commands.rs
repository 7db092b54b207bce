//! # CLI Command Implementations
//!
//! Every command loads the workspace from the data file, runs one engine
//! operation and prints the result as text or pretty JSON.

use crate::config::AssessmentConfig;
use crate::dataset::load_workspace;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use competency_core::{
    AssessmentType, CompetencyId, MatrixId, PositionId, Priority, ProgramId, UserId, Workspace,
    WorkspaceStats, workspace_to_bytes,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// What every command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Context {
    pub data: PathBuf,
    pub json_mode: bool,
    pub assessment: AssessmentConfig,
}

impl Context {
    fn load(&self) -> Result<(Workspace, DateTime<Utc>), AppError> {
        load_workspace(&self.data, Utc::now())
    }
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show workspace counts.
pub fn cmd_status(ctx: &Context) -> Result<(), AppError> {
    let (workspace, now) = ctx.load()?;
    let stats = workspace.stats();

    if ctx.json_mode {
        #[derive(Serialize)]
        struct StatusOutput<'a> {
            data: String,
            now: DateTime<Utc>,
            #[serde(flatten)]
            stats: &'a WorkspaceStats,
        }
        return print_json(&StatusOutput {
            data: ctx.data.to_string_lossy().into_owned(),
            now,
            stats: &stats,
        });
    }

    println!("Competency Workspace Status");
    println!("===========================");
    println!("Data: {:?}", ctx.data);
    println!("Now:  {}", now.to_rfc3339());
    println!();
    println!(
        "Competencies:         {} ({} active)",
        stats.competencies, stats.active_competencies
    );
    println!(
        "Assessments:          {} ({} pending confirmation)",
        stats.assessments, stats.pending_confirmation
    );
    println!("Tracked competencies: {}", stats.tracked_competencies);
    println!("Matrices:             {}", stats.matrices);
    println!("Programs:             {}", stats.programs);
    println!("Enrollments:          {}", stats.enrollments);

    Ok(())
}

// =============================================================================
// PROGRESS COMMAND
// =============================================================================

/// Show a user's progress against a matrix.
pub fn cmd_progress(ctx: &Context, user: u64, matrix: u64) -> Result<(), AppError> {
    let (workspace, now) = ctx.load()?;
    let report = workspace
        .calculator()
        .calculate_user_matrix_progress(UserId(user), MatrixId(matrix), now)?;

    if ctx.json_mode {
        return print_json(&report);
    }

    println!("Matrix Progress");
    println!("===============");
    println!("User:     {}", report.user);
    println!("Matrix:   {} ({})", report.matrix, report.matrix_name);
    println!("Position: {}", report.position);
    println!();
    println!("Overall:      {}%", report.completeness.overall_percentage);
    println!("Core:         {}%", report.completeness.core_percentage);
    println!("Nice-to-have: {}%", report.completeness.nice_to_have_percentage);
    println!(
        "Satisfied:    {} / {}",
        report.completeness.satisfied_requirements, report.completeness.total_requirements
    );
    println!();
    println!("Requirements:");
    for detail in &report.requirements {
        println!(
            "  {:<16} {:<13} required {}  user {}  gap {}{}",
            code_of(&workspace, detail.competency),
            detail.requirement_type.as_str(),
            detail.required_level.value(),
            detail.user_level,
            detail.gap,
            if detail.is_satisfied { "  ok" } else { "" }
        );
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for recommendation in &report.recommendations {
            println!(
                "  [{}] {}: {}",
                priority_label(recommendation.priority),
                recommendation.message,
                codes_of(&workspace, &recommendation.competencies)
            );
        }
    }

    Ok(())
}

// =============================================================================
// GAPS COMMAND
// =============================================================================

/// Show grouped gaps and the development plan.
pub fn cmd_gaps(ctx: &Context, user: u64, matrix: u64) -> Result<(), AppError> {
    let (workspace, _) = ctx.load()?;
    let analysis = workspace
        .calculator()
        .competency_gap_analysis(UserId(user), MatrixId(matrix))?;

    if ctx.json_mode {
        return print_json(&analysis);
    }

    println!("Gap Analysis");
    println!("============");
    println!("User:   {}", analysis.user);
    println!("Matrix: {}", analysis.matrix);
    println!();
    println!(
        "Gaps: {} core, {} nice-to-have, {} optional",
        analysis.total_core_gaps, analysis.total_nice_to_have_gaps, analysis.total_optional_gaps
    );

    if analysis.gaps.total() == 0 {
        println!();
        println!("No gaps: every requirement is satisfied.");
        return Ok(());
    }

    println!();
    println!("Priority gaps:");
    for gap in &analysis.priority_gaps {
        println!(
            "  {:<16} {} -> {} (gap {})",
            code_of(&workspace, gap.competency),
            gap.current_level,
            gap.required_level.value(),
            gap.gap
        );
    }

    println!();
    println!("Development plan:");
    for phase in &analysis.development_plan {
        let competencies: Vec<CompetencyId> =
            phase.competencies.iter().map(|g| g.competency).collect();
        println!("  Phase {} ({}): {}", phase.phase, phase.duration, phase.focus);
        println!("    {}", codes_of(&workspace, &competencies));
    }

    Ok(())
}

// =============================================================================
// COMPARE COMMAND
// =============================================================================

/// Rank users against a position's active matrix.
pub fn cmd_compare(ctx: &Context, position: u64, users: &[u64]) -> Result<(), AppError> {
    let (workspace, now) = ctx.load()?;
    let users: Vec<UserId> = users.iter().copied().map(UserId).collect();
    let ranking = workspace
        .calculator()
        .compare_users_for_position(PositionId(position), &users, now)?;

    if ctx.json_mode {
        return print_json(&ranking);
    }

    println!("Position Ranking");
    println!("================");
    println!("Position: {}", ranking.position);
    println!("Matrix:   {} ({})", ranking.matrix, ranking.matrix_name);
    println!();
    for (rank, entry) in ranking.comparisons.iter().enumerate() {
        match &entry.error {
            Some(error) => println!("  {:>2}. {}  failed: {}", rank + 1, entry.user, error),
            None => println!(
                "  {:>2}. {}  overall {:>3}%  core {:>3}%  nice-to-have {:>3}%  total gap {}",
                rank + 1,
                entry.user,
                entry.overall_percentage,
                entry.core_percentage,
                entry.nice_to_have_percentage,
                entry.total_gap
            ),
        }
    }

    Ok(())
}

// =============================================================================
// PROGRAM COMMAND
// =============================================================================

/// Show a user's status in a program.
pub fn cmd_program(ctx: &Context, user: u64, program: u64) -> Result<(), AppError> {
    let (workspace, _) = ctx.load()?;
    let snapshot = workspace
        .programs
        .program_snapshot(UserId(user), ProgramId(program))?;

    if ctx.json_mode {
        return print_json(&snapshot);
    }

    println!("Program Status");
    println!("==============");
    println!("Program:    {} {} ({})", snapshot.program, snapshot.code, snapshot.title);
    println!("Status:     {:?}", snapshot.status);
    println!(
        "Criteria:   {}% of counted tracks",
        snapshot.criteria.required_percentage()
    );
    match snapshot.enrollment {
        Some(status) => println!("Enrollment: {:?} ({}%)", status, snapshot.progress),
        None => println!("Enrollment: not enrolled"),
    }
    println!();
    println!("Tracks:");
    for track in &snapshot.tracks {
        println!(
            "  {:>2}. {:<24} {}/{} courses  {:>3}%{}{}",
            track.order,
            track.title,
            track.completed_courses,
            track.total_courses,
            track.percentage,
            if track.required { "  required" } else { "" },
            if track.completed { "  done" } else { "" }
        );
    }

    Ok(())
}

// =============================================================================
// HISTORY COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct HistoryEntry {
    assessment: competency_core::AssessmentId,
    assessed_at: DateTime<Utc>,
    level: u8,
    level_name: &'static str,
    score: u8,
    assessment_type: AssessmentType,
    confirmed: bool,
    passing: bool,
    current: bool,
}

/// Show a user's recent assessments in one competency, newest first.
pub fn cmd_history(ctx: &Context, user: u64, code: &str, limit: usize) -> Result<(), AppError> {
    let (workspace, now) = ctx.load()?;
    let competency = workspace
        .catalog
        .by_code(code)
        .ok_or_else(|| competency_core::CompetencyError::CodeNotFound(code.to_string()))?;

    let entries: Vec<HistoryEntry> = workspace
        .assessments
        .history(UserId(user), competency.id(), limit)
        .into_iter()
        .map(|a| HistoryEntry {
            assessment: a.id(),
            assessed_at: a.assessed_at(),
            level: a.level().value(),
            level_name: a.level().name(),
            score: a.score().rounded_percentage(),
            assessment_type: a.assessment_type(),
            confirmed: a.is_confirmed(),
            passing: a.score().is_passing(ctx.assessment.passing_threshold),
            current: a.is_current(now, ctx.assessment.validity_days),
        })
        .collect();

    if ctx.json_mode {
        return print_json(&entries);
    }

    println!("Assessment History");
    println!("==================");
    println!("User:       {}", UserId(user));
    println!("Competency: {} ({})", competency.code().as_str(), competency.name());
    println!();
    if entries.is_empty() {
        println!("No assessments recorded.");
        return Ok(());
    }
    for entry in &entries {
        println!(
            "  {}  {:<12} level {}  score {:>3}%  {:<7}{}{}{}",
            entry.assessed_at.format("%Y-%m-%d"),
            entry.level_name,
            entry.level,
            entry.score,
            match entry.assessment_type {
                AssessmentType::SelfAssessment => "self",
                AssessmentType::Manager => "manager",
            },
            if entry.confirmed { "  confirmed" } else { "  pending" },
            if entry.passing { "" } else { "  below threshold" },
            if entry.current { "" } else { "  expired" }
        );
    }

    Ok(())
}

// =============================================================================
// SNAPSHOT COMMAND
// =============================================================================

/// Write the loaded workspace as a binary snapshot.
pub fn cmd_snapshot(ctx: &Context, output: &Path) -> Result<(), AppError> {
    let validated = validate_output_path(output)?;
    let (workspace, _) = ctx.load()?;
    let bytes = workspace_to_bytes(&workspace)?;

    std::fs::write(&validated, &bytes).map_err(|e| AppError::io(&validated, e))?;
    tracing::info!(path = %validated.display(), bytes = bytes.len(), "snapshot written");

    if ctx.json_mode {
        return print_json(&serde_json::json!({
            "output": validated.to_string_lossy(),
            "bytes": bytes.len(),
        }));
    }
    println!("Wrote {} bytes to {:?}", bytes.len(), validated);
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    /// False when any error was found.
    pub valid: bool,
    pub stats: WorkspaceStats,
    /// Matrix requirements that cannot be evaluated as written.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Consistency checks a loaded workspace can still fail.
///
/// Loading already rejects malformed input. Errors here are requirements that
/// no assessment can satisfy; warnings are soft findings.
#[must_use]
pub fn validation_report(workspace: &Workspace) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for matrix in workspace.matrices.iter() {
        if matrix.requirements().is_empty() {
            warnings.push(format!("{} ({}) has no requirements", matrix.id(), matrix.name()));
        }
        for requirement in matrix.requirements() {
            let competency = match workspace.catalog.get(requirement.competency) {
                Ok(competency) => competency,
                Err(e) => {
                    errors.push(format!("{}: {}", matrix.id(), e));
                    continue;
                }
            };
            if !competency.has_level(requirement.required_level) {
                errors.push(format!(
                    "{} requires level {} of {}, which is not offered",
                    matrix.id(),
                    requirement.required_level.value(),
                    competency.code().as_str()
                ));
            }
            if !competency.is_active() {
                let message = format!(
                    "{} requires inactive competency {}",
                    matrix.id(),
                    competency.code().as_str()
                );
                if matrix.is_active() {
                    errors.push(message);
                } else {
                    warnings.push(message);
                }
            }
        }
    }

    let positions: BTreeSet<PositionId> =
        workspace.matrices.iter().map(|m| m.position()).collect();
    for position in positions {
        if !workspace
            .matrices
            .iter()
            .any(|m| m.position() == position && m.is_active())
        {
            warnings.push(format!("{} has no active matrix", position));
        }
    }

    let pending = workspace.assessments.pending_confirmation().len();
    if pending > 0 {
        warnings.push(format!(
            "{} assessments are pending confirmation and ignored by matrix progress",
            pending
        ));
    }

    ValidationReport {
        valid: errors.is_empty(),
        stats: workspace.stats(),
        errors,
        warnings,
    }
}

/// Load the data file and report consistency errors and warnings.
///
/// Fails with a dataset error after printing the report when it is invalid.
pub fn cmd_validate(ctx: &Context) -> Result<(), AppError> {
    let (workspace, _) = ctx.load()?;
    let report = validation_report(&workspace);
    for error in &report.errors {
        tracing::error!("{}", error);
    }
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }

    if ctx.json_mode {
        print_json(&report)?;
    } else {
        if report.valid {
            println!("{:?} is valid", ctx.data);
        } else {
            println!("{:?} is invalid", ctx.data);
        }
        println!(
            "{} competencies, {} assessments, {} matrices, {} programs",
            report.stats.competencies,
            report.stats.assessments,
            report.stats.matrices,
            report.stats.programs
        );
        for (title, lines) in [("Errors:", &report.errors), ("Warnings:", &report.warnings)] {
            if !lines.is_empty() {
                println!();
                println!("{}", title);
                for line in lines {
                    println!("  - {}", line);
                }
            }
        }
    }

    if !report.valid {
        return Err(AppError::Dataset(format!(
            "{} consistency errors",
            report.errors.len()
        )));
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "high",
        Priority::Medium => "medium",
    }
}

/// The competency's code, or its id if the catalog no longer has it.
fn code_of(workspace: &Workspace, id: CompetencyId) -> String {
    workspace
        .catalog
        .get(id)
        .map(|c| c.code().as_str().to_string())
        .unwrap_or_else(|_| id.to_string())
}

fn codes_of(workspace: &Workspace, ids: &[CompetencyId]) -> String {
    ids.iter()
        .map(|&id| code_of(workspace, id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, AppError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| AppError::io(parent, e))?;
    if !canonical_parent.is_dir() {
        return Err(AppError::Argument(format!(
            "output directory {} is not a directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| AppError::Argument("output path has no file name".to_string()))?;
    Ok(canonical_parent.join(filename))
}
