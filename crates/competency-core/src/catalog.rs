//! # Competency Catalog
//!
//! Definitions of competencies: unique codes, categories, ordinal levels and
//! an optional parent/child hierarchy.
//!
//! Competencies are never physically deleted. Deactivation hides a competency
//! from `active()` but keeps it resolvable so historical assessments stay valid.

use crate::events::{DomainEvent, Recorded};
use crate::level::CompetencyLevel;
use crate::primitives::{MAX_BULK_SIZE, MAX_CODE_LENGTH, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};
use crate::repository::CompetencyLookup;
use crate::types::CompetencyId;
use crate::CompetencyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// COMPETENCY CODE
// =============================================================================

/// Unique human-readable code such as `TECH-PHP-001`.
///
/// Codes are trimmed and uppercased; only `A-Z`, `0-9`, `-` and `_` are allowed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompetencyCode(String);

impl CompetencyCode {
    /// Parse and normalize a code.
    pub fn parse(raw: &str) -> Result<Self, CompetencyError> {
        let code = raw.trim().to_ascii_uppercase();

        if code.is_empty() {
            return Err(CompetencyError::validation("Competency code cannot be empty"));
        }
        if code.len() > MAX_CODE_LENGTH {
            return Err(CompetencyError::validation(format!(
                "Competency code exceeds {} characters",
                MAX_CODE_LENGTH
            )));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(CompetencyError::validation(format!(
                "Competency code contains invalid characters: {}",
                raw
            )));
        }

        Ok(Self(code))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The next free `PREFIX-NNN` code given the codes already in use.
    ///
    /// Only codes of the exact form `PREFIX-<digits>` are considered.
    pub fn next_for_prefix<'a>(
        prefix: &str,
        existing: impl IntoIterator<Item = &'a CompetencyCode>,
    ) -> Result<Self, CompetencyError> {
        let prefix = Self::parse(prefix)?;
        let lead = format!("{}-", prefix.as_str());

        let highest = existing
            .into_iter()
            .filter_map(|code| code.as_str().strip_prefix(lead.as_str()))
            .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|digits| digits.parse::<u32>().ok())
            .max()
            .unwrap_or(0);

        Self::parse(&format!("{}{:03}", lead, highest.saturating_add(1)))
    }
}

impl TryFrom<String> for CompetencyCode {
    type Error = CompetencyError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<CompetencyCode> for String {
    fn from(code: CompetencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CompetencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CATEGORY & METADATA
// =============================================================================

/// Broad family a competency belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetencyCategory {
    Technical,
    Soft,
    Leadership,
    Business,
    Other,
}

impl CompetencyCategory {
    pub fn from_name(name: &str) -> Result<Self, CompetencyError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "technical" => Ok(Self::Technical),
            "soft" => Ok(Self::Soft),
            "leadership" => Ok(Self::Leadership),
            "business" => Ok(Self::Business),
            "other" => Ok(Self::Other),
            _ => Err(CompetencyError::validation(format!(
                "Invalid category: {}",
                name
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Soft => "soft",
            Self::Leadership => "leadership",
            Self::Business => "business",
            Self::Other => "other",
        }
    }
}

/// Free-form metadata value attached to a competency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Flag(bool),
}

// =============================================================================
// COMPETENCY
// =============================================================================

/// A named, leveled skill tracked per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    id: CompetencyId,
    code: CompetencyCode,
    name: String,
    description: String,
    category: CompetencyCategory,
    parent: Option<CompetencyId>,
    levels: Vec<CompetencyLevel>,
    active: bool,
    metadata: BTreeMap<String, MetadataValue>,
}

impl Competency {
    /// Create an active competency.
    ///
    /// When `levels` is `None` the five standard levels are used.
    pub fn create(
        id: CompetencyId,
        code: CompetencyCode,
        name: &str,
        description: &str,
        category: CompetencyCategory,
        parent: Option<CompetencyId>,
        levels: Option<Vec<CompetencyLevel>>,
    ) -> Result<Recorded<Self>, CompetencyError> {
        let name = validate_name(name)?;
        let description = validate_description(description)?;
        if parent == Some(id) {
            return Err(CompetencyError::validation(
                "A competency cannot be its own parent",
            ));
        }
        let levels = match levels {
            Some(levels) => normalize_levels(levels)?,
            None => Self::default_levels(),
        };

        let event = DomainEvent::CompetencyCreated {
            competency: id,
            code: code.as_str().to_string(),
        };

        Ok(Recorded::new(
            Self {
                id,
                code,
                name,
                description,
                category,
                parent,
                levels,
                active: true,
                metadata: BTreeMap::new(),
            },
            event,
        ))
    }

    /// The five standard levels, Beginner through Expert.
    #[must_use]
    pub fn default_levels() -> Vec<CompetencyLevel> {
        CompetencyLevel::ALL.to_vec()
    }

    #[must_use]
    pub fn id(&self) -> CompetencyId {
        self.id
    }

    #[must_use]
    pub fn code(&self) -> &CompetencyCode {
        &self.code
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn category(&self) -> CompetencyCategory {
        self.category
    }

    #[must_use]
    pub fn parent(&self) -> Option<CompetencyId> {
        self.parent
    }

    #[must_use]
    pub fn levels(&self) -> &[CompetencyLevel] {
        &self.levels
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    #[must_use]
    pub fn has_level(&self, level: CompetencyLevel) -> bool {
        self.levels.contains(&level)
    }

    #[must_use]
    pub fn is_subcompetency_of(&self, parent: CompetencyId) -> bool {
        self.parent == Some(parent)
    }

    /// Rename and redescribe the competency.
    pub fn update(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<DomainEvent, CompetencyError> {
        let name = validate_name(name)?;
        let description = validate_description(description)?;
        self.name = name;
        self.description = description;
        Ok(self.updated())
    }

    pub fn change_category(&mut self, category: CompetencyCategory) -> DomainEvent {
        self.category = category;
        self.updated()
    }

    /// Deactivate. Returns `None` when already inactive.
    pub fn deactivate(&mut self) -> Option<DomainEvent> {
        if !self.active {
            return None;
        }
        self.active = false;
        Some(DomainEvent::CompetencyDeactivated {
            competency: self.id,
        })
    }

    /// Reactivate. Returns `None` when already active.
    pub fn activate(&mut self) -> Option<DomainEvent> {
        if self.active {
            return None;
        }
        self.active = true;
        Some(self.updated())
    }

    pub fn set_parent(&mut self, parent: CompetencyId) -> Result<(), CompetencyError> {
        if parent == self.id {
            return Err(CompetencyError::validation(
                "A competency cannot be its own parent",
            ));
        }
        self.parent = Some(parent);
        Ok(())
    }

    pub fn remove_parent(&mut self) {
        self.parent = None;
    }

    /// Replace the level scale. At least one level is required.
    pub fn update_levels(&mut self, levels: Vec<CompetencyLevel>) -> Result<(), CompetencyError> {
        self.levels = normalize_levels(levels)?;
        Ok(())
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.metadata.insert(key.into(), value);
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<MetadataValue> {
        self.metadata.remove(key)
    }

    fn updated(&self) -> DomainEvent {
        DomainEvent::CompetencyUpdated {
            competency: self.id,
        }
    }
}

fn validate_name(name: &str) -> Result<String, CompetencyError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CompetencyError::validation("Name cannot be empty"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(CompetencyError::validation(format!(
            "Name exceeds {} bytes",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

fn validate_description(description: &str) -> Result<String, CompetencyError> {
    if description.len() > MAX_TEXT_LENGTH {
        return Err(CompetencyError::validation(format!(
            "Description exceeds {} bytes",
            MAX_TEXT_LENGTH
        )));
    }
    Ok(description.trim().to_string())
}

fn normalize_levels(
    mut levels: Vec<CompetencyLevel>,
) -> Result<Vec<CompetencyLevel>, CompetencyError> {
    if levels.is_empty() {
        return Err(CompetencyError::validation(
            "Competency must have at least one level",
        ));
    }
    levels.sort();
    levels.dedup();
    Ok(levels)
}

// =============================================================================
// SUMMARIES
// =============================================================================

/// Read-only view of a competency for callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencySummary {
    pub id: CompetencyId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: CompetencyCategory,
    pub parent: Option<CompetencyId>,
    pub is_active: bool,
    pub levels: Vec<CompetencyLevel>,
}

impl From<&Competency> for CompetencySummary {
    fn from(competency: &Competency) -> Self {
        Self {
            id: competency.id,
            code: competency.code.as_str().to_string(),
            name: competency.name.clone(),
            description: competency.description.clone(),
            category: competency.category,
            parent: competency.parent,
            is_active: competency.active,
            levels: competency.levels.clone(),
        }
    }
}

/// A parent competency with its direct children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyTree {
    pub root: CompetencySummary,
    pub children: Vec<CompetencySummary>,
}

/// Input for creating a competency through the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyDraft {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: CompetencyCategory,
    #[serde(default)]
    pub parent: Option<CompetencyId>,
    #[serde(default)]
    pub levels: Option<Vec<CompetencyLevel>>,
}

/// Outcome of a bulk create. Failures do not abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCreateSummary {
    pub created: Vec<CompetencyId>,
    pub failed: usize,
    pub errors: Vec<String>,
}

// =============================================================================
// CATALOG
// =============================================================================

/// In-memory arena of competency definitions.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetencyCatalog {
    competencies: BTreeMap<CompetencyId, Competency>,
    code_index: BTreeMap<CompetencyCode, CompetencyId>,
    next_id: u64,
}

impl CompetencyCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.competencies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.competencies.is_empty()
    }

    /// Every competency, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Competency> {
        self.competencies.values()
    }

    /// Create a competency.
    ///
    /// # Errors
    /// - `DuplicateKey` if the code is already used
    /// - `CompetencyNotFound` if the parent does not exist
    /// - `Validation` for a malformed code, empty name or empty level list
    pub fn create(
        &mut self,
        draft: CompetencyDraft,
    ) -> Result<Recorded<CompetencyId>, CompetencyError> {
        let code = CompetencyCode::parse(&draft.code)?;
        if self.code_index.contains_key(&code) {
            return Err(CompetencyError::DuplicateKey(format!(
                "Competency with code {} already exists",
                code
            )));
        }
        if let Some(parent) = draft.parent
            && !self.competencies.contains_key(&parent)
        {
            return Err(CompetencyError::CompetencyNotFound(parent));
        }

        let id = CompetencyId(self.next_id.saturating_add(1));
        let recorded = Competency::create(
            id,
            code.clone(),
            &draft.name,
            &draft.description,
            draft.category,
            draft.parent,
            draft.levels,
        )?;

        self.next_id = id.value();
        self.code_index.insert(code, id);
        let (competency, events) = recorded.into_parts();
        tracing::debug!(competency = %id, code = %competency.code, "competency created");
        self.competencies.insert(id, competency);

        Ok(Recorded::with_events(id, events))
    }

    /// Create many competencies; each failure is collected instead of aborting.
    pub fn bulk_create(
        &mut self,
        drafts: Vec<CompetencyDraft>,
    ) -> Result<Recorded<BulkCreateSummary>, CompetencyError> {
        if drafts.len() > MAX_BULK_SIZE {
            return Err(CompetencyError::validation(format!(
                "Bulk create of {} competencies exceeds maximum {}",
                drafts.len(),
                MAX_BULK_SIZE
            )));
        }

        let mut summary = BulkCreateSummary::default();
        let mut events = Vec::new();

        for draft in drafts {
            let code = draft.code.clone();
            match self.create(draft) {
                Ok(recorded) => {
                    let (id, mut raised) = recorded.into_parts();
                    summary.created.push(id);
                    events.append(&mut raised);
                }
                Err(e) => {
                    summary.failed = summary.failed.saturating_add(1);
                    summary.errors.push(format!("Code {}: {}", code, e));
                }
            }
        }

        Ok(Recorded::with_events(summary, events))
    }

    /// Get a competency or fail with `CompetencyNotFound`.
    pub fn get(&self, id: CompetencyId) -> Result<&Competency, CompetencyError> {
        self.competencies
            .get(&id)
            .ok_or(CompetencyError::CompetencyNotFound(id))
    }

    fn get_mut(&mut self, id: CompetencyId) -> Result<&mut Competency, CompetencyError> {
        self.competencies
            .get_mut(&id)
            .ok_or(CompetencyError::CompetencyNotFound(id))
    }

    #[must_use]
    pub fn contains(&self, id: CompetencyId) -> bool {
        self.competencies.contains_key(&id)
    }

    /// Find by code (case-insensitive).
    #[must_use]
    pub fn by_code(&self, code: &str) -> Option<&Competency> {
        let code = CompetencyCode::parse(code).ok()?;
        self.code_index
            .get(&code)
            .and_then(|id| self.competencies.get(id))
    }

    pub fn update(
        &mut self,
        id: CompetencyId,
        name: &str,
        description: &str,
    ) -> Result<Recorded<()>, CompetencyError> {
        let event = self.get_mut(id)?.update(name, description)?;
        Ok(Recorded::new((), event))
    }

    pub fn change_category(
        &mut self,
        id: CompetencyId,
        category: CompetencyCategory,
    ) -> Result<Recorded<()>, CompetencyError> {
        let event = self.get_mut(id)?.change_category(category);
        Ok(Recorded::new((), event))
    }

    pub fn deactivate(&mut self, id: CompetencyId) -> Result<Recorded<()>, CompetencyError> {
        let event = self.get_mut(id)?.deactivate();
        Ok(Recorded::with_events((), event.into_iter().collect()))
    }

    pub fn activate(&mut self, id: CompetencyId) -> Result<Recorded<()>, CompetencyError> {
        let event = self.get_mut(id)?.activate();
        Ok(Recorded::with_events((), event.into_iter().collect()))
    }

    /// Attach `id` under `parent`. Both must exist.
    /// Attach `id` under `parent`.
    ///
    /// # Errors
    /// - `CompetencyNotFound` if either competency is unknown
    /// - `Validation` if `parent` is `id` itself or one of its descendants
    pub fn set_parent(
        &mut self,
        id: CompetencyId,
        parent: CompetencyId,
    ) -> Result<(), CompetencyError> {
        if !self.contains(parent) {
            return Err(CompetencyError::CompetencyNotFound(parent));
        }
        if self.is_ancestor_or_self(id, parent) {
            return Err(CompetencyError::validation(format!(
                "{} cannot be placed under its own descendant {}",
                id, parent
            )));
        }
        self.get_mut(id)?.set_parent(parent)
    }

    /// True when walking up from `start` reaches `ancestor`.
    fn is_ancestor_or_self(&self, ancestor: CompetencyId, start: CompetencyId) -> bool {
        let mut current = Some(start);
        // parent chains are acyclic, so the walk is bounded by the catalog size
        for _ in 0..=self.competencies.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.competencies.get(&id).and_then(|c| c.parent),
                None => return false,
            }
        }
        false
    }

    #[must_use]
    pub fn by_category(&self, category: CompetencyCategory) -> Vec<&Competency> {
        self.iter().filter(|c| c.category == category).collect()
    }

    #[must_use]
    pub fn active(&self) -> Vec<&Competency> {
        self.iter().filter(|c| c.active).collect()
    }

    /// Case-insensitive substring search over code, name and description.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Competency> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.iter()
            .filter(|c| {
                c.code.as_str().to_lowercase().contains(&needle)
                    || c.name.to_lowercase().contains(&needle)
                    || c.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Direct children of `parent`.
    #[must_use]
    pub fn children(&self, parent: CompetencyId) -> Vec<&Competency> {
        self.iter().filter(|c| c.is_subcompetency_of(parent)).collect()
    }

    /// A parent with its direct children.
    pub fn tree(&self, parent: CompetencyId) -> Result<CompetencyTree, CompetencyError> {
        let root = self.get(parent)?;
        Ok(CompetencyTree {
            root: CompetencySummary::from(root),
            children: self
                .children(parent)
                .into_iter()
                .map(CompetencySummary::from)
                .collect(),
        })
    }

    /// The next unused `PREFIX-NNN` code.
    pub fn next_code(&self, prefix: &str) -> Result<CompetencyCode, CompetencyError> {
        CompetencyCode::next_for_prefix(prefix, self.code_index.keys())
    }
}

impl CompetencyLookup for CompetencyCatalog {
    fn competency_by_id(&self, id: CompetencyId) -> Result<Option<Competency>, CompetencyError> {
        Ok(self.competencies.get(&id).cloned())
    }

    fn competency_by_code(&self, code: &str) -> Result<Option<Competency>, CompetencyError> {
        Ok(self.by_code(code).cloned())
    }
}

// =============================================================================
// TESTS
// =============================================================================
