//! User-authored classification overrides and their persistence.
//!
//! An override is keyed by (category, resolved type, scope, version). Project
//! scope wins over center scope when both are known, and rows with a version id
//! never mix with rows without one.

pub mod adapter;
pub mod file;
pub mod store;

pub use adapter::{hierarchical_code, measure_key, ClassificationAdapter, OverrideDraft};
pub use store::{ClassificationStore, MemoryClassificationStore, SequenceMark};

use crate::model::{ClassificationKey, UnitKind};
use serde::{Deserialize, Serialize};

/// One persisted override row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOverride {
    pub category: String,
    pub type_name: String,
    pub scope_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub preferred_unit: UnitKind,
    #[serde(default)]
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub subchapter_id: Option<String>,
    #[serde(default)]
    pub subsubchapter_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display_order: u32,
    #[serde(default)]
    pub measured_value: f64,
    #[serde(default)]
    pub element_count: usize,
}

impl ClassificationOverride {
    #[must_use]
    pub fn key(&self) -> ClassificationKey {
        ClassificationKey::new(&self.category, &self.type_name)
    }

    /// Whether this row lives in the given scope and version pool.
    #[must_use]
    pub fn in_pool(&self, scope_id: &str, version_id: Option<&str>) -> bool {
        self.scope_id == scope_id && self.version_id.as_deref() == version_id
    }

    #[must_use]
    pub fn matches(&self, key: &ClassificationKey) -> bool {
        self.category == key.category && self.type_name == key.type_name
    }
}

/// Where overrides are stored: a project, its center, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub project_id: Option<String>,
    pub center_id: Option<String>,
}

impl Scope {
    #[must_use]
    pub fn project(id: impl Into<String>) -> Self {
        Self {
            project_id: Some(id.into()),
            center_id: None,
        }
    }

    #[must_use]
    pub fn center(id: impl Into<String>) -> Self {
        Self {
            project_id: None,
            center_id: Some(id.into()),
        }
    }

    #[must_use]
    pub fn with_center(mut self, id: impl Into<String>) -> Self {
        self.center_id = Some(id.into());
        self
    }

    /// The id new and updated rows are written under.
    #[must_use]
    pub fn persisted_id(&self) -> Option<&str> {
        self.project_id
            .as_deref()
            .or(self.center_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Ids to search on load, most specific first.
    pub fn lookup_ids(&self) -> impl Iterator<Item = &str> {
        [self.project_id.as_deref(), self.center_id.as_deref()]
            .into_iter()
            .flatten()
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_scope_is_persisted_over_center() {
        let scope = Scope::project("p1").with_center("c1");
        assert_eq!(scope.persisted_id(), Some("p1"));
        assert_eq!(scope.lookup_ids().collect::<Vec<_>>(), vec!["p1", "c1"]);
        assert_eq!(Scope::center("c1").persisted_id(), Some("c1"));
        assert_eq!(Scope::default().persisted_id(), None);
    }
}
