use super::{ClassificationOverride, ClassificationStore, Scope};
use crate::error::StoreError;
use crate::highlight::EditedKeys;
use crate::model::{ClassificationKey, MetadataGraph, UnitKind};
use crate::resolve::{resolve_type_name, resolve_value};
use crate::scene::{SceneHost, SceneLookup};
use std::collections::HashSet;
use std::sync::Mutex;

/// The user-editable part of an override.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideDraft {
    pub key: ClassificationKey,
    pub custom_name: Option<String>,
    pub description: Option<String>,
    pub preferred_unit: UnitKind,
    pub chapter_id: Option<String>,
    pub subchapter_id: Option<String>,
    pub subsubchapter_id: Option<String>,
}

impl OverrideDraft {
    #[must_use]
    pub fn new(key: ClassificationKey, preferred_unit: UnitKind) -> Self {
        Self {
            key,
            custom_name: None,
            description: None,
            preferred_unit,
            chapter_id: None,
            subchapter_id: None,
            subsubchapter_id: None,
        }
    }

    #[must_use]
    pub fn in_chapter(
        mut self,
        chapter_id: impl Into<String>,
        subchapter_id: impl Into<String>,
        subsubchapter_id: impl Into<String>,
    ) -> Self {
        self.chapter_id = Some(chapter_id.into());
        self.subchapter_id = Some(subchapter_id.into());
        self.subsubchapter_id = Some(subsubchapter_id.into());
        self
    }
}

/// Chapter ids joined by `.`, followed by the zero-padded display order.
///
/// ```
/// use ifc_takeoff::classification::hierarchical_code;
///
/// let code = hierarchical_code(&[Some("04"), Some("02"), Some("07")], 3);
/// assert_eq!(code.as_deref(), Some("04.02.07.003"));
/// assert_eq!(hierarchical_code(&[None, None, None], 1), None);
/// ```
#[must_use]
pub fn hierarchical_code(chapters: &[Option<&str>], display_order: u32) -> Option<String> {
    let parts: Vec<&str> = chapters
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    let prefix = parts.join(".");
    if display_order == 0 {
        Some(prefix)
    } else {
        Some(format!("{prefix}.{display_order:03}"))
    }
}

/// Sum of `unit` over every element classified under `key`, and the number of
/// such elements.
#[must_use]
pub fn measure_key<H: SceneHost + ?Sized>(
    graph: &MetadataGraph,
    key: &ClassificationKey,
    unit: UnitKind,
    scene: Option<&SceneLookup<'_, H>>,
) -> (f64, usize) {
    graph
        .elements()
        .filter(|obj| obj.ifc_type == key.category)
        .filter(|obj| resolve_type_name(obj, graph) == key.type_name)
        .fold((0.0, 0), |(sum, count), obj| {
            (sum + resolve_value(obj, graph, unit, scene), count + 1)
        })
}

type FlightKey = (String, Option<String>, ClassificationKey);

/// Marks a key as being saved; released on drop.
struct FlightGuard<'a> {
    registry: &'a Mutex<HashSet<FlightKey>>,
    key: FlightKey,
}

impl<'a> FlightGuard<'a> {
    fn acquire(registry: &'a Mutex<HashSet<FlightKey>>, key: FlightKey) -> Result<Self, StoreError> {
        let mut in_flight = registry.lock().map_err(|e| StoreError::Unavailable {
            message: format!("save registry: {e}"),
        })?;
        if !in_flight.insert(key.clone()) {
            return Err(StoreError::SaveInFlight {
                category: key.2.category,
                type_name: key.2.type_name,
            });
        }
        Ok(Self { registry, key })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.registry.lock() {
            in_flight.remove(&self.key);
        }
    }
}

/// Reads and writes overrides on top of a [`ClassificationStore`].
pub struct ClassificationAdapter<S: ClassificationStore> {
    store: S,
    in_flight: Mutex<HashSet<FlightKey>>,
}

impl<S: ClassificationStore> ClassificationAdapter<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The override for `key`, searching the project scope before the center
    /// scope. Only rows in the requested version pool are visible.
    pub async fn load(
        &self,
        key: &ClassificationKey,
        scope: &Scope,
        version_id: Option<&str>,
    ) -> Result<Option<ClassificationOverride>, StoreError> {
        for scope_id in scope.lookup_ids() {
            let found = self
                .store
                .find(key, scope_id, version_id)
                .await
                .inspect_err(|e| tracing::warn!(%scope_id, error = %e, "override lookup failed"))?;
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Creates or updates the override described by `draft`.
    ///
    /// The row is written under the project id when one is known. A new row,
    /// or one moved to another sub-sub-chapter, gets the next display order of
    /// that sub-sub-chapter; otherwise the existing order is kept. Measured
    /// value and element count are recomputed from `graph`. Nothing is written
    /// unless every preceding store call succeeded, and a display order
    /// allocated for a write that then fails is handed back to the store.
    pub async fn save<H: SceneHost + ?Sized>(
        &self,
        draft: OverrideDraft,
        scope: &Scope,
        version_id: Option<&str>,
        graph: &MetadataGraph,
        scene: Option<&SceneLookup<'_, H>>,
    ) -> Result<ClassificationOverride, StoreError> {
        let scope_id = scope.persisted_id().ok_or(StoreError::MissingScope)?;
        let _guard = FlightGuard::acquire(
            &self.in_flight,
            (
                scope_id.to_string(),
                version_id.map(str::to_string),
                draft.key.clone(),
            ),
        )?;

        let (measured_value, element_count) =
            measure_key(graph, &draft.key, draft.preferred_unit, scene);

        let existing = self.store.find(&draft.key, scope_id, version_id).await?;

        let (display_order, allocated) = match (&existing, draft.subsubchapter_id.as_deref()) {
            (Some(row), Some(sub)) if row.subsubchapter_id.as_deref() == Some(sub) => {
                (row.display_order, false)
            }
            (_, Some(sub)) => {
                let next = self
                    .store
                    .next_display_order(scope_id, version_id, sub, &draft.key)
                    .await?;
                (next, true)
            }
            (Some(row), None) => (row.display_order, false),
            (None, None) => (0, false),
        };

        let code = hierarchical_code(
            &[
                draft.chapter_id.as_deref(),
                draft.subchapter_id.as_deref(),
                draft.subsubchapter_id.as_deref(),
            ],
            display_order,
        );

        let row = ClassificationOverride {
            category: draft.key.category,
            type_name: draft.key.type_name,
            scope_id: scope_id.to_string(),
            version_id: version_id.map(str::to_string),
            custom_name: draft.custom_name,
            description: draft.description,
            preferred_unit: draft.preferred_unit,
            chapter_id: draft.chapter_id,
            subchapter_id: draft.subchapter_id,
            subsubchapter_id: draft.subsubchapter_id,
            code,
            display_order,
            measured_value,
            element_count,
        };

        if let Err(e) = self.store.upsert(&row).await {
            tracing::warn!(error = %e, "override save failed");
            if let (true, Some(sub)) = (allocated, row.subsubchapter_id.as_deref()) {
                if let Err(release) = self
                    .store
                    .release_display_order(scope_id, version_id, sub, display_order)
                    .await
                {
                    tracing::warn!(error = %release, display_order, "display order not released");
                }
            }
            return Err(e);
        }

        tracing::debug!(
            category = %row.category,
            type_name = %row.type_name,
            display_order,
            measured_value,
            element_count,
            "override saved"
        );
        Ok(row)
    }

    /// Removes an override. Display orders of the remaining siblings are left
    /// untouched.
    pub async fn delete(
        &self,
        key: &ClassificationKey,
        scope: &Scope,
        version_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let scope_id = scope.persisted_id().ok_or(StoreError::MissingScope)?;
        self.store.delete(key, scope_id, version_id).await
    }

    /// Every classified key visible in `scope`, mapped to its chapter id.
    /// Project rows shadow center rows for the same key.
    pub async fn edited_keys(
        &self,
        scope: &Scope,
        version_id: Option<&str>,
    ) -> Result<EditedKeys, StoreError> {
        let mut keys = EditedKeys::new();
        for scope_id in scope.lookup_ids() {
            for row in self.store.list(scope_id, version_id).await? {
                keys.entry(row.key()).or_insert(row.chapter_id);
            }
        }
        Ok(keys)
    }
}
