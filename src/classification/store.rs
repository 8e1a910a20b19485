use super::ClassificationOverride;
use crate::error::StoreError;
use crate::model::ClassificationKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Keyed record store holding override rows.
///
/// Every method can fail with [`StoreError::Unavailable`]; callers must not
/// treat a failed lookup as "no override".
#[async_trait]
pub trait ClassificationStore: Send + Sync {
    async fn find(
        &self,
        key: &ClassificationKey,
        scope_id: &str,
        version_id: Option<&str>,
    ) -> Result<Option<ClassificationOverride>, StoreError>;

    async fn list(
        &self,
        scope_id: &str,
        version_id: Option<&str>,
    ) -> Result<Vec<ClassificationOverride>, StoreError>;

    /// Allocates the next display order within a sub-sub-chapter: one past the
    /// number of sibling rows (excluding `key`), and never a number handed out
    /// before in the same pool.
    async fn next_display_order(
        &self,
        scope_id: &str,
        version_id: Option<&str>,
        subsubchapter_id: &str,
        key: &ClassificationKey,
    ) -> Result<u32, StoreError>;

    /// Returns a display order obtained from
    /// [`next_display_order`](Self::next_display_order) whose row was never
    /// written. Only the most recent allocation of a pool can be returned;
    /// older ones stay consumed.
    async fn release_display_order(
        &self,
        scope_id: &str,
        version_id: Option<&str>,
        subsubchapter_id: &str,
        display_order: u32,
    ) -> Result<(), StoreError>;

    /// Inserts or replaces the row with the same key, scope and version.
    async fn upsert(&self, row: &ClassificationOverride) -> Result<(), StoreError>;

    /// Returns whether a row was removed.
    async fn delete(
        &self,
        key: &ClassificationKey,
        scope_id: &str,
        version_id: Option<&str>,
    ) -> Result<bool, StoreError>;
}

type SequenceKey = (String, Option<String>, String);

/// Highest display order ever handed out in one sub-sub-chapter pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceMark {
    pub scope_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    pub subsubchapter_id: String,
    pub last_order: u32,
}

#[derive(Default)]
struct MemoryState {
    rows: Vec<ClassificationOverride>,
    high_water: HashMap<SequenceKey, u32>,
}

/// In-memory store for the CLI and tests.
///
/// Can be switched offline to exercise failure paths.
pub struct MemoryClassificationStore {
    inner: RwLock<MemoryState>,
    available: AtomicBool,
}

impl MemoryClassificationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::from_rows(Vec::new())
    }

    /// Seeds the store; sequence high-water marks start at the largest
    /// existing display order per sub-sub-chapter.
    #[must_use]
    pub fn from_rows(rows: Vec<ClassificationOverride>) -> Self {
        Self::with_sequences(rows, Vec::new())
    }

    /// Seeds the store with rows and previously persisted sequence marks.
    /// Each pool starts at the larger of its mark and its largest row.
    #[must_use]
    pub fn with_sequences(rows: Vec<ClassificationOverride>, sequences: Vec<SequenceMark>) -> Self {
        let mut high_water: HashMap<SequenceKey, u32> = sequences
            .into_iter()
            .map(|m| ((m.scope_id, m.version_id, m.subsubchapter_id), m.last_order))
            .collect();
        for row in &rows {
            if let Some(sub) = &row.subsubchapter_id {
                let mark = high_water
                    .entry((row.scope_id.clone(), row.version_id.clone(), sub.clone()))
                    .or_insert(0);
                *mark = (*mark).max(row.display_order);
            }
        }
        Self {
            inner: RwLock::new(MemoryState { rows, high_water }),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// All rows, in insertion order.
    pub fn snapshot(&self) -> Result<Vec<ClassificationOverride>, StoreError> {
        let state = self.inner.read().map_err(|e| unavailable(&e))?;
        Ok(state.rows.clone())
    }

    /// Current sequence marks, ordered by pool.
    pub fn sequences(&self) -> Result<Vec<SequenceMark>, StoreError> {
        let state = self.inner.read().map_err(|e| unavailable(&e))?;
        let mut marks: Vec<SequenceMark> = state
            .high_water
            .iter()
            .filter(|(_, last_order)| **last_order > 0)
            .map(|((scope_id, version_id, subsubchapter_id), last_order)| SequenceMark {
                scope_id: scope_id.clone(),
                version_id: version_id.clone(),
                subsubchapter_id: subsubchapter_id.clone(),
                last_order: *last_order,
            })
            .collect();
        marks.sort_by(|a, b| {
            (&a.scope_id, &a.version_id, &a.subsubchapter_id)
                .cmp(&(&b.scope_id, &b.version_id, &b.subsubchapter_id))
        });
        Ok(marks)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                message: "store is offline".to_string(),
            })
        }
    }
}

impl Default for MemoryClassificationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn unavailable(e: &impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable {
        message: format!("lock: {e}"),
    }
}

#[async_trait]
impl ClassificationStore for MemoryClassificationStore {
    async fn find(
        &self,
        key: &ClassificationKey,
        scope_id: &str,
        version_id: Option<&str>,
    ) -> Result<Option<ClassificationOverride>, StoreError> {
        self.check()?;
        let state = self.inner.read().map_err(|e| unavailable(&e))?;
        Ok(state
            .rows
            .iter()
            .find(|r| r.matches(key) && r.in_pool(scope_id, version_id))
            .cloned())
    }

    async fn list(
        &self,
        scope_id: &str,
        version_id: Option<&str>,
    ) -> Result<Vec<ClassificationOverride>, StoreError> {
        self.check()?;
        let state = self.inner.read().map_err(|e| unavailable(&e))?;
        Ok(state
            .rows
            .iter()
            .filter(|r| r.in_pool(scope_id, version_id))
            .cloned()
            .collect())
    }

    async fn next_display_order(
        &self,
        scope_id: &str,
        version_id: Option<&str>,
        subsubchapter_id: &str,
        key: &ClassificationKey,
    ) -> Result<u32, StoreError> {
        self.check()?;
        let mut state = self.inner.write().map_err(|e| unavailable(&e))?;

        let siblings: Vec<&ClassificationOverride> = state
            .rows
            .iter()
            .filter(|r| {
                r.in_pool(scope_id, version_id)
                    && r.subsubchapter_id.as_deref() == Some(subsubchapter_id)
                    && !r.matches(key)
            })
            .collect();
        let count = siblings.len() as u32;
        let max_existing = siblings.iter().map(|r| r.display_order).max().unwrap_or(0);

        let seq_key = (
            scope_id.to_string(),
            version_id.map(str::to_string),
            subsubchapter_id.to_string(),
        );
        let mark = state.high_water.get(&seq_key).copied().unwrap_or(0);
        let next = count.max(max_existing).max(mark) + 1;
        state.high_water.insert(seq_key, next);
        Ok(next)
    }

    async fn release_display_order(
        &self,
        scope_id: &str,
        version_id: Option<&str>,
        subsubchapter_id: &str,
        display_order: u32,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.write().map_err(|e| unavailable(&e))?;
        let seq_key = (
            scope_id.to_string(),
            version_id.map(str::to_string),
            subsubchapter_id.to_string(),
        );
        if let Some(mark) = state.high_water.get_mut(&seq_key) {
            if *mark == display_order {
                *mark = display_order.saturating_sub(1);
            }
        }
        Ok(())
    }

    async fn upsert(&self, row: &ClassificationOverride) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.inner.write().map_err(|e| unavailable(&e))?;
        let key = row.key();
        match state
            .rows
            .iter()
            .position(|r| r.matches(&key) && r.in_pool(&row.scope_id, row.version_id.as_deref()))
        {
            Some(i) => state.rows[i] = row.clone(),
            None => state.rows.push(row.clone()),
        }
        Ok(())
    }

    async fn delete(
        &self,
        key: &ClassificationKey,
        scope_id: &str,
        version_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.inner.write().map_err(|e| unavailable(&e))?;
        let before = state.rows.len();
        state
            .rows
            .retain(|r| !(r.matches(key) && r.in_pool(scope_id, version_id)));
        Ok(state.rows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitKind;

    fn row(type_name: &str, scope: &str, version: Option<&str>) -> ClassificationOverride {
        ClassificationOverride {
            category: "IfcWall".into(),
            type_name: type_name.into(),
            scope_id: scope.into(),
            version_id: version.map(str::to_string),
            custom_name: None,
            description: None,
            preferred_unit: UnitKind::Area,
            chapter_id: None,
            subchapter_id: None,
            subsubchapter_id: Some("01.02.03".into()),
            code: None,
            display_order: 4,
            measured_value: 0.0,
            element_count: 0,
        }
    }

    #[tokio::test]
    async fn test_version_pools_do_not_merge() {
        let store = MemoryClassificationStore::from_rows(vec![
            row("A", "p1", None),
            row("A", "p1", Some("v2")),
        ]);
        let key = ClassificationKey::new("IfcWall", "A");

        assert_eq!(store.list("p1", None).await.unwrap().len(), 1);
        let versioned = store.find(&key, "p1", Some("v2")).await.unwrap().unwrap();
        assert_eq!(versioned.version_id.as_deref(), Some("v2"));
        assert!(store.find(&key, "p1", Some("v3")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_key() {
        let store = MemoryClassificationStore::new();
        let mut r = row("A", "p1", None);
        store.upsert(&r).await.unwrap();
        r.custom_name = Some("Muro exterior".into());
        store.upsert(&r).await.unwrap();
        let rows = store.snapshot().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].custom_name.as_deref(), Some("Muro exterior"));
    }

    #[tokio::test]
    async fn test_seeded_rows_set_high_water_mark() {
        let store = MemoryClassificationStore::from_rows(vec![row("A", "p1", None)]);
        let next = store
            .next_display_order("p1", None, "01.02.03", &ClassificationKey::new("IfcWall", "B"))
            .await
            .unwrap();
        assert_eq!(next, 5);
    }

    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let store = MemoryClassificationStore::new();
        store.set_available(false);
        let err = store.list("p1", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_release_returns_only_latest_allocation() {
        let store = MemoryClassificationStore::new();
        let key = |t: &str| ClassificationKey::new("IfcWall", t);

        let first = store.next_display_order("p1", None, "A", &key("B")).await.unwrap();
        let second = store.next_display_order("p1", None, "A", &key("C")).await.unwrap();
        assert_eq!((first, second), (1, 2));

        store.release_display_order("p1", None, "A", first).await.unwrap();
        store.release_display_order("p1", None, "A", second).await.unwrap();
        let next = store.next_display_order("p1", None, "A", &key("D")).await.unwrap();
        assert_eq!(next, 2);
    }
}
