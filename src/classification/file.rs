//! JSON file backing for [`MemoryClassificationStore`], used by the CLI.

use super::{ClassificationOverride, MemoryClassificationStore, SequenceMark};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    rows: Vec<ClassificationOverride>,
    #[serde(default)]
    sequences: Vec<SequenceMark>,
}

/// Older files hold a bare array of rows.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredContent {
    Store(StoreFile),
    Rows(Vec<ClassificationOverride>),
}

/// Loads a store from `path`. A missing file is an empty store.
pub fn read_store<P: AsRef<Path>>(path: P) -> Result<MemoryClassificationStore, StoreError> {
    let path_ref = path.as_ref();
    let content = match std::fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(source) if source.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path_ref.display(), "no row file, starting empty");
            return Ok(MemoryClassificationStore::new());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path_ref.to_path_buf(),
                source,
            })
        }
    };

    let file = match serde_json::from_str(&content)? {
        StoredContent::Store(file) => file,
        StoredContent::Rows(rows) => StoreFile {
            rows,
            sequences: Vec::new(),
        },
    };
    Ok(MemoryClassificationStore::with_sequences(
        file.rows,
        file.sequences,
    ))
}

/// Writes every row and sequence mark of `store` to `path`, so numbers handed
/// out before a deletion stay consumed on the next load.
pub fn write_store<P: AsRef<Path>>(
    path: P,
    store: &MemoryClassificationStore,
) -> Result<(), StoreError> {
    let path_ref = path.as_ref();
    let io_error = |source| StoreError::Io {
        path: path_ref.to_path_buf(),
        source,
    };

    let content = StoreFile {
        rows: store.snapshot()?,
        sequences: store.sequences()?,
    };

    let mut writer = BufWriter::new(File::create(path_ref).map_err(io_error)?);
    serde_json::to_writer_pretty(&mut writer, &content)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ClassificationStore;
    use crate::model::{ClassificationKey, UnitKind};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("takeoff-{}-{name}.json", std::process::id()))
    }

    fn row(type_name: &str, display_order: u32) -> ClassificationOverride {
        ClassificationOverride {
            category: "IfcWall".into(),
            type_name: type_name.into(),
            scope_id: "p1".into(),
            version_id: None,
            custom_name: None,
            description: None,
            preferred_unit: UnitKind::Area,
            chapter_id: Some("04".into()),
            subchapter_id: None,
            subsubchapter_id: Some("A".into()),
            code: None,
            display_order,
            measured_value: 12.0,
            element_count: 1,
        }
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let store = read_store(temp_path("missing")).unwrap();
        assert!(store.snapshot().unwrap().is_empty());
        assert!(store.sequences().unwrap().is_empty());
    }

    #[test]
    fn test_bare_row_array_is_accepted() {
        let path = temp_path("legacy");
        std::fs::write(&path, serde_json::to_string(&vec![row("T1", 3)]).unwrap()).unwrap();
        let store = read_store(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(store.snapshot().unwrap(), vec![row("T1", 3)]);
        assert_eq!(store.sequences().unwrap()[0].last_order, 3);
    }

    #[tokio::test]
    async fn test_deleted_numbers_stay_consumed_after_reload() {
        let path = temp_path("reload");
        let store = MemoryClassificationStore::from_rows(vec![row("T1", 1), row("T2", 2)]);
        assert!(store
            .delete(&ClassificationKey::new("IfcWall", "T2"), "p1", None)
            .await
            .unwrap());
        write_store(&path, &store).unwrap();

        let reloaded = read_store(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reloaded.snapshot().unwrap(), vec![row("T1", 1)]);
        let next = reloaded
            .next_display_order("p1", None, "A", &ClassificationKey::new("IfcWall", "T3"))
            .await
            .unwrap();
        assert_eq!(next, 3);
    }
}
