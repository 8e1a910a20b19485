use crate::error::ExportError;
use crate::model::TakeoffReport;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the whole report tree as pretty-printed JSON.
pub fn export_json<P: AsRef<Path>>(report: &TakeoffReport, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|source| ExportError::Write {
        path: path_ref.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryGroup, Quantities};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_round_trips_through_file() {
        let report = TakeoffReport {
            categories: vec![CategoryGroup {
                category: "IfcSlab".into(),
                totals: Quantities {
                    count: 3,
                    ..Quantities::default()
                },
                types: Vec::new(),
            }],
        };

        let path = std::env::temp_dir().join(format!("takeoff-{}.json", std::process::id()));
        export_json(&report, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["categories"][0]["category"], "IfcSlab");
        assert_eq!(value["categories"][0]["totals"]["count"], 3);
    }

    #[test]
    fn test_missing_directory_reports_path() {
        let path = std::env::temp_dir()
            .join("takeoff-no-such-dir")
            .join("report.json");
        let err = export_json(&TakeoffReport::default(), &path).unwrap_err();
        assert!(matches!(err, ExportError::FileCreate { path: p, .. } if p == path));
    }
}
