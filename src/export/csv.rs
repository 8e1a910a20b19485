use crate::error::ExportError;
use crate::model::TakeoffReport;
use std::fs::File;
use std::path::Path;

pub fn export_csv<P: AsRef<Path>>(report: &TakeoffReport, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);

    writer.write_record([
        "Category", "Type Name", "Tag", "Count", "Length", "Area", "Volume", "Mass",
    ])?;

    for group in report.groups() {
        let q = &group.quantities;
        let count = q.count.to_string();
        let measures = [q.length, q.area, q.volume, q.mass].map(|v| format!("{v:.3}"));
        let record: [&str; 8] = [
            &group.category,
            &group.type_name,
            &group.tag,
            &count,
            &measures[0],
            &measures[1],
            &measures[2],
            &measures[3],
        ];
        writer.write_record(record)?;
    }

    writer.flush().map_err(|source| ExportError::Write {
        path: path_ref.to_path_buf(),
        source,
    })?;

    Ok(())
}
