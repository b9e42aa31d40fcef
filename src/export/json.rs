use std::path::Path;

use crate::export::error::{write_file, ExportResult};
use crate::stats::Summary;

pub fn format_summary(summary: &Summary) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

pub fn write_summary(summary: &Summary, path: impl AsRef<Path>) -> ExportResult<()> {
    write_file(path.as_ref(), &format_summary(summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_are_null() {
        let summary = Summary {
            tx: 4,
            ..Default::default()
        };
        let value: serde_json::Value =
            serde_json::from_str(&format_summary(&summary).unwrap()).unwrap();

        assert_eq!(value["tx"], 4);
        assert!(value["fps"].is_null());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = Summary {
            tx: 10,
            rx: 8,
            loss_pct: 20.0,
            lat_mean: Some(5.0),
            ..Default::default()
        };

        write_summary(&summary, &path).unwrap();
        let restored: Summary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored, summary);
    }
}
