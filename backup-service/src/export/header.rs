//! Descriptive comment header written at the top of every artifact.

use crate::labels::ContainerLabels;

/// Metadata rendered ahead of the artifact payload.
#[derive(Debug, Clone)]
pub struct ArtifactHeader<'a> {
    pub database: &'a str,
    pub table: Option<&'a str>,
    pub backup_time: String,
    pub record_count: Option<usize>,
    pub format: &'a str,
    pub generated_by: Option<&'a str>,
    pub labels: &'a ContainerLabels,
}

impl ArtifactHeader<'_> {
    /// Header lines, each starting with `prefix` (`#` for CSV, `--` for SQL).
    /// The label block is only present when labels were loaded.
    pub fn lines(&self, prefix: &str) -> Vec<String> {
        let mut lines = vec![
            format!("{} Database Backup Metadata", prefix),
            format!("{} Database: {}", prefix, self.database),
        ];
        if let Some(table) = self.table {
            lines.push(format!("{} Table: {}", prefix, table));
        }
        lines.push(format!("{} Backup Time: {}", prefix, self.backup_time));
        if let Some(count) = self.record_count {
            lines.push(format!("{} Record Count: {}", prefix, count));
        }
        lines.push(format!("{} Format: {}", prefix, self.format));
        if let Some(generated_by) = self.generated_by {
            lines.push(format!("{} Generated by: {}", prefix, generated_by));
        }

        if !self.labels.is_empty() {
            let meta = self.labels.service_metadata();
            lines.push(format!("{} Container Labels:", prefix));
            lines.push(format!("{}   Database Type: {}", prefix, meta.database_type));
            lines.push(format!("{}   Database Name: {}", prefix, meta.database_name));
            lines.push(format!("{}   Database Version: {}", prefix, meta.database_version));
            lines.push(format!("{}   Backup Priority: {}", prefix, meta.backup_priority));
            lines.push(format!("{}   Retention Days: {}", prefix, meta.retention_days));
        }

        lines
    }
}

/// Current local time in the header's display format.
pub fn backup_time_now() -> String {
    chrono::Local::now()
        .format(crate::executor::cycle::DISPLAY_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{LABEL_DATABASE_TYPE, LABEL_PRIORITY};

    fn header<'a>(labels: &'a ContainerLabels) -> ArtifactHeader<'a> {
        ArtifactHeader {
            database: "app",
            table: Some("users"),
            backup_time: "2024-05-01 12:00:00".into(),
            record_count: Some(3),
            format: "CSV",
            generated_by: None,
            labels,
        }
    }

    #[test]
    fn test_lines_without_labels() {
        let labels = ContainerLabels::default();
        assert_eq!(
            header(&labels).lines("#"),
            vec![
                "# Database Backup Metadata",
                "# Database: app",
                "# Table: users",
                "# Backup Time: 2024-05-01 12:00:00",
                "# Record Count: 3",
                "# Format: CSV",
            ]
        );
    }

    #[test]
    fn test_lines_with_labels() {
        let labels: ContainerLabels = [(LABEL_DATABASE_TYPE, "mysql"), (LABEL_PRIORITY, "high")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut header = header(&labels);
        header.table = None;
        header.record_count = None;
        header.format = "SQL";

        let lines = header.lines("--");
        assert_eq!(lines[0], "-- Database Backup Metadata");
        assert!(!lines.iter().any(|l| l.contains("Table:")));
        assert!(lines.contains(&"-- Container Labels:".to_string()));
        assert!(lines.contains(&"--   Database Type: mysql".to_string()));
        assert!(lines.contains(&"--   Database Name: unknown".to_string()));
        assert!(lines.contains(&"--   Backup Priority: high".to_string()));
        assert!(lines.contains(&"--   Retention Days: 7".to_string()));
    }
}
