use std::io::Write;

use serde::Serialize;

use super::activity::ActivityLogEntry;

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Io(std::io::Error),
    Encoding(std::string::FromUtf8Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Csv(err) => write!(f, "failed to write activity CSV: {}", err),
            ExportError::Io(err) => write!(f, "failed to flush activity CSV: {}", err),
            ExportError::Encoding(err) => write!(f, "activity CSV is not valid UTF-8: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Csv(err) => Some(err),
            ExportError::Io(err) => Some(err),
            ExportError::Encoding(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<std::string::FromUtf8Error> for ExportError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Encoding(err)
    }
}

#[derive(Debug, Serialize)]
struct ActivityRow<'a> {
    id: &'a str,
    application_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    stage: &'static str,
    sub_stage: &'static str,
    performed_by: &'a str,
    performed_by_name: &'a str,
    created_at: String,
    title: &'a str,
    description: &'a str,
}

impl<'a> From<&'a ActivityLogEntry> for ActivityRow<'a> {
    fn from(entry: &'a ActivityLogEntry) -> Self {
        Self {
            id: &entry.id.0,
            application_id: entry.application_id.as_str(),
            kind: entry.kind.as_str(),
            stage: entry.stage.as_str(),
            sub_stage: entry.sub_stage.map(|sub_stage| sub_stage.as_str()).unwrap_or(""),
            performed_by: entry.performed_by.as_str(),
            performed_by_name: &entry.performed_by_name,
            created_at: entry.created_at.to_rfc3339(),
            title: &entry.title,
            description: entry.description.as_deref().unwrap_or(""),
        }
    }
}

/// Write the audit trail as CSV, one row per entry, header first.
pub fn write_activity_csv<W: Write>(
    writer: W,
    entries: &[ActivityLogEntry],
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in entries {
        csv_writer.serialize(ActivityRow::from(entry))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn activity_csv_string(entries: &[ActivityLogEntry]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_activity_csv(&mut buffer, entries)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::pipeline::activity::{ActivityDraft, ActivityType};
    use crate::workflows::pipeline::domain::{Actor, ApplicationId};
    use crate::workflows::pipeline::stage::{PipelinePosition, Stage, SubStage};
    use chrono::{TimeZone, Utc};

    #[test]
    fn exports_header_and_quoted_rows() {
        let created_at = Utc
            .with_ymd_and_hms(2025, 3, 4, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        let entry = ActivityLogEntry::new(
            ApplicationId::new("app-42"),
            ActivityDraft::new(ActivityType::InterviewScheduled, "Panel, round one")
                .with_description("Room 4"),
            PipelinePosition::new(Stage::Interview, Some(SubStage::Scheduled)),
            &Actor::new("u-9", "Dana Recruiter"),
            created_at,
        );

        let csv = activity_csv_string(&[entry]).expect("export succeeds");
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("id,application_id,type,stage,sub_stage,performed_by,performed_by_name,created_at,title,description")
        );
        let row = lines.next().expect("one data row");
        assert!(row.contains(",app-42,INTERVIEW_SCHEDULED,INTERVIEW,SCHEDULED,u-9,Dana Recruiter,2025-03-04T09:30:00+00:00,"));
        assert!(row.ends_with("\"Panel, round one\",Room 4"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_log_exports_nothing() {
        assert_eq!(activity_csv_string(&[]).expect("export succeeds"), "");
    }
}
