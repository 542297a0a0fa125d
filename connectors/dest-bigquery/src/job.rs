//! Load job resources, as sent to and returned by the jobs API.

use serde::{Deserialize, Serialize};

use tablehop_engine::JobOutcome;
use tablehop_types::error::{Result, TransferError};
use tablehop_types::WriteDisposition;

use crate::schema::TableSchema;
use crate::table::TableRef;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl From<&TableRef> for TableReference {
    fn from(t: &TableRef) -> Self {
        Self {
            project_id: t.project.clone(),
            dataset_id: t.dataset.clone(),
            table_id: t.table.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfigurationLoad {
    pub destination_table: TableReference,
    pub source_format: &'static str,
    pub write_disposition: WriteDisposition,
    pub create_disposition: &'static str,
    pub schema: TableSchema,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobConfiguration {
    pub load: JobConfigurationLoad,
}

/// Body of a `jobs.insert` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInsert {
    pub job_reference: JobReference,
    pub configuration: JobConfiguration,
}

impl JobInsert {
    pub fn load(
        job_reference: JobReference,
        table: &TableRef,
        write_disposition: WriteDisposition,
        schema: TableSchema,
    ) -> Self {
        Self {
            job_reference,
            configuration: JobConfiguration {
                load: JobConfigurationLoad {
                    destination_table: table.into(),
                    source_format: "NEWLINE_DELIMITED_JSON",
                    write_disposition,
                    create_disposition: "CREATE_IF_NEEDED",
                    schema,
                },
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorProto {
    fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or("unknown error");
        match (&self.reason, &self.location) {
            (Some(reason), Some(location)) => format!("{reason} at {location}: {message}"),
            (Some(reason), None) => format!("{reason}: {message}"),
            _ => message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: String,
    #[serde(default)]
    pub error_result: Option<ErrorProto>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStatistics {
    /// int64 values arrive as JSON strings.
    #[serde(default)]
    pub output_rows: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStatistics {
    #[serde(default)]
    pub load: Option<LoadStatistics>,
}

/// Job resource as returned by `jobs.insert` and `jobs.get`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_reference: JobReference,
    pub status: JobStatus,
    #[serde(default)]
    pub statistics: Option<JobStatistics>,
}

impl Job {
    pub fn is_done(&self) -> bool {
        self.status.state == "DONE"
    }

    /// Interpret a finished job: `errorResult` means the job failed.
    pub fn outcome(&self) -> Result<JobOutcome> {
        if let Some(err) = &self.status.error_result {
            let mut message = format!(
                "job {} failed: {}",
                self.job_reference.job_id,
                err.describe()
            );
            let extra: Vec<String> = self
                .status
                .errors
                .iter()
                .filter(|e| *e != err)
                .take(5)
                .map(ErrorProto::describe)
                .collect();
            if !extra.is_empty() {
                message.push_str(&format!(" ({})", extra.join("; ")));
            }
            return Err(TransferError::load_job("JOB_FAILED", message));
        }
        let output_rows = self
            .statistics
            .as_ref()
            .and_then(|s| s.load.as_ref())
            .and_then(|l| l.output_rows.as_deref())
            .and_then(|n| n.parse().ok());
        Ok(JobOutcome { output_rows })
    }
}

/// Client-generated job id, unique per table, chunk and submit time.
pub fn job_id(table: &TableRef, chunk_index: u64, now_millis: i64) -> String {
    let raw = format!("tablehop_{}_{}_c{chunk_index}_{now_millis}", table.dataset, table.table);
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(1024)
        .collect()
}
