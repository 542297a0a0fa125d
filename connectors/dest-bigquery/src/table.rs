//! Fully qualified warehouse table identifiers.

use std::fmt;

use tablehop_types::error::{Result, TransferError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    /// Parse `dataset.table` or `project.dataset.table`.
    ///
    /// A two-part id takes its project from `default_project`.
    pub fn parse(id: &str, default_project: Option<&str>) -> Result<Self> {
        let parts: Vec<&str> = id.trim().split('.').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid(id));
        }
        match parts.as_slice() {
            [project, dataset, table] => Ok(Self {
                project: (*project).to_string(),
                dataset: (*dataset).to_string(),
                table: (*table).to_string(),
            }),
            [dataset, table] => {
                let Some(project) = default_project.filter(|p| !p.trim().is_empty()) else {
                    return Err(TransferError::config(
                        "MISSING_PROJECT",
                        format!("table '{id}' has no project and no project_id is configured"),
                    ));
                };
                Ok(Self {
                    project: project.to_string(),
                    dataset: (*dataset).to_string(),
                    table: (*table).to_string(),
                })
            }
            _ => Err(invalid(id)),
        }
    }
}

fn invalid(id: &str) -> TransferError {
    TransferError::config(
        "INVALID_TABLE_ID",
        format!("warehouse table '{id}' must be dataset.table or project.dataset.table"),
    )
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}
