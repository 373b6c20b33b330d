//! BigQuery table identifiers.

use crate::error::{RunnerError, Result};
use std::fmt;

/// A fully resolved `project.dataset.table` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    /// Parses a table identifier.
    ///
    /// Accepted forms:
    /// - `project.dataset.table`, where the project may contain `.` or `:`
    ///   (domain-scoped projects such as `example.com:proj`);
    /// - `project:dataset.table` (legacy SQL form);
    /// - `dataset.table`, resolved against `default_project`.
    pub fn parse(id: &str, default_project: Option<&str>) -> Result<Self> {
        let mut parts = id.rsplitn(3, '.');
        let table = parts.next().unwrap_or_default();
        let dataset = parts.next();
        let project = parts.next();

        let (project, dataset) = match (project, dataset) {
            (Some(project), Some(dataset)) => (project.to_string(), dataset.to_string()),
            (None, Some(dataset)) => match dataset.split_once(':') {
                Some((project, dataset)) => (project.to_string(), dataset.to_string()),
                None => {
                    let project = default_project.ok_or_else(|| {
                        RunnerError::data_source(format!(
                            "Table '{id}' has no project and no default project is configured"
                        ))
                    })?;
                    (project.to_string(), dataset.to_string())
                }
            },
            _ => {
                return Err(RunnerError::data_source(format!(
                    "Invalid BigQuery table '{id}'. Expected [project.]dataset.table"
                )))
            }
        };

        if project.is_empty() || dataset.is_empty() || table.is_empty() {
            return Err(RunnerError::data_source(format!(
                "Invalid BigQuery table '{id}'. Project, dataset and table must be non-empty"
            )));
        }

        Ok(Self {
            project,
            dataset,
            table: table.to_string(),
        })
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}
