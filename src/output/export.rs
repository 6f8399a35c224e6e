//! Run log export
//!
//! When a run completes with a log path configured, every registered node's
//! data is written as JSON:
//! - `log.json` for the root, holding its latest record
//! - `<name>.json` for every other node, holding all its records
//! - `finalErrors.json` with the run's failed-iteration descriptions

use crate::operations::{OperationKind, OperationState};
use crate::output::Persistence;
use crate::ScrapeError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ROOT_LOG: &str = "log";
const FINAL_ERRORS_LOG: &str = "finalErrors";

/// Writes the log files of a run into `log_path`
///
/// Returns the written paths in write order.
pub async fn export_run_logs(
    persistence: &dyn Persistence,
    log_path: &Path,
    operations: &[Arc<OperationState>],
    failed_iterations: &[String],
) -> Result<Vec<PathBuf>, ScrapeError> {
    persistence.ensure_directory(log_path).await?;

    let mut written = Vec::with_capacity(operations.len() + 1);
    for operation in operations {
        let data = operation.data();
        let path = if operation.kind() == OperationKind::Root {
            write_log(persistence, log_path, ROOT_LOG, &data.last()).await?
        } else {
            write_log(persistence, log_path, operation.name(), &data).await?
        };
        written.push(path);
    }

    written.push(write_log(persistence, log_path, FINAL_ERRORS_LOG, &failed_iterations).await?);

    Ok(written)
}

async fn write_log<T>(
    persistence: &dyn Persistence,
    log_path: &Path,
    file_name: &str,
    data: &T,
) -> Result<PathBuf, ScrapeError>
where
    T: Serialize + ?Sized,
{
    let path = log_path.join(format!("{}.json", file_name));
    let json = serde_json::to_vec(data)?;
    persistence.write_file(&path, &json).await?;
    tracing::info!("Log file {} saved", file_name);
    Ok(path)
}
