use std::path::Path;

use super::TestRun;
use crate::error::LoadprobeError;

/// Persist a finished run to disk as pretty-printed JSON.
pub async fn write_run(run: &TestRun, path: impl AsRef<Path>) -> Result<(), LoadprobeError> {
    let content = serde_json::to_string_pretty(run)?;
    tokio::fs::write(path.as_ref(), content).await?;
    tracing::debug!(path = %path.as_ref().display(), run_id = %run.run_id(), "wrote run");
    Ok(())
}

/// Load a run previously written with [`write_run`].
pub async fn read_run(path: impl AsRef<Path>) -> Result<TestRun, LoadprobeError> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(serde_json::from_str(&content)?)
}
