use std::path::Path;

use crate::config::TestConfiguration;
use crate::error::LoadprobeError;

/// Read a [`TestConfiguration`] from a JSON file on disk.
pub async fn read_configuration(
    path: impl AsRef<Path>,
) -> Result<TestConfiguration, LoadprobeError> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    let config: TestConfiguration = serde_json::from_str(&content)?;
    Ok(config)
}

/// Write a [`TestConfiguration`] to disk as pretty-printed JSON.
pub async fn write_configuration(
    config: &TestConfiguration,
    path: impl AsRef<Path>,
) -> Result<(), LoadprobeError> {
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path.as_ref(), content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StressSettings, TestMode};
    use std::time::Duration;

    #[tokio::test]
    async fn write_then_read_preserves_configuration() {
        let config = TestConfiguration::stress(
            "https://example.com/api",
            StressSettings::new(10, 5)
                .with_delay(Duration::from_millis(750))
                .with_failure_threshold(0.8)
                .with_max_rounds(12),
        );
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("stress.json");

        write_configuration(&config, &path)
            .await
            .expect("write_configuration should succeed");
        let loaded = read_configuration(&path)
            .await
            .expect("read_configuration should succeed");

        assert_eq!(loaded, config);
        match loaded.mode {
            TestMode::Stress(s) => assert_eq!(s.max_rounds, Some(12)),
            other => panic!("expected stress mode, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let err = read_configuration(dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadprobeError::Io(_)));
    }

    #[tokio::test]
    async fn read_malformed_file_is_serde_error() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, "{ not json").await.expect("write should succeed");
        let err = read_configuration(&path).await.unwrap_err();
        assert!(matches!(err, LoadprobeError::Serde(_)));
    }
}
