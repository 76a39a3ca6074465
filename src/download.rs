//! Saving the playing track to disk.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::client::models::Track;
use crate::client::{ApiClientError, Catalog};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Could not resolve stream: {0}")]
    Resolve(#[from] ApiClientError),

    #[error("Download failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned {0}")]
    Status(u16),

    #[error("Could not write file: {0}")]
    Io(#[from] std::io::Error),
}

/// Download `track` into `dir` as `{track_id}.flac`.
pub async fn download_track(
    api: &dyn Catalog,
    track: &Track,
    dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let url = api.stream_url(&track.id).await?;
    tracing::info!("Downloading track {} ({})", track.title, track.id);

    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(DownloadError::Status(response.status().as_u16()));
    }
    let bytes = response.bytes().await?;

    let path = dir.join(format!("{}.flac", track.id));
    tokio::fs::write(&path, &bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::catalog::tests::FakeCatalog;
    use crate::images::tests::serve_once;
    use crate::player::context::tests::track;

    #[tokio::test]
    async fn test_writes_flac_named_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FakeCatalog {
            stream_base: serve_once(b"fLaC").await,
            ..FakeCatalog::default()
        };

        let path = download_track(&catalog, &track("123"), dir.path())
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("123.flac"));
        assert_eq!(std::fs::read(path).unwrap(), b"fLaC");
    }

    #[tokio::test]
    async fn test_unresolvable_stream_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FakeCatalog {
            failing: vec!["stream_url"],
            ..FakeCatalog::default()
        };

        let result = download_track(&catalog, &track("1"), dir.path()).await;
        assert!(matches!(result, Err(DownloadError::Resolve(_))));
        assert!(!dir.path().join("1.flac").exists());
    }
}
