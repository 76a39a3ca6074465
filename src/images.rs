//! On-disk image cache for cover art and artist pictures.
//!
//! Images are stored as `{dir}/{entity_id}.jpg` and live until the
//! directory is reset at startup or shutdown. There is no eviction and no
//! de-duplication of concurrent fetches for the same id.

use std::path::{Path, PathBuf};

use color_eyre::eyre::eyre;
use color_eyre::Result;
use reqwest::Client;

#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
    http: Client,
}

impl ImageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            http: Client::new(),
        }
    }

    /// Where the image of `entity_id` is (or would be) stored.
    pub fn path_for(&self, entity_id: &str) -> PathBuf {
        self.dir.join(format!("{entity_id}.jpg"))
    }

    /// Remove and recreate the cache directory. Failures are logged only.
    pub fn reset(&self) {
        if self.dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                tracing::warn!("Could not clear image cache {}: {}", self.dir.display(), e);
            }
        }
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!("Could not create image cache {}: {}", self.dir.display(), e);
        }
    }

    /// Return the cached image of `entity_id`, downloading it on a miss.
    ///
    /// `url_provider` is only called on a miss. Any failure yields `None`
    /// so the caller keeps its placeholder.
    pub async fn fetch<F>(&self, entity_id: &str, url_provider: F) -> Option<PathBuf>
    where
        F: FnOnce() -> Option<String>,
    {
        let path = self.path_for(entity_id);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some(path);
        }

        let url = url_provider()?;
        match self.download(&url, &path).await {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!("Image {} unavailable: {}", entity_id, e);
                None
            }
        }
    }

    async fn download(&self, url: &str, path: &Path) -> Result<()> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(eyre!("{} returned {}", url, response.status()));
        }
        let bytes = response.bytes().await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;
        tracing::debug!("Cached image {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve `body` once over HTTP on localhost and return its URL.
    pub(crate) async fn serve_once(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_hit_does_not_call_provider() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path());
        std::fs::write(cache.path_for("42"), b"jpeg").unwrap();

        let path = cache
            .fetch("42", || panic!("provider must not run on a hit"))
            .await;
        assert_eq!(path, Some(dir.path().join("42.jpg")));
    }

    #[tokio::test]
    async fn test_miss_downloads_and_stores() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path().join("img"));
        let url = serve_once(b"cover-bytes").await;

        let path = cache.fetch("7", || Some(format!("{url}/7.jpg"))).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"cover-bytes");
    }

    #[tokio::test]
    async fn test_network_failure_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path());

        let path = cache
            .fetch("9", || Some(String::from("http://127.0.0.1:9/none.jpg")))
            .await;
        assert_eq!(path, None);
        assert!(!cache.path_for("9").exists());

        assert_eq!(cache.fetch("9", || None).await, None);
    }

    #[test]
    fn test_reset_empties_directory() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("tmp_img");
        let cache = ImageCache::new(&scratch);
        cache.reset();
        std::fs::write(cache.path_for("1"), b"x").unwrap();

        cache.reset();
        assert!(scratch.exists());
        assert!(!cache.path_for("1").exists());
    }
}
