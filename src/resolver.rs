//! Maps local paths inside the Dropbox folder to share links, concurrently.

use std::fs;
use std::path::{Component, Path, PathBuf};

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, error};
use url::Url;

use crate::client::DropboxClient;
use crate::error::{LinkError, Result};
use crate::models::{AccountKind, DropboxInfo, PendingUpload};
use crate::query::{apply_plus_for_space, QuerySpec};

/// Default number of links resolved concurrently.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Candidate locations of the desktop client's `info.json`, most likely first.
pub fn info_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".dropbox").join("info.json"));
    }
    for dir in [dirs::data_dir(), dirs::data_local_dir()].into_iter().flatten() {
        let candidate = dir.join("Dropbox").join("info.json");
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Find the local Dropbox folder for `kind`.
///
/// Reads `info_file` if given, otherwise the first existing candidate location.
pub fn locate_dropbox_folder(info_file: Option<&Path>, kind: AccountKind) -> Result<PathBuf> {
    let path = match info_file {
        Some(path) => path.to_path_buf(),
        None => info_file_candidates()
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| {
                LinkError::LocalRootLookupError("no Dropbox info.json found".to_string())
            })?,
    };

    let content = fs::read_to_string(&path).map_err(|e| {
        LinkError::LocalRootLookupError(format!("{}: {}", path.display(), e))
    })?;
    let info: DropboxInfo = serde_json::from_str(&content).map_err(|e| {
        LinkError::LocalRootLookupError(format!("{}: {}", path.display(), e))
    })?;

    let entry = info.get(kind.as_str()).ok_or_else(|| {
        LinkError::LocalRootLookupError(format!(
            "no {} account listed in {}",
            kind,
            path.display()
        ))
    })?;

    debug!("Dropbox folder for {} account: {}", kind, entry.path.display());
    Ok(entry.path.clone())
}

/// A local path and the share link produced for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub source_path: PathBuf,
    pub remote_path: String,
    pub url: Url,
}

/// Resolves local paths to share links through a bounded number of concurrent requests.
pub struct LinkResolver<'a> {
    client: &'a DropboxClient,
    local_root: PathBuf,
    query: QuerySpec,
    plus_for_space: bool,
    pool_size: usize,
}

impl<'a> LinkResolver<'a> {
    /// Create a resolver for files under `local_root`.
    ///
    /// The root is canonicalized so it compares equal to canonicalized inputs.
    pub fn new<P: AsRef<Path>>(client: &'a DropboxClient, local_root: P) -> Result<Self> {
        let root = local_root.as_ref();
        let local_root = fs::canonicalize(root).map_err(|e| {
            LinkError::LocalRootLookupError(format!("{}: {}", root.display(), e))
        })?;

        Ok(Self {
            client,
            local_root,
            query: QuerySpec::default(),
            plus_for_space: false,
            pool_size: DEFAULT_POOL_SIZE,
        })
    }

    pub fn with_query(mut self, query: QuerySpec) -> Self {
        self.query = query;
        self
    }

    pub fn with_plus_for_space(mut self, enabled: bool) -> Self {
        self.plus_for_space = enabled;
        self
    }

    /// Set the worker pool size. Zero is treated as one.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// Dropbox path (`/a/b.txt`) of an already canonical local path.
    pub fn remote_path(&self, canonical: &Path) -> Result<String> {
        let relative = canonical
            .strip_prefix(&self.local_root)
            .map_err(|_| LinkError::PathOutsideRoot {
                path: canonical.to_path_buf(),
                root: self.local_root.clone(),
            })?;

        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        Ok(format!("/{}", parts.join("/")))
    }

    /// Resolve one local path to its share link.
    pub async fn resolve(&self, path: &str) -> Result<ResolvedLink> {
        let source_path = PathBuf::from(path);
        let canonical = tokio::fs::canonicalize(&source_path).await.map_err(|e| {
            LinkError::PathResolveError {
                path: source_path.clone(),
                source: e,
            }
        })?;
        debug!("Processing file at path {}", canonical.display());

        let remote_path = self.remote_path(&canonical)?;
        let metadata = tokio::fs::metadata(&canonical).await.map_err(|e| {
            LinkError::PathResolveError {
                path: source_path.clone(),
                source: e,
            }
        })?;
        let pending_upload = if metadata.is_dir() {
            PendingUpload::Folder
        } else {
            PendingUpload::File
        };

        let link = self
            .client
            .create_shared_link(&remote_path, pending_upload)
            .await?;
        debug!("Dropbox returned {} for {}", link, remote_path);

        let mut url = self.query.merge(&link);
        if self.plus_for_space {
            url = apply_plus_for_space(&url);
        }

        Ok(ResolvedLink {
            source_path,
            remote_path,
            url,
        })
    }

    /// Resolve every path, returning links in input order.
    ///
    /// The first failure ends the batch: in-flight requests are dropped and no
    /// partial result is returned.
    pub async fn resolve_batch(&self, paths: &[String]) -> Result<Vec<ResolvedLink>> {
        let mut indexed: Vec<(usize, ResolvedLink)> = stream::iter(paths.iter().enumerate())
            .map(|(index, path)| async move {
                match self.resolve(path).await {
                    Ok(link) => Ok((index, link)),
                    Err(e) => {
                        error!("Failed to get link for {}: {}", path, e);
                        Err(e)
                    }
                }
            })
            .buffer_unordered(self.pool_size)
            .try_collect()
            .await?;

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, link)| link).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remote_path_inside_root() {
        let root = TempDir::new().unwrap();
        let client = DropboxClient::new("token".to_string());
        let resolver = LinkResolver::new(&client, root.path()).unwrap();

        let inside = resolver.local_root().join("docs").join("report.pdf");
        assert_eq!(resolver.remote_path(&inside).unwrap(), "/docs/report.pdf");
    }

    #[test]
    fn test_remote_path_outside_root() {
        let root = TempDir::new().unwrap();
        let client = DropboxClient::new("token".to_string());
        let resolver = LinkResolver::new(&client, root.path()).unwrap();

        let err = resolver
            .remote_path(Path::new("/definitely/not/in/dropbox.txt"))
            .unwrap_err();
        assert!(matches!(err, LinkError::PathOutsideRoot { .. }));
        assert!(err.to_string().contains("/definitely/not/in/dropbox.txt"));
    }

    #[test]
    fn test_pool_size_clamped() {
        let root = TempDir::new().unwrap();
        let client = DropboxClient::new("token".to_string());
        let resolver = LinkResolver::new(&client, root.path())
            .unwrap()
            .with_pool_size(0);
        assert_eq!(resolver.pool_size, 1);
    }

    #[test]
    fn test_missing_root_is_lookup_error() {
        let client = DropboxClient::new("token".to_string());
        let err = LinkResolver::new(&client, "/no/such/dropbox/root").err().unwrap();
        assert!(matches!(err, LinkError::LocalRootLookupError(_)));
    }

    #[test]
    fn test_locate_dropbox_folder_from_info_file() {
        let dir = TempDir::new().unwrap();
        let info = dir.path().join("info.json");
        fs::write(
            &info,
            r#"{"personal": {"path": "/home/u/Dropbox", "host": 123, "is_team": false}}"#,
        )
        .unwrap();

        let root = locate_dropbox_folder(Some(&info), AccountKind::Personal).unwrap();
        assert_eq!(root, PathBuf::from("/home/u/Dropbox"));

        let err = locate_dropbox_folder(Some(&info), AccountKind::Business).unwrap_err();
        assert!(matches!(err, LinkError::LocalRootLookupError(_)));
    }

    #[test]
    fn test_locate_dropbox_folder_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = locate_dropbox_folder(Some(&dir.path().join("absent.json")), AccountKind::Personal)
            .unwrap_err();
        assert!(matches!(err, LinkError::LocalRootLookupError(_)));
    }
}
