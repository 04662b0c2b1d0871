use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Who a stored recording belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Workspace(u64),
    User(String),
}

/// Resolved destination directory of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    /// Absolute directory the encoded file is copied into
    pub dir: PathBuf,
    /// Storage-relative prefix of the hashed name (`WORKSPACE_<id>` or `<username>`)
    pub hash_prefix: String,
}

impl StorageTarget {
    /// Storage-relative path recorded in the descriptor
    pub fn hash_name(&self, file_name: &str) -> String {
        format!("{}/{}", self.hash_prefix, file_name)
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Create the directory if absent; a concurrent creator is not an error
    pub async fn ensure(&self) -> io::Result<()> {
        match tokio::fs::create_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Storage directory already exists: {}", self.dir.display());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Filesystem roots used by ingestion
#[derive(Debug, Clone)]
pub struct StorageLayout {
    files_dir: PathBuf,
    workspaces_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(files_dir: PathBuf, workspaces_dir: PathBuf, uploads_dir: PathBuf) -> Self {
        Self {
            files_dir,
            workspaces_dir,
            uploads_dir,
        }
    }

    /// Shared temporary holding area
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn resolve(&self, owner: &Owner) -> Result<StorageTarget, String> {
        match owner {
            Owner::Workspace(id) => {
                let prefix = format!("WORKSPACE_{}", id);
                Ok(StorageTarget {
                    dir: self.workspaces_dir.join(&prefix),
                    hash_prefix: prefix,
                })
            }
            Owner::User(username) => {
                if !is_single_component(username) {
                    return Err(format!("invalid username '{}'", username));
                }
                Ok(StorageTarget {
                    dir: self.files_dir.join(username),
                    hash_prefix: username.clone(),
                })
            }
        }
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
