//! Remote tree entities
//!
//! `RemoteFolder` and `RemoteFile` describe items in the storage service's
//! folder hierarchy. Both are identified remotely by (parent, name); the
//! storage service itself does not enforce that uniqueness.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;

/// A folder in the remote store
///
/// Created lazily by the folder resolver and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    id: RemoteId,
    name: String,
    drive_id: Option<String>,
}

impl RemoteFolder {
    /// Creates folder metadata
    pub fn new(id: RemoteId, name: impl Into<String>, drive_id: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            drive_id,
        }
    }

    /// Storage identifier of the folder
    pub fn id(&self) -> &RemoteId {
        &self.id
    }

    /// Display name of the folder
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the shared drive owning this folder, if any
    pub fn drive_id(&self) -> Option<&str> {
        self.drive_id.as_deref()
    }

    /// Returns a copy that belongs to `drive_id` when this folder has no drive of its own
    ///
    /// Listing and creation responses only carry the fields that were
    /// requested, so children inherit the drive of the folder they were found in.
    #[must_use]
    pub fn inheriting_drive(mut self, drive_id: Option<&str>) -> Self {
        if self.drive_id.is_none() {
            self.drive_id = drive_id.map(str::to_string);
        }
        self
    }
}

impl Display for RemoteFolder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A file in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Storage identifier of the file
    pub id: RemoteId,
    /// File name inside its parent folder
    pub name: String,
    /// Identifier of the containing folder
    pub parent: RemoteId,
}

impl RemoteFile {
    /// Returns true if this metadata was fabricated by a dry run
    pub fn is_synthetic(&self) -> bool {
        self.id.is_synthetic()
    }
}

/// A single file transfer: one local file into one remote folder
///
/// Produced by the hierarchy walker and consumed once by the uploader.
#[derive(Debug, Clone)]
pub struct UploadTask {
    /// The local file to transfer
    pub local_path: PathBuf,
    /// The already-resolved destination folder
    pub destination: RemoteFolder,
}

impl UploadTask {
    /// Creates a new upload task
    pub fn new(local_path: impl Into<PathBuf>, destination: RemoteFolder) -> Self {
        Self {
            local_path: local_path.into(),
            destination,
        }
    }
}

/// What a run uploads, chosen once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// A tar archive whose contents are mirrored as a folder hierarchy
    Archive(PathBuf),
    /// A local directory mirrored file by file
    LocalDirectory {
        /// Root the remote folder structure is computed from
        root: PathBuf,
        /// Directory to upload, relative to `root` (or absolute)
        subdir: PathBuf,
    },
    /// A local directory packed into one tar file and uploaded as a single file
    ArchivedDirectory(PathBuf),
    /// One local file
    SingleFile(PathBuf),
}

impl UploadSource {
    /// The local path this source reads from
    pub fn local_path(&self) -> PathBuf {
        match self {
            Self::Archive(path) | Self::ArchivedDirectory(path) | Self::SingleFile(path) => {
                path.clone()
            }
            Self::LocalDirectory { root, subdir } => {
                if subdir.is_absolute() {
                    subdir.clone()
                } else {
                    root.join(subdir)
                }
            }
        }
    }

    /// Short label used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Archive(_) => "archive",
            Self::LocalDirectory { .. } => "local-directory",
            Self::ArchivedDirectory(_) => "archived-directory",
            Self::SingleFile(_) => "file",
        }
    }
}

/// Returns the final component of `path` as a remote file or folder name
pub fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
