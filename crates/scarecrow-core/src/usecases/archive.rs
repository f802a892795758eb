//! Archive materialization use case
//!
//! Two directions: a tar archive is unpacked into a temporary directory whose
//! tree is then mirrored remotely, or a local directory is packed into a
//! single `<name>.tar` which is uploaded as one file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tempfile::TempDir;
use tracing::{debug, info};

use super::errors::UploadError;
use super::upload_file::UploadOutcome;
use super::walk::{HierarchyWalker, WalkReport};
use crate::domain::{file_name_of, DomainError, RemoteFolder};

/// Leading bytes of a gzip stream
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Use case moving archives between local and remote trees
#[derive(Debug)]
pub struct ArchiveMaterializer {
    walker: HierarchyWalker,
    scratch_dir: Option<PathBuf>,
}

impl ArchiveMaterializer {
    pub fn new(walker: HierarchyWalker) -> Self {
        Self {
            walker,
            scratch_dir: None,
        }
    }

    /// Creates extraction and packing directories below `dir` instead of
    /// the system temporary directory
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn scratch(&self, prefix: &str) -> Result<TempDir, UploadError> {
        let base = self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir);
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&base)
            .map_err(|e| UploadError::local(base, e))
    }

    /// The walker used for extracted trees
    pub fn walker_mut(&mut self) -> &mut HierarchyWalker {
        &mut self.walker
    }

    /// Extracts `archive_path` and uploads the extracted tree into `destination`
    ///
    /// Plain and gzip-compressed tar archives are accepted; the format is
    /// detected from the leading bytes. The extraction directory is removed
    /// when this call returns, whether it succeeds or not.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Archive`] if the archive cannot be read or
    /// unpacked, and any error of the walk.
    pub async fn upload_from_archive(
        &mut self,
        archive_path: &Path,
        destination: &RemoteFolder,
    ) -> Result<WalkReport, UploadError> {
        let extract_dir = self.scratch("scarecrow-extract-")?;

        let source = archive_path.to_path_buf();
        let target = extract_dir.path().to_path_buf();
        tokio::task::spawn_blocking(move || unpack(&source, &target))
            .await
            .map_err(|e| archive_error(archive_path, std::io::Error::other(e)))?
            .map_err(|e| archive_error(archive_path, e))?;
        info!(
            archive = %archive_path.display(),
            into = %extract_dir.path().display(),
            "Extracted archive"
        );

        self.walker
            .walk_and_upload(extract_dir.path(), destination, Path::new(""))
            .await
    }

    /// Packs `local_dir` into `<dirname>.tar` and uploads that single file
    ///
    /// Archive entries are prefixed with the directory's own name. The tar
    /// file is written to a temporary directory removed after the upload.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Archive`] if packing fails, and any error of
    /// the single-file upload.
    pub async fn archive_and_upload(
        &self,
        local_dir: &Path,
        destination: &RemoteFolder,
    ) -> Result<UploadOutcome, UploadError> {
        let local_dir = tokio::fs::canonicalize(local_dir)
            .await
            .map_err(|e| UploadError::local(local_dir, e))?;
        let dir_name = file_name_of(&local_dir)
            .ok_or_else(|| DomainError::InvalidPathSegment(local_dir.display().to_string()))?
            .to_string();

        let work_dir = self.scratch("scarecrow-archive-")?;
        let tar_path = work_dir.path().join(format!("{dir_name}.tar"));

        let (source, target) = (local_dir.clone(), tar_path.clone());
        tokio::task::spawn_blocking(move || pack(&source, &dir_name, &target))
            .await
            .map_err(|e| archive_error(&local_dir, std::io::Error::other(e)))?
            .map_err(|e| archive_error(&local_dir, e))?;
        info!(
            directory = %local_dir.display(),
            archive = %tar_path.display(),
            "Created archive"
        );

        self.walker
            .uploader()
            .upload_or_update(destination, &tar_path)
            .await
    }
}

fn archive_error(path: &Path, source: std::io::Error) -> UploadError {
    UploadError::Archive {
        path: path.to_path_buf(),
        source,
    }
}

/// Unpacks a plain or gzip-compressed tar into `target`
///
/// Entries pointing outside `target` are skipped by the unpacker.
fn unpack(archive_path: &Path, target: &Path) -> std::io::Result<()> {
    let mut file = File::open(archive_path)?;
    let mut magic = [0u8; 2];
    let compressed = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e),
    };
    file.seek(SeekFrom::Start(0))?;
    debug!(archive = %archive_path.display(), compressed, "Unpacking archive");

    let reader = BufReader::new(file);
    if compressed {
        tar::Archive::new(GzDecoder::new(reader)).unpack(target)
    } else {
        tar::Archive::new(reader).unpack(target)
    }
}

/// Writes `source` into a new tar at `target`, entries under `prefix/`
fn pack(source: &Path, prefix: &str, target: &Path) -> std::io::Result<()> {
    let file = File::create(target)?;
    let mut builder = tar::Builder::new(file);
    builder.follow_symlinks(false);
    builder.append_dir_all(prefix, source)?;
    builder.into_inner()?.sync_all()
}
