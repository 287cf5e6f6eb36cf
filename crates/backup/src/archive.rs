//! File tree helpers: measuring, copying, hashing and tar.gz packing.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use gaitstore_core::{Error, Result};
use gaitstore_utils::atomic_file::temp_path_for;
use gaitstore_utils::hashing::ContentHasher;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Regular-file count and byte total of a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSize {
    pub files: u64,
    pub bytes: u64,
}

fn walk_error(root: &Path, error: walkdir::Error) -> Error {
    let path = error.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
    Error::file_system(path, "walk backup tree", error.into())
}

/// Regular files under `root` (or `root` itself), sorted by relative path
pub fn regular_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((relative, entry.into_path()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

pub fn measure(root: &Path) -> Result<TreeSize> {
    let mut size = TreeSize::default();
    for (_, path) in regular_files(root)? {
        let metadata =
            fs::metadata(&path).map_err(|e| Error::file_system(&path, "stat backup file", e))?;
        size.files += 1;
        size.bytes += metadata.len();
    }
    Ok(size)
}

/// SHA-256 over the bytes of every file under `root` in relative-path order
pub fn tree_checksum(root: &Path) -> Result<String> {
    let mut hasher = ContentHasher::new();
    for (_, path) in regular_files(root)? {
        hasher.update_file(&path)?;
    }
    Ok(hasher.finalize())
}

/// Copy a file or directory tree to `destination`
pub fn copy_tree(source: &Path, destination: &Path) -> Result<TreeSize> {
    let mut size = TreeSize::default();
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(source, e))?;
        let relative = entry.path().strip_prefix(source).unwrap_or(Path::new(""));
        let target = if relative.as_os_str().is_empty() {
            destination.to_path_buf()
        } else {
            destination.join(relative)
        };

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| Error::file_system(&target, "create backup directory", e))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::file_system(parent, "create backup directory", e))?;
            }
            size.bytes += fs::copy(entry.path(), &target)
                .map_err(|e| Error::file_system(entry.path(), "copy into backup", e))?;
            size.files += 1;
        } else {
            debug!(path = %entry.path().display(), "Skipping non-regular file");
        }
    }
    Ok(size)
}

/// Remove a file or directory if present
pub fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::file_system(path, "stat backup artifact", e)),
    };
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| Error::file_system(path, "remove backup artifact", e))?;
    Ok(true)
}

/// Write a gzip-compressed tarball of `sources`, each rooted at its entry name.
///
/// The archive is staged beside `archive_path` and renamed into place.
pub fn write_archive(archive_path: &Path, sources: &[(String, PathBuf)]) -> Result<()> {
    let staging = temp_path_for(archive_path)?;
    let result = build_archive(&staging, sources).and_then(|()| {
        fs::rename(&staging, archive_path)
            .map_err(|e| Error::file_system(archive_path, "install backup archive", e))
    });
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn build_archive(path: &Path, sources: &[(String, PathBuf)]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::file_system(path, "create archive", e))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    for (name, source) in sources {
        let appended = if source.is_dir() {
            builder.append_dir_all(name, source)
        } else {
            builder.append_path_with_name(source, name)
        };
        appended.map_err(|e| Error::compression(source, "append to archive", e))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::compression(path, "finish tar stream", e))?;
    let file = encoder
        .finish()
        .map_err(|e| Error::compression(path, "finish gzip stream", e))?;
    file.sync_all()
        .map_err(|e| Error::file_system(path, "sync archive", e))
}

/// Unpack a tar.gz archive into `destination`
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)
        .map_err(|e| Error::file_system(destination, "create restore destination", e))?;
    let file = File::open(archive_path)
        .map_err(|e| Error::file_system(archive_path, "open archive", e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .unpack(destination)
        .map_err(|e| Error::compression(archive_path, "extract archive", e))
}

/// Top-level entry names of a tar.gz archive
pub fn archive_entries(archive_path: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path)
        .map_err(|e| Error::file_system(archive_path, "open archive", e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let entries = archive
        .entries()
        .map_err(|e| Error::compression(archive_path, "read archive", e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::compression(archive_path, "read archive entry", e))?;
        let path = entry
            .path()
            .map_err(|e| Error::compression(archive_path, "read archive entry path", e))?;
        if let Some(first) = path.components().next() {
            let name = first.as_os_str().to_string_lossy().into_owned();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}
