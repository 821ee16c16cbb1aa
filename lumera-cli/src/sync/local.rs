use std::path::{Path, PathBuf};
use std::time::SystemTime;

const IMAGE_EXTENSIONS: &[&str] = &["bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

/// True when the file name carries a known image extension, case-insensitive.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[derive(Debug)]
pub struct DirListing {
    pub subdirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Splits a directory into subdirectories and plain files, each sorted by
/// path so traversal order is stable across runs. Symlinks are ignored.
pub async fn list_dir_sorted(dir: &Path) -> std::io::Result<DirListing> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            subdirs.push(entry.path());
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    subdirs.sort();
    files.sort();
    Ok(DirListing { subdirs, files })
}

#[derive(Debug)]
pub struct LocalPhoto {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: SystemTime,
}

pub async fn inspect_photo(path: &Path) -> std::io::Result<LocalPhoto> {
    let meta = tokio::fs::metadata(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(LocalPhoto {
        path: path.to_path_buf(),
        file_name,
        size: meta.len(),
        modified: meta.modified()?,
    })
}
