use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, warn};

use lumera_core::{
    ClientError, GroupUpdater, KindFilter, LoginMethod, LumeraClient, PhotoSetKind,
    PhotoSetSnapshot, PhotoSetUpdater,
};

use super::local::{self, LocalPhoto};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("api call failed: {0}")]
    Client(#[from] ClientError),
    #[error("local io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted { attempts: u32, source: ClientError },
    #[error("re-authentication failed: {0}")]
    Reauth(ClientError),
    #[error("no photo set at {path} after creating it")]
    MissingPhotoSet { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed,
    Interrupted,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncCounters {
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped_non_image: u64,
    pub groups_created: u64,
    pub galleries_created: u64,
    pub retries: u64,
}

impl fmt::Display for SyncCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Created {:5} groups", self.groups_created)?;
        writeln!(f, "Created {:5} galleries", self.galleries_created)?;
        writeln!(f, "Added   {:5} photos", self.added)?;
        writeln!(f, "Updated {:5} photos", self.updated)?;
        writeln!(f, "Skipped {:5} unchanged photos", self.unchanged)?;
        writeln!(f, "Skipped {:5} non-image files", self.skipped_non_image)?;
        write!(f, "Retried {:5} calls", self.retries)
    }
}

/// Splits a remote path into its parent path and final segment.
pub(crate) fn split_remote_path(path: &str, delimiter: char) -> (String, String) {
    match path.rfind(delimiter) {
        Some(0) => (
            delimiter.to_string(),
            path[delimiter.len_utf8()..].to_owned(),
        ),
        Some(idx) => (
            path[..idx].to_owned(),
            path[idx + delimiter.len_utf8()..].to_owned(),
        ),
        None => (String::new(), path.to_owned()),
    }
}

enum RemoteOp<'a> {
    CreateGroup { parent: &'a str, title: &'a str },
    CreateGallery { parent: &'a str, title: &'a str },
    Upload { container: &'a str, photo: &'a LocalPhoto },
    DeletePhoto { photo_id: i64 },
}

impl RemoteOp<'_> {
    fn describe(&self) -> String {
        match self {
            RemoteOp::CreateGroup { parent, title } => {
                format!("create group {title} under {parent}")
            }
            RemoteOp::CreateGallery { parent, title } => {
                format!("create gallery {title} under {parent}")
            }
            RemoteOp::Upload { container, photo } => {
                format!("upload {} to {container}", photo.file_name)
            }
            RemoteOp::DeletePhoto { photo_id } => format!("delete photo {photo_id}"),
        }
    }
}

/// Mirrors a local directory tree onto the remote hierarchy.
///
/// Directories with subdirectories map to groups, directories with image
/// files map to galleries, and each image file becomes a photo keyed by
/// file name. Remote-mutating calls run inside a bounded retry loop that
/// resets the session and logs back in after a dropped connection.
pub struct SyncEngine {
    client: LumeraClient,
    password: String,
    login_method: LoginMethod,
    max_attempts: u32,
    interrupt: Arc<AtomicBool>,
    counters: SyncCounters,
}

impl SyncEngine {
    pub fn new(
        client: LumeraClient,
        password: impl Into<String>,
        login_method: LoginMethod,
    ) -> Self {
        Self {
            client,
            password: password.into(),
            login_method,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interrupt: Arc::new(AtomicBool::new(false)),
            counters: SyncCounters::default(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Shares an interrupt flag with the caller. Once set, the engine stops
    /// before the next directory or file instead of mid-operation.
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn counters(&self) -> &SyncCounters {
        &self.counters
    }

    pub async fn run(
        &mut self,
        local_root: &Path,
        remote_root: &str,
    ) -> Result<SyncOutcome, EngineError> {
        self.counters = SyncCounters::default();
        let delimiter = self.client.delimiter();
        let mut stack = vec![(local_root.to_path_buf(), remote_root.to_owned())];
        while let Some((dir, remote_path)) = stack.pop() {
            if self.interrupted() {
                return Ok(SyncOutcome::Interrupted);
            }
            info!(dir = %dir.display(), remote = %remote_path, "archiving directory");
            let listing = local::list_dir_sorted(&dir).await?;

            if !listing.subdirs.is_empty() {
                self.ensure_group(&remote_path).await?;
            }
            if self.sync_files(&listing.files, &remote_path).await? == SyncOutcome::Interrupted {
                return Ok(SyncOutcome::Interrupted);
            }

            // Pushed in reverse so the stack pops them in sorted order.
            for subdir in listing.subdirs.into_iter().rev() {
                let name = subdir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                stack.push((subdir, format!("{remote_path}{delimiter}{name}")));
            }
        }
        Ok(SyncOutcome::Completed)
    }

    async fn sync_files(
        &mut self,
        files: &[PathBuf],
        remote_path: &str,
    ) -> Result<SyncOutcome, EngineError> {
        let mut photo_set: Option<PhotoSetSnapshot> = None;
        for file in files {
            if self.interrupted() {
                return Ok(SyncOutcome::Interrupted);
            }
            if !local::is_image_file(file) {
                debug!(file = %file.display(), "not an image, skipped");
                self.counters.skipped_non_image += 1;
                continue;
            }
            let photo = local::inspect_photo(file).await?;
            if photo_set.is_none() {
                photo_set = Some(self.ensure_photo_set(remote_path).await?);
            }
            let existing = photo_set
                .as_ref()
                .and_then(|set| set.photo_by_file_name(&photo.file_name))
                .map(|remote| (remote.id, remote.size));
            match existing {
                None => {
                    info!(file = %photo.file_name, set = remote_path, "adding");
                    self.retrying(RemoteOp::Upload { container: remote_path, photo: &photo })
                        .await?;
                    self.counters.added += 1;
                }
                Some((_, size)) if size == photo.size => {
                    debug!(file = %photo.file_name, "unchanged");
                    self.counters.unchanged += 1;
                }
                Some((photo_id, _)) => {
                    info!(file = %photo.file_name, set = remote_path, "updating");
                    self.retrying(RemoteOp::Upload { container: remote_path, photo: &photo })
                        .await?;
                    self.retrying(RemoteOp::DeletePhoto { photo_id }).await?;
                    self.counters.updated += 1;
                }
            }
        }
        Ok(SyncOutcome::Completed)
    }

    async fn ensure_group(&mut self, remote_path: &str) -> Result<(), EngineError> {
        if self
            .client
            .resolve(remote_path, KindFilter::Group)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let (parent, title) = split_remote_path(remote_path, self.client.delimiter());
        info!(path = remote_path, "creating group");
        self.retrying(RemoteOp::CreateGroup { parent: parent.as_str(), title: title.as_str() })
            .await?;
        self.counters.groups_created += 1;
        Ok(())
    }

    async fn ensure_photo_set(
        &mut self,
        remote_path: &str,
    ) -> Result<PhotoSetSnapshot, EngineError> {
        if let Some(set) = self.client.photo_set_at(remote_path).await? {
            return Ok(set);
        }
        let (parent, title) = split_remote_path(remote_path, self.client.delimiter());
        info!(path = remote_path, "creating gallery");
        self.retrying(RemoteOp::CreateGallery { parent: parent.as_str(), title: title.as_str() })
            .await?;
        self.counters.galleries_created += 1;
        self.client
            .photo_set_at(remote_path)
            .await?
            .ok_or_else(|| EngineError::MissingPhotoSet { path: remote_path.to_owned() })
    }

    /// Runs one remote-mutating operation, retrying after dropped
    /// connections. Each retry resets the session and logs back in before
    /// repeating the call.
    async fn retrying(&mut self, op: RemoteOp<'_>) -> Result<(), EngineError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let lost = match self.execute(&op).await {
                Ok(()) => return Ok(()),
                Err(EngineError::Client(err)) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };
            self.counters.retries += 1;
            if attempts >= self.max_attempts {
                return Err(EngineError::RetriesExhausted { attempts, source: lost });
            }
            warn!(
                op = %op.describe(),
                error = %lost,
                attempt = attempts,
                "connection lost, logging in again"
            );
            self.client.reset()?;
            self.client
                .login(&self.password, self.login_method)
                .await
                .map_err(EngineError::Reauth)?;
        }
    }

    async fn execute(&mut self, op: &RemoteOp<'_>) -> Result<(), EngineError> {
        match op {
            RemoteOp::CreateGroup { parent, title } => {
                self.client
                    .create_group(parent, GroupUpdater::titled(*title))
                    .await?;
            }
            RemoteOp::CreateGallery { parent, title } => {
                self.client
                    .create_photo_set(parent, PhotoSetKind::Gallery, PhotoSetUpdater::titled(*title))
                    .await?;
            }
            RemoteOp::Upload { container, photo } => {
                let bytes = tokio::fs::read(&photo.path).await?;
                self.client
                    .upload_photo(container, &photo.file_name, photo.modified, bytes)
                    .await?;
            }
            RemoteOp::DeletePhoto { photo_id } => {
                self.client.delete_photo(*photo_id).await?;
            }
        }
        Ok(())
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }
}
