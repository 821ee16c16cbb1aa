use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::hierarchy::{HierarchyNode, KindFilter};
use crate::session::{ApiError, LoginMethod, Session};

pub const DEFAULT_DELIMITER: char = '/';

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("api call failed: {0}")]
    Api(#[from] ApiError),
    #[error("no group at {path}")]
    GroupNotFound { path: String },
    #[error("no photo container at {path}")]
    ContainerNotFound { path: String },
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Api(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Typed operations over one session, plus the cached hierarchy snapshot
/// that backs path resolution. The cache loads on first use and is dropped
/// after every create call, so the next resolve refetches a tree that
/// includes the new container.
pub struct LumeraClient {
    session: Session,
    hierarchy: Option<HierarchyNode>,
    delimiter: char,
}

impl LumeraClient {
    pub fn new(username: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self::from_session(Session::new(username)?))
    }

    pub fn with_base_url(base_url: &str, username: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self::from_session(Session::with_base_url(
            base_url, username,
        )?))
    }

    pub fn from_session(session: Session) -> Self {
        Self {
            session,
            hierarchy: None,
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn username(&self) -> &str {
        self.session.username()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn login(&mut self, password: &str, method: LoginMethod) -> Result<(), ClientError> {
        Ok(self.session.login(password, method).await?)
    }

    /// Back to a closed session on a fresh connection. The cached hierarchy
    /// survives; it describes the account, not the connection.
    pub fn reset(&mut self) -> Result<(), ClientError> {
        Ok(self.session.reset()?)
    }

    pub fn invalidate_hierarchy(&mut self) {
        self.hierarchy = None;
    }

    pub async fn resolve(
        &mut self,
        path: &str,
        filter: KindFilter,
    ) -> Result<Option<HierarchyNode>, ClientError> {
        self.ensure_hierarchy().await?;
        Ok(self
            .hierarchy
            .as_ref()
            .and_then(|root| root.resolve(path, self.delimiter, filter))
            .cloned())
    }

    pub async fn load_photo_set(
        &mut self,
        id: i64,
        level: InformationLevel,
        include_photos: bool,
    ) -> Result<PhotoSetSnapshot, ClientError> {
        let envelope = self
            .session
            .call(
                "LoadPhotoSet",
                vec![json!(id), json!(level.as_str()), json!(include_photos)],
            )
            .await?;
        Ok(serde_json::from_value(envelope.into_result()?).map_err(ApiError::from)?)
    }

    /// The photo set at a title path, loaded with its photo listing, or None
    /// when the path does not lead to one.
    pub async fn photo_set_at(&mut self, path: &str) -> Result<Option<PhotoSetSnapshot>, ClientError> {
        let Some(node) = self.resolve(path, KindFilter::PhotoSet).await? else {
            return Ok(None);
        };
        Ok(Some(
            self.load_photo_set(node.id, InformationLevel::Level2, true)
                .await?,
        ))
    }

    pub async fn create_group(
        &mut self,
        parent_path: &str,
        updater: GroupUpdater,
    ) -> Result<HierarchyNode, ClientError> {
        let parent = self
            .resolve(parent_path, KindFilter::Group)
            .await?
            .ok_or_else(|| ClientError::GroupNotFound {
                path: parent_path.to_owned(),
            })?;
        debug!(parent = parent_path, "create group");
        let params = vec![json!(parent.id), serde_json::to_value(&updater).map_err(ApiError::from)?];
        let outcome = self.session.call("CreateGroup", params).await;
        self.hierarchy = None;
        let envelope = outcome?;
        Ok(serde_json::from_value(envelope.into_result()?).map_err(ApiError::from)?)
    }

    pub async fn create_photo_set(
        &mut self,
        parent_path: &str,
        kind: PhotoSetKind,
        updater: PhotoSetUpdater,
    ) -> Result<PhotoSetSnapshot, ClientError> {
        let parent = self
            .resolve(parent_path, KindFilter::Group)
            .await?
            .ok_or_else(|| ClientError::GroupNotFound {
                path: parent_path.to_owned(),
            })?;
        debug!(parent = parent_path, kind = kind.as_str(), "create photo set");
        let params = vec![
            json!(parent.id),
            json!(kind.as_str()),
            serde_json::to_value(&updater).map_err(ApiError::from)?,
        ];
        let outcome = self.session.call("CreatePhotoSet", params).await;
        self.hierarchy = None;
        let envelope = outcome?;
        Ok(serde_json::from_value(envelope.into_result()?).map_err(ApiError::from)?)
    }

    pub async fn delete_photo(&mut self, photo_id: i64) -> Result<bool, ClientError> {
        let envelope = self.session.call("DeletePhoto", vec![json!(photo_id)]).await?;
        Ok(serde_json::from_value(envelope.into_result()?).map_err(ApiError::from)?)
    }

    /// Resolves the photo set at `container_path` and sends the bytes to its
    /// upload URL. Unlike the sync engine, which creates missing containers,
    /// this fails when the path or its upload URL is absent.
    pub async fn upload_photo(
        &mut self,
        container_path: &str,
        file_name: &str,
        modified: SystemTime,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        let Some(node) = self.resolve(container_path, KindFilter::PhotoSet).await? else {
            return Err(ClientError::ContainerNotFound {
                path: container_path.to_owned(),
            });
        };
        let Some(upload_url) = node.upload_url else {
            return Err(ClientError::ContainerNotFound {
                path: container_path.to_owned(),
            });
        };
        Ok(self
            .session
            .upload(&upload_url, file_name, modified, bytes)
            .await?)
    }

    async fn ensure_hierarchy(&mut self) -> Result<(), ClientError> {
        if self.hierarchy.is_some() {
            return Ok(());
        }
        debug!(username = self.session.username(), "load group hierarchy");
        let envelope = self
            .session
            .call("LoadGroupHierarchy", vec![json!(self.session.username())])
            .await?;
        let root: HierarchyNode =
            serde_json::from_value(envelope.into_result()?).map_err(ApiError::from)?;
        self.hierarchy = Some(root);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformationLevel {
    Level1,
    Level2,
    Full,
}

impl InformationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            InformationLevel::Level1 => "Level1",
            InformationLevel::Level2 => "Level2",
            InformationLevel::Full => "Full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSetKind {
    Gallery,
    Collection,
}

impl PhotoSetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoSetKind::Gallery => "Gallery",
            PhotoSetKind::Collection => "Collection",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Photo {
    pub id: i64,
    pub file_name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhotoSetSnapshot {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

impl PhotoSetSnapshot {
    pub fn photo_by_file_name(&self, file_name: &str) -> Option<&Photo> {
        self.photos.iter().find(|photo| photo.file_name == file_name)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhotoSetUpdater {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_reference: Option<String>,
}

impl PhotoSetUpdater {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupUpdater {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_reference: Option<String>,
}

impl GroupUpdater {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}
