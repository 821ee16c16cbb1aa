pub mod backup;
pub mod create_gallery;
pub mod create_group;
pub mod upload;

/// Lowercased, hyphen-separated form of a title, as the service expects
/// page references to look.
pub(crate) fn slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}
