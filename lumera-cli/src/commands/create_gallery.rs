use clap::Args;

use lumera_core::{PhotoSetKind, PhotoSetUpdater};

use crate::login::{self, ConnectArgs};
use crate::sync::engine::split_remote_path;

use super::slug;

#[derive(Debug, Args)]
pub struct CreateGalleryArgs {
    /// Full path of the new gallery; the parent group must already exist
    pub path: String,

    /// Gallery caption
    #[arg(long)]
    pub caption: Option<String>,

    /// Keyword to attach; repeat the flag for more
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// Explicit reference for the gallery page URL
    #[arg(long)]
    pub custom_url: Option<String>,

    /// Derive the page reference from the parent and title
    #[arg(long, conflicts_with = "custom_url")]
    pub auto_url: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

pub async fn run(args: CreateGalleryArgs) -> anyhow::Result<()> {
    let connection = login::connect(&args.connect).await?;
    let mut client = connection.client;

    let (parent, title) = split_remote_path(&args.path, client.delimiter());
    anyhow::ensure!(!title.is_empty(), "gallery path needs a title segment");

    let custom_reference = if args.auto_url {
        Some(gallery_slug(&parent, &title, client.delimiter()))
    } else {
        args.custom_url.clone()
    };
    let updater = PhotoSetUpdater {
        title: Some(title.clone()),
        caption: args.caption.clone(),
        keywords: (!args.keywords.is_empty()).then(|| args.keywords.clone()),
        categories: None,
        custom_reference,
    };

    let snapshot = client
        .create_photo_set(&parent, PhotoSetKind::Gallery, updater)
        .await?;
    match snapshot.page_url {
        Some(page_url) => println!("Created gallery {title} at {page_url}"),
        None => println!("Created gallery {title}"),
    }
    Ok(())
}

// Auto references read <parent>_<title> so sibling galleries sort together.
fn gallery_slug(parent: &str, title: &str, delimiter: char) -> String {
    let parent_name = parent.rsplit(delimiter).next().unwrap_or("");
    if parent_name.is_empty() {
        slug(title)
    } else {
        format!("{}_{}", slug(parent_name), slug(title))
    }
}

#[cfg(test)]
mod tests {
    use super::gallery_slug;

    #[test]
    fn auto_reference_joins_parent_and_title() {
        assert_eq!(gallery_slug("/Home/Western Trips", "Grand Canyon", '/'), "western-trips_grand-canyon");
        assert_eq!(gallery_slug("/", "Loose Shots", '/'), "loose-shots");
    }
}
