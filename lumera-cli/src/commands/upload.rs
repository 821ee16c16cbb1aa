use std::path::PathBuf;

use clap::Args;
use tracing::warn;

use lumera_core::{KindFilter, PhotoSetKind, PhotoSetUpdater};

use crate::login::{self, ConnectArgs};
use crate::sync::engine::split_remote_path;
use crate::sync::local;

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Gallery path receiving the photos, e.g. /Home/Travel/Iceland
    pub gallery_path: String,

    /// Image files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Create the gallery first if it is missing
    #[arg(short = 'c', long)]
    pub create: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

pub async fn run(args: UploadArgs) -> anyhow::Result<()> {
    let connection = login::connect(&args.connect).await?;
    let mut client = connection.client;

    if args.create
        && client
            .resolve(&args.gallery_path, KindFilter::PhotoSet)
            .await?
            .is_none()
    {
        let (parent, title) = split_remote_path(&args.gallery_path, client.delimiter());
        client
            .create_photo_set(&parent, PhotoSetKind::Gallery, PhotoSetUpdater::titled(&title))
            .await?;
        println!("Created gallery {}", args.gallery_path);
    }

    let mut uploaded = 0usize;
    for file in &args.files {
        // An unreadable file should not sink the rest of the batch.
        let photo = match local::inspect_photo(file).await {
            Ok(photo) => photo,
            Err(err) => {
                warn!(file = %file.display(), error = %err, "cannot read, skipping");
                continue;
            }
        };
        let bytes = match tokio::fs::read(file).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(file = %file.display(), error = %err, "cannot read, skipping");
                continue;
            }
        };
        client
            .upload_photo(&args.gallery_path, &photo.file_name, photo.modified, bytes)
            .await?;
        println!("Uploaded {}", photo.file_name);
        uploaded += 1;
    }

    println!("Uploaded {uploaded} of {} files", args.files.len());
    Ok(())
}
