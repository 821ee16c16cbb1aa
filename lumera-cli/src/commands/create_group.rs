use clap::Args;

use lumera_core::GroupUpdater;

use crate::login::{self, ConnectArgs};
use crate::sync::engine::split_remote_path;

use super::slug;

#[derive(Debug, Args)]
pub struct CreateGroupArgs {
    /// Full path of the new group; the parent group must already exist
    pub path: String,

    /// Group caption
    #[arg(long)]
    pub caption: Option<String>,

    /// Explicit reference for the group page URL
    #[arg(long)]
    pub custom_url: Option<String>,

    /// Derive the page reference from the title
    #[arg(long, conflicts_with = "custom_url")]
    pub auto_url: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

pub async fn run(args: CreateGroupArgs) -> anyhow::Result<()> {
    let connection = login::connect(&args.connect).await?;
    let mut client = connection.client;

    let (parent, title) = split_remote_path(&args.path, client.delimiter());
    anyhow::ensure!(!title.is_empty(), "group path needs a title segment");

    let custom_reference = if args.auto_url {
        Some(slug(&title))
    } else {
        args.custom_url.clone()
    };
    let updater = GroupUpdater {
        title: Some(title.clone()),
        caption: args.caption.clone(),
        custom_reference,
    };

    let node = client.create_group(&parent, updater).await?;
    match node.page_url {
        Some(page_url) => println!("Created group {title} at {page_url}"),
        None => println!("Created group {title}"),
    }
    Ok(())
}
