use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Args;
use tracing::warn;

use crate::login::{self, ConnectArgs};
use crate::sync::engine::{SyncEngine, SyncOutcome};

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Local directory to mirror
    pub local_dir: PathBuf,

    /// Remote group path receiving the mirror, e.g. /Home/Archive
    pub remote_path: String,

    /// Attempts per remote-mutating call before giving up
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

pub async fn run(args: BackupArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.local_dir.is_dir(),
        "{} is not a directory",
        args.local_dir.display()
    );

    let connection = login::connect(&args.connect).await?;

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, finishing the current step...");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let mut engine = SyncEngine::new(connection.client, connection.password, connection.method)
        .with_max_attempts(args.max_attempts)
        .with_interrupt(interrupt);

    let outcome = engine.run(&args.local_dir, &args.remote_path).await;

    println!("Summary:");
    println!("{}", engine.counters());

    match outcome {
        Ok(SyncOutcome::Completed) => Ok(()),
        Ok(SyncOutcome::Interrupted) => {
            warn!("backup interrupted before completion");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
