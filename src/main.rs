use clap::Parser;
use std::path::PathBuf;
use todo_reminders::{RunOptions, run};

#[derive(Parser, Debug)]
#[command(version, about = "To-do list with desktop reminders")]
struct Cli {
    /// Directory holding config/ and logs/ (defaults to the current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Always show reminders in the terminal instead of desktop notifications
    #[arg(long)]
    no_native_notifications: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let workspace_root = match args.workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    run(RunOptions {
        workspace_root,
        native_notifications: !args.no_native_notifications,
    })
    .await?;
    Ok(())
}
