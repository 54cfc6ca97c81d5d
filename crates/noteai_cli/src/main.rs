//! NoteAI CLI
//!
//! Command-line front end over `noteai_core` note versioning.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod context;

#[derive(Debug, Parser)]
#[command(name = "noteai")]
#[command(about = "NoteAI - versioned notes with debounced auto-save", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "noteai.db")]
    db: PathBuf,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files (overrides config)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a note (committed as version 1)
    Create(commands::note::CreateArgs),
    /// Show one note
    Show(commands::note::ShowArgs),
    /// List an owner's notes with tag/status filters and sorting
    List(commands::note::ListArgs),
    /// Change title, tags, status or flags (no new version)
    Update(commands::note::UpdateArgs),
    /// Soft-delete a note
    Delete(commands::note::DeleteArgs),
    /// Manual save with version check
    Save(commands::version::SaveArgs),
    /// Debounced auto-save of successive edits
    Autosave(commands::version::AutosaveArgs),
    /// List retained versions, newest first
    Versions(commands::version::VersionsArgs),
    /// Restore a snapshot as a new version
    Restore(commands::version::RestoreArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = context::AppContext::open(context::ContextOptions {
        db: cli.db,
        config: cli.config,
        log_dir: cli.log_dir,
        log_level: cli.log_level,
    })
    .and_then(|ctx| match cli.command {
        Commands::Create(args) => commands::note::create(&ctx, args),
        Commands::Show(args) => commands::note::show(&ctx, args),
        Commands::List(args) => commands::note::list(&ctx, args),
        Commands::Update(args) => commands::note::update(&ctx, args),
        Commands::Delete(args) => commands::note::delete(&ctx, args),
        Commands::Save(args) => commands::version::save(&ctx, args),
        Commands::Autosave(args) => commands::version::autosave(&ctx, args),
        Commands::Versions(args) => commands::version::versions(&ctx, args),
        Commands::Restore(args) => commands::version::restore(&ctx, args),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
