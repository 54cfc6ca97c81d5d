//! Save, auto-save, history and restore commands

use crate::context::AppContext;
use clap::Args;
use noteai_core::{AutoSaveOutcome, SaveError, SaveReceipt};
use uuid::Uuid;

#[derive(Debug, Args)]
pub struct SaveArgs {
    pub note: Uuid,

    #[arg(long)]
    pub owner: Uuid,

    /// Version the edit is based on
    #[arg(long)]
    pub version: u64,

    #[arg(long)]
    pub content: String,
}

#[derive(Debug, Args)]
pub struct AutosaveArgs {
    pub note: Uuid,

    #[arg(long)]
    pub owner: Uuid,

    /// Version the edits are based on
    #[arg(long)]
    pub version: u64,

    /// Successive editor states; each one is scheduled in order
    #[arg(long, required = true, num_args = 1..)]
    pub content: Vec<String>,
}

#[derive(Debug, Args)]
pub struct VersionsArgs {
    pub note: Uuid,

    #[arg(long)]
    pub owner: Uuid,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    pub note: Uuid,

    pub snapshot: Uuid,

    #[arg(long)]
    pub owner: Uuid,

    /// Snapshot the current content before restoring
    #[arg(long)]
    pub backup: bool,
}

pub fn save(ctx: &AppContext, args: SaveArgs) -> Result<(), Box<dyn std::error::Error>> {
    match ctx
        .versioning
        .save_manual(args.owner, args.note, &args.content, args.version)
    {
        Ok(receipt) => {
            print_receipt("saved", &receipt);
            Ok(())
        }
        Err(err) => {
            print_conflict(&err);
            Err(err.into())
        }
    }
}

pub fn autosave(ctx: &AppContext, args: AutosaveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let tickets = args
        .content
        .into_iter()
        .map(|content| {
            ctx.versioning
                .schedule_autosave(args.owner, args.note, content, args.version)
        })
        .collect::<Vec<_>>();

    let mut failure = None;
    for (index, ticket) in tickets.into_iter().enumerate() {
        match ctx.runtime.block_on(ticket.outcome()) {
            AutoSaveOutcome::Committed(receipt) => {
                print_receipt(&format!("edit={index} committed"), &receipt)
            }
            AutoSaveOutcome::Failed(err) => {
                println!("edit={index} failed code={}", err.code());
                print_conflict(&err);
                failure = Some(err);
            }
            AutoSaveOutcome::Superseded => println!("edit={index} superseded"),
            AutoSaveOutcome::Expired => println!("edit={index} expired"),
            AutoSaveOutcome::Cancelled => println!("edit={index} cancelled"),
        }
    }

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

pub fn versions(ctx: &AppContext, args: VersionsArgs) -> Result<(), Box<dyn std::error::Error>> {
    for snapshot in ctx.versioning.list_versions(args.owner, args.note)? {
        println!(
            "snapshot_id={} version={} change_type={} created_at={} content_len={}",
            snapshot.id,
            snapshot.version,
            snapshot.change_type,
            snapshot.created_at,
            snapshot.content.len()
        );
    }
    Ok(())
}

pub fn restore(ctx: &AppContext, args: RestoreArgs) -> Result<(), Box<dyn std::error::Error>> {
    let receipt = ctx
        .versioning
        .restore(args.owner, args.note, args.snapshot, args.backup)?;
    if let Some(backup) = &receipt.backup {
        print_receipt("backup", backup);
    }
    print_receipt("restored", &receipt.restored);
    Ok(())
}

fn print_receipt(label: &str, receipt: &SaveReceipt) {
    println!(
        "{label} note_id={} version={} change_type={} snapshot_id={}",
        receipt.note_id, receipt.version, receipt.change_type, receipt.snapshot_id
    );
}

fn print_conflict(err: &SaveError) {
    if let SaveError::VersionConflict {
        current_version,
        current_content,
        ..
    } = err
    {
        eprintln!("current_version={current_version}");
        eprintln!("current_content={current_content}");
    }
}
