//! Note record commands

use crate::context::AppContext;
use clap::Args;
use noteai_core::{Note, NoteListQuery, NoteMetaPatch, NoteSort, NoteStatus, SortOrder};
use uuid::Uuid;

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub owner: Uuid,

    /// 1-200 characters
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub content: String,

    /// Tag to attach (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    #[arg(long)]
    pub public: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub note: Uuid,

    #[arg(long)]
    pub owner: Uuid,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub owner: Uuid,

    /// Keep notes carrying any of these tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// draft|published|archived
    #[arg(long)]
    pub status: Option<NoteStatus>,

    /// updated_at|created_at|title
    #[arg(long, default_value = "updated_at")]
    pub sort: NoteSort,

    /// asc|desc
    #[arg(long, default_value = "desc")]
    pub order: SortOrder,

    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub note: Uuid,

    #[arg(long)]
    pub owner: Uuid,

    #[arg(long)]
    pub title: Option<String>,

    /// Replaces the tag set (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Removes every tag
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,

    #[arg(long)]
    pub status: Option<NoteStatus>,

    #[arg(long)]
    pub public: Option<bool>,

    #[arg(long)]
    pub favorite: Option<bool>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub note: Uuid,

    #[arg(long)]
    pub owner: Uuid,
}

pub fn create(ctx: &AppContext, args: CreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let note = ctx.notes.create_note(
        args.owner,
        &args.title,
        args.content,
        &args.tags,
        args.public,
    )?;
    println!("note_id={} version={}", note.id, note.current_version);
    Ok(())
}

pub fn show(ctx: &AppContext, args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let note = ctx.notes.get_note(args.owner, args.note)?;
    print_summary(&note);
    println!("---");
    println!("{}", note.content);
    Ok(())
}

pub fn list(ctx: &AppContext, args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let page = ctx.notes.list_notes(NoteListQuery {
        owner_id: args.owner,
        tags: args.tags,
        status: args.status,
        sort: args.sort,
        order: args.order,
        limit: args.limit,
        offset: args.offset,
    })?;
    for note in &page.items {
        print_summary(note);
    }
    println!("count={} limit={}", page.items.len(), page.applied_limit);
    Ok(())
}

pub fn update(ctx: &AppContext, args: UpdateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let tags = if args.clear_tags {
        Some(Vec::new())
    } else if args.tags.is_empty() {
        None
    } else {
        Some(args.tags)
    };
    let note = ctx.notes.update_note_meta(
        args.owner,
        args.note,
        NoteMetaPatch {
            title: args.title,
            tags,
            status: args.status,
            is_public: args.public,
            is_favorite: args.favorite,
        },
    )?;
    print_summary(&note);
    Ok(())
}

pub fn delete(ctx: &AppContext, args: DeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    ctx.notes.delete_note(args.owner, args.note)?;
    ctx.versioning.cancel_autosave(args.owner, args.note);
    println!("deleted note_id={}", args.note);
    Ok(())
}

fn print_summary(note: &Note) {
    println!(
        "note_id={} version={} title={:?} status={} tags={} public={} favorite={} words={} reading_minutes={} excerpt={}",
        note.id,
        note.current_version,
        note.title,
        note.status,
        note.tags.join(","),
        note.is_public,
        note.is_favorite,
        note.word_count,
        note.reading_minutes,
        note.rendered_text.as_deref().unwrap_or("")
    );
}
