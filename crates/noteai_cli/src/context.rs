//! Shared wiring for every subcommand: config, logging, storage and the
//! versioning manager.

use noteai_core::{
    init_from_config, open_db, AppConfig, NoteService, NoteVersioning, SharedConnection,
    SqliteNoteRepository, SqliteVersionStore,
};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

pub struct ContextOptions {
    pub db: PathBuf,
    pub config: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

pub struct AppContext {
    pub notes: NoteService<SqliteNoteRepository>,
    pub versioning: NoteVersioning,
    // Declared last so pending auto-saves are cancelled before shutdown.
    pub runtime: Runtime,
}

impl AppContext {
    pub fn open(options: ContextOptions) -> Result<Self, Box<dyn Error>> {
        let mut config = match &options.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(dir) = options.log_dir {
            config.logging.dir = Some(dir);
        }
        if let Some(level) = options.log_level {
            config.logging.level = level;
        }
        init_from_config(&config.logging)?;

        if let Some(parent) = options.db.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = SharedConnection::new(open_db(&options.db)?);
        let notes = NoteService::new(SqliteNoteRepository::try_new(conn.clone())?);
        let store = SqliteVersionStore::try_new(conn, config.versioning.retention()?)?;

        let runtime = Runtime::new()?;
        let versioning = NoteVersioning::new(
            Arc::new(store),
            &config.versioning,
            runtime.handle().clone(),
        )?;

        log::debug!(
            "event=cli_context module=cli status=ok db={} retention={} debounce_ms={}",
            options.db.display(),
            config.versioning.retention_limit,
            config.versioning.debounce_window_ms
        );

        Ok(Self {
            notes,
            versioning,
            runtime,
        })
    }
}
