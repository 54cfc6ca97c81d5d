#![allow(dead_code)]

use noteai_core::{
    open_db_in_memory, NewNote, Note, NoteRepository, OwnerId, SharedConnection,
    SqliteNoteRepository, SqliteVersionStore,
};
use std::num::NonZeroUsize;
use uuid::Uuid;

pub struct Fixture {
    pub conn: SharedConnection,
    pub notes: SqliteNoteRepository,
    pub store: SqliteVersionStore,
    pub owner: OwnerId,
}

pub fn fixture(retention_limit: usize) -> Fixture {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    let notes = SqliteNoteRepository::try_new(conn.clone()).unwrap();
    let store =
        SqliteVersionStore::try_new(conn.clone(), NonZeroUsize::new(retention_limit).unwrap())
            .unwrap();
    Fixture {
        conn,
        notes,
        store,
        owner: Uuid::new_v4(),
    }
}

impl Fixture {
    pub fn create_note(&self, content: &str) -> Note {
        self.notes
            .create_note(&NewNote {
                owner_id: self.owner,
                title: "Untitled".to_string(),
                content: content.to_string(),
                tags: Vec::new(),
                is_public: false,
            })
            .unwrap()
    }
}
