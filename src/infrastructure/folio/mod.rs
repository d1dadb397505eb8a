mod sqlite_journal_store;

pub use sqlite_journal_store::SqliteJournalStore;
