//! FTS5 virtual table kept in sync with the `titles` table.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Name of the FTS5 table mirroring `titles`.
pub const SEARCH_TABLE: &str = "title_search";
const TOKENIZER: &str = "unicode61 remove_diacritics 1";

pub(super) fn table_exists(conn: &Connection, kind: &str, name: &str) -> Result<bool> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
        [kind, name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Create the search table and its triggers, back-filling from `titles` when
/// the table is new or its triggers are missing.
pub fn ensure_setup(conn: &Connection) -> Result<()> {
    let has_table = table_exists(conn, "table", SEARCH_TABLE)?;
    let has_triggers = table_exists(conn, "trigger", &format!("{SEARCH_TABLE}_ai"))?;

    if !has_table {
        conn.execute(
            &format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS {SEARCH_TABLE} USING fts5(
                    tconst UNINDEXED,
                    primaryTitle,
                    originalTitle,
                    tokenize='{TOKENIZER}'
                )"
            ),
            [],
        )?;
        info!("Created FTS5 table: {}", SEARCH_TABLE);
    }

    if !has_table || !has_triggers {
        populate(conn)?;
    }

    create_triggers(conn)
}

fn create_triggers(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TRIGGER IF NOT EXISTS {t}_ai AFTER INSERT ON titles BEGIN
            INSERT INTO {t} (tconst, primaryTitle, originalTitle)
            VALUES (NEW.tconst, NEW.primaryTitle, NEW.originalTitle);
        END;
        CREATE TRIGGER IF NOT EXISTS {t}_au AFTER UPDATE ON titles BEGIN
            DELETE FROM {t} WHERE tconst = OLD.tconst;
            INSERT INTO {t} (tconst, primaryTitle, originalTitle)
            VALUES (NEW.tconst, NEW.primaryTitle, NEW.originalTitle);
        END;
        CREATE TRIGGER IF NOT EXISTS {t}_ad AFTER DELETE ON titles BEGIN
            DELETE FROM {t} WHERE tconst = OLD.tconst;
        END;",
        t = SEARCH_TABLE
    ))?;
    debug!("Ensured FTS5 triggers for {}", SEARCH_TABLE);
    Ok(())
}

/// Rebuild the search table contents from `titles`.
pub fn populate(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!("DELETE FROM {SEARCH_TABLE};"))?;
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {SEARCH_TABLE} (tconst, primaryTitle, originalTitle)
             SELECT tconst, primaryTitle, originalTitle FROM titles"
        ),
        [],
    )?;
    info!("Populated {} from {} titles", SEARCH_TABLE, inserted);
    Ok(())
}
