//! SQLite title index shaped like IMDb's `title.basics` dataset.
//!
//! Titles are searched through an FTS5 prefix query and a LIKE substring
//! query; the results are merged and de-duplicated. Importing from the IMDb
//! TSV dump is the only write path and is driven from the CLI; scanning opens
//! the index read-only.

mod fts;
mod query;

pub use query::{build_fts5_query, build_like_pattern};

use super::TitleCatalog;
use crate::error::{Result, ScanlyError};
use crate::models::{MatchSource, MetadataMatch, TitleKind};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// IMDb `titleType` values treated as movies.
const MOVIE_TYPES: &[&str] = &["movie", "tvMovie", "video", "short", "tvSpecial"];
/// IMDb `titleType` values treated as shows.
const SHOW_TYPES: &[&str] = &["tvSeries", "tvMiniSeries", "tvEpisode", "tvShort"];

/// Map an IMDb `titleType` to a title kind.
pub fn title_kind(title_type: &str) -> Option<TitleKind> {
    if MOVIE_TYPES.contains(&title_type) {
        Some(TitleKind::Movie)
    } else if SHOW_TYPES.contains(&title_type) {
        Some(TitleKind::Show)
    } else {
        None
    }
}

/// A row in the `titles` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRecord {
    pub tconst: String,
    pub primary_title: String,
    pub original_title: Option<String>,
    pub start_year: Option<i32>,
    pub title_type: String,
    pub is_adult: bool,
}

impl TitleRecord {
    /// Parse one data line of `title.basics.tsv`.
    ///
    /// Columns: tconst, titleType, primaryTitle, originalTitle, isAdult,
    /// startYear, ... ; `\N` marks a missing value.
    pub fn from_tsv_line(line: &str) -> Option<Self> {
        let mut cols = line.split('\t');
        let tconst = cols.next()?.to_string();
        let title_type = cols.next()?.to_string();
        let primary_title = cols.next()?.to_string();
        let original_title = cols.next().and_then(not_null).map(str::to_string);
        let is_adult = cols.next().and_then(not_null).map(|v| v == "1").unwrap_or(false);
        let start_year = cols.next().and_then(not_null).and_then(|v| v.parse().ok());

        if tconst.is_empty() || primary_title.is_empty() || primary_title == "\\N" {
            return None;
        }

        Some(Self {
            tconst,
            primary_title,
            original_title,
            start_year,
            title_type,
            is_adult,
        })
    }
}

fn not_null(value: &str) -> Option<&str> {
    if value == "\\N" || value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// One search hit before it is mapped to a [`MetadataMatch`].
struct TitleRow {
    tconst: String,
    primary_title: String,
    original_title: Option<String>,
    start_year: Option<i32>,
    title_type: String,
}

impl TitleRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            tconst: row.get(0)?,
            primary_title: row.get(1)?,
            original_title: row.get(2)?,
            start_year: row.get(3)?,
            title_type: row.get(4)?,
        })
    }

    fn into_match(self) -> Option<MetadataMatch> {
        let kind = title_kind(&self.title_type)?;
        let original_title = self
            .original_title
            .filter(|t| !t.trim().is_empty() && *t != self.primary_title);
        Some(MetadataMatch {
            provider_id: self.tconst,
            title: self.primary_title,
            original_title,
            year: self.start_year,
            kind,
            source: MatchSource::LocalCache,
            popularity: None,
        })
    }
}

/// SQLite title index with FTS5 support.
///
/// [`TitleIndex::new`] creates and maintains the index for imports.
/// [`TitleIndex::open_read_only`] is used while scanning and never writes.
#[derive(Clone)]
pub struct TitleIndex {
    db_path: PathBuf,
    conn: Arc<Mutex<Connection>>,
    has_search_table: bool,
}

impl TitleIndex {
    /// Create or open a writable title index at the given path.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ScanlyError::io_with_path(e, parent))?;
        }

        let conn = Connection::open(&db_path)?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;
        fts::ensure_setup(&conn)?;

        debug!("Opened title index at {}", db_path.display());
        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
            has_search_table: true,
        })
    }

    /// Open an existing title index without modifying it.
    ///
    /// A missing file or a database without a `titles` table is a
    /// configuration error. Without the FTS5 table, searches use LIKE only.
    pub fn open_read_only(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if !db_path.is_file() {
            return Err(ScanlyError::config(format!(
                "IMDB_DB_PATH {} does not exist",
                db_path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(30))?;

        if !fts::table_exists(&conn, "table", "titles")? {
            return Err(ScanlyError::config(format!(
                "{} has no titles table",
                db_path.display()
            )));
        }
        let has_search_table = fts::table_exists(&conn, "table", fts::SEARCH_TABLE)?;
        if !has_search_table {
            info!(
                "{} has no {} table, using substring search only",
                db_path.display(),
                fts::SEARCH_TABLE
            );
        }

        debug!("Opened title index read-only at {}", db_path.display());
        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
            has_search_table,
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS titles (
                tconst TEXT PRIMARY KEY,
                primaryTitle TEXT NOT NULL,
                originalTitle TEXT,
                startYear INTEGER,
                titleType TEXT NOT NULL,
                isAdult INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_titles_year ON titles(startYear);",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ScanlyError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert or replace a title.
    pub fn upsert(&self, record: &TitleRecord) -> Result<()> {
        let conn = self.lock()?;
        Self::upsert_with(&conn, record)?;
        Ok(())
    }

    fn upsert_with(conn: &Connection, record: &TitleRecord) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO titles (tconst, primaryTitle, originalTitle, startYear, titleType, isAdult)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(tconst) DO UPDATE SET
                primaryTitle = excluded.primaryTitle,
                originalTitle = excluded.originalTitle,
                startYear = excluded.startYear,
                titleType = excluded.titleType,
                isAdult = excluded.isAdult",
            params![
                record.tconst,
                record.primary_title,
                record.original_title,
                record.start_year,
                record.title_type,
                record.is_adult as i32,
            ],
        )
    }

    /// Import an IMDb `title.basics.tsv` file.
    ///
    /// Adult titles and title types that are neither movies nor shows are
    /// skipped. Returns the number of rows written.
    pub fn import_tsv(&self, path: &Path) -> Result<usize> {
        let file = File::open(path).map_err(|e| ScanlyError::io_with_path(e, path))?;
        let reader = BufReader::new(file);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut imported = 0usize;
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| ScanlyError::io_with_path(e, path))?;
            if line_no == 0 && line.starts_with("tconst") {
                continue;
            }
            match TitleRecord::from_tsv_line(&line) {
                Some(record) if !record.is_adult && title_kind(&record.title_type).is_some() => {
                    Self::upsert_with(&tx, &record)?;
                    imported += 1;
                }
                Some(_) => skipped += 1,
                None => {
                    warn!("Skipping malformed line {} in {}", line_no + 1, path.display());
                    skipped += 1;
                }
            }
        }

        tx.commit()?;
        info!(
            "Imported {} titles from {} ({} skipped)",
            imported,
            path.display(),
            skipped
        );
        Ok(imported)
    }

    /// Number of titles in the index.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM titles", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn order_clause(year: Option<i32>) -> String {
        match year {
            Some(y) => format!(
                "ORDER BY ABS(COALESCE(CAST(t.startYear AS INTEGER), 0) - {y}) ASC, \
                 t.startYear DESC"
            ),
            None => "ORDER BY t.startYear DESC".to_string(),
        }
    }

    fn type_filter() -> String {
        let all: Vec<String> = MOVIE_TYPES
            .iter()
            .chain(SHOW_TYPES)
            .map(|t| format!("'{t}'"))
            .collect();
        format!(
            "COALESCE(t.isAdult, 0) = 0 AND t.titleType IN ({})",
            all.join(",")
        )
    }

    fn collect_rows(stmt: &mut rusqlite::Statement<'_>, param: &str) -> Result<Vec<TitleRow>> {
        let rows = stmt.query_map([param], TitleRow::from_row)?;
        let results = rows
            .filter_map(|r| r.map_err(|e| warn!("Error reading title row: {}", e)).ok())
            .collect();
        Ok(results)
    }

    fn search_fts5(
        conn: &Connection,
        fts_query: &str,
        year: Option<i32>,
        limit: usize,
    ) -> Result<Vec<TitleRow>> {
        let sql = format!(
            "SELECT t.tconst, t.primaryTitle, t.originalTitle,
                    CAST(t.startYear AS INTEGER), t.titleType
             FROM {table} s JOIN titles t ON s.tconst = t.tconst
             WHERE {table} MATCH ?1 AND {filter}
             {order} LIMIT {limit}",
            table = fts::SEARCH_TABLE,
            filter = Self::type_filter(),
            order = Self::order_clause(year),
        );
        let mut stmt = conn.prepare(&sql)?;
        Self::collect_rows(&mut stmt, fts_query)
    }

    fn search_like(
        conn: &Connection,
        pattern: &str,
        year: Option<i32>,
        limit: usize,
    ) -> Result<Vec<TitleRow>> {
        let sql = format!(
            "SELECT t.tconst, t.primaryTitle, t.originalTitle,
                    CAST(t.startYear AS INTEGER), t.titleType
             FROM titles t
             WHERE (t.primaryTitle LIKE ?1 ESCAPE '\\' OR t.originalTitle LIKE ?1 ESCAPE '\\')
               AND {filter}
             {order} LIMIT {limit}",
            filter = Self::type_filter(),
            order = Self::order_clause(year),
        );
        let mut stmt = conn.prepare(&sql)?;
        Self::collect_rows(&mut stmt, pattern)
    }
}

impl TitleCatalog for TitleIndex {
    fn search(&self, title: &str, year: Option<i32>, limit: usize) -> Result<Vec<MetadataMatch>> {
        let title = title.trim();
        if title.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let prefix_hits = if self.has_search_table {
            match Self::search_fts5(&conn, &build_fts5_query(title), year, limit) {
                Ok(rows) => rows,
                Err(e) => {
                    // A malformed MATCH expression should not hide the LIKE results.
                    warn!("FTS5 search failed for '{}': {}", title, e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        let substring_hits = Self::search_like(&conn, &build_like_pattern(title), year, limit)?;

        let mut seen = HashSet::new();
        let matches: Vec<MetadataMatch> = prefix_hits
            .into_iter()
            .chain(substring_hits)
            .filter(|row| seen.insert(row.tconst.clone()))
            .filter_map(TitleRow::into_match)
            .take(limit)
            .collect();

        debug!("Local index returned {} titles for '{}'", matches.len(), title);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_index() -> (TitleIndex, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let index = TitleIndex::new(temp_dir.path().join("titles.db")).unwrap();
        (index, temp_dir)
    }

    fn record(tconst: &str, title: &str, year: Option<i32>, title_type: &str) -> TitleRecord {
        TitleRecord {
            tconst: tconst.into(),
            primary_title: title.into(),
            original_title: None,
            start_year: year,
            title_type: title_type.into(),
            is_adult: false,
        }
    }

    #[test]
    fn test_prefix_search() {
        let (index, _tmp) = create_test_index();
        index.upsert(&record("tt0133093", "The Matrix", Some(1999), "movie")).unwrap();
        index.upsert(&record("tt0234215", "The Matrix Reloaded", Some(2003), "movie")).unwrap();
        index.upsert(&record("tt0000001", "Heat", Some(1995), "movie")).unwrap();

        let results = index.search("matri", None, 10).unwrap();
        assert_eq!(results.len(), 2);
        // Newest first without a year hint.
        assert_eq!(results[0].year, Some(2003));
        assert!(results.iter().all(|m| m.source == MatchSource::LocalCache));
    }

    #[test]
    fn test_year_ordering() {
        let (index, _tmp) = create_test_index();
        index.upsert(&record("tt1", "Dune", Some(1984), "movie")).unwrap();
        index.upsert(&record("tt2", "Dune", Some(2021), "movie")).unwrap();

        let results = index.search("Dune", Some(1985), 10).unwrap();
        assert_eq!(results[0].provider_id, "tt1");
    }

    #[test]
    fn test_substring_search_and_dedupe() {
        let (index, _tmp) = create_test_index();
        index.upsert(&record("tt3", "Spider-Man: Homecoming", Some(2017), "movie")).unwrap();

        let results = index.search("Homecoming", None, 10).unwrap();
        assert_eq!(results.len(), 1);

        let results = index.search("man: home", None, 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_kind_mapping_and_filters() {
        let (index, _tmp) = create_test_index();
        index.upsert(&record("tt4", "Show Name", Some(2010), "tvSeries")).unwrap();
        index.upsert(&record("tt5", "Show Name Game", Some(2011), "videoGame")).unwrap();
        let mut adult = record("tt6", "Show Name Adult", Some(2012), "movie");
        adult.is_adult = true;
        index.upsert(&adult).unwrap();

        let results = index.search("show name", None, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, TitleKind::Show);
    }

    #[test]
    fn test_upsert_updates_search_table() {
        let (index, _tmp) = create_test_index();
        index.upsert(&record("tt7", "Old Name", None, "movie")).unwrap();
        index.upsert(&record("tt7", "New Name", None, "movie")).unwrap();

        assert!(index.search("old", None, 10).unwrap().is_empty());
        assert_eq!(index.search("new", None, 10).unwrap().len(), 1);
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_import_tsv() {
        let (index, tmp) = create_test_index();
        let tsv = tmp.path().join("title.basics.tsv");
        let mut f = std::fs::File::create(&tsv).unwrap();
        let lines = [
            "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\t\
             runtimeMinutes\tgenres",
            "tt0133093\tmovie\tThe Matrix\tThe Matrix\t0\t1999\t\\N\t136\tAction",
            "tt0903747\ttvSeries\tBreaking Bad\tBreaking Bad\t0\t2008\t2013\t49\tDrama",
            "tt9999999\tmovie\tAdult Film\tAdult Film\t1\t2000\t\\N\t90\tAdult",
            "tt8888888\tvideoGame\tSome Game\tSome Game\t0\t\\N\t\\N\t\\N\t\\N",
        ];
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        drop(f);

        assert_eq!(index.import_tsv(&tsv).unwrap(), 2);
        let results = index.search("breaking", None, 5).unwrap();
        assert_eq!(results[0].year, Some(2008));
        assert_eq!(results[0].kind, TitleKind::Show);
    }

    #[test]
    fn test_reopen_keeps_search_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("titles.db");
        {
            let index = TitleIndex::new(&path).unwrap();
            index.upsert(&record("tt8", "Arrival", Some(2016), "movie")).unwrap();
        }
        let index = TitleIndex::new(&path).unwrap();
        assert_eq!(index.search("arrival", Some(2016), 5).unwrap().len(), 1);
    }

    #[test]
    fn test_original_title_is_returned() {
        let (index, _tmp) = create_test_index();
        let mut spirited = record("tt0245429", "Spirited Away", Some(2001), "movie");
        spirited.original_title = Some("Sen to Chihiro no kamikakushi".into());
        index.upsert(&spirited).unwrap();
        index.upsert(&record("tt0133093", "The Matrix", Some(1999), "movie")).unwrap();

        let results = index.search("Sen to Chihiro", Some(2001), 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Spirited Away");
        assert_eq!(
            results[0].original_title.as_deref(),
            Some("Sen to Chihiro no kamikakushi")
        );

        // Identical original titles are not repeated.
        let matrix = index.search("matrix", None, 10).unwrap();
        assert_eq!(matrix[0].original_title, None);
    }

    #[test]
    fn test_read_only_missing_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.db");

        let err = TitleIndex::open_read_only(&path).err().unwrap();
        assert!(matches!(err, ScanlyError::Configuration { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_only_without_search_table_uses_substring() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("plain.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE titles (
                    tconst TEXT PRIMARY KEY,
                    primaryTitle TEXT NOT NULL,
                    originalTitle TEXT,
                    startYear TEXT,
                    titleType TEXT NOT NULL,
                    isAdult INTEGER
                );
                INSERT INTO titles VALUES
                    ('tt1375666', 'Inception', 'Inception', '2010', 'movie', 0);",
            )
            .unwrap();
        }

        let index = TitleIndex::open_read_only(&path).unwrap();
        let results = index.search("incep", Some(2010), 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].year, Some(2010));
        drop(index);

        let conn = Connection::open(&path).unwrap();
        assert!(!fts::table_exists(&conn, "table", fts::SEARCH_TABLE).unwrap());
    }

    #[test]
    fn test_read_only_without_titles_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (id INTEGER);")
            .unwrap();

        let err = TitleIndex::open_read_only(&path).err().unwrap();
        assert!(matches!(err, ScanlyError::Configuration { .. }));
    }

    #[test]
    fn test_read_only_open_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("titles.db");
        {
            let index = TitleIndex::new(&path).unwrap();
            index.upsert(&record("tt8", "Arrival", Some(2016), "movie")).unwrap();
            let conn = index.lock().unwrap();
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);").unwrap();
        }
        let before = std::fs::read(&path).unwrap();

        let index = TitleIndex::open_read_only(&path).unwrap();
        assert_eq!(index.search("arrival", Some(2016), 5).unwrap().len(), 1);
        assert!(index.upsert(&record("tt9", "Sicario", Some(2015), "movie")).is_err());
        drop(index);

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_tsv_line_nulls() {
        let rec = TitleRecord::from_tsv_line("tt1\tmovie\tX\t\\N\t0\t\\N").unwrap();
        assert_eq!(rec.original_title, None);
        assert_eq!(rec.start_year, None);
        assert!(TitleRecord::from_tsv_line("tt1").is_none());
    }
}
