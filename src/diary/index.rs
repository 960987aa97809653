//! Vector-indexed persistence for diary records.
//!
//! [`DiaryIndex`] is the boundary the store talks to: insert, exact-match
//! lookup, nearest-neighbour search and delete. [`SqliteDiaryIndex`] backs it
//! with the `diaries` table plus a sqlite-vec `diaries_vec` table, embedding
//! text through an [`EmbeddingProvider`].

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::{DiaryMetadata, DiaryRecord, Mood};
use crate::embedding::EmbeddingProvider;

/// Exact-match constraints on record metadata. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexFilter {
    pub date: Option<NaiveDate>,
    pub mood: Option<Mood>,
}

impl IndexFilter {
    pub fn on_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            mood: None,
        }
    }

    pub fn with_mood(mood: Option<Mood>) -> Self {
        Self { date: None, mood }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.mood.is_none()
    }

    fn sql_params(&self) -> (Option<String>, Option<&'static str>) {
        (
            self.date.map(|d| d.to_string()),
            self.mood.map(|m| m.as_str()),
        )
    }
}

/// A record returned from a similarity query.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: DiaryRecord,
    /// Cosine distance to the query: 0 is identical, larger is less similar.
    pub distance: f64,
}

/// Storage boundary used by [`super::store::DiaryStore`].
pub trait DiaryIndex: Send {
    /// Commit text, metadata and embedding as one unit.
    fn insert(&mut self, record: &DiaryRecord) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<DiaryRecord>>;

    /// All records matching `filter`, in insertion order.
    fn query_by_filter(&self, filter: &IndexFilter) -> Result<Vec<DiaryRecord>>;

    /// Up to `limit` records nearest to `text`, closest first.
    fn query_by_similarity(
        &self,
        text: &str,
        limit: usize,
        filter: &IndexFilter,
    ) -> Result<Vec<ScoredRecord>>;

    /// Remove a record. Absent ids are not an error.
    fn delete_by_id(&mut self, id: &str) -> Result<()>;

    fn exists(&self, filter: &IndexFilter) -> Result<bool> {
        Ok(!self.query_by_filter(filter)?.is_empty())
    }

    fn count(&self) -> Result<usize>;

    /// Whether any record claims `path` as its image, whether or not the file exists.
    fn references_image(&self, path: &Path) -> Result<bool>;
}

const RECORD_COLUMNS: &str = "id, content, date, time, created_at, style, mood, image_path";

pub struct SqliteDiaryIndex {
    conn: Connection,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteDiaryIndex {
    /// Wrap a connection whose schema has been initialized and migrated.
    pub fn new(conn: Connection, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { conn, embedder }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn fetch_records(&self, ids: &[&str]) -> Result<HashMap<String, DiaryRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM diaries WHERE id IN ({})",
            placeholders.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = ids.iter().map(|id| id as &dyn ToSql).collect();

        let rows = stmt
            .query_map(params.as_slice(), record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(|r| (r.id.clone(), r)).collect())
    }

    /// KNN over the whole collection via the vec0 index.
    fn knn(&self, embedding: &[f32], limit: usize) -> Result<Vec<(String, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, distance FROM diaries_vec \
             WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
        )?;
        let results = stmt
            .query_map(params![embedding_to_bytes(embedding), limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }

    /// Exact scan restricted by metadata; vec0 KNN cannot see the `diaries` columns.
    fn filtered_scan(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: &IndexFilter,
    ) -> Result<Vec<(String, f64)>> {
        let (date, mood) = filter.sql_params();
        let mut stmt = self.conn.prepare(
            "SELECT v.id, vec_distance_l2(v.embedding, ?1) AS distance \
             FROM diaries_vec v JOIN diaries d ON d.id = v.id \
             WHERE (?2 IS NULL OR d.date = ?2) AND (?3 IS NULL OR d.mood = ?3) \
             ORDER BY distance LIMIT ?4",
        )?;
        let results = stmt
            .query_map(
                params![embedding_to_bytes(embedding), date, mood, limit as i64],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(results)
    }
}

impl DiaryIndex for SqliteDiaryIndex {
    fn insert(&mut self, record: &DiaryRecord) -> Result<()> {
        let embedding = self
            .embedder
            .embed(&record.text)
            .context("failed to embed diary text")?;
        let meta = &record.metadata;
        let image_path = meta
            .image_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO diaries (id, content, date, time, created_at, style, mood, image_path) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.text,
                meta.date.to_string(),
                meta.time,
                meta.created_at,
                meta.style.as_str(),
                meta.mood.as_str(),
                image_path,
            ],
        )
        .with_context(|| format!("failed to insert diary {}", record.id))?;
        tx.execute(
            "INSERT INTO diaries_vec (id, embedding) VALUES (?1, ?2)",
            params![record.id, embedding_to_bytes(&embedding)],
        )
        .context("failed to insert embedding")?;
        write_audit_log(
            &tx,
            "create",
            &record.id,
            Some(&serde_json::json!({ "date": meta.date, "has_image": image_path.is_some() })),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<DiaryRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM diaries WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], record_from_row)
            .optional()?)
    }

    fn query_by_filter(&self, filter: &IndexFilter) -> Result<Vec<DiaryRecord>> {
        let (date, mood) = filter.sql_params();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM diaries \
             WHERE (?1 IS NULL OR date = ?1) AND (?2 IS NULL OR mood = ?2) \
             ORDER BY rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![date, mood], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn query_by_similarity(
        &self,
        text: &str,
        limit: usize,
        filter: &IndexFilter,
    ) -> Result<Vec<ScoredRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(text).context("failed to embed query")?;

        let neighbours = if filter.is_empty() {
            self.knn(&embedding, limit)?
        } else {
            self.filtered_scan(&embedding, limit, filter)?
        };

        let ids: Vec<&str> = neighbours.iter().map(|(id, _)| id.as_str()).collect();
        let mut records = self.fetch_records(&ids)?;

        Ok(neighbours
            .iter()
            .filter_map(|(id, l2)| {
                records.remove(id).map(|record| ScoredRecord {
                    record,
                    distance: l2_to_cosine_distance(*l2),
                })
            })
            .collect())
    }

    fn delete_by_id(&mut self, id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM diaries_vec WHERE id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM diaries WHERE id = ?1", params![id])?;
        if removed > 0 {
            write_audit_log(&tx, "delete", id, None)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn exists(&self, filter: &IndexFilter) -> Result<bool> {
        let (date, mood) = filter.sql_params();
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM diaries \
             WHERE (?1 IS NULL OR date = ?1) AND (?2 IS NULL OR mood = ?2))",
            params![date, mood],
            |row| row.get(0),
        )?)
    }

    fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM diaries", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn references_image(&self, path: &Path) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM diaries WHERE image_path = ?1)",
            params![path.to_string_lossy()],
            |row| row.get(0),
        )?)
    }
}

/// For unit vectors, `|a - b|² = 2 (1 - cos)`, so cosine distance is half the squared L2.
pub fn l2_to_cosine_distance(l2: f64) -> f64 {
    l2 * l2 / 2.0
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            std::mem::size_of_val(embedding),
        )
    }
}

/// Write an entry to the diary_log audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    diary_id: &str,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO diary_log (operation, diary_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, diary_id, details.map(|d| d.to_string()), now],
    )?;
    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DiaryRecord> {
    let image_path: Option<String> = row.get(7)?;
    Ok(DiaryRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        metadata: DiaryMetadata {
            date: parse_column(row, 2)?,
            time: row.get(3)?,
            created_at: row.get(4)?,
            style: parse_column(row, 5)?,
            mood: parse_column(row, 6)?,
            image_path: image_path.map(PathBuf::from),
        },
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("{raw:?}: {e}").into(),
        )
    })
}
