//! The diary store: save, load, delete and recall entries.
//!
//! [`DiaryStore`] owns the id → record mapping held in a [`DiaryIndex`] and,
//! through it, every image artifact a record points at. Writes put the
//! artifact down before the index entry; deletes remove the artifact before
//! the index entry. Either way a crash can leave at worst an entry whose image
//! is missing, never an image nobody owns.

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, SubsecRound, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::artifact::{artifact_path, ArtifactStorage, FsArtifactStorage};
use super::error::{DiaryError, DiaryResult};
use super::index::{DiaryIndex, IndexFilter, SqliteDiaryIndex};
use super::ranking::RankingPolicy;
use super::types::{ArtStyle, DiaryMetadata, DiaryRecord, ImageData, Mood, SimilarEntry};
use crate::config::PictologConfig;
use crate::embedding::EmbeddingProvider;

/// How many random suffixes to try before giving up on a fresh id.
const MAX_ID_ATTEMPTS: usize = 16;

/// UTC with microseconds, so lexical order is chronological across processes and DST changes.
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub struct DiaryStore {
    index: Box<dyn DiaryIndex>,
    artifacts: Box<dyn ArtifactStorage>,
    image_dir: PathBuf,
    policy: RankingPolicy,
    candidate_multiplier: usize,
    last_created_at: Option<DateTime<Utc>>,
}

impl DiaryStore {
    pub fn new(
        index: Box<dyn DiaryIndex>,
        artifacts: Box<dyn ArtifactStorage>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index,
            artifacts,
            image_dir: image_dir.into(),
            policy: RankingPolicy::default(),
            candidate_multiplier: 3,
            last_created_at: None,
        }
    }

    /// Open the SQLite-backed store described by `config`, with images on the local filesystem.
    pub fn open(
        config: &PictologConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> anyhow::Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = crate::db::open_database(&db_path)
            .with_context(|| format!("failed to open diary index at {}", db_path.display()))?;

        match crate::db::migrations::get_embedding_model(&conn)? {
            Some(stored) if stored != config.embedding.model => warn!(
                stored = %stored,
                configured = %config.embedding.model,
                "embedding model changed; similarity scores against older entries are unreliable"
            ),
            Some(_) => {}
            None => {
                crate::db::migrations::set_embedding_model(&conn, &config.embedding.model)
                    .context("failed to record embedding model")?;
                info!(model = %config.embedding.model, "embedding model recorded");
            }
        }

        let index = SqliteDiaryIndex::new(conn, embedder);
        Ok(Self::new(
            Box::new(index),
            Box::new(FsArtifactStorage),
            config.resolved_image_dir(),
        )
        .with_policy(RankingPolicy::from(&config.retrieval))
        .with_candidate_multiplier(config.retrieval.candidate_multiplier))
    }

    pub fn with_policy(mut self, policy: RankingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.candidate_multiplier = multiplier.max(1);
        self
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Save a new entry and return its id.
    ///
    /// The image, if any, is written first; the index entry is only committed
    /// once the image is safely on disk. If the commit fails the image is
    /// removed again.
    pub fn save(
        &mut self,
        text: &str,
        date: NaiveDate,
        style: ArtStyle,
        mood: Mood,
        image: Option<&ImageData>,
    ) -> DiaryResult<String> {
        if text.trim().is_empty() {
            return Err(DiaryError::Validation("diary text must not be empty".into()));
        }

        let now = self.next_timestamp();
        let local = now.with_timezone(&Local).naive_local();
        let id = self.fresh_id(date)?;

        let image_path = match image {
            Some(image) => {
                // A record whose file went missing still owns its path.
                let path = artifact_path(&self.image_dir, date, local, image.format(), |p| {
                    if self.artifacts.exists(p) {
                        return Ok(true);
                    }
                    self.index
                        .references_image(p)
                        .map_err(DiaryError::index_query)
                })?;
                self.artifacts
                    .write(&path, image.bytes())
                    .map_err(|source| DiaryError::ArtifactWrite {
                        path: path.clone(),
                        source,
                    })?;
                Some(path)
            }
            None => None,
        };

        let record = DiaryRecord {
            id,
            text: text.to_string(),
            metadata: DiaryMetadata {
                date,
                time: local.format("%H:%M").to_string(),
                created_at: now.format(CREATED_AT_FORMAT).to_string(),
                style,
                mood,
                image_path,
            },
        };

        if let Err(e) = self.index.insert(&record) {
            if let Some(path) = &record.metadata.image_path {
                if let Err(cleanup) = self.artifacts.remove(path) {
                    warn!(path = %path.display(), error = %cleanup, "failed to remove image after index write failure");
                }
            }
            return Err(DiaryError::index_write(e));
        }

        info!(
            id = %record.id,
            date = %date,
            style = %style,
            mood = %mood,
            has_image = record.metadata.image_path.is_some(),
            "diary saved"
        );
        Ok(record.id)
    }

    /// All entries for `date`, oldest first by `created_at`.
    pub fn load_by_date(&self, date: NaiveDate) -> DiaryResult<Vec<DiaryRecord>> {
        let mut records = self
            .index
            .query_by_filter(&IndexFilter::on_date(date))
            .map_err(DiaryError::index_query)?;
        records.sort_by(|a, b| a.metadata.created_at.cmp(&b.metadata.created_at));
        Ok(records)
    }

    pub fn exists_on_date(&self, date: NaiveDate) -> DiaryResult<bool> {
        self.index
            .exists(&IndexFilter::on_date(date))
            .map_err(DiaryError::index_query)
    }

    pub fn get(&self, id: &str) -> DiaryResult<Option<DiaryRecord>> {
        self.index.get(id).map_err(DiaryError::index_query)
    }

    pub fn count(&self) -> DiaryResult<usize> {
        self.index.count().map_err(DiaryError::index_query)
    }

    /// Every entry, ordered by logical date and then `created_at`.
    pub fn all_records(&self) -> DiaryResult<Vec<DiaryRecord>> {
        let mut records = self
            .index
            .query_by_filter(&IndexFilter::default())
            .map_err(DiaryError::index_query)?;
        records.sort_by(|a, b| {
            (a.metadata.date, &a.metadata.created_at).cmp(&(b.metadata.date, &b.metadata.created_at))
        });
        Ok(records)
    }

    /// Delete an entry and the image it owns. Unknown ids are ignored.
    pub fn delete(&mut self, id: &str) -> DiaryResult<()> {
        let Some(record) = self.get(id)? else {
            debug!(id = %id, "delete of unknown diary ignored");
            return Ok(());
        };

        if let Some(path) = &record.metadata.image_path {
            self.artifacts
                .remove(path)
                .map_err(|source| DiaryError::ArtifactRemove {
                    path: path.clone(),
                    source,
                })?;
        }

        self.index
            .delete_by_id(id)
            .map_err(DiaryError::index_write)?;

        info!(id = %id, had_image = record.metadata.image_path.is_some(), "diary deleted");
        Ok(())
    }

    /// Past entries most relevant to `query`, best first, judged as of today.
    pub fn retrieve_similar(
        &self,
        query: &str,
        k: usize,
        mood: Option<Mood>,
    ) -> DiaryResult<Vec<SimilarEntry>> {
        self.retrieve_similar_on(query, k, mood, Local::now().date_naive())
    }

    /// [`Self::retrieve_similar`] with recency measured from `today`.
    pub fn retrieve_similar_on(
        &self,
        query: &str,
        k: usize,
        mood: Option<Mood>,
        today: NaiveDate,
    ) -> DiaryResult<Vec<SimilarEntry>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let pool = k.saturating_mul(self.candidate_multiplier);
        let candidates = self
            .index
            .query_by_similarity(query, pool, &IndexFilter::with_mood(mood))
            .map_err(DiaryError::index_query)?;
        let found = candidates.len();

        let ranked = self.policy.rank(candidates, today, k);
        debug!(
            candidates = found,
            returned = ranked.len(),
            mood = ?mood,
            "similar diaries retrieved"
        );
        Ok(ranked)
    }

    /// The image to display for `record`, or `None` if it has none or the file is gone.
    pub fn resolve_image<'a>(&self, record: &'a DiaryRecord) -> Option<&'a Path> {
        record
            .metadata
            .image_path
            .as_deref()
            .filter(|path| self.artifacts.exists(path))
    }

    /// Entries whose image file is missing, e.g. after a crash mid-delete.
    pub fn find_dangling_images(&self) -> DiaryResult<Vec<DiaryRecord>> {
        Ok(self
            .all_records()?
            .into_iter()
            .filter(|r| {
                r.metadata
                    .image_path
                    .as_deref()
                    .is_some_and(|p| !self.artifacts.exists(p))
            })
            .collect())
    }

    /// Current UTC time at microsecond precision, nudged forward so successive
    /// saves never share a timestamp.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now().trunc_subsecs(6);
        if let Some(last) = self.last_created_at {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_created_at = Some(now);
        now
    }

    fn fresh_id(&self, date: NaiveDate) -> DiaryResult<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            let id = format!("{date}_{}", &suffix[..8]);
            if self.get(&id)?.is_none() {
                return Ok(id);
            }
            debug!(id = %id, "diary id collision, drawing another");
        }
        Err(DiaryError::IndexWrite(format!(
            "no unused diary id for {date} after {MAX_ID_ATTEMPTS} attempts"
        )))
    }
}
