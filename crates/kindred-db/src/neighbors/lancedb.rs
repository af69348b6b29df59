//! LanceDB neighbor backend.
//!
//! Answers primary queries from a local LanceDB table holding a mirror of
//! every visible, embedded work. The table is rebuilt wholesale by
//! [`LanceDbNeighborBackend::mirror`]; kindred never tunes the ANN index.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Int64Array, RecordBatch,
    RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lance_arrow::FixedSizeListArrayExt;
use lancedb::{
    connect,
    query::{ExecutableQuery, QueryBase},
    Connection, Table,
};
use tokio::runtime::Runtime;
use tracing::{debug, trace};

use super::{NeighborBackend, NeighborMatch, NeighborQuery};
use crate::config::LANCEDB_TABLE_NAME;
use crate::error::{DbError, DbResult};
use crate::works::{Work, WorkId, WorkSummary};

/// LanceDB-backed neighbor search.
pub struct LanceDbNeighborBackend {
    /// Path to the database directory.
    path: PathBuf,

    /// Vector dimension.
    dimension: usize,

    /// LanceDB connection.
    connection: Connection,

    /// LanceDB table (lazily initialized).
    table: RwLock<Option<Table>>,

    /// Tokio runtime for async operations.
    runtime: Runtime,
}

impl LanceDbNeighborBackend {
    /// Open or create the mirror table under `path`.
    pub fn open(path: impl AsRef<Path>, dimension: usize) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening LanceDbNeighborBackend at {:?}", path);

        if dimension == 0 {
            return Err(DbError::config("LanceDB backend needs a non-zero dimension"));
        }
        std::fs::create_dir_all(&path)?;

        let runtime = Runtime::new()
            .map_err(|e| DbError::internal(format!("Failed to create runtime: {}", e)))?;

        let connection = runtime
            .block_on(async { connect(path.to_string_lossy().as_ref()).execute().await })
            .map_err(|e| DbError::LanceDb {
                message: format!("Failed to connect: {}", e),
            })?;

        let backend = Self {
            path,
            dimension,
            connection,
            table: RwLock::new(None),
            runtime,
        };
        backend.ensure_table()?;
        Ok(backend)
    }

    /// Directory of the database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_table(&self) -> DbResult<()> {
        let mut table_guard = self
            .table
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire table lock: {}", e)))?;

        if table_guard.is_some() {
            return Ok(());
        }

        let table_names = self
            .runtime
            .block_on(async { self.connection.table_names().execute().await })
            .map_err(|e| DbError::LanceDb {
                message: format!("Failed to list tables: {}", e),
            })?;

        let table = if table_names.iter().any(|n| n == LANCEDB_TABLE_NAME) {
            debug!("Opening existing table '{}'", LANCEDB_TABLE_NAME);
            self.runtime
                .block_on(async {
                    self.connection
                        .open_table(LANCEDB_TABLE_NAME)
                        .execute()
                        .await
                })
                .map_err(|e| DbError::LanceDb {
                    message: format!("Failed to open table: {}", e),
                })?
        } else {
            debug!("Creating new table '{}'", LANCEDB_TABLE_NAME);
            let batch = self.works_to_batch(&[])?;
            let schema = batch.schema();
            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

            self.runtime
                .block_on(async {
                    self.connection
                        .create_table(LANCEDB_TABLE_NAME, Box::new(batches))
                        .execute()
                        .await
                })
                .map_err(|e| DbError::LanceDb {
                    message: format!("Failed to create table: {}", e),
                })?
        };

        *table_guard = Some(table);
        Ok(())
    }

    fn get_table(&self) -> DbResult<Table> {
        self.ensure_table()?;

        let guard = self
            .table
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire table lock: {}", e)))?;

        guard
            .clone()
            .ok_or_else(|| DbError::internal("Table not initialized"))
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("title", DataType::Utf8, false),
            Field::new("description", DataType::Utf8, true),
            Field::new("kind", DataType::Utf8, false),
            Field::new("thumbnail_url", DataType::Utf8, true),
            Field::new("view_count", DataType::Int64, false),
            Field::new("vote_count", DataType::Int64, false),
        ])
    }

    /// Convert works (all embedded with `self.dimension`) to a RecordBatch.
    fn works_to_batch(&self, works: &[&Work]) -> DbResult<RecordBatch> {
        let ids: ArrayRef = Arc::new(StringArray::from(
            works.iter().map(|w| w.id.as_str()).collect::<Vec<_>>(),
        ));

        let flat: Vec<f32> = works
            .iter()
            .flat_map(|w| w.embedding.iter().flatten().copied())
            .collect();
        let vector_array =
            FixedSizeListArray::try_new_from_values(Float32Array::from(flat), self.dimension as i32)
                .map_err(|e| DbError::internal(format!("Failed to create vector array: {}", e)))?;
        let vectors: ArrayRef = Arc::new(vector_array);

        let titles: ArrayRef = Arc::new(StringArray::from(
            works.iter().map(|w| w.title.as_str()).collect::<Vec<_>>(),
        ));
        let descriptions: ArrayRef = Arc::new(StringArray::from(
            works
                .iter()
                .map(|w| w.description.as_deref())
                .collect::<Vec<_>>(),
        ));
        let kinds: ArrayRef = Arc::new(StringArray::from(
            works.iter().map(|w| w.kind.as_str()).collect::<Vec<_>>(),
        ));
        let thumbnails: ArrayRef = Arc::new(StringArray::from(
            works
                .iter()
                .map(|w| w.thumbnail_url.as_deref())
                .collect::<Vec<_>>(),
        ));
        let views: ArrayRef = Arc::new(Int64Array::from(
            works.iter().map(|w| w.view_count as i64).collect::<Vec<_>>(),
        ));
        let votes: ArrayRef = Arc::new(Int64Array::from(
            works.iter().map(|w| w.vote_count as i64).collect::<Vec<_>>(),
        ));

        RecordBatch::try_new(
            Arc::new(self.schema()),
            vec![
                ids,
                vectors,
                titles,
                descriptions,
                kinds,
                thumbnails,
                views,
                votes,
            ],
        )
        .map_err(|e| DbError::internal(format!("Failed to create batch: {}", e)))
    }

    /// Replace the table contents with the visible, embedded `works`.
    ///
    /// Works with the wrong dimension are skipped. Returns the number of
    /// rows written.
    pub fn mirror(&self, works: &[Work]) -> DbResult<usize> {
        let (rows, skipped): (Vec<&Work>, Vec<&Work>) = works
            .iter()
            .filter(|w| w.is_visible())
            .filter(|w| w.embedding.is_some())
            .partition(|w| w.embedding.as_ref().map(Vec::len) == Some(self.dimension));

        if !skipped.is_empty() {
            debug!(
                "Skipping {} works whose embedding is not {}-dimensional",
                skipped.len(),
                self.dimension
            );
        }

        let table = self.get_table()?;
        let written: DbResult<()> = self.runtime.block_on(async {
            table.delete("true").await.map_err(|e| DbError::LanceDb {
                message: format!("Failed to clear table: {}", e),
            })?;

            if rows.is_empty() {
                return Ok(());
            }

            let batch = self.works_to_batch(&rows)?;
            let schema = batch.schema();
            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
            table
                .add(Box::new(batches))
                .execute()
                .await
                .map_err(|e| DbError::LanceDb {
                    message: format!("Insert failed: {}", e),
                })?;
            Ok(())
        });
        written?;

        debug!("Mirrored {} works into LanceDB", rows.len());
        Ok(rows.len())
    }

    /// Number of mirrored rows.
    pub fn len(&self) -> DbResult<usize> {
        let table = self.get_table()?;
        self.runtime.block_on(async {
            table.count_rows(None).await.map_err(|e| DbError::LanceDb {
                message: format!("Count failed: {}", e),
            })
        })
    }

    /// Check if the mirror is empty.
    pub fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> DbResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| DbError::internal(format!("LanceDB result lacks column '{}'", name)))
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> DbResult<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| DbError::internal(format!("LanceDB result lacks column '{}'", name)))
}

fn batch_to_matches(batch: &RecordBatch, threshold: f32) -> DbResult<Vec<NeighborMatch>> {
    let ids = string_column(batch, "id")?;
    let titles = string_column(batch, "title")?;
    let descriptions = string_column(batch, "description")?;
    let kinds = string_column(batch, "kind")?;
    let thumbnails = string_column(batch, "thumbnail_url")?;
    let views = int_column(batch, "view_count")?;
    let votes = int_column(batch, "vote_count")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| DbError::internal("LanceDB result lacks column '_distance'"))?;

    let optional = |col: &StringArray, i: usize| {
        (!col.is_null(i)).then(|| col.value(i).to_string())
    };

    let mut matches = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        // Cosine distance is 1 - similarity.
        let similarity = 1.0 - distances.value(i);
        if similarity < threshold {
            continue;
        }
        matches.push(NeighborMatch {
            work: WorkSummary {
                id: WorkId::from(ids.value(i)),
                title: titles.value(i).to_string(),
                description: optional(descriptions, i),
                kind: Some(kinds.value(i).parse()?),
                thumbnail_url: optional(thumbnails, i),
                view_count: views.value(i).max(0) as u64,
                vote_count: votes.value(i).max(0) as u64,
            },
            similarity,
        });
    }
    Ok(matches)
}

impl NeighborBackend for LanceDbNeighborBackend {
    fn query(&self, query: &NeighborQuery<'_>) -> DbResult<Vec<NeighborMatch>> {
        trace!("Querying LanceDbNeighborBackend, limit={}", query.limit);

        if query.embedding.len() != self.dimension {
            return Err(DbError::DimensionMismatch {
                expected: self.dimension,
                actual: query.embedding.len(),
            });
        }
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let table = self.get_table()?;

        let batches: Vec<RecordBatch> = self.runtime.block_on(async {
            let results = table
                .vector_search(query.embedding.to_vec())
                .map_err(|e| DbError::LanceDb {
                    message: format!("Failed to create query: {}", e),
                })?
                .distance_type(lancedb::DistanceType::Cosine)
                .limit(query.limit)
                .execute()
                .await
                .map_err(|e| DbError::LanceDb {
                    message: format!("Query failed: {}", e),
                })?;

            results.try_collect().await.map_err(|e| DbError::LanceDb {
                message: format!("Failed to collect results: {}", e),
            })
        })?;

        let mut matches = Vec::new();
        for batch in &batches {
            matches.extend(batch_to_matches(batch, query.threshold)?);
        }
        Ok(matches)
    }

    fn name(&self) -> &'static str {
        "lancedb"
    }
}

// ============================================================================
// Tests
// ============================================================================
