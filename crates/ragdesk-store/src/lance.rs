//! LanceDB-backed vector store.
//!
//! One table per store with columns `id`, `content`, `metadata` (JSON text)
//! and `vector` (fixed-size list of f32). The table is created by the first
//! upsert; until then every read behaves as an empty index. Writes through one
//! store (and its clones) are serialized, so concurrent first upserts create
//! the table once.

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use ragdesk_core::{DocumentChunk, Metadata, SearchQuery, SearchResult, StoreError, VectorStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Candidates fetched per requested result when filters are applied.
const FILTER_OVERFETCH: usize = 10;
const MIN_FILTER_CANDIDATES: usize = 100;

pub fn build_schema(dim: i32) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

/// [`VectorStore`] over a LanceDB table.
///
/// Scores are the `_distance` column under cosine distance: lower is better,
/// and results come back nearest first.
#[derive(Clone)]
pub struct LanceStore {
    db: Connection,
    table_name: String,
    writes: Arc<Mutex<()>>,
}

impl LanceStore {
    pub async fn open(uri: &str, table_name: &str) -> Result<Self, StoreError> {
        let db = connect(uri).execute().await.map_err(StoreError::backend)?;
        info!(uri, table = table_name, "lance_store_opened");
        Ok(Self { db, table_name: table_name.to_string(), writes: Arc::default() })
    }

    async fn table(&self) -> Result<Option<Table>, StoreError> {
        let names = self.db.table_names().execute().await.map_err(StoreError::backend)?;
        if !names.contains(&self.table_name) {
            return Ok(None);
        }
        let table = self.db.open_table(&self.table_name).execute().await.map_err(StoreError::backend)?;
        Ok(Some(table))
    }

    async fn table_dim(table: &Table) -> Result<Option<usize>, StoreError> {
        let schema = table.schema().await.map_err(StoreError::backend)?;
        Ok(schema.field_with_name("vector").ok().and_then(|f| match f.data_type() {
            DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
            _ => None,
        }))
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        match self.table().await? {
            Some(t) => t.count_rows(None).await.map_err(StoreError::backend),
            None => Ok(0),
        }
    }

}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::Backend(format!("{name} column missing")))
}

fn quote(id: &str) -> String {
    format!("'{}'", id.replace('\'', "''"))
}

/// Duplicate ids keep the last occurrence; the result is ordered by first appearance.
fn dedupe_last_wins(chunks: &[DocumentChunk]) -> Vec<&DocumentChunk> {
    let mut position: BTreeMap<&str, usize> = BTreeMap::new();
    let mut out: Vec<&DocumentChunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match position.get(chunk.id.as_str()) {
            Some(&i) => out[i] = chunk,
            None => {
                position.insert(&chunk.id, out.len());
                out.push(chunk);
            }
        }
    }
    out
}

fn to_record_batch(chunks: &[&DocumentChunk], dim: usize) -> Result<RecordBatch, StoreError> {
    let dim_i32 = i32::try_from(dim).map_err(StoreError::backend)?;
    let mut ids = Vec::with_capacity(chunks.len());
    let mut contents = Vec::with_capacity(chunks.len());
    let mut metadata = Vec::with_capacity(chunks.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let vector = chunk.embedding.as_ref().ok_or_else(|| StoreError::MissingEmbedding(chunk.id.clone()))?;
        if vector.len() != dim {
            return Err(StoreError::DimensionMismatch { expected: dim, actual: vector.len() });
        }
        ids.push(chunk.id.clone());
        contents.push(chunk.content.clone());
        metadata.push(serde_json::to_string(&chunk.metadata).map_err(StoreError::backend)?);
        vectors.push(Some(vector.iter().map(|&x| Some(x)).collect()));
    }
    RecordBatch::try_new(
        build_schema(dim_i32),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim_i32)),
        ],
    )
    .map_err(StoreError::backend)
}

fn read_results(batch: &RecordBatch) -> Result<Vec<SearchResult>, StoreError> {
    let ids = string_column(batch, "id")?;
    let contents = string_column(batch, "content")?;
    let metadata = string_column(batch, "metadata")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| StoreError::Backend("_distance column missing".into()))?;
    (0..batch.num_rows())
        .map(|i| {
            let meta: Metadata = serde_json::from_str(metadata.value(i)).map_err(StoreError::backend)?;
            let chunk = DocumentChunk { id: ids.value(i).to_string(), content: contents.value(i).to_string(), metadata: meta, embedding: None };
            let score = if distances.is_null(i) { f32::MAX } else { distances.value(i) };
            Ok(SearchResult { chunk, score })
        })
        .collect()
}

#[async_trait]
impl VectorStore for LanceStore {
    async fn upsert(&self, chunks: &[DocumentChunk]) -> Result<(), StoreError> {
        let unique = dedupe_last_wins(chunks);
        let Some(first) = unique.first() else {
            return Ok(());
        };
        let batch_dim = first.embedding.as_ref().ok_or_else(|| StoreError::MissingEmbedding(first.id.clone()))?.len();

        let _guard = self.writes.lock().await;
        let table = self.table().await?;
        let dim = match &table {
            Some(t) => Self::table_dim(t).await?.unwrap_or(batch_dim),
            None => batch_dim,
        };
        let batch = to_record_batch(&unique, dim)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));

        match table {
            Some(t) => {
                let mut mi = t.merge_insert(&["id"]);
                mi.when_matched_update_all(None).when_not_matched_insert_all();
                mi.execute(reader).await.map_err(StoreError::backend)?;
            }
            None => {
                self.db.create_table(&self.table_name, reader).execute().await.map_err(StoreError::backend)?;
                info!(table = %self.table_name, dim, "lance_table_created");
            }
        }
        debug!(count = unique.len(), table = %self.table_name, "lance_store_upsert");
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, StoreError> {
        let vector = query.embedding.clone().ok_or_else(|| StoreError::MissingEmbedding("query".into()))?;
        let Some(table) = self.table().await? else {
            return Ok(Vec::new());
        };
        if let Some(dim) = Self::table_dim(&table).await? {
            if dim != vector.len() {
                return Err(StoreError::DimensionMismatch { expected: dim, actual: vector.len() });
            }
        }
        let filters = query.filters.as_ref().filter(|f| !f.is_empty());
        let limit = match filters {
            Some(_) => (query.top_k * FILTER_OVERFETCH).max(MIN_FILTER_CANDIDATES),
            None => query.top_k,
        };

        let mut stream = table
            .vector_search(vector)
            .map_err(StoreError::backend)?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(StoreError::backend)?;
        let mut results = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(StoreError::backend)? {
            results.extend(read_results(&batch)?);
        }
        if let Some(f) = filters {
            results.retain(|r| r.chunk.matches(f));
        }
        results.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.chunk.id.cmp(&b.chunk.id)));
        results.truncate(query.top_k);
        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let _guard = self.writes.lock().await;
        let Some(table) = self.table().await? else {
            return Ok(());
        };
        let predicate = format!("id IN ({})", ids.iter().map(|id| quote(id)).collect::<Vec<_>>().join(", "));
        table.delete(&predicate).await.map_err(StoreError::backend)?;
        debug!(count = ids.len(), "lance_store_delete");
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let _guard = self.writes.lock().await;
        let Some(table) = self.table().await? else {
            return Ok(());
        };
        table.delete("true").await.map_err(StoreError::backend)?;
        info!(table = %self.table_name, "lance_store_clear");
        Ok(())
    }
}
