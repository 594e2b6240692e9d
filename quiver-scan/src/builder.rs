use std::sync::Arc;

use itertools::Itertools;
use log::{debug, warn};
use quiver_dtype::{
    DType, ExtensionBindings, ExtensionRegistry, FieldPath, Nullability, ProjectionMask,
    StructDType,
};
use quiver_error::{QuiverError, QuiverResult, quiver_bail};
use quiver_expr::ExprRef;
use quiver_expr::transform::bind::{BoundExpr, resolve_columns};

use crate::{
    DEFAULT_BATCH_READAHEAD, DEFAULT_BATCH_SIZE, DatasetRef, ScanOptions, Scanner, TaskExecutor,
};

/// A struct for building a scan over a [`Dataset`](crate::Dataset).
///
/// Settings are only recorded by the setters and validated together by [`ScanBuilder::finish`],
/// so they may be given in any order. A failed `finish` leaves the builder as it was.
pub struct ScanBuilder {
    dataset: DatasetRef,
    registry: Arc<ExtensionRegistry>,
    projection: Option<Vec<String>>,
    filter: Option<ExprRef>,
    limit: Option<i64>,
    offset: Option<i64>,
    batch_size: Option<i64>,
    batch_readahead: Option<usize>,
    /// The executor fragment reads are spawned onto.
    executor: Option<Arc<dyn TaskExecutor>>,
}

impl ScanBuilder {
    /// Starts a scan over `dataset`, reading extension types known to `registry`.
    pub fn new(dataset: DatasetRef, registry: Arc<ExtensionRegistry>) -> Self {
        Self {
            dataset,
            registry,
            projection: None,
            filter: None,
            limit: None,
            offset: None,
            batch_size: None,
            batch_readahead: None,
            executor: None,
        }
    }

    /// Emits only the fields named by `paths`, written in dotted form such as `objects.val` or
    /// `objects[0].val`.
    ///
    /// Without a projection every field is emitted. An explicitly empty projection is rejected.
    pub fn project<S: AsRef<str>>(&mut self, paths: &[S]) -> &mut Self {
        self.projection = Some(paths.iter().map(|p| p.as_ref().to_string()).collect());
        self
    }

    /// Emits only the rows for which `filter` is true.
    ///
    /// The filter may read fields that are not projected.
    pub fn filter(&mut self, filter: ExprRef) -> &mut Self {
        self.filter = Some(filter);
        self
    }

    /// Emits at most `limit` rows. A limit of `0` emits nothing.
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` matching rows.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// The number of rows of every emitted batch but the last, must be positive.
    pub fn batch_size(&mut self, batch_size: i64) -> &mut Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// The number of batches that may be prepared ahead of the consumer.
    pub fn batch_readahead(&mut self, batch_readahead: usize) -> &mut Self {
        self.batch_readahead = Some(batch_readahead);
        self
    }

    /// Spawn each fragment read onto the given Tokio runtime.
    #[cfg(feature = "tokio")]
    pub fn with_tokio_executor(&mut self, handle: tokio::runtime::Handle) -> &mut Self {
        self.executor = Some(Arc::new(handle));
        self
    }

    pub fn with_executor(&mut self, executor: Arc<dyn TaskExecutor>) -> &mut Self {
        self.executor = Some(executor);
        self
    }

    /// Validates the recorded settings into [`ScanOptions`].
    ///
    /// The projection is planned first. The filter is then resolved against the dataset schema,
    /// the extension bindings of every read field are captured and the filter is checked against
    /// their storage types. Limits and batch settings come last. The first failing step fails the
    /// whole call.
    pub fn finish(&self) -> QuiverResult<ScanOptions> {
        let schema = self.dataset.schema();

        let projection = match &self.projection {
            None => ProjectionMask::All,
            Some(paths) => {
                let paths: Vec<FieldPath> = paths
                    .iter()
                    .map(|path| FieldPath::from_dot_path(path))
                    .try_collect()?;
                ProjectionMask::try_new(schema, &paths)?
            }
        };
        let projected_schema = projection.apply(schema)?;

        let filter = self
            .filter
            .clone()
            .map(|filter| resolve_columns(filter, schema))
            .transpose()?;

        let mut read_mask = projection.clone();
        if let Some(filter) = &filter {
            read_mask.union(&ProjectionMask::from_resolved(filter.references()));
        }
        let bindings = self
            .registry
            .schema_bindings(&read_mask.apply(schema)?)?;
        if let Some(filter) = &filter {
            check_filter(filter, schema, &bindings)?;
        }

        let limit = self.limit.map(non_negative).transpose()?;
        let offset = self.offset.map(non_negative).transpose()?.unwrap_or(0);
        let batch_size = match self.batch_size {
            Some(batch_size) => positive(batch_size)?,
            None => limit
                .map(|limit| limit.saturating_add(offset))
                .filter(|rows| *rows > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
        };
        let batch_readahead = match (self.batch_readahead, limit) {
            (Some(readahead), _) => readahead.max(1),
            (None, Some(_)) => 1,
            (None, None) => DEFAULT_BATCH_READAHEAD,
        };

        for ext in bindings.unbound(&DType::Struct(
            projected_schema.clone(),
            Nullability::NonNullable,
        )) {
            warn!(
                "extension type {} is not registered, emitting its storage type",
                ext.id()
            );
        }
        let output_schema = Arc::new(bindings.output_schema(&projected_schema));

        debug!(
            "planned scan: projection {}, filter {}, limit {}, offset {offset}, batch size {batch_size}, readahead {batch_readahead}",
            DType::Struct(projected_schema.clone(), Nullability::NonNullable),
            filter
                .as_ref()
                .map(|f| f.expr().to_string())
                .unwrap_or_else(|| "none".to_string()),
            limit
                .map(|limit| limit.to_string())
                .unwrap_or_else(|| "none".to_string()),
        );

        Ok(ScanOptions {
            dataset_schema: Arc::new(schema.clone()),
            projection,
            projected_schema: Arc::new(projected_schema),
            output_schema,
            filter,
            read_mask,
            limit,
            offset,
            batch_size,
            batch_readahead,
            bindings,
        })
    }

    /// Finishes the options and returns a [`Scanner`] over the dataset.
    pub fn build(&self) -> QuiverResult<Scanner> {
        let scanner = Scanner::new(self.dataset.clone(), self.finish()?);
        Ok(match &self.executor {
            None => scanner,
            Some(executor) => scanner.with_executor(executor.clone()),
        })
    }
}

/// Rejects filters over unregistered extension types and checks the filter against the storage
/// types it is evaluated on.
fn check_filter(
    filter: &BoundExpr,
    schema: &StructDType,
    bindings: &ExtensionBindings,
) -> QuiverResult<()> {
    for reference in filter.references() {
        if let Some(ext) = bindings.unbound(reference.dtype()).first() {
            quiver_bail!(
                "filter {} reads {} through extension type {}, which is not registered",
                filter.expr(),
                reference.path(),
                ext.id()
            );
        }
    }
    filter.check_predicate(&bindings.storage_schema(schema))
}

fn non_negative(value: i64) -> QuiverResult<usize> {
    usize::try_from(value).map_err(|_| QuiverError::InvalidLimit(value))
}

fn positive(value: i64) -> QuiverResult<usize> {
    usize::try_from(value)
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| QuiverError::InvalidBatchSize(value))
}
