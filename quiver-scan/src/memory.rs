//! A [`Dataset`] over record batches held in memory, one fragment per batch.

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, ListArray, RecordBatch, RecordBatchOptions, StructArray};
use arrow_schema::{DataType, Field, FieldRef, Fields, Schema, SchemaRef};
use arrow_select::filter::filter_record_batch;
use futures::FutureExt;
use itertools::Itertools;
use quiver_dtype::arrow::TryFromArrowType;
use quiver_dtype::{ProjectionMask, StructDType};
use quiver_error::{QuiverError, QuiverResult, quiver_bail, quiver_err};
use quiver_expr::transform::bind::BoundExpr;

use crate::{Dataset, Fragment, FragmentRead, FragmentRef, ScanOptions};

pub struct InMemoryDataset {
    schema: StructDType,
    arrow_schema: SchemaRef,
    fragments: Vec<FragmentRef>,
}

impl InMemoryDataset {
    /// Creates a dataset of `batches`, which must all have the fields of `schema`.
    ///
    /// Extension types are declared through the `ARROW:extension:name` metadata of the fields.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> QuiverResult<Self> {
        let dtype = StructDType::try_from_arrow(schema.as_ref())?;
        for batch in &batches {
            if batch.schema_ref().fields() != schema.fields() {
                quiver_bail!(
                    "batch schema {} does not match dataset schema {}",
                    batch.schema_ref(),
                    schema
                );
            }
        }

        Ok(Self {
            schema: dtype,
            arrow_schema: schema,
            fragments: batches
                .into_iter()
                .map(|batch| Arc::new(MemoryFragment { batch }) as FragmentRef)
                .collect(),
        })
    }

    /// Creates a dataset with the schema of the first of `batches`.
    pub fn try_from_batches(batches: Vec<RecordBatch>) -> QuiverResult<Self> {
        let schema = batches
            .first()
            .map(RecordBatch::schema)
            .ok_or_else(|| quiver_err!("cannot infer a dataset schema without batches"))?;
        Self::try_new(schema, batches)
    }

    pub fn arrow_schema(&self) -> &SchemaRef {
        &self.arrow_schema
    }
}

impl Dataset for InMemoryDataset {
    fn schema(&self) -> &StructDType {
        &self.schema
    }

    fn fragments(&self) -> Vec<FragmentRef> {
        self.fragments.clone()
    }
}

struct MemoryFragment {
    batch: RecordBatch,
}

impl Fragment for MemoryFragment {
    fn read(&self, options: &ScanOptions) -> FragmentRead {
        let batch = self.batch.clone();
        let filter = options.filter().cloned();
        let projection = options.projection().clone();
        async move {
            let batch = match &filter {
                Some(filter) => filter_batch(&batch, filter)?,
                None => batch,
            };
            project_batch(&batch, &projection)
        }
        .boxed()
    }
}

fn filter_batch(batch: &RecordBatch, filter: &BoundExpr) -> QuiverResult<RecordBatch> {
    if filter.crosses_list() {
        quiver_bail!(
            "cannot evaluate filter {} per row, it reads values inside a list",
            filter.expr()
        );
    }

    let mask = filter
        .expr()
        .evaluate(batch)?
        .into_array(batch.num_rows())?;
    if mask.data_type() == &DataType::Null {
        return Ok(batch.slice(0, 0));
    }
    let mask = mask
        .as_boolean_opt()
        .ok_or_else(|| quiver_err!(MismatchedTypes: "bool", mask.data_type()))?;
    Ok(filter_record_batch(batch, mask)?)
}

/// Prunes the columns of `batch` down to the fields selected by `mask`.
fn project_batch(batch: &RecordBatch, mask: &ProjectionMask) -> QuiverResult<RecordBatch> {
    if mask.is_all() {
        return Ok(batch.clone());
    }

    let schema = batch.schema_ref();
    let mut fields = Vec::new();
    let mut columns = Vec::new();
    for index in mask.selected(batch.num_columns()) {
        let (Some(field), Some(child)) = (schema.fields().get(index), mask.child(index)) else {
            quiver_bail!(InvalidState: "projected column {index} is not in the batch");
        };
        let column = prune_array(batch.column(index), child)?;
        fields.push(with_type(field, column.data_type()));
        columns.push(column);
    }

    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &RecordBatchOptions::new().with_row_count(Some(batch.num_rows())),
    )?)
}

fn prune_array(array: &ArrayRef, mask: &ProjectionMask) -> QuiverResult<ArrayRef> {
    let ProjectionMask::Select(children) = mask else {
        return Ok(array.clone());
    };

    if let Some(st) = array.as_struct_opt() {
        let (fields, columns): (Vec<FieldRef>, Vec<ArrayRef>) = children
            .iter()
            .map(|(index, child)| {
                let field = st.fields().get(*index).ok_or_else(
                    || quiver_err!(InvalidState: "projected field {index} is not in the struct"),
                )?;
                let column = prune_array(st.column(*index), child)?;
                Ok::<_, QuiverError>((with_type(field, column.data_type()), column))
            })
            .process_results(|iter| iter.unzip())?;
        return Ok(Arc::new(StructArray::try_new(
            Fields::from(fields),
            columns,
            st.nulls().cloned(),
        )?));
    }

    if let (Some(list), DataType::List(element)) = (array.as_list_opt::<i32>(), array.data_type())
    {
        let element_mask = children
            .get(&0)
            .ok_or_else(|| quiver_err!(InvalidState: "a list projection must select its element"))?;
        let values = prune_array(list.values(), element_mask)?;
        return Ok(Arc::new(ListArray::try_new(
            with_type(element, values.data_type()),
            list.offsets().clone(),
            values,
            list.nulls().cloned(),
        )?));
    }

    quiver_bail!(InvalidState: "cannot select children of {}", array.data_type())
}

fn with_type(field: &FieldRef, data_type: &DataType) -> FieldRef {
    Arc::new(Field::clone(field).with_data_type(data_type.clone()))
}
