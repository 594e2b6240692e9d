//! Restores the logical type tags of extension columns on batches read as storage.
//!
//! Arrow carries extension types as metadata on the fields that hold them, so tagging a nested
//! column means rebuilding every struct and list on the way down with the tagged child fields.

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, ListArray, RecordBatch, RecordBatchOptions, StructArray};
use arrow_schema::{DataType, SchemaRef};
use itertools::Itertools;
use quiver_error::{QuiverResult, quiver_bail, quiver_err};

/// Rebuilds the columns of `batch` with the field types of `schema`.
pub fn wrap_batch(batch: &RecordBatch, schema: &SchemaRef) -> QuiverResult<RecordBatch> {
    if batch.num_columns() != schema.fields().len() {
        quiver_bail!(
            "a batch with {} columns cannot carry a schema of {} fields",
            batch.num_columns(),
            schema.fields().len()
        );
    }

    let columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .zip(schema.fields())
        .map(|(column, field)| wrap_array(column, field.data_type()))
        .try_collect()?;
    Ok(RecordBatch::try_new_with_options(
        schema.clone(),
        columns,
        &RecordBatchOptions::new().with_row_count(Some(batch.num_rows())),
    )?)
}

/// Rebuilds `array` as an array of `data_type`, which may only differ from the type of `array` in
/// the metadata of nested fields.
pub fn wrap_array(array: &ArrayRef, data_type: &DataType) -> QuiverResult<ArrayRef> {
    if array.data_type() == data_type {
        return Ok(array.clone());
    }

    match data_type {
        DataType::Struct(fields) => {
            let st = array
                .as_struct_opt()
                .ok_or_else(|| quiver_err!(MismatchedTypes: data_type, array.data_type()))?;
            let columns: Vec<ArrayRef> = st
                .columns()
                .iter()
                .zip(fields.iter())
                .map(|(column, field)| wrap_array(column, field.data_type()))
                .try_collect()?;
            Ok(Arc::new(StructArray::try_new(
                fields.clone(),
                columns,
                st.nulls().cloned(),
            )?))
        }
        DataType::List(element) => {
            let list = array
                .as_list_opt::<i32>()
                .ok_or_else(|| quiver_err!(MismatchedTypes: data_type, array.data_type()))?;
            let values = wrap_array(list.values(), element.data_type())?;
            Ok(Arc::new(ListArray::try_new(
                element.clone(),
                list.offsets().clone(),
                values,
                list.nulls().cloned(),
            )?))
        }
        _ => Err(quiver_err!(MismatchedTypes: data_type, array.data_type())),
    }
}
