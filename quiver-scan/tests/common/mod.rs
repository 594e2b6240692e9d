#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::{
    ArrayRef, Int32Array, Int64Array, ListArray, RecordBatch, StringArray, StructArray,
};
use arrow_buffer::OffsetBuffer;
use arrow_schema::{DataType, Field, Fields, Schema, SchemaRef};
use quiver_dtype::ExtensionRegistry;
use quiver_dtype::arrow::EXTENSION_NAME_KEY;
use quiver_scan::{InMemoryDataset, ScanBuilder};

/// `{id: i32, value: i64}` where `value = 10 * id`, with ids counting up from `0` across fragments
/// of the given sizes.
pub fn numbers(fragment_sizes: &[usize]) -> Arc<InMemoryDataset> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("value", DataType::Int64, false),
    ]));
    let mut next = 0_i32;
    let batches = fragment_sizes
        .iter()
        .map(|size| {
            let ids: Vec<i32> = (0..*size)
                .map(|_| {
                    next += 1;
                    next - 1
                })
                .collect();
            let values: Vec<i64> = ids.iter().map(|id| i64::from(*id) * 10).collect();
            RecordBatch::try_new(
                schema.clone(),
                vec![
                    Arc::new(Int32Array::from(ids)) as ArrayRef,
                    Arc::new(Int64Array::from(values)),
                ],
            )
            .unwrap()
        })
        .collect();
    Arc::new(InMemoryDataset::try_new(schema, batches).unwrap())
}

pub fn object_fields() -> Fields {
    Fields::from(vec![
        Field::new("val", DataType::Int64, false),
        Field::new("id", DataType::Int32, false),
        Field::new("label", DataType::Utf8, false),
    ])
}

pub fn nested_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new(
            "objects",
            DataType::List(Arc::new(Field::new(
                "item",
                DataType::Struct(object_fields()),
                true,
            ))),
            true,
        ),
    ]))
}

/// `{id: i32, objects: list<{val: i64, id: i32, label: utf8}>}` with three rows holding two, one
/// and two objects.
pub fn nested() -> Arc<InMemoryDataset> {
    let objects = StructArray::new(
        object_fields(),
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])) as ArrayRef,
            Arc::new(Int32Array::from(vec![10, 20, 30, 40, 50])),
            Arc::new(StringArray::from(vec!["a", "b", "c", "d", "e"])),
        ],
        None,
    );
    let schema = nested_schema();
    let DataType::List(item) = schema.field(1).data_type().clone() else {
        unreachable!()
    };
    let list = ListArray::new(
        item,
        OffsetBuffer::from_lengths([2, 1, 2]),
        Arc::new(objects),
        None,
    );
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(Int32Array::from(vec![1, 2, 3])), Arc::new(list)],
    )
    .unwrap();
    Arc::new(InMemoryDataset::try_new(schema, vec![batch]).unwrap())
}

pub fn point_field(name: &str) -> Field {
    Field::new(name, DataType::Int32, false).with_metadata(HashMap::from([(
        EXTENSION_NAME_KEY.to_string(),
        "test.point".to_string(),
    )]))
}

/// `{c1: i32, c2: ext(test.point, i32)}` with four rows.
pub fn points() -> Arc<InMemoryDataset> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("c1", DataType::Int32, false),
        point_field("c2"),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(vec![1, 2, 3, 4])) as ArrayRef,
            Arc::new(Int32Array::from(vec![5, 6, 7, 8])),
        ],
    )
    .unwrap();
    Arc::new(InMemoryDataset::try_new(schema, vec![batch]).unwrap())
}

pub fn builder(dataset: Arc<InMemoryDataset>) -> ScanBuilder {
    ScanBuilder::new(dataset, Arc::new(ExtensionRegistry::new()))
}
