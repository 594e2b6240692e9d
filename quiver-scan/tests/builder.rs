mod common;

use std::sync::Arc;

use arrow_schema::{DataType, Field, Fields, Schema};
use common::{builder, nested, numbers, points};
use quiver_dtype::{DType, ExtDType, ExtID, ExtensionRegistry, Nullability, PType};
use quiver_error::QuiverError;
use quiver_expr::{col, eq, gt, lit};
use quiver_scan::{DEFAULT_BATCH_READAHEAD, DEFAULT_BATCH_SIZE, InMemoryDataset, ScanBuilder};
use rstest::rstest;

#[test]
fn defaults() {
    let options = builder(numbers(&[10])).finish().unwrap();
    assert_eq!(options.batch_size(), DEFAULT_BATCH_SIZE);
    assert_eq!(options.batch_readahead(), DEFAULT_BATCH_READAHEAD);
    assert_eq!(options.limit(), None);
    assert_eq!(options.offset(), 0);
    assert!(options.filter().is_none());
    assert!(options.projection().is_all());
    assert_eq!(options.projected_schema(), options.dataset_schema());
    assert_eq!(options.output_schema().fields().len(), 2);
}

#[test]
fn limit_sizes_the_batches() {
    let options = builder(numbers(&[10])).limit(10).finish().unwrap();
    assert_eq!(options.limit(), Some(10));
    assert_eq!(options.batch_size(), 10);
    assert_eq!(options.batch_readahead(), 1);

    let options = builder(numbers(&[10]))
        .limit(10)
        .offset(5)
        .finish()
        .unwrap();
    assert_eq!(options.batch_size(), 15);
}

#[test]
fn explicit_settings_win_over_the_limit() {
    let options = builder(numbers(&[10]))
        .batch_size(3)
        .batch_readahead(4)
        .limit(10)
        .finish()
        .unwrap();
    assert_eq!(options.batch_size(), 3);
    assert_eq!(options.batch_readahead(), 4);
}

#[test]
fn zero_limit_keeps_the_default_batch_size() {
    let options = builder(numbers(&[10])).limit(0).finish().unwrap();
    assert_eq!(options.limit(), Some(0));
    assert_eq!(options.batch_size(), DEFAULT_BATCH_SIZE);
}

#[test]
fn zero_readahead_is_raised_to_one() {
    let options = builder(numbers(&[10])).batch_readahead(0).finish().unwrap();
    assert_eq!(options.batch_readahead(), 1);
}

#[rstest]
#[case(-1)]
#[case(i64::MIN)]
fn negative_limit_is_rejected(#[case] limit: i64) {
    let err = builder(numbers(&[10])).limit(limit).finish().unwrap_err();
    assert!(matches!(err, QuiverError::InvalidLimit(value) if value == limit));
}

#[test]
fn negative_offset_is_rejected() {
    let err = builder(numbers(&[10])).offset(-3).finish().unwrap_err();
    assert!(matches!(err, QuiverError::InvalidLimit(-3)));
}

#[rstest]
#[case(0)]
#[case(-5)]
fn non_positive_batch_size_is_rejected(#[case] batch_size: i64) {
    let err = builder(numbers(&[10]))
        .batch_size(batch_size)
        .finish()
        .unwrap_err();
    assert!(matches!(err, QuiverError::InvalidBatchSize(value) if value == batch_size));
}

#[test]
fn empty_projection_is_rejected() {
    let err = builder(numbers(&[10]))
        .project(&[] as &[&str])
        .finish()
        .unwrap_err();
    assert!(matches!(err, QuiverError::EmptyProjection));
}

#[test]
fn unknown_projection_is_rejected() {
    let err = builder(nested())
        .project(&["objects.weight"])
        .finish()
        .unwrap_err();
    assert!(matches!(err, QuiverError::FieldNotFound { .. }));
}

#[test]
fn unknown_filter_column_is_rejected() {
    let err = builder(numbers(&[10]))
        .filter(gt(col("missing"), lit(1)))
        .finish()
        .unwrap_err();
    assert!(matches!(err, QuiverError::FieldNotFound { .. }));
}

#[test]
fn dotted_names_may_be_ambiguous() {
    let inner = Fields::from(vec![Field::new("b", DataType::Int32, false)]);
    let schema = Arc::new(Schema::new(vec![
        Field::new("a.b", DataType::Int32, false),
        Field::new("a", DataType::Struct(inner), false),
    ]));
    let dataset = Arc::new(InMemoryDataset::try_new(schema, vec![]).unwrap());

    let err = builder(dataset.clone())
        .project(&["a.b"])
        .finish()
        .unwrap_err();
    let QuiverError::AmbiguousField { matches, .. } = err else {
        panic!("expected an ambiguous field");
    };
    assert_eq!(matches.len(), 2);

    let options = builder(dataset.clone())
        .filter(eq(col(0_usize), lit(1)))
        .finish()
        .unwrap();
    assert_eq!(options.filter().unwrap().references()[0].indices(), &[0]);

    let options = builder(dataset).project(&["a"]).finish().unwrap();
    assert_eq!(options.projected_schema().nfields(), 1);
}

#[test]
fn projection_follows_schema_order() {
    let options = builder(nested())
        .project(&["objects.label", "id", "objects.val"])
        .finish()
        .unwrap();
    let schema = options.output_schema();
    assert_eq!(schema.field(0).name(), "id");
    let DataType::List(item) = schema.field(1).data_type() else {
        panic!("objects should stay a list");
    };
    let DataType::Struct(children) = item.data_type() else {
        panic!("list items should stay structs");
    };
    let names: Vec<_> = children.iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["val", "label"]);
}

#[test]
fn filter_columns_are_read_but_not_emitted() {
    let options = builder(numbers(&[10]))
        .project(&["value"])
        .filter(gt(col("id"), lit(5)))
        .finish()
        .unwrap();
    assert_eq!(options.projection().selected(2), vec![1]);
    assert_eq!(options.read_mask().selected(2), vec![0, 1]);
    assert_eq!(options.output_schema().fields().len(), 1);
    assert_eq!(options.filter().unwrap().references().len(), 1);
}

#[test]
fn non_predicate_filter_is_rejected() {
    let err = builder(numbers(&[10]))
        .filter(col("value"))
        .finish()
        .unwrap_err();
    assert!(matches!(
        err.root_cause(),
        QuiverError::MismatchedTypes(..)
    ));
}

#[test]
fn finish_is_repeatable() {
    let mut scan = builder(numbers(&[10]));
    scan.project(&["id"]).limit(4);
    let first = scan.finish().unwrap();
    let second = scan.finish().unwrap();
    assert_eq!(first.output_schema(), second.output_schema());
    assert_eq!(first.projection(), second.projection());
    assert_eq!(first.batch_size(), second.batch_size());
}

#[test]
fn builder_is_usable_after_a_failure() {
    let mut scan = builder(numbers(&[10]));
    scan.project(&["nope"]);
    assert!(scan.finish().is_err());

    scan.project(&["value"]).batch_size(2);
    let scanner = scan.build().unwrap();
    assert_eq!(scanner.batch_size(), 2);
    assert_eq!(scanner.count_rows().unwrap(), 10);
}

#[test]
fn setter_order_does_not_matter() {
    let a = builder(numbers(&[10]))
        .limit(3)
        .project(&["id"])
        .filter(gt(col("value"), lit(10_i64)))
        .finish()
        .unwrap();
    let b = builder(numbers(&[10]))
        .filter(gt(col("value"), lit(10_i64)))
        .project(&["id"])
        .limit(3)
        .finish()
        .unwrap();
    assert_eq!(a.output_schema(), b.output_schema());
    assert_eq!(a.read_mask(), b.read_mask());
    assert_eq!(a.batch_size(), b.batch_size());
}

fn point_type(storage: PType) -> Arc<ExtDType> {
    Arc::new(ExtDType::new(
        ExtID::from("test.point"),
        Arc::new(DType::from(storage)),
        None,
    ))
}

#[test]
fn conflicting_registration_fails_at_finish() {
    let registry = Arc::new(ExtensionRegistry::new());
    registry
        .register(Arc::new(ExtDType::new(
            ExtID::from("test.point"),
            Arc::new(DType::Utf8(Nullability::NonNullable)),
            None,
        )))
        .unwrap();
    let err = ScanBuilder::new(points(), registry.clone())
        .finish()
        .unwrap_err();
    assert!(matches!(err, QuiverError::ExtensionTypeConflict { .. }));

    // Columns outside the scan are not bound.
    let options = ScanBuilder::new(points(), registry)
        .project(&["c1"])
        .finish()
        .unwrap();
    assert!(options.bindings().is_empty());
}

#[test]
fn bindings_snapshot_the_registry() {
    let registry = Arc::new(ExtensionRegistry::new());
    registry.register(point_type(PType::I32)).unwrap();
    let options = ScanBuilder::new(points(), registry.clone())
        .finish()
        .unwrap();
    assert_eq!(options.bindings().len(), 1);

    registry.unregister(&ExtID::from("test.point"));
    assert_eq!(options.bindings().len(), 1);
    assert!(
        options
            .output_schema()
            .field(1)
            .metadata()
            .contains_key(quiver_dtype::arrow::EXTENSION_NAME_KEY)
    );
}

#[test]
fn filter_on_unregistered_extension_is_rejected() {
    let err = builder(points())
        .filter(eq(col("c2"), lit(6)))
        .finish()
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("c2") && message.contains("test.point"), "{err}");

    // Projecting the column alone is still allowed.
    assert!(builder(points()).project(&["c2"]).finish().is_ok());
}

#[test]
fn filter_on_registered_extension_is_checked_against_storage() {
    let registry = Arc::new(ExtensionRegistry::new());
    registry.register(point_type(PType::I32)).unwrap();

    let options = ScanBuilder::new(points(), registry.clone())
        .project(&["c1"])
        .filter(eq(col("c2"), lit(6)))
        .finish()
        .unwrap();
    assert_eq!(options.bindings().len(), 1);

    let err = ScanBuilder::new(points(), registry)
        .filter(col("c2"))
        .finish()
        .unwrap_err();
    assert!(matches!(err.root_cause(), QuiverError::MismatchedTypes(..)), "{err}");
}

#[test]
fn nested_output_schema() {
    let options = builder(nested()).project(&["objects.val"]).finish().unwrap();
    let item = Field::new(
        "item",
        DataType::Struct(vec![Field::new("val", DataType::Int64, false)].into()),
        true,
    );
    assert_eq!(
        options.output_schema().as_ref(),
        &Schema::new(vec![Field::new("objects", DataType::List(Arc::new(item)), true)])
    );
}
