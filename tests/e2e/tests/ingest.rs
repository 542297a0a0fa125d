use tablehop_e2e::harness;

#[tokio::test]
async fn parquet_ingest_lowercases_columns_and_counts_rows() {
    let context = harness::bootstrap().await.expect("bootstrap");
    let schema = context.allocate_schema("ingest_basic").await.expect("schema");
    let file = harness::write_parquet(2_500, 1_200).expect("parquet");

    let summary = context
        .ingest_parquet(file.path(), &schema, "raw_yellow_taxi_data", 1_000)
        .await
        .expect("ingest");
    assert_eq!(summary.row_groups, 3);
    assert_eq!(summary.batches, 5);
    assert_eq!(summary.rows_written, 2_500);

    assert_eq!(
        context
            .count_rows(&schema, "raw_yellow_taxi_data")
            .await
            .expect("count"),
        2_500
    );
    assert_eq!(
        context
            .column_names(&schema, "raw_yellow_taxi_data")
            .await
            .expect("columns"),
        vec![
            "vendorid",
            "tpep_pickup_datetime",
            "trip_distance",
            "store_and_fwd_flag"
        ]
    );

    context.drop_schema(&schema).await.expect("cleanup");
}

#[tokio::test]
async fn rerun_replaces_the_table() {
    let context = harness::bootstrap().await.expect("bootstrap");
    let schema = context.allocate_schema("ingest_rerun").await.expect("schema");

    let first = harness::write_parquet(800, 500).expect("parquet");
    context
        .ingest_parquet(first.path(), &schema, "trips", 300)
        .await
        .expect("first ingest");
    let second = harness::write_parquet(120, 500).expect("parquet");
    context
        .ingest_parquet(second.path(), &schema, "trips", 300)
        .await
        .expect("second ingest");

    assert_eq!(context.count_rows(&schema, "trips").await.expect("count"), 120);
    context.drop_schema(&schema).await.expect("cleanup");
}

#[tokio::test]
async fn empty_parquet_still_creates_table() {
    let context = harness::bootstrap().await.expect("bootstrap");
    let schema = context.allocate_schema("ingest_empty").await.expect("schema");
    let file = harness::write_parquet(0, 100).expect("parquet");

    let summary = context
        .ingest_parquet(file.path(), &schema, "trips", 100)
        .await
        .expect("ingest");
    assert_eq!(summary.rows_written, 0);
    assert_eq!(context.count_rows(&schema, "trips").await.expect("count"), 0);
    assert_eq!(
        context.column_names(&schema, "trips").await.expect("columns").len(),
        4
    );
    context.drop_schema(&schema).await.expect("cleanup");
}
