use tablehop_e2e::harness;

/// Parquet -> PostgreSQL -> chunked read: R rows in, R rows out, same
/// lower-cased columns.
#[tokio::test]
async fn parquet_to_postgres_to_chunks() {
    let context = harness::bootstrap().await.expect("bootstrap");
    let schema = context.allocate_schema("round_trip").await.expect("schema");
    let file = harness::write_parquet(1_750, 600).expect("parquet");

    context
        .ingest_parquet(file.path(), &schema, "raw_trips", 400)
        .await
        .expect("ingest");
    let (summary, warehouse) = context
        .export_query(
            &format!("SELECT * FROM \"{schema}\".raw_trips"),
            1_000,
            "ny_taxi.raw_trips",
        )
        .await
        .expect("export");

    assert_eq!(summary.rows_loaded, 1_750);
    assert_eq!(summary.chunks, 2);
    assert_eq!(warehouse.table_rows("ny_taxi.raw_trips"), 1_750);
    assert_eq!(
        context.column_names(&schema, "raw_trips").await.expect("columns"),
        vec![
            "vendorid",
            "tpep_pickup_datetime",
            "trip_distance",
            "store_and_fwd_flag"
        ]
    );
    context.drop_schema(&schema).await.expect("cleanup");
}
