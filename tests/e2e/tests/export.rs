use tablehop_e2e::harness;
use tablehop_engine::WriteDisposition;

#[tokio::test]
async fn cursor_pages_into_contiguous_chunks() {
    let context = harness::bootstrap().await.expect("bootstrap");
    let schema = context.allocate_schema("export_chunks").await.expect("schema");
    let client = context.connect().await.expect("connect");
    client
        .batch_execute(&format!(
            "CREATE TABLE \"{schema}\".fact_trips AS
             SELECT g AS trip_id,
                    (g * 1.25)::numeric(12, 2) AS total_amount,
                    (g * 0.5)::numeric::money AS tip_amount,
                    gen_random_uuid() AS trip_uuid,
                    now()::timestamptz AS loaded_at
             FROM generate_series(1, 1200) AS g"
        ))
        .await
        .expect("seed");

    let (summary, warehouse) = context
        .export_query(
            &format!("SELECT * FROM \"{schema}\".fact_trips ORDER BY trip_id;"),
            500,
            "ny_taxi.fact_trips",
        )
        .await
        .expect("export");

    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.rows_loaded, 1_200);
    let sizes: Vec<usize> = warehouse.jobs().iter().map(|j| j.rows).collect();
    assert_eq!(sizes, vec![500, 500, 200]);
    assert_eq!(
        warehouse.dispositions(),
        vec![
            WriteDisposition::Truncate,
            WriteDisposition::Append,
            WriteDisposition::Append
        ]
    );
    assert_eq!(warehouse.table_rows("ny_taxi.fact_trips"), 1_200);

    // the export transaction is closed: the session accepts new work
    client.batch_execute("SELECT 1").await.expect("session usable");
    context.drop_schema(&schema).await.expect("cleanup");
}

#[tokio::test]
async fn duplicate_output_names_still_export() {
    let context = harness::bootstrap().await.expect("bootstrap");
    let (summary, warehouse) = context
        .export_query("SELECT 1 AS id, 2 AS id, gen_random_uuid() AS u", 10, "ds.t")
        .await
        .expect("export");
    assert_eq!(summary.rows_loaded, 1);
    assert_eq!(warehouse.table_rows("ds.t"), 1);
}

#[tokio::test]
async fn empty_result_submits_no_job() {
    let context = harness::bootstrap().await.expect("bootstrap");
    let (summary, warehouse) = context
        .export_query("SELECT 1 AS n WHERE false", 100, "ds.empty")
        .await
        .expect("export");
    assert_eq!(summary.chunks, 0);
    assert!(warehouse.jobs().is_empty());
}

#[tokio::test]
async fn invalid_query_is_read_failure() {
    let context = harness::bootstrap().await.expect("bootstrap");
    let err = context
        .export_query("SELECT * FROM no_such_table_anywhere", 100, "ds.t")
        .await
        .unwrap_err();
    let transfer = err
        .downcast_ref::<tablehop_engine::TransferError>()
        .expect("transfer error");
    assert_eq!(transfer.category, tablehop_types::ErrorCategory::Read);
}
