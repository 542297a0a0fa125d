#[tokio::test]
async fn harness_bootstrap_exposes_postgres_port() {
    let context = tablehop_e2e::harness::bootstrap()
        .await
        .expect("bootstrap must initialize test harness");

    assert!(context.postgres_port > 0);
    let client = context.connect().await.expect("connect");
    dest_postgres::check(&client).await.expect("SELECT 1");
}
