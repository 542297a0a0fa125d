//! Destination table replacement.

use arrow::datatypes::Schema;
use pg_escape::quote_identifier;
use tokio_postgres::Client;

use tablehop_types::error::{Result, TransferError};

use crate::client::format_pg_error;
use crate::type_map::arrow_to_pg_type;

/// `"schema"."table"`, each part quoted only when needed.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

/// `CREATE TABLE` statement for `schema`. Every column is nullable.
pub fn create_table_sql(qualified: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| {
            format!(
                "{} {}",
                quote_identifier(f.name()),
                arrow_to_pg_type(f.data_type())
            )
        })
        .collect();
    format!("CREATE TABLE {qualified} ({})", columns.join(", "))
}

/// Drop `qualified` if present and recreate it from `schema`, atomically.
pub async fn replace_table(client: &Client, qualified: &str, schema: &Schema) -> Result<()> {
    if schema.fields().is_empty() {
        return Err(TransferError::schema(
            "EMPTY_SCHEMA",
            format!("cannot create {qualified} without columns"),
        ));
    }
    let create = create_table_sql(qualified, schema);
    let sql = format!("BEGIN; DROP TABLE IF EXISTS {qualified}; {create}; COMMIT;");
    tracing::debug!(ddl = %create, "Replacing destination table");

    if let Err(e) = client.batch_execute(&sql).await {
        // best effort; the session may already be gone
        let _ = client.batch_execute("ROLLBACK").await;
        return Err(TransferError::schema(
            "REPLACE_TABLE_FAILED",
            format_pg_error(&format!("failed to replace {qualified}"), &e),
        ));
    }
    Ok(())
}
