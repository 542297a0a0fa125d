//! Multi-value INSERT append path.

use std::fmt::Write as _;

use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use pg_escape::quote_identifier;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

use tablehop_types::error::{Result, TransferError};

use crate::client::format_pg_error;
use crate::typed_col::{prepare_column, sql_param_value, SqlParamValue, TypedCol};

/// Upper bound on rows per INSERT statement.
pub const INSERT_CHUNK_SIZE: usize = 1000;

/// PostgreSQL's limit on bind parameters per statement.
const MAX_BIND_PARAMS: usize = 65_535;

/// Rows per statement for a table of `columns` columns.
pub fn rows_per_statement(columns: usize) -> usize {
    if columns == 0 {
        return INSERT_CHUNK_SIZE;
    }
    (MAX_BIND_PARAMS / columns).clamp(1, INSERT_CHUNK_SIZE)
}

/// `INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)` for `rows` rows.
pub fn build_insert_sql(qualified: &str, columns: &[&str], rows: usize) -> String {
    let col_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let header = format!("INSERT INTO {qualified} ({col_list}) VALUES ");
    let mut sql = String::with_capacity(header.len() + rows * columns.len() * 6);
    sql.push_str(&header);

    let mut param = 0usize;
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for pos in 0..columns.len() {
            if pos > 0 {
                sql.push_str(", ");
            }
            param += 1;
            let _ = write!(sql, "${param}");
        }
        sql.push(')');
    }
    sql
}

/// Append every row of `batch` to `qualified`, returning rows inserted.
///
/// Statements run one after another without a surrounding transaction; on
/// failure the statements already executed stay committed.
pub async fn insert_batch(client: &Client, qualified: &str, batch: &RecordBatch) -> Result<u64> {
    let num_rows = batch.num_rows();
    if num_rows == 0 {
        return Ok(0);
    }

    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let prepared: Vec<ArrayRef> = names
        .iter()
        .zip(batch.columns())
        .map(|(name, col)| prepare_column(name, col))
        .collect::<Result<_>>()?;
    let typed: Vec<TypedCol<'_>> = names
        .iter()
        .zip(&prepared)
        .map(|(name, col)| TypedCol::from_array(name, col))
        .collect::<Result<_>>()?;

    let step = rows_per_statement(names.len());
    let mut written = 0u64;

    for start in (0..num_rows).step_by(step) {
        let end = (start + step).min(num_rows);
        let sql = build_insert_sql(qualified, &names, end - start);

        let params: Vec<SqlParamValue<'_>> = (start..end)
            .flat_map(|row| typed.iter().map(move |col| sql_param_value(col, row)))
            .collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(SqlParamValue::as_tosql).collect();

        client.execute(&sql, &param_refs).await.map_err(|e| {
            TransferError::write(
                "INSERT_FAILED",
                format_pg_error(
                    &format!("INSERT into {qualified} failed for rows {start}-{end}"),
                    &e,
                ),
            )
            .with_rows_written(written)
        })?;
        written += (end - start) as u64;
    }

    tracing::debug!(table = %qualified, rows = written, "Rows inserted");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_has_one_placeholder_per_cell() {
        let sql = build_insert_sql("public.trips", &["vendorid", "fare_amount"], 2);
        assert_eq!(
            sql,
            "INSERT INTO public.trips (vendorid, fare_amount) VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn rows_per_statement_respects_bind_limit() {
        assert_eq!(rows_per_statement(19), 1000);
        assert_eq!(rows_per_statement(100), 655);
        assert_eq!(rows_per_statement(70_000), 1);
        assert_eq!(rows_per_statement(0), 1000);
    }
}
