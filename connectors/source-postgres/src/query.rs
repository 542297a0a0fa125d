//! SELECT rewriting for columns without a native decoder.

use pg_escape::quote_identifier;

use crate::types::Column;

/// Strip trailing whitespace and semicolons so the text can be nested.
pub fn normalize_query(query: &str) -> &str {
    query.trim().trim_end_matches(';').trim_end()
}

/// `query` itself when every column decodes natively, otherwise an outer
/// SELECT that casts the columns which do not.
///
/// The subquery's columns are renamed by position, so result sets with
/// duplicate output names still resolve.
pub fn export_select(query: &str, columns: &[Column]) -> String {
    let query = normalize_query(query);
    if columns.iter().all(|c| c.cast.is_none()) {
        return query.to_string();
    }
    let aliases: Vec<String> = (1..=columns.len()).map(|i| format!("c{i}")).collect();
    let list: Vec<String> = columns
        .iter()
        .zip(&aliases)
        .map(|(c, alias)| {
            let ident = quote_identifier(&c.name).to_string();
            match c.cast {
                Some(cast) => format!("{alias}::{cast} AS {ident}"),
                None => format!("{alias} AS {ident}"),
            }
        })
        .collect();
    format!(
        "SELECT {} FROM ({query}) AS export_src({})",
        list.join(", "),
        aliases.join(", ")
    )
}
