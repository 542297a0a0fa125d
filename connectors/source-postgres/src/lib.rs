//! PostgreSQL source for the export hop: one bounded query read through a
//! server-side cursor, page by page.

pub mod cursor;
pub mod encode;
pub mod query;
pub mod types;

pub use cursor::PostgresCursor;
