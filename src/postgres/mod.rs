// ABOUTME: PostgreSQL access module
// ABOUTME: Exports the session and cursor handles plus extension-catalog helpers

pub mod connection;
pub mod cursor;
pub mod extensions;

pub use connection::{connect, Connection};
pub use cursor::{Cursor, CursorState, ResultSet, Row};
pub use extensions::{
    installed_extension_names, missing_extensions, EXTENSION_CATALOG_QUERY, EXTENSION_NAME_COLUMN,
};
