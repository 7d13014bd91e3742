//! Collection name checks applied before the MongoDB connector hands out a
//! collection handle.

use crate::{BasiliskError, Result};

/// MongoDB limit on `<database>.<collection>`, in bytes
const MAX_NAMESPACE_LENGTH: usize = 255;

/// Check that `collection` is a name the server accepts inside `database`.
///
/// # Errors
/// `Validation` if the name is empty, holds a NUL byte or `$`, addresses a
/// `system.` collection, or makes the namespace longer than 255 bytes.
pub fn validate_collection_name(database: &str, collection: &str) -> Result<()> {
    let reason = if collection.is_empty() {
        "must not be empty"
    } else if collection.contains('\0') {
        "must not contain NUL bytes"
    } else if collection.contains('$') {
        "must not contain '$'"
    } else if collection.starts_with("system.") {
        "'system.' collections are reserved"
    } else if database.len() + 1 + collection.len() > MAX_NAMESPACE_LENGTH {
        "namespace exceeds 255 bytes"
    } else {
        return Ok(());
    };

    Err(BasiliskError::Validation(format!(
        "Invalid collection name '{}': {}",
        collection.escape_default(),
        reason
    )))
}
