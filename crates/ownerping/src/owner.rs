use std::fs;
use std::path::Path;

use crate::error::OwnerError;

/// Read the ownership file and return the handle of the catch-all owner.
pub fn resolve_owner(path: &Path) -> Result<String, OwnerError> {
    let contents = fs::read_to_string(path).map_err(|source| OwnerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let owner = parse_owner(&contents)?;
    tracing::debug!(%owner, path = %path.display(), "resolved code owner");
    Ok(owner)
}

/// Extract the owner from a `* @<owner>` line.
///
/// Takes the text following the first `*` up to the end of its line, then
/// keeps whatever follows the last `@`. With several owners on the line the
/// last one wins.
pub fn parse_owner(contents: &str) -> Result<String, OwnerError> {
    let (_, rest) = contents
        .split_once('*')
        .ok_or(OwnerError::MissingWildcard)?;
    let entry = rest.lines().next().unwrap_or_default();

    let (_, handle) = entry.rsplit_once('@').ok_or(OwnerError::MissingHandle)?;
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(OwnerError::EmptyHandle);
    }
    Ok(handle.to_string())
}
