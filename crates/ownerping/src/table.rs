use crate::error::TableError;

const HANDLE_COLUMN: &str = "gh-username";
const ID_COLUMN: &str = "wso2-id";

/// One row of the user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMapping {
    pub external_handle: String,
    /// `None` when the row is short or the cell is empty.
    pub internal_id: Option<String>,
    /// 1-based line in the source, for error messages.
    pub line: u64,
}

/// Rows in file order. Handles are expected to be unique but this is not enforced.
#[derive(Debug, Default)]
pub struct UserMappingTable {
    rows: Vec<UserMapping>,
}

impl UserMappingTable {
    /// Parse CSV with a header row. Columns other than `gh-username` and
    /// `wso2-id` are ignored, and rows may have fewer fields than the header:
    /// a broken row only matters if it is the one looked up.
    pub fn from_csv(data: &[u8]) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(TableError::MissingColumn(name))
        };
        let handle_at = column(HANDLE_COLUMN)?;
        let id_at = column(ID_COLUMN)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let Some(handle) = record.get(handle_at) else {
                continue;
            };
            rows.push(UserMapping {
                external_handle: handle.to_string(),
                internal_id: record
                    .get(id_at)
                    .filter(|id| !id.trim().is_empty())
                    .map(str::to_string),
                line: record.position().map_or(0, |pos| pos.line()),
            });
        }
        Ok(Self { rows })
    }

    /// Internal id of the first row whose handle equals `handle` exactly.
    pub fn lookup(&self, handle: &str) -> Result<&str, TableError> {
        let row = self
            .rows
            .iter()
            .find(|row| row.external_handle == handle)
            .ok_or_else(|| TableError::OwnerNotFound(handle.to_string()))?;
        row.internal_id
            .as_deref()
            .ok_or_else(|| TableError::IncompleteRow {
                handle: handle.to_string(),
                line: row.line,
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
