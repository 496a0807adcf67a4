//! Recipient source: typed rows read once, in file order.

use std::path::Path;

use ahash::AHashMap;

use crate::error::EngineError;

/// One recipient row: the address plus every named field from the CSV
/// header, available to subject/body templates.
#[derive(Debug, Clone)]
pub struct RecipientRow {
    pub email: String,
    pub fields: AHashMap<String, String>,
}

impl RecipientRow {
    /// The row's `attachment_path` field, if non-blank.
    #[must_use]
    pub fn attachment_path(&self) -> Option<&str> {
        self.fields
            .get("attachment_path")
            .map(String::as_str)
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }
}

/// Load the full recipient sequence from `recipients.csv`.
///
/// The header row names the fields; rows with a blank `email` are dropped
/// here so the runner only ever sees addressable recipients. A missing
/// file is fatal at startup.
///
/// # Errors
/// Returns [`EngineError::Recipients`] if the file is missing or a record
/// is malformed.
pub fn load_recipients(path: &Path) -> Result<Vec<RecipientRow>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| EngineError::Recipients(format!("{}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| EngineError::Recipients(format!("{}: {e}", path.display())))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| EngineError::Recipients(format!("{}: {e}", path.display())))?;

        let fields: AHashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let email = fields.get("email").map(String::as_str).unwrap_or_default();
        if email.is_empty() {
            tracing::debug!("Skipping recipient row with blank address");
            continue;
        }

        rows.push(RecipientRow {
            email: email.to_string(),
            fields,
        });
    }

    Ok(rows)
}
