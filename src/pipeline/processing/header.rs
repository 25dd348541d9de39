use tracing::{debug, instrument};

use crate::constants::DEFAULT_MARKER_PHRASE;
use crate::error::{AuditError, Result};
use crate::types::RawSheet;

/// Finds the header row of an un-headered sheet by scanning for a marker phrase.
#[derive(Debug, Clone)]
pub struct HeaderLocator {
    marker: String,
    marker_lower: String,
}

impl HeaderLocator {
    pub fn new(marker: impl Into<String>) -> Self {
        let marker = marker.into();
        let marker_lower = marker.to_lowercase();
        Self {
            marker,
            marker_lower,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Index of the first row where any cell contains the marker, case-insensitively.
    /// Scan order is the only tie-break; there is no fallback to row 0.
    #[instrument(level = "debug", skip(self, sheet), fields(sheet = %sheet.name, rows = sheet.rows.len()))]
    pub fn locate(&self, sheet: &RawSheet) -> Result<usize> {
        let found = sheet.rows.iter().position(|row| {
            row.iter()
                .any(|cell| cell.text().to_lowercase().contains(&self.marker_lower))
        });

        match found {
            Some(index) => {
                debug!(index, marker = %self.marker, "header row located");
                Ok(index)
            }
            None => Err(AuditError::HeaderNotFound {
                marker: self.marker.clone(),
            }),
        }
    }
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_PHRASE)
    }
}
