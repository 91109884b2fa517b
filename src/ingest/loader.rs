//! Complaint CSV ingestion.
//!
//! Reads the CFPB-style complaint export and yields the records worth
//! indexing: narrative present, product on the allow-list. Drop reasons are
//! counted so an index build can report what it skipped.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::errors::ApiError;

const COL_COMPLAINT_ID: &str = "Complaint ID";
const COL_PRODUCT: &str = "Product";
const COL_NARRATIVE: &str = "Consumer complaint narrative";
const COL_DATE_RECEIVED: &str = "Date received";

/// One complaint as loaded from the export. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ComplaintRecord {
    pub id: String,
    pub product: String,
    pub narrative: String,
    pub date_received: Option<NaiveDate>,
}

/// Ingestion diagnostics, logged after every load.
#[derive(Debug, Default, Clone, Serialize)]
pub struct LoadStats {
    pub rows_loaded: u64,
    pub rows_kept: u64,
    pub rows_dropped_no_narrative: u64,
    pub rows_dropped_wrong_product: u64,
    pub products_found: BTreeMap<String, u64>,
}

impl LoadStats {
    pub fn rows_dropped_total(&self) -> u64 {
        self.rows_loaded - self.rows_kept
    }

    pub fn log_summary(&self) {
        tracing::info!(
            rows_loaded = self.rows_loaded,
            rows_kept = self.rows_kept,
            dropped_no_narrative = self.rows_dropped_no_narrative,
            dropped_wrong_product = self.rows_dropped_wrong_product,
            "complaint load finished"
        );
        for (product, count) in &self.products_found {
            tracing::info!(product = %product, complaints = count, "product retained");
        }
    }
}

pub struct ComplaintLoader {
    allowed_products: Vec<String>,
}

impl ComplaintLoader {
    /// An empty allow-list disables product filtering.
    pub fn new(allowed_products: &[String]) -> Self {
        Self {
            allowed_products: allowed_products.to_vec(),
        }
    }

    pub fn load(&self, path: &Path) -> Result<(Vec<ComplaintRecord>, LoadStats), ApiError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            ApiError::Config(format!(
                "Cannot open complaint export {}: {}",
                path.display(),
                e
            ))
        })?;

        let headers = reader
            .headers()
            .map_err(|e| ApiError::Config(format!("Cannot read CSV header: {}", e)))?
            .clone();

        let id_col = required_column(&headers, COL_COMPLAINT_ID)?;
        let product_col = required_column(&headers, COL_PRODUCT)?;
        let narrative_col = required_column(&headers, COL_NARRATIVE)?;
        let date_col = optional_column(&headers, COL_DATE_RECEIVED);

        let mut records = Vec::new();
        let mut stats = LoadStats::default();

        for row in reader.records() {
            let row = row.map_err(|e| ApiError::internal(format!("CSV parse failed: {}", e)))?;
            stats.rows_loaded += 1;

            let product = row.get(product_col).unwrap_or("").trim();
            if !self.allowed_products.is_empty()
                && !self.allowed_products.iter().any(|p| p == product)
            {
                stats.rows_dropped_wrong_product += 1;
                continue;
            }

            let narrative = row.get(narrative_col).unwrap_or("").trim();
            if narrative.is_empty() {
                stats.rows_dropped_no_narrative += 1;
                continue;
            }

            let date_received = date_col
                .and_then(|col| row.get(col))
                .and_then(parse_date_received);

            stats.rows_kept += 1;
            *stats.products_found.entry(product.to_string()).or_insert(0) += 1;

            records.push(ComplaintRecord {
                id: row.get(id_col).unwrap_or("").trim().to_string(),
                product: product.to_string(),
                narrative: narrative.to_string(),
                date_received,
            });
        }

        Ok((records, stats))
    }
}

fn required_column(headers: &csv::StringRecord, name: &str) -> Result<usize, ApiError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ApiError::Config(format!("Complaint export is missing column '{}'", name)))
}

fn optional_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// CFPB exports use either ISO dates or US-style month-first dates
/// depending on the download channel.
fn parse_date_received(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}
