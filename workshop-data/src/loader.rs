use std::collections::{HashMap, HashSet};
use std::io::Read;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use workshop_core::{Product, RepositoryError, WorkshopRepository};

#[derive(Debug, Error)]
pub enum ProductCatalogLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("Product '{0}' appears more than once")]
    DuplicateProduct(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for ProductCatalogLoaderError {
    fn from(err: csv::Error) -> Self {
        ProductCatalogLoaderError::CsvParse(err.to_string())
    }
}

/// One row of a product catalog CSV: `name,product_type`.
///
/// `product_type` is free text. Anything the spare-part heuristic reads as
/// "spare part" (`Spare Part`, `spare_part`, `SPARE-PARTS`) marks the product
/// as a procured part.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: String,
    pub product_type: String,
}

impl From<&ProductRecord> for Product {
    fn from(record: &ProductRecord) -> Self {
        Product {
            name: record.name.clone(),
            product_type: record.product_type.clone(),
        }
    }
}

/// What a load changed, compared with the catalog already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl LoadSummary {
    pub fn written(&self) -> usize {
        self.added + self.updated
    }
}

pub struct ProductCatalogLoader;

impl ProductCatalogLoader {
    /// Parses and validates catalog rows. Fields are trimmed; blank names or
    /// types and case-insensitive duplicate names are rejected.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<ProductRecord>, ProductCatalogLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for (idx, result) in csv_reader.deserialize().enumerate() {
            let record: ProductRecord = result?;
            // Header is row 1.
            let row = idx + 2;
            if record.name.is_empty() {
                return Err(ProductCatalogLoaderError::InvalidRecord {
                    row,
                    reason: "name is empty".to_string(),
                });
            }
            if record.product_type.is_empty() {
                return Err(ProductCatalogLoaderError::InvalidRecord {
                    row,
                    reason: format!("product_type is empty for '{}'", record.name),
                });
            }
            if !seen.insert(record.name.to_lowercase()) {
                return Err(ProductCatalogLoaderError::DuplicateProduct(record.name));
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Upserts every record. Loading the same file twice leaves the catalog
    /// unchanged and reports every row as unchanged.
    pub async fn load<R: WorkshopRepository + ?Sized>(
        repo: &R,
        records: &[ProductRecord],
    ) -> Result<LoadSummary, ProductCatalogLoaderError> {
        let existing: HashMap<String, String> = repo
            .list_products()
            .await?
            .into_iter()
            .map(|product| (product.name.to_lowercase(), product.product_type))
            .collect();

        let mut summary = LoadSummary::default();
        for record in records {
            match existing.get(&record.name.to_lowercase()) {
                Some(current) if *current == record.product_type => {
                    summary.unchanged += 1;
                    continue;
                }
                Some(_) => summary.updated += 1,
                None => summary.added += 1,
            }
            repo.upsert_product(&Product::from(record)).await?;
            debug!(name = %record.name, product_type = %record.product_type, "product written");
        }

        info!(
            added = summary.added,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "product catalog loaded"
        );
        Ok(summary)
    }
}
