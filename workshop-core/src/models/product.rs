use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    /// Free-text classification, e.g. "Spare Part" or "Consumable".
    pub product_type: String,
}

/// Product types keyed by trimmed, lower-cased product name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    types_by_name: HashMap<String, String>,
}

fn catalog_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later products with the same name replace earlier ones.
    pub fn insert(
        &mut self,
        product: Product,
    ) {
        self.types_by_name
            .insert(catalog_key(&product.name), product.product_type);
    }

    pub fn product_type_for(
        &self,
        part_name: &str,
    ) -> Option<&str> {
        self.types_by_name
            .get(&catalog_key(part_name))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types_by_name.is_empty()
    }
}

impl FromIterator<Product> for ProductCatalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for product in iter {
            catalog.insert(product);
        }
        catalog
    }
}
