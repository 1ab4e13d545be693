//! Spare-part classification and procurement readiness.
//!
//! Whether a line is a spare part is a heuristic over free text: the product
//! type (the line's own, else the catalog's) is normalized and checked for
//! the words "spare" and "part". A line whose type is anything other than
//! `repair` also counts, so labour-only lines are the only ones excluded.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{EstimateItem, ItemStatus, ProductCatalog};

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_-]+").expect("separator pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Trims, lower-cases, turns runs of `_`/`-` into a space and collapses
/// whitespace.
pub fn normalize_product_type(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let spaced = SEPARATORS.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&spaced, " ").trim().to_string()
}

/// The line's product type, falling back to the catalog entry for its part
/// name.
pub fn resolve_product_type<'a>(
    item: &'a EstimateItem,
    catalog: &'a ProductCatalog,
) -> Option<&'a str> {
    item.product_type
        .as_deref()
        .filter(|product_type| !product_type.trim().is_empty())
        .or_else(|| catalog.product_type_for(&item.part_name))
}

pub fn is_spare_part(
    item: &EstimateItem,
    catalog: &ProductCatalog,
) -> bool {
    let by_product_type = resolve_product_type(item, catalog)
        .map(normalize_product_type)
        .is_some_and(|normalized| normalized.contains("spare") && normalized.contains("part"));
    let by_item_type = normalize_product_type(item.item_type.as_str()) != "repair";
    by_product_type || by_item_type
}

/// Approved lines classified as spare parts.
pub fn approved_spare_parts<'a>(
    items: &'a [EstimateItem],
    catalog: &'a ProductCatalog,
) -> impl Iterator<Item = &'a EstimateItem> + 'a {
    items
        .iter()
        .filter(|item| item.status == ItemStatus::Approved)
        .filter(move |item| is_spare_part(item, catalog))
}

/// True when there is at least one approved spare part and every one of them
/// has been ordered or reached a terminal order status.
pub fn is_parts_ready(
    items: &[EstimateItem],
    catalog: &ProductCatalog,
) -> bool {
    let mut spares = approved_spare_parts(items, catalog).peekable();
    if spares.peek().is_none() {
        return false;
    }
    spares.all(EstimateItem::is_procured)
}
