//! Row and record models for CSV imports
//!
//! A [`RawRow`] is one parsed CSV line keyed by the header names. An
//! [`ImportRecord`] is the normalized form written to the record sink.

use csv_async::StringRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{IngestError, IngestResult};

/// Column carrying the business key, in lookup order
pub const KEY_COLUMNS: [&str; 2] = ["sku", "SKU"];

/// Column carrying the display name, in lookup order
pub const NAME_COLUMNS: [&str; 2] = ["name", "Name"];

pub const DESCRIPTION_COLUMNS: [&str; 2] = ["description", "Description"];

pub const PRICE_COLUMNS: [&str; 2] = ["price", "Price"];

/// One CSV data row together with the header it was parsed against
#[derive(Debug, Clone)]
pub struct RawRow {
    headers: Arc<[String]>,
    values: StringRecord,
}

impl RawRow {
    pub fn new(headers: Arc<[String]>, values: StringRecord) -> Self {
        Self { headers, values }
    }

    /// Build a row from literal header and value slices
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let headers: Arc<[String]> = pairs.iter().map(|(h, _)| h.to_string()).collect();
        let values = StringRecord::from(pairs.iter().map(|(_, v)| *v).collect::<Vec<_>>());
        Self { headers, values }
    }

    /// Value of the column named exactly `column`
    ///
    /// Short rows are allowed, so a header without a value reads as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// First non-empty value among `columns`, tried in order
    ///
    /// Exact header matches win; when none of the names is present verbatim,
    /// headers are compared ignoring ASCII case.
    pub fn first_non_empty(&self, columns: &[&str]) -> Option<&str> {
        let exact = columns
            .iter()
            .filter_map(|c| self.get(c))
            .find(|v| !v.trim().is_empty());
        if exact.is_some() {
            return exact;
        }

        columns.iter().find_map(|column| {
            self.headers
                .iter()
                .enumerate()
                .filter(|(_, h)| h.trim().eq_ignore_ascii_case(column))
                .filter_map(|(idx, _)| self.values.get(idx))
                .find(|v| !v.trim().is_empty())
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Non-key product fields carried by an import record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAttributes {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub active: bool,
}

impl Default for ProductAttributes {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            price: None,
            active: true,
        }
    }
}

/// Normalized record keyed by SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Trimmed, lower-cased SKU
    pub sku: String,
    pub attributes: ProductAttributes,
}

impl ImportRecord {
    pub fn new(sku: impl AsRef<str>, attributes: ProductAttributes) -> Self {
        Self {
            sku: normalize_key(sku.as_ref()),
            attributes,
        }
    }

    /// Map a raw row to a record
    ///
    /// Returns `Ok(None)` for rows whose key is missing or blank. A price that
    /// is present but not a finite number fails the whole import.
    pub fn from_row(row: &RawRow) -> IngestResult<Option<Self>> {
        let sku = match row.first_non_empty(&KEY_COLUMNS) {
            Some(raw) => normalize_key(raw),
            None => return Ok(None),
        };

        let name = row.first_non_empty(&NAME_COLUMNS).map(str::to_string);
        let description = row.first_non_empty(&DESCRIPTION_COLUMNS).map(str::to_string);
        let price = match row.first_non_empty(&PRICE_COLUMNS) {
            Some(raw) => parse_price(raw)?,
            None => None,
        };

        Ok(Some(Self {
            sku,
            attributes: ProductAttributes {
                name,
                description,
                price,
                active: true,
            },
        }))
    }
}

/// Trim and case-fold a business key
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn parse_price(raw: &str) -> IngestResult<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(IngestError::InvalidNumber {
            column: PRICE_COLUMNS[0].to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_trimmed_and_lowercased() {
        let row = RawRow::from_pairs(&[("sku", "  ABC-1 "), ("price", "9.5")]);
        let record = ImportRecord::from_row(&row).unwrap().unwrap();
        assert_eq!(record.sku, "abc-1");
        assert_eq!(record.attributes.price, Some(9.5));
        assert!(record.attributes.active);
    }

    #[test]
    fn test_blank_key_is_skipped() {
        let row = RawRow::from_pairs(&[("sku", "   "), ("name", "Widget")]);
        assert!(ImportRecord::from_row(&row).unwrap().is_none());

        let row = RawRow::from_pairs(&[("name", "Widget")]);
        assert!(ImportRecord::from_row(&row).unwrap().is_none());
    }

    #[test]
    fn test_uppercase_headers_fall_back() {
        let row = RawRow::from_pairs(&[("SKU", "X1"), ("Name", "Gadget")]);
        let record = ImportRecord::from_row(&row).unwrap().unwrap();
        assert_eq!(record.sku, "x1");
        assert_eq!(record.attributes.name.as_deref(), Some("Gadget"));
    }

    #[test]
    fn test_empty_primary_column_falls_through() {
        let row = RawRow::from_pairs(&[("sku", ""), ("SKU", "Y2")]);
        let record = ImportRecord::from_row(&row).unwrap().unwrap();
        assert_eq!(record.sku, "y2");
    }

    #[test]
    fn test_mixed_case_header_matches() {
        let row = RawRow::from_pairs(&[("Sku", "Z3"), ("NAME", "Thing")]);
        let record = ImportRecord::from_row(&row).unwrap().unwrap();
        assert_eq!(record.sku, "z3");
        assert_eq!(record.attributes.name.as_deref(), Some("Thing"));
    }

    #[test]
    fn test_capitalized_price_and_description_headers() {
        let row = RawRow::from_pairs(&[
            ("SKU", "a"),
            ("Name", "n"),
            ("Description", "d"),
            ("Price", "12.5"),
        ]);
        let record = ImportRecord::from_row(&row).unwrap().unwrap();
        assert_eq!(record.attributes.price, Some(12.5));
        assert_eq!(record.attributes.description.as_deref(), Some("d"));

        let row = RawRow::from_pairs(&[("sku", "b"), ("PRICE", "lots")]);
        let err = ImportRecord::from_row(&row).unwrap_err();
        assert!(err.to_string().contains("lots"));
    }

    #[test]
    fn test_missing_optional_columns_are_absent() {
        let row = RawRow::from_pairs(&[("sku", "a"), ("price", "")]);
        let record = ImportRecord::from_row(&row).unwrap().unwrap();
        assert_eq!(record.attributes, ProductAttributes::default());
    }

    #[test]
    fn test_malformed_price_is_fatal() {
        let row = RawRow::from_pairs(&[("sku", "a"), ("price", "not-a-number")]);
        let err = ImportRecord::from_row(&row).unwrap_err();
        assert!(err.to_string().contains("not-a-number"));
    }

    #[test]
    fn test_non_finite_price_rejected() {
        let row = RawRow::from_pairs(&[("sku", "a"), ("price", "NaN")]);
        assert!(ImportRecord::from_row(&row).is_err());
    }

    #[test]
    fn test_short_row_reads_missing_columns_as_absent() {
        let headers: Arc<[String]> = vec!["sku".to_string(), "name".to_string(), "price".to_string()].into();
        let row = RawRow::new(headers, StringRecord::from(vec!["k"]));
        assert_eq!(row.get("sku"), Some("k"));
        assert_eq!(row.get("price"), None);
        let record = ImportRecord::from_row(&row).unwrap().unwrap();
        assert_eq!(record.attributes.price, None);
    }
}
