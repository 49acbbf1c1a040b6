//! Product types shared by product commands and queries

use serde::{Deserialize, Deserializer, Serialize};

/// A stored product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    /// Lower-cased, trimmed business key
    pub sku: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub active: bool,
}

/// Partial update of a product
///
/// Outer `None` leaves a field unchanged. For nullable fields, `Some(None)`
/// (an explicit JSON `null`) clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub price: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Marks a field that appeared in the input, even as `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.active.is_none()
    }

    /// Merge the patch over `product`, returning the updated copy
    pub fn apply(&self, product: &Product) -> Product {
        Product {
            id: product.id,
            sku: product.sku.clone(),
            name: self.name.clone().unwrap_or_else(|| product.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| product.description.clone()),
            price: self.price.unwrap_or(product.price),
            active: self.active.unwrap_or(product.active),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Product {
        Product {
            id: 1,
            sku: "w-1".to_string(),
            name: Some("Widget".to_string()),
            description: Some("Blue".to_string()),
            price: Some(9.99),
            active: true,
        }
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let patch = ProductPatch::default();
        assert!(patch.is_empty());
        assert_eq!(patch.apply(&widget()), widget());
    }

    #[test]
    fn test_absent_fields_are_kept() {
        let patch: ProductPatch = serde_json::from_str(r#"{"price": 12.5}"#).unwrap();
        let updated = patch.apply(&widget());
        assert_eq!(updated.price, Some(12.5));
        assert_eq!(updated.name.as_deref(), Some("Widget"));
        assert!(updated.active);
    }

    #[test]
    fn test_explicit_null_clears() {
        let patch: ProductPatch =
            serde_json::from_str(r#"{"description": null, "active": false}"#).unwrap();
        assert_eq!(patch.description, Some(None));
        let updated = patch.apply(&widget());
        assert_eq!(updated.description, None);
        assert!(!updated.active);
        assert_eq!(updated.sku, "w-1");
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let original = widget();
        let patch = ProductPatch {
            name: Some(Some("Gadget".to_string())),
            ..Default::default()
        };
        let updated = patch.apply(&original);
        assert_eq!(original.name.as_deref(), Some("Widget"));
        assert_eq!(updated.name.as_deref(), Some("Gadget"));
    }
}
