//! # HTTP Handlers
//!
//! Handlers are organized by resource:
//!
//! - [`health`] - Liveness and database check
//! - [`quotes`] - Quote numbers, quote headers, batch save, export to cart
//! - [`line_items`] - Quote line item CRUD
//! - [`carts`] - Vendor carts and cart items
//!
//! Request bodies accept numbers leniently: a field may be a JSON number, a
//! numeric string, `null`, or garbage. Garbage degrades to `0` (or to the
//! parent's margin for `margin_percent`) instead of failing the request.

pub mod carts;
pub mod health;
pub mod line_items;
pub mod quotes;

use serde::{Deserialize, Deserializer};

use materi_core::pricing::ClaimedPricing;
use materi_core::validation::validate_required;
use materi_core::{
    parse_or_default, LenientNumber, LineInputs, ProductSnapshot, QuoteStatus, ValidationError,
    DEFAULT_GLOBAL_MARGIN_PERCENT,
};
use materi_db::{ItemDraft, ItemPatch};

use crate::error::ApiResult;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Resolves a parent's global margin: absent or null means the default,
/// malformed means zero.
pub(crate) fn global_margin(value: &LenientNumber) -> f64 {
    match value {
        LenientNumber::Absent | LenientNumber::Null => DEFAULT_GLOBAL_MARGIN_PERCENT,
        other => parse_or_default(other, 0.0),
    }
}

/// A number in a PATCH body. Absent leaves the field alone.
pub(crate) fn patch_number(value: &LenientNumber) -> Option<f64> {
    if value.is_absent() {
        None
    } else {
        Some(parse_or_default(value, 0.0))
    }
}

/// A margin override in a PATCH body. `null` clears the override.
pub(crate) fn patch_margin(value: &LenientNumber) -> Option<Option<f64>> {
    if value.is_absent() {
        None
    } else {
        Some(value.as_margin())
    }
}

pub(crate) fn parse_status(value: &str) -> ApiResult<QuoteStatus> {
    QuoteStatus::parse(value).ok_or_else(|| {
        ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: QuoteStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
        }
        .into()
    })
}

/// A quote number reservation id sent back by the client.
///
/// Only a positive integer is accepted; anything else is a client error so a
/// bad reservation is never silently replaced by a fresh one.
pub(crate) fn parse_seq_id(value: &LenientNumber) -> ApiResult<Option<i64>> {
    match value {
        LenientNumber::Absent | LenientNumber::Null => Ok(None),
        LenientNumber::Number(v) if v.fract() == 0.0 && *v >= 1.0 && *v <= i64::MAX as f64 => {
            Ok(Some(*v as i64))
        }
        _ => Err(ValidationError::InvalidFormat {
            field: "quote_seq_id".to_string(),
            reason: "expected a reserved sequence id".to_string(),
        }
        .into()),
    }
}

/// Client-computed fields in `[line_cost_total, unit_sale_price,
/// line_sale_total, line_profit_amount]` order. `None` when verification is
/// off or nothing was sent.
fn claimed_pricing(verify: bool, fields: [&LenientNumber; 4]) -> Option<ClaimedPricing> {
    if !verify {
        return None;
    }
    let [cost, unit_sale, sale, profit] = fields;
    let claimed = ClaimedPricing::from_lenient(cost, unit_sale, sale, profit);
    (!claimed.is_empty()).then_some(claimed)
}

/// Product snapshot plus pricing inputs, shared by quote line items and
/// cart items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemBody {
    #[serde(default)]
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default, alias = "product_description_snapshot", alias = "product_description")]
    pub description: Option<String>,
    #[serde(default)]
    pub product_image_url: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub unit_cost_price: LenientNumber,
    #[serde(default)]
    pub quantity: LenientNumber,
    #[serde(default)]
    pub margin_percent: LenientNumber,

    // Client-computed fields, verified against the server's recomputation
    #[serde(default)]
    pub line_cost_total: LenientNumber,
    #[serde(default)]
    pub unit_sale_price: LenientNumber,
    #[serde(default)]
    pub line_sale_total: LenientNumber,
    #[serde(default)]
    pub line_profit_amount: LenientNumber,
}

impl ItemBody {
    /// The client's computed fields, if any, when verification is enabled.
    pub fn claimed(&self, verify: bool) -> Option<ClaimedPricing> {
        claimed_pricing(
            verify,
            [
                &self.line_cost_total,
                &self.unit_sale_price,
                &self.line_sale_total,
                &self.line_profit_amount,
            ],
        )
    }

    /// Builds a full draft. `product_name` is required.
    pub fn draft(&self, verify: bool) -> ApiResult<ItemDraft> {
        let product_name =
            validate_required("product_name", self.product_name.as_deref().unwrap_or_default())?;
        let inputs =
            LineInputs::from_lenient(&self.unit_cost_price, &self.quantity, &self.margin_percent);

        let snapshot = ProductSnapshot {
            supplier_id: self.supplier_id.clone(),
            supplier_name: self.supplier_name.clone(),
            product_id: self.product_id.clone(),
            product_name,
            description: self.description.clone(),
            unit_of_measure: ProductSnapshot::unit_or_default(self.unit_of_measure.clone()),
            unit_cost_price: inputs.unit_cost_price,
        };

        let mut draft = ItemDraft::new(snapshot, inputs.quantity, inputs.margin_percent);
        draft.product_image_url = self.product_image_url.clone();
        draft.claimed = self.claimed(verify);
        Ok(draft)
    }
}

/// Partial update of a quote line item or cart item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatchBody {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "nullable",
        alias = "product_description_snapshot",
        alias = "product_description"
    )]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default)]
    pub unit_cost_price: LenientNumber,
    #[serde(default)]
    pub quantity: LenientNumber,
    #[serde(default)]
    pub margin_percent: LenientNumber,

    #[serde(default)]
    pub line_cost_total: LenientNumber,
    #[serde(default)]
    pub unit_sale_price: LenientNumber,
    #[serde(default)]
    pub line_sale_total: LenientNumber,
    #[serde(default)]
    pub line_profit_amount: LenientNumber,
}

impl ItemPatchBody {
    pub fn patch(&self, verify: bool) -> ApiResult<ItemPatch> {
        let product_name = match &self.product_name {
            Some(name) => Some(validate_required("product_name", name)?),
            None => None,
        };

        let claimed = claimed_pricing(
            verify,
            [
                &self.line_cost_total,
                &self.unit_sale_price,
                &self.line_sale_total,
                &self.line_profit_amount,
            ],
        );

        Ok(ItemPatch {
            product_name,
            description: self.description.clone(),
            unit_of_measure: self
                .unit_of_measure
                .clone()
                .map(|unit| ProductSnapshot::unit_or_default(Some(unit))),
            unit_cost_price: patch_number(&self.unit_cost_price),
            quantity: patch_number(&self.quantity),
            margin_percent: patch_margin(&self.margin_percent),
            claimed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_global_margin_resolution() {
        assert_eq!(global_margin(&LenientNumber::Absent), 20.0);
        assert_eq!(global_margin(&LenientNumber::Null), 20.0);
        assert_eq!(global_margin(&LenientNumber::Malformed), 0.0);
        assert_eq!(global_margin(&LenientNumber::Number(35.0)), 35.0);
    }

    #[test]
    fn test_seq_id_must_be_positive_integer() {
        assert_eq!(parse_seq_id(&LenientNumber::Absent).unwrap(), None);
        assert_eq!(parse_seq_id(&LenientNumber::Number(42.0)).unwrap(), Some(42));
        assert!(parse_seq_id(&LenientNumber::Number(4.5)).is_err());
        assert!(parse_seq_id(&LenientNumber::Number(0.0)).is_err());
        assert!(parse_seq_id(&LenientNumber::Malformed).is_err());
    }

    #[test]
    fn test_item_body_degrades_garbage() {
        let body: ItemBody = serde_json::from_value(json!({
            "product_name": "Cement",
            "unit_cost_price": "abc",
            "quantity": "3",
            "margin_percent": "",
        }))
        .unwrap();

        let draft = body.draft(true).unwrap();
        assert_eq!(draft.snapshot.unit_cost_price, 0.0);
        assert_eq!(draft.quantity, 3.0);
        assert_eq!(draft.margin_percent, None);
        assert_eq!(draft.snapshot.unit_of_measure, "unit");
        assert!(draft.claimed.is_none());
    }

    #[test]
    fn test_item_body_requires_product_name() {
        let body: ItemBody = serde_json::from_value(json!({ "quantity": 1 })).unwrap();
        assert!(body.draft(false).is_err());
    }

    #[test]
    fn test_claimed_ignored_when_verification_off() {
        let body: ItemBody = serde_json::from_value(json!({
            "product_name": "Cement",
            "line_sale_total": 1,
        }))
        .unwrap();
        assert!(body.claimed(true).is_some());
        assert!(body.claimed(false).is_none());
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let body: ItemPatchBody = serde_json::from_value(json!({
            "margin_percent": null,
            "product_description_snapshot": null,
        }))
        .unwrap();
        let patch = body.patch(true).unwrap();
        assert_eq!(patch.margin_percent, Some(None));
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.quantity, None);

        let body: ItemPatchBody = serde_json::from_value(json!({ "quantity": 4 })).unwrap();
        let patch = body.patch(true).unwrap();
        assert_eq!(patch.margin_percent, None);
        assert_eq!(patch.description, None);
        assert_eq!(patch.quantity, Some(4.0));
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert_eq!(parse_status("sent").unwrap(), QuoteStatus::Sent);
        assert!(parse_status("archived").is_err());
    }
}
