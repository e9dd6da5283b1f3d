//! Inbound webhook payload types.
//!
//! Shopify payloads are treated as loosely as the upstream contract allows:
//! every field is optional at the deserialization layer, and the reconciler
//! decides which absences are fatal. Unknown fields are ignored.

use serde::Deserialize;

/// Name written to a customer record when the payload carries no usable
/// first/last name.
pub const PLACEHOLDER_CUSTOMER_NAME: &str = "Guest";

/// An `orders/create` webhook body, reduced to the fields the bridge reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderPayload {
    /// Platform-assigned order id; its string form is the natural key.
    pub id: Option<u64>,
    pub created_at: Option<String>,
    pub subtotal_price: Option<String>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    /// Human-readable order number, usually `#`-prefixed.
    pub name: Option<String>,
    pub line_items: Vec<LineItem>,
    pub customer: Option<CustomerPayload>,
    pub shipping_address: Option<AddressPayload>,
    pub order_status_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub sku: Option<String>,
}

impl LineItem {
    /// The stock-keeping identifier, with empty strings treated as absent.
    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref().filter(|s| !s.is_empty())
    }
}

/// The embedded customer sub-record. An absent sub-record behaves like an
/// empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomerPayload {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl CustomerPayload {
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().filter(|s| !s.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|s| !s.is_empty())
    }

    /// `"{first} {last}"`, trimmed; [`PLACEHOLDER_CUSTOMER_NAME`] when both
    /// parts are empty.
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let name = name.trim();
        if name.is_empty() {
            PLACEHOLDER_CUSTOMER_NAME.to_owned()
        } else {
            name.to_owned()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressPayload {
    pub address1: Option<String>,
}

/// A fulfillment webhook body. Only the order reference matters; the
/// event's own status field is deliberately not read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FulfillmentPayload {
    pub order_id: Option<u64>,
}
