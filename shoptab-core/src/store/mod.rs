//! The remote tabular store boundary.
//!
//! [`TabularStore`] is the seam between the reconciler and Airtable: the
//! reconciler speaks in domain terms (customers, orders, products) and the
//! [`AirtableStore`] implementation owns the schema-specific field names
//! and table identifiers. Tests swap in a recording mock.

mod airtable;

pub use airtable::{AirtableStore, StoreTables};

use async_trait::async_trait;
use rust_decimal::Decimal;
use shoptab_airtable::AirtableError;

/// A customer record to be created in the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// An order record to be created in the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// String form of the platform's order id; the natural/dedup key.
    pub external_id: String,
    pub order_number: Option<String>,
    /// Identifier of the linked customer record.
    pub customer: String,
    /// Date portion of the order's creation timestamp (`YYYY-MM-DD`).
    pub order_date: String,
    pub total_amount: Decimal,
    pub payment_status: String,
    pub shipping_status: String,
    pub tracking_url: Option<String>,
    /// Resolved product record identifiers, in line-item order.
    pub product_refs: Vec<String>,
}

/// Operations the reconciler needs from the remote store.
///
/// All lookups return the remote record identifier of the first match;
/// uniqueness of the queried keys is not enforced by this system.
#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn find_customer_by_phone(&self, phone: &str) -> Result<Option<String>, AirtableError>;

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>, AirtableError>;

    /// Create a customer record. `Ok(None)` means the store accepted the
    /// call but yielded no identifier (e.g. the record was rejected); the
    /// caller treats that as a customer-resolution failure rather than a
    /// transport error.
    async fn create_customer(&self, customer: &NewCustomer)
    -> Result<Option<String>, AirtableError>;

    /// Look up an order by its external (natural) key.
    async fn find_order(&self, external_id: &str) -> Result<Option<String>, AirtableError>;

    /// Create an order record, returning its new identifier.
    async fn create_order(&self, order: &NewOrder) -> Result<String, AirtableError>;

    /// Look up a product reference by stock-keeping identifier.
    async fn find_product(&self, sku: &str) -> Result<Option<String>, AirtableError>;

    /// Patch only the shipping-status field of an existing order record.
    async fn set_shipping_status(&self, record_id: &str, status: &str)
    -> Result<(), AirtableError>;
}
