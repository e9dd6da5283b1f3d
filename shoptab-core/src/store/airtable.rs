//! Airtable-backed [`TabularStore`] implementation.
//!
//! This module is the single owner of the remote schema: the field-name
//! strings below must match the Airtable base bit-for-bit.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};
use shoptab_airtable::{AirtableClient, AirtableError, formula};
use tracing::warn;

use super::{NewCustomer, NewOrder, TabularStore};

// Customers table schema.
pub const CUSTOMER_NAME_FIELD: &str = "Name";
pub const CUSTOMER_EMAIL_FIELD: &str = "Mail id";
pub const CUSTOMER_PHONE_FIELD: &str = "Contact Number";
pub const CUSTOMER_ADDRESS_FIELD: &str = "Address";
pub const CUSTOMER_CHANNEL_FIELD: &str = "Acquired sales channel";

// Orders table schema.
pub const ORDER_EXTERNAL_ID_FIELD: &str = "Order ID";
pub const ORDER_NUMBER_FIELD: &str = "Order Number";
pub const ORDER_CUSTOMER_FIELD: &str = "Customer";
pub const ORDER_DATE_FIELD: &str = "Order Date";
pub const ORDER_TOTAL_FIELD: &str = "Total Order Amount";
pub const ORDER_PAYMENT_STATUS_FIELD: &str = "Payment Status";
pub const ORDER_SHIPPING_STATUS_FIELD: &str = "Shipping Status";
pub const ORDER_SALES_CHANNEL_FIELD: &str = "Sales Channel";
pub const ORDER_PACKING_SLIP_FIELD: &str = "Order Packing Slip";
/// Primary product linkage field.
pub const ORDER_ITEM_SKU_FIELD: &str = "Item SKU";
/// Secondary product linkage field; the base mirrors the same links here.
pub const ORDER_PRODUCTS_FIELD: &str = "Products";

// Products table schema.
pub const PRODUCT_SKU_FIELD: &str = "SKU";

/// Channel tag stamped on customers created by this bridge.
pub const CUSTOMER_ACQUISITION_CHANNEL: &str = "Shopify";
/// Channel tag stamped on orders created by this bridge.
pub const ORDER_SALES_CHANNEL: &str = "Online Store";

/// Table identifiers within the configured base.
#[derive(Debug, Clone)]
pub struct StoreTables {
    pub customers: String,
    pub orders: String,
    pub products: String,
}

/// [`TabularStore`] backed by an Airtable base.
#[derive(Debug, Clone)]
pub struct AirtableStore {
    client: AirtableClient,
    tables: StoreTables,
}

impl AirtableStore {
    pub fn new(client: AirtableClient, tables: StoreTables) -> Self {
        Self { client, tables }
    }
}

#[async_trait]
impl TabularStore for AirtableStore {
    async fn find_customer_by_phone(&self, phone: &str) -> Result<Option<String>, AirtableError> {
        let query = formula::eq(CUSTOMER_PHONE_FIELD, phone);
        let record = self.client.first_match(&self.tables.customers, &query).await?;
        Ok(record.map(|r| r.id))
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>, AirtableError> {
        let query = formula::eq(CUSTOMER_EMAIL_FIELD, email);
        let record = self.client.first_match(&self.tables.customers, &query).await?;
        Ok(record.map(|r| r.id))
    }

    async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<Option<String>, AirtableError> {
        let mut fields = Map::new();
        fields.insert(CUSTOMER_NAME_FIELD.to_owned(), json!(customer.name));
        if let Some(email) = &customer.email {
            fields.insert(CUSTOMER_EMAIL_FIELD.to_owned(), json!(email));
        }
        if let Some(phone) = &customer.phone {
            fields.insert(CUSTOMER_PHONE_FIELD.to_owned(), json!(phone));
        }
        if let Some(address) = &customer.address {
            fields.insert(CUSTOMER_ADDRESS_FIELD.to_owned(), json!(address));
        }
        fields.insert(
            CUSTOMER_CHANNEL_FIELD.to_owned(),
            json!(CUSTOMER_ACQUISITION_CHANNEL),
        );

        // A rejected record (bad field value, schema drift) yields no
        // identifier; the caller aborts the order for this delivery instead
        // of treating it as a transport failure.
        match self
            .client
            .create(&self.tables.customers, Value::Object(fields))
            .await
        {
            Ok(record) => Ok(Some(record.id)),
            Err(AirtableError::Api { status, body }) => {
                warn!(%status, body = %body, "customer creation rejected by airtable");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn find_order(&self, external_id: &str) -> Result<Option<String>, AirtableError> {
        let query = formula::eq(ORDER_EXTERNAL_ID_FIELD, external_id);
        let record = self.client.first_match(&self.tables.orders, &query).await?;
        Ok(record.map(|r| r.id))
    }

    async fn create_order(&self, order: &NewOrder) -> Result<String, AirtableError> {
        let mut fields = Map::new();
        fields.insert(ORDER_EXTERNAL_ID_FIELD.to_owned(), json!(order.external_id));
        if let Some(number) = &order.order_number {
            fields.insert(ORDER_NUMBER_FIELD.to_owned(), json!(number));
        }
        fields.insert(ORDER_CUSTOMER_FIELD.to_owned(), json!([order.customer]));
        fields.insert(ORDER_DATE_FIELD.to_owned(), json!(order.order_date));
        fields.insert(
            ORDER_TOTAL_FIELD.to_owned(),
            json!(order.total_amount.to_f64().unwrap_or_default()),
        );
        fields.insert(
            ORDER_PAYMENT_STATUS_FIELD.to_owned(),
            json!(order.payment_status),
        );
        fields.insert(
            ORDER_SHIPPING_STATUS_FIELD.to_owned(),
            json!(order.shipping_status),
        );
        fields.insert(
            ORDER_SALES_CHANNEL_FIELD.to_owned(),
            json!(ORDER_SALES_CHANNEL),
        );
        if let Some(url) = &order.tracking_url {
            fields.insert(ORDER_PACKING_SLIP_FIELD.to_owned(), json!([{ "url": url }]));
        }
        if !order.product_refs.is_empty() {
            fields.insert(ORDER_ITEM_SKU_FIELD.to_owned(), json!(order.product_refs));
            fields.insert(ORDER_PRODUCTS_FIELD.to_owned(), json!(order.product_refs));
        }

        let record = self
            .client
            .create(&self.tables.orders, Value::Object(fields))
            .await?;
        Ok(record.id)
    }

    async fn find_product(&self, sku: &str) -> Result<Option<String>, AirtableError> {
        let query = formula::eq(PRODUCT_SKU_FIELD, sku);
        let record = self.client.first_match(&self.tables.products, &query).await?;
        Ok(record.map(|r| r.id))
    }

    async fn set_shipping_status(
        &self,
        record_id: &str,
        status: &str,
    ) -> Result<(), AirtableError> {
        let fields = json!({ ORDER_SHIPPING_STATUS_FIELD: status });
        self.client
            .update(&self.tables.orders, record_id, fields)
            .await?;
        Ok(())
    }
}
