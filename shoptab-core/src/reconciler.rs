//! Order reconciliation against the remote tabular store.
//!
//! One webhook delivery maps to one sequential unit of work: validate the
//! payload, check for a duplicate, find-or-create the customer, resolve
//! product references, write the order. Fulfillment events patch the
//! shipping status of an already-ingested order.
//!
//! There is no locking and no transaction around the existence checks;
//! concurrent deliveries for the same new order or customer can both pass
//! the check and both create a record. The store is the only shared
//! resource and it is accessed as-is.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::payload::{LineItem, OrderPayload};
use crate::store::{NewCustomer, NewOrder, TabularStore};
use shoptab_airtable::AirtableError;

/// Shipping status written to every newly created order record. The
/// inbound payload's own fulfillment status is not consulted at creation
/// time; only later fulfillment events move an order past this state.
pub const INITIAL_SHIPPING_STATUS: &str = "New";

/// What [`Reconciler::ingest_order`] did with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new order record was written.
    Created,
    /// An order with the same external id already exists; nothing was
    /// written or updated.
    DuplicateSkipped,
    /// The customer could not be found or created; the order was not
    /// written.
    CustomerFailed,
}

/// What [`Reconciler::record_fulfillment`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// The matched order's shipping status was patched.
    Updated,
    /// No order with that external id exists; the event was dropped.
    NotFound,
}

/// Errors that abort an operation.
///
/// Outcomes like a duplicate order or an unknown fulfillment target are
/// normal control flow and live in the outcome enums, not here.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A field the upstream contract guarantees is missing.
    #[error("missing required order field: {0}")]
    MissingField(&'static str),

    /// The monetary subtotal did not parse as a decimal number.
    #[error("unparsable order subtotal: {0:?}")]
    InvalidAmount(String),

    /// A remote store call failed; the intended write was abandoned.
    #[error(transparent)]
    Store(#[from] AirtableError),
}

/// Validated scalar fields of an incoming order, extracted before any
/// remote call so a malformed payload produces no partial writes.
#[derive(Debug)]
struct OrderDraft {
    external_id: String,
    order_number: Option<String>,
    order_date: String,
    total_amount: Decimal,
    payment_status: String,
    tracking_url: Option<String>,
}

impl OrderDraft {
    fn from_payload(order: &OrderPayload) -> Result<Self, ReconcileError> {
        let id = order.id.ok_or(ReconcileError::MissingField("id"))?;
        let created_at = order
            .created_at
            .as_deref()
            .ok_or(ReconcileError::MissingField("created_at"))?;
        let subtotal = order
            .subtotal_price
            .as_deref()
            .ok_or(ReconcileError::MissingField("subtotal_price"))?;
        let financial_status = order
            .financial_status
            .as_deref()
            .ok_or(ReconcileError::MissingField("financial_status"))?;

        let total_amount: Decimal = subtotal
            .trim()
            .parse()
            .map_err(|_| ReconcileError::InvalidAmount(subtotal.to_owned()))?;

        // Only the date portion is kept; the time of day is discarded.
        let order_date = created_at
            .split_once('T')
            .map_or(created_at, |(date, _)| date)
            .to_owned();

        Ok(Self {
            external_id: id.to_string(),
            order_number: order
                .name
                .as_deref()
                .map(|n| n.trim_start_matches('#').to_owned()),
            order_date,
            total_amount,
            payment_status: capitalize(financial_status),
            tracking_url: order.order_status_url.clone(),
        })
    }
}

/// The order reconciler. Stateless between invocations; all state lives in
/// the remote store.
pub struct Reconciler<S> {
    store: S,
}

impl<S: TabularStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ingest an order-creation webhook.
    pub async fn ingest_order(
        &self,
        order: &OrderPayload,
    ) -> Result<IngestOutcome, ReconcileError> {
        let draft = OrderDraft::from_payload(order)?;
        info!(order_id = %draft.external_id, "processing incoming order");

        if self.store.find_order(&draft.external_id).await?.is_some() {
            info!(order_id = %draft.external_id, "order already recorded, skipping");
            return Ok(IngestOutcome::DuplicateSkipped);
        }

        let Some(customer_id) = self.resolve_customer(order).await? else {
            warn!(order_id = %draft.external_id, "customer resolution failed, order not written");
            return Ok(IngestOutcome::CustomerFailed);
        };

        let product_refs = self.resolve_products(&order.line_items).await?;

        let record = NewOrder {
            external_id: draft.external_id,
            order_number: draft.order_number,
            customer: customer_id,
            order_date: draft.order_date,
            total_amount: draft.total_amount,
            payment_status: draft.payment_status,
            shipping_status: INITIAL_SHIPPING_STATUS.to_owned(),
            tracking_url: draft.tracking_url,
            product_refs,
        };
        let record_id = self.store.create_order(&record).await?;
        info!(order_id = %record.external_id, record_id = %record_id, "order record created");
        Ok(IngestOutcome::Created)
    }

    /// Apply a fulfillment event to an already-ingested order.
    ///
    /// An unknown order id is a no-op, not an error: fulfillment events can
    /// race ahead of order creation or reference orders that were never
    /// ingested.
    pub async fn record_fulfillment(
        &self,
        external_id: &str,
        status: &str,
    ) -> Result<FulfillmentOutcome, ReconcileError> {
        let Some(record_id) = self.store.find_order(external_id).await? else {
            info!(order_id = external_id, "fulfillment for unknown order, dropped");
            return Ok(FulfillmentOutcome::NotFound);
        };

        self.store.set_shipping_status(&record_id, status).await?;
        info!(order_id = external_id, record_id = %record_id, status, "shipping status updated");
        Ok(FulfillmentOutcome::Updated)
    }

    /// Find a customer by phone (preferred) or email, creating one on miss.
    ///
    /// Email is consulted only when the payload carries no phone; a phone
    /// lookup that finds nothing falls through to creation, not to the
    /// email query.
    async fn resolve_customer(
        &self,
        order: &OrderPayload,
    ) -> Result<Option<String>, ReconcileError> {
        let customer = order.customer.clone().unwrap_or_default();

        let existing = if let Some(phone) = customer.phone() {
            self.store.find_customer_by_phone(phone).await?
        } else if let Some(email) = customer.email() {
            self.store.find_customer_by_email(email).await?
        } else {
            None
        };
        if let Some(id) = existing {
            debug!(customer_id = %id, "customer found");
            return Ok(Some(id));
        }

        let new_customer = NewCustomer {
            name: customer.display_name(),
            email: customer.email().map(str::to_owned),
            phone: customer.phone().map(str::to_owned),
            address: order
                .shipping_address
                .as_ref()
                .and_then(|a| a.address1.clone()),
        };
        debug!(name = %new_customer.name, "creating customer");
        let created = self.store.create_customer(&new_customer).await?;
        if let Some(id) = &created {
            info!(customer_id = %id, "customer created");
        }
        Ok(created)
    }

    /// Resolve line items to product record ids, preserving line-item
    /// order. Items without a SKU or without a matching product record are
    /// skipped; they never fail the order.
    async fn resolve_products(&self, items: &[LineItem]) -> Result<Vec<String>, ReconcileError> {
        let mut refs = Vec::new();
        for item in items {
            let Some(sku) = item.sku() else { continue };
            match self.store.find_product(sku).await? {
                Some(id) => refs.push(id),
                None => debug!(sku, "no product record for SKU, line item skipped"),
            }
        }
        Ok(refs)
    }
}

/// Uppercase the first character and lowercase the rest, matching how the
/// remote schema's status values are cased ("paid" → "Paid", "PAID" →
/// "Paid").
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        FindCustomerByPhone(String),
        FindCustomerByEmail(String),
        CreateCustomer(NewCustomer),
        FindOrder(String),
        CreateOrder(NewOrder),
        FindProduct(String),
        SetShippingStatus(String, String),
    }

    /// Recording in-memory store.
    #[derive(Default)]
    struct MockStore {
        customers_by_phone: HashMap<String, String>,
        customers_by_email: HashMap<String, String>,
        products: HashMap<String, String>,
        orders: Mutex<HashMap<String, String>>,
        reject_customer_create: bool,
        /// When set, created orders become visible to later `find_order`
        /// calls, as they would against the real store.
        track_created_orders: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl MockStore {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn created_orders(&self) -> Vec<NewOrder> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::CreateOrder(order) => Some(order),
                    _ => None,
                })
                .collect()
        }

        fn created_customers(&self) -> Vec<NewCustomer> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::CreateCustomer(customer) => Some(customer),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl TabularStore for MockStore {
        async fn find_customer_by_phone(
            &self,
            phone: &str,
        ) -> Result<Option<String>, AirtableError> {
            self.record(Call::FindCustomerByPhone(phone.to_owned()));
            Ok(self.customers_by_phone.get(phone).cloned())
        }

        async fn find_customer_by_email(
            &self,
            email: &str,
        ) -> Result<Option<String>, AirtableError> {
            self.record(Call::FindCustomerByEmail(email.to_owned()));
            Ok(self.customers_by_email.get(email).cloned())
        }

        async fn create_customer(
            &self,
            customer: &NewCustomer,
        ) -> Result<Option<String>, AirtableError> {
            self.record(Call::CreateCustomer(customer.clone()));
            if self.reject_customer_create {
                Ok(None)
            } else {
                Ok(Some("recCUSTOMER".to_owned()))
            }
        }

        async fn find_order(&self, external_id: &str) -> Result<Option<String>, AirtableError> {
            self.record(Call::FindOrder(external_id.to_owned()));
            Ok(self.orders.lock().unwrap().get(external_id).cloned())
        }

        async fn create_order(&self, order: &NewOrder) -> Result<String, AirtableError> {
            self.record(Call::CreateOrder(order.clone()));
            if self.track_created_orders {
                self.orders
                    .lock()
                    .unwrap()
                    .insert(order.external_id.clone(), "recORDER".to_owned());
            }
            Ok("recORDER".to_owned())
        }

        async fn find_product(&self, sku: &str) -> Result<Option<String>, AirtableError> {
            self.record(Call::FindProduct(sku.to_owned()));
            Ok(self.products.get(sku).cloned())
        }

        async fn set_shipping_status(
            &self,
            record_id: &str,
            status: &str,
        ) -> Result<(), AirtableError> {
            self.record(Call::SetShippingStatus(
                record_id.to_owned(),
                status.to_owned(),
            ));
            Ok(())
        }
    }

    fn sample_order() -> OrderPayload {
        serde_json::from_value(json!({
            "id": 5001,
            "created_at": "2024-03-01T10:00:00Z",
            "subtotal_price": "42.50",
            "financial_status": "paid",
            "name": "#5001",
            "line_items": [{"sku": "X1"}],
            "customer": {
                "phone": "+1555",
                "email": "a@b.com",
                "first_name": "Jo",
                "last_name": "Doe"
            },
            "shipping_address": {"address1": "1 Main St"},
            "order_status_url": "http://track/5001"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn new_order_creates_customer_and_order() {
        let store = MockStore {
            products: HashMap::from([("X1".to_owned(), "recXYZ".to_owned())]),
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        let outcome = reconciler.ingest_order(&sample_order()).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Created);

        let customers = reconciler.store.created_customers();
        assert_eq!(
            customers,
            vec![NewCustomer {
                name: "Jo Doe".to_owned(),
                email: Some("a@b.com".to_owned()),
                phone: Some("+1555".to_owned()),
                address: Some("1 Main St".to_owned()),
            }]
        );

        let orders = reconciler.store.created_orders();
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.external_id, "5001");
        assert_eq!(order.order_number.as_deref(), Some("5001"));
        assert_eq!(order.customer, "recCUSTOMER");
        assert_eq!(order.order_date, "2024-03-01");
        assert_eq!(order.total_amount, Decimal::new(425, 1));
        assert_eq!(order.payment_status, "Paid");
        assert_eq!(order.shipping_status, "New");
        assert_eq!(order.tracking_url.as_deref(), Some("http://track/5001"));
        assert_eq!(order.product_refs, vec!["recXYZ".to_owned()]);
    }

    #[tokio::test]
    async fn duplicate_order_is_skipped_before_customer_resolution() {
        let store = MockStore {
            orders: Mutex::new(HashMap::from([("5001".to_owned(), "recOLD".to_owned())])),
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        let outcome = reconciler.ingest_order(&sample_order()).await.unwrap();
        assert_eq!(outcome, IngestOutcome::DuplicateSkipped);
        // The duplicate check is the first and only remote call.
        assert_eq!(
            reconciler.store.calls(),
            vec![Call::FindOrder("5001".to_owned())]
        );
    }

    #[tokio::test]
    async fn resubmission_is_a_noop_after_creation() {
        let store = MockStore {
            track_created_orders: true,
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        let first = reconciler.ingest_order(&sample_order()).await.unwrap();
        let second = reconciler.ingest_order(&sample_order()).await.unwrap();
        assert_eq!(first, IngestOutcome::Created);
        assert_eq!(second, IngestOutcome::DuplicateSkipped);
        assert_eq!(reconciler.store.created_orders().len(), 1);
    }

    // There is no lock between the existence check and the create; two
    // deliveries of the same new order interleaved between those two steps
    // both insert. Accepted limitation, matched here by a store whose
    // creates stay invisible to the duplicate check.
    #[tokio::test]
    async fn interleaved_deliveries_can_double_create() {
        let store = MockStore::default();
        let reconciler = Reconciler::new(store);

        reconciler.ingest_order(&sample_order()).await.unwrap();
        reconciler.ingest_order(&sample_order()).await.unwrap();
        assert_eq!(reconciler.store.created_orders().len(), 2);
    }

    #[tokio::test]
    async fn phone_lookup_takes_precedence_over_email() {
        let store = MockStore {
            customers_by_phone: HashMap::from([("+1555".to_owned(), "recPHONE".to_owned())]),
            customers_by_email: HashMap::from([("a@b.com".to_owned(), "recEMAIL".to_owned())]),
            products: HashMap::from([("X1".to_owned(), "recXYZ".to_owned())]),
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        reconciler.ingest_order(&sample_order()).await.unwrap();

        let calls = reconciler.store.calls();
        assert!(calls.contains(&Call::FindCustomerByPhone("+1555".to_owned())));
        assert!(
            !calls
                .iter()
                .any(|c| matches!(c, Call::FindCustomerByEmail(_)))
        );
        assert_eq!(reconciler.store.created_orders()[0].customer, "recPHONE");
    }

    #[tokio::test]
    async fn email_lookup_used_only_without_phone() {
        let mut order = sample_order();
        order.customer.as_mut().unwrap().phone = None;

        let store = MockStore {
            customers_by_email: HashMap::from([("a@b.com".to_owned(), "recEMAIL".to_owned())]),
            products: HashMap::from([("X1".to_owned(), "recXYZ".to_owned())]),
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        reconciler.ingest_order(&order).await.unwrap();

        let calls = reconciler.store.calls();
        assert!(calls.contains(&Call::FindCustomerByEmail("a@b.com".to_owned())));
        assert!(
            !calls
                .iter()
                .any(|c| matches!(c, Call::FindCustomerByPhone(_)))
        );
    }

    #[tokio::test]
    async fn missing_phone_match_falls_through_to_creation_not_email() {
        // Phone present but unknown: create a new customer; the email query
        // must not run even though it would have matched.
        let store = MockStore {
            customers_by_email: HashMap::from([("a@b.com".to_owned(), "recEMAIL".to_owned())]),
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        reconciler.ingest_order(&sample_order()).await.unwrap();

        let calls = reconciler.store.calls();
        assert!(
            !calls
                .iter()
                .any(|c| matches!(c, Call::FindCustomerByEmail(_)))
        );
        assert_eq!(reconciler.store.created_customers().len(), 1);
    }

    #[tokio::test]
    async fn absent_customer_subrecord_creates_placeholder_customer() {
        let mut order = sample_order();
        order.customer = None;
        let reconciler = Reconciler::new(MockStore::default());

        let outcome = reconciler.ingest_order(&order).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Created);

        let customers = reconciler.store.created_customers();
        assert_eq!(customers[0].name, "Guest");
        assert_eq!(customers[0].email, None);
        assert_eq!(customers[0].phone, None);
        // No lookup is possible without a phone or email.
        let calls = reconciler.store.calls();
        assert!(!calls.iter().any(|c| matches!(
            c,
            Call::FindCustomerByPhone(_) | Call::FindCustomerByEmail(_)
        )));
    }

    #[tokio::test]
    async fn failed_customer_creation_blocks_the_order() {
        let store = MockStore {
            reject_customer_create: true,
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        let outcome = reconciler.ingest_order(&sample_order()).await.unwrap();
        assert_eq!(outcome, IngestOutcome::CustomerFailed);
        assert!(reconciler.store.created_orders().is_empty());
    }

    #[tokio::test]
    async fn unresolved_skus_are_skipped_without_failing_the_order() {
        let mut order = sample_order();
        order.line_items = serde_json::from_value(json!([
            {"sku": "A"},
            {"sku": "B-missing"},
            {"sku": "C"},
            {"sku": null},
        ]))
        .unwrap();

        let store = MockStore {
            products: HashMap::from([
                ("A".to_owned(), "recA".to_owned()),
                ("C".to_owned(), "recC".to_owned()),
            ]),
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        let outcome = reconciler.ingest_order(&order).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Created);
        assert_eq!(
            reconciler.store.created_orders()[0].product_refs,
            vec!["recA".to_owned(), "recC".to_owned()]
        );
    }

    #[tokio::test]
    async fn missing_required_fields_abort_before_any_remote_call() {
        for strip in ["id", "created_at", "subtotal_price", "financial_status"] {
            let mut order = sample_order();
            match strip {
                "id" => order.id = None,
                "created_at" => order.created_at = None,
                "subtotal_price" => order.subtotal_price = None,
                _ => order.financial_status = None,
            }

            let reconciler = Reconciler::new(MockStore::default());
            let err = reconciler.ingest_order(&order).await.unwrap_err();
            assert!(matches!(err, ReconcileError::MissingField(f) if f == strip));
            assert!(reconciler.store.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn non_numeric_subtotal_is_a_malformed_payload() {
        let mut order = sample_order();
        order.subtotal_price = Some("forty-two".to_owned());

        let reconciler = Reconciler::new(MockStore::default());
        let err = reconciler.ingest_order(&order).await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidAmount(_)));
        assert!(reconciler.store.calls().is_empty());
    }

    #[tokio::test]
    async fn inbound_fulfillment_status_is_ignored_at_creation() {
        let mut order = sample_order();
        order.fulfillment_status = Some("fulfilled".to_owned());

        let reconciler = Reconciler::new(MockStore::default());
        reconciler.ingest_order(&order).await.unwrap();
        assert_eq!(reconciler.store.created_orders()[0].shipping_status, "New");
    }

    #[tokio::test]
    async fn fulfillment_for_unknown_order_is_dropped() {
        let reconciler = Reconciler::new(MockStore::default());

        let outcome = reconciler
            .record_fulfillment("9999", "Shipped")
            .await
            .unwrap();
        assert_eq!(outcome, FulfillmentOutcome::NotFound);
        assert_eq!(
            reconciler.store.calls(),
            vec![Call::FindOrder("9999".to_owned())]
        );
    }

    // The caller picks the status literal; the reconciler applies it
    // verbatim. In practice the dispatcher always passes "Shipped", even
    // for partial or cancelled fulfillment events.
    #[tokio::test]
    async fn fulfillment_patches_only_the_matched_record() {
        let store = MockStore {
            orders: Mutex::new(HashMap::from([("5001".to_owned(), "recORD".to_owned())])),
            ..MockStore::default()
        };
        let reconciler = Reconciler::new(store);

        let outcome = reconciler
            .record_fulfillment("5001", "Shipped")
            .await
            .unwrap();
        assert_eq!(outcome, FulfillmentOutcome::Updated);
        assert_eq!(
            reconciler.store.calls(),
            vec![
                Call::FindOrder("5001".to_owned()),
                Call::SetShippingStatus("recORD".to_owned(), "Shipped".to_owned()),
            ]
        );
    }

    #[test]
    fn capitalize_matches_remote_casing() {
        assert_eq!(capitalize("paid"), "Paid");
        assert_eq!(capitalize("PAID"), "Paid");
        assert_eq!(capitalize("partially_refunded"), "Partially_refunded");
        assert_eq!(capitalize(""), "");
    }
}
