//! # Stock Ledger Engine
//!
//! The single writer of `currentStock`. Four operations, each of which
//! reads a snapshot, validates against it, and commits exactly one atomic
//! write batch or nothing at all.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Read → Validate → Build → Commit                      │
//! │                                                                         │
//! │  1. Snapshot-read every product the draft touches (+ versions)         │
//! │  2. Validate sufficiency against a working stock view                  │
//! │       └── any failure → typed error, zero writes                       │
//! │  3. Build ONE WriteBatch:                                              │
//! │       Transaction (Set) + items (Set) + stock deltas (Increment)       │
//! │       + a version guard for every product read                         │
//! │  4. Commit. VersionConflict → retry the whole cycle (max 5)            │
//! │                                                                         │
//! │  The loser of a race re-reads the post-commit stock and fails its      │
//! │  own validation, so currentStock can never go negative through the     │
//! │  engine.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shortfall Sales
//! Selling more finished units than are on hand is legal when the product
//! has a bill of materials: the missing units are assembled implicitly from
//! component stock inside the same transaction. The finished product's own
//! stock never goes below zero; the cost of sold goods blends the ready
//! units' cost with the assembled units' component cost.
//!
//! ## Reversal
//! `revert_transaction` soft-cancels: stock adjustments are undone on
//! products that still exist, and the transaction flips to CANCELLED in
//! place, keeping itself and its items as audit history. If the guarded
//! commit fails on a storage error, ONE unguarded best-effort pass runs and
//! the result is reported as [`ReversalOutcome::Degraded`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stockbook_core::validation::{
    validate_bom, validate_discount_cents, validate_line_count, validate_owner_id,
    validate_price_cents, validate_quantity,
};
use stockbook_core::{
    bom, ItemRole, Product, Transaction, TransactionItem, TransactionKind, TransactionStatus,
};
use stockbook_store::{
    collections, fields, to_document_body, Filter, Patch, StoreHandle, WriteBatch,
};

use crate::error::{LedgerError, LedgerResult};
use crate::MAX_COMMIT_ATTEMPTS;

// =============================================================================
// Draft Inputs
// =============================================================================

/// One line of a sale draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
    /// Missing price defaults to the product's current `salePriceCents`.
    pub unit_price_cents: Option<i64>,
}

/// Input for [`StockLedger::record_sale`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    pub owner_id: String,
    pub lines: Vec<SaleLine>,
    #[serde(default)]
    pub discount_cents: i64,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub notes: Option<String>,
    /// Defaults to now.
    pub date: Option<DateTime<Utc>>,
    /// True records the sale as PENDING_PAYMENT instead of COMPLETED.
    #[serde(default)]
    pub payment_pending: bool,
}

impl SaleDraft {
    /// A draft with one line and no trimmings; tests and callers fill in
    /// the rest as needed.
    pub fn simple(owner_id: impl Into<String>, product_id: impl Into<String>, quantity: i64) -> Self {
        SaleDraft {
            owner_id: owner_id.into(),
            lines: vec![SaleLine {
                product_id: product_id.into(),
                quantity,
                unit_price_cents: None,
            }],
            discount_cents: 0,
            client_id: None,
            client_name: None,
            notes: None,
            date: None,
            payment_pending: false,
        }
    }
}

/// One line of a purchase draft. Unit cost is required: the supplier's
/// price is the one fact a purchase always knows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// Input for [`StockLedger::record_purchase`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDraft {
    pub owner_id: String,
    pub lines: Vec<PurchaseLine>,
    #[serde(default)]
    pub discount_cents: i64,
    pub supplier_id: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// How a reversal completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalOutcome {
    /// Single guarded batch: adjustments and the status flip landed together.
    Atomic,
    /// The guarded path failed on storage; independent unguarded writes
    /// restored stock and flipped the status. Consistency was weakened and
    /// the caller may want to surface that.
    Degraded,
}

// =============================================================================
// Snapshot Bookkeeping
// =============================================================================

/// Products read during one attempt, with their versions and a working
/// stock view that accumulates consumption across draft lines.
#[derive(Default)]
struct Snapshots {
    products: HashMap<String, (Product, u64)>,
    working: HashMap<String, i64>,
}

impl Snapshots {
    fn product(&self, id: &str) -> &Product {
        &self.products[id].0
    }

    fn working(&self, id: &str) -> i64 {
        self.working[id]
    }

    fn consume(&mut self, id: &str, amount: i64) {
        if let Some(stock) = self.working.get_mut(id) {
            *stock -= amount;
        }
    }

    /// Component lookup for cost math, restricted to one product's BOM.
    fn components_for(&self, product: &Product) -> HashMap<String, Product> {
        product
            .bom
            .iter()
            .filter_map(|line| {
                self.products
                    .get(&line.component_product_id)
                    .map(|(p, _)| (p.id.clone(), p.clone()))
            })
            .collect()
    }
}

/// Line-level plan computed during validation, turned into items afterwards.
struct PlannedLine {
    product_id: String,
    product_name: String,
    sku: Option<String>,
    quantity: i64,
    unit_price_cents: i64,
    unit_cost_cents: i64,
    from_stock: i64,
}

// =============================================================================
// StockLedger
// =============================================================================

/// The transaction engine. Cheap to clone; all state lives in the store.
#[derive(Clone)]
pub struct StockLedger {
    store: StoreHandle,
}

impl StockLedger {
    pub fn new(store: StoreHandle) -> Self {
        StockLedger { store }
    }

    // ===== Sales =====

    /// Records a sale: decrements stock (consuming components for any
    /// shortfall), writes the Transaction and its items, all atomically.
    ///
    /// ## Errors
    /// - [`LedgerError::ProductNotFound`] - unknown or foreign product id
    /// - [`LedgerError::InsufficientStock`] - shortfall with no BOM
    /// - [`LedgerError::InsufficientComponentStock`] - BOM can't cover it
    /// - [`LedgerError::Validation`] - bad quantities, prices, discount
    pub async fn record_sale(&self, draft: SaleDraft) -> LedgerResult<Transaction> {
        validate_owner_id(&draft.owner_id)?;
        validate_line_count(draft.lines.len())?;
        for line in &draft.lines {
            validate_quantity(line.quantity)?;
            if let Some(price) = line.unit_price_cents {
                validate_price_cents(price)?;
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_sale(&draft).await {
                Err(err) if err.is_conflict() && attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(attempt, "Sale commit lost a race, retrying");
                }
                other => return other,
            }
        }
    }

    async fn try_sale(&self, draft: &SaleDraft) -> LedgerResult<Transaction> {
        let mut snaps = Snapshots::default();
        let mut planned: Vec<PlannedLine> = Vec::with_capacity(draft.lines.len());
        // component id -> total units consumed, ordered for stable items
        let mut consumed: BTreeMap<String, i64> = BTreeMap::new();

        for line in &draft.lines {
            self.snapshot(&mut snaps, &draft.owner_id, &line.product_id)
                .await?;
            let product = snaps.product(&line.product_id).clone();
            let stock = snaps.working(&line.product_id);

            let from_stock = stock.clamp(0, line.quantity);
            let shortfall = line.quantity - from_stock;
            let unit_price = line.unit_price_cents.unwrap_or(product.sale_price_cents);

            let unit_cost = if shortfall == 0 {
                product.cost_price()
            } else {
                if !product.has_bom() {
                    return Err(LedgerError::InsufficientStock {
                        product: product.name.clone(),
                        requested: line.quantity,
                        available: stock.max(0),
                    });
                }
                // The catalog rejects malformed BOMs, but a document seeded
                // around it must not assemble with zero consumption.
                validate_bom(&product.bom)?;

                for bom_line in &product.bom {
                    let component_id = &bom_line.component_product_id;
                    self.snapshot(&mut snaps, &draft.owner_id, component_id)
                        .await?;

                    let required = shortfall * bom_line.quantity_per_unit;
                    let available = snaps.working(component_id);
                    if required > available {
                        return Err(LedgerError::InsufficientComponentStock {
                            component: snaps.product(component_id).name.clone(),
                            required,
                            available: available.max(0),
                        });
                    }

                    snaps.consume(component_id, required);
                    *consumed.entry(component_id.clone()).or_insert(0) += required;
                }

                // Blend: ready units at book cost, assembled units at
                // component cost, averaged over the line.
                let assembled = bom::assembled_unit_cost(&product, &snaps.components_for(&product));
                let blended = product.cost_price().multiply_quantity(from_stock)
                    + assembled.multiply_quantity(shortfall);
                blended.per_unit(line.quantity)
            };

            snaps.consume(&line.product_id, from_stock);
            planned.push(PlannedLine {
                product_id: line.product_id.clone(),
                product_name: product.name,
                sku: product.sku,
                quantity: line.quantity,
                unit_price_cents: unit_price,
                unit_cost_cents: unit_cost.cents(),
                from_stock,
            });
        }

        let total: i64 = planned
            .iter()
            .map(|line| line.unit_price_cents.saturating_mul(line.quantity))
            .sum();
        validate_discount_cents(draft.discount_cents, total)?;
        let net = total - draft.discount_cents;

        let now = Utc::now();
        let txn = Transaction {
            id: Uuid::new_v4().to_string(),
            owner_id: draft.owner_id.clone(),
            kind: TransactionKind::Sale,
            status: if draft.payment_pending {
                TransactionStatus::PendingPayment
            } else {
                TransactionStatus::Completed
            },
            date: draft.date.unwrap_or(now),
            total_cents: total,
            discount_cents: draft.discount_cents,
            net_total_cents: net,
            supplier_id: None,
            client_id: draft.client_id.clone(),
            client_name: draft.client_name.clone(),
            invoice_number: None,
            notes: draft.notes.clone(),
            created_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.set(
            collections::TRANSACTIONS,
            &txn.id,
            body_of(&txn)?,
        );

        for line in &planned {
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: txn.id.clone(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                sku: line.sku.clone(),
                quantity: line.quantity,
                price_cents: line.unit_price_cents,
                cost_price_cents: line.unit_cost_cents,
                role: ItemRole::Line,
                stock_delta: -line.from_stock,
                created_at: now,
            };
            batch.set(collections::TRANSACTION_ITEMS, &item.id, body_of(&item)?);
        }

        for (component_id, required) in &consumed {
            let component = snaps.product(component_id);
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: txn.id.clone(),
                product_id: component_id.clone(),
                product_name: component.name.clone(),
                sku: component.sku.clone(),
                quantity: *required,
                price_cents: component.cost_price_cents,
                cost_price_cents: component.cost_price_cents,
                role: ItemRole::Consumption,
                stock_delta: -required,
                created_at: now,
            };
            batch.set(collections::TRANSACTION_ITEMS, &item.id, body_of(&item)?);
        }

        // One Increment per touched product, guarded by every product read.
        let now_value = body_of(&now)?;
        let mut deltas: BTreeMap<String, i64> = BTreeMap::new();
        for line in &planned {
            if line.from_stock > 0 {
                *deltas.entry(line.product_id.clone()).or_insert(0) -= line.from_stock;
            }
        }
        for (component_id, required) in &consumed {
            *deltas.entry(component_id.clone()).or_insert(0) -= required;
        }
        for (product_id, delta) in &deltas {
            batch.update(
                collections::PRODUCTS,
                product_id,
                Patch::new()
                    .increment(fields::CURRENT_STOCK, *delta)
                    .set(fields::UPDATED_AT, now_value.clone()),
            );
        }
        for (product_id, (_, version)) in &snaps.products {
            batch.require_version(collections::PRODUCTS, product_id, *version);
        }

        self.store.commit(batch).await?;

        info!(
            transaction_id = %txn.id,
            lines = planned.len(),
            components_consumed = consumed.len(),
            net_cents = net,
            "Sale recorded"
        );
        Ok(txn)
    }

    // ===== Purchases =====

    /// Records a purchase: adds stock, stamps last-paid cost (and supplier
    /// when given) on each product, writes the Transaction and its items.
    ///
    /// Purchases carry no version guards: stock increments commute, so
    /// there is no read-then-write race to lose. One attempt, no retry.
    pub async fn record_purchase(&self, draft: PurchaseDraft) -> LedgerResult<Transaction> {
        validate_owner_id(&draft.owner_id)?;
        validate_line_count(draft.lines.len())?;
        for line in &draft.lines {
            validate_quantity(line.quantity)?;
            validate_price_cents(line.unit_cost_cents)?;
        }

        // Existence/owner check plus name and sku snapshots for the items.
        let mut products: HashMap<String, Product> = HashMap::new();
        for line in &draft.lines {
            if products.contains_key(&line.product_id) {
                continue;
            }
            let (product, _) = self
                .store
                .get::<Product>(&line.product_id)
                .await?
                .ok_or_else(|| LedgerError::product_not_found(&line.product_id))?;
            if product.owner_id != draft.owner_id {
                return Err(LedgerError::product_not_found(&line.product_id));
            }
            products.insert(line.product_id.clone(), product);
        }

        let total: i64 = draft
            .lines
            .iter()
            .map(|line| line.unit_cost_cents.saturating_mul(line.quantity))
            .sum();
        validate_discount_cents(draft.discount_cents, total)?;
        let net = total - draft.discount_cents;

        let now = Utc::now();
        let txn = Transaction {
            id: Uuid::new_v4().to_string(),
            owner_id: draft.owner_id.clone(),
            kind: TransactionKind::Purchase,
            status: TransactionStatus::Completed,
            date: draft.date.unwrap_or(now),
            total_cents: total,
            discount_cents: draft.discount_cents,
            net_total_cents: net,
            supplier_id: draft.supplier_id.clone(),
            client_id: None,
            client_name: None,
            invoice_number: draft.invoice_number.clone(),
            notes: draft.notes.clone(),
            created_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.set(collections::TRANSACTIONS, &txn.id, body_of(&txn)?);

        let now_value = body_of(&now)?;
        for line in &draft.lines {
            let product = &products[&line.product_id];
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: txn.id.clone(),
                product_id: line.product_id.clone(),
                product_name: product.name.clone(),
                sku: product.sku.clone(),
                quantity: line.quantity,
                price_cents: line.unit_cost_cents,
                cost_price_cents: line.unit_cost_cents,
                role: ItemRole::Line,
                stock_delta: line.quantity,
                created_at: now,
            };
            batch.set(collections::TRANSACTION_ITEMS, &item.id, body_of(&item)?);

            // Last cost wins; two lines for the same product apply in order.
            let mut patch = Patch::new()
                .increment(fields::CURRENT_STOCK, line.quantity)
                .set(fields::COST_PRICE, line.unit_cost_cents)
                .set(fields::UPDATED_AT, now_value.clone());
            if let Some(supplier_id) = &draft.supplier_id {
                patch = patch.set(fields::SUPPLIER_ID, supplier_id.clone());
            }
            batch.update(collections::PRODUCTS, &line.product_id, patch);
        }

        self.store.commit(batch).await?;

        info!(
            transaction_id = %txn.id,
            lines = draft.lines.len(),
            net_cents = net,
            "Purchase recorded"
        );
        Ok(txn)
    }

    // ===== Assemblies =====

    /// Converts component stock into finished stock ahead of demand.
    ///
    /// Writes an audit Transaction valued at the consumed component cost,
    /// CONSUMPTION items for the components, and an OUTPUT item for the
    /// produced units (price 0: nothing was sold).
    pub async fn process_assembly(
        &self,
        final_product_id: &str,
        quantity: i64,
    ) -> LedgerResult<Transaction> {
        validate_quantity(quantity)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_assembly(final_product_id, quantity).await {
                Err(err) if err.is_conflict() && attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(attempt, "Assembly commit lost a race, retrying");
                }
                other => return other,
            }
        }
    }

    async fn try_assembly(
        &self,
        final_product_id: &str,
        quantity: i64,
    ) -> LedgerResult<Transaction> {
        let (product, product_version) = self
            .store
            .get::<Product>(final_product_id)
            .await?
            .ok_or_else(|| LedgerError::product_not_found(final_product_id))?;

        if !product.has_bom() {
            return Err(LedgerError::NoBomDefined {
                product: product.name.clone(),
            });
        }
        // Rejects non-positive quantities and duplicate components in
        // documents seeded around the catalog.
        validate_bom(&product.bom)?;

        // BTreeMap keys the consumption items in stable component order.
        let mut required: BTreeMap<String, i64> = BTreeMap::new();
        for req in bom::assembly_requirements(&product, quantity) {
            *required.entry(req.component_product_id).or_insert(0) += req.required;
        }

        let mut components: HashMap<String, (Product, u64)> = HashMap::new();
        for (component_id, needed) in &required {
            let (component, version) = self
                .store
                .get::<Product>(component_id)
                .await?
                .ok_or_else(|| LedgerError::product_not_found(component_id))?;
            if component.owner_id != product.owner_id {
                return Err(LedgerError::product_not_found(component_id));
            }
            if *needed > component.current_stock {
                return Err(LedgerError::InsufficientComponentStock {
                    component: component.name.clone(),
                    required: *needed,
                    available: component.current_stock.max(0),
                });
            }
            components.insert(component_id.clone(), (component, version));
        }

        let component_map: HashMap<String, Product> = components
            .iter()
            .map(|(id, (p, _))| (id.clone(), p.clone()))
            .collect();
        let unit_cost = bom::assembled_unit_cost(&product, &component_map);
        let total = unit_cost.multiply_quantity(quantity).cents();

        let now = Utc::now();
        let txn = Transaction {
            id: Uuid::new_v4().to_string(),
            owner_id: product.owner_id.clone(),
            kind: TransactionKind::Assembly,
            status: TransactionStatus::Completed,
            date: now,
            total_cents: total,
            discount_cents: 0,
            net_total_cents: total,
            supplier_id: None,
            client_id: None,
            client_name: None,
            invoice_number: None,
            notes: None,
            created_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.set(collections::TRANSACTIONS, &txn.id, body_of(&txn)?);

        for (component_id, needed) in &required {
            let (component, _) = &components[component_id];
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: txn.id.clone(),
                product_id: component_id.clone(),
                product_name: component.name.clone(),
                sku: component.sku.clone(),
                quantity: *needed,
                price_cents: component.cost_price_cents,
                cost_price_cents: component.cost_price_cents,
                role: ItemRole::Consumption,
                stock_delta: -needed,
                created_at: now,
            };
            batch.set(collections::TRANSACTION_ITEMS, &item.id, body_of(&item)?);
        }

        let output = TransactionItem {
            id: Uuid::new_v4().to_string(),
            transaction_id: txn.id.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            sku: product.sku.clone(),
            quantity,
            price_cents: 0,
            cost_price_cents: unit_cost.cents(),
            role: ItemRole::Output,
            stock_delta: quantity,
            created_at: now,
        };
        batch.set(collections::TRANSACTION_ITEMS, &output.id, body_of(&output)?);

        let now_value = body_of(&now)?;
        for (component_id, needed) in &required {
            batch.update(
                collections::PRODUCTS,
                component_id,
                Patch::new()
                    .increment(fields::CURRENT_STOCK, -needed)
                    .set(fields::UPDATED_AT, now_value.clone()),
            );
        }
        batch.update(
            collections::PRODUCTS,
            &product.id,
            Patch::new()
                .increment(fields::CURRENT_STOCK, quantity)
                .set(fields::UPDATED_AT, now_value.clone()),
        );

        batch.require_version(collections::PRODUCTS, &product.id, product_version);
        for (component_id, (_, version)) in &components {
            batch.require_version(collections::PRODUCTS, component_id, *version);
        }

        self.store.commit(batch).await?;

        info!(
            transaction_id = %txn.id,
            product_id = %product.id,
            quantity,
            "Assembly processed"
        );
        Ok(txn)
    }

    // ===== Reversals =====

    /// Undoes a transaction's stock effects and soft-cancels it.
    ///
    /// ## Behavior
    /// - products that no longer exist are skipped silently
    /// - the transaction and its items are kept, status flips to CANCELLED
    /// - a second reversal fails with [`LedgerError::AlreadyCancelled`]
    ///
    /// ## Degraded mode
    /// When the guarded batch fails on a storage error, one unguarded
    /// best-effort pass applies the same adjustments as independent writes.
    /// Success that way returns [`ReversalOutcome::Degraded`].
    pub async fn revert_transaction(&self, transaction_id: &str) -> LedgerResult<ReversalOutcome> {
        let mut attempt = 0;
        let primary = loop {
            attempt += 1;
            match self.try_revert(transaction_id).await {
                Err(err) if err.is_conflict() && attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(attempt, transaction_id, "Reversal commit lost a race, retrying");
                }
                other => break other,
            }
        };

        match primary {
            Ok(()) => Ok(ReversalOutcome::Atomic),
            Err(LedgerError::Storage(err)) => {
                warn!(
                    transaction_id,
                    error = %err,
                    "Guarded reversal failed, attempting unguarded fallback"
                );
                self.revert_degraded(transaction_id).await?;
                Ok(ReversalOutcome::Degraded)
            }
            Err(other) => Err(other),
        }
    }

    async fn try_revert(&self, transaction_id: &str) -> LedgerResult<()> {
        let (txn, txn_version) = self.load_revertible(transaction_id).await?;
        let deltas = self.reversal_deltas(transaction_id).await?;

        let now_value = body_of(&Utc::now())?;
        let mut batch = WriteBatch::new();

        for (product_id, delta) in &deltas {
            match self.store.get::<Product>(product_id).await? {
                None => {
                    debug!(product_id = %product_id, "Product gone, skipping reversal adjustment");
                }
                Some((product, _)) if product.owner_id != txn.owner_id => {
                    debug!(product_id = %product_id, "Product owner changed, skipping reversal adjustment");
                }
                Some((_, version)) => {
                    batch.update(
                        collections::PRODUCTS,
                        product_id,
                        Patch::new()
                            .increment(fields::CURRENT_STOCK, -delta)
                            .set(fields::UPDATED_AT, now_value.clone()),
                    );
                    batch.require_version(collections::PRODUCTS, product_id, version);
                }
            }
        }

        batch.update(
            collections::TRANSACTIONS,
            transaction_id,
            Patch::new().set(fields::STATUS, body_of(&TransactionStatus::Cancelled)?),
        );
        batch.require_version(collections::TRANSACTIONS, transaction_id, txn_version);

        self.store.commit(batch).await?;

        info!(transaction_id, "Transaction reverted");
        Ok(())
    }

    /// Best-effort fallback: same adjustments as independent unguarded
    /// writes. Re-reads everything first; a transaction another writer
    /// cancelled in the meantime is NOT reverted twice.
    async fn revert_degraded(&self, transaction_id: &str) -> LedgerResult<()> {
        let (txn, _) = self.load_revertible(transaction_id).await?;
        let deltas = self.reversal_deltas(transaction_id).await?;

        let now_value = body_of(&Utc::now())?;
        for (product_id, delta) in &deltas {
            match self.store.get::<Product>(product_id).await? {
                None => {
                    debug!(product_id = %product_id, "Product gone, skipping reversal adjustment");
                }
                Some((product, _)) if product.owner_id != txn.owner_id => {
                    debug!(product_id = %product_id, "Product owner changed, skipping reversal adjustment");
                }
                Some(_) => {
                    let mut batch = WriteBatch::new();
                    batch.update(
                        collections::PRODUCTS,
                        product_id,
                        Patch::new()
                            .increment(fields::CURRENT_STOCK, -delta)
                            .set(fields::UPDATED_AT, now_value.clone()),
                    );
                    self.store.commit(batch).await?;
                }
            }
        }

        let mut batch = WriteBatch::new();
        batch.update(
            collections::TRANSACTIONS,
            transaction_id,
            Patch::new().set(fields::STATUS, body_of(&TransactionStatus::Cancelled)?),
        );
        self.store.commit(batch).await?;

        warn!(transaction_id, "Transaction reverted via unguarded fallback");
        Ok(())
    }

    /// Loads a transaction that is allowed to be reverted.
    async fn load_revertible(&self, transaction_id: &str) -> LedgerResult<(Transaction, u64)> {
        let (txn, version) = self
            .store
            .get::<Transaction>(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))?;

        if txn.is_cancelled() {
            return Err(LedgerError::AlreadyCancelled {
                transaction_id: transaction_id.to_string(),
            });
        }

        Ok((txn, version))
    }

    /// Net stock delta per product across the transaction's items. The
    /// reversal applies the negation of each.
    async fn reversal_deltas(&self, transaction_id: &str) -> LedgerResult<BTreeMap<String, i64>> {
        let items = self
            .store
            .find_by::<TransactionItem>(&[Filter::eq(fields::TRANSACTION_ID, transaction_id)])
            .await?;

        let mut deltas: BTreeMap<String, i64> = BTreeMap::new();
        for (item, _) in items {
            *deltas.entry(item.product_id).or_insert(0) += item.stock_delta;
        }
        deltas.retain(|_, delta| *delta != 0);
        Ok(deltas)
    }

    // ===== Shared =====

    /// Reads a product into the snapshot set (once), owner-checked.
    async fn snapshot(
        &self,
        snaps: &mut Snapshots,
        owner_id: &str,
        product_id: &str,
    ) -> LedgerResult<()> {
        if snaps.products.contains_key(product_id) {
            return Ok(());
        }

        let (product, version) = self
            .store
            .get::<Product>(product_id)
            .await?
            .ok_or_else(|| LedgerError::product_not_found(product_id))?;
        if product.owner_id != owner_id {
            return Err(LedgerError::product_not_found(product_id));
        }

        snaps
            .working
            .insert(product_id.to_string(), product.current_stock);
        snaps
            .products
            .insert(product_id.to_string(), (product, version));
        Ok(())
    }
}

fn body_of<T: Serialize>(value: &T) -> LedgerResult<Value> {
    to_document_body(value).map_err(LedgerError::Storage)
}

// =============================================================================
// Unit Tests
// =============================================================================
