//! # Product Catalog
//!
//! CRUD for products, owner-scoped. The catalog never touches
//! `currentStock` after creation: [`ProductUpdate`] has no stock field, so
//! stock mutation outside the engine is impossible at the type level. The
//! only stock the catalog ever writes is the opening balance on create.
//!
//! ## Write Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Writes What                                      │
//! │                                                                         │
//! │  Catalog   → product identity: name, sku, prices, BOM, bounds          │
//! │  Engine    → currentStock (and costPrice on purchases)                 │
//! │                                                                         │
//! │  Catalog updates replace the document body under a version guard, so   │
//! │  a racing engine commit is never silently overwritten: the catalog     │
//! │  loses the race, re-reads, and reapplies its field changes.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use stockbook_core::validation::{
    validate_bom, validate_initial_stock, validate_owner_id, validate_price_cents,
    validate_product_name, validate_sku, validate_stock_bounds,
};
use stockbook_core::{bom, BomLine, Product, ProductKind, ValidationError};
use stockbook_store::{collections, to_document_body, Document, Filter, StoreHandle, WriteBatch};

use crate::error::{LedgerError, LedgerResult};
use crate::MAX_COMMIT_ATTEMPTS;

// =============================================================================
// Input Types
// =============================================================================

/// Input for creating a product.
///
/// `initial_stock` is the only stock value the catalog ever accepts; all
/// later movement goes through the ledger engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub owner_id: String,
    pub name: String,
    pub sku: Option<String>,
    #[serde(rename = "type")]
    pub kind: ProductKind,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub max_stock: i64,
    #[serde(default)]
    pub cost_price_cents: i64,
    #[serde(default)]
    pub sale_price_cents: i64,
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub bom: Vec<BomLine>,
}

/// Partial update for a product. Absent fields are left unchanged.
///
/// There is deliberately no stock field here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ProductKind>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub cost_price_cents: Option<i64>,
    pub sale_price_cents: Option<i64>,
    pub supplier_id: Option<String>,
    /// Replaces the whole BOM. An empty list clears it.
    pub bom: Option<Vec<BomLine>>,
}

/// A BOM only makes sense on a finished product.
fn check_bom_kind(bom: &[BomLine], kind: ProductKind) -> Result<(), ValidationError> {
    if !bom.is_empty() && kind != ProductKind::Finished {
        return Err(ValidationError::InvalidFormat {
            field: "type".to_string(),
            reason: "a bill of materials requires a FINAL product".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Catalog
// =============================================================================

/// Owner-scoped product catalog over the document store.
#[derive(Clone)]
pub struct Catalog {
    store: StoreHandle,
}

impl Catalog {
    pub fn new(store: StoreHandle) -> Self {
        Catalog { store }
    }

    /// Creates a product and returns it with its generated id.
    ///
    /// ## Validation
    /// - name, sku, prices, stock bounds per the core rules
    /// - BOM entries well-formed (positive quantities, no duplicates)
    /// - a non-empty BOM requires `type = FINAL`
    pub async fn create_product(&self, new: NewProduct) -> LedgerResult<Product> {
        validate_owner_id(&new.owner_id)?;
        validate_product_name(&new.name)?;
        if let Some(sku) = &new.sku {
            validate_sku(sku)?;
        }
        validate_initial_stock(new.initial_stock)?;
        validate_stock_bounds(new.min_stock, new.max_stock)?;
        validate_price_cents(new.cost_price_cents)?;
        validate_price_cents(new.sale_price_cents)?;
        validate_bom(&new.bom)?;
        check_bom_kind(&new.bom, new.kind)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            owner_id: new.owner_id,
            sku: new.sku,
            name: new.name,
            kind: new.kind,
            current_stock: new.initial_stock,
            min_stock: new.min_stock,
            max_stock: new.max_stock,
            cost_price_cents: new.cost_price_cents,
            sale_price_cents: new.sale_price_cents,
            supplier_id: new.supplier_id,
            bom: new.bom,
            created_at: now,
            updated_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.set(
            collections::PRODUCTS,
            &product.id,
            to_document_body(&product).map_err(LedgerError::Storage)?,
        );
        self.store.commit(batch).await?;

        info!(
            product_id = %product.id,
            name = %product.name,
            "Product created"
        );
        Ok(product)
    }

    /// Reads a product. Missing or foreign-owner ids both report
    /// [`LedgerError::ProductNotFound`].
    pub async fn get_product(&self, owner_id: &str, id: &str) -> LedgerResult<Product> {
        let (product, _) = self.read_owned(owner_id, id).await?;
        Ok(product)
    }

    /// Lists every product for an owner, sorted by name.
    pub async fn products_for_owner(&self, owner_id: &str) -> LedgerResult<Vec<Product>> {
        let found = self
            .store
            .find_by::<Product>(&[Filter::eq(
                stockbook_store::fields::OWNER_ID,
                owner_id,
            )])
            .await?;

        let mut products: Vec<Product> = found.into_iter().map(|(p, _)| p).collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }

    /// Applies a partial update under a version guard, retrying on conflict.
    pub async fn update_product(
        &self,
        owner_id: &str,
        id: &str,
        update: ProductUpdate,
    ) -> LedgerResult<Product> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_update(owner_id, id, &update).await {
                Err(err) if err.is_conflict() && attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(attempt, product_id = id, "Catalog update lost a race, retrying");
                }
                other => return other,
            }
        }
    }

    async fn try_update(
        &self,
        owner_id: &str,
        id: &str,
        update: &ProductUpdate,
    ) -> LedgerResult<Product> {
        let (mut product, version) = self.read_owned(owner_id, id).await?;

        if let Some(name) = &update.name {
            product.name = name.clone();
        }
        if let Some(sku) = &update.sku {
            product.sku = Some(sku.clone());
        }
        if let Some(kind) = update.kind {
            product.kind = kind;
        }
        if let Some(min) = update.min_stock {
            product.min_stock = min;
        }
        if let Some(max) = update.max_stock {
            product.max_stock = max;
        }
        if let Some(cost) = update.cost_price_cents {
            product.cost_price_cents = cost;
        }
        if let Some(price) = update.sale_price_cents {
            product.sale_price_cents = price;
        }
        if let Some(supplier) = &update.supplier_id {
            product.supplier_id = Some(supplier.clone());
        }
        if let Some(bom) = &update.bom {
            product.bom = bom.clone();
        }

        // The merged document must satisfy the same rules as a fresh one.
        validate_product_name(&product.name)?;
        if let Some(sku) = &product.sku {
            validate_sku(sku)?;
        }
        validate_stock_bounds(product.min_stock, product.max_stock)?;
        validate_price_cents(product.cost_price_cents)?;
        validate_price_cents(product.sale_price_cents)?;
        validate_bom(&product.bom)?;
        check_bom_kind(&product.bom, product.kind)?;

        product.updated_at = Utc::now();

        let mut batch = WriteBatch::new();
        batch.set(
            collections::PRODUCTS,
            id,
            to_document_body(&product).map_err(LedgerError::Storage)?,
        );
        batch.require_version(Product::COLLECTION, id, version);
        self.store.commit(batch).await?;

        debug!(product_id = id, "Product updated");
        Ok(product)
    }

    /// Hard-deletes a product.
    ///
    /// Reversals of old transactions that touched this product will skip it;
    /// that is the intended contract, so there is no soft-delete flag.
    pub async fn delete_product(&self, owner_id: &str, id: &str) -> LedgerResult<()> {
        self.read_owned(owner_id, id).await?;

        let mut batch = WriteBatch::new();
        batch.delete(collections::PRODUCTS, id);
        self.store.commit(batch).await?;

        info!(product_id = id, "Product deleted");
        Ok(())
    }

    /// How many units of a finished product could be assembled right now.
    ///
    /// Recomputed from fresh component reads on every call, never cached.
    /// Products without a BOM report 0.
    pub async fn virtual_stock(&self, owner_id: &str, id: &str) -> LedgerResult<i64> {
        let (product, _) = self.read_owned(owner_id, id).await?;

        let mut components = std::collections::HashMap::new();
        for line in &product.bom {
            if let Some((component, _)) = self
                .store
                .get::<Product>(&line.component_product_id)
                .await?
            {
                if component.owner_id == owner_id {
                    components.insert(component.id.clone(), component);
                }
            }
        }

        Ok(bom::virtual_stock(&product, &components))
    }

    /// Owner-checked read. Foreign owners see the same error as a missing id.
    async fn read_owned(&self, owner_id: &str, id: &str) -> LedgerResult<(Product, u64)> {
        let (product, version) = self
            .store
            .get::<Product>(id)
            .await?
            .ok_or_else(|| LedgerError::product_not_found(id))?;

        if product.owner_id != owner_id {
            return Err(LedgerError::product_not_found(id));
        }

        Ok((product, version))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stockbook_store::MemoryStore;

    const OWNER: &str = "owner-1";

    fn catalog() -> Catalog {
        Catalog::new(StoreHandle::new(Arc::new(MemoryStore::new())))
    }

    fn new_product(name: &str, kind: ProductKind, stock: i64) -> NewProduct {
        NewProduct {
            owner_id: OWNER.to_string(),
            name: name.to_string(),
            sku: None,
            kind,
            initial_stock: stock,
            min_stock: 0,
            max_stock: 100,
            cost_price_cents: 200,
            sale_price_cents: 500,
            supplier_id: None,
            bom: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_and_get_roundtrip() {
        let catalog = catalog();

        let created = catalog
            .create_product(new_product("Soap Bar", ProductKind::Finished, 24))
            .await
            .unwrap();
        assert_eq!(created.current_stock, 24);

        let loaded = catalog.get_product(OWNER, &created.id).await.unwrap();
        assert_eq!(loaded.name, "Soap Bar");
        assert_eq!(loaded.kind, ProductKind::Finished);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let catalog = catalog();

        let blank_name = new_product("   ", ProductKind::Finished, 0);
        assert!(matches!(
            catalog.create_product(blank_name).await,
            Err(LedgerError::Validation(_))
        ));

        let negative_stock = new_product("Soap", ProductKind::Finished, -1);
        assert!(matches!(
            catalog.create_product(negative_stock).await,
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_bom_requires_finished_kind() {
        let catalog = catalog();

        let mut bad = new_product("Wax Block", ProductKind::Component, 10);
        bad.bom = vec![BomLine {
            component_product_id: "some-other".to_string(),
            quantity_per_unit: 2,
        }];

        assert!(matches!(
            catalog.create_product(bad).await,
            Err(LedgerError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cross_owner_reads_report_not_found() {
        let catalog = catalog();
        let created = catalog
            .create_product(new_product("Soap Bar", ProductKind::Finished, 5))
            .await
            .unwrap();

        let err = catalog.get_product("someone-else", &created.id).await;
        assert!(matches!(err, Err(LedgerError::ProductNotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_merges_fields_only() {
        let catalog = catalog();
        let created = catalog
            .create_product(new_product("Soap Bar", ProductKind::Finished, 24))
            .await
            .unwrap();

        let updated = catalog
            .update_product(
                OWNER,
                &created.id,
                ProductUpdate {
                    name: Some("Lavender Soap Bar".to_string()),
                    sale_price_cents: Some(650),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Lavender Soap Bar");
        assert_eq!(updated.sale_price_cents, 650);
        // Untouched fields survive, including stock.
        assert_eq!(updated.current_stock, 24);
        assert_eq!(updated.cost_price_cents, 200);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_validates_merged_document() {
        let catalog = catalog();
        let component = catalog
            .create_product(new_product("Wax", ProductKind::Component, 10))
            .await
            .unwrap();

        // Attaching a BOM to a component product is rejected.
        let err = catalog
            .update_product(
                OWNER,
                &component.id,
                ProductUpdate {
                    bom: Some(vec![BomLine {
                        component_product_id: "x".to_string(),
                        quantity_per_unit: 1,
                    }]),
                    ..ProductUpdate::default()
                },
            )
            .await;
        assert!(matches!(err, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_is_hard() {
        let catalog = catalog();
        let created = catalog
            .create_product(new_product("Soap Bar", ProductKind::Finished, 5))
            .await
            .unwrap();

        catalog.delete_product(OWNER, &created.id).await.unwrap();

        assert!(matches!(
            catalog.get_product(OWNER, &created.id).await,
            Err(LedgerError::ProductNotFound { .. })
        ));

        // Deleting again reports not found (the read comes first).
        assert!(matches!(
            catalog.delete_product(OWNER, &created.id).await,
            Err(LedgerError::ProductNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_listing_is_owner_scoped_and_name_sorted() {
        let catalog = catalog();
        catalog
            .create_product(new_product("Wick", ProductKind::Component, 1))
            .await
            .unwrap();
        catalog
            .create_product(new_product("Candle", ProductKind::Finished, 1))
            .await
            .unwrap();

        let mut foreign = new_product("Intruder", ProductKind::Finished, 1);
        foreign.owner_id = "owner-2".to_string();
        catalog.create_product(foreign).await.unwrap();

        let names: Vec<String> = catalog
            .products_for_owner(OWNER)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Candle", "Wick"]);
    }

    #[tokio::test]
    async fn test_virtual_stock_uses_live_component_reads() {
        let catalog = catalog();
        let wax = catalog
            .create_product(new_product("Wax", ProductKind::Component, 10))
            .await
            .unwrap();
        let wick = catalog
            .create_product(new_product("Wick", ProductKind::Component, 4))
            .await
            .unwrap();

        let mut candle = new_product("Candle", ProductKind::Finished, 0);
        candle.bom = vec![
            BomLine {
                component_product_id: wax.id.clone(),
                quantity_per_unit: 2,
            },
            BomLine {
                component_product_id: wick.id.clone(),
                quantity_per_unit: 1,
            },
        ];
        let candle = catalog.create_product(candle).await.unwrap();

        // min(10/2, 4/1) = 4
        assert_eq!(catalog.virtual_stock(OWNER, &candle.id).await.unwrap(), 4);

        // No BOM → 0, regardless of on-hand stock.
        let soap = catalog
            .create_product(new_product("Soap", ProductKind::Finished, 50))
            .await
            .unwrap();
        assert_eq!(catalog.virtual_stock(OWNER, &soap.id).await.unwrap(), 0);
    }
}
