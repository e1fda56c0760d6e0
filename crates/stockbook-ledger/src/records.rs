//! # Transaction Records
//!
//! Read-only access to recorded transactions and their line items. All
//! writing goes through [`crate::StockLedger`]; this module only answers
//! questions about what already happened.
//!
//! Cancelled transactions are part of the answer: a reversal keeps the
//! transaction as audit history, so history listings include it with its
//! CANCELLED status rather than pretending it never existed.

use tracing::debug;

use stockbook_core::{Transaction, TransactionItem};
use stockbook_store::{fields, Filter, StoreHandle};

use crate::error::{LedgerError, LedgerResult};

/// Query surface over the transaction history.
#[derive(Clone)]
pub struct TransactionRecords {
    store: StoreHandle,
}

impl TransactionRecords {
    pub fn new(store: StoreHandle) -> Self {
        TransactionRecords { store }
    }

    /// Loads one transaction with its items. A transaction belonging to a
    /// different owner is reported as not found, not as forbidden.
    pub async fn transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> LedgerResult<(Transaction, Vec<TransactionItem>)> {
        let (txn, _) = self
            .store
            .get::<Transaction>(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))?;
        if txn.owner_id != owner_id {
            return Err(LedgerError::transaction_not_found(transaction_id));
        }

        let items = self.items_for_transaction(transaction_id).await?;
        Ok((txn, items))
    }

    /// Full history for an owner, newest first (ties broken by id so the
    /// order is stable). Includes CANCELLED transactions.
    pub async fn transactions_for_owner(&self, owner_id: &str) -> LedgerResult<Vec<Transaction>> {
        let mut txns: Vec<Transaction> = self
            .store
            .find_by::<Transaction>(&[Filter::eq(fields::OWNER_ID, owner_id)])
            .await?
            .into_iter()
            .map(|(txn, _)| txn)
            .collect();

        txns.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));

        debug!(owner_id, count = txns.len(), "Listed transactions");
        Ok(txns)
    }

    /// Line items of one transaction, in stable id order.
    pub async fn items_for_transaction(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<Vec<TransactionItem>> {
        let items = self
            .store
            .find_by::<TransactionItem>(&[Filter::eq(fields::TRANSACTION_ID, transaction_id)])
            .await?
            .into_iter()
            .map(|(item, _)| item)
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::engine::{SaleDraft, StockLedger};
    use chrono::Utc;
    use stockbook_core::{Product, ProductKind, TransactionStatus};
    use stockbook_store::{collections, to_document_body, MemoryStore, WriteBatch};

    const OWNER: &str = "owner-1";

    struct Fixture {
        handle: StoreHandle,
        ledger: StockLedger,
        records: TransactionRecords,
    }

    fn fixture() -> Fixture {
        let handle = StoreHandle::new(Arc::new(MemoryStore::new()));
        Fixture {
            ledger: StockLedger::new(handle.clone()),
            records: TransactionRecords::new(handle.clone()),
            handle,
        }
    }

    async fn seed_product(handle: &StoreHandle, id: &str, stock: i64) {
        let now = Utc::now();
        let product = Product {
            id: id.to_string(),
            owner_id: OWNER.to_string(),
            sku: None,
            name: format!("Product {id}"),
            kind: ProductKind::Finished,
            current_stock: stock,
            min_stock: 0,
            max_stock: 1000,
            cost_price_cents: 1000,
            sale_price_cents: 2500,
            supplier_id: None,
            bom: vec![],
            created_at: now,
            updated_at: now,
        };
        let mut batch = WriteBatch::new();
        batch.set(
            collections::PRODUCTS,
            id,
            to_document_body(&product).unwrap(),
        );
        handle.commit(batch).await.unwrap();
    }

    #[tokio::test]
    async fn test_transaction_returns_items() {
        let fx = fixture();
        seed_product(&fx.handle, "p-1", 10).await;

        let recorded = fx
            .ledger
            .record_sale(SaleDraft::simple(OWNER, "p-1", 2))
            .await
            .unwrap();

        let (txn, items) = fx.records.transaction(OWNER, &recorded.id).await.unwrap();
        assert_eq!(txn.id, recorded.id);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_transaction_hidden_across_owners() {
        let fx = fixture();
        seed_product(&fx.handle, "p-1", 10).await;

        let recorded = fx
            .ledger
            .record_sale(SaleDraft::simple(OWNER, "p-1", 2))
            .await
            .unwrap();

        let err = fx
            .records
            .transaction("owner-2", &recorded.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::TransactionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_history_newest_first_including_cancelled() {
        let fx = fixture();
        seed_product(&fx.handle, "p-1", 100).await;

        let mut early = SaleDraft::simple(OWNER, "p-1", 1);
        early.date = Some("2026-03-01T10:00:00Z".parse().unwrap());
        let mut late = SaleDraft::simple(OWNER, "p-1", 1);
        late.date = Some("2026-03-02T10:00:00Z".parse().unwrap());

        let first = fx.ledger.record_sale(early).await.unwrap();
        let second = fx.ledger.record_sale(late).await.unwrap();
        fx.ledger.revert_transaction(&first.id).await.unwrap();

        let history = fx.records.transactions_for_owner(OWNER).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);
        assert_eq!(history[1].status, TransactionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_missing_transaction() {
        let fx = fixture();
        let err = fx.records.transaction(OWNER, "ghost").await.unwrap_err();
        assert!(matches!(err, LedgerError::TransactionNotFound { .. }));
    }
}
