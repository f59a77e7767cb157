// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order repository.
//!
//! An order holds a non-owning reference to at most one laboratory. Every
//! write runs in one redb write transaction that reads the order, resolves
//! the lab reference and writes the row back, bumping `version`.

use chrono::{DateTime, Utc};
use redb::{ReadTransaction, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::db::{
    all_rows, get_row, next_id, put_row, CredentialStore, StoreError, StoreResult, LABORATORIES,
    LAB_CODE_IDX, ORDERS,
};
use super::laboratories::{LabLookup, StoredLaboratory};
use crate::models::OrderStatus;

/// Order stored in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredOrder {
    pub id: u64,
    pub external_id: Uuid,
    pub patient_id: String,
    pub requested_test: String,
    pub laboratory_id: Option<u64>,
    pub status: OrderStatus,
    pub assigned_at: Option<DateTime<Utc>>,
    /// Incremented on every write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order together with the laboratory it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub order: StoredOrder,
    pub laboratory: Option<StoredLaboratory>,
}

impl OrderRecord {
    /// Code of the referenced laboratory, if any.
    pub fn lab_code(&self) -> Option<&str> {
        self.laboratory.as_ref().map(|lab| lab.code.as_str())
    }
}

/// Conjunctive filter for order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub lab_code: Option<String>,
    pub patient_id: Option<String>,
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    store: &'a CredentialStore,
}

impl<'a> OrderRepository<'a> {
    /// Create a new OrderRepository.
    pub fn new(store: &'a CredentialStore) -> Self {
        Self { store }
    }

    /// Insert a new order.
    ///
    /// `init` receives a fresh `CREATED` order and a lab lookup bound to the
    /// same transaction; returning an error discards the insert.
    pub fn create<E>(
        &self,
        patient_id: String,
        requested_test: String,
        init: impl FnOnce(&mut StoredOrder, &LabLookup<'_>) -> Result<(), E>,
    ) -> Result<OrderRecord, E>
    where
        E: From<StoreError>,
    {
        self.store.write(|txn| {
            let labs = LabLookup::open(txn)?;
            let id = next_id(txn, "orders")?;
            let now = Utc::now();
            let mut order = StoredOrder {
                id,
                external_id: Uuid::new_v4(),
                patient_id,
                requested_test,
                laboratory_id: None,
                status: OrderStatus::Created,
                assigned_at: None,
                version: 0,
                created_at: now,
                updated_at: now,
            };

            init(&mut order, &labs)?;
            order.id = id;
            order.created_at = now;
            order.updated_at = now;

            let laboratory = resolve(&labs, &order)?;
            let mut orders = txn.open_table(ORDERS).map_err(StoreError::from)?;
            put_row(&mut orders, id, &order)?;
            Ok(OrderRecord { order, laboratory })
        })
    }

    /// Read-modify-write one order in a single transaction.
    ///
    /// Concurrent transitions on the same order are serialised by the store's
    /// single writer; `apply` always sees the latest committed row.
    pub fn transition<E>(
        &self,
        id: u64,
        apply: impl FnOnce(&mut StoredOrder, &LabLookup<'_>) -> Result<(), E>,
    ) -> Result<OrderRecord, E>
    where
        E: From<StoreError>,
    {
        self.store.write(|txn| {
            let labs = LabLookup::open(txn)?;
            let mut orders = txn.open_table(ORDERS).map_err(StoreError::from)?;
            let current: StoredOrder = get_row(&orders, id)?
                .ok_or_else(|| StoreError::NotFound(format!("Order not found id={id}")))?;

            let mut order = current.clone();
            apply(&mut order, &labs)?;
            order.id = current.id;
            order.external_id = current.external_id;
            order.created_at = current.created_at;
            order.version = current.version + 1;
            order.updated_at = Utc::now();

            let laboratory = resolve(&labs, &order)?;
            put_row(&mut orders, id, &order)?;
            Ok(OrderRecord { order, laboratory })
        })
    }

    /// Get an order and its laboratory.
    pub fn get(&self, id: u64) -> StoreResult<Option<OrderRecord>> {
        self.store.read(|txn| {
            let Some(order) = get_row::<StoredOrder, _>(&txn.open_table(ORDERS)?, id)? else {
                return Ok(None);
            };
            let laboratory = match order.laboratory_id {
                Some(lab_id) => get_row(&txn.open_table(LABORATORIES)?, lab_id)?,
                None => None,
            };
            Ok(Some(OrderRecord { order, laboratory }))
        })
    }

    /// List orders matching every given filter, oldest first.
    ///
    /// A lab code that matches no laboratory yields an empty list.
    pub fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<OrderRecord>> {
        self.store.read(|txn| {
            let lab_id = match filter.lab_code.as_deref() {
                Some(code) => match lab_id_for_code(txn, code)? {
                    Some(id) => Some(id),
                    None => return Ok(Vec::new()),
                },
                None => None,
            };

            let labs = txn.open_table(LABORATORIES)?;
            let mut orders: Vec<StoredOrder> = all_rows(&txn.open_table(ORDERS)?)?;
            orders.retain(|o| {
                filter.status.is_none_or(|s| o.status == s)
                    && lab_id.is_none_or(|id| o.laboratory_id == Some(id))
                    && filter
                        .patient_id
                        .as_deref()
                        .is_none_or(|p| o.patient_id == p)
            });
            orders.sort_by_key(|o| (o.created_at, o.id));

            orders
                .into_iter()
                .map(|order| -> StoreResult<OrderRecord> {
                    let laboratory = match order.laboratory_id {
                        Some(id) => get_row(&labs, id)?,
                        None => None,
                    };
                    Ok(OrderRecord { order, laboratory })
                })
                .collect()
        })
    }
}

fn lab_id_for_code(txn: &ReadTransaction, code: &str) -> StoreResult<Option<u64>> {
    let index = txn.open_table(LAB_CODE_IDX)?;
    Ok(index.get(code)?.map(|v| v.value()))
}

/// Load the laboratory an order points at; a dangling reference is an error.
fn resolve(labs: &LabLookup<'_>, order: &StoredOrder) -> StoreResult<Option<StoredLaboratory>> {
    match order.laboratory_id {
        Some(id) => labs
            .by_id(id)?
            .map(Some)
            .ok_or_else(|| StoreError::NotFound(format!("Lab not found id={id}"))),
        None => Ok(None),
    }
}
