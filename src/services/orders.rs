// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order workflow and lab-scoped reads.
//!
//! Each mutation loads the order, applies one [`lifecycle`] transition and
//! writes it back inside a single store transaction.

use chrono::Utc;

use crate::auth::AuthenticatedUser;
use crate::lifecycle::{self, OrderScope};
use crate::models::{
    AssignOrderRequest, CreateOrderRequest, LabSummary, OrderListQuery, OrderResponse, PageRequest,
    PageResponse,
};
use crate::storage::{
    CredentialStore, LabLookup, OrderFilter, OrderRecord, OrderRepository, StoredLaboratory,
};

use super::validation::{non_blank, Violations};
use super::{ServiceError, ServiceResult};

impl From<OrderRecord> for OrderResponse {
    fn from(record: OrderRecord) -> Self {
        let OrderRecord { order, laboratory } = record;
        Self {
            id: order.id,
            external_id: order.external_id,
            patient_id: order.patient_id,
            requested_test: order.requested_test,
            status: order.status,
            lab: laboratory.map(|lab| LabSummary {
                id: lab.id,
                code: lab.code,
                name: lab.name,
            }),
            assigned_at: order.assigned_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

fn lab_by_code(labs: &LabLookup<'_>, code: &str) -> ServiceResult<StoredLaboratory> {
    labs.by_code(code)?
        .ok_or_else(|| ServiceError::NotFound(format!("Lab not found code={code}")))
}

fn order_not_found(id: u64) -> ServiceError {
    ServiceError::NotFound(format!("Order not found id={id}"))
}

/// Create an order; with a lab code it starts out `ASSIGNED`.
pub fn create(store: &CredentialStore, request: CreateOrderRequest) -> ServiceResult<OrderResponse> {
    let mut v = Violations::new();
    v.required("patientId", &request.patient_id, 100);
    v.required("requestedTest", &request.requested_test, 100);
    v.finish()?;

    let lab_code = non_blank(request.lab_code.as_deref());
    let record = OrderRepository::new(store).create(
        request.patient_id.trim().to_string(),
        request.requested_test.trim().to_string(),
        |order, labs| -> ServiceResult<()> {
            if let Some(code) = &lab_code {
                let lab = lab_by_code(labs, code)?;
                lifecycle::assign(order, &lab, Utc::now())?;
            }
            Ok(())
        },
    )?;

    tracing::info!(
        order_id = record.order.id,
        status = %record.order.status,
        lab_code = record.lab_code(),
        "order created"
    );
    Ok(record.into())
}

/// Point an order at a lab. Accepted from every state but `FINISHED`.
pub fn assign(
    store: &CredentialStore,
    id: u64,
    request: AssignOrderRequest,
) -> ServiceResult<OrderResponse> {
    let mut v = Violations::new();
    v.required("labCode", &request.lab_code, 50);
    v.finish()?;

    let code = request.lab_code.trim();
    let mut from = None;
    let record = OrderRepository::new(store).transition(id, |order, labs| -> ServiceResult<()> {
        let lab = lab_by_code(labs, code)?;
        from = Some(order.status);
        lifecycle::assign(order, &lab, Utc::now())?;
        Ok(())
    })?;

    tracing::info!(
        order_id = id,
        from = ?from,
        to = %record.order.status,
        lab_code = record.lab_code(),
        "order assigned"
    );
    Ok(record.into())
}

/// `ASSIGNED → IN_PROGRESS`.
pub fn start(store: &CredentialStore, id: u64) -> ServiceResult<OrderResponse> {
    let record = OrderRepository::new(store)
        .transition(id, |order, _| -> ServiceResult<()> { Ok(lifecycle::start(order)?) })?;

    tracing::info!(order_id = id, to = %record.order.status, "order started");
    Ok(record.into())
}

/// `IN_PROGRESS → FINISHED`.
pub fn finish(store: &CredentialStore, id: u64) -> ServiceResult<OrderResponse> {
    let record = OrderRepository::new(store)
        .transition(id, |order, _| -> ServiceResult<()> { Ok(lifecycle::finish(order)?) })?;

    tracing::info!(order_id = id, to = %record.order.status, "order finished");
    Ok(record.into())
}

/// Read one order as `caller`.
///
/// A LAB_TECH gets forbidden, not not-found, for an existing order of
/// another lab.
pub fn get(
    store: &CredentialStore,
    caller: &AuthenticatedUser,
    id: u64,
) -> ServiceResult<OrderResponse> {
    let scope = scope_for(caller)?;
    let record = OrderRepository::new(store)
        .get(id)?
        .ok_or_else(|| order_not_found(id))?;

    if let Err(denied) = scope.check(record.lab_code()) {
        tracing::warn!(
            username = %caller.username,
            order_id = id,
            order_lab = record.lab_code(),
            "order access denied"
        );
        return Err(denied.into());
    }
    Ok(record.into())
}

/// List orders visible to `caller`, filtered and paged.
pub fn list(
    store: &CredentialStore,
    caller: &AuthenticatedUser,
    query: &OrderListQuery,
) -> ServiceResult<PageResponse<OrderResponse>> {
    let scope = scope_for(caller)?;
    let filter = scope.narrow(OrderFilter {
        status: query.status,
        lab_code: non_blank(query.lab_code.as_deref()),
        patient_id: non_blank(query.patient_id.as_deref()),
    });

    let records = OrderRepository::new(store).list(&filter)?;
    let page = PageRequest::new(query.page, query.size);
    Ok(PageResponse::from_items(records, page).map(OrderResponse::from))
}

fn scope_for(caller: &AuthenticatedUser) -> ServiceResult<OrderScope> {
    OrderScope::for_principal(caller).map_err(|e| {
        tracing::warn!(username = %caller.username, "lab technician token without labCode");
        ServiceError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::models::{CreateLabRequest, OrderStatus};
    use crate::services::labs;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn store() -> (CredentialStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::open(&dir.path().join("lab.redb")).unwrap();
        for code in ["LAB01", "LAB02"] {
            labs::create(
                &store,
                CreateLabRequest {
                    code: code.to_string(),
                    name: format!("Lab {code}"),
                    address: None,
                    phone: None,
                    supported_tests: None,
                },
            )
            .unwrap();
        }
        (store, dir)
    }

    fn admin() -> AuthenticatedUser {
        AuthenticatedUser {
            username: "admin".to_string(),
            user_id: None,
            roles: BTreeSet::from([Role::Admin]),
            lab_code: None,
        }
    }

    fn tech(lab_code: Option<&str>) -> AuthenticatedUser {
        AuthenticatedUser {
            username: "tech1".to_string(),
            user_id: None,
            roles: BTreeSet::from([Role::LabTech]),
            lab_code: lab_code.map(str::to_string),
        }
    }

    fn new_order(store: &CredentialStore, patient: &str, lab_code: Option<&str>) -> OrderResponse {
        create(
            store,
            CreateOrderRequest {
                patient_id: patient.to_string(),
                requested_test: "GLUCOSA".to_string(),
                lab_code: lab_code.map(str::to_string),
            },
        )
        .unwrap()
    }

    fn assign_to(store: &CredentialStore, id: u64, code: &str) -> ServiceResult<OrderResponse> {
        assign(store, id, AssignOrderRequest { lab_code: code.to_string() })
    }

    #[test]
    fn create_without_lab_is_created() {
        let (store, _dir) = store();
        let order = new_order(&store, "P-1", Some("  "));
        assert_eq!(order.status, OrderStatus::Created);
        assert!(order.lab.is_none());
        assert!(order.assigned_at.is_none());
    }

    #[test]
    fn create_with_lab_is_assigned() {
        let (store, _dir) = store();
        let order = new_order(&store, "P-1", Some("LAB01"));
        assert_eq!(order.status, OrderStatus::Assigned);
        assert_eq!(order.lab.unwrap().code, "LAB01");
        assert!(order.assigned_at.is_some());
    }

    #[test]
    fn create_with_unknown_lab_writes_nothing() {
        let (store, _dir) = store();
        let err = create(
            &store,
            CreateOrderRequest {
                patient_id: "P-1".to_string(),
                requested_test: "GLUCOSA".to_string(),
                lab_code: Some("NOPE".to_string()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(msg) if msg == "Lab not found code=NOPE"));
        let all = list(&store, &admin(), &OrderListQuery::default()).unwrap();
        assert_eq!(all.total_elements, 0);
    }

    #[test]
    fn full_workflow() {
        let (store, _dir) = store();
        let id = new_order(&store, "P-1", None).id;

        assert!(matches!(start(&store, id), Err(ServiceError::BadRequest(_))));
        assert!(matches!(finish(&store, id), Err(ServiceError::BadRequest(_))));

        assert_eq!(assign_to(&store, id, "LAB01").unwrap().status, OrderStatus::Assigned);
        assert!(matches!(finish(&store, id), Err(ServiceError::BadRequest(_))));
        assert_eq!(start(&store, id).unwrap().status, OrderStatus::InProgress);
        assert_eq!(finish(&store, id).unwrap().status, OrderStatus::Finished);

        match assign_to(&store, id, "LAB02").unwrap_err() {
            ServiceError::BadRequest(msg) => assert_eq!(msg, "Cannot assign a FINISHED order"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(start(&store, id).is_err());
        assert!(finish(&store, id).is_err());
    }

    #[test]
    fn in_progress_order_can_be_retargeted() {
        let (store, _dir) = store();
        let id = new_order(&store, "P-1", Some("LAB01")).id;
        start(&store, id).unwrap();

        let moved = assign_to(&store, id, "LAB02").unwrap();
        assert_eq!(moved.status, OrderStatus::Assigned);
        assert_eq!(moved.lab.unwrap().code, "LAB02");
    }

    #[test]
    fn assign_checks_order_then_lab() {
        let (store, _dir) = store();
        let err = assign_to(&store, 42, "NOPE").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(msg) if msg == "Order not found id=42"));

        let id = new_order(&store, "P-1", None).id;
        let err = assign_to(&store, id, "NOPE").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(msg) if msg == "Lab not found code=NOPE"));

        assert!(matches!(assign_to(&store, id, " "), Err(ServiceError::Validation(_))));
        assert!(matches!(start(&store, 42), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn lab_tech_cannot_read_other_labs_order() {
        let (store, _dir) = store();
        let other = new_order(&store, "P-1", Some("LAB02"));
        let own = new_order(&store, "P-2", Some("LAB01"));
        let unassigned = new_order(&store, "P-3", None);

        let caller = tech(Some("LAB01"));
        assert_eq!(get(&store, &caller, own.id).unwrap().id, own.id);
        match get(&store, &caller, other.id).unwrap_err() {
            ServiceError::Forbidden(msg) => assert_eq!(msg, "Order does not belong to your lab"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(get(&store, &caller, unassigned.id), Err(ServiceError::Forbidden(_))));
        assert!(matches!(get(&store, &caller, 999), Err(ServiceError::NotFound(_))));

        assert_eq!(get(&store, &admin(), other.id).unwrap().id, other.id);
    }

    #[test]
    fn lab_tech_list_is_forced_to_own_lab() {
        let (store, _dir) = store();
        new_order(&store, "P-1", Some("LAB01"));
        new_order(&store, "P-1", Some("LAB02"));
        new_order(&store, "P-2", Some("LAB01"));
        new_order(&store, "P-1", None);

        let query = OrderListQuery {
            lab_code: Some("LAB02".to_string()),
            ..Default::default()
        };
        let page = list(&store, &tech(Some("LAB01")), &query).unwrap();
        assert_eq!(page.total_elements, 2);
        assert!(page.content.iter().all(|o| o.lab.as_ref().unwrap().code == "LAB01"));

        let query = OrderListQuery {
            patient_id: Some("P-1".to_string()),
            ..Default::default()
        };
        assert_eq!(list(&store, &tech(Some("LAB01")), &query).unwrap().total_elements, 1);
        assert_eq!(list(&store, &admin(), &query).unwrap().total_elements, 3);
    }

    #[test]
    fn lab_tech_without_lab_code_is_forbidden() {
        let (store, _dir) = store();
        let id = new_order(&store, "P-1", Some("LAB01")).id;
        let caller = tech(None);
        match list(&store, &caller, &OrderListQuery::default()).unwrap_err() {
            ServiceError::Forbidden(msg) => assert_eq!(msg, "Missing labCode in token"),
            other => panic!("unexpected {other:?}"),
        }
        // Rejected before the lookup, so a missing id is forbidden too.
        assert!(matches!(get(&store, &caller, id), Err(ServiceError::Forbidden(_))));
        assert!(matches!(get(&store, &caller, 999), Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn admin_filters_combine() {
        let (store, _dir) = store();
        let a = new_order(&store, "P-1", Some("LAB01"));
        new_order(&store, "P-1", Some("LAB02"));
        start(&store, a.id).unwrap();

        let query = OrderListQuery {
            status: Some(OrderStatus::InProgress),
            lab_code: Some("LAB01".to_string()),
            ..Default::default()
        };
        let page = list(&store, &admin(), &query).unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].id, a.id);

        let unknown = OrderListQuery {
            lab_code: Some("LAB99".to_string()),
            ..Default::default()
        };
        assert_eq!(list(&store, &admin(), &unknown).unwrap().total_elements, 0);
    }
}
