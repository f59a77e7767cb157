// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Laboratory registry.

use crate::models::{CreateLabRequest, LabListQuery, LabResponse, PageRequest, PageResponse, UpdateLabRequest};
use crate::storage::{CredentialStore, LaboratoryRepository, NewLaboratory, StoreError, StoredLaboratory};

use super::validation::Violations;
use super::{ServiceError, ServiceResult};

impl From<StoredLaboratory> for LabResponse {
    fn from(lab: StoredLaboratory) -> Self {
        Self {
            id: lab.id,
            external_id: lab.external_id,
            code: lab.code,
            name: lab.name,
            address: lab.address,
            phone: lab.phone,
            active: lab.active,
            supported_tests: lab.supported_tests,
            created_at: lab.created_at,
            updated_at: lab.updated_at,
        }
    }
}

fn lab_not_found(id: u64) -> ServiceError {
    ServiceError::NotFound(format!("Laboratory not found id={id}"))
}

/// Map store conflicts to messages naming the offending value.
fn conflict<'a>(code: &'a str, name: &'a str) -> impl Fn(StoreError) -> ServiceError + 'a {
    move |err| match err {
        StoreError::Conflict("code") => {
            ServiceError::Conflict(format!("Laboratory code already exists: {code}"))
        }
        StoreError::Conflict("name") => {
            ServiceError::Conflict(format!("Laboratory name already exists: {name}"))
        }
        other => other.into(),
    }
}

fn check_optional_fields(
    v: &mut Violations,
    address: Option<&str>,
    phone: Option<&str>,
    supported_tests: Option<&[String]>,
) {
    v.optional("address", address, 255);
    v.optional("phone", phone, 30);
    if supported_tests.is_some_and(|tests| tests.iter().any(|t| t.trim().is_empty())) {
        v.add("supportedTests", "must not contain blank entries");
    }
}

/// Register a laboratory.
pub fn create(store: &CredentialStore, request: CreateLabRequest) -> ServiceResult<LabResponse> {
    let mut v = Violations::new();
    v.lab_code("code", &request.code);
    v.required("name", &request.name, 150);
    check_optional_fields(
        &mut v,
        request.address.as_deref(),
        request.phone.as_deref(),
        request.supported_tests.as_deref(),
    );
    v.finish()?;

    let name = request.name.trim().to_string();
    let lab = LaboratoryRepository::new(store)
        .create(NewLaboratory {
            code: request.code.clone(),
            name: name.clone(),
            address: request.address,
            phone: request.phone,
            supported_tests: request.supported_tests.unwrap_or_default(),
        })
        .map_err(conflict(&request.code, &name))?;

    tracing::info!(lab_id = lab.id, code = %lab.code, "laboratory created");
    Ok(lab.into())
}

/// Apply a partial update.
pub fn update(
    store: &CredentialStore,
    id: u64,
    request: UpdateLabRequest,
) -> ServiceResult<LabResponse> {
    let mut v = Violations::new();
    if let Some(code) = &request.code {
        v.lab_code("code", code);
    }
    if let Some(name) = &request.name {
        v.required("name", name, 150);
    }
    check_optional_fields(
        &mut v,
        request.address.as_deref(),
        request.phone.as_deref(),
        request.supported_tests.as_deref(),
    );
    v.finish()?;

    let code = request.code.clone().unwrap_or_default();
    let name = request.name.as_deref().map(str::trim).unwrap_or_default().to_string();
    let lab = LaboratoryRepository::new(store)
        .update(id, |lab| -> Result<(), StoreError> {
            if let Some(code) = request.code {
                lab.code = code;
            }
            if let Some(name) = request.name {
                lab.name = name.trim().to_string();
            }
            if request.address.is_some() {
                lab.address = request.address;
            }
            if request.phone.is_some() {
                lab.phone = request.phone;
            }
            if let Some(tests) = request.supported_tests {
                lab.supported_tests = tests;
            }
            if let Some(active) = request.active {
                lab.active = active;
            }
            Ok(())
        })
        .map_err(|e| match e {
            StoreError::NotFound(_) => lab_not_found(id),
            other => conflict(&code, &name)(other),
        })?;

    tracing::info!(lab_id = lab.id, code = %lab.code, "laboratory updated");
    Ok(lab.into())
}

/// Flip the active flag.
pub fn set_active(store: &CredentialStore, id: u64, active: bool) -> ServiceResult<LabResponse> {
    let lab = LaboratoryRepository::new(store)
        .update(id, |lab| -> Result<(), StoreError> {
            lab.active = active;
            Ok(())
        })
        .map_err(|e| match e {
            StoreError::NotFound(_) => lab_not_found(id),
            other => other.into(),
        })?;

    tracing::info!(lab_id = lab.id, code = %lab.code, active, "laboratory active flag changed");
    Ok(lab.into())
}

pub fn get(store: &CredentialStore, id: u64) -> ServiceResult<LabResponse> {
    LaboratoryRepository::new(store)
        .get(id)?
        .map(LabResponse::from)
        .ok_or_else(|| lab_not_found(id))
}

/// Paged list in creation order.
pub fn list(store: &CredentialStore, query: &LabListQuery) -> ServiceResult<PageResponse<LabResponse>> {
    let labs = LaboratoryRepository::new(store).list(query.active)?;
    let page = PageRequest::new(query.page, query.size);
    Ok(PageResponse::from_items(labs, page).map(LabResponse::from))
}
