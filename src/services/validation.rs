// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request field checks.
//!
//! Violations are collected per field and reported together as one
//! [`ServiceError::Validation`].

use std::collections::BTreeMap;

use super::ServiceError;

/// Field name → first violation message.
#[derive(Debug, Default)]
pub struct Violations(BTreeMap<String, String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation; the first one per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Non-blank, at most `max` characters.
    pub fn required(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.add(field, "must not be blank");
        } else if value.chars().count() > max {
            self.add(field, format!("size must be at most {max}"));
        }
    }

    /// Character count within `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            self.add(field, format!("size must be between {min} and {max}"));
        }
    }

    /// At most `max` characters, when present.
    pub fn optional(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.add(field, format!("size must be at most {max}"));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        self.required(field, value, 200);
        if !value.trim().is_empty() && !is_email(value) {
            self.add(field, "must be a well-formed email address");
        }
    }

    pub fn lab_code(&mut self, field: &str, value: &str) {
        if !is_code(value, |c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
            self.add(field, "must match [A-Z0-9_]{3,50}");
        }
    }

    pub fn role_name(&mut self, field: &str, value: &str) {
        if !is_code(value, |c| c.is_ascii_alphabetic() || c == '_') {
            self.add(field, "must match [A-Z_]{3,50}");
        }
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.0))
        }
    }
}

fn is_code(value: &str, allowed: impl Fn(char) -> bool) -> bool {
    (3..=50).contains(&value.len()) && value.chars().all(allowed)
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

/// Trimmed value, or `None` when absent or blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
