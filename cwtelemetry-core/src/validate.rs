// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Describes why decoded datapoints were rejected: a missing or empty
/// required field, a negative value, an unknown field or unit.
///
/// Raised at the decoding boundary only. Anything past that boundary trusts
/// its input and never re-validates.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidationError(Vec<String>);

impl ValidationError {
    /// Create a builder that composes multiple validation failures into a
    /// single [`ValidationError`]. If no failures are added,
    /// [`ValidationErrorBuilder::build()`] returns [`Ok`].
    pub fn builder() -> ValidationErrorBuilder {
        ValidationErrorBuilder::default()
    }

    /// Prefix every recorded failure with the location `path`.
    pub fn at(mut self, path: &str) -> Self {
        for err in self.0.iter_mut() {
            *err = format!("{path}: {err}");
        }
        self
    }

    /// Record a generic validation failure with a reason string.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self(vec![reason.into()])
    }

    /// The individual failure messages.
    pub fn reasons(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Debug for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// Builder to record validation failures over time and bundle them into a
/// single [`ValidationError`].
#[derive(Debug, Clone, Default)]
pub struct ValidationErrorBuilder(Vec<String>);

impl ValidationErrorBuilder {
    /// Returns [`Ok`] if no validation failures were recorded, otherwise [`Err`]
    /// with all of them.
    pub fn build(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(self.0))
        }
    }

    /// Record a generic validation failure with a reason string.
    pub fn invalid(mut self, reason: impl Into<String>) -> Self {
        self.invalid_mut(reason);
        self
    }

    /// Record a generic validation failure, but only require `&mut Self`.
    pub fn invalid_mut(&mut self, reason: impl Into<String>) -> &mut Self {
        self.0.push(reason.into());
        self
    }

    /// Extend this builder with all of the failures recorded in `error`, but
    /// only require `&mut Self`.
    pub fn extend_mut(&mut self, error: ValidationError) -> &mut Self {
        self.0.extend(error.0);
        self
    }
}
