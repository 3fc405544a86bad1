// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// A component was set up with missing or unusable settings.
///
/// Always raised while constructing something, never from a call on an
/// already-built value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required setting was not provided.
    Missing(&'static str),
    /// A setting was provided with a value that cannot be used.
    Invalid {
        /// Setting name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::Invalid`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "missing {name}"),
            Self::Invalid { name, reason } => write!(f, "invalid {name}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigurationError {}
