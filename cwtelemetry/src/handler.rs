// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Request handling: decode payloads, aggregate, dispatch.

use std::fmt;

use cwtelemetry_core::{MetricsSink, SinkError, ValidationError};

use crate::{
    config::Config,
    decode::{DecodeError, decode_log_payload},
    processor::DatapointsProcessor,
};

/// Why handling a request failed.
#[derive(Debug)]
pub enum HandlerError {
    /// A payload was not well-formed JSON.
    Decode(DecodeError),
    /// A payload carried invalid datapoints.
    Validation(ValidationError),
    /// Sending metrics failed.
    Sink(SinkError),
}

impl HandlerError {
    /// Whether this error was already logged where it happened.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Sink(err) if err.is_reported())
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => fmt::Display::fmt(err, f),
            Self::Validation(err) => write!(f, "invalid datapoints: {err}"),
            Self::Sink(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => err.source(),
            Self::Validation(err) => Some(err),
            Self::Sink(err) => Some(err),
        }
    }
}

impl From<DecodeError> for HandlerError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Validation(err) => Self::Validation(err),
            err => Self::Decode(err),
        }
    }
}

impl From<ValidationError> for HandlerError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<SinkError> for HandlerError {
    fn from(err: SinkError) -> Self {
        Self::Sink(err)
    }
}

/// Turns batches of CloudWatch Logs payloads into `PutMetricData` calls.
#[derive(Debug, Clone)]
pub struct Handler<S> {
    processor: DatapointsProcessor<S>,
    suppress_errors: bool,
}

impl<S: MetricsSink> Handler<S> {
    /// Handle requests into `sink`, returning errors to the caller.
    pub fn new(sink: S) -> Self {
        Self {
            processor: DatapointsProcessor::new(sink),
            suppress_errors: false,
        }
    }

    /// Handle requests into `sink` with the error behavior from `config`.
    pub fn from_config(sink: S, config: &Config) -> Self {
        Self::new(sink).suppress_errors(config.suppress_errors)
    }

    /// Log errors and report success instead of returning them.
    pub fn suppress_errors(mut self, suppress: bool) -> Self {
        self.suppress_errors = suppress;
        self
    }

    /// Decode every payload, then aggregate and send all of their datapoints.
    ///
    /// Nothing is sent if any payload fails to decode. Errors are logged
    /// once; with error suppression on they are swallowed afterwards.
    pub async fn handle<P: AsRef<[u8]>>(&self, payloads: &[P]) -> Result<(), HandlerError> {
        match self.run(payloads).await {
            Ok(()) => {
                tracing::debug!("request successfully processed");
                Ok(())
            }
            Err(err) => {
                if !err.is_reported() {
                    tracing::error!(%err, "request resulted in error");
                }
                if self.suppress_errors {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn run<P: AsRef<[u8]>>(&self, payloads: &[P]) -> Result<(), HandlerError> {
        let mut groups = Vec::new();
        for payload in payloads {
            groups.extend(decode_log_payload(payload.as_ref())?);
        }
        tracing::debug!(groups = groups.len(), "decoded datapoints");
        self.processor.process(&groups).await?;
        Ok(())
    }
}
