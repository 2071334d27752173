//! RPC endpoint addressing.

use std::fmt;

/// A unary-over-streaming RPC method, addressed as
/// `POST {base}/{service}/{method}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    service: String,
    method: String,
}

impl Endpoint {
    /// Create an endpoint from a fully-qualified service name and a method.
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
        }
    }

    /// Fully-qualified service name, e.g. `summary.v1.SummaryService`.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Method name, e.g. `StreamSummary`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path, starting with `/`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }

    /// Absolute URL under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.method)
    }
}
