//! DNS provider API clients.

mod glesys;


pub use glesys::GlesysProvider;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// A DNS record as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    pub id: u64,
    pub host: String,
    pub domain: String,
    pub record_type: String,
    pub data: String,
    pub ttl: u32,
}

impl ProviderRecord {
    /// Whether this is an address (A) record.
    pub fn is_a_record(&self) -> bool {
        self.record_type.eq_ignore_ascii_case("a")
    }
}

impl fmt::Display for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}.{}:{} ({})",
            self.id, self.host, self.domain, self.data, self.ttl
        )
    }
}

/// Fields sent when updating an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateRecordParams {
    #[serde(rename = "recordid")]
    pub record_id: u64,
    pub host: String,
    pub data: String,
    pub ttl: u32,
}

/// Trait for DNS provider APIs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// List the records of a domain, in provider order.
    async fn list_records(&self, domain: &str) -> Result<Vec<ProviderRecord>>;

    /// Update a record by id and return the stored record.
    async fn update_record(&self, params: UpdateRecordParams) -> Result<ProviderRecord>;
}
