//! Brings provider records in line with the resolved address.
//!
//! For each domain the current records are listed once, every desired host is
//! matched against the A records (host compared case-insensitively) and only
//! records whose data differs from the resolved address are updated. Failures
//! are scoped to the domain or host they concern; the rest of the run goes on.

use crate::config::DEFAULT_REQUEST_BUDGET_SECS;
use crate::error::{DdnsError, Result};
use crate::providers::{DnsProvider, ProviderRecord, UpdateRecordParams};
use crate::records::{DesiredRecord, DesiredState, DomainTargets};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

/// Default budget for all provider calls of a run.
pub const DEFAULT_REQUEST_BUDGET: Duration = Duration::from_secs(DEFAULT_REQUEST_BUDGET_SECS);

/// What happened to each desired record during a run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Records that were updated.
    pub updated: Vec<DesiredRecord>,
    /// Records that already pointed at the address.
    pub unchanged: Vec<DesiredRecord>,
    /// Records with no matching A record at the provider.
    pub missing: Vec<DesiredRecord>,
    /// Failed provider calls, one per domain or host affected.
    pub failures: Vec<DdnsError>,
}

impl RunReport {
    /// Number of update calls that succeeded.
    pub fn update_count(&self) -> usize {
        self.updated.len()
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.failures.is_empty()
    }
}

/// Reconciles desired host records against a DNS provider.
pub struct Reconciler {
    provider: Box<dyn DnsProvider>,
    ttl_override: Option<u32>,
    budget: Duration,
}

impl Reconciler {
    pub fn new(provider: Box<dyn DnsProvider>, ttl_override: Option<u32>) -> Self {
        Self::with_budget(provider, ttl_override, DEFAULT_REQUEST_BUDGET)
    }

    /// Create with a custom budget for the provider calls of one run.
    pub fn with_budget(
        provider: Box<dyn DnsProvider>,
        ttl_override: Option<u32>,
        budget: Duration,
    ) -> Self {
        Self {
            provider,
            ttl_override,
            budget,
        }
    }

    /// Run one reconciliation pass. Never fails as a whole; per-domain and
    /// per-host failures end up in the report.
    pub async fn reconcile(&self, ip: IpAddr, desired: &DesiredState) -> RunReport {
        let deadline = Instant::now() + self.budget;
        let ip_text = ip.to_string();
        let mut report = RunReport::default();

        tracing::debug!(
            "Reconciling {} record(s) with {}",
            desired.host_count(),
            self.provider.name()
        );

        for targets in desired.domains() {
            self.reconcile_domain(deadline, &ip_text, targets, &mut report)
                .await;
        }

        if !report.unchanged.is_empty() {
            let names: Vec<String> = report.unchanged.iter().map(ToString::to_string).collect();
            tracing::info!("Did not need to update: {}", names.join(", "));
        }

        report
    }

    async fn reconcile_domain(
        &self,
        deadline: Instant,
        ip_text: &str,
        targets: &DomainTargets,
        report: &mut RunReport,
    ) {
        let domain = targets.domain.as_str();

        let records = match within(deadline, self.provider.list_records(domain)).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(
                    "Failed to fetch current records for domain {} from {}. Skipping. Error: {}",
                    domain,
                    self.provider.name(),
                    e
                );
                report.failures.push(DdnsError::ProviderList {
                    domain: domain.to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        tracing::debug!("Printing all A records for domain {}", domain);
        for record in records.iter().filter(|r| r.is_a_record()) {
            tracing::debug!("    {}", record);
        }

        for host in &targets.hosts {
            let desired = DesiredRecord {
                domain: domain.to_string(),
                host: host.clone(),
            };

            let Some(record) = find_record(&records, host) else {
                tracing::warn!("Unable to find host {}, skipping", desired);
                report.missing.push(desired);
                continue;
            };

            tracing::debug!("Selected record to update: {}", record);

            if record.data.eq_ignore_ascii_case(ip_text) {
                tracing::debug!("Existing values are correct, no update needed.");
                report.unchanged.push(desired);
                continue;
            }

            tracing::info!("Updating selected record: {}", record);

            let params = build_update(record, ip_text, self.ttl_override);
            let record_id = params.record_id;

            match within(deadline, self.provider.update_record(params)).await {
                Ok(updated) => {
                    tracing::info!("Returned record: {}", updated);
                    report.updated.push(desired);
                }
                Err(e) => {
                    tracing::error!("Failed to update record {}: {}", desired, e);
                    report.failures.push(DdnsError::ProviderUpdate {
                        record_id,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

/// First A record whose host matches case-insensitively.
pub fn find_record<'a>(records: &'a [ProviderRecord], host: &str) -> Option<&'a ProviderRecord> {
    records
        .iter()
        .find(|r| r.is_a_record() && r.host.eq_ignore_ascii_case(host))
}

/// Update request for `record`: same id and host, new data, and the
/// override TTL when one is set, otherwise the record's own TTL.
pub fn build_update(
    record: &ProviderRecord,
    data: &str,
    ttl_override: Option<u32>,
) -> UpdateRecordParams {
    UpdateRecordParams {
        record_id: record.id,
        host: record.host.clone(),
        data: data.to_string(),
        ttl: ttl_override.unwrap_or(record.ttl),
    }
}

/// Run a provider call against the run deadline. Calls issued after the
/// deadline fail without being sent.
async fn within<T, F>(deadline: Instant, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if Instant::now() >= deadline {
        return Err(DdnsError::Timeout(
            "request budget for this run is spent".to_string(),
        ));
    }

    tokio::time::timeout_at(deadline, call)
        .await
        .map_err(|_| DdnsError::Timeout("request budget for this run is spent".to_string()))?
}
