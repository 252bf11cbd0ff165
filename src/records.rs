//! Desired record set, parsed from the `GLESYS_DOMAINS` string.
//!
//! The format is `domain#host[,host...]` segments joined by `|`, for example
//! `example.com#www,@|example.org#home`.

use crate::error::{DdnsError, Result};
use std::fmt;

/// A single host record that must point at the resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    pub domain: String,
    pub host: String,
}

impl fmt::Display for DesiredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.host, self.domain)
    }
}

/// Hosts to keep updated for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTargets {
    pub domain: String,
    pub hosts: Vec<String>,
}

/// Desired records grouped by domain, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    domains: Vec<DomainTargets>,
}

impl DesiredState {
    /// Parse a `GLESYS_DOMAINS` string.
    pub fn parse(input: &str) -> Result<Self> {
        let records = parse_records(input)?;
        Ok(Self::from_records(records))
    }

    /// Group records by domain. Duplicate hosts are kept.
    pub fn from_records(records: impl IntoIterator<Item = DesiredRecord>) -> Self {
        let mut domains: Vec<DomainTargets> = Vec::new();

        for record in records {
            match domains.iter_mut().find(|d| d.domain == record.domain) {
                Some(targets) => targets.hosts.push(record.host),
                None => domains.push(DomainTargets {
                    domain: record.domain,
                    hosts: vec![record.host],
                }),
            }
        }

        Self { domains }
    }

    /// Domains with their hosts.
    pub fn domains(&self) -> &[DomainTargets] {
        &self.domains
    }

    /// Total number of host records across all domains.
    pub fn host_count(&self) -> usize {
        self.domains.iter().map(|d| d.hosts.len()).sum()
    }
}

/// Split a domain string into flat (domain, host) pairs.
pub fn parse_records(input: &str) -> Result<Vec<DesiredRecord>> {
    if input.trim().is_empty() {
        return Err(DdnsError::Config("Domain list is empty".to_string()));
    }

    let mut records = Vec::new();

    for segment in input.split('|') {
        let segment = segment.trim();
        let (domain, hosts) = segment.split_once('#').ok_or_else(|| {
            DdnsError::Config(format!(
                "Malformed domain segment {:?}: expected domain#host[,host...]",
                segment
            ))
        })?;

        let domain = domain.trim();
        if domain.is_empty() {
            return Err(DdnsError::Config(format!(
                "Missing domain name in segment {:?}",
                segment
            )));
        }

        for host in hosts.split(',') {
            let host = host.trim();
            if host.is_empty() || host.contains('#') {
                return Err(DdnsError::Config(format!(
                    "Invalid host {:?} in segment {:?}",
                    host, segment
                )));
            }
            records.push(DesiredRecord {
                domain: domain.to_string(),
                host: host.to_string(),
            });
        }
    }

    Ok(records)
}
