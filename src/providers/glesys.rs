//! GleSYS DNS API client.

use super::{DnsProvider, ProviderRecord, UpdateRecordParams};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.glesys.com";

/// GleSYS DNS provider.
pub struct GlesysProvider {
    client: reqwest::Client,
    username: String,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    response: ApiResponse<T>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: ApiStatus,
    #[serde(flatten)]
    payload: T,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: u16,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct RecordList {
    #[serde(default)]
    records: Vec<ApiRecord>,
}

#[derive(Debug, Deserialize)]
struct SingleRecord {
    #[serde(default)]
    record: Option<ApiRecord>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    recordid: u64,
    domainname: String,
    host: String,
    #[serde(rename = "type")]
    record_type: String,
    data: String,
    ttl: u32,
}

impl From<ApiRecord> for ProviderRecord {
    fn from(r: ApiRecord) -> Self {
        ProviderRecord {
            id: r.recordid,
            host: r.host,
            domain: r.domainname,
            record_type: r.record_type,
            data: r.data,
            ttl: r.ttl,
        }
    }
}

#[derive(Debug, Serialize)]
struct ListRecordsRequest<'a> {
    domainname: &'a str,
}

impl GlesysProvider {
    /// Create a new GleSYS provider.
    pub fn new(username: String, api_key: String) -> Result<Self> {
        Self::with_base_url(username, api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(username: String, api_key: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            username,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST a JSON request and unwrap the response envelope.
    async fn call<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.api_key))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let http_status = response.status();
        let text = response.text().await?;

        let envelope: ApiEnvelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !http_status.is_success() => {
                return Err(DdnsError::Api {
                    code: http_status.as_u16(),
                    message: http_status.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let status = envelope.response.status;
        if status.code != 200 {
            return Err(DdnsError::Api {
                code: status.code,
                message: status.text,
            });
        }

        Ok(envelope.response.payload)
    }
}

#[async_trait]
impl DnsProvider for GlesysProvider {
    fn name(&self) -> &'static str {
        "glesys"
    }

    async fn list_records(&self, domain: &str) -> Result<Vec<ProviderRecord>> {
        let list: RecordList = self
            .call("domain/listrecords", &ListRecordsRequest { domainname: domain })
            .await?;

        Ok(list.records.into_iter().map(ProviderRecord::from).collect())
    }

    async fn update_record(&self, params: UpdateRecordParams) -> Result<ProviderRecord> {
        let updated: SingleRecord = self.call("domain/updaterecord", &params).await?;

        updated
            .record
            .map(ProviderRecord::from)
            .ok_or_else(|| DdnsError::Api {
                code: 200,
                message: format!("No record returned for record id {}", params.record_id),
            })
    }
}
