//! # HTTP Transports
//!
//! [`HttpIndexer`] and [`HttpAlgod`] implement the transport traits over
//! plain REST endpoints. Both attach one configured auth header to every
//! request, map non-success statuses to [`ClientError::Api`] with the
//! response body as the message, and never retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::address::Address;
use crate::api::{
    AlgodApi, AssetInfo, BalancePage, ClientError, IndexerApi, SubmitResponse, TransactionParams,
    TxnRecord,
};
use crate::config::{AlgodConfig, IndexerConfig};
use crate::txn::SignedTransfer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("reqwest client")
}

async fn execute<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    auth_header: &str,
    token: &str,
) -> Result<T, ClientError> {
    let response = request
        .header(auth_header, token)
        .send()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// INDEXER
// ════════════════════════════════════════════════════════════════════════════════

/// REST client for the indexer's read endpoints.
#[derive(Clone)]
pub struct HttpIndexer {
    base: String,
    auth_header: String,
    token: String,
    client: Client,
}

impl HttpIndexer {
    pub fn new(
        base: impl Into<String>,
        auth_header: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            auth_header: auth_header.into(),
            token: token.into(),
            client: build_client(),
        }
    }

    #[must_use]
    pub fn from_config(config: &IndexerConfig) -> Self {
        Self::new(&config.host, &config.auth_header, &config.token)
    }
}

// Wire wrapper: GET /v2/assets/{id} nests the fields the pipeline needs.
#[derive(Deserialize)]
struct AssetResponse {
    asset: AssetBody,
}

#[derive(Deserialize)]
struct AssetBody {
    index: u64,
    params: AssetParams,
}

#[derive(Deserialize)]
struct AssetParams {
    creator: Address,
    #[serde(default)]
    reserve: Option<Address>,
}

#[derive(Deserialize)]
struct TxnSearchResponse {
    #[serde(default)]
    transactions: Vec<TxnRecord>,
}

#[async_trait]
impl IndexerApi for HttpIndexer {
    async fn asset_balances(
        &self,
        asset_id: u64,
        limit: u64,
        next: Option<&str>,
    ) -> Result<BalancePage, ClientError> {
        let url = format!("{}/v2/assets/{}/balances", self.base, asset_id);
        let mut request = self
            .client
            .get(url)
            .query(&[("limit", limit.to_string())]);
        if let Some(cursor) = next {
            request = request.query(&[("next", cursor)]);
        }
        execute(request, &self.auth_header, &self.token).await
    }

    async fn asset_info(&self, asset_id: u64) -> Result<AssetInfo, ClientError> {
        let url = format!("{}/v2/assets/{}", self.base, asset_id);
        let response: AssetResponse =
            execute(self.client.get(url), &self.auth_header, &self.token).await?;
        Ok(AssetInfo {
            asset_id: response.asset.index,
            creator: response.asset.params.creator,
            reserve: response.asset.params.reserve,
        })
    }

    async fn transactions_by_sender(
        &self,
        sender: &Address,
        limit: u64,
    ) -> Result<Vec<TxnRecord>, ClientError> {
        let url = format!("{}/v2/transactions", self.base);
        let limit = limit.to_string();
        let request = self.client.get(url).query(&[
            ("address", sender.as_str()),
            ("address-role", "sender"),
            ("limit", limit.as_str()),
        ]);
        let response: TxnSearchResponse =
            execute(request, &self.auth_header, &self.token).await?;
        Ok(response.transactions)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// NODE
// ════════════════════════════════════════════════════════════════════════════════

/// REST client for the node's parameter and submission endpoints.
#[derive(Clone)]
pub struct HttpAlgod {
    base: String,
    auth_header: String,
    token: String,
    client: Client,
}

impl HttpAlgod {
    pub fn new(
        base: impl Into<String>,
        auth_header: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            auth_header: auth_header.into(),
            token: token.into(),
            client: build_client(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AlgodConfig) -> Self {
        Self::new(&config.host, &config.auth_header, &config.token)
    }
}

#[async_trait]
impl AlgodApi for HttpAlgod {
    async fn transaction_params(&self) -> Result<TransactionParams, ClientError> {
        let url = format!("{}/v2/transactions/params", self.base);
        execute(self.client.get(url), &self.auth_header, &self.token).await
    }

    async fn submit_group(&self, txns: &[SignedTransfer]) -> Result<SubmitResponse, ClientError> {
        let url = format!("{}/v2/transactions", self.base);
        let request = self.client.post(url).json(&txns);
        execute(request, &self.auth_header, &self.token).await
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let indexer = HttpIndexer::new("https://idx.example.net/", "X-Indexer-API-Token", "t");
        assert_eq!(indexer.base, "https://idx.example.net");

        let algod = HttpAlgod::new("https://algod.example.net", "X-Algo-API-Token", "t");
        assert_eq!(algod.base, "https://algod.example.net");
    }

    #[test]
    fn asset_response_parses_nested_shape() {
        let json = format!(
            r#"{{
                "asset": {{
                    "index": 452399768,
                    "params": {{
                        "creator": "{}",
                        "reserve": "{}",
                        "total": 10000000
                    }}
                }}
            }}"#,
            Address::from_public_key(&[1; 32]),
            Address::from_public_key(&[2; 32]),
        );
        let parsed: AssetResponse =
            serde_json::from_str(&json).unwrap_or_else(|e| panic!("parse: {}", e));
        assert_eq!(parsed.asset.index, 452_399_768);
        assert_eq!(
            parsed.asset.params.reserve,
            Some(Address::from_public_key(&[2; 32]))
        );
    }
}
