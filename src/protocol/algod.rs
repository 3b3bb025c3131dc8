//! Ledger access over the algod v2 REST API

use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::address::Address;
use super::error::LedgerError;
use super::keys::StorageKey;
use super::ledger::Ledger;
use super::transaction::SuggestedParams;

pub const MAINNET_ALGOD_URL: &str = "https://mainnet-api.algonode.cloud";
const TOKEN_HEADER: &str = "X-Algo-API-Token";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AccountResponse {
    #[serde(default)]
    auth_addr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AccountAssetResponse {
    #[serde(default)]
    asset_holding: Option<AssetHolding>,
}

#[derive(Debug, Deserialize)]
struct AssetHolding {
    amount: u64,
}

#[derive(Debug, Deserialize)]
struct BoxResponse {
    value: String,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    params: AssetParams,
}

#[derive(Debug, Deserialize)]
struct AssetParams {
    #[serde(default)]
    reserve: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TransactionParamsResponse {
    fee: u64,
    min_fee: u64,
    last_round: u64,
    genesis_id: String,
    genesis_hash: String,
}

/// HTTP client for an algod node
#[derive(Clone)]
pub struct AlgodClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl AlgodClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Public mainnet node, no token
    pub fn mainnet() -> Self {
        Self::new(MAINNET_ALGOD_URL, None)
    }

    /// GET a JSON document; 404 becomes `Ok(None)`
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, LedgerError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("GET {}: {}", path, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| LedgerError::Decode(format!("GET {}: {}", path, e)))
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, LedgerError> {
    value
        .parse()
        .map_err(|e| LedgerError::Decode(format!("{}: {}", field, e)))
}

#[async_trait]
impl Ledger for AlgodClient {
    async fn account_auth_address(
        &self,
        address: &Address,
    ) -> Result<Option<Address>, LedgerError> {
        let account: Option<AccountResponse> = self
            .get_json(
                &format!("/v2/accounts/{}", address),
                &[("exclude", "all".to_string())],
            )
            .await?;

        match account.and_then(|a| a.auth_addr) {
            Some(auth) => parse_address("auth-addr", &auth).map(Some),
            None => Ok(None),
        }
    }

    async fn asset_holding(
        &self,
        address: &Address,
        asset_id: u64,
    ) -> Result<Option<u64>, LedgerError> {
        let holding: Option<AccountAssetResponse> = self
            .get_json(&format!("/v2/accounts/{}/assets/{}", address, asset_id), &[])
            .await?;
        Ok(holding.and_then(|h| h.asset_holding).map(|h| h.amount))
    }

    async fn application_box(
        &self,
        app_id: u64,
        key: &StorageKey,
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        let engine = base64::engine::general_purpose::STANDARD;
        let name = format!("b64:{}", engine.encode(key.as_bytes()));

        let response: Option<BoxResponse> = self
            .get_json(&format!("/v2/applications/{}/box", app_id), &[("name", name)])
            .await?;

        match response {
            Some(r) => engine
                .decode(r.value.as_bytes())
                .map(Some)
                .map_err(|e| LedgerError::Decode(format!("box value: {}", e))),
            None => Ok(None),
        }
    }

    async fn asset_reserve(&self, asset_id: u64) -> Result<Option<Address>, LedgerError> {
        let asset: AssetResponse = self
            .get_json(&format!("/v2/assets/{}", asset_id), &[])
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("asset {}", asset_id)))?;

        match asset.params.reserve {
            Some(reserve) => parse_address("reserve", &reserve).map(Some),
            None => Ok(None),
        }
    }

    async fn suggested_params(&self) -> Result<SuggestedParams, LedgerError> {
        let params: TransactionParamsResponse = self
            .get_json("/v2/transactions/params", &[])
            .await?
            .ok_or_else(|| LedgerError::NotFound("transaction params".into()))?;

        Ok(SuggestedParams {
            fee: params.fee,
            min_fee: params.min_fee,
            flat_fee: false,
            first_valid: params.last_round,
            last_valid: params.last_round + 1_000,
            genesis_id: params.genesis_id,
            genesis_hash: params.genesis_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = AlgodClient::new("http://localhost:4001/", None);
        assert_eq!(client.base_url, "http://localhost:4001");
    }

    #[test]
    fn test_response_shapes() {
        let account: AccountResponse = serde_json::from_str(
            r#"{"address":"X","auth-addr":"BNFIREKGRXEHCFOEQLTX3PU5SUCMRKDU7WHNBGZA4SXPW42OAHZBP7BPHY"}"#,
        )
        .unwrap();
        assert!(account.auth_addr.is_some());

        let holding: AccountAssetResponse =
            serde_json::from_str(r#"{"round":1,"asset-holding":{"amount":42,"asset-id":7,"is-frozen":false}}"#)
                .unwrap();
        assert_eq!(holding.asset_holding.unwrap().amount, 42);

        let params: TransactionParamsResponse = serde_json::from_str(
            r#"{"consensus-version":"v40","fee":0,"genesis-hash":"h","genesis-id":"mainnet-v1.0","last-round":100,"min-fee":1000}"#,
        )
        .unwrap();
        assert_eq!(params.min_fee, 1000);
    }

    #[test]
    fn test_invalid_reserve_is_decode_error() {
        let err = parse_address("reserve", "nope").unwrap_err();
        assert!(matches!(err, LedgerError::Decode(_)));
    }
}
