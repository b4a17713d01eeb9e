//! Client side of the Ledger Service: the wallet/session API that holds the
//! authoritative balance.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use slots_shared::{BalanceReply, BetRequest, ErrorBody, WinRequest};
use tracing::debug;
use url::Url;

use crate::config::EngineConfig;
use crate::error::{LedgerError, Result};

const BALANCE_PATH: &str = "user/wallet/balance";
const BET_PATH: &str = "user/games/bet";
const WIN_PATH: &str = "user/games/win";

/// Remote wallet operations used by the round engine. Each call is a single
/// request with no retry.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Whether calls can be authorized at all. Without credentials the engine stays local.
    fn has_credentials(&self) -> bool;

    async fn balance(&self) -> Result<f64>;

    /// Deducts a bet and returns the new balance.
    async fn place_bet(&self, request: &BetRequest) -> Result<f64>;

    /// Credits a win and returns the new balance.
    async fn settle_win(&self, request: &WinRequest) -> Result<f64>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for std::sync::Arc<L> {
    fn has_credentials(&self) -> bool {
        (**self).has_credentials()
    }

    async fn balance(&self) -> Result<f64> {
        (**self).balance().await
    }

    async fn place_bet(&self, request: &BetRequest) -> Result<f64> {
        (**self).place_bet(request).await
    }

    async fn settle_win(&self, request: &WinRequest) -> Result<f64> {
        (**self).settle_win(request).await
    }
}

/// [`Ledger`] over HTTP with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpLedger {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(LedgerError::MissingCredentials)?;
        Ok(builder.bearer_auth(token))
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<f64> {
        let url = self.base_url.join(path)?;
        debug!(%url, "ledger request");
        let response = self
            .authorized(self.client.post(url))?
            .json(body)
            .send()
            .await
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?;
        read_balance(response).await
    }
}

async fn read_balance(response: Response) -> Result<f64> {
    let status = response.status();
    if !status.is_success() {
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        return Err(LedgerError::Rejected {
            status,
            reason: body.reason().map(str::to_owned),
        });
    }
    let reply: BalanceReply = response
        .json()
        .await
        .map_err(|e| LedgerError::UnexpectedResponse(e.to_string()))?;
    Ok(reply.balance())
}

#[async_trait]
impl Ledger for HttpLedger {
    fn has_credentials(&self) -> bool {
        self.access_token.is_some()
    }

    async fn balance(&self) -> Result<f64> {
        let url = self.base_url.join(BALANCE_PATH)?;
        let response = self
            .authorized(self.client.get(url))?
            .send()
            .await
            .map_err(|e| LedgerError::Unreachable(e.to_string()))?;
        read_balance(response).await
    }

    async fn place_bet(&self, request: &BetRequest) -> Result<f64> {
        self.post(BET_PATH, request).await
    }

    async fn settle_win(&self, request: &WinRequest) -> Result<f64> {
        self.post(WIN_PATH, request).await
    }
}
