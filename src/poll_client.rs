use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;
use crate::results::Totals;

const TOTALS_PATH: &str = "/api/poll/totals";
const VOTE_PATH: &str = "/api/poll/vote";
const SAVE_RESPONSE_PATH: &str = "/api/save-response";

/// Vote request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest<'a> {
    option_id: &'a str,
}

/// Vote response body
#[derive(Debug, Deserialize)]
struct VoteResponse {
    totals: Totals,
}

/// Free-text answer stored next to the vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(rename = "color_seleccionado")]
    pub color: String,
    pub message: String,
}

/// The remote counting service.
///
/// There is no retry and no idempotency key: calling `submit_vote` twice
/// counts twice.
pub trait PollService {
    fn fetch_totals(&self) -> impl Future<Output = Result<Totals, NetworkError>> + Send;

    fn submit_vote(
        &self,
        option_id: &str,
    ) -> impl Future<Output = Result<Totals, NetworkError>> + Send;

    fn save_response(
        &self,
        payload: &SaveResponse,
    ) -> impl Future<Output = Result<(), NetworkError>> + Send;
}

/// HTTP/JSON client for the counting service.
#[derive(Debug, Clone)]
pub struct HttpPollClient {
    base: String,
    client: reqwest::Client,
}

impl HttpPollClient {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        endpoint: &'static str,
    ) -> Result<T, NetworkError> {
        let status = resp.status();
        if !status.is_success() {
            log::warn!("{endpoint} answered {status}");
            return Err(NetworkError::Status { endpoint, status });
        }
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| NetworkError::Decode(e.to_string()))
    }
}

impl PollService for HttpPollClient {
    async fn fetch_totals(&self) -> Result<Totals, NetworkError> {
        let resp = self
            .client
            .get(self.url(TOTALS_PATH))
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        Self::read_json(resp, TOTALS_PATH).await
    }

    async fn submit_vote(&self, option_id: &str) -> Result<Totals, NetworkError> {
        log::info!("Submitting vote for {option_id}");
        let resp = self
            .client
            .post(self.url(VOTE_PATH))
            .json(&VoteRequest { option_id })
            .send()
            .await?;
        let body: VoteResponse = Self::read_json(resp, VOTE_PATH).await?;
        Ok(body.totals)
    }

    async fn save_response(&self, payload: &SaveResponse) -> Result<(), NetworkError> {
        let resp = self
            .client
            .post(self.url(SAVE_RESPONSE_PATH))
            .json(payload)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                endpoint: SAVE_RESPONSE_PATH,
                status,
            });
        }
        Ok(())
    }
}
