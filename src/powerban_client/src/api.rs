//! JSON-over-HTTP binding of [`Backend`].
//!
//! The actual socket work is left to a [`Transport`]; this module owns the
//! endpoint paths, request bodies and response decoding.

use crate::backend::Backend;
use crate::config::ClientConf;
use crate::error::{BackendError, ConfigError, TransportError};
use crate::types::*;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

const GENERIC_PURCHASE_FAILURE: &str = "Purchase failed";

/// Everything outside RFC 3986 `unreserved` is escaped inside a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    user_id: UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DepositAddressRequest<'a> {
    user_id: &'a UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositAddressResponse {
    deposit_address: String,
}

#[derive(Deserialize)]
struct TicketsResponse {
    tickets: Vec<Vec<u8>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DrawBoundary {
    Millis(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextDrawResponse {
    next_draw: DrawBoundary,
}

pub struct HttpBackend<T> {
    base_url: String,
    transport: T,
}

impl<T: Transport> HttpBackend<T> {
    pub fn new(conf: &ClientConf, transport: T) -> Result<Self, ConfigError> {
        let base_url = conf.base_api_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "base_api_url",
                reason: "required by the HTTP backend",
            });
        }
        Ok(HttpBackend {
            base_url: base_url.to_string(),
            transport,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, BackendError> {
        let request = ApiRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            body,
        };
        debug!(method = ?request.method, url = %request.url, "backend request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, path, "backend response");
        Ok(response)
    }

    async fn get_json<R: DeserializeOwned>(&self, endpoint: &'static str, path: &str) -> Result<R, BackendError> {
        let response = self.call(Method::Get, path, None).await?;
        expect_success(endpoint, &response)?;
        decode(endpoint, &response.body)
    }

    async fn post_json<R: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        body: Value,
    ) -> Result<R, BackendError> {
        let response = self.call(Method::Post, path, Some(body)).await?;
        expect_success(endpoint, &response)?;
        decode(endpoint, &response.body)
    }

    /// Fetches an optional snapshot whose body carries a `success` flag.
    async fn get_snapshot<R: DeserializeOwned>(&self, endpoint: &'static str, path: &str) -> Result<Option<R>, BackendError> {
        let body: Value = self.get_json(endpoint, path).await?;
        if body.get("success").and_then(Value::as_bool) != Some(true) {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|source| BackendError::Decode { endpoint, source })
    }
}

impl<T: Transport> Backend for HttpBackend<T> {
    async fn create_player(&self) -> Result<UserId, BackendError> {
        let response: PlayerResponse = self.get_json("player", "/player").await?;
        Ok(response.user_id)
    }

    async fn create_deposit_address(&self, user: &UserId) -> Result<String, BackendError> {
        let body = to_body(&DepositAddressRequest { user_id: user });
        let response: DepositAddressResponse = self
            .post_json("deposit-address", "/player/deposit-address", body)
            .await?;
        Ok(response.deposit_address)
    }

    async fn purchase_tickets(&self, order: &PurchaseOrder) -> Result<Vec<Vec<u8>>, BackendError> {
        let response = self
            .call(Method::Post, "/player/tickets/purchase", Some(to_body(order)))
            .await?;
        if !response.is_success() {
            // the purchase endpoint explains rejections in an `error` field
            let reason = serde_json::from_slice::<ErrorResponse>(&response.body)
                .ok()
                .and_then(|body| body.error)
                .filter(|reason| !reason.is_empty())
                .unwrap_or_else(|| GENERIC_PURCHASE_FAILURE.to_string());
            return Err(BackendError::Rejected(reason));
        }
        let confirmed: TicketsResponse = decode("purchase", &response.body)?;
        Ok(confirmed.tickets)
    }

    async fn today_tickets(&self, user: &UserId) -> Result<Vec<Vec<u8>>, BackendError> {
        let path = format!(
            "/player/{}/tickets",
            utf8_percent_encode(user.as_str(), PATH_SEGMENT)
        );
        let response: TicketsResponse = self.get_json("tickets", &path).await?;
        Ok(response.tickets)
    }

    async fn next_draw(&self) -> Result<Timestamp, BackendError> {
        let response: NextDrawResponse = self.get_json("next-draw", "/draw/next-draw").await?;
        match response.next_draw {
            DrawBoundary::Millis(ms) => Ok(ms),
            DrawBoundary::Text(text) => parse_timestamp(&text),
        }
    }

    async fn current_draw(&self) -> Result<Option<CurrentDraw>, BackendError> {
        self.get_snapshot("draw-today", "/draw/today").await
    }

    async fn previous_draw(&self) -> Result<Option<PreviousDraw>, BackendError> {
        self.get_snapshot("draw-previous", "/draw/previous").await
    }
}

pub fn parse_timestamp(text: &str) -> Result<Timestamp, BackendError> {
    let parsed = OffsetDateTime::parse(text, &Rfc3339)
        .map_err(|_| BackendError::InvalidTimestamp(text.to_string()))?;
    Ok((parsed.unix_timestamp_nanos() / 1_000_000) as Timestamp)
}

fn expect_success(endpoint: &'static str, response: &ApiResponse) -> Result<(), BackendError> {
    if !response.is_success() {
        return Err(BackendError::Status {
            endpoint,
            status: response.status,
        });
    }
    Ok(())
}

fn decode<R: DeserializeOwned>(endpoint: &'static str, body: &[u8]) -> Result<R, BackendError> {
    serde_json::from_slice(body).map_err(|source| BackendError::Decode { endpoint, source })
}

fn to_body<S: serde::Serialize>(value: &S) -> Value {
    // plain structs of strings and integers; serialization cannot fail
    serde_json::to_value(value).unwrap_or(Value::Null)
}
