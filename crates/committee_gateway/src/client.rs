use std::path::Path;
use std::time::Duration;

use committee_core::BatchDataResponse;
use reqwest::{Identity, StatusCode};
use serde::Serialize;
use url::Url;

use crate::errors::{GatewayError, GatewayResult};
use crate::retry::with_retry;

const ORDER_TREE_HEIGHT_PATH: &str = "availability_gateway/order_tree_height";
const GET_BATCH_DATA_PATH: &str = "availability_gateway/get_batch_data";
const GET_BATCH_CREATED_PATH: &str = "availability_gateway/_get_batch_created";
const APPROVE_NEW_ROOTS_PATH: &str = "availability_gateway/approve_new_roots";
const IS_ALIVE_PATH: &str = "availability_gateway/is_alive";

const SIGNATURE_ACCEPTED: &str = "signature accepted";

#[derive(Serialize)]
struct ApproveNewRootsRequest<'a> {
    batch_id: i64,
    signature: &'a str,
    member_key: &'a str,
    claim_hash: &'a str,
}

/// A retrying HTTP client for the availability gateway's REST surface. TLS is mutual when
/// `certificates_path` is supplied to [`AvailabilityGatewayClient::new`]: client identity from
/// `user.crt`/`user.key`, peer verification against `server.crt`.
#[derive(Clone)]
pub struct AvailabilityGatewayClient {
    base_url: Url,
    client: reqwest::Client,
}

impl AvailabilityGatewayClient {
    pub fn new(base_url: Url, request_timeout: Duration, certificates_path: Option<&Path>) -> GatewayResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(request_timeout);
        if let Some(dir) = certificates_path {
            let cert_pem = std::fs::read(dir.join("user.crt")).map_err(|e| GatewayError::Tls(e.to_string()))?;
            let key_pem = std::fs::read(dir.join("user.key")).map_err(|e| GatewayError::Tls(e.to_string()))?;
            let mut identity_pem = cert_pem;
            identity_pem.extend_from_slice(&key_pem);
            let identity = Identity::from_pem(&identity_pem).map_err(|e| GatewayError::Tls(e.to_string()))?;
            let root_cert_pem = std::fs::read(dir.join("server.crt")).map_err(|e| GatewayError::Tls(e.to_string()))?;
            let root_cert =
                reqwest::Certificate::from_pem(&root_cert_pem).map_err(|e| GatewayError::Tls(e.to_string()))?;
            builder = builder.identity(identity).add_root_certificate(root_cert);
        }
        let client = builder.build().map_err(GatewayError::Request)?;
        Ok(Self { base_url, client })
    }

    fn url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("static gateway path always joins onto the base URL")
    }

    pub async fn order_tree_height(&self) -> GatewayResult<u32> {
        with_retry("order_tree_height", || async {
            let response = self.client.get(self.url(ORDER_TREE_HEIGHT_PATH)).send().await?;
            if !response.status().is_success() {
                return Err(GatewayError::BadStatus(response.status()));
            }
            let body = response.text().await?;
            body.trim().parse().map_err(|_| GatewayError::InvalidResponse(body))
        })
        .await
    }

    pub async fn get_batch_data(&self, batch_id: u64, validate_rollup: Option<bool>) -> GatewayResult<BatchDataResponse> {
        with_retry("get_batch_data", || async {
            let mut request = self.client.get(self.url(GET_BATCH_DATA_PATH)).query(&[("batch_id", batch_id)]);
            if let Some(flag) = validate_rollup {
                request = request.query(&[("validate_rollup", flag)]);
            }
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(GatewayError::BadStatus(response.status()));
            }
            response.json::<BatchDataResponse>().await.map_err(GatewayError::Request)
        })
        .await
    }

    pub async fn get_batch_created(&self, batch_id: u64) -> GatewayResult<String> {
        with_retry("get_batch_created", || async {
            let response = self.client.get(self.url(GET_BATCH_CREATED_PATH)).query(&[("batch_id", batch_id)]).send().await?;
            if !response.status().is_success() {
                return Err(GatewayError::BadStatus(response.status()));
            }
            response.text().await.map_err(GatewayError::Request)
        })
        .await
    }

    pub async fn approve_new_roots(&self, batch_id: i64, signature_hex: &str, member_key_hex: &str, claim_hash_hex: &str) -> GatewayResult<()> {
        with_retry("approve_new_roots", || async {
            let request =
                ApproveNewRootsRequest { batch_id, signature: signature_hex, member_key: member_key_hex, claim_hash: claim_hash_hex };
            let response = self.client.post(self.url(APPROVE_NEW_ROOTS_PATH)).json(&request).send().await?;
            if !response.status().is_success() {
                return Err(GatewayError::BadStatus(response.status()));
            }
            let body = response.text().await?;
            if body.trim() != SIGNATURE_ACCEPTED {
                return Err(GatewayError::InvalidResponse(body));
            }
            Ok(())
        })
        .await
    }

    pub async fn is_alive(&self) -> GatewayResult<bool> {
        let response = self.client.get(self.url(IS_ALIVE_PATH)).send().await?;
        Ok(response.status() == StatusCode::OK)
    }
}
