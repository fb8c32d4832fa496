//! HTTP transport for XML-RPC endpoints

use crate::error::{ErpxError, Result};
use crate::xmlrpc::{encode, parse};
use serde_json::Value;
use tracing::debug;
use url::Url;

const MAX_ERROR_BODY: usize = 512;

/// One long-lived handle to a single XML-RPC endpoint.
///
/// The underlying `reqwest::Client` is shared between endpoints of the same
/// [`crate::Client`]; the per-call timeout is fixed at client construction.
#[derive(Debug, Clone)]
pub struct Endpoint {
    http: reqwest::Client,
    url: Url,
}

impl Endpoint {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// One blocking round trip: POST the call, check the status, parse the
    /// response. A `<fault>` surfaces as [`ErpxError::RemoteFault`].
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let body = encode::method_call(method, params);
        debug!(url = %self.url, method, "dispatching XML-RPC call");

        let response = self
            .http
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ErpxError::Protocol {
                status: status.as_u16(),
                url: self.url.to_string(),
                message: truncate(&text),
            });
        }

        match parse::parse_response(&text) {
            Ok(parse::Response::Success(value)) => Ok(value),
            Ok(parse::Response::Fault { code, message }) => {
                Err(ErpxError::RemoteFault { code, message })
            }
            Err(e) => Err(ErpxError::Protocol {
                status: status.as_u16(),
                url: self.url.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
