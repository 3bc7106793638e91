//! # Network Module
//!
//! This module provides the transport used to reach the rover's web server. The panel only ever
//! talks to three endpoints:
//!
//! - `POST /command` - issue a command
//! - `GET /api/data` - current rover state
//! - `GET /api/history` - recorded sensor series
//!
//! The [`Transport`] trait is the seam between the panel and the network, [`HttpTransport`] is the
//! blocking HTTP implementation of it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::{
    tc::{Ack, CommandBody},
    tm::{DataRecord, HistoryRecord},
};

// Export reqwest
pub use reqwest;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Path of the command endpoint.
pub const COMMAND_PATH: &str = "/command";

/// Path of the current telemetry endpoint.
pub const DATA_PATH: &str = "/api/data";

/// Path of the telemetry history endpoint.
pub const HISTORY_PATH: &str = "/api/history";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Access to the rover's web server.
///
/// Implementors must be shareable between threads since requests are performed off the main
/// loop.
pub trait Transport: Send + Sync {
    /// Send a command body to the command endpoint.
    fn post_command(&self, body: &CommandBody) -> Result<Ack, TransportError>;

    /// Get the current rover state.
    fn get_data(&self) -> Result<DataRecord, TransportError>;

    /// Get the recorded sensor history.
    fn get_history(&self) -> Result<HistoryRecord, TransportError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Base URL of the rover's web server, e.g. `"http://localhost:5000"`
    pub base_url: String,

    /// Timeout applied to every request.
    ///
    /// Units: milliseconds
    pub request_timeout_ms: u64,
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Could not build the HTTP client: {0}")]
    ClientBuildError(reqwest::Error),

    #[error("Request to {0} failed: {1}")]
    RequestError(String, reqwest::Error),

    #[error("Request to {0} returned status {1}")]
    StatusError(String, reqwest::StatusCode),

    #[error("Could not decode the response from {0}: {1}")]
    DecodeError(String, reqwest::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HttpTransport {
    /// Create a new transport for the server described by the parameters.
    pub fn new(params: &NetParams) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(params.request_timeout_ms))
            .build()
            .map_err(TransportError::ClientBuildError)?;

        Ok(Self {
            client,
            base_url: params.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the full URL of an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = self.url(path);
        trace!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TransportError::RequestError(url.clone(), e))?;

        if !response.status().is_success() {
            return Err(TransportError::StatusError(url, response.status()));
        }

        response
            .json::<T>()
            .map_err(|e| TransportError::DecodeError(url, e))
    }
}

impl Transport for HttpTransport {
    fn post_command(&self, body: &CommandBody) -> Result<Ack, TransportError> {
        let url = self.url(COMMAND_PATH);
        trace!("POST {} {:?}", url, body);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| TransportError::RequestError(url.clone(), e))?;

        // Only JSON-parseability of the response matters, the status is not inspected
        response
            .json::<Ack>()
            .map_err(|e| TransportError::DecodeError(url, e))
    }

    fn get_data(&self) -> Result<DataRecord, TransportError> {
        self.get_json(DATA_PATH)
    }

    fn get_history(&self) -> Result<HistoryRecord, TransportError> {
        self.get_json(HISTORY_PATH)
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:5000"),
            request_timeout_ms: 2000,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let t = HttpTransport::new(&NetParams {
            base_url: "http://rover.local:5000/".into(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(t.url(DATA_PATH), "http://rover.local:5000/api/data");
        assert_eq!(t.url(COMMAND_PATH), "http://rover.local:5000/command");
    }

    #[test]
    fn test_net_params_defaults_fill_missing_keys() {
        let p: NetParams = serde_json::from_str(r#"{"base_url": "http://10.0.0.2:8080"}"#).unwrap();
        assert_eq!(p.base_url, "http://10.0.0.2:8080");
        assert_eq!(p.request_timeout_ms, 2000);
    }
}
