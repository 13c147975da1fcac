//! SPARQL protocol transport and JSON results decoding.
//!
//! # Responsibility
//! - Define the transport seam used by triple-store processors and loaders.
//! - Provide a blocking HTTP implementation of the SPARQL 1.1 protocol.
//! - Decode `application/sparql-results+json` payloads.
//!
//! # Invariants
//! - Every HTTP request carries the configured timeout.
//! - Non-success statuses surface as `StoreError::Endpoint`, never as rows.

use crate::backend::triplestore::GraphQuery;
use crate::backend::{StoreError, StoreResult};
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use url::Url;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
const SPARQL_QUERY: &str = "application/sparql-query";
const SPARQL_UPDATE: &str = "application/sparql-update";
const MAX_ERROR_BODY_CHARS: usize = 240;

/// Default per-request timeout for HTTP endpoints.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport used to reach a SPARQL endpoint.
///
/// Implementations receive the structured query; the HTTP transport renders
/// it with [`GraphQuery::to_sparql`].
pub trait SparqlTransport: Send + Sync {
    fn select(&self, endpoint: &Url, query: &GraphQuery) -> StoreResult<SparqlResults>;
    fn update(&self, endpoint: &Url, update: &str) -> StoreResult<()>;
}

/// One RDF term in a result binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlBinding {
    /// `uri`, `literal`, `typed-literal` or `bnode`.
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl SparqlBinding {
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: "uri".to_string(),
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: "literal".to_string(),
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlBindings {
    #[serde(default)]
    pub bindings: Vec<BTreeMap<String, SparqlBinding>>,
}

/// Decoded SELECT response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: SparqlHead,
    pub results: SparqlBindings,
}

impl SparqlResults {
    /// Builds a response from variable names and rows, as an endpoint would.
    pub fn from_rows(vars: &[&str], rows: Vec<BTreeMap<String, SparqlBinding>>) -> Self {
        Self {
            head: SparqlHead {
                vars: vars.iter().map(|var| (*var).to_string()).collect(),
            },
            results: SparqlBindings { bindings: rows },
        }
    }

    pub fn from_json(body: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(body).map_err(|err| {
            StoreError::MalformedResult(format!("invalid sparql results document: {err}"))
        })
    }

    pub fn rows(&self) -> &[BTreeMap<String, SparqlBinding>] {
        &self.results.bindings
    }

    pub fn len(&self) -> usize {
        self.results.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }
}

/// Blocking HTTP SPARQL client.
#[derive(Debug, Clone)]
pub struct HttpSparqlTransport {
    client: Client,
}

impl HttpSparqlTransport {
    pub fn new(timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Transport(format!("failed to build http client: {err}")))?;
        Ok(Self { client })
    }

    fn post(&self, endpoint: &Url, content_type: &str, text: String) -> StoreResult<Vec<u8>> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .header(CONTENT_TYPE, content_type)
            .body(text)
            .send()
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .map_err(|err| StoreError::Transport(err.to_string()))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(StoreError::Endpoint {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        Ok(body.to_vec())
    }
}

impl SparqlTransport for HttpSparqlTransport {
    fn select(&self, endpoint: &Url, query: &GraphQuery) -> StoreResult<SparqlResults> {
        let started_at = Instant::now();
        let body = self
            .post(endpoint, SPARQL_QUERY, query.to_sparql())
            .inspect_err(|err| {
                warn!(
                    "event=sparql_select module=backend status=error op={} duration_ms={} error={}",
                    query.op_name(),
                    started_at.elapsed().as_millis(),
                    err
                );
            })?;
        let results = SparqlResults::from_json(&body)?;
        debug!(
            "event=sparql_select module=backend status=ok op={} rows={} duration_ms={}",
            query.op_name(),
            results.len(),
            started_at.elapsed().as_millis()
        );
        Ok(results)
    }

    fn update(&self, endpoint: &Url, update: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        self.post(endpoint, SPARQL_UPDATE, update.to_string())?;
        debug!(
            "event=sparql_update module=backend status=ok bytes={} duration_ms={}",
            update.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}
