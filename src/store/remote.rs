//! remote.rs
//! SPARQL 1.1 protocol client for an RDF4J-style repository
//! (`{url}/repositories/{repository}`), e.g. GraphDB.

use super::types::{Binding, QueryOutcome, Row, StoreStats};
use super::{Store, StoreError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const SPARQL_QUERY: &str = "application/sparql-query";
const SPARQL_UPDATE: &str = "application/sparql-update";
const SPARQL_RESULTS: &str = "application/sparql-results+json";
const TURTLE: &str = "text/turtle";

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct RemoteStore {
    endpoint: String,
    data_files: Vec<PathBuf>,
    agent: ureq::Agent,
}

/// `application/sparql-results+json`, for both SELECT and ASK.
#[derive(Deserialize)]
struct ResultsDocument {
    #[serde(default)]
    boolean: Option<bool>,
    #[serde(default)]
    results: Option<ResultBindings>,
}

#[derive(Deserialize)]
struct ResultBindings {
    bindings: Vec<BTreeMap<String, BoundValue>>,
}

#[derive(Deserialize)]
struct BoundValue {
    value: String,
}

impl RemoteStore {
    pub fn new(url: &str, repository: &str, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/repositories/{}", url.trim_end_matches('/'), repository),
            data_files: Vec::new(),
            agent: ureq::AgentBuilder::new().timeout(timeout).timeout_connect(timeout).build(),
        }
    }

    pub fn with_data_files(mut self, data_files: Vec<PathBuf>) -> Self {
        self.data_files = data_files;
        self
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    fn statements(&self) -> String { format!("{}/statements", self.endpoint) }

    fn clear(&self) -> Result<(), StoreError> {
        let response = self.agent.delete(&self.statements()).call();
        check("clear", response).map(|_| ())
    }

    fn upload(&self, path: &PathBuf) -> Result<(), StoreError> {
        let body = std::fs::read_to_string(path)
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        let response = self
            .agent
            .post(&self.statements())
            .set("Content-Type", TURTLE)
            .send_string(&body);
        check("load", response)?;
        debug!(file = %path.display(), "uploaded data file");
        Ok(())
    }
}

/// Maps ureq's error split (HTTP status vs transport) onto `StoreError`.
fn check(operation: &'static str, result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, StoreError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(StoreError::Http { operation, status, body })
        }
        Err(ureq::Error::Transport(transport)) => {
            Err(StoreError::Transport { operation, message: transport.to_string() })
        }
    }
}

fn parse_results(document: ResultsDocument) -> Result<QueryOutcome, StoreError> {
    if let Some(b) = document.boolean {
        return Ok(QueryOutcome::Boolean(b));
    }
    let results = document
        .results
        .ok_or_else(|| StoreError::Protocol("response has neither 'boolean' nor 'results'".into()))?;
    let rows = results
        .bindings
        .into_iter()
        .map(|binding| binding.into_iter().map(|(var, bound)| (var, Binding::Text(bound.value))).collect::<Row>())
        .collect();
    Ok(QueryOutcome::Rows(rows))
}

impl Store for RemoteStore {
    fn backend(&self) -> &'static str { "remote" }

    fn initialize(&mut self) -> Result<(), StoreError> {
        self.clear()?;
        for path in &self.data_files {
            self.upload(path)?;
        }
        Ok(())
    }

    fn query(&self, text: &str) -> Result<QueryOutcome, StoreError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", SPARQL_QUERY)
            .set("Accept", SPARQL_RESULTS)
            .send_string(text);
        let document: ResultsDocument = check("query", response)?
            .into_json()
            .map_err(|e| StoreError::Protocol(format!("invalid results document: {}", e)))?;
        parse_results(document)
    }

    fn update(&mut self, text: &str) -> Result<i64, StoreError> {
        let before = self.size()? as i64;
        let response = self
            .agent
            .post(&self.statements())
            .set("Content-Type", SPARQL_UPDATE)
            .send_string(text);
        check("update", response)?;
        Ok(self.size()? as i64 - before)
    }

    fn size(&self) -> Result<usize, StoreError> {
        let response = self.agent.get(&format!("{}/size", self.endpoint)).call();
        let body = check("size", response)?
            .into_string()
            .map_err(|e| StoreError::Protocol(format!("unreadable size response: {}", e)))?;
        body.trim()
            .parse()
            .map_err(|_| StoreError::Protocol(format!("size is not a number: '{}'", body.trim())))
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            backend: self.backend(),
            triples: self.size()?,
            location: Some(self.endpoint.clone()),
        })
    }
}
