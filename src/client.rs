/// Execution Runtime Module
///
/// Submits rendered statement text to the database's HTTP `/sql` endpoint,
/// retries the transient malformed-content-type failure, normalizes the two
/// possible response shapes and surfaces structured failures.
///
/// The transport itself is a seam: anything implementing `Transport` can
/// carry statements, which is how the test suite injects canned responses.
/// `HttpTransport` is the production implementation on reqwest.
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::config::Config;
use crate::core::{Result, SurqlError};

/// Total attempts for a statement whose response keeps arriving with a
/// malformed content-type.
const MAX_ATTEMPTS: usize = 5;

/// Capability to POST opaque SQL text and get parsed JSON back.
///
/// Implementations must return `SurqlError::ContentType` for the
/// malformed-content-type case so the runtime can retry it; every other
/// failure propagates immediately.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_sql(&self, sql: &str, ns: &str, db: &str) -> Result<serde_json::Value>;
}

/// HTTP transport on reqwest: POST to `<host>/sql` under basic credentials
/// with the namespace/database selection headers.
pub struct HttpTransport {
    http: reqwest::Client,
    host: String,
    user: String,
    password: String,
}

impl HttpTransport {
    pub fn new(host: &str, user: &str, password: &str) -> Self {
        HttpTransport {
            http: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_sql(&self, sql: &str, ns: &str, db: &str) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/sql", self.host))
            .basic_auth(&self.user, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .header("ns", ns)
            .header("db", db)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(sql.to_string())
            .send()
            .await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("application/json") {
            return Err(SurqlError::ContentType(format!(
                "unexpected content-type {:?} from {}/sql",
                content_type, self.host
            )));
        }

        Ok(response.json().await?)
    }
}

/// One result envelope from the `/sql` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Outcome of the multi-result execution path. A database-level error
/// envelope is data, not an `Err`: callers must check for it explicitly.
#[derive(Debug, Clone)]
pub enum SqlOutcome {
    Results(Envelope),
    DbError {
        code: i64,
        details: String,
        information: String,
    },
}

/// Execution runtime: a transport plus the namespace/database selection.
/// Stateless across statements; any number of records may share one client.
pub struct Client {
    transport: Box<dyn Transport>,
    namespace: String,
    database: String,
}

impl Client {
    /// Builds a client over the HTTP transport from configuration.
    pub fn new(config: &Config) -> Self {
        Client {
            transport: Box::new(HttpTransport::new(
                &config.host,
                &config.user,
                &config.password,
            )),
            namespace: config.namespace.clone(),
            database: config.database.clone(),
        }
    }

    /// Builds a client over an arbitrary transport.
    pub fn with_transport(transport: Box<dyn Transport>, namespace: &str, database: &str) -> Self {
        Client {
            transport,
            namespace: namespace.to_string(),
            database: database.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Executes a statement and returns the normalized multi-result
    /// response.
    ///
    /// The transient content-type failure is retried up to five attempts
    /// total; exhaustion is fatal. A mapping-shaped response is a
    /// database-level error and comes back as `SqlOutcome::DbError`.
    /// Otherwise the first envelope of the sequence is returned, with a
    /// warning logged when its `result` is a mapping where a row list was
    /// expected.
    pub async fn executes(&self, sql: &str) -> Result<SqlOutcome> {
        let mut response = None;
        for _ in 0..MAX_ATTEMPTS {
            match self
                .transport
                .post_sql(sql, &self.namespace, &self.database)
                .await
            {
                Ok(value) => {
                    response = Some(value);
                    break;
                }
                Err(SurqlError::ContentType(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        let response = response.ok_or_else(|| {
            SurqlError::ContentType(format!("no JSON response after {} attempts", MAX_ATTEMPTS))
        })?;

        if let Some(map) = response.as_object() {
            let code = map.get("code").and_then(|v| v.as_i64()).unwrap_or(0);
            let details = map
                .get("details")
                .and_then(|v| v.as_str())
                .unwrap_or("UnknownDetails")
                .to_string();
            let information = map
                .get("information")
                .and_then(|v| v.as_str())
                .unwrap_or("UnknownInformation")
                .to_string();
            return Ok(SqlOutcome::DbError {
                code,
                details,
                information,
            });
        }

        let first = response
            .as_array()
            .and_then(|envelopes| envelopes.first())
            .ok_or_else(|| SurqlError::Response(response.to_string()))?;
        let envelope: Envelope = serde_json::from_value(first.clone())?;

        if envelope.result.is_object() {
            warn!(result = %envelope.result, "result is a mapping where a row list was expected");
        }

        Ok(SqlOutcome::Results(envelope))
    }

    /// Executes a statement expecting a single result envelope. A
    /// database-level error is a hard error on this path.
    pub async fn execute(&self, sql: &str) -> Result<Envelope> {
        match self.executes(sql).await? {
            SqlOutcome::Results(envelope) => Ok(envelope),
            SqlOutcome::DbError {
                code,
                details,
                information,
            } => Err(SurqlError::Query(format!(
                "database error {}: {} ({})",
                code, details, information
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_deserialization() {
        let json = serde_json::json!({
            "result": [{"id": "counter:1", "count": 1}],
            "time": "123.4µs"
        });
        let envelope: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(envelope.time, "123.4µs");
        assert!(envelope.result.is_array());
        assert_eq!(envelope.code, None);
        assert_eq!(envelope.description, None);
    }

    #[test]
    fn test_envelope_missing_fields_default() {
        let envelope: Envelope = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(envelope.result.is_null());
        assert!(envelope.time.is_empty());
    }

    #[test]
    fn test_http_transport_normalizes_host() {
        let transport = HttpTransport::new("http://localhost:8000/", "root", "root");
        assert_eq!(transport.host, "http://localhost:8000");
    }
}
