//! HTTP relationship store.
//!
//! Talks to two remote services:
//! - the PDP agent (`GET /health`, `POST /v1/is-entitled-to`), addressed by
//!   host and port; a scheme prefix is accepted and stripped;
//! - the relations API (`POST /resources/relations/v1/assign` and
//!   `/unassign`), which authenticates the caller's bearer token.
//!
//! Every request is bounded by the client timeout. Non-success statuses are
//! mapped onto [`StorageError`] so callers can tell a credential problem from
//! a missing schema from an outage.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::error::{extract_trace_id, HealthStatus, StorageError, StorageResult};
use crate::traits::{validate_assignment, EntitlementQuery, RelationshipStore, StoredAssignment};

const ASSIGN_PATH: &str = "/resources/relations/v1/assign";
const UNASSIGN_PATH: &str = "/resources/relations/v1/unassign";
const ENTITLEMENT_PATH: &str = "/v1/is-entitled-to";

/// Longest error body kept in `UnexpectedStatus`.
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for [`HttpRelationshipStore`].
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// PDP agent address, e.g. `localhost:8181` or `http://pdp:8181`.
    pub agent_url: String,
    /// Relations API base URL. Mutations fail with `NotConfigured` without it.
    pub api_base_url: Option<String>,
    pub timeout: Duration,
}

/// Remote implementation of RelationshipStore.
#[derive(Debug, Clone)]
pub struct HttpRelationshipStore {
    client: reqwest::Client,
    agent_base: String,
    api_base: Option<String>,
}

#[derive(Serialize)]
struct AssignmentsBody<'a> {
    assignments: &'a [StoredAssignment],
}

impl HttpRelationshipStore {
    /// Creates a store with its own HTTP client.
    pub fn new(config: &HttpStoreConfig) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::InternalError {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a store with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, config: &HttpStoreConfig) -> Self {
        Self {
            client,
            agent_base: agent_base_url(&config.agent_url),
            api_base: config
                .api_base_url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    async fn post_assignments(
        &self,
        operation: &'static str,
        path: &str,
        assignments: &[StoredAssignment],
        token: &str,
    ) -> StorageResult<()> {
        for assignment in assignments {
            validate_assignment(assignment)?;
        }
        if token.is_empty() {
            return Err(StorageError::InvalidInput {
                message: "caller token cannot be empty".to_string(),
            });
        }

        let base = self
            .api_base
            .as_deref()
            .ok_or_else(|| StorageError::NotConfigured {
                message: "relations API base URL is not configured".to_string(),
            })?;
        let url = format!("{base}{path}");

        debug!(
            %url,
            operation,
            count = assignments.len(),
            "sending relation assignments"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&AssignmentsBody { assignments })
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let err = status_error(status, &body);
        warn!(
            operation,
            status = status.as_u16(),
            error = %err,
            "relations API rejected request"
        );
        Err(err)
    }
}

#[async_trait]
impl RelationshipStore for HttpRelationshipStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let started = Instant::now();
        let response = self
            .client
            .get(format!("{}/health", self.agent_base))
            .send()
            .await
            .map_err(|e| transport_error("health check", e))?;

        let status = response.status();
        Ok(HealthStatus {
            healthy: status == StatusCode::OK,
            latency: started.elapsed(),
            message: Some(format!("HTTP {status}")),
        })
    }

    #[instrument(
        skip(self, query),
        fields(
            subject = %query.subject.key,
            target = %query.target.key,
            action = %query.action
        )
    )]
    async fn is_entitled_to(&self, query: &EntitlementQuery) -> StorageResult<Value> {
        let body = json!({
            "subject": {
                "entityType": query.subject.entity_type,
                "key": query.subject.key,
            },
            "requestContext": {
                "type": "entity",
                "entityType": query.target.entity_type,
                "key": query.target.key,
                "action": query.action,
            }
        });

        let response = self
            .client
            .post(format!("{}{ENTITLEMENT_PATH}", self.agent_base))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("entitlement query", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StorageError::SerializationError {
                message: format!("invalid entitlement response: {e}"),
            })
    }

    async fn assign(&self, assignments: &[StoredAssignment], token: &str) -> StorageResult<()> {
        self.post_assignments("assign", ASSIGN_PATH, assignments, token)
            .await
    }

    async fn unassign(&self, assignments: &[StoredAssignment], token: &str) -> StorageResult<()> {
        self.post_assignments("unassign", UNASSIGN_PATH, assignments, token)
            .await
    }

    fn describe(&self) -> String {
        self.agent_base.clone()
    }
}

/// Normalizes a PDP agent address to an `http://host:port` base URL.
pub fn agent_base_url(agent_url: &str) -> String {
    let host = agent_url
        .trim()
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');
    format!("http://{host}")
}

fn transport_error(operation: &'static str, err: reqwest::Error) -> StorageError {
    if err.is_timeout() {
        StorageError::Timeout { operation }
    } else {
        StorageError::Unreachable {
            message: format!("{operation}: {err}"),
        }
    }
}

/// Maps a non-success HTTP status onto the storage error taxonomy.
pub fn status_error(status: StatusCode, body: &str) -> StorageError {
    match status.as_u16() {
        401 => StorageError::Unauthorized {
            status: 401,
            message: "caller token is invalid or expired".to_string(),
            trace_id: extract_trace_id(body),
        },
        403 => StorageError::Unauthorized {
            status: 403,
            message: "caller token is not permitted to modify these relations".to_string(),
            trace_id: extract_trace_id(body),
        },
        404 => StorageError::NotConfigured {
            message: "relation schema or endpoint not found; enable it on the policy store"
                .to_string(),
        },
        502..=504 => StorageError::Unreachable {
            message: format!("gateway returned {status}"),
        },
        code => StorageError::UnexpectedStatus {
            status: code,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::EntityKey;
    use httpmock::prelude::*;

    fn store_for(server: &MockServer, timeout: Duration) -> HttpRelationshipStore {
        HttpRelationshipStore::new(&HttpStoreConfig {
            agent_url: server.base_url(),
            api_base_url: Some(server.base_url()),
            timeout,
        })
        .unwrap()
    }

    fn owner_assignment() -> StoredAssignment {
        StoredAssignment {
            subject_entity_type_key: "user".to_string(),
            subject_key: "alice".to_string(),
            relation_key: "owner".to_string(),
            target_entity_type_key: "document".to_string(),
            target_key: "doc-1".to_string(),
        }
    }

    #[test]
    fn test_agent_base_url_strips_scheme() {
        assert_eq!(agent_base_url("localhost:8181"), "http://localhost:8181");
        assert_eq!(agent_base_url("http://pdp:8181/"), "http://pdp:8181");
        assert_eq!(agent_base_url("https://pdp:8181"), "http://pdp:8181");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            StorageError::Unauthorized { status: 401, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, ""),
            StorageError::NotConfigured { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            StorageError::Unreachable { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            StorageError::UnexpectedStatus { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_health_check_ok() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200);
            })
            .await;

        let status = store_for(&server, Duration::from_secs(2))
            .health_check()
            .await
            .unwrap();
        assert!(status.healthy);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_check_non_200_is_unhealthy() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(503);
            })
            .await;

        let status = store_for(&server, Duration::from_secs(2))
            .health_check()
            .await
            .unwrap();
        assert!(!status.healthy);
    }

    #[tokio::test]
    async fn test_health_check_connection_refused() {
        let store = HttpRelationshipStore::new(&HttpStoreConfig {
            agent_url: "127.0.0.1:1".to_string(),
            api_base_url: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        let err = store.health_check().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_entitlement_query_wire_format() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/is-entitled-to").json_body(json!({
                    "subject": {"entityType": "user", "key": "bob"},
                    "requestContext": {
                        "type": "entity",
                        "entityType": "document",
                        "key": "doc-1",
                        "action": "read"
                    }
                }));
                then.status(200).json_body(json!({"result": true}));
            })
            .await;

        let answer = store_for(&server, Duration::from_secs(2))
            .is_entitled_to(&EntitlementQuery {
                subject: EntityKey::new("user", "bob"),
                target: EntityKey::new("document", "doc-1"),
                action: "read".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(answer, json!({"result": true}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_assign_forwards_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/resources/relations/v1/assign")
                    .header("authorization", "Bearer user-token-alice")
                    .json_body(json!({"assignments": [{
                        "subjectEntityTypeKey": "user",
                        "subjectKey": "alice",
                        "relationKey": "owner",
                        "targetEntityTypeKey": "document",
                        "targetKey": "doc-1"
                    }]}));
                then.status(201);
            })
            .await;

        store_for(&server, Duration::from_secs(2))
            .assign(&[owner_assignment()], "user-token-alice")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_assign_forbidden_carries_trace_id() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/resources/relations/v1/assign");
                then.status(403)
                    .body("<html><p>Forbidden</p><p>Trace ID: 0af7651916cd43dd</p></html>");
            })
            .await;

        let err = store_for(&server, Duration::from_secs(2))
            .assign(&[owner_assignment()], "user-token-alice")
            .await
            .unwrap_err();
        match err {
            StorageError::Unauthorized {
                status, trace_id, ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(trace_id.as_deref(), Some("0af7651916cd43dd"));
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unassign_not_found_is_not_configured() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/resources/relations/v1/unassign");
                then.status(404);
            })
            .await;

        let err = store_for(&server, Duration::from_secs(2))
            .unassign(&[owner_assignment()], "user-token-alice")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_slow_relations_api_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/resources/relations/v1/assign");
                then.status(200).delay(Duration::from_millis(500));
            })
            .await;

        let err = store_for(&server, Duration::from_millis(50))
            .assign(&[owner_assignment()], "user-token-alice")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Timeout { operation: "assign" }));
    }

    #[tokio::test]
    async fn test_mutation_without_api_base_is_not_configured() {
        let store = HttpRelationshipStore::new(&HttpStoreConfig {
            agent_url: "localhost:8181".to_string(),
            api_base_url: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        let err = store
            .assign(&[owner_assignment()], "user-token-alice")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured { .. }));
    }
}
