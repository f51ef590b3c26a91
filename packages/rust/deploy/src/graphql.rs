//! Railway GraphQL client (secondary tier).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use demoforge_shared::{DemoForgeError, Result, USER_AGENT};

use crate::platform::{DeployTarget, ServiceApi, Variables};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const UPSERT_VARIABLES: &str = "mutation variableCollectionUpsert($input: VariableCollectionUpsertInput!) {
  variableCollectionUpsert(input: $input)
}";

const CREATE_DOMAIN: &str = "mutation serviceDomainCreate($input: ServiceDomainCreateInput!) {
  serviceDomainCreate(input: $input) { id domain }
}";

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Structured mutation API for services that already exist.
pub struct RailwayGraphql {
    http: Client,
    endpoint: String,
    token: String,
}

impl RailwayGraphql {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DemoForgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }

    /// Run one mutation and return its `data` object.
    async fn execute(&self, query: &str, input: Value) -> Result<Value> {
        let body = json!({ "query": query, "variables": { "input": input } });
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DemoForgeError::Network(format!("railway graphql: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DemoForgeError::Deployment(format!("railway graphql: HTTP {status}")));
        }

        let parsed: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| DemoForgeError::parse(format!("railway graphql response: {e}")))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(DemoForgeError::Deployment(format!(
                "railway graphql: {}",
                messages.join("; ")
            )));
        }

        parsed
            .data
            .ok_or_else(|| DemoForgeError::parse("railway graphql response had no data"))
    }
}

#[async_trait]
impl ServiceApi for RailwayGraphql {
    #[instrument(skip_all, fields(service_id = %target.service_id))]
    async fn set_variables(&self, target: &DeployTarget, variables: &Variables) -> Result<()> {
        let input = json!({
            "projectId": target.project_id,
            "environmentId": target.environment_id,
            "serviceId": target.service_id,
            "variables": variables,
        });
        self.execute(UPSERT_VARIABLES, input).await?;
        debug!(count = variables.len(), "variables upserted");
        Ok(())
    }

    #[instrument(skip_all, fields(service_id = %target.service_id))]
    async fn create_domain(&self, target: &DeployTarget) -> Result<String> {
        let input = json!({
            "environmentId": target.environment_id,
            "serviceId": target.service_id,
        });
        let data = self.execute(CREATE_DOMAIN, input).await?;
        data.pointer("/serviceDomainCreate/domain")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DemoForgeError::parse("serviceDomainCreate returned no domain"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target() -> DeployTarget {
        DeployTarget {
            project_id: "p1".into(),
            environment_id: "e1".into(),
            service_id: "s1".into(),
        }
    }

    #[tokio::test]
    async fn creates_domain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(bearer_token("tok"))
            .and(body_partial_json(json!({
                "variables": { "input": { "environmentId": "e1", "serviceId": "s1" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "serviceDomainCreate": { "id": "d1", "domain": "glow-production.up.railway.app" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = RailwayGraphql::new(server.uri(), "tok").unwrap();
        let domain = api.create_domain(&target()).await.unwrap();
        assert_eq!(domain, "glow-production.up.railway.app");
    }

    #[tokio::test]
    async fn upserts_variables() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "variables": { "input": { "projectId": "p1", "variables": { "DEMO_MODE": "true" } } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "variableCollectionUpsert": true }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = RailwayGraphql::new(server.uri(), "tok").unwrap();
        let mut vars = Variables::new();
        vars.insert("DEMO_MODE".into(), "true".into());
        api.set_variables(&target(), &vars).await.unwrap();
    }

    #[tokio::test]
    async fn graphql_errors_are_deployment_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "Not Authorized" }]
            })))
            .mount(&server)
            .await;

        let api = RailwayGraphql::new(server.uri(), "tok").unwrap();
        let err = api.create_domain(&target()).await.unwrap_err();
        assert!(matches!(err, DemoForgeError::Deployment(_)));
        assert!(err.to_string().contains("Not Authorized"));
    }
}
