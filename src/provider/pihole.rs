//! Pi-hole custom DNS client.
//!
//! Talks to the legacy `admin/api.php` interface, where every call is a
//! `GET` whose query string selects the record table (`customdns` for
//! host-address records, `customcname` for alias records), carries the
//! API token as `auth`, and names the action. Query strings are built with
//! [`url::Url::query_pairs_mut`], so names with reserved characters are
//! percent-encoded.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use url::Url;

use super::DnsProvider;
use crate::error::ProviderError;
use crate::types::{ExistingRecords, Operation, Outcome, ProviderEndpoint, RecordMode};

/// Reply to `action=get`.
#[derive(Debug, Deserialize)]
struct ExistingResponse {
    data: Vec<Vec<String>>,
}

/// Reply to `action=add` / `action=delete`.
#[derive(Debug, Deserialize)]
struct MutationResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

pub struct PiholeClient {
    http: HttpClient,
    endpoint: ProviderEndpoint,
}

impl PiholeClient {
    pub fn new(endpoint: ProviderEndpoint, timeout: Option<Duration>) -> Result<Self, ProviderError> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint,
        })
    }

    /// `{api_url}?{selector}&auth={token}&{params...}`
    fn request_url(&self, selector: &str, params: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.endpoint.api_url)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_key_only(selector);
            query.append_pair("auth", &self.endpoint.auth_token);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<(StatusCode, String), ProviderError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn try_mutate(
        &self,
        op: Operation,
        mode: RecordMode,
        domain: &str,
        target: &str,
    ) -> Result<Outcome, ProviderError> {
        let url = self.request_url(
            mode.table(),
            &[
                ("action", op.action()),
                (mode.target_param(), target),
                ("domain", domain),
            ],
        )?;
        let (status, body) = self.get_text(url).await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let reply: MutationResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(Outcome {
            success: reply.success,
            message: reply.message,
        })
    }
}

#[async_trait]
impl DnsProvider for PiholeClient {
    fn endpoint(&self) -> &ProviderEndpoint {
        &self.endpoint
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        let url = self.request_url("summaryRaw", &[])?;
        let (status, body) = self.get_text(url).await?;
        if status != StatusCode::OK {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        // An invalid token still gets 200, with an empty array as body.
        let body = body.trim();
        if body.is_empty() || body == "[]" {
            return Err(ProviderError::AuthRejected {
                endpoint: self.endpoint.api_url.clone(),
            });
        }
        Ok(())
    }

    async fn fetch_existing(&self, mode: RecordMode) -> Result<ExistingRecords, ProviderError> {
        let url = self.request_url(mode.table(), &[("action", "get")])?;
        let (status, body) = self.get_text(url).await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let reply: ExistingResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let mut records = Vec::with_capacity(reply.data.len());
        for row in reply.data {
            match <[String; 2]>::try_from(row) {
                Ok([name, target]) => records.push((name, target)),
                Err(row) => debug!("Skipping malformed {} row: {:?}", mode.table(), row),
            }
        }
        Ok(ExistingRecords(records))
    }

    async fn mutate(
        &self,
        op: Operation,
        mode: RecordMode,
        domain: &str,
        target: &str,
    ) -> Outcome {
        match self.try_mutate(op, mode, domain, target).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_PATH: &str = "/admin/api.php";

    fn client(server: &MockServer, token: &str) -> PiholeClient {
        PiholeClient::new(
            ProviderEndpoint {
                api_url: format!("{}{}", server.uri(), API_PATH),
                auth_token: token.into(),
            },
            Some(Duration::from_secs(5)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn probe_accepts_non_empty_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .and(query_param("summaryRaw", ""))
            .and(query_param("auth", "good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "enabled"})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, "good").probe().await.unwrap();
    }

    #[tokio::test]
    async fn probe_treats_empty_array_as_bad_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let err = client(&server, "bad").probe().await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthRejected { .. }));
    }

    #[tokio::test]
    async fn probe_rejects_non_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server, "t").probe().await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn fetch_reads_address_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .and(query_param("customdns", ""))
            .and(query_param("auth", "t"))
            .and(query_param("action", "get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [["foo", "10.0.0.5"], ["broken"], ["bar", "10.0.0.6"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let existing = client(&server, "t")
            .fetch_existing(RecordMode::Address)
            .await
            .unwrap();
        assert_eq!(
            existing,
            ExistingRecords(vec![
                ("foo".into(), "10.0.0.5".into()),
                ("bar".into(), "10.0.0.6".into()),
            ])
        );
    }

    #[tokio::test]
    async fn fetch_uses_alias_table_in_alias_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("customcname", ""))
            .and(query_param("action", "get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let existing = client(&server, "t")
            .fetch_existing(RecordMode::Alias)
            .await
            .unwrap();
        assert!(existing.0.is_empty());
    }

    #[tokio::test]
    async fn fetch_reports_status_and_malformed_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("customdns", ""))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("customcname", ""))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let pihole = client(&server, "t");
        assert!(matches!(
            pihole.fetch_existing(RecordMode::Address).await,
            Err(ProviderError::Malformed(_))
        ));
        assert!(matches!(
            pihole.fetch_existing(RecordMode::Alias).await,
            Err(ProviderError::Status { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn fetch_reports_unreachable_endpoint() {
        let pihole = PiholeClient::new(
            ProviderEndpoint {
                api_url: format!("http://127.0.0.1:1{}", API_PATH),
                auth_token: "t".into(),
            },
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        assert!(matches!(
            pihole.fetch_existing(RecordMode::Address).await,
            Err(ProviderError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn mutate_sends_address_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("customdns", ""))
            .and(query_param("auth", "t"))
            .and(query_param("action", "add"))
            .and(query_param("ip", "10.0.0.5"))
            .and(query_param("domain", "web.lan"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "message": ""})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server, "t")
            .mutate(Operation::Create, RecordMode::Address, "web.lan", "10.0.0.5")
            .await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn mutate_sends_alias_parameters_and_escapes_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("customcname", ""))
            .and(query_param("action", "delete"))
            .and(query_param("target", "docker.lan"))
            .and(query_param("domain", "a b&c=d"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "message": "This domain does not exist"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server, "t")
            .mutate(Operation::Delete, RecordMode::Alias, "a b&c=d", "docker.lan")
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "This domain does not exist");
    }

    #[tokio::test]
    async fn mutate_folds_errors_into_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let outcome = client(&server, "t")
            .mutate(Operation::Create, RecordMode::Address, "web.lan", "10.0.0.5")
            .await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("Malformed"));
    }
}
