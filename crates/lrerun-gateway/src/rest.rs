//! `RestGateway`: `RemoteJobGateway` over the service's JSON REST API.
//!
//! Session state is the cookie jar of the underlying `reqwest::Client`; a
//! fresh `login` replaces the session cookies.

use std::time::Duration;

use lrerun_core::RunStatusSnapshot;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::GatewayError;
use crate::gateway::{GatewayResult, RemoteJobGateway};
use crate::models::{
    Credentials, RunLaunch, RunStatusResponse, StartRunResponse, TestInstance,
    TestInstanceCreateRequest, TestSet, TestSetCreateRequest, TestSetFolder,
    TestSetFolderCreateRequest, TimeslotRequest, TokenAuthRequest,
};
use crate::urls::UrlBuilder;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub server_url: String,
    pub domain: String,
    pub project: String,
    pub request_timeout: Duration,
}

pub struct RestGateway {
    client: Client,
    urls: UrlBuilder,
}

impl RestGateway {
    pub fn new(config: &RestConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::transport("build http client", e))?;
        Ok(Self {
            client,
            urls: UrlBuilder::new(&config.server_url, &config.domain, &config.project),
        })
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<Response> {
        let response = request
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| GatewayError::transport(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::debug!(operation, "remote rejected session");
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            operation,
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<T> {
        let response = self.send(operation, request).await?;
        response.json::<T>().await.map_err(|e| GatewayError::Decode {
            operation,
            detail: e.to_string(),
        })
    }

    async fn web_login(&self) -> GatewayResult<()> {
        let request = self.client.get(self.urls.web_login()).query(&[
            ("domain", self.urls.domain()),
            ("project", self.urls.project()),
        ]);
        self.send("login to project", request).await?;
        tracing::debug!(
            domain = self.urls.domain(),
            project = self.urls.project(),
            "web login successful"
        );
        Ok(())
    }
}

impl RemoteJobGateway for RestGateway {
    async fn login(&self, credentials: &Credentials) -> GatewayResult<bool> {
        let request = if credentials.token_auth {
            self.client
                .post(self.urls.token_auth())
                .json(&TokenAuthRequest {
                    client_id_key: &credentials.username,
                    client_secret_key: &credentials.password,
                })
        } else {
            self.client
                .get(self.urls.basic_auth())
                .basic_auth(&credentials.username, Some(&credentials.password))
        };

        match self.send("authenticate", request).await {
            Ok(_) => {}
            Err(GatewayError::Status { status: 401, .. }) => return Ok(false),
            Err(e) => return Err(e),
        }
        tracing::debug!(token_auth = credentials.token_auth, "authenticated");
        self.web_login().await?;
        Ok(true)
    }

    async fn logout(&self) -> GatewayResult<()> {
        self.send("logout", self.client.get(self.urls.logout()))
            .await
            .map(|_| ())
    }

    async fn fetch_test_instances(&self, test_id: u64) -> GatewayResult<Vec<TestInstance>> {
        let request = self
            .client
            .get(self.urls.test_instances())
            .query(&[("query", UrlBuilder::test_instance_query(test_id))]);
        self.json("fetch test instances", request).await
    }

    async fn create_test_set(&self, req: &TestSetCreateRequest) -> GatewayResult<TestSet> {
        let request = self.client.post(self.urls.test_sets()).json(req);
        self.json("create test set", request).await
    }

    async fn create_test_set_folder(
        &self,
        req: &TestSetFolderCreateRequest,
    ) -> GatewayResult<TestSetFolder> {
        let request = self.client.post(self.urls.test_set_folders()).json(req);
        self.json("create test set folder", request).await
    }

    async fn fetch_all_test_sets(&self) -> GatewayResult<Vec<TestSet>> {
        self.json("fetch test sets", self.client.get(self.urls.test_sets()))
            .await
    }

    async fn fetch_all_test_set_folders(&self) -> GatewayResult<Vec<TestSetFolder>> {
        self.json(
            "fetch test set folders",
            self.client.get(self.urls.test_set_folders()),
        )
        .await
    }

    async fn create_test_instance(
        &self,
        req: &TestInstanceCreateRequest,
    ) -> GatewayResult<TestInstance> {
        let request = self.client.post(self.urls.test_instances()).json(req);
        self.json("create test instance", request).await
    }

    async fn calculate_timeslot_availability(
        &self,
        test_id: u64,
        req: &TimeslotRequest,
    ) -> GatewayResult<Vec<String>> {
        let request = self
            .client
            .post(self.urls.timeslot_check())
            .query(&[("testId", test_id)])
            .json(req);
        self.json("timeslot check", request).await
    }

    async fn start_run(&self, test_id: u64, req: &TimeslotRequest) -> GatewayResult<RunLaunch> {
        let request = self
            .client
            .post(self.urls.start_run())
            .query(&[("testId", test_id)])
            .json(req);
        let response: StartRunResponse = self.json("start run", request).await?;
        Ok(RunLaunch {
            run_id: response.qc_run_id,
            internal_run_id: response.run_id,
            dashboard_url: self.urls.dashboard(response.qc_run_id),
        })
    }

    async fn fetch_run_status(&self, run_id: u64) -> GatewayResult<RunStatusSnapshot> {
        let response: RunStatusResponse = self
            .json("fetch run status", self.client.get(self.urls.run_status(run_id)))
            .await?;
        Ok(response.into_snapshot())
    }

    async fn abort_run(&self, run_id: u64) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.urls.abort_run(run_id))
            .json(&serde_json::json!({}));
        self.send("abort run", request).await.map(|_| ())
    }
}
