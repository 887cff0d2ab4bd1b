// SPDX-FileCopyrightText: 2026 Gatepass Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limited, retrying HTTP transport for the external access-control system.
//!
//! Every call made through a [`DeviceClient`] is queued on a single
//! dispatcher task. The dispatcher sends requests one at a time in FIFO order
//! and waits `1 / rate_limit` seconds after each wire request completes
//! before sending the next one, retries included. Callers await a oneshot reply.

use std::sync::Arc;
use std::time::Duration;

use gatepass_config::DeviceProfileConfig;
use gatepass_core::{AuthType, EndpointMap, GatepassError};
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, WWW_AUTHENTICATE};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::auth::{DigestAuth, DigestChallenge, HmacSigner};

/// Jobs waiting for the dispatcher before callers start to block.
const QUEUE_CAPACITY: usize = 256;

/// Transport tuning derived from a device profile.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// `base_url` joined with the API version prefix.
    pub base_url: String,
    pub request_timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Requests per second.
    pub rate_limit: u32,
    pub endpoints: EndpointMap,
}

impl ClientSettings {
    pub fn from_profile(profile: &DeviceProfileConfig) -> Self {
        Self {
            base_url: format!(
                "{}{}",
                profile.base_url.trim_end_matches('/'),
                profile.api_version
            ),
            request_timeout: Duration::from_millis(profile.request_timeout_ms),
            max_retries: profile.max_retries,
            retry_delay: Duration::from_millis(profile.retry_delay_ms),
            rate_limit: profile.rate_limit,
            endpoints: profile.endpoints.clone(),
        }
    }

    /// Minimum spacing between two wire requests.
    pub fn request_interval(&self) -> Duration {
        Duration::from_secs(1) / self.rate_limit.max(1)
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// How requests are authenticated.
#[derive(Debug)]
pub enum AuthScheme {
    Hmac(HmacSigner),
    Digest(DigestAuth),
}

impl AuthScheme {
    /// Build the scheme named by the profile, failing when its credentials
    /// are incomplete.
    pub fn from_profile(profile: &DeviceProfileConfig) -> Result<Self, GatepassError> {
        match profile.auth_type {
            AuthType::ApiKey => match (&profile.api_key, &profile.api_secret) {
                (Some(key), Some(secret)) => {
                    Ok(Self::Hmac(HmacSigner::new(key.clone(), secret.clone())))
                }
                _ => Err(GatepassError::Config(format!(
                    "profile '{}' uses apikey authentication but is missing api_key or api_secret",
                    profile.name
                ))),
            },
            AuthType::Digest => match (&profile.username, &profile.password) {
                (Some(user), Some(password)) => {
                    Ok(Self::Digest(DigestAuth::new(user.clone(), password.clone())))
                }
                _ => Err(GatepassError::Config(format!(
                    "profile '{}' uses digest authentication but is missing username or password",
                    profile.name
                ))),
            },
        }
    }
}

/// A successful device answer.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceResponse {
    pub status: u16,
    pub body: Value,
}

struct Job {
    method: Method,
    path: String,
    body: Option<Value>,
    reply: oneshot::Sender<Result<DeviceResponse, GatepassError>>,
}

/// Cloneable handle to the dispatcher task.
///
/// The dispatcher shuts down once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    jobs: mpsc::Sender<Job>,
    endpoints: Arc<EndpointMap>,
    base_url: Arc<str>,
}

impl DeviceClient {
    /// Build the HTTP client and spawn the dispatcher on the current runtime.
    pub fn new(settings: ClientSettings, auth: AuthScheme) -> Result<Self, GatepassError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| GatepassError::Internal(format!("failed to build HTTP client: {e}")))?;

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let client = Self {
            jobs: tx,
            endpoints: Arc::new(settings.endpoints.clone()),
            base_url: Arc::from(settings.base_url.as_str()),
        };

        let dispatcher = Dispatcher {
            http,
            interval: settings.request_interval(),
            next_slot: Instant::now(),
            auth: Arc::new(auth),
            settings,
        };
        tokio::spawn(dispatcher.run(rx));

        Ok(client)
    }

    /// Convenience constructor from a profile with decrypted credentials.
    pub fn from_profile(profile: &DeviceProfileConfig) -> Result<Self, GatepassError> {
        Self::new(
            ClientSettings::from_profile(profile),
            AuthScheme::from_profile(profile)?,
        )
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Queue one request and wait for its JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, GatepassError> {
        self.exchange(method, path, body).await.map(|r| r.body)
    }

    /// Queue one request and wait for its status and body.
    pub async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<DeviceResponse, GatepassError> {
        let (reply, outcome) = oneshot::channel();
        let job = Job {
            method,
            path: path.to_string(),
            body,
            reply,
        };
        self.jobs
            .send(job)
            .await
            .map_err(|_| GatepassError::Internal("device dispatcher has stopped".into()))?;
        outcome
            .await
            .map_err(|_| GatepassError::Internal("device dispatcher dropped the request".into()))?
    }

    pub async fn get(&self, path: &str) -> Result<Value, GatepassError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, GatepassError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// `post` that keeps the response status.
    pub async fn post_exchange(
        &self,
        path: &str,
        body: Value,
    ) -> Result<DeviceResponse, GatepassError> {
        self.exchange(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value, GatepassError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, GatepassError> {
        self.request(Method::DELETE, path, None).await
    }

    /// Probe the status endpoint. Never fails; errors are logged and
    /// reported as `false`.
    pub async fn test_connection(&self) -> bool {
        match self.get(&self.endpoints.system_status).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "device connection test failed");
                false
            }
        }
    }
}

struct Dispatcher {
    http: reqwest::Client,
    settings: ClientSettings,
    auth: Arc<AuthScheme>,
    interval: Duration,
    next_slot: Instant,
}

impl Dispatcher {
    async fn run(mut self, mut rx: mpsc::Receiver<Job>) {
        while let Some(job) = rx.recv().await {
            let outcome = self.execute(&job.method, &job.path, job.body.as_ref()).await;
            // The caller may have given up waiting; nothing to do then.
            let _ = job.reply.send(outcome);
        }
        debug!("device dispatcher stopped");
    }

    async fn execute(
        &mut self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<DeviceResponse, GatepassError> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| GatepassError::Internal(format!("failed to serialize request body: {e}")))?;

        let mut retry = 0;
        loop {
            match self.send_authenticated(method, path, body.as_deref()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry < self.settings.max_retries => {
                    retry += 1;
                    let delay = self.settings.backoff(retry);
                    warn!(
                        %method,
                        path,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient device error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_authenticated(
        &mut self,
        method: &Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<DeviceResponse, GatepassError> {
        let url = format!("{}{}", self.settings.base_url, path);
        let auth = Arc::clone(&self.auth);

        match auth.as_ref() {
            AuthScheme::Hmac(signer) => {
                let headers = signer.headers(method.as_str(), path, body.unwrap_or("{}"))?;
                let response = self.send(method, &url, headers, body).await?;
                read_response(response).await
            }
            AuthScheme::Digest(digest) => {
                let uri = request_uri(&url);
                let mut headers = HeaderMap::new();
                if let Some(challenge) = digest.cached_challenge() {
                    headers.insert(
                        AUTHORIZATION,
                        digest_header(digest, &challenge, method, &uri)?,
                    );
                }

                let response = self.send(method, &url, headers, body).await?;
                if response.status() != reqwest::StatusCode::UNAUTHORIZED {
                    return read_response(response).await;
                }

                let challenge = response
                    .headers()
                    .get(WWW_AUTHENTICATE)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        GatepassError::Auth("server does not support digest authentication".into())
                    })
                    .and_then(DigestChallenge::parse)?;
                debug!(realm = %challenge.realm, "received digest challenge");
                digest.remember(challenge.clone());

                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, digest_header(digest, &challenge, method, &uri)?);
                let response = self.send(method, &url, headers, body).await?;
                read_response(response).await
            }
        }
    }

    /// Send one wire request, waiting for the next rate-limit slot first.
    /// The slot after this one opens `interval` after the response arrives.
    async fn send(
        &mut self,
        method: &Method,
        url: &str,
        headers: HeaderMap,
        body: Option<&str>,
    ) -> Result<reqwest::Response, GatepassError> {
        tokio::time::sleep_until(self.next_slot).await;

        let mut request = self.http.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let sent = request.send().await;
        self.next_slot = Instant::now() + self.interval;
        let response = sent.map_err(|e| self.map_send_error(e))?;
        debug!(%method, url, status = %response.status(), "device response received");
        Ok(response)
    }

    fn map_send_error(&self, e: reqwest::Error) -> GatepassError {
        if e.is_timeout() {
            GatepassError::Timeout {
                duration: self.settings.request_timeout,
            }
        } else {
            GatepassError::Transport {
                message: format!("request failed: {e}"),
                status: None,
                error_code: None,
                details: None,
            }
        }
    }
}

fn digest_header(
    digest: &DigestAuth,
    challenge: &DigestChallenge,
    method: &Method,
    uri: &str,
) -> Result<HeaderValue, GatepassError> {
    HeaderValue::from_str(&digest.authorization(challenge, method.as_str(), uri))
        .map_err(|e| GatepassError::Auth(format!("invalid digest header: {e}")))
}

/// Path and query of an absolute URL, as used in the Digest `uri` field.
fn request_uri(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// Turn a response into its status and JSON body, or a transport error for
/// non-2xx.
async fn read_response(response: reqwest::Response) -> Result<DeviceResponse, GatepassError> {
    let status = response.status();
    let text = response.text().await.map_err(|e| {
        if e.is_timeout() {
            GatepassError::Transport {
                message: format!("timed out reading response body: {e}"),
                status: None,
                error_code: None,
                details: None,
            }
        } else {
            GatepassError::Transport {
                message: format!("failed to read response body: {e}"),
                status: Some(status.as_u16()),
                error_code: None,
                details: None,
            }
        }
    })?;

    if status.is_success() {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        return Ok(DeviceResponse {
            status: status.as_u16(),
            body,
        });
    }

    let details: Option<Value> = serde_json::from_str(&text).ok();
    let error_code = details
        .as_ref()
        .and_then(|d| d.get("errorCode"))
        .and_then(|code| match code {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
    let message = details
        .as_ref()
        .and_then(|d| {
            ["errorMsg", "errorMessage", "message"]
                .iter()
                .find_map(|key| d.get(*key).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("device returned {status}"));

    Err(GatepassError::Transport {
        message,
        status: Some(status.as_u16()),
        error_code,
        details: details.or_else(|| (!text.is_empty()).then(|| Value::String(text))),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    use super::*;

    fn settings(base: &str) -> ClientSettings {
        ClientSettings {
            base_url: format!("{base}/api/acs/v1"),
            request_timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_delay: Duration::from_millis(10),
            rate_limit: 1000,
            endpoints: EndpointMap::default(),
        }
    }

    fn hmac() -> AuthScheme {
        AuthScheme::Hmac(HmacSigner::new(
            SecretString::from("test-key"),
            SecretString::from("test-secret"),
        ))
    }

    fn hmac_client(server: &MockServer) -> DeviceClient {
        DeviceClient::new(settings(&server.uri()), hmac()).unwrap()
    }

    #[test]
    fn settings_follow_profile() {
        let profile = DeviceProfileConfig {
            base_url: "https://hcp.example.com/".into(),
            rate_limit: 4,
            retry_delay_ms: 5000,
            max_retries: 3,
            ..Default::default()
        };
        let settings = ClientSettings::from_profile(&profile);
        assert_eq!(settings.base_url, "https://hcp.example.com/api/acs/v1");
        assert_eq!(settings.request_interval(), Duration::from_millis(250));
        let delays: Vec<_> = (1..=settings.max_retries).map(|n| settings.backoff(n)).collect();
        assert_eq!(
            delays,
            [
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(20)
            ]
        );
    }

    #[test]
    fn auth_scheme_requires_credentials() {
        let profile = DeviceProfileConfig {
            auth_type: AuthType::Digest,
            username: Some("admin".into()),
            ..Default::default()
        };
        let err = AuthScheme::from_profile(&profile).unwrap_err();
        assert!(err.to_string().contains("missing username or password"), "{err}");

        let profile = DeviceProfileConfig {
            api_key: Some(SecretString::from("k")),
            api_secret: Some(SecretString::from("s")),
            ..Default::default()
        };
        assert!(matches!(
            AuthScheme::from_profile(&profile).unwrap(),
            AuthScheme::Hmac(_)
        ));
    }

    #[test]
    fn request_uri_keeps_path_and_query() {
        assert_eq!(
            request_uri("http://h:1/api/acs/v1/person/delete/42?force=1"),
            "/api/acs/v1/person/delete/42?force=1"
        );
    }

    #[tokio::test]
    async fn get_sends_json_headers_and_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/acs/v1/system/status"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = hmac_client(&server);
        let body = client.get("/system/status").await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn exchange_reports_actual_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/acs/v1/person/single"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"personId": 7}})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/acs/v1/person/delete/7"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = hmac_client(&server);
        let created = client.post_exchange("/person/single", json!({})).await.unwrap();
        assert_eq!(created.status, 201);
        assert_eq!(created.body["data"]["personId"], 7);

        let deleted = client
            .exchange(Method::DELETE, "/person/delete/7", None)
            .await
            .unwrap();
        assert_eq!(deleted, DeviceResponse { status: 204, body: Value::Null });
    }

    #[tokio::test]
    async fn hmac_signature_covers_exact_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/acs/v1/person/single"))
            .and(header("x-api-key", "test-key"))
            .and(header_exists("x-timestamp"))
            .and(header_exists("x-signature"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"personId": "P1"})))
            .mount(&server)
            .await;

        let client = hmac_client(&server);
        let body = json!({"person": {"employeeNo": "E1"}, "FDID": "1"});
        client.post("/person/single", body).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        let sent_body = String::from_utf8(request.body.clone()).unwrap();
        let timestamp = request.headers["x-timestamp"].to_str().unwrap();
        let signer = HmacSigner::new(
            SecretString::from("test-key"),
            SecretString::from("test-secret"),
        );
        let expected = signer.sign_message("POST", "/person/single", timestamp, &sent_body);
        assert_eq!(request.headers["x-signature"].to_str().unwrap(), expected);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = hmac_client(&server);
        let body = client.get("/system/status").await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_device_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"errorCode": "E500", "errorMsg": "device busy"})),
            )
            .expect(3)
            .mount(&server)
            .await;

        let client = hmac_client(&server);
        let err = client.post("/person/single", json!({})).await.unwrap_err();
        assert_eq!(err.http_status(), Some(500));
        assert_eq!(err.error_code(), Some("E500"));
        assert!(err.to_string().contains("device busy"), "{err}");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"errorCode": 4001, "message": "bad person"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = hmac_client(&server);
        let err = client.post("/person/single", json!({})).await.unwrap_err();
        assert_eq!(err.http_status(), Some(400));
        assert_eq!(err.error_code(), Some("4001"));
        assert_eq!(err.details().unwrap()["message"], "bad person");
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        let mut settings = settings("http://127.0.0.1:1");
        settings.max_retries = 1;
        let client = DeviceClient::new(settings, hmac()).unwrap();
        let err = client.get("/system/status").await.unwrap_err();
        assert_eq!(err.http_status(), None);
        assert!(err.is_retryable());
        assert!(!client.test_connection().await);
    }

    #[tokio::test]
    async fn slow_device_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut settings = settings(&server.uri());
        settings.request_timeout = Duration::from_millis(100);
        settings.max_retries = 0;
        let client = DeviceClient::new(settings, hmac()).unwrap();
        let err = client.get("/system/status").await.unwrap_err();
        assert!(matches!(err, GatepassError::Timeout { .. }), "{err:?}");
    }

    struct Recorder(Arc<Mutex<Vec<(String, std::time::Instant)>>>);

    impl Respond for Recorder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            self.0
                .lock()
                .unwrap()
                .push((request.url.path().to_string(), std::time::Instant::now()));
            ResponseTemplate::new(200).set_body_json(json!({}))
        }
    }

    #[tokio::test]
    async fn requests_are_serialized_and_spaced() {
        let server = MockServer::start().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        Mock::given(method("GET"))
            .respond_with(Recorder(Arc::clone(&seen)))
            .mount(&server)
            .await;

        let mut settings = settings(&server.uri());
        settings.rate_limit = 10;
        let client = DeviceClient::new(settings, hmac()).unwrap();

        let results = tokio::join!(
            client.get("/a"),
            client.get("/b"),
            client.get("/c"),
            client.get("/d"),
            client.get("/e"),
        );
        results.0.unwrap();
        results.1.unwrap();
        results.2.unwrap();
        results.3.unwrap();
        results.4.unwrap();

        let seen = seen.lock().unwrap();
        let paths: Vec<&str> = seen.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/api/acs/v1/a",
                "/api/acs/v1/b",
                "/api/acs/v1/c",
                "/api/acs/v1/d",
                "/api/acs/v1/e"
            ]
        );
        for pair in seen.windows(2) {
            let gap = pair[1].1.duration_since(pair[0].1);
            assert!(gap >= Duration::from_millis(95), "gap was {gap:?}");
        }
    }

    fn digest_client(server: &MockServer) -> DeviceClient {
        DeviceClient::new(
            settings(&server.uri()),
            AuthScheme::Digest(DigestAuth::new("admin", SecretString::from("pw"))),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn digest_answers_challenge_then_reuses_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "www-authenticate",
                r#"Digest realm="device", qop="auth", nonce="abc123", opaque="xyz""#,
            ))
            .mount(&server)
            .await;

        let client = digest_client(&server);
        client.get("/system/status").await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 2);

        // Second call authenticates up front with the cached challenge.
        client.get("/system/status").await.unwrap();
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        let auth = requests[2].headers["authorization"].to_str().unwrap();
        assert!(auth.contains(r#"uri="/api/acs/v1/system/status""#), "{auth}");
        assert!(auth.contains("nc=00000002"), "{auth}");
    }

    #[tokio::test]
    async fn digest_without_challenge_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = digest_client(&server);
        let err = client.get("/system/status").await.unwrap_err();
        assert!(matches!(err, GatepassError::Auth(_)), "{err:?}");
    }

    #[tokio::test]
    async fn digest_retry_failure_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "www-authenticate",
                r#"Digest realm="device", nonce="n1""#,
            ))
            .expect(2)
            .mount(&server)
            .await;

        let client = digest_client(&server);
        let err = client.get("/system/status").await.unwrap_err();
        assert_eq!(err.http_status(), Some(401));
    }
}
