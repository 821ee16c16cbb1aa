use std::io;
use std::time::SystemTime;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.lumera.photos";
const API_PATH: &str = "/api/v1/rpc";
const TOKEN_HEADER: &str = "X-Lumera-Token";
const USER_AGENT: &str = concat!("lumera/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("service returned {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("service error: {message}")]
    Service { code: Option<i64>, message: String },
    #[error("{method} is not legal in the {state:?} state")]
    State { method: String, state: SessionState },
    #[error("call returned no result")]
    MissingResult,
}

impl ApiError {
    /// True for the peer-reset/broken-pipe class of transport failures that a
    /// caller may retry after resetting the session. State and service errors
    /// are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(err) => has_retryable_io_source(err),
            _ => false,
        }
    }
}

fn has_retryable_io_source(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionAborted
            )
        {
            return true;
        }
        source = current.source();
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    ChallengeIssued,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    ChallengeResponse,
    Plain,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    params: &'a [Value],
    id: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcEnvelope {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcFault>,
}

impl RpcEnvelope {
    pub fn into_result(self) -> Result<Value, ApiError> {
        if let Some(fault) = self.error {
            return Err(ApiError::Service {
                code: fault.code,
                message: fault.message,
            });
        }
        self.result.ok_or(ApiError::MissingResult)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcFault {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChallengePayload {
    password_salt: Vec<u8>,
    challenge: Vec<u8>,
}

#[derive(Debug, Clone)]
struct ChallengeMaterial {
    salt: Vec<u8>,
    challenge: Vec<u8>,
}

/// SHA256(challenge || SHA256(salt || password)), the proof the service
/// expects in the second leg of challenge-response authentication.
pub fn challenge_response(salt: &[u8], challenge: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let password_hash = hasher.finalize();

    let mut hasher = Sha256::new();
    hasher.update(challenge);
    hasher.update(password_hash);
    hasher.finalize().to_vec()
}

fn decode_token(value: Value) -> Result<String, ApiError> {
    Ok(serde_json::from_value(value)?)
}

pub struct Session {
    http: Client,
    base_url: Url,
    username: String,
    state: SessionState,
    token: Option<String>,
    challenge: Option<ChallengeMaterial>,
    last_status: Option<StatusCode>,
    last_envelope: Option<RpcEnvelope>,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL, username)
    }

    pub fn with_base_url(base_url: &str, username: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            http: build_http_client()?,
            base_url: Url::parse(base_url)?,
            username: username.into(),
            state: SessionState::Closed,
            token: None,
            challenge: None,
            last_status: None,
            last_envelope: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn last_envelope(&self) -> Option<&RpcEnvelope> {
        self.last_envelope.as_ref()
    }

    /// True before any exchange, and after an exchange that came back 2xx
    /// with no error in its envelope. Uploads carry no envelope, so their
    /// status alone decides.
    pub fn success(&self) -> bool {
        match self.last_status {
            None => true,
            Some(status) => {
                status.is_success()
                    && self
                        .last_envelope
                        .as_ref()
                        .is_none_or(|envelope| envelope.error.is_none())
            }
        }
    }

    /// Drops credentials and stored responses and rebuilds the HTTP client,
    /// so the next call starts over on a fresh connection.
    pub fn reset(&mut self) -> Result<(), ApiError> {
        self.http = build_http_client()?;
        self.forget_credentials();
        self.last_status = None;
        self.last_envelope = None;
        Ok(())
    }

    /// One request/response exchange with the RPC endpoint. The state gate
    /// fires before any network I/O; the transport status and decoded
    /// envelope are stored for `success()`.
    pub async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<RpcEnvelope, ApiError> {
        self.gate(method)?;
        debug!(method, "rpc call");
        let url = self.endpoint()?;
        let request = RpcRequest {
            method,
            params: &params,
            id: 1,
        };
        let mut builder = self.http.post(url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        let response = builder.send().await?;
        let status = response.status();
        self.last_status = Some(status);
        if !status.is_success() {
            self.last_envelope = None;
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http { status, body });
        }
        let body = response.text().await?;
        let envelope: RpcEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.last_envelope = None;
                return Err(ApiError::Json(err));
            }
        };
        self.last_envelope = Some(envelope.clone());
        Ok(envelope)
    }

    pub async fn issue_challenge(&mut self) -> Result<(), ApiError> {
        let username = self.username.clone();
        let envelope = self
            .call("GetChallenge", vec![Value::String(username)])
            .await?;
        let payload: ChallengePayload = serde_json::from_value(envelope.into_result()?)?;
        self.challenge = Some(ChallengeMaterial {
            salt: payload.password_salt,
            challenge: payload.challenge,
        });
        self.state = SessionState::ChallengeIssued;
        Ok(())
    }

    pub async fn respond_to_challenge(&mut self, password: &str) -> Result<(), ApiError> {
        self.gate("Authenticate")?;
        let Some(material) = self.challenge.clone() else {
            return Err(ApiError::State {
                method: "Authenticate".to_owned(),
                state: self.state,
            });
        };
        let response = challenge_response(&material.salt, &material.challenge, password);
        let params = vec![
            serde_json::json!(material.challenge),
            serde_json::json!(response),
        ];
        match self
            .call("Authenticate", params)
            .await
            .and_then(RpcEnvelope::into_result)
            .and_then(decode_token)
        {
            Ok(token) => {
                self.token = Some(token);
                self.challenge = None;
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(err) => {
                // A rejected response invalidates the issued challenge; the
                // caller must restart from issue_challenge.
                self.forget_credentials();
                Err(err)
            }
        }
    }

    pub async fn authenticate_plain(&mut self, password: &str) -> Result<(), ApiError> {
        self.gate("AuthenticatePlain")?;
        let params = vec![
            Value::String(self.username.clone()),
            Value::String(password.to_owned()),
        ];
        match self
            .call("AuthenticatePlain", params)
            .await
            .and_then(RpcEnvelope::into_result)
            .and_then(decode_token)
        {
            Ok(token) => {
                self.token = Some(token);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(err) => {
                self.forget_credentials();
                Err(err)
            }
        }
    }

    pub async fn login(&mut self, password: &str, method: LoginMethod) -> Result<(), ApiError> {
        match method {
            LoginMethod::ChallengeResponse => {
                self.issue_challenge().await?;
                self.respond_to_challenge(password).await
            }
            LoginMethod::Plain => self.authenticate_plain(password).await,
        }
    }

    /// Raw transfer to a photo set's upload URL: the file bytes as the body,
    /// filename and RFC 1123 modification time in the query string. Success
    /// is the 2xx status alone; no envelope comes back.
    pub async fn upload(
        &mut self,
        upload_url: &str,
        file_name: &str,
        modified: SystemTime,
        bytes: Vec<u8>,
    ) -> Result<(), ApiError> {
        self.gate("UploadPhoto")?;
        let mut url = Url::parse(upload_url)?;
        url.query_pairs_mut()
            .append_pair("filename", file_name)
            .append_pair("modified", &httpdate::fmt_http_date(modified));
        debug!(file_name, "upload");
        let mut builder = self
            .http
            .post(url)
            .header("Content-Type", "image/jpeg")
            .body(bytes);
        if let Some(token) = &self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        let response = builder.send().await?;
        let status = response.status();
        self.last_status = Some(status);
        self.last_envelope = None;
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http { status, body });
        }
        Ok(())
    }

    fn gate(&self, method: &str) -> Result<(), ApiError> {
        let required = match method {
            "GetChallenge" | "AuthenticatePlain" => SessionState::Closed,
            "Authenticate" => SessionState::ChallengeIssued,
            _ => SessionState::Authenticated,
        };
        if self.state == required {
            Ok(())
        } else {
            Err(ApiError::State {
                method: method.to_owned(),
                state: self.state,
            })
        }
    }

    fn forget_credentials(&mut self) {
        self.state = SessionState::Closed;
        self.token = None;
        self.challenge = None;
    }

    fn endpoint(&self) -> Result<Url, ApiError> {
        Ok(self.base_url.join(API_PATH)?)
    }
}

fn build_http_client() -> Result<Client, ApiError> {
    // Idle pooling is off so every call opens a fresh connection; the
    // protocol assumes no keep-alive between calls.
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(0)
        .build()?)
}
