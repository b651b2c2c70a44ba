// web-client/src/http.rs
//! Request authenticator.
//!
//! Every REST call goes through the same pipeline: attach the current
//! credential, send, classify the status. A 401 tears the session down, a 403
//! only denies the action, and transport failures leave the session alone.

use std::sync::Arc;
use common::{ErrorBody, LoginRequest, LoginResponse, Principal};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::credential::Credential;
use crate::error::ClientError;
use crate::session::SessionManager;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const ME_PATH: &str = "/api/auth/me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    PassThrough,
    Teardown,
    Deny,
    Fail,
}

impl ResponseAction {
    pub fn classify(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ResponseAction::Teardown,
            StatusCode::FORBIDDEN => ResponseAction::Deny,
            s if s.is_success() || s.is_redirection() => ResponseAction::PassThrough,
            _ => ResponseAction::Fail,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionManager>) -> Result<Self, ClientError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// A request to `path` with nothing attached yet.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.request(method, self.url(path)?))
    }

    /// Attach the current credential, if any. The credential is returned so a
    /// later 401 can be matched against what was actually sent.
    pub fn authorize(&self, request: RequestBuilder) -> (RequestBuilder, Option<Credential>) {
        match self.session.credential() {
            Some(credential) => (request.bearer_auth(credential.as_str()), Some(credential)),
            None => (request, None),
        }
    }

    /// Authorize, send and classify. Not retried.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let (request, sent) = self.authorize(request);
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Request failed before reaching the server: {}", e);
            ClientError::Transport(e)
        })?;
        self.inspect(response, sent.as_ref()).await
    }

    async fn inspect(&self, response: Response, sent: Option<&Credential>) -> Result<Response, ClientError> {
        let status = response.status();
        match ResponseAction::classify(status) {
            ResponseAction::PassThrough => Ok(response),
            ResponseAction::Teardown => Err(self.on_unauthorized(sent)),
            ResponseAction::Deny => {
                let message = error_message(response).await;
                tracing::debug!("Request denied: {}", message);
                Err(ClientError::Forbidden(message))
            }
            ResponseAction::Fail => Err(ClientError::Status {
                status: status.as_u16(),
                message: error_message(response).await,
            }),
        }
    }

    /// End the session for a rejected credential. A session that ended but
    /// could not be removed from storage surfaces as the storage error.
    fn on_unauthorized(&self, sent: Option<&Credential>) -> ClientError {
        match self.session.invalidate(sent) {
            Ok(true) => {
                tracing::info!("Session ended after the server rejected the credential");
                ClientError::Unauthorized
            }
            Ok(false) => ClientError::Unauthorized,
            Err(e) => ClientError::Session(e),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::POST, path)?.json(body)).await?;
        decode(response).await
    }

    /// Exchange username/password for a token and start a session.
    ///
    /// Sent without any stored credential, and a 401 here does not tear down
    /// the existing session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Principal, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .request(Method::POST, LOGIN_PATH)?
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Login rejected for username: {}", username);
            return Err(ClientError::LoginRejected);
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let LoginResponse { token, user, .. } = decode(response).await?;
        self.session.login(&token, user.clone())?;
        Ok(user)
    }

    /// Best-effort server notification, then local teardown regardless.
    ///
    /// Only a failure to remove the persisted session is reported.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if self.session.credential().is_some() {
            match self.request(Method::POST, LOGOUT_PATH) {
                Ok(request) => {
                    if let Err(e) = self.send(request).await {
                        tracing::debug!("Ignoring logout notification failure: {}", e);
                    }
                }
                Err(e) => tracing::debug!("Ignoring logout notification failure: {}", e),
            }
        }
        self.session.logout()?;
        Ok(())
    }

    pub async fn current_user(&self) -> Result<Principal, ClientError> {
        self.get_json(ME_PATH).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await.map_err(ClientError::Transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.message)
            .unwrap_or_else(|_| status.to_string()),
        Err(_) => status.to_string(),
    }
}
