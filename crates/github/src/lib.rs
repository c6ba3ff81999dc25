pub mod repo;

use std::{fmt, fs, time::Duration};

use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Method, StatusCode, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use status_proxy_core::{
    AppError, MAX_BODY_SIZE,
    config::GitHubConfig,
    models::{StatusIntent, StatusState},
};
use time::UtcDateTime;
use url::Url;

pub use crate::repo::{ParseRepoError, RepoRef, parse_repo_url};

/// Lifetime of the application JWT. GitHub rejects anything over ten minutes.
const APP_JWT_LIFETIME_SECS: i64 = 10 * 60;
const USER_AGENT: &str = concat!("status-proxy/", env!("CARGO_PKG_VERSION"));

/// A short-lived bearer credential. `Debug` never prints the value.
#[derive(Clone, Eq, PartialEq)]
pub struct Token(String);

impl Token {
    pub fn expose(&self) -> &str { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token([REDACTED])")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("failed to sign app JWT: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
    #[error("installation lookup failed: GitHub API returned status {0}")]
    InstallationStatus(u16),
    #[error("installation lookup failed: {0}")]
    InstallationRequest(String),
    #[error("token exchange failed: GitHub API returned status {0}")]
    TokenStatus(u16),
    #[error("token exchange failed: {0}")]
    TokenRequest(String),
    #[error("GitHub API returned status {0}")]
    PublishStatus(u16),
    #[error("{0}")]
    PublishRequest(String),
}

impl GitHubError {
    /// Convert into the HTTP-facing error for a request against `repo`.
    pub fn into_app_error(self, repo: &RepoRef) -> AppError {
        match self {
            Self::Sign(_) => AppError::Auth("Failed to authenticate with GitHub"),
            Self::InstallationStatus(_) | Self::InstallationRequest(_) => {
                AppError::InstallationNotFound {
                    owner: repo.owner.clone(),
                    repo: repo.repo.clone(),
                }
            }
            Self::TokenStatus(_) | Self::TokenRequest(_) => {
                AppError::Auth("Failed to get installation token")
            }
            Self::PublishStatus(_) | Self::PublishRequest(_) => AppError::Publish(self.to_string()),
        }
    }
}

#[derive(Serialize)]
struct Claims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Deserialize)]
struct Installation {
    id: u64,
}

#[derive(Deserialize)]
struct InstallationToken {
    token: String,
}

#[derive(Serialize)]
struct CreateStatus<'a> {
    state: StatusState,
    context: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_url: Option<&'a str>,
}

/// GitHub App credentials and the HTTP client used for every outbound call.
/// Built once at startup and shared read-only between requests.
pub struct GitHubApp {
    app_id: u64,
    key: EncodingKey,
    api_url: Url,
    client: reqwest::Client,
}

impl GitHubApp {
    /// Read and parse the private key named in `config`. Fails if the key is
    /// missing or is not an RSA PEM key.
    pub fn new(app_id: u64, config: &GitHubConfig) -> Result<Self> {
        let pem = fs::read(&config.private_key_path).with_context(|| {
            format!("Failed to read private key from {}", config.private_key_path.display())
        })?;
        Self::from_pem(app_id, &pem, config)
    }

    pub fn from_pem(app_id: u64, pem: &[u8], config: &GitHubConfig) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem).context("Failed to parse private key")?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_str(&config.api_version)
                .context("Invalid GitHub API version")?,
        );
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        let app = Self { app_id, key, api_url: config.api_url.clone(), client };
        // Surface key problems at startup rather than on the first request
        app.app_jwt().context("Failed to sign app JWT")?;
        Ok(app)
    }

    pub fn app_id(&self) -> u64 { self.app_id }

    /// Sign a fresh application JWT, valid for ten minutes.
    pub fn app_jwt(&self) -> Result<Token, GitHubError> {
        let now = UtcDateTime::now().unix_timestamp();
        let claims =
            Claims { iat: now, exp: now + APP_JWT_LIFETIME_SECS, iss: self.app_id.to_string() };
        let jwt = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;
        Ok(Token(jwt))
    }

    /// Build `{api_url}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        token: &Token,
        body: Option<&impl Serialize>,
    ) -> reqwest::Result<reqwest::Response> {
        tracing::debug!("GitHub API request: {} {}", method, url);
        let mut request =
            self.client.request(method.clone(), url.clone()).bearer_auth(token.expose());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        tracing::debug!("GitHub API response: {} {} -> {}", method, url, response.status());
        Ok(response)
    }

    /// Find the installation of this app on `repo`. Succeeds only on HTTP 200.
    pub async fn installation_id(&self, jwt: &Token, repo: &RepoRef) -> Result<u64, GitHubError> {
        let url = self.endpoint(&["repos", &repo.owner, &repo.repo, "installation"]);
        let response = self
            .send(Method::GET, url, jwt, None::<&()>)
            .await
            .map_err(|e| GitHubError::InstallationRequest(e.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(GitHubError::InstallationStatus(response.status().as_u16()));
        }
        let installation: Installation =
            read_json(response).await.map_err(GitHubError::InstallationRequest)?;
        Ok(installation.id)
    }

    /// Exchange the app JWT for an installation access token. Succeeds only on HTTP 201.
    pub async fn installation_token(
        &self,
        jwt: &Token,
        installation_id: u64,
    ) -> Result<Token, GitHubError> {
        let id = installation_id.to_string();
        let url = self.endpoint(&["app", "installations", &id, "access_tokens"]);
        let response = self
            .send(Method::POST, url, jwt, None::<&()>)
            .await
            .map_err(|e| GitHubError::TokenRequest(e.to_string()))?;
        if response.status() != StatusCode::CREATED {
            return Err(GitHubError::TokenStatus(response.status().as_u16()));
        }
        let token: InstallationToken =
            read_json(response).await.map_err(GitHubError::TokenRequest)?;
        tracing::debug!("Obtained installation token (length: {})", token.token.len());
        Ok(Token(token.token))
    }

    /// Create a commit status on `repo`. Any 2xx response is a success.
    pub async fn create_commit_status(
        &self,
        token: &Token,
        repo: &RepoRef,
        intent: &StatusIntent,
    ) -> Result<(), GitHubError> {
        let url = self.endpoint(&["repos", &repo.owner, &repo.repo, "statuses", &intent.sha]);
        let body = CreateStatus {
            state: intent.state,
            context: &intent.context,
            description: intent.description.as_deref(),
            target_url: intent.target_url.as_deref(),
        };
        let response = self
            .send(Method::POST, url, token, Some(&body))
            .await
            .map_err(|e| GitHubError::PublishRequest(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GitHubError::PublishStatus(response.status().as_u16()));
        }
        Ok(())
    }

    /// Run the full exchange (app JWT, installation, installation token) and
    /// publish `intent`. Nothing is cached or retried.
    pub async fn post_status(
        &self,
        repo: &RepoRef,
        intent: &StatusIntent,
    ) -> Result<(), GitHubError> {
        let jwt = self.app_jwt()?;
        let installation_id = self.installation_id(&jwt, repo).await?;
        tracing::debug!("Found installation ID {} for {}", installation_id, repo);
        let token = self.installation_token(&jwt, installation_id).await?;
        self.create_commit_status(&token, repo, intent).await
    }
}

/// Read a JSON response body, rejecting bodies over [`MAX_BODY_SIZE`].
async fn read_json<T: DeserializeOwned>(mut response: reqwest::Response) -> Result<T, String> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
        if body.len() + chunk.len() > MAX_BODY_SIZE {
            return Err(format!("response body exceeds {MAX_BODY_SIZE} bytes"));
        }
        body.extend_from_slice(&chunk);
    }
    serde_json::from_slice(&body).map_err(|e| e.to_string())
}
