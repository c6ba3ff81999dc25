use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

/// The state of a commit status, as accepted by the GitHub API.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Error,
    Failure,
    Pending,
    Success,
}

impl StatusState {
    pub const fn variants() -> &'static [Self] {
        &[Self::Error, Self::Failure, Self::Pending, Self::Success]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Failure => "failure",
            Self::Pending => "pending",
            Self::Success => "success",
        }
    }

    /// Map a workflow phase onto a status state. Case-insensitive.
    ///
    /// Unrecognized phases map to [`StatusState::Error`] so that they never
    /// read as a success.
    pub fn from_phase(phase: &str) -> Self {
        match phase.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Success,
            "failed" | "error" => Self::Failure,
            "running" | "pending" => Self::Pending,
            _ => Self::Error,
        }
    }
}

impl FromStr for StatusState {
    type Err = ();

    /// Exact, lowercase match only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::variants().iter().copied().find(|v| v.as_str() == s).ok_or(())
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A validated request to create a commit status. Both ingress paths build one.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StatusIntent {
    pub repository: String,
    pub sha: String,
    pub state: StatusState,
    /// The check name; a newer status with the same context supersedes older ones.
    pub context: String,
    pub target_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("state must be one of: error, failure, pending, success")]
    InvalidState,
    #[error("kind must be 'workflow'")]
    InvalidKind,
}

/// Body of `POST /status`. Missing and `null` fields decode as empty strings.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub repo_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sha: String,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub context: String,
    #[serde(deserialize_with = "null_as_default")]
    pub target_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

impl StatusRequest {
    pub fn validate(&self) -> Result<StatusState, ValidationError> {
        if self.repo_url.is_empty() {
            return Err(ValidationError::Missing("repo_url"));
        }
        if self.sha.is_empty() {
            return Err(ValidationError::Missing("sha"));
        }
        if self.state.is_empty() {
            return Err(ValidationError::Missing("state"));
        }
        let state = self.state.parse().map_err(|_| ValidationError::InvalidState)?;
        if self.context.is_empty() {
            return Err(ValidationError::Missing("context"));
        }
        Ok(state)
    }

    pub fn into_intent(self) -> Result<StatusIntent, ValidationError> {
        let state = self.validate()?;
        Ok(StatusIntent {
            repository: self.repo_url,
            sha: self.sha,
            state,
            context: self.context,
            target_url: non_empty(self.target_url),
            description: non_empty(self.description),
        })
    }
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Decode a JSON `null` the same way as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Response body for every endpoint except `/healthz`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}
