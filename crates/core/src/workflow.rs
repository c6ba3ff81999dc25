//! Argo Workflows notification payloads.

use std::collections::HashMap;

use serde::{Deserialize, de::IgnoredAny};

use crate::models::{StatusIntent, StatusState, ValidationError, non_empty, null_as_default};

/// Label Argo sets on every workflow with its current phase.
pub const PHASE_LABEL: &str = "workflows.argoproj.io/phase";

/// Prefix of the commit status context for workflow notifications.
pub const CONTEXT_PREFIX: &str = "argo-workflows";

/// The untyped `status` field of a workflow notification. Only a string is
/// meaningful; any other JSON value (including `null`) is kept as `Other`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum WorkflowStatus {
    Text(String),
    #[default]
    Other,
}

impl<'de> Deserialize<'de> for WorkflowStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::Deserializer<'de> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Other(IgnoredAny),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self::Text(s),
            Raw::Other(_) => Self::Other,
        })
    }
}

/// Body of `POST /workflow`.
///
/// `event` and `phase` are accepted on the wire but always recomputed by
/// [`WorkflowEvent::normalize`]; callers cannot choose them. A `null` string
/// field reads as empty.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkflowEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub event: String,
    #[serde(rename = "workflowName", deserialize_with = "null_as_default")]
    pub workflow_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub namespace: String,
    #[serde(rename = "repoURL", deserialize_with = "null_as_default")]
    pub repo_url: String,
    #[serde(rename = "commitSha", deserialize_with = "null_as_default")]
    pub commit_sha: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phase: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<String>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<String>,
    pub labels: Option<HashMap<String, String>>,
    pub annotations: Option<HashMap<String, String>>,
    #[serde(alias = "targetUrl", deserialize_with = "null_as_default")]
    pub target_url: String,
    pub status: WorkflowStatus,
}

/// Derive the lowercase workflow phase.
///
/// The phase label wins, then a string `status`, then `"unknown"`.
pub fn normalize_phase(
    labels: Option<&HashMap<String, String>>,
    status: &WorkflowStatus,
) -> String {
    if let Some(phase) = labels.and_then(|l| l.get(PHASE_LABEL)).map(|v| v.trim())
        && !phase.is_empty()
    {
        return phase.to_lowercase();
    }
    if let WorkflowStatus::Text(s) = status {
        let s = s.trim();
        if !s.is_empty() {
            return s.to_lowercase();
        }
    }
    "unknown".to_string()
}

/// Map a phase to the coarse event name.
pub fn event_from_phase(phase: &str) -> &'static str {
    match phase.trim().to_lowercase().as_str() {
        "running" | "pending" => "workflow-pending",
        "succeeded" => "workflow-succeeded",
        "failed" | "error" => "workflow-failed",
        _ => "workflow-unknown",
    }
}

impl WorkflowEvent {
    /// Overwrite `phase` and `event` with server-derived values.
    pub fn normalize(&mut self) {
        self.phase = normalize_phase(self.labels.as_ref(), &self.status);
        self.event = event_from_phase(&self.phase).to_string();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.kind != "workflow" {
            return Err(ValidationError::InvalidKind);
        }
        if self.event.is_empty() {
            return Err(ValidationError::Missing("event"));
        }
        if self.workflow_name.is_empty() {
            return Err(ValidationError::Missing("workflowName"));
        }
        if self.namespace.is_empty() {
            return Err(ValidationError::Missing("namespace"));
        }
        if self.phase.is_empty() {
            return Err(ValidationError::Missing("phase"));
        }
        if self.labels.is_none() {
            return Err(ValidationError::Missing("labels"));
        }
        if self.repo_url.trim().is_empty() {
            return Err(ValidationError::Missing("repoURL"));
        }
        Ok(())
    }

    pub fn context(&self) -> String {
        format!("{CONTEXT_PREFIX}/{}/{}", self.namespace, self.workflow_name)
    }

    /// Normalize, validate and translate into a commit status.
    pub fn into_intent(mut self) -> Result<StatusIntent, ValidationError> {
        self.normalize();
        self.validate()?;
        if self.commit_sha.is_empty() {
            return Err(ValidationError::Missing("commitSha"));
        }
        let repository = self.repo_url.trim().to_string();
        if repository.is_empty() {
            return Err(ValidationError::Missing("repoURL"));
        }
        Ok(StatusIntent {
            state: StatusState::from_phase(&self.phase),
            context: self.context(),
            description: Some(format!("Workflow {}", self.phase.to_lowercase())),
            target_url: non_empty(self.target_url),
            sha: self.commit_sha,
            repository,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(phase: Option<&str>) -> Option<HashMap<String, String>> {
        let mut labels = HashMap::new();
        if let Some(phase) = phase {
            labels.insert(PHASE_LABEL.to_string(), phase.to_string());
        }
        Some(labels)
    }

    fn valid() -> WorkflowEvent {
        WorkflowEvent {
            kind: "workflow".to_string(),
            event: "workflow-succeeded".to_string(),
            workflow_name: "wf".to_string(),
            namespace: "ns".to_string(),
            repo_url: "owner/repo".to_string(),
            commit_sha: "abc123".to_string(),
            phase: "succeeded".to_string(),
            labels: labels(Some("Succeeded")),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_phase() {
        let text = |s: &str| WorkflowStatus::Text(s.to_string());
        let cases: &[(Option<HashMap<String, String>>, WorkflowStatus, &str)] = &[
            (labels(Some("Succeeded")), text("Failed"), "succeeded"),
            (labels(Some("  Running ")), WorkflowStatus::Other, "running"),
            (labels(Some("   ")), text("Failed"), "failed"),
            (labels(None), text(" Error "), "error"),
            (None, text("Pending"), "pending"),
            (labels(None), text("  "), "unknown"),
            (labels(None), WorkflowStatus::Other, "unknown"),
            (None, WorkflowStatus::Other, "unknown"),
        ];
        for (labels, status, expected) in cases {
            assert_eq!(normalize_phase(labels.as_ref(), status), *expected, "{labels:?}");
        }
    }

    #[test]
    fn test_event_from_phase() {
        let cases = [
            ("running", "workflow-pending"),
            ("Pending", "workflow-pending"),
            (" succeeded ", "workflow-succeeded"),
            ("failed", "workflow-failed"),
            ("ERROR", "workflow-failed"),
            ("unknown", "workflow-unknown"),
            ("skipped", "workflow-unknown"),
        ];
        for (phase, expected) in cases {
            assert_eq!(event_from_phase(phase), expected, "{phase}");
        }
    }

    #[test]
    fn test_status_decoding() {
        let decode = |json: &str| serde_json::from_str::<WorkflowEvent>(json).unwrap().status;
        assert_eq!(decode(r#"{"status":"Succeeded"}"#), WorkflowStatus::Text("Succeeded".into()));
        assert_eq!(decode(r#"{"status":{"phase":"Succeeded"}}"#), WorkflowStatus::Other);
        assert_eq!(decode(r#"{"status":42}"#), WorkflowStatus::Other);
        assert_eq!(decode(r#"{"status":null}"#), WorkflowStatus::Other);
        assert_eq!(decode(r#"{}"#), WorkflowStatus::Other);
    }

    #[test]
    fn test_wire_names() {
        let event: WorkflowEvent = serde_json::from_str(
            r#"{
                "kind": "workflow",
                "workflowName": "wf",
                "namespace": "ns",
                "repoURL": "https://github.com/o/r",
                "commitSha": "abc",
                "startedAt": "2024-01-01T00:00:00Z",
                "labels": {},
                "annotations": null,
                "targetUrl": "https://argo.example.com/wf"
            }"#,
        )
        .unwrap();
        assert_eq!(event.workflow_name, "wf");
        assert_eq!(event.repo_url, "https://github.com/o/r");
        assert_eq!(event.commit_sha, "abc");
        assert_eq!(event.started_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(event.labels, Some(HashMap::new()));
        assert_eq!(event.annotations, None);
        assert_eq!(event.target_url, "https://argo.example.com/wf");

        let event: WorkflowEvent = serde_json::from_str(r#"{"labels":null}"#).unwrap();
        assert_eq!(event.labels, None);
    }

    #[test]
    fn test_null_string_fields() {
        let event: WorkflowEvent = serde_json::from_str(
            r#"{
                "kind": "workflow",
                "event": null,
                "phase": null,
                "workflowName": "wf",
                "namespace": "ns",
                "repoURL": "owner/repo",
                "commitSha": "abc123",
                "labels": {"workflows.argoproj.io/phase": "Running"},
                "target_url": null
            }"#,
        )
        .unwrap();
        assert_eq!(event.phase, "");
        assert_eq!(event.target_url, "");
        let intent = event.into_intent().unwrap();
        assert_eq!(intent.state, StatusState::Pending);
        assert_eq!(intent.target_url, None);

        let event: WorkflowEvent =
            serde_json::from_str(r#"{"kind":"workflow","commitSha":null}"#).unwrap();
        assert_eq!(event.commit_sha, "");
    }

    #[test]
    fn test_validate_workflow_event() {
        let cases: &[(&str, WorkflowEvent, Option<ValidationError>)] = &[
            ("valid", valid(), None),
            (
                "missing kind",
                WorkflowEvent { kind: String::new(), ..valid() },
                Some(ValidationError::InvalidKind),
            ),
            (
                "wrong kind",
                WorkflowEvent { kind: "pod".to_string(), ..valid() },
                Some(ValidationError::InvalidKind),
            ),
            (
                "missing event",
                WorkflowEvent { event: String::new(), ..valid() },
                Some(ValidationError::Missing("event")),
            ),
            (
                "missing workflowName",
                WorkflowEvent { workflow_name: String::new(), ..valid() },
                Some(ValidationError::Missing("workflowName")),
            ),
            (
                "missing namespace",
                WorkflowEvent { namespace: String::new(), ..valid() },
                Some(ValidationError::Missing("namespace")),
            ),
            (
                "missing phase",
                WorkflowEvent { phase: String::new(), ..valid() },
                Some(ValidationError::Missing("phase")),
            ),
            (
                "nil labels",
                WorkflowEvent { labels: None, ..valid() },
                Some(ValidationError::Missing("labels")),
            ),
            (
                "blank repoURL",
                WorkflowEvent { repo_url: "  ".to_string(), ..valid() },
                Some(ValidationError::Missing("repoURL")),
            ),
        ];
        for (name, event, expected) in cases {
            assert_eq!(event.validate().err(), *expected, "{name}");
        }
    }

    #[test]
    fn test_into_intent() {
        let intent = valid().into_intent().unwrap();
        assert_eq!(intent.repository, "owner/repo");
        assert_eq!(intent.sha, "abc123");
        assert_eq!(intent.state, StatusState::Success);
        assert_eq!(intent.context, "argo-workflows/ns/wf");
        assert_eq!(intent.description.as_deref(), Some("Workflow succeeded"));
        assert_eq!(intent.target_url, None);
    }

    #[test]
    fn test_into_intent_overrides_caller_phase() {
        let event = WorkflowEvent {
            phase: "succeeded".to_string(),
            event: "workflow-succeeded".to_string(),
            labels: labels(None),
            status: WorkflowStatus::Text("Failed".to_string()),
            ..valid()
        };
        let intent = event.into_intent().unwrap();
        assert_eq!(intent.state, StatusState::Failure);
        assert_eq!(intent.description.as_deref(), Some("Workflow failed"));
    }

    #[test]
    fn test_into_intent_unknown_phase() {
        let event = WorkflowEvent { labels: labels(None), ..valid() };
        let intent = event.into_intent().unwrap();
        assert_eq!(intent.state, StatusState::Error);
        assert_eq!(intent.description.as_deref(), Some("Workflow unknown"));
    }

    #[test]
    fn test_into_intent_requires_commit_sha() {
        let event = WorkflowEvent { commit_sha: String::new(), ..valid() };
        assert_eq!(event.into_intent(), Err(ValidationError::Missing("commitSha")));
    }

    #[test]
    fn test_into_intent_trims_repo_url() {
        let event = WorkflowEvent { repo_url: "  owner/repo\n".to_string(), ..valid() };
        assert_eq!(event.into_intent().unwrap().repository, "owner/repo");
    }
}
