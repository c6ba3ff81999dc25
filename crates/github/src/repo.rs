use std::fmt;

use url::Url;

const SSH_PREFIX: &str = "git@github.com:";

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("could not parse owner and repo from URL: {0}")]
pub struct ParseRepoError(pub String);

impl RepoRef {
    fn new(owner: &str, repo: &str) -> Option<Self> {
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self { owner: owner.to_string(), repo: repo.to_string() })
    }
}

/// Extract the owner and repository from one of:
/// - `git@github.com:owner/repo[.git]`
/// - `https://github.com/owner/repo[.git][/...]`
/// - `owner/repo`
pub fn parse_repo_url(input: &str) -> Result<RepoRef, ParseRepoError> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let parsed = if let Some(path) = trimmed.strip_prefix(SSH_PREFIX) {
        match path.split('/').collect::<Vec<_>>()[..] {
            [owner, repo] => RepoRef::new(owner, repo),
            _ => None,
        }
    } else if trimmed.contains("github.com/") {
        Url::parse(trimmed).ok().and_then(|url| {
            let mut segments = url.path().trim_matches('/').split('/');
            RepoRef::new(segments.next()?, segments.next()?)
        })
    } else if trimmed.matches('/').count() == 1 {
        trimmed.split_once('/').and_then(|(owner, repo)| RepoRef::new(owner, repo))
    } else {
        None
    };
    parsed.ok_or_else(|| ParseRepoError(trimmed.to_string()))
}
