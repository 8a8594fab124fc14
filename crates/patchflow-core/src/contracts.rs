//! Request and response payloads for the tools the agents call:
//! repository read/write, runner commands, and code search.
//!
//! Every type validates on construction, and serde decoding goes through
//! the same checks via `try_from`, so an invalid payload never exists.

use serde::{Deserialize, Serialize};

use crate::domain::{validate_relative_path, PlanError};

/// Upper bound on code-search results per query.
pub const MAX_SEARCH_RESULTS: u32 = 200;
const MIN_QUERY_LEN: usize = 3;

/// Validation errors for tool payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error(transparent)]
    Path(#[from] PlanError),

    #[error("command must provide at least one token")]
    EmptyCommand,

    #[error("timeout_seconds must be positive")]
    NonPositiveTimeout,

    #[error("query must contain at least 3 characters")]
    QueryTooShort,

    #[error("max_results must be between 1 and 200, got {0}")]
    MaxResultsOutOfRange(u32),

    #[error("end_line {end} precedes start_line {start}")]
    InvalidLineRange { start: u32, end: u32 },
}

/// Read a file through the repository tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRepoRead")]
pub struct RepoReadRequest {
    pub path: String,
}

#[derive(Deserialize)]
struct RawRepoRead {
    path: String,
}

impl TryFrom<RawRepoRead> for RepoReadRequest {
    type Error = ContractError;

    fn try_from(raw: RawRepoRead) -> Result<Self, Self::Error> {
        Self::new(raw.path)
    }
}

impl RepoReadRequest {
    pub fn new(path: impl Into<String>) -> Result<Self, ContractError> {
        let path = path.into().trim().to_string();
        validate_relative_path(&path)?;
        Ok(Self { path })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoReadResponse {
    pub path: String,
    pub content: String,
    pub sha: String,
}

/// Write a file through the repository tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRepoWrite")]
pub struct RepoWriteRequest {
    pub path: String,
    pub content: String,
    pub allow_create: bool,
}

#[derive(Deserialize)]
struct RawRepoWrite {
    path: String,
    content: String,
    #[serde(default)]
    allow_create: bool,
}

impl TryFrom<RawRepoWrite> for RepoWriteRequest {
    type Error = ContractError;

    fn try_from(raw: RawRepoWrite) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.path, raw.content)?.allow_create(raw.allow_create))
    }
}

impl RepoWriteRequest {
    /// New write request; creating files is off unless [`allow_create`](Self::allow_create) is set.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Result<Self, ContractError> {
        let path = path.into().trim().to_string();
        validate_relative_path(&path)?;
        Ok(Self {
            path,
            content: content.into(),
            allow_create: false,
        })
    }

    pub fn allow_create(mut self, allow: bool) -> Self {
        self.allow_create = allow;
        self
    }
}

/// Execute a command through the runner tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRunnerCommand")]
pub struct RunnerCommandRequest {
    #[serde(rename = "cmd")]
    pub command: Vec<String>,
    pub timeout_seconds: u64,
    pub workdir: Option<String>,
    pub capture_output: bool,
}

#[derive(Deserialize)]
struct RawRunnerCommand {
    #[serde(alias = "command")]
    cmd: Vec<String>,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default)]
    workdir: Option<String>,
    #[serde(default = "default_capture_output")]
    capture_output: bool,
}

fn default_timeout_seconds() -> u64 {
    600
}

fn default_capture_output() -> bool {
    true
}

impl TryFrom<RawRunnerCommand> for RunnerCommandRequest {
    type Error = ContractError;

    fn try_from(raw: RawRunnerCommand) -> Result<Self, Self::Error> {
        let mut request = Self::new(raw.cmd)?.with_timeout(raw.timeout_seconds)?;
        request.workdir = raw.workdir;
        request.capture_output = raw.capture_output;
        Ok(request)
    }
}

impl RunnerCommandRequest {
    pub fn new<I, S>(command: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command: Vec<String> = command.into_iter().map(Into::into).collect();
        if command.is_empty() {
            return Err(ContractError::EmptyCommand);
        }
        Ok(Self {
            command,
            timeout_seconds: default_timeout_seconds(),
            workdir: None,
            capture_output: default_capture_output(),
        })
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Result<Self, ContractError> {
        if timeout_seconds == 0 {
            return Err(ContractError::NonPositiveTimeout);
        }
        self.timeout_seconds = timeout_seconds;
        Ok(self)
    }

    pub fn in_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// The executable, i.e. the first token.
    pub fn program(&self) -> &str {
        &self.command[0]
    }
}

/// Query for the code-search tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCodeSearch")]
pub struct CodeSearchQuery {
    pub query: String,
    pub max_results: u32,
    pub repo_filter: Option<String>,
}

#[derive(Deserialize)]
struct RawCodeSearch {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: u32,
    #[serde(default)]
    repo_filter: Option<String>,
}

fn default_max_results() -> u32 {
    20
}

impl TryFrom<RawCodeSearch> for CodeSearchQuery {
    type Error = ContractError;

    fn try_from(raw: RawCodeSearch) -> Result<Self, Self::Error> {
        let mut query = Self::new(raw.query)?.with_max_results(raw.max_results)?;
        query.repo_filter = raw.repo_filter;
        Ok(query)
    }
}

impl CodeSearchQuery {
    pub fn new(query: impl Into<String>) -> Result<Self, ContractError> {
        let query = query.into().trim().to_string();
        if query.chars().count() < MIN_QUERY_LEN {
            return Err(ContractError::QueryTooShort);
        }
        Ok(Self {
            query,
            max_results: default_max_results(),
            repo_filter: None,
        })
    }

    pub fn with_max_results(mut self, max_results: u32) -> Result<Self, ContractError> {
        if max_results == 0 || max_results > MAX_SEARCH_RESULTS {
            return Err(ContractError::MaxResultsOutOfRange(max_results));
        }
        self.max_results = max_results;
        Ok(self)
    }

    pub fn in_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo_filter = Some(repo.into());
        self
    }
}

/// One code-search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSearchResult")]
pub struct CodeSearchResult {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub snippet: String,
}

#[derive(Deserialize)]
struct RawSearchResult {
    path: String,
    start_line: u32,
    end_line: u32,
    snippet: String,
}

impl TryFrom<RawSearchResult> for CodeSearchResult {
    type Error = ContractError;

    fn try_from(raw: RawSearchResult) -> Result<Self, Self::Error> {
        Self::new(raw.path, raw.start_line, raw.end_line, raw.snippet)
    }
}

impl CodeSearchResult {
    pub fn new(
        path: impl Into<String>,
        start_line: u32,
        end_line: u32,
        snippet: impl Into<String>,
    ) -> Result<Self, ContractError> {
        let path = path.into();
        validate_relative_path(&path)?;
        if end_line < start_line {
            return Err(ContractError::InvalidLineRange {
                start: start_line,
                end: end_line,
            });
        }
        Ok(Self {
            path,
            start_line,
            end_line,
            snippet: snippet.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSearchResponse {
    pub query: CodeSearchQuery,
    pub results: Vec<CodeSearchResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_trimmed_before_length_check() {
        assert_eq!(
            CodeSearchQuery::new("  ab  ").unwrap_err(),
            ContractError::QueryTooShort
        );
        assert_eq!(CodeSearchQuery::new(" retry ").unwrap().query, "retry");
    }

    #[test]
    fn test_max_results_bounds() {
        let q = CodeSearchQuery::new("retry logic").unwrap();
        assert!(q.clone().with_max_results(0).is_err());
        assert!(q.clone().with_max_results(201).is_err());
        assert_eq!(q.with_max_results(200).unwrap().max_results, 200);
    }

    #[test]
    fn test_runner_program() {
        let req = RunnerCommandRequest::new(["cargo", "test"]).unwrap();
        assert_eq!(req.program(), "cargo");
    }
}
