use pulse_core::parse_timestamp;
use serde::Deserialize;

use crate::types::{CommitPage, IngestError, RateLimitReadout, RawCommit};

pub(crate) const HISTORY_QUERY: &str = r#"
query CommitHistory(
  $owner: String!
  $name: String!
  $first: Int!
  $after: String
  $since: GitTimestamp!
  $until: GitTimestamp!
) {
  rateLimit {
    remaining
    resetAt
  }
  repository(owner: $owner, name: $name) {
    defaultBranchRef {
      target {
        ... on Commit {
          history(first: $first, after: $after, since: $since, until: $until) {
            pageInfo {
              hasNextPage
              endCursor
            }
            nodes {
              oid
              message
              additions
              deletions
              author {
                name
                email
                date
              }
              parents(first: 2) {
                totalCount
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Why a single request did not produce a page.
#[derive(Debug)]
pub(crate) enum FetchFailure {
    RateLimited(String),
    Failed(IngestError),
}

impl From<IngestError> for FetchFailure {
    fn from(err: IngestError) -> Self {
        Self::Failed(err)
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: String,
}

impl GraphqlError {
    fn is_rate_limit(&self) -> bool {
        self.kind.as_deref() == Some("RATE_LIMITED")
            || self.message.to_ascii_lowercase().contains("rate limit")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    rate_limit: Option<RateLimitNode>,
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitNode {
    remaining: u64,
    reset_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    default_branch_ref: Option<BranchRefNode>,
}

#[derive(Debug, Deserialize)]
struct BranchRefNode {
    target: Option<TargetNode>,
}

#[derive(Debug, Deserialize)]
struct TargetNode {
    history: Option<HistoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryNode {
    page_info: PageInfo,
    nodes: Vec<CommitNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitNode {
    oid: String,
    message: String,
    additions: u64,
    deletions: u64,
    author: Option<AuthorNode>,
    parents: ParentsNode,
}

#[derive(Debug, Deserialize)]
struct AuthorNode {
    name: Option<String>,
    email: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParentsNode {
    total_count: u32,
}

fn protocol(message: impl Into<String>) -> FetchFailure {
    FetchFailure::Failed(IngestError::Protocol(message.into()))
}

pub(crate) fn parse_page(body: &str) -> Result<CommitPage, FetchFailure> {
    let response: GraphqlResponse = serde_json::from_str(body)
        .map_err(|err| protocol(format!("invalid response body: {err}")))?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        if let Some(limited) = errors.iter().find(|err| err.is_rate_limit()) {
            return Err(FetchFailure::RateLimited(limited.message.clone()));
        }
        let messages = errors
            .iter()
            .map(|err| err.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(protocol(messages));
    }

    let data = response.data.ok_or_else(|| protocol("response has no data"))?;
    let rate_limit = data.rate_limit.map(parse_rate_limit).transpose()?;
    let history = data
        .repository
        .ok_or_else(|| protocol("repository not found"))?
        .default_branch_ref
        .ok_or_else(|| protocol("repository has no default branch"))?
        .target
        .and_then(|target| target.history)
        .ok_or_else(|| protocol("default branch does not point at a commit"))?;

    let next_cursor = if history.page_info.has_next_page {
        Some(
            history
                .page_info
                .end_cursor
                .ok_or_else(|| protocol("page reports more results but no cursor"))?,
        )
    } else {
        None
    };

    let commits = history
        .nodes
        .into_iter()
        .map(parse_commit)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CommitPage {
        commits,
        next_cursor,
        rate_limit,
    })
}

fn parse_rate_limit(node: RateLimitNode) -> Result<RateLimitReadout, FetchFailure> {
    let reset_at = parse_timestamp(&node.reset_at)
        .map_err(|err| protocol(format!("invalid rate limit reset '{}': {err}", node.reset_at)))?;
    Ok(RateLimitReadout {
        remaining: node.remaining,
        reset_at: reset_at.timestamp(),
    })
}

fn parse_commit(node: CommitNode) -> Result<RawCommit, FetchFailure> {
    let author = node.author.unwrap_or(AuthorNode {
        name: None,
        email: None,
        date: None,
    });
    let date = author
        .date
        .ok_or_else(|| protocol(format!("commit {} has no author date", node.oid)))?;
    let author_date = parse_timestamp(&date)
        .map_err(|err| protocol(format!("commit {} has bad author date: {err}", node.oid)))?;
    Ok(RawCommit {
        sha: node.oid,
        message: node.message,
        author_name: author.name.unwrap_or_else(|| "unknown".to_string()),
        author_email: author.email.filter(|email| !email.trim().is_empty()),
        author_date,
        additions: node.additions,
        deletions: node.deletions,
        parent_count: node.parents.total_count,
    })
}
