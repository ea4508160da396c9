use std::fmt;
use std::time::SystemTime;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::retry::{RateLimitSignal, RetryPolicy, rate_limit_signal};
use crate::store::{EntryKind, RemoteEntry, RemoteObject, RemoteRef, RemoteStore, StoreError};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("repodrive/", env!("CARGO_PKG_VERSION"));

/// Identity of the backing repository, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let (owner, name) = value.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Client for the repository contents API.
#[derive(Clone)]
pub struct RepoClient {
    http: Client,
    base_url: Url,
    repo: RepoId,
    token: String,
    branch: Option<String>,
    retry: RetryPolicy,
}

impl RepoClient {
    pub fn new(repo: RepoId, token: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_base_url(DEFAULT_BASE_URL, repo, token)
    }

    pub fn with_base_url(
        base_url: &str,
        repo: RepoId,
        token: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: Client::builder().user_agent(USER_AGENT).build()?,
            base_url,
            repo,
            token: token.into(),
            branch: None,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Login of the token's owner; fails when the token is rejected.
    pub async fn authenticated_user(&self) -> Result<String, StoreError> {
        let url = self.endpoint(&["user"])?;
        let response = self.send(|| self.authorized(self.http.get(url.clone()))).await?;
        let user: UserInfo = Self::handle_response(response, "user").await?;
        Ok(user.login)
    }

    async fn fetch_contents(&self, path: &str) -> Result<ContentsResponse, StoreError> {
        let url = self.contents_url(path)?;
        let response = self
            .send(|| self.authorized(self.http.get(url.clone())))
            .await?;
        Self::handle_response(response, path).await
    }

    /// Current blob sha at `path`, `None` when nothing is stored there.
    async fn current_sha(&self, path: &str) -> Result<Option<String>, StoreError> {
        match self.fetch_contents(path).await {
            Ok(ContentsResponse::Item(item)) => Ok(Some(item.sha)),
            Ok(ContentsResponse::Listing(_)) => Err(StoreError::NotAFile {
                path: path.to_string(),
            }),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn download_raw(&self, href: &str, path: &str) -> Result<Vec<u8>, StoreError> {
        let url = Url::parse(href)?;
        let response = self
            .send(|| self.authorized(self.http.get(url.clone())))
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, path).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Issues the request built by `build`, re-issuing it while the server
    /// signals a rate limit and the policy allows another attempt.
    async fn send<F>(&self, build: F) -> Result<Response, StoreError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let response = build().send().await?;
            let signal = rate_limit_signal(response.status(), response.headers(), SystemTime::now());
            let RateLimitSignal::Limited { hint } = signal else {
                return Ok(response);
            };
            attempt += 1;
            if attempt >= self.retry.max_attempts {
                warn!(attempts = attempt, url = %response.url(), "rate limit persisted, giving up");
                return Err(StoreError::RateLimited { attempts: attempt });
            }
            let wait = self.retry.wait_for(attempt - 1, hint);
            warn!(
                attempt,
                wait_ms = wait.as_millis() as u64,
                url = %response.url(),
                "rate limited, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", ACCEPT)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn contents_url(&self, path: &str) -> Result<Url, StoreError> {
        let mut segments = vec![
            "repos",
            self.repo.owner.as_str(),
            self.repo.name.as_str(),
            "contents",
        ];
        segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        let mut url = self.endpoint(&segments)?;
        if let Some(branch) = &self.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        Ok(url)
    }

    async fn handle_response<T: DeserializeOwned>(
        response: Response,
        path: &str,
    ) -> Result<T, StoreError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::error_from(response, path).await)
        }
    }

    async fn error_from(response: Response, path: &str) -> StoreError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return StoreError::NotFound {
                path: path.to_string(),
            };
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .map(|payload| payload.message)
            .unwrap_or(body);
        StoreError::Remote { status, message }
    }
}

#[async_trait]
impl RemoteStore for RepoClient {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StoreError> {
        let items = match self.fetch_contents(path).await? {
            ContentsResponse::Listing(items) => items,
            ContentsResponse::Item(_) => {
                return Err(StoreError::NotADirectory {
                    path: path.to_string(),
                });
            }
        };
        Ok(items
            .into_iter()
            .filter_map(|item| {
                let kind = match item.content_type.as_str() {
                    "dir" => EntryKind::Dir,
                    "file" | "symlink" => EntryKind::File,
                    other => {
                        debug!(path = %item.path, kind = other, "skipping unsupported entry");
                        return None;
                    }
                };
                Some(RemoteEntry {
                    name: item.name,
                    kind,
                    reference: RemoteRef {
                        path: item.path,
                        sha: item.sha,
                        html_url: item.html_url,
                    },
                })
            })
            .collect())
    }

    async fn get(&self, reference: &RemoteRef) -> Result<RemoteObject, StoreError> {
        let item = match self.fetch_contents(&reference.path).await? {
            ContentsResponse::Item(item) => item,
            ContentsResponse::Listing(_) => {
                return Err(StoreError::NotAFile {
                    path: reference.path.clone(),
                });
            }
        };
        let bytes = match (item.encoding.as_deref(), item.content.as_deref()) {
            (Some("base64"), Some(content)) => decode_content(content)?,
            _ => match item.download_url.as_deref() {
                // Objects above the inline size limit come back without content.
                Some(href) => self.download_raw(href, &item.path).await?,
                None => Vec::new(),
            },
        };
        Ok(RemoteObject {
            bytes,
            reference: RemoteRef {
                path: item.path,
                sha: item.sha,
                html_url: item.html_url,
            },
        })
    }

    async fn put(&self, path: &str, bytes: &[u8], message: &str) -> Result<RemoteRef, StoreError> {
        let sha = self.current_sha(path).await?;
        let url = self.contents_url(path)?;
        let body = PutBody {
            message,
            content: STANDARD.encode(bytes),
            sha: sha.as_deref(),
            branch: self.branch.as_deref(),
        };
        debug!(path, overwrite = sha.is_some(), "put");
        let response = self
            .send(|| self.authorized(self.http.put(url.clone()).json(&body)))
            .await?;
        let written: WriteResponse = Self::handle_response(response, path).await?;
        Ok(RemoteRef {
            path: written.content.path,
            sha: written.content.sha,
            html_url: written.content.html_url,
        })
    }

    async fn delete(&self, path: &str, message: &str) -> Result<(), StoreError> {
        let sha = self
            .current_sha(path)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })?;
        let url = self.contents_url(path)?;
        let body = DeleteBody {
            message,
            sha: &sha,
            branch: self.branch.as_deref(),
        };
        debug!(path, "delete");
        let response = self
            .send(|| self.authorized(self.http.delete(url.clone()).json(&body)))
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response, path).await)
        }
    }
}

fn decode_content(content: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Item(ContentItem),
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: ContentItem,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    login: String,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}
