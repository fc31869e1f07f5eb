//! # Retrievers
//!
//! Stateful drivers over [`Fetcher`] and the extractors. Each retriever owns its own
//! parameter set, committed results and state; nothing is shared between instances.
//!
//! A fetch step applies the accumulated parameters, performs one logical page fetch,
//! extracts, and only then commits. A failed fetch leaves the committed results as they
//! were and moves the retriever to [`RetrievalState::Failed`].

pub mod articles;
pub mod author;
pub mod profile_search;

pub use articles::{ArticlesOrder, AuthorArticlesRetriever};
pub use author::{AuthorInfoRetriever, CoAuthorsRetriever};
pub use profile_search::{ProfileSearch, SearchCriteria};

use crate::client::{Fetcher, RequestParameters};
use crate::models::{AuthorInfo, ArticleRecord, CoAuthorRecord, SearchResultPage};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;
use url::Url;

/// Lifecycle of a retriever
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RetrievalState {
    /// No fetch has completed yet
    #[default]
    Uninitialized,
    /// The last fetch succeeded and its results are committed
    Ready,
    /// The last fetch failed; earlier results remain committed
    Failed(String),
}

impl fmt::Display for RetrievalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Ready => write!(f, "ready"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of any retriever, convertible to a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalRecord {
    AuthorInfo(AuthorInfo),
    CoAuthors(Vec<CoAuthorRecord>),
    Publications(Vec<ArticleRecord>),
    Profiles(SearchResultPage),
}

impl RetrievalRecord {
    /// JSON document keyed by record kind:
    /// `{author, cited_by, public_access}`, `{coauthors}`, `{publications}` or
    /// `{profiles, pagination}`
    pub fn to_json(&self) -> Result<Value> {
        let value = match self {
            Self::AuthorInfo(info) => serde_json::to_value(info)?,
            Self::CoAuthors(coauthors) => wrap("coauthors", serde_json::to_value(coauthors)?),
            Self::Publications(articles) => {
                wrap("publications", serde_json::to_value(articles)?)
            }
            Self::Profiles(page) => serde_json::to_value(page)?,
        };
        Ok(value)
    }

    /// Merge several records into one JSON object; later keys overwrite earlier ones
    pub fn merge_json<'a>(records: impl IntoIterator<Item = &'a Self>) -> Result<Value> {
        let mut merged = Map::new();
        for record in records {
            if let Value::Object(fields) = record.to_json()? {
                merged.extend(fields);
            }
        }
        Ok(Value::Object(merged))
    }

    /// Number of top-level entries (profiles, articles, co-authors; 1 for author info)
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::AuthorInfo(_) => 1,
            Self::CoAuthors(coauthors) => coauthors.len(),
            Self::Publications(articles) => articles.len(),
            Self::Profiles(page) => page.profiles.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn wrap(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Uniform capability over every retriever kind
#[async_trait]
pub trait Retriever: Send {
    /// Short name used in logs and CLI output
    fn name(&self) -> &'static str;

    /// Run the retriever's default fetch and return the committed record
    async fn fetch(&mut self) -> Result<RetrievalRecord>;

    /// Last committed result, without I/O
    fn as_record(&self) -> RetrievalRecord;

    fn state(&self) -> &RetrievalState;
}

/// Parameter set, state and transport shared by every retriever kind
#[derive(Debug, Clone)]
pub(crate) struct Session {
    fetcher: Fetcher,
    params: RequestParameters,
    state: RetrievalState,
    last_document: Option<String>,
}

impl Session {
    pub(crate) fn new(fetcher: Fetcher) -> Self {
        let mut params = RequestParameters::new();
        params.set_language(fetcher.language());
        Self {
            fetcher,
            params,
            state: RetrievalState::Uninitialized,
            last_document: None,
        }
    }

    pub(crate) const fn params(&self) -> &RequestParameters {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut RequestParameters {
        &mut self.params
    }

    pub(crate) const fn state(&self) -> &RetrievalState {
        &self.state
    }

    pub(crate) fn base(&self) -> &Url {
        self.fetcher.base()
    }

    pub(crate) fn last_document(&self) -> Option<&str> {
        self.last_document.as_deref()
    }

    /// Fetch the document for the current parameters; a failure marks the session failed
    pub(crate) async fn load(&mut self) -> Result<String> {
        match self.fetcher.fetch(&self.params).await {
            Ok(body) => {
                self.last_document = Some(body.clone());
                Ok(body)
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    pub(crate) fn mark_ready(&mut self) {
        self.state = RetrievalState::Ready;
    }

    /// Record `error` as the failure reason and hand it back
    pub(crate) fn fail(&mut self, error: Error) -> Error {
        warn!("Retrieval failed: {}", error);
        self.state = RetrievalState::Failed(error.to_string());
        error
    }
}

/// Reject blank author identifiers before any I/O
pub(crate) fn require_author_id(author_id: &str) -> Result<String> {
    let author_id = author_id.trim();
    if author_id.is_empty() {
        return Err(Error::invalid_query("author id must not be empty"));
    }
    Ok(author_id.to_string())
}
