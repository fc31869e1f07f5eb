//! Record types extracted from profile, citation and search pages.
//!
//! All records are value objects rebuilt on every fetch.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A research interest with its label-search link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Interest {
    pub title: String,
    pub link: String,
}

/// Header of an author page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthorRecord {
    pub name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub affiliation: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub interests: Vec<Interest>,
}

/// One row of the citation metrics table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetricValue {
    pub all_time_value: u64,
    pub recent_period_value: u64,
}

/// Citations received in one year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct YearlyCitations {
    pub year: i32,
    pub citations: u64,
}

/// Citation table and yearly histogram of an author page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CitationMetrics {
    /// Normalized header of the recent-period column, e.g. `since_2019`
    pub recent_period_label: Option<String>,
    /// Normalized metric name (`citations`, `h_index`, `i10_index`) to values
    pub table: BTreeMap<String, MetricValue>,
    pub graph: Vec<YearlyCitations>,
}

/// Public access mandate summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PublicAccess {
    pub link: Option<String>,
    pub available_count: u64,
    pub unavailable_count: u64,
}

/// Everything extracted from a single author page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthorInfo {
    pub author: AuthorRecord,
    pub cited_by: CitationMetrics,
    pub public_access: PublicAccess,
}

/// Entry of an author's co-author list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CoAuthorRecord {
    pub name: String,
    pub link: String,
    pub author_id: Option<String>,
    pub affiliation: Option<String>,
    pub email: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Cited-by summary of an article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CitedBy {
    pub count: u64,
    pub link: Option<String>,
    pub cites_id: Option<String>,
}

/// One row of an author's publication list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    pub citation_id: Option<String>,
    pub authors: String,
    pub publication: String,
    pub cited_by: CitedBy,
    /// Raw year text, possibly empty
    pub year: String,
}

/// One profile of a search result page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileRecord {
    pub name: String,
    pub link: Option<String>,
    pub author_id: Option<String>,
    pub affiliations: Option<String>,
    pub email: Option<String>,
    pub cited_by_count: u64,
    pub interests: Vec<Interest>,
    pub thumbnail_url: Option<String>,
}

/// Opaque pagination token scoped to one direction.
///
/// Only obtainable from a fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Navigation state of a search result page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Pagination {
    /// `after_author` token of the next page
    pub forward_cursor: Option<Cursor>,
    /// `before_author` token of the previous page
    pub backward_cursor: Option<Cursor>,
    pub next_link: Option<String>,
    pub prev_link: Option<String>,
}

impl Pagination {
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.forward_cursor.is_some()
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.backward_cursor.is_some()
    }
}

/// Profiles of one search page plus its cursors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResultPage {
    pub profiles: Vec<ProfileRecord>,
    pub pagination: Pagination,
}
