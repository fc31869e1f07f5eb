use super::{RetrievalRecord, RetrievalState, Retriever, Session};
use crate::client::params::{DEFAULT_LANGUAGE, LANGUAGE_KEY};
use crate::client::{Fetcher, ParamValue, RequestParameters};
use crate::models::{Cursor, SearchResultPage};
use crate::parser::profiles::{BACKWARD_CURSOR_KEY, FORWARD_CURSOR_KEY};
use crate::parser::parse_profile_search;
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument};
use url::Url;

const VIEW_OP: &str = "view_op";
const SEARCH_AUTHORS: &str = "search_authors";
const VIEW_ORG: &str = "view_org";
const MAUTHORS: &str = "mauthors";
const ORG: &str = "org";

/// What to search profiles by.
///
/// Author name and label combine into one query; an organization search stands alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub author: Option<String>,
    pub label: Option<String>,
    pub organization: Option<String>,
    /// Interface language; the retriever's current language when `None`
    pub language: Option<String>,
}

impl SearchCriteria {
    #[must_use]
    pub fn author(author: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn organization(org_id: impl Into<String>) -> Self {
        Self {
            organization: Some(org_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Request parameters for these criteria, validated before any I/O
    fn to_params(&self, default_language: &str) -> Result<RequestParameters> {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        };
        let author = clean(&self.author);
        let label = clean(&self.label);
        let organization = clean(&self.organization);
        let language = clean(&self.language).unwrap_or_else(|| default_language.to_string());

        let mut params = RequestParameters::new();
        match (organization, author, label) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(Error::invalid_query(
                    "organization search cannot be combined with author or label",
                ));
            }
            (Some(org), None, None) => {
                params.set(VIEW_OP, VIEW_ORG);
                params.set(ORG, org);
            }
            (None, None, None) => {
                return Err(Error::invalid_query(
                    "Invalid args: author or label must be provided",
                ));
            }
            (None, author, label) => {
                let mauthors = author
                    .into_iter()
                    .chain(label.map(|l| format!("label:{l}")))
                    .collect::<Vec<_>>()
                    .join(" ");
                params.set(VIEW_OP, SEARCH_AUTHORS);
                params.set(MAUTHORS, mauthors);
            }
        }
        params.set_language(language);
        Ok(params)
    }
}

/// Paginated profile search
#[derive(Debug, Clone)]
pub struct ProfileSearch {
    session: Session,
    results: SearchResultPage,
}

impl ProfileSearch {
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            session: Session::new(fetcher),
            results: SearchResultPage::default(),
        }
    }

    /// Search by author name and/or label; `hl` defaults to the current language
    pub async fn search_by_author(
        &mut self,
        author: Option<&str>,
        label: Option<&str>,
        hl: Option<&str>,
    ) -> Result<&SearchResultPage> {
        let criteria = SearchCriteria {
            author: author.map(ToString::to_string),
            label: label.map(ToString::to_string),
            organization: None,
            language: hl.map(ToString::to_string),
        };
        self.search_by_criteria(&criteria).await
    }

    /// List the profiles affiliated with an organization id
    pub async fn search_by_organization(
        &mut self,
        org_id: &str,
        hl: Option<&str>,
    ) -> Result<&SearchResultPage> {
        let mut criteria = SearchCriteria::organization(org_id);
        criteria.language = hl.map(ToString::to_string);
        self.search_by_criteria(&criteria).await
    }

    /// Start a new search: parameters are replaced wholesale and cursors cleared
    #[instrument(skip(self))]
    pub async fn search_by_criteria(
        &mut self,
        criteria: &SearchCriteria,
    ) -> Result<&SearchResultPage> {
        let params = criteria.to_params(&self.session.params().language())?;
        self.start(params).await
    }

    /// Adopt the query of a profile search URL taken from a browser.
    ///
    /// Author searches need `view_op=search_authors` and `mauthors`, organization listings
    /// `view_op=view_org` and `org`. Only the mode parameters and `hl` are kept.
    #[instrument(skip(self))]
    pub async fn search_by_url(&mut self, url: &str) -> Result<&SearchResultPage> {
        let url = Url::parse(url)
            .map_err(|e| Error::invalid_query(format!("Invalid link: {e}")))?;
        let query = RequestParameters::from_url(&url);

        let view_op = query
            .get_string(VIEW_OP)
            .ok_or_else(|| Error::invalid_query("Invalid link: missing view_op parameter"))?;
        let required = match view_op.as_str() {
            SEARCH_AUTHORS => MAUTHORS,
            VIEW_ORG => ORG,
            _ => {
                return Err(Error::invalid_query(
                    "Invalid link: incorrect view_op parameter",
                ))
            }
        };
        let value = query
            .get_string(required)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                Error::invalid_query(format!("Invalid link: missing {required} parameter"))
            })?;

        let language = query
            .get_string(LANGUAGE_KEY)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let mut params = RequestParameters::new();
        params.set(VIEW_OP, view_op);
        params.set(required, value);
        params.set_language(language);
        self.start(params).await
    }

    /// Follow the forward cursor of the current page
    pub async fn next_page(&mut self) -> Result<&SearchResultPage> {
        let cursor = self
            .results
            .pagination
            .forward_cursor
            .clone()
            .ok_or_else(|| Error::NoSuchPage("Last page".to_string()))?;
        self.navigate(FORWARD_CURSOR_KEY, BACKWARD_CURSOR_KEY, cursor)
            .await
    }

    /// Follow the backward cursor of the current page
    pub async fn previous_page(&mut self) -> Result<&SearchResultPage> {
        let cursor = self
            .results
            .pagination
            .backward_cursor
            .clone()
            .ok_or_else(|| Error::NoSuchPage("First page".to_string()))?;
        self.navigate(BACKWARD_CURSOR_KEY, FORWARD_CURSOR_KEY, cursor)
            .await
    }

    /// Last committed page; empty before the first successful fetch
    #[must_use]
    pub const fn current_results(&self) -> &SearchResultPage {
        &self.results
    }

    /// Cursor of the page after the current one
    #[must_use]
    pub fn after_author(&self) -> Option<&Cursor> {
        self.results.pagination.forward_cursor.as_ref()
    }

    /// Cursor of the page before the current one
    #[must_use]
    pub fn before_author(&self) -> Option<&Cursor> {
        self.results.pagination.backward_cursor.as_ref()
    }

    #[must_use]
    pub const fn params(&self) -> &RequestParameters {
        self.session.params()
    }

    #[must_use]
    pub fn language(&self) -> String {
        self.session.params().language()
    }

    /// Language for subsequent page requests of the current search
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.session.params_mut().set_language(language);
    }

    #[must_use]
    pub fn last_document(&self) -> Option<&str> {
        self.session.last_document()
    }

    async fn start(&mut self, params: RequestParameters) -> Result<&SearchResultPage> {
        info!("Starting profile search with {:?}", params);
        self.results = SearchResultPage::default();
        self.session
            .params_mut()
            .replace_all(params.iter().map(|(k, v)| (k.to_string(), Some(v.clone()))));
        self.reload().await
    }

    async fn navigate(
        &mut self,
        key: &str,
        opposite: &str,
        cursor: Cursor,
    ) -> Result<&SearchResultPage> {
        debug!("Navigating with {}={}", key, cursor);
        let snapshot = self.session.params().clone();
        self.session.params_mut().merge([
            (key, Some(ParamValue::from(cursor.as_str()))),
            (opposite, None),
        ]);

        if let Err(error) = self.load_page().await {
            *self.session.params_mut() = snapshot;
            return Err(error);
        }
        Ok(&self.results)
    }

    async fn reload(&mut self) -> Result<&SearchResultPage> {
        self.load_page().await?;
        Ok(&self.results)
    }

    async fn load_page(&mut self) -> Result<()> {
        let body = self.session.load().await?;
        let page = parse_profile_search(&body, self.session.base());
        debug!(
            "Profile page: {} profiles, next: {}, previous: {}",
            page.profiles.len(),
            page.pagination.has_next(),
            page.pagination.has_previous()
        );
        self.results = page;
        self.session.mark_ready();
        Ok(())
    }
}

#[async_trait]
impl Retriever for ProfileSearch {
    fn name(&self) -> &'static str {
        "profiles"
    }

    /// Re-fetch the page described by the current parameters
    async fn fetch(&mut self) -> Result<RetrievalRecord> {
        if !self.session.params().contains(VIEW_OP) {
            return Err(Error::invalid_query("no search has been started"));
        }
        self.load_page().await?;
        Ok(self.as_record())
    }

    fn as_record(&self) -> RetrievalRecord {
        RetrievalRecord::Profiles(self.results.clone())
    }

    fn state(&self) -> &RetrievalState {
        self.session.state()
    }
}
