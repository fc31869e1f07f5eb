use super::{require_author_id, RetrievalRecord, RetrievalState, Retriever, Session};
use crate::client::{Fetcher, ParamValue, RequestParameters};
use crate::config::MAX_ARTICLE_PAGE_SIZE;
use crate::models::ArticleRecord;
use crate::parser::parse_article_page;
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

/// Server-side ordering of an author's publication list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ArticlesOrder {
    /// Most cited first
    #[default]
    #[serde(rename = "cited")]
    CitedBy,
    #[serde(rename = "title")]
    Title,
    /// Newest first
    #[serde(rename = "pubdate")]
    PublicationDate,
}

impl ArticlesOrder {
    /// Value of the `sortby` request parameter
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CitedBy => "cited",
            Self::Title => "title",
            Self::PublicationDate => "pubdate",
        }
    }
}

impl fmt::Display for ArticlesOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticlesOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cited" | "cited_by" | "citations" => Ok(Self::CitedBy),
            "title" => Ok(Self::Title),
            "pubdate" | "date" | "year" => Ok(Self::PublicationDate),
            other => Err(Error::invalid_query(format!(
                "unknown article order '{other}' (expected cited, title or pubdate)"
            ))),
        }
    }
}

/// Arguments of the last collection, reused by [`Retriever::fetch`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Collection {
    sort_by: ArticlesOrder,
    start: usize,
    num: Option<usize>,
}

/// Publication list of one author, collected across fixed-size pages
#[derive(Debug, Clone)]
pub struct AuthorArticlesRetriever {
    session: Session,
    page_size: usize,
    last: Collection,
    articles: Vec<ArticleRecord>,
}

impl AuthorArticlesRetriever {
    pub fn new(fetcher: Fetcher, author_id: &str, hl: Option<&str>) -> Result<Self> {
        let author_id = require_author_id(author_id)?;
        let mut session = Session::new(fetcher);
        session.params_mut().set("user", author_id);
        if let Some(hl) = hl {
            session.params_mut().set_language(hl);
        }

        let page_size = MAX_ARTICLE_PAGE_SIZE as usize;
        session.params_mut().set("pagesize", page_size);

        Ok(Self {
            session,
            page_size,
            last: Collection::default(),
            articles: Vec::new(),
        })
    }

    /// Arguments used by [`Retriever::fetch`] until the next explicit collection
    #[must_use]
    pub fn with_collection(
        mut self,
        sort_by: ArticlesOrder,
        start: usize,
        num: Option<usize>,
    ) -> Self {
        self.last = Collection {
            sort_by,
            start,
            num,
        };
        self
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Entries requested per page, between 1 and 100
    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 || page_size > MAX_ARTICLE_PAGE_SIZE as usize {
            return Err(Error::invalid_query(format!(
                "page size must be between 1 and {MAX_ARTICLE_PAGE_SIZE}, got {page_size}"
            )));
        }
        self.page_size = page_size;
        self.session.params_mut().set("pagesize", page_size);
        Ok(())
    }

    /// Collect articles from offset `start`, ordered by `sort_by`.
    ///
    /// Pages are fetched until one comes back short or `num` records are gathered
    /// (`None` collects everything). The result is truncated to exactly `num`.
    ///
    /// When a later page fails, the pages gathered so far become the committed result
    /// and the error is returned; a failure on the first page keeps the previous result.
    #[instrument(skip(self))]
    pub async fn fetch_articles(
        &mut self,
        sort_by: ArticlesOrder,
        start: usize,
        num: Option<usize>,
    ) -> Result<&[ArticleRecord]> {
        self.last = Collection {
            sort_by,
            start,
            num,
        };

        let mut collected: Vec<ArticleRecord> = Vec::new();
        let mut cstart = start;
        let mut pages = 0usize;

        while num.map_or(true, |n| collected.len() < n) {
            self.session.params_mut().merge([
                ("cstart", Some(ParamValue::from(cstart))),
                ("pagesize", Some(ParamValue::from(self.page_size))),
                ("sortby", Some(ParamValue::from(sort_by.as_str()))),
            ]);

            let body = match self.session.load().await {
                Ok(body) => body,
                Err(error) => {
                    if pages > 0 {
                        warn!(
                            "Article collection stopped after {} page(s), keeping {} records",
                            pages,
                            collected.len()
                        );
                        self.articles = collected;
                    }
                    return Err(error);
                }
            };

            let page = parse_article_page(&body, self.session.base());
            pages += 1;
            debug!(
                "Article page {} at offset {}: {} rows, {} records",
                pages,
                cstart,
                page.rows,
                page.articles.len()
            );

            let end_of_data = page.rows < self.page_size;
            collected.extend(page.articles);
            if end_of_data {
                break;
            }
            cstart += self.page_size;
        }

        if let Some(n) = num {
            collected.truncate(n);
        }
        info!(
            "Collected {} articles in {} page(s)",
            collected.len(),
            pages
        );

        self.articles = collected;
        self.session.mark_ready();
        Ok(&self.articles)
    }

    #[must_use]
    pub fn articles(&self) -> &[ArticleRecord] {
        &self.articles
    }

    #[must_use]
    pub const fn params(&self) -> &RequestParameters {
        self.session.params()
    }

    #[must_use]
    pub fn language(&self) -> String {
        self.session.params().language()
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.session.params_mut().set_language(language);
    }

    #[must_use]
    pub fn last_document(&self) -> Option<&str> {
        self.session.last_document()
    }
}

#[async_trait]
impl Retriever for AuthorArticlesRetriever {
    fn name(&self) -> &'static str {
        "publications"
    }

    /// Repeat the last collection, or collect everything by citation count
    async fn fetch(&mut self) -> Result<RetrievalRecord> {
        let Collection {
            sort_by,
            start,
            num,
        } = self.last;
        self.fetch_articles(sort_by, start, num).await?;
        Ok(self.as_record())
    }

    fn as_record(&self) -> RetrievalRecord {
        RetrievalRecord::Publications(self.articles.clone())
    }

    fn state(&self) -> &RetrievalState {
        self.session.state()
    }
}
