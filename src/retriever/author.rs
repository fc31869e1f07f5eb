use super::{require_author_id, RetrievalRecord, RetrievalState, Retriever, Session};
use crate::client::{Fetcher, RequestParameters};
use crate::models::{AuthorInfo, CoAuthorRecord};
use crate::parser::{parse_author_info, parse_coauthors};
use crate::Result;
use async_trait::async_trait;
use tracing::{debug, instrument};

const USER: &str = "user";

fn author_session(fetcher: Fetcher, author_id: &str, hl: Option<&str>) -> Result<Session> {
    let author_id = require_author_id(author_id)?;
    let mut session = Session::new(fetcher);
    session.params_mut().set(USER, author_id);
    if let Some(hl) = hl {
        session.params_mut().set_language(hl);
    }
    Ok(session)
}

/// Header, citation metrics and public-access summary of one author
#[derive(Debug, Clone)]
pub struct AuthorInfoRetriever {
    session: Session,
    info: AuthorInfo,
}

impl AuthorInfoRetriever {
    /// Retriever for `author_id`; `hl` defaults to the configured language
    pub fn new(fetcher: Fetcher, author_id: &str, hl: Option<&str>) -> Result<Self> {
        Ok(Self {
            session: author_session(fetcher, author_id, hl)?,
            info: AuthorInfo::default(),
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_author_info(&mut self) -> Result<&AuthorInfo> {
        let body = self.session.load().await?;
        self.info = parse_author_info(&body, self.session.base());
        debug!(
            "Author info: {} metrics, {} graph points",
            self.info.cited_by.table.len(),
            self.info.cited_by.graph.len()
        );
        self.session.mark_ready();
        Ok(&self.info)
    }

    #[must_use]
    pub const fn author_info(&self) -> &AuthorInfo {
        &self.info
    }

    #[must_use]
    pub fn author_id(&self) -> Option<String> {
        self.session.params().get_string(USER)
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
impl Retriever for AuthorInfoRetriever {
    fn name(&self) -> &'static str {
        "author_info"
    }

    async fn fetch(&mut self) -> Result<RetrievalRecord> {
        self.fetch_author_info().await?;
        Ok(self.as_record())
    }

    fn as_record(&self) -> RetrievalRecord {
        RetrievalRecord::AuthorInfo(self.info.clone())
    }

    fn state(&self) -> &RetrievalState {
        self.session.state()
    }
}

/// Co-author list of one author
#[derive(Debug, Clone)]
pub struct CoAuthorsRetriever {
    session: Session,
    coauthors: Vec<CoAuthorRecord>,
}

impl CoAuthorsRetriever {
    pub fn new(fetcher: Fetcher, author_id: &str, hl: Option<&str>) -> Result<Self> {
        let mut session = author_session(fetcher, author_id, hl)?;
        session.params_mut().set("view_op", "list_colleagues");
        Ok(Self {
            session,
            coauthors: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_coauthors(&mut self) -> Result<&[CoAuthorRecord]> {
        let body = self.session.load().await?;
        self.coauthors = parse_coauthors(&body, self.session.base());
        debug!("Extracted {} co-authors", self.coauthors.len());
        self.session.mark_ready();
        Ok(&self.coauthors)
    }

    #[must_use]
    pub fn coauthors(&self) -> &[CoAuthorRecord] {
        &self.coauthors
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
impl Retriever for CoAuthorsRetriever {
    fn name(&self) -> &'static str {
        "coauthors"
    }

    async fn fetch(&mut self) -> Result<RetrievalRecord> {
        self.fetch_coauthors().await?;
        Ok(self.as_record())
    }

    fn as_record(&self) -> RetrievalRecord {
        RetrievalRecord::CoAuthors(self.coauthors.clone())
    }

    fn state(&self) -> &RetrievalState {
        self.session.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fetcher::testing::{fetcher, ScriptedTransport};
    use crate::Error;

    const AUTHOR_PAGE: &str = r#"
        <div id="gsc_prf"><div id="gsc_prf_in">Ada</div></div>
        <div id="gsc_rsb_cit">
          <table id="gsc_rsb_st">
            <thead><tr><th></th><th>All</th><th>Since 2020</th></tr></thead>
            <tbody><tr><td>Citations</td><td>100</td><td>40</td></tr></tbody>
          </table>
        </div>
    "#;

    const COAUTHORS_PAGE: &str = r#"
        <div id="gsc_codb_content">
          <div class="gs_ai gs_scl"><a href="/citations?user=c1"></a><h3 class="gs_ai_name">Charles</h3></div>
        </div>
    "#;

    #[test]
    fn test_empty_author_id_rejected() {
        let transport = ScriptedTransport::new();
        assert!(matches!(
            AuthorInfoRetriever::new(fetcher(transport.clone()), "", None),
            Err(Error::InvalidQuery(_))
        ));
        assert!(matches!(
            CoAuthorsRetriever::new(fetcher(transport), " ", None),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_author_info_request_and_result() {
        let transport = ScriptedTransport::new();
        transport.push_ok(AUTHOR_PAGE);
        let mut retriever =
            AuthorInfoRetriever::new(fetcher(transport.clone()), "ada001", Some("es")).unwrap();

        assert_eq!(retriever.state(), &RetrievalState::Uninitialized);
        let info = retriever.fetch_author_info().await.unwrap();
        assert_eq!(info.author.name.as_deref(), Some("Ada"));
        assert_eq!(info.cited_by.table["citations"].recent_period_value, 40);
        assert_eq!(retriever.state(), &RetrievalState::Ready);
        assert!(retriever.last_document().unwrap().contains("gsc_prf_in"));

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.get_string("user").unwrap(), "ada001");
        assert_eq!(request.language(), "es");
        assert!(!request.contains("view_op"));
    }

    #[tokio::test]
    async fn test_coauthors_request() {
        let transport = ScriptedTransport::new();
        transport.push_ok(COAUTHORS_PAGE);
        let mut retriever =
            CoAuthorsRetriever::new(fetcher(transport.clone()), "ada001", None).unwrap();

        let coauthors = retriever.fetch_coauthors().await.unwrap();
        assert_eq!(coauthors.len(), 1);
        assert_eq!(coauthors[0].author_id.as_deref(), Some("c1"));

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.get_string("view_op").unwrap(), "list_colleagues");
        assert_eq!(request.language(), "en");
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_result() {
        let transport = ScriptedTransport::new();
        transport.push_ok(AUTHOR_PAGE);
        let mut retriever =
            AuthorInfoRetriever::new(fetcher(transport.clone()), "ada001", None).unwrap();

        retriever.fetch_author_info().await.unwrap();
        let before = retriever.author_info().clone();

        let err = retriever.fetch_author_info().await.unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(retriever.state(), RetrievalState::Failed(_)));
        assert_eq!(retriever.author_info(), &before);
    }

    #[tokio::test]
    async fn test_polymorphic_fetch() {
        let transport = ScriptedTransport::new();
        transport.push_ok(AUTHOR_PAGE);
        transport.push_ok(COAUTHORS_PAGE);
        let fetcher = fetcher(transport);

        let mut retrievers: Vec<Box<dyn Retriever>> = vec![
            Box::new(AuthorInfoRetriever::new(fetcher.clone(), "ada001", None).unwrap()),
            Box::new(CoAuthorsRetriever::new(fetcher, "ada001", None).unwrap()),
        ];

        let mut names = Vec::new();
        for retriever in &mut retrievers {
            let record = retriever.fetch().await.unwrap();
            assert_eq!(record, retriever.as_record());
            names.push(retriever.name());
        }
        assert_eq!(names, ["author_info", "coauthors"]);
        assert!(matches!(retrievers[1].as_record(), RetrievalRecord::CoAuthors(c) if c.len() == 1));
    }
}
