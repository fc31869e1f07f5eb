pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod parser;
pub mod retriever;

pub use client::{Fetcher, RateLimiter, RequestOptions, RequestOptionsProvider, RequestParameters};
pub use config::{Config, ConfigOverrides};
pub use error::{Error, ErrorCategory, Result};
pub use models::{
    ArticleRecord, AuthorInfo, AuthorRecord, CitationMetrics, CoAuthorRecord, Cursor, Pagination,
    ProfileRecord, SearchResultPage,
};
pub use retriever::{
    ArticlesOrder, AuthorArticlesRetriever, AuthorInfoRetriever, CoAuthorsRetriever,
    ProfileSearch, RetrievalRecord, RetrievalState, Retriever, SearchCriteria,
};
