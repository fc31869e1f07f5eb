use super::{absolutize, attr, find, find_all, non_empty_text, parse_count, query_param, text};
use crate::models::{ArticleRecord, CitedBy};
use crate::{Error, Result};
use scraper::{ElementRef, Html};
use tracing::{debug, warn};
use url::Url;

/// One page of a publication list.
///
/// `rows` counts every publication row on the page, including rows that did not
/// yield a record, so callers can tell a full page from the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePage {
    pub rows: usize,
    pub articles: Vec<ArticleRecord>,
}

/// Extract one page of an author's publication list.
///
/// Page boundaries are driven by request parameters; the page itself carries no
/// pagination metadata.
pub fn try_parse_article_page(html: &str, base: &Url) -> Result<ArticlePage> {
    let document = Html::parse_document(html);
    let table = find(document.root_element(), "table#gsc_a_t")
        .ok_or_else(|| Error::unrecognized("article table"))?;

    // the "no articles" placeholder row is not a publication
    let rows: Vec<_> = find_all(table, "tr.gsc_a_tr")
        .into_iter()
        .filter(|row| find(*row, "td.gsc_a_e").is_none())
        .collect();

    Ok(ArticlePage {
        rows: rows.len(),
        articles: rows
            .into_iter()
            .filter_map(|row| parse_row(row, base))
            .collect(),
    })
}

pub fn parse_article_page(html: &str, base: &Url) -> ArticlePage {
    try_parse_article_page(html, base).unwrap_or_else(|e| {
        warn!("Article page not recognized: {}", e);
        ArticlePage::default()
    })
}

pub fn try_parse_articles(html: &str, base: &Url) -> Result<Vec<ArticleRecord>> {
    try_parse_article_page(html, base).map(|page| page.articles)
}

pub fn parse_articles(html: &str, base: &Url) -> Vec<ArticleRecord> {
    parse_article_page(html, base).articles
}

fn parse_row(row: ElementRef<'_>, base: &Url) -> Option<ArticleRecord> {
    let Some(title_link) = find(row, "td.gsc_a_t a") else {
        debug!("Skipping article row without title link");
        return None;
    };
    let title = non_empty_text(title_link)?;
    let link = attr(title_link, "href")
        .map(|href| absolutize(base, &href))
        .unwrap_or_default();

    let gray = find_all(row, "div.gs_gray");
    let gray_text = |i: usize| gray.get(i).map(|d| text(*d)).unwrap_or_default();

    let cited_by = find(row, "td.gsc_a_c a").map_or_else(CitedBy::default, |a| {
        let link = attr(a, "href").map(|href| absolutize(base, &href));
        CitedBy {
            count: parse_count(&text(a)),
            cites_id: link.as_deref().and_then(|l| query_param(l, "cites")),
            link,
        }
    });

    Some(ArticleRecord {
        citation_id: query_param(&link, "citation_for_view"),
        title,
        link,
        authors: gray_text(0),
        publication: gray_text(1),
        cited_by,
        year: find(row, "td.gsc_a_y").map(text).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://scholar.google.com").unwrap()
    }

    #[test]
    fn test_article_rows() {
        let html = r#"
            <table id="gsc_a_t"><tbody id="gsc_a_b">
              <tr class="gsc_a_tr">
                <td class="gsc_a_t">
                  <a href="/citations?view_op=view_citation&hl=en&user=u1&citation_for_view=u1:abc" class="gsc_a_at">On Computable Numbers</a>
                  <div class="gs_gray">AM Turing</div>
                  <div class="gs_gray">Proceedings of the London Mathematical Society, 1937</div>
                </td>
                <td class="gsc_a_c"><a href="https://scholar.google.com/scholar?oi=bibs&cites=987654" class="gsc_a_ac gs_ibl">1,024</a></td>
                <td class="gsc_a_y"><span class="gsc_a_h">1937</span></td>
              </tr>
              <tr class="gsc_a_tr">
                <td class="gsc_a_t">
                  <a href="/citations?view_op=view_citation&citation_for_view=u1:def">Unpublished note</a>
                </td>
                <td class="gsc_a_c"><a class="gsc_a_ac gs_ibl"></a></td>
                <td class="gsc_a_y"><span class="gsc_a_h"></span></td>
              </tr>
              <tr class="gsc_a_tr"><td class="gsc_a_e">There are no articles in this profile.</td></tr>
            </tbody></table>
        "#;

        let articles = try_parse_articles(html, &base()).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "On Computable Numbers");
        assert_eq!(first.citation_id.as_deref(), Some("u1:abc"));
        assert_eq!(first.authors, "AM Turing");
        assert!(first.publication.starts_with("Proceedings"));
        assert_eq!(first.cited_by.count, 1024);
        assert_eq!(first.cited_by.cites_id.as_deref(), Some("987654"));
        assert_eq!(first.year, "1937");

        let second = &articles[1];
        assert_eq!(second.authors, "");
        assert_eq!(second.publication, "");
        assert_eq!(second.cited_by.count, 0);
        assert_eq!(second.cited_by.link, None);
        assert_eq!(second.year, "");
    }

    #[test]
    fn test_row_count_includes_unlinked_rows() {
        let html = r#"
            <table id="gsc_a_t"><tbody>
              <tr class="gsc_a_tr"><td class="gsc_a_t"><a href="/citations?citation_for_view=u1:a">Linked</a></td></tr>
              <tr class="gsc_a_tr"><td class="gsc_a_t">Withdrawn entry</td></tr>
              <tr class="gsc_a_tr"><td class="gsc_a_e">There are no more articles.</td></tr>
            </tbody></table>
        "#;

        let page = try_parse_article_page(html, &base()).unwrap();
        assert_eq!(page.rows, 2);
        assert_eq!(page.articles.len(), 1);
        assert_eq!(page.articles[0].title, "Linked");
    }

    #[test]
    fn test_empty_table() {
        let html = r#"<table id="gsc_a_t"><tbody></tbody></table>"#;
        assert!(try_parse_articles(html, &base()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_table() {
        assert!(matches!(
            try_parse_articles("<p>blocked</p>", &base()),
            Err(Error::UnrecognizedPageShape { .. })
        ));
    }
}
