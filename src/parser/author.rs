use super::{
    absolutize, attr, find, find_all, interest, non_empty_text, normalize_label, parse_count, text,
};
use crate::models::{
    AuthorInfo, AuthorRecord, CitationMetrics, Interest, MetricValue, PublicAccess, YearlyCitations,
};
use crate::{Error, Result};
use scraper::{ElementRef, Html};
use tracing::{debug, warn};
use url::Url;

const HEADER: &str = "div#gsc_prf";
const METRICS: &str = "#gsc_rsb_cit";
const PUBLIC_ACCESS: &str = "#gsc_rsb_mnd";

/// Extract header, metrics and public-access summary of an author page.
///
/// The three sections are located independently; the page is rejected only when none
/// of them is present.
pub fn try_parse_author_info(html: &str, base: &Url) -> Result<AuthorInfo> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let header = find(root, HEADER);
    let metrics = find(root, METRICS);
    let public_access = find(root, PUBLIC_ACCESS);

    if header.is_none() && metrics.is_none() && public_access.is_none() {
        return Err(Error::unrecognized("author profile container"));
    }

    let mut cited_by = CitationMetrics::default();
    if let Some(metrics) = metrics {
        parse_metrics_table(metrics, &mut cited_by);
    }
    // the histogram lives outside the metrics box in some layouts
    cited_by.graph = parse_graph(root);

    Ok(AuthorInfo {
        author: header.map(|h| parse_header(h, base)).unwrap_or_default(),
        cited_by,
        public_access: public_access
            .map(|p| parse_public_access(p, base))
            .unwrap_or_default(),
    })
}

/// Lenient form of [`try_parse_author_info`]: an unrecognized page yields an empty record
pub fn parse_author_info(html: &str, base: &Url) -> AuthorInfo {
    try_parse_author_info(html, base).unwrap_or_else(|e| {
        warn!("Author page not recognized: {}", e);
        AuthorInfo::default()
    })
}

fn parse_header(header: ElementRef<'_>, base: &Url) -> AuthorRecord {
    let interests: Vec<Interest> = find_all(header, "a.gsc_prf_inta")
        .into_iter()
        .filter_map(|a| interest(a, base))
        .collect();

    // info lines that are not the interests line: affiliation, then email/homepage
    let info_lines: Vec<ElementRef<'_>> = find_all(header, "div.gsc_prf_il")
        .into_iter()
        .filter(|line| line.value().id() != Some("gsc_prf_int"))
        .filter(|line| find(*line, "a.gsc_prf_inta").is_none())
        .collect();

    let email_line = find(header, "div#gsc_prf_ivh").or_else(|| {
        info_lines
            .get(1)
            .copied()
            .filter(|line| line.value().id() != Some("gsc_prf_ivh"))
    });
    let affiliation = info_lines
        .iter()
        .find(|line| line.value().id() != Some("gsc_prf_ivh"))
        .and_then(|line| non_empty_text(*line));

    let email = email_line.and_then(|line| {
        let raw = text(line);
        let email = raw.split('-').next().unwrap_or_default().trim().to_string();
        Some(email).filter(|e| !e.is_empty())
    });
    let website = email_line
        .and_then(|line| find(line, "a[href]"))
        .and_then(|a| attr(a, "href"))
        .map(|href| absolutize(base, &href));

    let thumbnail_url = find(header, "img[src]")
        .and_then(|img| attr(img, "src"))
        .map(|src| absolutize(base, &src));

    AuthorRecord {
        name: find(header, "#gsc_prf_in").and_then(non_empty_text),
        thumbnail_url,
        affiliation,
        email,
        website,
        interests,
    }
}

fn parse_metrics_table(container: ElementRef<'_>, metrics: &mut CitationMetrics) {
    let Some(table) = find(container, "table#gsc_rsb_st") else {
        debug!("Citation table not found");
        return;
    };

    metrics.recent_period_label = find_all(table, "thead th")
        .get(2)
        .and_then(|th| non_empty_text(*th))
        .map(|label| normalize_label(&label));

    for row in find_all(table, "tbody tr") {
        let cells = find_all(row, "td");
        let Some(name) = cells.first().and_then(|c| non_empty_text(*c)) else {
            continue;
        };
        let value = |i: usize| cells.get(i).map_or(0, |c| parse_count(&text(*c)));
        metrics.table.insert(
            normalize_label(&name),
            MetricValue {
                all_time_value: value(1),
                recent_period_value: value(2),
            },
        );
    }
}

fn parse_graph(root: ElementRef<'_>) -> Vec<YearlyCitations> {
    let Some(graph) = find(root, "div.gsc_md_hist_w") else {
        return Vec::new();
    };

    let years = find_all(graph, "span.gsc_g_t");
    let counts = find_all(graph, "a.gsc_g_a");

    let parsed: Option<Vec<YearlyCitations>> = years
        .iter()
        .zip(counts.iter())
        .map(|(year, count)| {
            Some(YearlyCitations {
                year: text(*year).parse().ok()?,
                citations: text(*count).replace(',', "").parse().ok()?,
            })
        })
        .collect();

    parsed.unwrap_or_else(|| {
        debug!("Citation graph contains non-numeric values, discarding");
        Vec::new()
    })
}

fn parse_public_access(container: ElementRef<'_>, base: &Url) -> PublicAccess {
    let first_word = |css: &str| {
        find(container, css).map_or(0, |div| {
            parse_count(text(div).split_whitespace().next().unwrap_or_default())
        })
    };

    PublicAccess {
        link: find(container, "a[href]")
            .and_then(|a| attr(a, "href"))
            .map(|href| absolutize(base, &href)),
        available_count: first_word("div.gsc_rsb_m_a"),
        unavailable_count: first_word("div.gsc_rsb_m_na"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://scholar.google.com").unwrap()
    }

    const FULL_PAGE: &str = r#"
        <html><body>
        <div id="gsc_prf">
          <div id="gsc_prf_pua"><img src="/citations/images/avatar.png"></div>
          <div id="gsc_prf_i">
            <div id="gsc_prf_in">Grace Hopper</div>
            <div class="gsc_prf_il">Yale University</div>
            <div class="gsc_prf_il" id="gsc_prf_ivh">Verified email at yale.edu - <a href="https://hopper.example.org" class="gsc_prf_ila">Homepage</a></div>
            <div class="gsc_prf_il" id="gsc_prf_int">
              <a href="/citations?view_op=search_authors&mauthors=label:compilers" class="gsc_prf_inta">Compilers</a>
              <a href="/citations?view_op=search_authors&mauthors=label:cobol" class="gsc_prf_inta">COBOL</a>
            </div>
          </div>
        </div>
        <div id="gsc_rsb_cit">
          <table id="gsc_rsb_st">
            <thead><tr><th></th><th>All</th><th>Since 2019</th></tr></thead>
            <tbody>
              <tr><td>Citations</td><td>12,345</td><td>4,321</td></tr>
              <tr><td>h-index</td><td>42</td><td>20</td></tr>
              <tr><td>i10-index</td><td>80</td><td>n/a</td></tr>
            </tbody>
          </table>
          <div class="gsc_md_hist_w">
            <span class="gsc_g_t">2021</span><span class="gsc_g_t">2022</span>
            <a class="gsc_g_a"><span>100</span></a><a class="gsc_g_a"><span>1,200</span></a>
          </div>
        </div>
        <div id="gsc_rsb_mnd">
          <a href="/citations?view_op=list_mandates&user=abc">View all</a>
          <div class="gsc_rsb_m_a">7 articles</div>
          <div class="gsc_rsb_m_na">2 articles</div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_full_author_page() {
        let info = try_parse_author_info(FULL_PAGE, &base()).unwrap();

        assert_eq!(info.author.name.as_deref(), Some("Grace Hopper"));
        assert_eq!(info.author.affiliation.as_deref(), Some("Yale University"));
        assert_eq!(info.author.email.as_deref(), Some("Verified email at yale.edu"));
        assert_eq!(
            info.author.website.as_deref(),
            Some("https://hopper.example.org")
        );
        assert_eq!(
            info.author.thumbnail_url.as_deref(),
            Some("https://scholar.google.com/citations/images/avatar.png")
        );
        assert_eq!(info.author.interests.len(), 2);
        assert_eq!(info.author.interests[0].title, "Compilers");
        assert!(info.author.interests[0]
            .link
            .starts_with("https://scholar.google.com/citations?"));

        let metrics = &info.cited_by;
        assert_eq!(metrics.recent_period_label.as_deref(), Some("since_2019"));
        assert_eq!(
            metrics.table["citations"],
            MetricValue {
                all_time_value: 12345,
                recent_period_value: 4321
            }
        );
        assert_eq!(metrics.table["h_index"].all_time_value, 42);
        assert_eq!(metrics.table["i10_index"].recent_period_value, 0);
        assert_eq!(
            metrics.graph,
            vec![
                YearlyCitations { year: 2021, citations: 100 },
                YearlyCitations { year: 2022, citations: 1200 },
            ]
        );

        assert_eq!(info.public_access.available_count, 7);
        assert_eq!(info.public_access.unavailable_count, 2);
        assert!(info.public_access.link.unwrap().contains("list_mandates"));
    }

    #[test]
    fn test_missing_email_and_single_interest() {
        let html = r#"
            <div id="gsc_prf">
              <div id="gsc_prf_in">Ada</div>
              <div class="gsc_prf_il" id="gsc_prf_int">
                <a href="/citations?mauthors=label:computing" class="gsc_prf_inta">Computing</a>
              </div>
            </div>
        "#;
        let info = try_parse_author_info(html, &base()).unwrap();

        assert_eq!(info.author.name.as_deref(), Some("Ada"));
        assert_eq!(info.author.email, None);
        assert_eq!(info.author.affiliation, None);
        assert_eq!(
            info.author.interests,
            vec![Interest {
                title: "Computing".to_string(),
                link: "https://scholar.google.com/citations?mauthors=label:computing".to_string(),
            }]
        );
    }

    #[test]
    fn test_interest_without_link_is_kept() {
        let html = r#"
            <div id="gsc_prf">
              <div id="gsc_prf_in">Ada</div>
              <div class="gsc_prf_il" id="gsc_prf_int">
                <a class="gsc_prf_inta">Analytical Engines</a>
                <a href="/citations?mauthors=label:computing" class="gsc_prf_inta"> </a>
              </div>
            </div>
        "#;
        let info = try_parse_author_info(html, &base()).unwrap();

        assert_eq!(
            info.author.interests,
            vec![Interest {
                title: "Analytical Engines".to_string(),
                link: String::new(),
            }]
        );
    }

    #[test]
    fn test_graph_failure_does_not_block_table() {
        let html = r#"
            <div id="gsc_rsb_cit">
              <table id="gsc_rsb_st">
                <thead><tr><th></th><th>All</th><th>Since 2020</th></tr></thead>
                <tbody><tr><td>Citations</td><td>10</td><td>5</td></tr></tbody>
              </table>
              <div class="gsc_md_hist_w">
                <span class="gsc_g_t">2021</span><a class="gsc_g_a">lots</a>
              </div>
            </div>
        "#;
        let info = try_parse_author_info(html, &base()).unwrap();
        assert!(info.cited_by.graph.is_empty());
        assert_eq!(info.cited_by.table["citations"].all_time_value, 10);
        assert_eq!(info.author, AuthorRecord::default());
    }

    #[test]
    fn test_graph_without_table() {
        let html = r#"
            <div id="gsc_rsb_cit">
              <div class="gsc_md_hist_w">
                <span class="gsc_g_t">2023</span><a class="gsc_g_a">3</a>
              </div>
            </div>
        "#;
        let info = try_parse_author_info(html, &base()).unwrap();
        assert!(info.cited_by.table.is_empty());
        assert_eq!(info.cited_by.graph.len(), 1);
    }

    #[test]
    fn test_unrecognized_page() {
        let html = "<html><body><p>Please show you're not a robot</p></body></html>";
        assert!(matches!(
            try_parse_author_info(html, &base()),
            Err(Error::UnrecognizedPageShape { .. })
        ));
        assert_eq!(parse_author_info(html, &base()), AuthorInfo::default());
    }
}
