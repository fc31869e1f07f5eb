use super::{absolutize, attr, find, find_all, non_empty_text, query_param};
use crate::models::CoAuthorRecord;
use crate::{Error, Result};
use scraper::{ElementRef, Html};
use tracing::{debug, warn};
use url::Url;

/// Extract the co-author list of an author
pub fn try_parse_coauthors(html: &str, base: &Url) -> Result<Vec<CoAuthorRecord>> {
    let document = Html::parse_document(html);
    let container = find(document.root_element(), "div#gsc_codb_content")
        .ok_or_else(|| Error::unrecognized("co-author list container"))?;

    Ok(find_all(container, "div.gs_ai.gs_scl")
        .into_iter()
        .filter_map(|entry| parse_entry(entry, base))
        .collect())
}

pub fn parse_coauthors(html: &str, base: &Url) -> Vec<CoAuthorRecord> {
    try_parse_coauthors(html, base).unwrap_or_else(|e| {
        warn!("Co-author page not recognized: {}", e);
        Vec::new()
    })
}

fn parse_entry(entry: ElementRef<'_>, base: &Url) -> Option<CoAuthorRecord> {
    let name = find(entry, "h3.gs_ai_name").and_then(non_empty_text);
    let link = find(entry, "a[href]")
        .and_then(|a| attr(a, "href"))
        .map(|href| absolutize(base, &href));

    let (Some(name), Some(link)) = (name, link) else {
        debug!("Skipping co-author entry without name or link");
        return None;
    };

    Some(CoAuthorRecord {
        author_id: query_param(&link, "user"),
        affiliation: find(entry, "div.gs_ai_aff").and_then(non_empty_text),
        email: find(entry, "div.gs_ai_eml").and_then(non_empty_text),
        thumbnail_url: find(entry, "img[src]")
            .and_then(|img| attr(img, "src"))
            .map(|src| absolutize(base, &src)),
        name,
        link,
    })
}
