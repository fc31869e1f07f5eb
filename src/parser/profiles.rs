use super::{
    absolutize, attr, find, find_all, interest, navigation_target, non_empty_text, parse_count,
    query_param, text,
};
use crate::models::{Cursor, Pagination, ProfileRecord, SearchResultPage};
use crate::{Error, Result};
use scraper::{ElementRef, Html};
use tracing::{debug, warn};
use url::Url;

pub const FORWARD_CURSOR_KEY: &str = "after_author";
pub const BACKWARD_CURSOR_KEY: &str = "before_author";

const PAGINATION: &str = "div#gsc_authors_bottom_pag";

/// Extract one page of profile search results with its navigation cursors
pub fn try_parse_profile_search(html: &str, base: &Url) -> Result<SearchResultPage> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let results = find(root, "#gsc_sa_ccl");
    let entries = find_all(results.unwrap_or(root), "div.gs_ai");
    let pagination = find(root, PAGINATION);

    if results.is_none() && entries.is_empty() && pagination.is_none() {
        return Err(Error::unrecognized("profile search results"));
    }

    let profiles: Vec<ProfileRecord> = entries
        .into_iter()
        .filter_map(|entry| parse_profile(entry, base))
        .collect();
    debug!("Extracted {} profiles", profiles.len());

    Ok(SearchResultPage {
        profiles,
        pagination: pagination
            .map(|p| parse_pagination(p, base))
            .unwrap_or_default(),
    })
}

pub fn parse_profile_search(html: &str, base: &Url) -> SearchResultPage {
    try_parse_profile_search(html, base).unwrap_or_else(|e| {
        warn!("Profile search page not recognized: {}", e);
        SearchResultPage::default()
    })
}

fn parse_profile(entry: ElementRef<'_>, base: &Url) -> Option<ProfileRecord> {
    let heading = find(entry, "h3.gs_ai_name");
    let Some(name) = heading.and_then(non_empty_text) else {
        debug!("Skipping profile entry without a name");
        return None;
    };

    let link = heading
        .and_then(|h| find(h, "a[href]"))
        .and_then(|a| attr(a, "href"))
        .map(|href| absolutize(base, &href));

    let cited_by_count = find(entry, "div.gs_ai_cby").map_or(0, |div| {
        parse_count(text(div).split_whitespace().last().unwrap_or_default())
    });

    let interests = find(entry, "div.gs_ai_int")
        .map(|div| {
            find_all(div, "a.gs_ai_one_int")
                .into_iter()
                .filter_map(|a| interest(a, base))
                .collect()
        })
        .unwrap_or_default();

    Some(ProfileRecord {
        author_id: link.as_deref().and_then(|l| query_param(l, "user")),
        name,
        link,
        affiliations: find(entry, "div.gs_ai_aff").and_then(non_empty_text),
        email: find(entry, "div.gs_ai_eml").and_then(non_empty_text),
        cited_by_count,
        interests,
        thumbnail_url: find(entry, "img[src]")
            .and_then(|img| attr(img, "src"))
            .map(|src| absolutize(base, &src)),
    })
}

fn parse_pagination(container: ElementRef<'_>, base: &Url) -> Pagination {
    let target = |css: &str| {
        find(container, css)
            .and_then(|button| attr(button, "onclick"))
            .and_then(|onclick| navigation_target(&onclick))
            .map(|target| absolutize(base, &target))
    };

    let next_link = target("button.gsc_pgn_pnx");
    let prev_link = target("button.gsc_pgn_ppr");

    Pagination {
        forward_cursor: next_link
            .as_deref()
            .and_then(|l| query_param(l, FORWARD_CURSOR_KEY))
            .map(Cursor::new),
        backward_cursor: prev_link
            .as_deref()
            .and_then(|l| query_param(l, BACKWARD_CURSOR_KEY))
            .map(Cursor::new),
        next_link,
        prev_link,
    }
}
