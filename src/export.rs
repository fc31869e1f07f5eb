//! Output views of retrieved records: `;`-delimited CSV for publication lists and JSON
//! documents for everything else.

use crate::models::ArticleRecord;
use crate::retriever::RetrievalRecord;
use crate::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// One CSV row; field names form the header
#[derive(Serialize)]
struct ArticleRow<'a> {
    title: &'a str,
    link: &'a str,
    citation_id: &'a str,
    authors: &'a str,
    publications: &'a str,
    cited_by: u64,
    year: &'a str,
}

impl<'a> From<&'a ArticleRecord> for ArticleRow<'a> {
    fn from(article: &'a ArticleRecord) -> Self {
        Self {
            title: &article.title,
            link: &article.link,
            citation_id: article.citation_id.as_deref().unwrap_or_default(),
            authors: &article.authors,
            publications: &article.publication,
            cited_by: article.cited_by.count,
            year: &article.year,
        }
    }
}

/// Write `articles` as CSV with a header row, `;` delimited
pub fn write_articles_csv<W: Write>(writer: W, articles: &[ArticleRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(writer);

    if articles.is_empty() {
        // serialize() emits the header only alongside the first row
        wtr.write_record([
            "title",
            "link",
            "citation_id",
            "authors",
            "publications",
            "cited_by",
            "year",
        ])?;
    }
    for article in articles {
        wtr.serialize(ArticleRow::from(article))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the article list to a CSV file at `path`
pub fn export_articles_csv(path: &Path, articles: &[ArticleRecord]) -> Result<()> {
    let file = File::create(path)?;
    write_articles_csv(BufWriter::new(file), articles)?;
    info!("Saved {} articles to {}", articles.len(), path.display());
    Ok(())
}

/// Write the merged JSON document of `records`, pretty-printed
pub fn write_json<'a, W: Write>(
    mut writer: W,
    records: impl IntoIterator<Item = &'a RetrievalRecord>,
) -> Result<()> {
    let document = RetrievalRecord::merge_json(records)?;
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writeln!(writer)?;
    Ok(())
}

/// Save the merged JSON document of `records` at `path`
pub fn export_json<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a RetrievalRecord>,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_json(&mut writer, records)?;
    writer.flush()?;
    info!("Saved JSON document to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CitedBy;

    fn article(title: &str, count: u64, year: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            link: "https://scholar.google.com/citations?citation_for_view=u:1".to_string(),
            citation_id: Some("u:1".to_string()),
            authors: "A Lovelace, C Babbage".to_string(),
            publication: "Notes, 1843".to_string(),
            cited_by: CitedBy {
                count,
                link: None,
                cites_id: None,
            },
            year: year.to_string(),
        }
    }

    #[test]
    fn test_csv_layout() {
        let mut buffer = Vec::new();
        write_articles_csv(&mut buffer, &[article("Sketch of the Analytical Engine", 57, "1843")])
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "title;link;citation_id;authors;publications;cited_by;year");
        assert_eq!(
            lines[1],
            "Sketch of the Analytical Engine;https://scholar.google.com/citations?citation_for_view=u:1;u:1;A Lovelace, C Babbage;Notes, 1843;57;1843"
        );
    }

    #[test]
    fn test_csv_quotes_delimiter_in_fields() {
        let mut buffer = Vec::new();
        write_articles_csv(&mut buffer, &[article("Part A; Part B", 0, "")]).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.lines().nth(1).unwrap().starts_with("\"Part A; Part B\";"));
        assert!(output.lines().nth(1).unwrap().ends_with(";0;"));
    }

    #[test]
    fn test_csv_header_only_when_empty() {
        let mut buffer = Vec::new();
        write_articles_csv(&mut buffer, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "title;link;citation_id;authors;publications;cited_by;year\n"
        );
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("articles.csv");
        let json_path = dir.path().join("author.json");

        let articles = vec![article("One", 1, "2001"), article("Two", 2, "2002")];
        export_articles_csv(&csv_path, &articles).unwrap();
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap().lines().count(), 3);

        let records = [RetrievalRecord::Publications(articles)];
        export_json(&json_path, &records).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["publications"][1]["title"], "Two");
    }
}
