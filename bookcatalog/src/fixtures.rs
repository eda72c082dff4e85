use std::path::Path;

use anyhow::Context;

use crate::api::BookDetails;

fn fixture(
    id: &str,
    title: &str,
    author: &str,
    edition: &str,
    pages: &str,
    year: &str,
) -> BookDetails {
    BookDetails {
        id: id.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        edition: edition.to_string(),
        pages: pages.to_string(),
        year: year.to_string(),
    }
}

/// Books inserted on first start when no fixture file is configured.
/// Seeding matches on every field, so changing a value here inserts a second copy
/// on the next start. The first author is double encoded utf-8 as it is in already
/// seeded collections.
pub fn default_fixtures() -> Vec<BookDetails> {
    vec![
        fixture(
            "example1",
            "The Vortex",
            "Jos\u{c3}\u{a9} Eustasio Rivera",
            "958-30-0804-4",
            "292",
            "1924",
        ),
        fixture(
            "example2",
            "Frankenstein",
            "Mary Shelley",
            "978-3-649-64609-9",
            "280",
            "1818",
        ),
        fixture(
            "example3",
            "The Black Cat",
            "Edgar Allan Poe",
            "978-3-99168-238-7",
            "280",
            "1843",
        ),
    ]
}

/// Reads a json array of books in wire representation
pub fn load_fixtures(path: &Path) -> anyhow::Result<Vec<BookDetails>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixtures from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixtures from {}", path.display()))
}
