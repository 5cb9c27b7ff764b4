//! Row-level helpers for already-loaded taxonomy data.
//!
//! Retrieval of the taxonomy (spreadsheet download, file paths) is the
//! caller's concern; the index only needs a sequence of rows.

use tracing::warn;

use crate::types::{Category, Code, Title};

/// One raw (title, code) row from the reference taxonomy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaxonomyRow {
    /// Canonical occupation title.
    pub title: Title,
    /// Standardized occupation code.
    pub code: Code,
    /// Optional category metadata carried along from the source.
    pub category: Option<Category>,
}

impl TaxonomyRow {
    /// Convenience constructor for rows without category metadata.
    pub fn new<T: Into<Title>, C: Into<Code>>(title: T, code: C) -> Self {
        Self {
            title: title.into(),
            code: code.into(),
            category: None,
        }
    }
}

/// Parse delimited text into taxonomy rows.
///
/// Lines are split on tabs when present, semicolons otherwise. The first line
/// is skipped when `skip_header` is set. Lines with fewer than two fields are
/// skipped with a warning rather than failing the whole parse.
pub fn parse_taxonomy_rows(input: &str, skip_header: bool) -> Vec<TaxonomyRow> {
    let mut rows = Vec::new();
    for (line_no, line) in input.lines().enumerate() {
        if skip_header && line_no == 0 {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let delimiter = if trimmed.contains('\t') { '\t' } else { ';' };
        let mut fields = trimmed.split(delimiter).map(str::trim);
        let (title, code) = match (fields.next(), fields.next()) {
            (Some(title), Some(code)) if !title.is_empty() && !code.is_empty() => (title, code),
            _ => {
                warn!(line = line_no + 1, "skipping malformed taxonomy row");
                continue;
            }
        };
        let category = fields.next().filter(|field| !field.is_empty());
        rows.push(TaxonomyRow {
            title: title.to_string(),
            code: code.to_string(),
            category: category.map(str::to_string),
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_rows_with_category() {
        let rows = parse_taxonomy_rows("Bürokauffrau;71402;B 71402-100\nAbschleifer;24222\n", false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Bürokauffrau");
        assert_eq!(rows[0].code, "71402");
        assert_eq!(rows[0].category.as_deref(), Some("B 71402-100"));
        assert_eq!(rows[1].category, None);
    }

    #[test]
    fn skips_header_and_malformed_lines() {
        let input = "Titel;Code\nBürokauffrau;71402\nnur-ein-feld\n;\n";
        let rows = parse_taxonomy_rows(input, true);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "71402");
    }

    #[test]
    fn prefers_tab_delimiter_when_present() {
        let rows = parse_taxonomy_rows("Maschinenbauingenieur\t25104\n", false);
        assert_eq!(rows[0].title, "Maschinenbauingenieur");
        assert_eq!(rows[0].code, "25104");
    }
}
