//! # BibTeX Reader
//!
//! Parses BibTeX exports as produced by Scopus:
//!
//! ```text
//! @ARTICLE{Smith2001100,
//! author={Smith, J. and Doe, A.},
//! title={Citation structure},
//! year={2001},
//! note={cited By 12},
//! references={Doe, A., Foundations (1999) J. Appl. Phys., 3, pp. 1-5; ...},
//! }
//! ```
//!
//! Values may be braced, quoted or bare, and joined with `#`. `@comment`,
//! `@preamble` and `@string` blocks are skipped.

use super::{
    check_record_limit, clamp_field, find_doi, find_year, normalize_doi, parse_year, reference_keys,
};
use crate::primitives::{MAX_RECORDS, MAX_REFERENCES_PER_RECORD};
use crate::{FieldValue, PublicationRecord, RecordId, Reference, TreeError};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    /// Year in parentheses, as Scopus writes it inside references.
    static ref PAREN_YEAR: Regex =
        Regex::new(r"\((1[5-9]\d{2}|20\d{2})\)").expect("valid year pattern");

    /// `pp. 100-110` or `p. 7`.
    static ref PAGE_PATTERN: Regex =
        Regex::new(r"(?i)\bpp?\.\s*([A-Za-z]?\d+)").expect("valid page pattern");

    /// `cited By 12` in the Scopus `note` field.
    static ref CITED_BY: Regex =
        Regex::new(r"(?i)cited\s+by\s+(\d+)").expect("valid cited-by pattern");
}

/// Entry blocks that carry no publication.
const SKIPPED_ENTRIES: &[&str] = &["comment", "preamble", "string"];

/// Character cursor with line tracking.
struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos = self.pos.saturating_add(1);
        if c == '\n' {
            self.line = self.line.saturating_add(1);
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Whether an entry type and its opening `{` or `(` follow.
    fn at_entry_start(&self) -> bool {
        let rest = self.chars.get(self.pos..).unwrap_or_default();
        let name_len = rest
            .iter()
            .take_while(|c| c.is_alphanumeric() || **c == '_')
            .count();
        name_len > 0
            && rest[name_len..]
                .iter()
                .find(|c| !c.is_whitespace())
                .is_some_and(|c| matches!(*c, '{' | '('))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    /// Skip a block up to its matching `close`, honoring nested braces.
    fn skip_block(&mut self, close: char, start_line: usize) -> Result<(), TreeError> {
        let mut depth = 0usize;
        loop {
            match self.bump() {
                None => {
                    return Err(TreeError::malformed(start_line, "unbalanced braces in block"));
                }
                Some('{') => depth = depth.saturating_add(1),
                Some(c) if c == close && depth == 0 => return Ok(()),
                Some('}') => depth = depth.saturating_sub(1),
                Some(_) => {}
            }
        }
    }

    /// Braced value after its opening `{`. Inner braces are dropped.
    fn braced(&mut self) -> Result<String, TreeError> {
        let start_line = self.line;
        let mut depth = 1usize;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(TreeError::malformed(start_line, "unbalanced braces in field value"));
                }
                Some('{') => depth = depth.saturating_add(1),
                Some('}') => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(out);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Quoted value after its opening `"`.
    fn quoted(&mut self) -> Result<String, TreeError> {
        let start_line = self.line;
        let mut depth = 0usize;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(TreeError::malformed(start_line, "unterminated quoted field value"));
                }
                Some('"') if depth == 0 => return Ok(out),
                Some('{') => depth = depth.saturating_add(1),
                Some('}') => depth = depth.saturating_sub(1),
                Some('\\') => {
                    out.push('\\');
                    if let Some(c) = self.bump() {
                        out.push(c);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// A field value: one or more parts joined with `#`.
    fn value(&mut self) -> Result<String, TreeError> {
        let mut out = String::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('{') => {
                    self.bump();
                    out.push_str(&self.braced()?);
                }
                Some('"') => {
                    self.bump();
                    out.push_str(&self.quoted()?);
                }
                Some(c) if c.is_alphanumeric() => {
                    out.push_str(&self.take_while(|c| {
                        c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
                    }));
                }
                _ => return Err(TreeError::malformed(self.line, "expected a field value")),
            }
            self.skip_whitespace();
            if !self.eat('#') {
                return Ok(collapse_whitespace(&out));
            }
        }
    }
}

/// One `@type{key, ...}` block before interpretation.
struct RawEntry {
    entry_type: String,
    key: String,
    line: usize,
    fields: BTreeMap<String, String>,
}

/// Parse every entry of a BibTeX file.
///
/// Text between entries is comment text, including an `@` that does not
/// open an `@type{` block (an e-mail address in a header, say).
pub fn parse_records(text: &str) -> Result<Vec<PublicationRecord>, TreeError> {
    parse_records_within(text, MAX_RECORDS)
}

/// Parse at most `max_records` entries, failing at the first one past it.
fn parse_records_within(text: &str, max_records: usize) -> Result<Vec<PublicationRecord>, TreeError> {
    let mut cursor = Cursor::new(text);
    let mut records = Vec::new();

    while let Some(c) = cursor.bump() {
        if c != '@' || !cursor.at_entry_start() {
            continue;
        }
        if let Some(entry) = parse_entry(&mut cursor)? {
            check_record_limit(records.len().saturating_add(1), max_records, entry.line)?;
            records.push(build_record(entry)?);
        }
    }

    if records.is_empty() {
        return Err(TreeError::malformed(
            1,
            "no BibTeX entries found; expected @type{key, field = {value}, ...}",
        ));
    }
    Ok(records)
}

/// Parse one entry after its `@`. Skipped blocks yield `None`.
fn parse_entry(cursor: &mut Cursor) -> Result<Option<RawEntry>, TreeError> {
    let line = cursor.line;
    let entry_type = cursor
        .take_while(|c| c.is_alphanumeric() || c == '_')
        .to_lowercase();
    if entry_type.is_empty() {
        return Err(TreeError::malformed(line, "expected an entry type after @"));
    }

    cursor.skip_whitespace();
    let close = match cursor.bump() {
        Some('{') => '}',
        Some('(') => ')',
        _ => {
            return Err(TreeError::malformed(
                line,
                format!("expected {{ after @{}", entry_type),
            ));
        }
    };

    if SKIPPED_ENTRIES.contains(&entry_type.as_str()) {
        cursor.skip_block(close, line)?;
        return Ok(None);
    }

    cursor.skip_whitespace();
    let key = cursor.take_while(|c| c != ',' && c != close && !c.is_whitespace());
    if key.is_empty() {
        return Err(TreeError::malformed(
            line,
            format!("@{} entry has no citation key", entry_type),
        ));
    }

    let mut entry = RawEntry {
        entry_type,
        key,
        line,
        fields: BTreeMap::new(),
    };

    cursor.skip_whitespace();
    if cursor.eat(close) {
        return Ok(Some(entry));
    }
    if !cursor.eat(',') {
        return Err(TreeError::malformed(
            cursor.line,
            format!("expected ',' after citation key {}", entry.key),
        ));
    }

    loop {
        cursor.skip_whitespace();
        if cursor.eat(close) {
            return Ok(Some(entry));
        }
        if cursor.peek().is_none() {
            return Err(TreeError::malformed(
                entry.line,
                format!("entry {} is not closed", entry.key),
            ));
        }

        let name = cursor
            .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':'))
            .to_lowercase();
        if name.is_empty() {
            return Err(TreeError::malformed(cursor.line, "expected a field name"));
        }
        cursor.skip_whitespace();
        if !cursor.eat('=') {
            return Err(TreeError::malformed(
                cursor.line,
                format!("expected '=' after field name {}", name),
            ));
        }
        let value = cursor.value()?;
        entry.fields.insert(name, clamp_field(&value));

        cursor.skip_whitespace();
        if cursor.eat(',') {
            continue;
        }
        if cursor.eat(close) {
            return Ok(Some(entry));
        }
        if cursor.peek().is_none() {
            return Err(TreeError::malformed(
                entry.line,
                format!("unbalanced braces: entry {} is not closed", entry.key),
            ));
        }
        return Err(TreeError::malformed(
            cursor.line,
            format!("expected ',' or end of entry {}", entry.key),
        ));
    }
}

/// Interpret the fields of one entry.
fn build_record(mut entry: RawEntry) -> Result<PublicationRecord, TreeError> {
    let title = entry
        .fields
        .remove("title")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            TreeError::malformed(entry.line, format!("entry {} has no title", entry.key))
        })?;

    let mut record = PublicationRecord::new(RecordId::new(entry.key.clone()), title);
    let fields = &mut entry.fields;

    record.authors = fields
        .remove("author")
        .map(|a| {
            a.split(" and ")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    record.year = fields.remove("year").and_then(|y| parse_year(&y));
    record.venue = fields
        .remove("journal")
        .or_else(|| fields.remove("booktitle"));
    record.ids.doi = fields
        .remove("doi")
        .map(|d| normalize_doi(&d))
        .filter(|d| !d.is_empty());
    record.ids.pmid = fields.remove("pmid").or_else(|| fields.remove("pubmed_id"));
    record.ids.arxiv_id = fields.remove("eprint").or_else(|| fields.remove("arxiv"));
    record.ids.url = fields.remove("url");
    record.volume = fields.remove("volume");
    record.first_page = fields.get("pages").and_then(|p| {
        p.split(['-', '–'])
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    });

    if let Some(note) = fields.remove("note") {
        match cited_by(&note) {
            Some(count) => record.times_cited = count,
            None => {
                fields.insert("note".to_string(), note);
            }
        }
    }

    record.references = fields
        .remove("references")
        .map(|refs| {
            refs.split("; ")
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .take(MAX_REFERENCES_PER_RECORD)
                .map(parse_reference)
                .collect()
        })
        .unwrap_or_default();

    record.fields = std::mem::take(fields)
        .into_iter()
        .map(|(name, value)| (name, FieldValue::from_raw(&value)))
        .collect();
    record
        .fields
        .insert("entry_type".to_string(), FieldValue::Text(entry.entry_type));
    Ok(record)
}

/// `cited By 12` -> 12.
fn cited_by(note: &str) -> Option<u64> {
    CITED_BY.captures(note)?.get(1)?.as_str().parse().ok()
}

/// Parse one Scopus reference:
/// `Doe, A., Roe, B., Title (1999) Journal, 3, pp. 1-5`.
fn parse_reference(raw: &str) -> Reference {
    let author = raw
        .split_once(',')
        .map(|(first, _)| first.trim())
        .filter(|a| !a.is_empty() && !a.contains('('));

    let paren_year = PAREN_YEAR.captures(raw).and_then(|c| c.get(0));
    let year = paren_year
        .and_then(|m| m.as_str().trim_matches(['(', ')']).parse().ok())
        .or_else(|| find_year(raw));

    let volume = paren_year.and_then(|m| {
        raw[m.end()..].split(',').skip(1).find_map(|part| {
            part.split_whitespace()
                .next()
                .filter(|token| token.chars().all(|c| c.is_ascii_digit()))
        })
    });

    let page = PAGE_PATTERN
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    Reference::new(raw, reference_keys(find_doi(raw), author, year, page, volume))
}

/// Collapse whitespace runs, including line breaks, into single spaces.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"Scopus
EXPORT DATE: 01 January 2024

@ARTICLE{Smith2001100,
author={Smith, J. and Doe, A.},
title={Citation {S}tructure
  of small corpora},
journal={Journal of Tests},
year={2001},
volume={12},
pages={100-110},
doi={10.1000/ABC},
note={cited By 12},
references={Doe, A., Foundations (1999) J. Appl. Phys., 3, pp. 1-5; Roe, R., Other work (2005) Nature, 410, pp. 100-104. Cited 3 times.},
language={English},
document_type={Article},
source={Scopus},
}

@comment{ this { is } ignored }

@Article{Doe19991,
  author = "Doe, A.",
  title = "Foundations",
  year = 1999,
  volume = {3},
  pages = {1-5}
}
"#;

    #[test]
    fn parses_entries_and_fields() {
        let records = parse_records(SAMPLE).expect("parse");
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id.as_str(), "Smith2001100");
        assert_eq!(first.title, "Citation Structure of small corpora");
        assert_eq!(first.authors, vec!["Smith, J.", "Doe, A."]);
        assert_eq!(first.year, Some(2001));
        assert_eq!(first.venue.as_deref(), Some("Journal of Tests"));
        assert_eq!(first.ids.doi.as_deref(), Some("10.1000/abc"));
        assert_eq!(first.times_cited, 12);
        assert_eq!(first.first_page.as_deref(), Some("100"));
        assert_eq!(first.references.len(), 2);
        assert_eq!(
            first.fields.get("language"),
            Some(&FieldValue::Text("English".into()))
        );
        assert_eq!(
            first.fields.get("entry_type"),
            Some(&FieldValue::Text("article".into()))
        );
    }

    #[test]
    fn quoted_and_bare_values() {
        let records = parse_records(SAMPLE).expect("parse");
        assert_eq!(records[1].title, "Foundations");
        assert_eq!(records[1].year, Some(1999));
    }

    #[test]
    fn reference_keys_from_scopus_text() {
        let reference = parse_reference("Doe, A., Foundations (1999) J. Appl. Phys., 3, pp. 1-5");
        let keys: Vec<String> = reference.keys.iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["ref:doe|1999|p1", "ref:doe|1999|v3"]);
    }

    #[test]
    fn references_resolve_to_record_keys() {
        let records = parse_records(SAMPLE).expect("parse");
        let target_keys = records[1].match_keys();
        let reference = &records[0].references[0];
        assert!(reference.keys.iter().any(|k| target_keys.contains(k)));
    }

    #[test]
    fn concatenated_values() {
        let text = "@misc{k, title = \"Part one\" # { and two}}";
        let records = parse_records(text).expect("parse");
        assert_eq!(records[0].title, "Part one and two");
    }

    #[test]
    fn unbalanced_braces_are_malformed() {
        let text = "@article{k,\ntitle={Broken\n";
        assert!(matches!(
            parse_records(text),
            Err(TreeError::MalformedInput { line: 2, .. })
        ));
    }

    #[test]
    fn missing_key_is_malformed() {
        let text = "@article{, title={X}}";
        assert!(matches!(
            parse_records(text),
            Err(TreeError::MalformedInput { .. })
        ));
    }

    #[test]
    fn missing_title_is_malformed() {
        let text = "@article{k, author={Smith, J.}}";
        assert!(matches!(
            parse_records(text),
            Err(TreeError::MalformedInput { .. })
        ));
    }

    #[test]
    fn file_without_entries_is_malformed() {
        assert!(parse_records("just some text").is_err());
        assert!(parse_records("@comment{nothing here}").is_err());
    }

    #[test]
    fn stray_at_sign_is_comment_text() {
        let text = "Exported by the library, contact: help@lib.example.org\n\
                    Budget @ 50%\n\
                    @article{k, title={Kept}}\n\
                    trailing @";
        let records = parse_records(text).expect("parse");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Kept");
    }

    #[test]
    fn record_limit_stops_at_first_excess_entry() {
        let two = "@article{a, title={A}}\n@comment{not counted}\n@article{b, title={B}}\n";
        assert_eq!(parse_records_within(two, 2).expect("within limit").len(), 2);

        let three = format!("{}@article{{c, title={{C}}}}\n@article{{d, title={{Open\n", two);
        assert!(matches!(
            parse_records_within(&three, 2),
            Err(TreeError::MalformedInput { line: 4, .. })
        ));
    }

    #[test]
    fn missing_citation_count_defaults_to_zero() {
        let text = "@article{k, title={X}, note={Accepted}}";
        let records = parse_records(text).expect("parse");
        assert_eq!(records[0].times_cited, 0);
        assert_eq!(
            records[0].fields.get("note"),
            Some(&FieldValue::Text("Accepted".into()))
        );
    }
}
