//! # Web of Science Reader
//!
//! Parses ISI / Web of Science "plain text" exports.
//!
//! ```text
//! FN Clarivate Analytics Web of Science
//! VR 1.0
//! PT J
//! AU Smith, J
//!    Doe, A
//! TI A title that may
//!    span several lines
//! CR Doe A, 1999, J APPL PHYS, V3, P1, DOI 10.1000/xyz
//! PY 2001
//! ER
//!
//! EF
//! ```
//!
//! Each line is a two-character tag followed by a space and a value, or a
//! continuation line indented by three spaces. Records open with `PT` and
//! close with `ER`.

use super::{check_record_limit, clamp_field, find_doi, parse_year, reference_keys};
use crate::primitives::{MAX_RECORDS, MAX_REFERENCES_PER_RECORD};
use crate::{FieldValue, PublicationRecord, RecordId, Reference, TreeError};
use std::collections::BTreeMap;

/// Tags whose continuation lines are prose and are joined with spaces.
const JOINED_TAGS: &[&str] = &["TI", "SO", "AB", "SE", "PU", "BS", "CT"];

/// Human-readable names for side-channel tags. Unlisted tags keep their code.
const TAG_NAMES: &[(&str, &str)] = &[
    ("PT", "publication_type"),
    ("AF", "author_full_names"),
    ("DT", "document_type"),
    ("LA", "language"),
    ("NR", "reference_count"),
    ("Z9", "total_times_cited"),
    ("SN", "issn"),
    ("EI", "eissn"),
    ("PU", "publisher"),
    ("PD", "publication_date"),
    ("IS", "issue"),
    ("EP", "end_page"),
    ("PG", "page_count"),
    ("AB", "abstract"),
    ("DE", "author_keywords"),
    ("ID", "keywords_plus"),
    ("WC", "categories"),
    ("SC", "research_areas"),
    ("J9", "journal_abbreviation"),
    ("OA", "open_access"),
];

/// Tag lines collected for one record, before interpretation.
struct RawRecord {
    start_line: usize,
    fields: BTreeMap<String, Vec<String>>,
}

impl RawRecord {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            fields: BTreeMap::new(),
        }
    }

    fn append(&mut self, tag: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.fields.entry(tag.to_string()).or_default();
            return;
        }
        self.fields
            .entry(tag.to_string())
            .or_default()
            .push(clamp_field(value));
    }

    fn take(&mut self, tag: &str) -> Option<Vec<String>> {
        self.fields.remove(tag)
    }

    fn take_joined(&mut self, tag: &str) -> Option<String> {
        self.take(tag)
            .map(|lines| lines.join(" "))
            .filter(|s| !s.is_empty())
    }
}

/// Parse every record of a Web of Science export.
pub fn parse_records(text: &str) -> Result<Vec<PublicationRecord>, TreeError> {
    parse_records_within(text, MAX_RECORDS)
}

/// Parse at most `max_records` records, failing at the first one past it.
fn parse_records_within(text: &str, max_records: usize) -> Result<Vec<PublicationRecord>, TreeError> {
    let mut records = Vec::new();
    let mut current: Option<RawRecord> = None;
    let mut last_tag: Option<String> = None;
    let mut saw_record_start = false;

    for (index, line) in text.lines().enumerate() {
        let line_no = index.saturating_add(1);

        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with("   ") || line.starts_with('\t') {
            match (current.as_mut(), last_tag.as_deref()) {
                (Some(record), Some(tag)) => record.append(tag, line),
                _ => {
                    return Err(TreeError::malformed(
                        line_no,
                        "continuation line outside of a record",
                    ));
                }
            }
            continue;
        }

        let Some((tag, value)) = split_tag(line) else {
            return Err(TreeError::malformed(
                line_no,
                format!(
                    "expected a two-character field tag, found {:?}",
                    preview(line)
                ),
            ));
        };

        match tag {
            "FN" | "VR" if current.is_none() => {
                last_tag = None;
            }
            "EF" => {
                if let Some(record) = &current {
                    return Err(TreeError::malformed(
                        record.start_line,
                        "record is not closed by ER before the EF end-of-file marker",
                    ));
                }
                break;
            }
            "PT" => {
                if let Some(record) = &current {
                    return Err(TreeError::malformed(
                        line_no,
                        format!(
                            "new PT record starts before the record opened at line {} was closed by ER",
                            record.start_line
                        ),
                    ));
                }
                check_record_limit(records.len().saturating_add(1), max_records, line_no)?;
                let mut record = RawRecord::new(line_no);
                record.append("PT", value);
                current = Some(record);
                last_tag = Some("PT".to_string());
                saw_record_start = true;
            }
            "ER" => {
                let Some(record) = current.take() else {
                    return Err(TreeError::malformed(
                        line_no,
                        "ER found without a preceding PT record-start marker",
                    ));
                };
                records.push(build_record(record)?);
                last_tag = None;
            }
            _ => {
                let Some(record) = current.as_mut() else {
                    return Err(TreeError::malformed(
                        line_no,
                        format!(
                            "field {} appears outside a record (missing PT record-start marker)",
                            tag
                        ),
                    ));
                };
                record.append(tag, value);
                last_tag = Some(tag.to_string());
            }
        }
    }

    if let Some(record) = current {
        return Err(TreeError::malformed(
            record.start_line,
            "record is not closed by ER",
        ));
    }
    if !saw_record_start {
        return Err(TreeError::malformed(
            1,
            "no PT record-start marker found; expected a Web of Science tagged export",
        ));
    }
    Ok(records)
}

/// Split `"XX value"` into `("XX", "value")`.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let first_ok = bytes[0].is_ascii_uppercase();
    let second_ok = bytes[1].is_ascii_uppercase() || bytes[1].is_ascii_digit();
    if !first_ok || !second_ok {
        return None;
    }
    match bytes.get(2) {
        None => Some((&line[..2], "")),
        Some(b' ') => Some((&line[..2], line[3..].trim())),
        Some(_) => None,
    }
}

/// Shortened line for error messages.
fn preview(line: &str) -> String {
    line.chars().take(40).collect()
}

/// Interpret the collected tags of one record.
fn build_record(mut raw: RawRecord) -> Result<PublicationRecord, TreeError> {
    let start_line = raw.start_line;
    let title = raw.take_joined("TI").ok_or_else(|| {
        TreeError::malformed(start_line, "record has no TI title field")
    })?;

    let authors = match raw.take("AU") {
        Some(authors) if !authors.is_empty() => authors,
        _ => raw.take("AF").unwrap_or_default(),
    };

    let year = raw.take_joined("PY").and_then(|y| parse_year(&y));
    let venue = raw.take_joined("SO");
    let doi = raw
        .take_joined("DI")
        .map(|d| super::normalize_doi(&d))
        .filter(|d| !d.is_empty());
    let pmid = raw.take_joined("PM");
    let times_cited = raw
        .take_joined("TC")
        .and_then(|tc| tc.trim().parse().ok())
        .or_else(|| {
            raw.fields
                .get("Z9")
                .and_then(|v| v.first())
                .and_then(|z| z.trim().parse().ok())
        })
        .unwrap_or(0);
    let volume = raw.take_joined("VL");
    let first_page = raw.take_joined("BP").or_else(|| raw.take_joined("AR"));
    let explicit_id = raw.take_joined("UT");

    let references: Vec<Reference> = raw
        .take("CR")
        .unwrap_or_default()
        .iter()
        .take(MAX_REFERENCES_PER_RECORD)
        .map(|line| parse_reference(line))
        .collect();

    let mut fields = BTreeMap::new();
    for (tag, lines) in std::mem::take(&mut raw.fields) {
        let value = if JOINED_TAGS.contains(&tag.as_str()) || lines.len() == 1 {
            FieldValue::from_raw(&lines.join(" "))
        } else if lines.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::List(lines)
        };
        fields.insert(field_name(&tag), value);
    }

    let mut record = PublicationRecord::new(RecordId::new(String::new()), title);
    record.authors = authors;
    record.year = year;
    record.venue = venue;
    record.ids.doi = doi;
    record.ids.pmid = pmid;
    record.times_cited = times_cited;
    record.volume = volume;
    record.first_page = first_page;
    record.references = references;
    record.fields = fields;
    record.id = match explicit_id {
        Some(ut) => RecordId::new(ut),
        None => super::derived_id(&record),
    };
    Ok(record)
}

/// Side-channel key for a tag.
fn field_name(tag: &str) -> String {
    TAG_NAMES
        .iter()
        .find(|(code, _)| *code == tag)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| tag.to_ascii_lowercase())
}

/// Parse one `CR` line: `Author, Year, Source, Vvol, Ppage, DOI doi`.
fn parse_reference(line: &str) -> Reference {
    let parts: Vec<&str> = line.split(", ").map(str::trim).collect();
    let author = parts.first().copied().filter(|a| !a.starts_with('['));
    let year = parts.get(1).and_then(|y| y.parse::<i32>().ok());
    let volume = parts
        .iter()
        .skip(2)
        .find(|p| p.starts_with('V') && p[1..].chars().next().is_some_and(|c| c.is_ascii_digit()))
        .copied();
    let page = parts
        .iter()
        .skip(2)
        .find(|p| p.starts_with('P') && p[1..].chars().next().is_some_and(|c| c.is_ascii_digit()))
        .copied();

    Reference::new(
        line,
        reference_keys(find_doi(line), author, year, page, volume),
    )
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchKey;

    const SAMPLE: &str = "FN Clarivate Analytics Web of Science
VR 1.0
PT J
AU Smith, J
   Doe, A
TI Citation structure
   of small corpora
SO JOURNAL OF TESTS
LA English
CR Doe A, 1999, J APPL PHYS, V3, P1
   Roe R, 2005, NATURE, V410, P100, DOI 10.1038/35065000
WC Physics; Chemistry
   Biology
TC 12
PY 2001
VL 12
BP 100
DI 10.1000/ABC
UT WOS:000000000000001
ER

PT J
AU Doe, A
TI Foundations
PY 1999
VL 3
BP 1
ER

EF
";

    #[test]
    fn parses_records_and_fields() {
        let records = parse_records(SAMPLE).expect("parse");
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id.as_str(), "WOS:000000000000001");
        assert_eq!(first.title, "Citation structure of small corpora");
        assert_eq!(first.authors, vec!["Smith, J", "Doe, A"]);
        assert_eq!(first.year, Some(2001));
        assert_eq!(first.times_cited, 12);
        assert_eq!(first.ids.doi.as_deref(), Some("10.1000/abc"));
        assert_eq!(first.references.len(), 2);
        assert_eq!(
            first.fields.get("language"),
            Some(&FieldValue::Text("English".into()))
        );
        assert_eq!(
            first.fields.get("publication_type"),
            Some(&FieldValue::Text("J".into()))
        );
        assert!(matches!(first.fields.get("categories"), Some(FieldValue::List(_))));
    }

    #[test]
    fn record_without_ut_gets_derived_id() {
        let records = parse_records(SAMPLE).expect("parse");
        assert_eq!(records[1].id.as_str(), "ref:doe|1999|p1");
    }

    #[test]
    fn reference_keys_from_cr_line() {
        let reference = parse_reference("Roe R, 2005, NATURE, V410, P100, DOI 10.1038/35065000");
        assert_eq!(reference.keys[0], MatchKey::Doi("10.1038/35065000".into()));
        assert_eq!(reference.keys[1].to_string(), "ref:roe|2005|p100");
        assert_eq!(reference.keys[2].to_string(), "ref:roe|2005|v410");
    }

    #[test]
    fn anonymous_reference_has_no_author_key() {
        let reference = parse_reference("[Anonymous], 2010, REPORT");
        assert!(reference.keys.is_empty());
    }

    #[test]
    fn missing_optional_fields_default() {
        let text = "PT J\nTI Lonely\nER\n";
        let records = parse_records(text).expect("parse");
        assert_eq!(records[0].times_cited, 0);
        assert!(records[0].authors.is_empty());
        assert!(records[0].ids.doi.is_none());
        assert_eq!(records[0].id.as_str(), "title:lonely");
    }

    #[test]
    fn missing_record_start_is_malformed() {
        let text = "FN Clarivate Analytics Web of Science\nVR 1.0\nAU Smith, J\nTI X\nER\n";
        assert!(matches!(
            parse_records(text),
            Err(TreeError::MalformedInput { line: 3, .. })
        ));
    }

    #[test]
    fn unterminated_record_is_malformed() {
        let text = "PT J\nTI X\n";
        assert!(matches!(
            parse_records(text),
            Err(TreeError::MalformedInput { line: 1, .. })
        ));
    }

    #[test]
    fn nested_record_start_is_malformed() {
        let text = "PT J\nTI X\nPT J\nTI Y\nER\n";
        assert!(matches!(
            parse_records(text),
            Err(TreeError::MalformedInput { line: 3, .. })
        ));
    }

    #[test]
    fn record_without_title_is_malformed() {
        let text = "PT J\nAU Smith, J\nER\n";
        assert!(matches!(
            parse_records(text),
            Err(TreeError::MalformedInput { .. })
        ));
    }

    #[test]
    fn record_limit_stops_at_first_excess_record() {
        let two = "PT J\nTI A\nER\nPT J\nTI B\nER\n";
        assert_eq!(parse_records_within(two, 2).expect("within limit").len(), 2);

        let three = format!("{}PT J\nTI C\nER\nnot a tagged line\n", two);
        assert!(matches!(
            parse_records_within(&three, 2),
            Err(TreeError::MalformedInput { line: 7, .. })
        ));
    }

    #[test]
    fn free_text_is_malformed() {
        assert!(parse_records("this is not an export\n").is_err());
        assert!(parse_records("").is_err());
    }
}
