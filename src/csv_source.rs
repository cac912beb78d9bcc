use std::{collections::BTreeMap, fmt, io::Cursor, path::Path, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};

use crate::sniff;

/// Text encoding of the feed files. Japanese feeds are frequently written with a byte order
/// mark, so the default tolerates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// UTF-8 with an optional leading byte order mark.
    #[default]
    Utf8Sig,
    /// Any other encoding, decoded strictly without byte order mark handling.
    Labeled(&'static encoding_rs::Encoding),
}

impl FromStr for TextEncoding {
    type Err = anyhow::Error;

    fn from_str(label: &str) -> Result<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8-sig" | "utf8-sig" => return Ok(TextEncoding::Utf8Sig),
            "cp932" | "ms932" | "sjis" => {
                return Ok(TextEncoding::Labeled(encoding_rs::SHIFT_JIS));
            }
            _ => {}
        }
        let encoding = encoding_rs::Encoding::for_label(label.trim().as_bytes())
            .or_else(|| encoding_rs::Encoding::for_label(normalized.as_bytes()));
        match encoding {
            Some(encoding) => Ok(TextEncoding::Labeled(encoding)),
            None => bail!("Unknown text encoding {:?}", label),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8Sig => write!(f, "utf_8_sig"),
            TextEncoding::Labeled(encoding) => write!(f, "{}", encoding.name()),
        }
    }
}

impl TextEncoding {
    /// Decoding is strict: any malformed byte sequence fails the whole file.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let (encoding, bytes) = match self {
            TextEncoding::Utf8Sig => (
                encoding_rs::UTF_8,
                bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes),
            ),
            TextEncoding::Labeled(encoding) => (*encoding, bytes),
        };
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| anyhow!("Input is not valid {}", self))
    }
}

/// One record of a feed file, keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// 1-based line in the source file where the record starts.
    pub line: u64,
    pub fields: BTreeMap<String, String>,
}

impl CsvRow {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|value| value.as_str())
    }

    /// Missing and blank cells are both treated as absent.
    pub fn required(&self, name: &str) -> Result<String> {
        match self.optional(name) {
            Some(value) => Ok(value),
            None => bail!("line {}: missing required field `{}`", self.line, name),
        }
    }

    pub fn optional(&self, name: &str) -> Option<String> {
        self.get(name)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
    }

    /// The column has to exist but the cell may be blank.
    pub fn required_column(&self, name: &str) -> Result<String> {
        match self.get(name) {
            Some(value) => Ok(value.to_string()),
            None => bail!("line {}: missing required field `{}`", self.line, name),
        }
    }

    /// Blank cells become an empty string, for key columns that must always have a value.
    pub fn key(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        let value = self.required(name)?;
        self.parse_integer(name, &value)
    }

    pub fn optional_integer(&self, name: &str) -> Result<Option<i64>> {
        match self.optional(name) {
            Some(value) => Ok(Some(self.parse_integer(name, &value)?)),
            None => Ok(None),
        }
    }

    pub fn optional_real(&self, name: &str) -> Result<Option<f64>> {
        match self.optional(name) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| anyhow!("line {}: `{}` is not a number: {:?}", self.line, name, value)),
            None => Ok(None),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.integer(name)? {
            0 => Ok(false),
            1 => Ok(true),
            other => bail!("line {}: `{}` must be 0 or 1, got {}", self.line, name, other),
        }
    }

    fn parse_integer(&self, name: &str, value: &str) -> Result<i64> {
        value
            .trim()
            .parse()
            .map_err(|_| anyhow!("line {}: `{}` is not an integer: {:?}", self.line, name, value))
    }
}

/// Rows of one feed file. Single pass; the file content is owned by the iterator.
pub struct CsvRows {
    inner: RowSource,
}

enum RowSource {
    Streaming {
        records: csv::StringRecordsIntoIter<Cursor<String>>,
        field_names: Vec<String>,
    },
    Deduplicated {
        rows: std::vec::IntoIter<CsvRow>,
        previous: Option<BTreeMap<String, String>>,
    },
    Empty,
}

impl Iterator for CsvRows {
    type Item = Result<CsvRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RowSource::Streaming {
                records,
                field_names,
            } => {
                let record = records.next()?;
                Some(
                    record
                        .map_err(anyhow::Error::from)
                        .and_then(|record| to_row(field_names, &record)),
                )
            }
            RowSource::Deduplicated { rows, previous } => {
                for row in rows.by_ref() {
                    if previous.as_ref() == Some(&row.fields) {
                        continue;
                    }
                    *previous = Some(row.fields.clone());
                    return Some(Ok(row));
                }
                None
            }
            RowSource::Empty => None,
        }
    }
}

/// Reads a delimited text file into header-keyed rows.
///
/// The dialect is sniffed from the first [`sniff::SAMPLE_SIZE`] characters. ASCII spaces at the
/// start of an unquoted field are insignificant. When `field_names` is `None` the first record
/// is the header.
///
/// With `drop_duplicates`, all rows are materialized and sorted by their JSON serialization
/// so that exact duplicates become adjacent and can be skipped. The output is then in that
/// sorted order rather than in file order. Keys serialize in column name order, not header order.
pub fn load_csv_file(
    path: &Path,
    field_names: Option<&[String]>,
    encoding: TextEncoding,
    drop_duplicates: bool,
) -> Result<CsvRows> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let text = encoding
        .decode(&bytes)
        .with_context(|| format!("Failed to decode {:?}", path))?;
    let rows = parse_csv(text, field_names, drop_duplicates)
        .with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(rows)
}

pub fn parse_csv(
    text: String,
    field_names: Option<&[String]>,
    drop_duplicates: bool,
) -> Result<CsvRows> {
    if text.trim().is_empty() {
        return Ok(CsvRows {
            inner: RowSource::Empty,
        });
    }

    let dialect = sniff::sniff(sniff::sample(&text))?;
    log::debug!(
        "Sniffed delimiter {:?}, quote {:?}",
        dialect.delimiter as char,
        dialect.quote as char
    );

    let text = skip_initial_space(&text, dialect);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .has_headers(field_names.is_none())
        .flexible(true)
        .from_reader(Cursor::new(text));

    let field_names: Vec<String> = match field_names {
        Some(names) => names.to_vec(),
        None => reader.headers()?.iter().map(|name| name.to_string()).collect(),
    };

    let records = reader.into_records();
    if !drop_duplicates {
        return Ok(CsvRows {
            inner: RowSource::Streaming {
                records,
                field_names,
            },
        });
    }

    let mut rows = Vec::new();
    for record in records {
        rows.push(to_row(&field_names, &record?)?);
    }
    rows.sort_by_cached_key(|row| serde_json::to_string(&row.fields).unwrap_or_default());
    Ok(CsvRows {
        inner: RowSource::Deduplicated {
            rows: rows.into_iter(),
            previous: None,
        },
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Drops ASCII spaces that open a field, so that a quote after `, ` still starts a quoted
/// field. Quoted content and other whitespace are kept. Newlines are never removed, so line
/// numbers stay the same.
fn skip_initial_space(text: &str, dialect: sniff::Dialect) -> String {
    if dialect.delimiter == b' ' {
        return text.to_string();
    }
    let delimiter = dialect.delimiter as char;
    let quote = dialect.quote as char;

    let mut result = String::with_capacity(text.len());
    let mut state = FieldState::Start;
    for c in text.chars() {
        let ends_field = c == delimiter || c == '\n';
        state = match state {
            FieldState::Start if c == ' ' => continue,
            FieldState::Start if c == quote => FieldState::Quoted,
            FieldState::Start | FieldState::Unquoted if ends_field => FieldState::Start,
            FieldState::Start | FieldState::Unquoted => FieldState::Unquoted,
            FieldState::Quoted if c == quote => FieldState::QuoteInQuoted,
            FieldState::Quoted => FieldState::Quoted,
            FieldState::QuoteInQuoted if c == quote => FieldState::Quoted,
            FieldState::QuoteInQuoted if ends_field => FieldState::Start,
            FieldState::QuoteInQuoted => FieldState::Unquoted,
        };
        result.push(c);
    }
    result
}

fn to_row(field_names: &[String], record: &csv::StringRecord) -> Result<CsvRow> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let mut fields = BTreeMap::new();
    for (i, value) in record.iter().enumerate() {
        match field_names.get(i) {
            Some(name) => {
                fields.insert(name.clone(), value.to_string());
            }
            None if value.is_empty() => {}
            None => bail!(
                "line {}: record has {} fields but the header only names {}",
                line,
                record.len(),
                field_names.len()
            ),
        }
    }
    Ok(CsvRow { line, fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(text: &str, drop_duplicates: bool) -> Vec<CsvRow> {
        parse_csv(text.to_string(), None, drop_duplicates)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn names(rows: &[CsvRow]) -> Vec<&str> {
        rows.iter().map(|row| row.get("stop_name").unwrap()).collect()
    }

    #[test]
    fn rows_are_keyed_by_header() {
        let rows = rows("stop_id,stop_name\nS1,Tokyo\nS2,Ueno\n", false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("stop_id"), Some("S1"));
        assert_eq!(rows[1].get("stop_name"), Some("Ueno"));
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn leading_whitespace_is_insignificant() {
        let rows = rows("stop_id, stop_name\nS1,  Tokyo Station\n", false);
        assert_eq!(rows[0].get("stop_name"), Some("Tokyo Station"));
    }

    #[test]
    fn spaced_quoted_field_keeps_its_delimiter() {
        let rows = rows("stop_id, stop_name\nS1, \"Tokyo, Yaesu\"\nS2, Ueno\n", false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("stop_name"), Some("Tokyo, Yaesu"));
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].get("stop_name"), Some("Ueno"));
    }

    #[test]
    fn only_ascii_spaces_before_a_field_are_skipped() {
        let rows = rows(
            "stop_id,stop_name\nS1,\u{3000}東京\nS2,\"  padded\"\nS3, \"a \"\"b\"\" c\"\n",
            false,
        );
        assert_eq!(rows[0].get("stop_name"), Some("\u{3000}東京"));
        assert_eq!(rows[1].get("stop_name"), Some("  padded"));
        assert_eq!(rows[2].get("stop_name"), Some("a \"b\" c"));
    }

    #[test]
    fn explicit_field_names_treat_first_line_as_data() {
        let names = vec!["a".to_string(), "b".to_string()];
        let rows: Vec<CsvRow> = parse_csv("1,2\n3,4\n".to_string(), Some(&names), false)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a"), Some("1"));
        assert_eq!(rows[1].get("b"), Some("4"));
    }

    #[test]
    fn short_records_leave_fields_absent() {
        let rows = rows("stop_id,stop_name,stop_desc\nS1,Tokyo\n", false);
        assert_eq!(rows[0].get("stop_desc"), None);
        assert_eq!(rows[0].optional("stop_desc"), None);
    }

    #[test]
    fn surplus_fields_must_be_blank() {
        let ok = rows("stop_id,stop_name\nS1,Tokyo,\n", false);
        assert_eq!(ok[0].fields.len(), 2);

        let err = parse_csv("stop_id,stop_name\nS1,Tokyo,extra\n".to_string(), None, false)
            .unwrap()
            .next()
            .unwrap();
        assert!(err.is_err());
    }

    #[test]
    fn duplicates_are_dropped_in_sorted_order() {
        let text = "stop_id,stop_name\nS2,Ueno\nS1,Tokyo\nS2,Ueno\nS1,Tokyo\nS3,Ueno\n";
        let deduplicated = rows(text, true);
        assert_eq!(names(&deduplicated), vec!["Tokyo", "Ueno", "Ueno"]);
        assert_eq!(deduplicated[0].get("stop_id"), Some("S1"));
        assert_eq!(deduplicated[1].get("stop_id"), Some("S2"));
        assert_eq!(deduplicated[2].get("stop_id"), Some("S3"));
        for pair in deduplicated.windows(2) {
            assert_ne!(pair[0].fields, pair[1].fields);
        }

        assert_eq!(rows(text, false).len(), 5);
    }

    #[test]
    fn empty_text_has_no_rows() {
        assert!(rows("", false).is_empty());
        assert!(rows("stop_id,stop_name\n", true).is_empty());
    }

    #[test]
    fn utf8_sig_strips_byte_order_mark() {
        let bytes = "\u{feff}agency_id,agency_name\n".as_bytes();
        let text = TextEncoding::Utf8Sig.decode(bytes).unwrap();
        assert!(text.starts_with("agency_id"));

        let plain = TextEncoding::from_str("utf-8").unwrap().decode(bytes).unwrap();
        assert!(plain.starts_with('\u{feff}'));
    }

    #[test]
    fn shift_jis_feeds_decode() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("stop_id,stop_name\nS1,東京駅\n");
        let encoding = TextEncoding::from_str("cp932").unwrap();
        let text = encoding.decode(&bytes).unwrap();
        assert!(text.contains("東京駅"));
    }

    #[test]
    fn invalid_bytes_fail_decoding() {
        assert!(TextEncoding::Utf8Sig.decode(b"stop_id\n\xff\xfe").is_err());
    }

    #[test]
    fn encoding_labels() {
        assert_eq!(TextEncoding::from_str("utf_8_sig").unwrap(), TextEncoding::Utf8Sig);
        assert_eq!(
            TextEncoding::from_str("Shift_JIS").unwrap(),
            TextEncoding::Labeled(encoding_rs::SHIFT_JIS)
        );
        assert_eq!(
            TextEncoding::from_str("euc_jp").unwrap(),
            TextEncoding::Labeled(encoding_rs::EUC_JP)
        );
        assert!(TextEncoding::from_str("klingon").is_err());
    }

    #[test]
    fn typed_accessors() {
        let rows = rows(
            "location_type,monday,price,dist,stop_desc\n1,1,210,12.5,\nx,2,,,\n",
            false,
        );
        assert_eq!(rows[0].optional_integer("location_type").unwrap(), Some(1));
        assert!(rows[0].flag("monday").unwrap());
        assert_eq!(rows[0].integer("price").unwrap(), 210);
        assert_eq!(rows[0].optional_real("dist").unwrap(), Some(12.5));
        assert_eq!(rows[0].key("stop_desc"), "");
        assert_eq!(rows[0].required_column("stop_desc").unwrap(), "");

        assert!(rows[1].optional_integer("location_type").is_err());
        assert!(rows[1].flag("monday").is_err());
        let err = rows[1].integer("price").unwrap_err();
        assert!(err.to_string().contains("missing required field `price`"));
    }
}
