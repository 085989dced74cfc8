//! CSV row parsing and subject-name extraction.
//!
//! The input file is a header line followed by one data row per line. Each
//! row yields one searchable subject name via a fixed column-mapping policy
//! (see [`InputRow::subject`]).

/// One data row of the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    /// Zero-based position in the input, counted after the header.
    pub index: usize,
    /// The raw row text, as read.
    pub raw: String,
}

impl InputRow {
    /// Derive the subject name submitted to the search service.
    ///
    /// Column-mapping policy:
    /// - three or more comma-separated fields: `"{field2}, {field1}"`
    ///   (column 1 is an external id, column 2 the last name, column 3 the
    ///   first name, so the subject reads "First, Last" the way the search
    ///   service indexes individuals);
    /// - exactly two fields: `"{field1}, {field0}"`;
    /// - a single field: that field verbatim.
    ///
    /// Fields are stripped of stray commas, tabs and CR/LF on both ends
    /// before use, so a CRLF input file or a dangling delimiter cannot leak
    /// into the query.
    pub fn subject(&self) -> String {
        let fields: Vec<&str> = self.raw.split(',').map(trim_field).collect();
        match fields.len() {
            0 => String::new(),
            1 => fields[0].to_string(),
            2 => format!("{}, {}", fields[1], fields[0]),
            _ => format!("{}, {}", fields[2], fields[1]),
        }
    }
}

/// Strip leading/trailing commas, tabs and line terminators from a field.
fn trim_field(field: &str) -> &str {
    field.trim_matches(|c| matches!(c, ',' | '\t' | '\r' | '\n'))
}

/// Split raw CSV text into the verbatim header line and ordered data rows.
///
/// Blank lines are skipped; row indices are assigned by position among the
/// surviving data rows. Input with a header and no data rows is valid and
/// yields an empty row list.
pub fn parse(raw: &str) -> (String, Vec<InputRow>) {
    let mut lines = raw.lines();
    let header = lines.next().unwrap_or_default().to_string();

    let rows = lines
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| InputRow {
            index,
            raw: line.to_string(),
        })
        .collect();

    (header, rows)
}
