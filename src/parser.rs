//! CSV field normalization for OpenFlights-style extracts.
//!
//! The extracts have no header row, mark missing values with `\N` (or leave
//! them empty) and sometimes mix row widths within one file.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};

use crate::error::LoadError;

/// Null marker used throughout the OpenFlights data files.
pub const NULL_MARKER: &str = r"\N";

/// Trims a raw field and maps the null marker and the empty string to `None`.
pub fn nullify(value: &str) -> Option<&str> {
    let v = value.trim();
    if v.is_empty() || v == NULL_MARKER {
        None
    } else {
        Some(v)
    }
}

/// One data row together with the source line it came from.
#[derive(Debug, Clone)]
pub struct Row {
    line: u64,
    record: StringRecord,
}

impl Row {
    pub fn new(line: u64, record: StringRecord) -> Self {
        Self { line, record }
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn width(&self) -> usize {
        self.record.len()
    }

    fn raw(&self, column: usize) -> &str {
        self.record.get(column).unwrap_or("")
    }

    pub fn text(&self, column: usize) -> Option<String> {
        nullify(self.raw(column)).map(str::to_string)
    }

    /// Parses an integer column; a non-numeric value is an error.
    pub fn int(&self, column: usize) -> Result<Option<i64>, LoadError> {
        match nullify(self.raw(column)) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| LoadError::InvalidInt {
                line: self.line,
                column,
                value: v.to_string(),
            }),
        }
    }

    /// Parses a floating point column; a non-numeric value is an error.
    pub fn float(&self, column: usize) -> Result<Option<f64>, LoadError> {
        match nullify(self.raw(column)) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| LoadError::InvalidFloat {
                line: self.line,
                column,
                value: v.to_string(),
            }),
        }
    }

    /// Like [`Row::int`] but an unparseable value becomes `None`.
    pub fn lenient_int(&self, column: usize) -> Option<i64> {
        nullify(self.raw(column)).and_then(|v| v.parse().ok())
    }

    /// Like [`Row::float`] but an unparseable value becomes `None`.
    pub fn lenient_float(&self, column: usize) -> Option<f64> {
        nullify(self.raw(column)).and_then(|v| v.parse().ok())
    }

    /// `true` only for the literal `Y` codeshare marker.
    pub fn flag(&self, column: usize) -> bool {
        nullify(self.raw(column)) == Some("Y")
    }
}

/// Physical (1-based) line of the record whose read started at `offset`.
///
/// The reader reports the offset before any blank lines it skipped, so line
/// terminators are stepped over first.
fn line_at(data: &[u8], offset: u64) -> u64 {
    let from = usize::try_from(offset).map_or(data.len(), |o| o.min(data.len()));
    let start = data[from..]
        .iter()
        .position(|&b| b != b'\r' && b != b'\n')
        .map_or(data.len(), |i| from + i);
    data[..start].iter().filter(|&&b| b == b'\n').count() as u64 + 1
}

/// Reads every non-blank row of a header-less CSV extract.
///
/// Line numbers count every physical line, including the blank ones the
/// reader skips.
///
/// # Errors
///
/// Fails on the first row whose width is not one of `widths`, or when the
/// underlying CSV reader fails (bad quoting, invalid UTF-8).
pub fn read_rows<R: Read>(mut reader: R, widths: &[usize]) -> Result<Vec<Row>, LoadError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_slice());

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record
            .position()
            .map(|p| line_at(&data, p.byte()))
            .unwrap_or(0);

        if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
            continue;
        }

        if !widths.contains(&record.len()) {
            return Err(LoadError::ColumnCount {
                line,
                expected: widths
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(" or "),
                found: record.len(),
            });
        }

        rows.push(Row::new(line, record));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Row {
        Row::new(1, StringRecord::from(fields.to_vec()))
    }

    #[test]
    fn test_nullify_markers() {
        assert_eq!(nullify(r"\N"), None);
        assert_eq!(nullify(""), None);
        assert_eq!(nullify("   "), None);
        assert_eq!(nullify(r" \N "), None);
        assert_eq!(nullify(" PEK "), Some("PEK"));
    }

    #[test]
    fn test_strict_int_rejects_garbage() {
        let r = row(&["12", r"\N", "abc"]);
        assert_eq!(r.int(0).unwrap(), Some(12));
        assert_eq!(r.int(1).unwrap(), None);

        let err = r.int(2).unwrap_err();
        assert!(matches!(err, LoadError::InvalidInt { column: 2, .. }));
    }

    #[test]
    fn test_lenient_numbers() {
        let r = row(&["n/a", "12.5", ""]);
        assert_eq!(r.lenient_int(0), None);
        assert_eq!(r.lenient_float(1), Some(12.5));
        assert_eq!(r.lenient_float(2), None);
    }

    #[test]
    fn test_flag_only_accepts_y() {
        let r = row(&["Y", "", "N", "y", r"\N"]);
        assert!(r.flag(0));
        assert!(!r.flag(1));
        assert!(!r.flag(2));
        assert!(!r.flag(3));
        assert!(!r.flag(4));
    }

    #[test]
    fn test_missing_column_reads_as_null() {
        let r = row(&["a"]);
        assert_eq!(r.text(5), None);
    }

    #[test]
    fn test_read_rows_skips_blank_lines() {
        let data = "1,\"Air, Inc\",\\N\n\n2,Other,X\n";
        let rows = read_rows(data.as_bytes(), &[3]).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(1).as_deref(), Some("Air, Inc"));
        assert_eq!(rows[1].line(), 3);
    }

    #[test]
    fn test_width_error_after_blank_lines_names_physical_line() {
        let data = "a,b,c\n\n\nd,e\n";
        let err = read_rows(data.as_bytes(), &[3]).unwrap_err();
        assert!(matches!(err, LoadError::ColumnCount { line: 4, found: 2, .. }));
    }

    #[test]
    fn test_number_error_after_blank_line_names_physical_line() {
        let data = "1,x\n\n\n2,y\nabc,z\n";
        let rows = read_rows(data.as_bytes(), &[2]).unwrap();
        assert_eq!(rows[1].line(), 4);

        let err = rows[2].int(0).unwrap_err();
        assert!(matches!(err, LoadError::InvalidInt { line: 5, column: 0, .. }));
    }

    #[test]
    fn test_line_at_steps_over_skipped_blank_lines() {
        let data = b"a\r\n\r\n\nb\n";
        assert_eq!(line_at(data, 0), 1);
        assert_eq!(line_at(data, 3), 4);
        assert_eq!(line_at(data, 100), 5);
    }

    #[test]
    fn test_read_rows_mixed_widths() {
        let data = "a,b,c\nd,e,f,g\n";
        let rows = read_rows(data.as_bytes(), &[3, 4]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].width(), 4);
    }

    #[test]
    fn test_read_rows_reports_bad_width() {
        let data = "a,b,c\nd,e\n";
        let err = read_rows(data.as_bytes(), &[3]).unwrap_err();
        match err {
            LoadError::ColumnCount {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, "3");
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
