//! Grade CSV parsing
//!
//! The accepted dialect is deliberately minimal: one record per line, fields
//! separated by a bare comma, no header row, no quoting or escaping. Only the
//! first two fields of a line are read.

use serde::Serialize;

/// One row of intent-to-grade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRecord {
    /// Student/user identifier (first field, trimmed)
    pub identifier: String,

    /// Numeric grade (second field). Unparseable values become `0`.
    pub grade: f64,
}

impl GradeRecord {
    /// A record passes when its grade is strictly greater than zero
    pub fn is_pass(&self) -> bool {
        self.grade > 0.0
    }
}

/// The ordered records parsed from one file, with pass/fail counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedDataset {
    records: Vec<GradeRecord>,
    total: usize,
    pass_count: usize,
    fail_count: usize,
}

impl ParsedDataset {
    /// Build a dataset from records, computing the statistics once
    pub fn from_records(records: Vec<GradeRecord>) -> Self {
        let total = records.len();
        let pass_count = records.iter().filter(|r| r.is_pass()).count();
        Self {
            records,
            total,
            pass_count,
            fail_count: total - pass_count,
        }
    }

    pub fn records(&self) -> &[GradeRecord] {
        &self.records
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn pass_count(&self) -> usize {
        self.pass_count
    }

    pub fn fail_count(&self) -> usize {
        self.fail_count
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Parse raw CSV text into a dataset.
///
/// Never fails: blank lines and lines with fewer than two fields are skipped,
/// and a grade without a leading finite number is recorded as `0`.
pub fn parse(raw: &str) -> ParsedDataset {
    let records = strip_bom(raw)
        .lines()
        .filter(|line| !trim_field(line).is_empty())
        .filter_map(parse_line)
        .collect();

    ParsedDataset::from_records(records)
}

/// Drop a leading UTF-8 byte-order mark
pub fn strip_bom(raw: &str) -> &str {
    raw.strip_prefix('\u{feff}').unwrap_or(raw)
}

/// Whitespace trim that also removes stray byte-order marks
fn trim_field(field: &str) -> &str {
    field.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

fn parse_line(line: &str) -> Option<GradeRecord> {
    let mut fields = line.split(',');
    let identifier = trim_field(fields.next()?);
    let grade = trim_field(fields.next()?);

    Some(GradeRecord {
        identifier: identifier.to_string(),
        grade: parse_grade(grade),
    })
}

/// Parse a grade field, coercing anything without a leading finite number to `0`
pub fn parse_grade(field: &str) -> f64 {
    parse_number_prefix(field).unwrap_or(0.0)
}

/// Read the longest numeric prefix of `text`, ignoring leading whitespace.
///
/// `"85%"` reads as `85`, `"1.5 pts"` as `1.5`, `"1e"` as `1` and `".5"` as
/// `0.5`. Returns `None` when there is no prefix or it is not finite.
pub fn parse_number_prefix(text: &str) -> Option<f64> {
    let s = trim_field(text);
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|g| g.is_finite())
}
