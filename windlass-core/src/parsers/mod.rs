//! Stateless text-to-record parsers
//!
//! The feature panels of the dashboard get plain text back from their
//! commands in a handful of shapes: whitespace columns, `key=value` lines,
//! pipe-delimited and tab-delimited tables, and `ls -l` style directory
//! listings. These converters are pure functions — same text in, same records
//! out — and every line that does not match the expected shape is dropped
//! rather than treated as fatal. Where relative dates must be reconstructed,
//! the caller supplies "now".

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// Splits a line on whitespace, requiring at least `min_cols` columns.
///
/// Returns `None` for short lines so callers never index out of bounds.
#[must_use]
pub fn columns(line: &str, min_cols: usize) -> Option<Vec<&str>> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    (cols.len() >= min_cols).then_some(cols)
}

/// Parses `key<sep>value` lines, dropping lines without the separator.
///
/// Values keep any further separator occurrences; surrounding whitespace and
/// double quotes are trimmed.
#[must_use]
pub fn key_value_pairs(text: &str, separator: char) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(separator)?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect()
}

/// Parses pipe-delimited rows, dropping rows with fewer than `min_fields`
/// fields.
#[must_use]
pub fn pipe_rows(text: &str, min_fields: usize) -> Vec<Vec<String>> {
    delimited_rows(text, '|', min_fields)
}

/// Parses tab-delimited rows, dropping rows with fewer than `min_fields`
/// fields.
#[must_use]
pub fn tab_rows(text: &str, min_fields: usize) -> Vec<Vec<String>> {
    delimited_rows(text, '\t', min_fields)
}

fn delimited_rows(text: &str, delimiter: char, min_fields: usize) -> Vec<Vec<String>> {
    text.lines()
        .filter_map(|line| {
            if line.is_empty() {
                return None;
            }
            let fields: Vec<String> = line
                .split(delimiter)
                .map(|f| f.trim().to_string())
                .collect();
            (fields.len() >= min_fields).then_some(fields)
        })
        .collect()
}

/// One entry of a long-format directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name
    pub name: String,
    /// Permission string as printed (e.g. `drwxr-xr-x`)
    pub permissions: String,
    /// Owning user
    pub owner: String,
    /// Owning group
    pub group: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time reconstructed from the listing
    pub modified: Option<DateTime<Utc>>,
    /// Whether the entry is a directory
    pub is_directory: bool,
}

/// Parses `ls -l` output into [`DirEntry`] records.
///
/// `now` anchors the reconstruction of listing timestamps: within the last
/// six months `ls` prints `Mon DD HH:MM`, older entries print `Mon DD YYYY`.
/// The two are told apart by the presence of a colon. Short lines, the
/// `total N` header, and unparseable sizes are dropped.
#[must_use]
pub fn directory_listing(text: &str, now: DateTime<Utc>) -> Vec<DirEntry> {
    text.lines()
        .filter_map(|line| {
            let cols = columns(line, 9)?;
            let permissions = cols[0];
            // Permission strings start with the type character; anything else
            // (e.g. the "total 42" line) is not an entry
            if !permissions.starts_with(['-', 'd', 'l', 'b', 'c', 's', 'p']) {
                return None;
            }
            let size: u64 = cols[4].parse().ok()?;
            let modified = listing_timestamp(cols[5], cols[6], cols[7], now);
            Some(DirEntry {
                name: cols[8..].join(" "),
                permissions: permissions.to_string(),
                owner: cols[2].to_string(),
                group: cols[3].to_string(),
                size,
                modified,
                is_directory: permissions.starts_with('d'),
            })
        })
        .collect()
}

/// Reconstructs a listing timestamp from its three fields.
///
/// A colon in the third field marks a time of day (entry within the last six
/// months, year taken relative to `now`); otherwise the field is the year and
/// the time of day is unknown (midnight).
fn listing_timestamp(
    month: &str,
    day: &str,
    time_or_year: &str,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let month = month_number(month)?;
    let day: u32 = day.parse().ok()?;

    let (year, hour, minute) = if let Some((h, m)) = time_or_year.split_once(':') {
        let hour: u32 = h.parse().ok()?;
        let minute: u32 = m.parse().ok()?;
        // The listing only guarantees the entry is recent; a month/day ahead
        // of "now" means it belongs to the previous year
        let candidate = NaiveDate::from_ymd_opt(now.year(), month, day)?;
        let year = if candidate > now.date_naive() {
            now.year() - 1
        } else {
            now.year()
        };
        (year, hour, minute)
    } else {
        let year: i32 = time_or_year.parse().ok()?;
        (year, 0, 0)
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn month_number(month: &str) -> Option<u32> {
    match month {
        "Jan" => Some(1),
        "Feb" => Some(2),
        "Mar" => Some(3),
        "Apr" => Some(4),
        "May" => Some(5),
        "Jun" => Some(6),
        "Jul" => Some(7),
        "Aug" => Some(8),
        "Sep" => Some(9),
        "Oct" => Some(10),
        "Nov" => Some(11),
        "Dec" => Some(12),
        _ => None,
    }
}
