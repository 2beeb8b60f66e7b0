use std::cmp::Ordering;
use std::mem::size_of;

/// A parsed record line of the form `{number}. {text}`.
///
/// `raw` is the canonical formatting for records built in memory, but for records recovered by
/// [`Record::parse`] it is the exact bytes of the input line, so that a round trip through the sort
/// preserves the line byte-for-byte.
#[derive(Debug, Clone)]
pub struct Record {
    number: i64,
    text: String,
    raw: String,
}

/// Two-character field separator between the number and the text of a record.
const SEPARATOR: &str = ". ";

impl Record {
    /// Build a record from its fields, computing the canonical `raw` formatting.
    pub fn new(number: i64, text: String) -> Record {
        let raw = format!("{number}{SEPARATOR}{text}");
        Record { number, text, raw }
    }

    /// Parse one input line. Returns `None` if the line does not contain the separator at a
    /// position greater than zero, or the substring before it does not parse as an i64.
    ///
    /// `line` must already have its line terminator (`\n` or `\r\n`) stripped; the remaining
    /// content, as given, becomes `raw`.
    pub fn parse(line: &str) -> Option<Record> {
        let sep_pos = line.find(SEPARATOR)?;
        if sep_pos == 0 {
            return None;
        }
        let number: i64 = line[..sep_pos].parse().ok()?;
        let text = line[sep_pos + SEPARATOR.len()..].to_string();
        Some(Record {
            number,
            text,
            raw: line.to_string(),
        })
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The exact line to write to output: original input bytes for parsed records, canonical
    /// `{number}. {text}` formatting for records built with [`Record::new`].
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Oversized, encoding-agnostic estimate of this record's in-memory footprint, used to decide
    /// when to flush a chunk. Intentionally over-counts to approximate allocator/`String` overhead
    /// without querying the runtime.
    pub fn memory_estimate(&self) -> usize {
        self.raw.len() * 2 + size_of::<usize>()
    }
}

impl Eq for Record {}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    /// Total order: `text` ascending as a byte/codepoint-ordinal sequence, then `number` ascending.
    fn cmp(&self, other: &Self) -> Ordering {
        self.text
            .cmp(&other.text)
            .then_with(|| self.number.cmp(&other.number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_record() {
        let record = Record::parse("415. Apple").unwrap();
        assert_eq!(record.number(), 415);
        assert_eq!(record.text(), "Apple");
        assert_eq!(record.raw(), "415. Apple");
    }

    #[test]
    fn parses_negative_number() {
        let record = Record::parse("-5. Banana").unwrap();
        assert_eq!(record.number(), -5);
        assert_eq!(record.text(), "Banana");
    }

    #[test]
    fn parses_empty_text() {
        let record = Record::parse("7. ").unwrap();
        assert_eq!(record.text(), "");
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(Record::parse("100 Apple").is_none());
    }

    #[test]
    fn rejects_empty_line() {
        assert!(Record::parse("").is_none());
    }

    #[test]
    fn rejects_whitespace_only_line() {
        assert!(Record::parse("   ").is_none());
    }

    #[test]
    fn rejects_non_numeric_prefix() {
        assert!(Record::parse("abc. text").is_none());
    }

    #[test]
    fn rejects_separator_at_position_zero() {
        assert!(Record::parse(". leading separator").is_none());
    }

    #[test]
    fn orders_by_text_then_number() {
        let apple_1 = Record::new(1, "Apple".to_string());
        let apple_75 = Record::new(75, "Apple".to_string());
        let banana_5 = Record::new(5, "Banana".to_string());
        assert!(apple_1 < apple_75);
        assert!(apple_75 < banana_5);
    }

    #[test]
    fn preserves_raw_bytes_on_round_trip() {
        let record = Record::parse("3. trailing text with. periods").unwrap();
        assert_eq!(record.raw(), "3. trailing text with. periods");
    }

    #[test]
    fn equality_ignores_raw() {
        let a = Record::new(1, "Apple".to_string());
        let b = Record::parse("1. Apple").unwrap();
        assert_eq!(a, b);
    }
}
