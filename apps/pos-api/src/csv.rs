//! Minimal RFC 4180 writer for the report exports.
//!
//! ```text
//! Order Number,Customer Name,Item
//! TC2610190042,"Sharma, Anil","12"" Pizza"\r\n
//!                ▲ comma → quoted   ▲ quote → doubled, quoted
//! ```
//!
//! Lines end in CRLF. A field is quoted only when it contains a comma,
//! a double quote, CR or LF.

/// Builds a CSV document in memory.
#[derive(Debug, Default)]
pub struct CsvWriter {
    buf: String,
    rows: usize,
}

impl CsvWriter {
    /// Starts a document with its header row.
    pub fn with_headers(headers: &[&str]) -> Self {
        let mut writer = CsvWriter::default();
        writer.write_record(headers.iter().copied());
        writer.rows = 0;
        writer
    }

    /// Appends one record.
    pub fn row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write_record(fields);
    }

    /// Data rows written so far, header excluded.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn finish(self) -> String {
        self.buf
    }

    fn write_record<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            push_field(&mut self.buf, field.as_ref());
        }
        self.buf.push_str("\r\n");
        self.rows += 1;
    }
}

fn needs_quoting(field: &str) -> bool {
    field.contains([',', '"', '\r', '\n'])
}

fn push_field(buf: &mut String, field: &str) {
    if needs_quoting(field) {
        buf.push('"');
        buf.push_str(&field.replace('"', "\"\""));
        buf.push('"');
    } else {
        buf.push_str(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields_are_not_quoted() {
        let mut csv = CsvWriter::with_headers(&["Name", "Qty"]);
        csv.row(["Latte", "2"]);
        assert_eq!(csv.finish(), "Name,Qty\r\nLatte,2\r\n");
    }

    #[test]
    fn test_special_characters_are_quoted() {
        let mut csv = CsvWriter::with_headers(&["Name"]);
        csv.row(["Sharma, Anil"]);
        csv.row(["12\" Pizza"]);
        csv.row(["two\nlines"]);
        assert_eq!(
            csv.finish(),
            "Name\r\n\"Sharma, Anil\"\r\n\"12\"\" Pizza\"\r\n\"two\nlines\"\r\n"
        );
    }

    #[test]
    fn test_row_count_excludes_header() {
        let mut csv = CsvWriter::with_headers(&["A", "B"]);
        assert!(csv.is_empty());
        csv.row(vec![String::from("1"), String::new()]);
        assert_eq!(csv.len(), 1);
        assert!(csv.finish().ends_with("1,\r\n"));
    }
}
