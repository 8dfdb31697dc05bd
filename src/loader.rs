use crate::error::EsgResult;
use crate::schema::canonical_header;
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;

/// An uploaded table: canonical headers plus the raw data rows.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub headers: StringRecord,
    /// Headers as uploaded, aligned with `headers`.
    pub source_headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl Dataset {
    pub fn from_path(path: impl AsRef<Path>) -> EsgResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Read CSV from any source. Cells that are not valid UTF-8 are decoded
    /// as Latin-1, which covers spreadsheet exports from older tools.
    pub fn from_reader<R: Read>(reader: R) -> EsgResult<Self> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
        let source_headers = decode(rdr.byte_headers()?);
        let headers: StringRecord = source_headers.iter().map(canonical_header).collect();

        let mut rows = Vec::new();
        for result in rdr.byte_records() {
            let record = result?;
            rows.push(decode(&record));
        }
        tracing::debug!(columns = headers.len(), rows = rows.len(), "dataset loaded");
        Ok(Dataset {
            headers,
            source_headers,
            rows,
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn decode(record: &ByteRecord) -> StringRecord {
    record
        .iter()
        .map(|field| match std::str::from_utf8(field) {
            Ok(s) => s.to_string(),
            Err(_) => field.iter().map(|&b| b as char).collect(),
        })
        .collect()
}
