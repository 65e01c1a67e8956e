//! Delimited extract files: the staged dimension extracts and the bulk buffer
//! files handed to [`Warehouse::bulk_load`](crate::Warehouse::bulk_load).
//!
//! Extracts are always written in Windows-1252 with CRLF line endings, the
//! code page the warehouse loads natively. Source files are read with a
//! caller-chosen encoding.

use std::io::{Read, Write};

use encoding_rs::{Encoding, WINDOWS_1252};

use crate::{Error, Result, sentinel::PLACEHOLDER, warehouse::Row};

/// Code page of every extract this crate writes.
pub static EXTRACT_ENCODING: &Encoding = WINDOWS_1252;

/// Layout of an extract file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractFormat {
  pub delimiter:  u8,
  /// The first line holds column names and is skipped on load.
  pub has_header: bool,
  /// Text written for a null cell.
  pub null_text:  &'static str,
}

impl ExtractFormat {
  /// `;`-separated with a header row; nulls written as `_?_`.
  pub const fn staged() -> Self {
    Self { delimiter: b';', has_header: true, null_text: PLACEHOLDER }
  }

  /// Tab-separated, no header; nulls written as the empty string.
  pub const fn bulk() -> Self { Self { delimiter: b'\t', has_header: false, null_text: "" } }

  pub const fn with_null_text(mut self, null_text: &'static str) -> Self {
    self.null_text = null_text;
    self
  }
}

/// Resolve an encoding label such as `windows-1252`, `latin1` or `utf-8`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
  Encoding::for_label(label.trim().as_bytes())
    .ok_or_else(|| Error::UnknownEncoding(label.to_owned()))
}

// ─── Writing ─────────────────────────────────────────────────────────────────

/// Writes rows to an extract, one CSV-formatted line at a time, transcoding
/// each line to [`EXTRACT_ENCODING`].
pub struct ExtractWriter<W: Write> {
  inner:       W,
  line:        csv::Writer<Vec<u8>>,
  format:      ExtractFormat,
  rows:        u64,
  lossy_lines: u64,
}

impl<W: Write> ExtractWriter<W> {
  pub fn new(inner: W, format: ExtractFormat) -> Self {
    let line = Self::line_writer(format);
    Self { inner, line, format, rows: 0, lossy_lines: 0 }
  }

  fn line_writer(format: ExtractFormat) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
      .delimiter(format.delimiter)
      .terminator(csv::Terminator::CRLF)
      .quote_style(csv::QuoteStyle::Necessary)
      .flexible(true)
      .from_writer(Vec::new())
  }

  pub fn write_header(&mut self, columns: &[&str]) -> Result<()> {
    self.line.write_record(columns)?;
    self.emit_line()
  }

  pub fn write_row(&mut self, row: &[Option<String>]) -> Result<()> {
    let null_text = self.format.null_text;
    self
      .line
      .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or(null_text)))?;
    self.emit_line()?;
    self.rows += 1;
    Ok(())
  }

  /// Number of data rows written so far.
  pub fn rows(&self) -> u64 { self.rows }

  /// Number of lines that held characters outside [`EXTRACT_ENCODING`].
  /// Those characters are written as `&#NNN;` references.
  pub fn lossy_lines(&self) -> u64 { self.lossy_lines }

  pub fn finish(mut self) -> Result<W> {
    self.inner.flush()?;
    Ok(self.inner)
  }

  fn emit_line(&mut self) -> Result<()> {
    self.line.flush()?;
    let line = std::mem::replace(&mut self.line, Self::line_writer(self.format));
    let bytes = line.into_inner().map_err(|e| e.into_error())?;
    let text = String::from_utf8_lossy(&bytes);
    let (encoded, _, lossy) = EXTRACT_ENCODING.encode(&text);
    if lossy {
      self.lossy_lines += 1;
      let mut buf = [0u8; 4];
      let unmapped = text
        .chars()
        .filter(|c| EXTRACT_ENCODING.encode(c.encode_utf8(&mut buf)).2)
        .count();
      tracing::warn!(
        line = self.rows + 1,
        unmapped,
        encoding = EXTRACT_ENCODING.name(),
        "characters not representable in extract encoding written as numeric references"
      );
    }
    self.inner.write_all(&encoded)?;
    Ok(())
  }
}

// ─── Reading ─────────────────────────────────────────────────────────────────

/// Build a lenient CSV reader: rows may have differing field counts and
/// fields may be double-quoted.
pub fn reader<R: Read>(input: R, delimiter: u8, has_headers: bool) -> csv::Reader<R> {
  csv::ReaderBuilder::new()
    .delimiter(delimiter)
    .has_headers(has_headers)
    .flexible(true)
    .quote(b'"')
    .from_reader(input)
}

/// Decode every field of a raw record.
pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Vec<String> {
  record
    .iter()
    .map(|field| {
      let (text, _) = encoding.decode_without_bom_handling(field);
      text.into_owned()
    })
    .collect()
}

/// Streams the rows of an extract written in `format`, mapping empty fields
/// to `None`.
pub struct ExtractReader<R: Read> {
  inner:  csv::Reader<R>,
  record: csv::ByteRecord,
}

impl<R: Read> ExtractReader<R> {
  pub fn new(input: R, format: ExtractFormat) -> Self {
    Self {
      inner:  reader(input, format.delimiter, format.has_header),
      record: csv::ByteRecord::new(),
    }
  }

  /// The next row, or `None` at end of input.
  pub fn next_row(&mut self) -> Result<Option<Row>> {
    if !self.inner.read_byte_record(&mut self.record)? {
      return Ok(None);
    }
    let row = decode_record(&self.record, EXTRACT_ENCODING)
      .into_iter()
      .map(|field| (!field.is_empty()).then_some(field))
      .collect();
    Ok(Some(row))
  }
}

/// Read a whole extract written in `format` into memory.
pub fn read_extract<R: Read>(input: R, format: ExtractFormat) -> Result<Vec<Row>> {
  let mut rdr = ExtractReader::new(input, format);
  let mut rows = Vec::new();
  while let Some(row) = rdr.next_row()? {
    rows.push(row);
  }
  Ok(rows)
}
