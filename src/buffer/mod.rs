//! The line-protocol row builder (component C).
//!
//! [`Buffer`] accumulates ILP-encoded rows into a bounded chunk list
//! ([`chunk::ChunkList`]) through a single mutable fluent API: `table`,
//! `symbol`, the `column_*` family, then one of `at`/`at_now`/`at_nanos` to
//! terminate the row. Unlike a typestate builder that encodes legality in
//! the type system, row-building state lives in one `RowState` field and
//! illegal call orders return `Err` rather than failing to compile. The
//! call sequence is usually decided by data at runtime, not known at
//! compile time.

pub mod array;
pub mod chunk;
pub mod decimal;
pub mod encode;
pub mod escape;
pub mod validate;

pub use array::NdArrayF64;
pub use decimal::DecimalValue;

use crate::error::{Error, Result};
use crate::protocol::ProtocolVersion;
use chunk::{Checkpoint, ChunkList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    /// No row in progress; `table` starts one.
    NotStarted,
    /// Table name written, no symbols or columns yet.
    Table,
    /// At least one symbol written; more symbols or the first column may
    /// follow.
    Symbols,
    /// At least one column written; only more columns or finalization may
    /// follow.
    Columns,
}

/// A bounded, chunked accumulator of encoded line-protocol rows.
#[derive(Debug)]
pub struct Buffer {
    chunks: ChunkList,
    max_buf_size: usize,
    max_name_len: usize,
    protocol_version: ProtocolVersion,
    row_count: usize,
    state: RowState,
    row_checkpoint: Checkpoint,
}

impl Buffer {
    pub fn new(init_buf_size: usize, max_buf_size: usize, max_name_len: usize) -> Self {
        let chunks = ChunkList::new(init_buf_size);
        let row_checkpoint = chunks.checkpoint();
        Self {
            chunks,
            max_buf_size,
            max_name_len,
            protocol_version: ProtocolVersion::V1,
            row_count: 0,
            state: RowState::NotStarted,
            row_checkpoint,
        }
    }

    /// Sets the protocol version governing which column encodings are
    /// accepted. Changing this mid-row has no effect on the row already in
    /// progress; it only gates the next `column_*` call.
    pub fn set_protocol_version(&mut self, version: ProtocolVersion) {
        self.protocol_version = version;
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn length(&self) -> usize {
        self.chunks.length()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.length() == 0
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.chunks.length() + bytes.len() > self.max_buf_size {
            return Err(Error::invalid_api_call(format!(
                "writing {} more bytes would exceed max_buf_size of {} bytes",
                bytes.len(),
                self.max_buf_size
            )));
        }
        self.chunks.put(bytes)
    }

    /// Starts a new row with the given table name.
    pub fn table(&mut self, name: &str) -> Result<&mut Self> {
        if self.state != RowState::NotStarted {
            return Err(Error::invalid_api_call(
                "table() must be the first call of a new row",
            ));
        }
        validate::validate_table_name(name, self.max_name_len)?;
        self.row_checkpoint = self.chunks.checkpoint();
        self.write(escape::escape_unquoted(name).as_bytes())?;
        self.state = RowState::Table;
        Ok(self)
    }

    /// Appends a symbol (tag) column: `,<name>=<value>`.
    pub fn symbol(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        match self.state {
            RowState::Table | RowState::Symbols => {}
            RowState::NotStarted => {
                return Err(Error::invalid_api_call("symbol() called before table()"))
            }
            RowState::Columns => {
                return Err(Error::invalid_api_call(
                    "symbol() called after a column has already been written",
                ))
            }
        }
        validate::validate_column_name(name, self.max_name_len)?;
        self.write(b",")?;
        self.write(escape::escape_unquoted(name).as_bytes())?;
        self.write(b"=")?;
        self.write(escape::escape_unquoted(value).as_bytes())?;
        self.state = RowState::Symbols;
        Ok(self)
    }

    /// Writes the separator preceding a column: ` ` for the first column in
    /// the row, `,` for every subsequent one.
    fn begin_column(&mut self, name: &str) -> Result<()> {
        match self.state {
            RowState::NotStarted => {
                return Err(Error::invalid_api_call("column call before table()"))
            }
            RowState::Table | RowState::Symbols => {
                self.write(b" ")?;
            }
            RowState::Columns => {
                self.write(b",")?;
            }
        }
        validate::validate_column_name(name, self.max_name_len)?;
        self.write(escape::escape_unquoted(name).as_bytes())?;
        self.write(b"=")?;
        self.state = RowState::Columns;
        Ok(())
    }

    pub fn column_bool(&mut self, name: &str, value: bool) -> Result<&mut Self> {
        self.begin_column(name)?;
        self.write(encode::encode_bool_ascii(value).as_bytes())?;
        Ok(self)
    }

    pub fn column_long(&mut self, name: &str, value: i64) -> Result<&mut Self> {
        self.begin_column(name)?;
        let encoded = encode::encode_long_ascii(value)?;
        self.write(encoded.as_bytes())?;
        Ok(self)
    }

    pub fn column_str(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        self.begin_column(name)?;
        self.write(b"\"")?;
        self.write(escape::escape_quoted(value).as_bytes())?;
        self.write(b"\"")?;
        Ok(self)
    }

    /// Writes a double column. V1 uses the ASCII scientific form; V2+ uses
    /// the binary encoding.
    pub fn column_f64(&mut self, name: &str, value: f64) -> Result<&mut Self> {
        self.begin_column(name)?;
        if self.protocol_version.supports_binary() {
            self.write(&encode::encode_double_binary(value))?;
        } else {
            self.write(encode::format_double_ascii(value).as_bytes())?;
        }
        Ok(self)
    }

    /// Writes a column timestamp, microsecond precision (the `t` suffix).
    pub fn column_ts_micros(&mut self, name: &str, epoch_us: i64) -> Result<&mut Self> {
        self.begin_column(name)?;
        self.write(encode::encode_timestamp_micros_ascii(epoch_us).as_bytes())?;
        Ok(self)
    }

    /// Writes a column timestamp, nanosecond precision (the `n` suffix,
    /// V2+ only).
    pub fn column_ts_nanos(&mut self, name: &str, epoch_ns: i64) -> Result<&mut Self> {
        if !self.protocol_version.supports_binary() {
            return Err(Error::protocol_version(
                "nanosecond column timestamps require protocol version 2 or later",
            ));
        }
        self.begin_column(name)?;
        self.write(encode::encode_timestamp_nanos_ascii(epoch_ns).as_bytes())?;
        Ok(self)
    }

    /// Writes a binary double-array column. Requires protocol version 2 or
    /// later.
    pub fn column_array_f64(&mut self, name: &str, array: &NdArrayF64) -> Result<&mut Self> {
        if !self.protocol_version.supports_binary() {
            return Err(Error::protocol_version(
                "array columns require protocol version 2 or later",
            ));
        }
        self.begin_column(name)?;
        self.write(&array::encode_array_f64(array))?;
        Ok(self)
    }

    /// Writes a binary decimal column. Requires protocol version 3.
    pub fn column_decimal(&mut self, name: &str, value: &DecimalValue) -> Result<&mut Self> {
        if !self.protocol_version.supports_decimal() {
            return Err(Error::protocol_version(
                "decimal columns require protocol version 3",
            ));
        }
        self.begin_column(name)?;
        self.write(&decimal::encode_decimal(value))?;
        Ok(self)
    }

    /// Finalizes the row with an explicit designated timestamp.
    pub fn at_nanos(&mut self, epoch_ns: i64) -> Result<()> {
        self.finalize(Some(epoch_ns))
    }

    /// Finalizes the row, letting the server assign the designated
    /// timestamp.
    pub fn at_now(&mut self) -> Result<()> {
        self.finalize(None)
    }

    fn finalize(&mut self, epoch_ns: Option<i64>) -> Result<()> {
        if self.state == RowState::NotStarted {
            return Err(Error::invalid_api_call(
                "at()/at_now() called with no table set for this row",
            ));
        }
        if let Some(ts) = epoch_ns {
            self.write(b" ")?;
            self.write(encode::encode_designated_timestamp_ascii(ts).as_bytes())?;
        }
        self.write(b"\n")?;
        self.row_count += 1;
        self.state = RowState::NotStarted;
        self.row_checkpoint = self.chunks.checkpoint();
        Ok(())
    }

    /// Discards the row currently in progress, rewinding the buffer to the
    /// state before `table()` was called. A no-op mistake after a row has
    /// already been finalized by `at*`, since there's nothing left to cancel.
    pub fn cancel_row(&mut self) {
        if self.state != RowState::NotStarted {
            self.chunks.restore(self.row_checkpoint);
            self.state = RowState::NotStarted;
        }
    }

    /// Whether a row is currently in progress (`table()` called, not yet
    /// finalized).
    pub fn has_pending_row(&self) -> bool {
        self.state != RowState::NotStarted
    }

    /// Clears all buffered rows and resets the row counter.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.row_count = 0;
        self.state = RowState::NotStarted;
        self.row_checkpoint = self.chunks.checkpoint();
    }

    /// Drops chunks beyond the current cursor, shrinking memory use back
    /// toward `init_buf_size` after a burst of unusually large rows.
    pub fn trim_excess(&mut self) {
        self.chunks.trim_excess();
    }

    /// Bytes belonging to chunk `i`, for a transport writing the buffer out
    /// without copying it into one contiguous allocation first.
    pub fn chunk_bytes(&self, i: usize) -> &[u8] {
        self.chunks.chunk_bytes(i)
    }

    pub fn chunk_count_to_write(&self) -> usize {
        self.chunks.chunk_count_to_write()
    }

    /// Copies the full buffered contents into one contiguous `Vec<u8>`.
    /// Transports prefer [`Self::chunk_bytes`] to avoid this copy; this is
    /// for tests and small one-shot callers.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        for i in 0..self.chunk_count_to_write() {
            out.extend_from_slice(self.chunk_bytes(i));
        }
        out
    }
}
