//! The row-building and flushing front door of the ingestion library
//! (component F).
//!
//! [`Sender`] owns a [`Buffer`] and a [`Transport`], wires up the
//! configured [`RetryPolicy`], and evaluates the auto-flush thresholds
//! inline at the end of every row; there's no background timer task
//! polling the clock between calls. Only one [`Sender`] drives a given
//! transport at a time, which is why neither type needs to be `Sync`.

pub mod retry;

pub use retry::RetryPolicy;

use std::time::Instant;

use tracing::{debug, trace, warn};

use crate::auth::Signer;
use crate::buffer::{Buffer, DecimalValue, NdArrayF64};
use crate::config::{Auth, Options, Threshold};
use crate::error::{Error, Result};
use crate::protocol::{negotiate, ProtocolVersion, ProtocolVersionSetting};
use crate::transport::http::HttpTransport;
use crate::transport::socket::SocketTransport;
use crate::transport::Transport;
use retry::Deadline;

struct AutoFlushThresholds {
    enabled: bool,
    rows: Threshold,
    bytes: Threshold,
    interval_ms: Threshold,
}

impl AutoFlushThresholds {
    fn from_options(options: &Options) -> Self {
        Self {
            enabled: options.auto_flush,
            rows: options.auto_flush_rows,
            bytes: options.auto_flush_bytes,
            interval_ms: options.auto_flush_interval,
        }
    }

    fn should_flush(&self, buffer: &Buffer, elapsed_since_last_flush: std::time::Duration) -> bool {
        if !self.enabled {
            return false;
        }
        if let Threshold::Value(n) = self.rows {
            if buffer.row_count() as u64 >= n {
                return true;
            }
        }
        if let Threshold::Value(n) = self.bytes {
            if buffer.length() as u64 >= n {
                return true;
            }
        }
        if let Threshold::Value(ms) = self.interval_ms {
            if elapsed_since_last_flush.as_millis() as u64 >= ms {
                return true;
            }
        }
        false
    }
}

/// Which table a transaction in progress is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TransactionState {
    None,
    Open { table: String },
}

/// Builds rows and flushes them to a QuestDB endpoint.
pub struct Sender {
    transport: Box<dyn Transport>,
    buffer: Buffer,
    protocol_version_setting: ProtocolVersionSetting,
    negotiated: bool,
    retry_policy: RetryPolicy,
    auto_flush: AutoFlushThresholds,
    last_flush_at: Instant,
    transaction: TransactionState,
}

impl Sender {
    pub fn new(transport: Box<dyn Transport>, options: &Options) -> Self {
        let buffer = Buffer::new(options.init_buf_size, options.max_buf_size, options.max_name_len);
        Self {
            transport,
            buffer,
            protocol_version_setting: options.protocol_version,
            negotiated: matches!(options.protocol_version, ProtocolVersionSetting::Pinned(_)),
            retry_policy: RetryPolicy::new(options.retry_timeout_ms),
            auto_flush: AutoFlushThresholds::from_options(options),
            last_flush_at: Instant::now(),
            transaction: TransactionState::None,
        }
    }

    /// Builds the transport matching `options.scheme` (HTTP(S) or raw
    /// TCP(S), with TLS and the ECDSA challenge/response handshake wired up
    /// as needed) and, for `auto` protocol-version configurations, eagerly
    /// negotiates against the server's advertised capabilities before
    /// returning, so every row built afterwards is already encoded against
    /// the final negotiated version, rather than drifting from V1 to
    /// whatever `auto` resolves to at first flush.
    pub async fn connect(options: &Options) -> Result<Self> {
        let transport: Box<dyn Transport> = if options.scheme.is_http() {
            Box::new(HttpTransport::new(
                options.addresses.clone(),
                options.scheme,
                options.auth.clone(),
                options.gzip,
                std::time::Duration::from_millis(options.request_timeout_ms),
                options.request_min_throughput,
                options.client_cert.clone(),
            )?)
        } else {
            let tls_config = if options.scheme.is_tls() {
                Some(crate::transport::socket::build_tls_config(
                    options.tls_verify,
                )?)
            } else {
                None
            };
            let signer = match &options.auth {
                Auth::Ecdsa { username, token } => Some(Signer::new(username, token)?),
                _ => None,
            };
            let address = options.addresses.current().clone();
            Box::new(
                SocketTransport::connect(
                    &address,
                    tls_config,
                    signer.as_ref(),
                    std::time::Duration::from_millis(options.auth_timeout_ms),
                    options.init_buf_size,
                )
                .await?,
            )
        };

        let mut sender = Self::new(transport, options);
        if !sender.negotiated {
            let server_supported = sender.transport.discover_protocol_versions().await?;
            sender.negotiate_with(&server_supported);
        }
        Ok(sender)
    }

    /// Pins the negotiated protocol version directly, skipping
    /// server-capability discovery. Used when the configuration already
    /// pins a version, or once negotiation has completed once for an
    /// `auto` configuration.
    pub fn set_negotiated_version(&mut self, version: ProtocolVersion) {
        self.buffer.set_protocol_version(version);
        self.negotiated = true;
    }

    /// Negotiates the active protocol version against a server's reported
    /// capabilities, if this hasn't happened yet for an `auto`
    /// configuration.
    pub fn negotiate_with(&mut self, server_supported: &[ProtocolVersion]) {
        if self.negotiated {
            return;
        }
        let version = negotiate(self.protocol_version_setting, server_supported);
        debug!(?version, "negotiated protocol version");
        self.set_negotiated_version(version);
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn table(&mut self, name: &str) -> Result<&mut Self> {
        self.check_transaction_table(name)?;
        self.buffer.table(name)?;
        Ok(self)
    }

    fn check_transaction_table(&self, name: &str) -> Result<()> {
        if let TransactionState::Open { table } = &self.transaction {
            if table != name {
                return Err(Error::invalid_api_call(format!(
                    "an open transaction is restricted to table '{table}', cannot write to '{name}'"
                )));
            }
        }
        Ok(())
    }

    pub fn symbol(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        self.buffer.symbol(name, value)?;
        Ok(self)
    }

    pub fn column_bool(&mut self, name: &str, value: bool) -> Result<&mut Self> {
        self.buffer.column_bool(name, value)?;
        Ok(self)
    }

    pub fn column_long(&mut self, name: &str, value: i64) -> Result<&mut Self> {
        self.buffer.column_long(name, value)?;
        Ok(self)
    }

    pub fn column_str(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        self.buffer.column_str(name, value)?;
        Ok(self)
    }

    pub fn column_f64(&mut self, name: &str, value: f64) -> Result<&mut Self> {
        self.buffer.column_f64(name, value)?;
        Ok(self)
    }

    pub fn column_ts_micros(&mut self, name: &str, epoch_us: i64) -> Result<&mut Self> {
        self.buffer.column_ts_micros(name, epoch_us)?;
        Ok(self)
    }

    pub fn column_ts_nanos(&mut self, name: &str, epoch_ns: i64) -> Result<&mut Self> {
        self.buffer.column_ts_nanos(name, epoch_ns)?;
        Ok(self)
    }

    pub fn column_array_f64(&mut self, name: &str, array: &NdArrayF64) -> Result<&mut Self> {
        self.buffer.column_array_f64(name, array)?;
        Ok(self)
    }

    pub fn column_decimal(&mut self, name: &str, value: &DecimalValue) -> Result<&mut Self> {
        self.buffer.column_decimal(name, value)?;
        Ok(self)
    }

    pub fn cancel_row(&mut self) {
        self.buffer.cancel_row();
    }

    /// Finalizes the row with an explicit designated timestamp, then
    /// evaluates the auto-flush thresholds.
    pub async fn at_nanos(&mut self, epoch_ns: i64) -> Result<()> {
        self.buffer.at_nanos(epoch_ns)?;
        self.maybe_auto_flush().await
    }

    /// Finalizes the row, letting the server assign the timestamp, then
    /// evaluates the auto-flush thresholds.
    pub async fn at_now(&mut self) -> Result<()> {
        self.buffer.at_now()?;
        self.maybe_auto_flush().await
    }

    async fn maybe_auto_flush(&mut self) -> Result<()> {
        if matches!(self.transaction, TransactionState::Open { .. }) {
            // transactions are committed explicitly; auto-flush never fires mid-transaction
            return Ok(());
        }
        if self
            .auto_flush
            .should_flush(&self.buffer, self.last_flush_at.elapsed())
        {
            trace!("auto-flush threshold reached");
            self.flush().await?;
        }
        Ok(())
    }

    /// Starts an HTTP-only, single-table transaction. The buffer must be
    /// empty when this is called.
    pub async fn begin_transaction(&mut self, table: &str) -> Result<()> {
        if !self.buffer.is_empty() {
            return Err(Error::invalid_api_call(
                "begin_transaction requires an empty buffer",
            ));
        }
        if self.transaction != TransactionState::None {
            return Err(Error::invalid_api_call(
                "a transaction is already open",
            ));
        }
        self.transport.begin_transaction(table).await?;
        self.transaction = TransactionState::Open {
            table: table.to_string(),
        };
        Ok(())
    }

    /// Flushes the buffered rows and closes the transaction, all-or-nothing.
    pub async fn commit(&mut self) -> Result<()> {
        if self.transaction == TransactionState::None {
            return Err(Error::invalid_api_call("no transaction is open to commit"));
        }
        self.flush_with_retry().await?;
        self.transport.commit_transaction().await?;
        self.transaction = TransactionState::None;
        Ok(())
    }

    /// Discards the buffered rows and closes the transaction without
    /// sending anything.
    pub async fn rollback(&mut self) -> Result<()> {
        if self.transaction == TransactionState::None {
            return Err(Error::invalid_api_call(
                "no transaction is open to roll back",
            ));
        }
        self.buffer.clear();
        self.transport.rollback_transaction().await?;
        self.transaction = TransactionState::None;
        Ok(())
    }

    /// Sends every buffered row, retrying retriable failures until the
    /// configured retry deadline elapses.
    pub async fn flush(&mut self) -> Result<()> {
        if matches!(self.transaction, TransactionState::Open { .. }) {
            return Err(Error::invalid_api_call(
                "flush() cannot be called while a transaction is open; use commit()/rollback()",
            ));
        }
        self.flush_with_retry().await
    }

    async fn flush_with_retry(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let deadline = Deadline::start(&self.retry_policy);
        let mut attempt = 0u32;
        loop {
            match self.transport.flush(&self.buffer).await {
                Ok(()) => {
                    debug!(rows = self.buffer.row_count(), "flush succeeded");
                    self.buffer.clear();
                    self.last_flush_at = Instant::now();
                    return Ok(());
                }
                Err(e) if e.is_retriable(None) && !deadline.has_expired() => {
                    let backoff = self.retry_policy.backoff_for(attempt);
                    warn!(attempt, ?backoff, error = %e, "flush failed, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Drops chunks beyond the buffer's current cursor. The spec's public
    /// API names this `truncate`; [`Buffer::trim_excess`] is the same
    /// operation under the name this crate uses internally.
    pub fn truncate(&mut self) {
        self.buffer.trim_excess();
    }

    pub fn row_count(&self) -> usize {
        self.buffer.row_count()
    }

    /// Bytes currently buffered and not yet flushed.
    pub fn length(&self) -> usize {
        self.buffer.length()
    }

    /// Whether a transaction is currently open (`begin_transaction` called,
    /// not yet `commit`ted or rolled back).
    pub fn within_transaction(&self) -> bool {
        self.transaction != TransactionState::None
    }

    /// Alias for [`Self::flush`], for callers that think in terms of
    /// "sending" a batch of rows rather than "flushing" a buffer.
    pub async fn send_async(&mut self) -> Result<()> {
        self.flush().await
    }

    /// Blocking wrapper over [`Self::send_async`], for callers not already
    /// inside a Tokio runtime. Spins up a lightweight current-thread
    /// runtime for the one call; prefer `send_async` directly if you're
    /// already driving the sender from async code.
    pub fn send(&mut self) -> Result<()> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::socket(format!("failed to start blocking runtime: {e}")))?;
        rt.block_on(self.send_async())
    }

    /// Alias for [`Self::commit`], kept alongside [`Self::send_async`] for
    /// naming symmetry.
    pub async fn commit_async(&mut self) -> Result<()> {
        self.commit().await
    }
}
