//! Client-side ingestion library for streaming rows to QuestDB over the
//! InfluxDB Line Protocol (ILP), across HTTP(S) and raw TCP(S).
//!
//! # Architecture
//!
//! - [`address`] (component B): a cyclic cursor over configured endpoints.
//! - [`config`] (component A): parses the `<scheme>::(key=value;)+`
//!   configuration string into a validated [`config::Options`].
//! - [`protocol`] (component D): picks the active wire protocol version,
//!   pinned or negotiated against server capabilities.
//! - [`buffer`] (component C): the chunked row builder and its typed
//!   column encoders.
//! - [`auth`] (component E): ECDSA P-256 challenge/response signing for
//!   TCP authentication.
//! - [`transport`] (component G): the HTTP and TCP wire transports.
//! - [`sender`] (component F): ties the above together behind one fluent
//!   API, including auto-flush, transactions and retry.
//!
//! # Quick start
//!
//! ```rust
//! use ilp_sender::config;
//!
//! let options = config::parse("http::addr=localhost:9000;").unwrap();
//! assert_eq!(options.scheme, ilp_sender::config::Scheme::Http);
//! ```

pub mod address;
pub mod auth;
pub mod buffer;
pub mod config;
pub mod error;
pub mod protocol;
pub mod sender;
pub mod transport;

pub use address::{Address, AddressList};
pub use buffer::{Buffer, DecimalValue, NdArrayF64};
pub use config::{Auth as ConfigAuth, Options, Scheme};
pub use error::{Error, Result};
pub use protocol::{ProtocolVersion, ProtocolVersionSetting};
pub use sender::{RetryPolicy, Sender};
pub use transport::http::HttpTransport;
pub use transport::socket::SocketTransport;
pub use transport::Transport;

/// The crate version, as set by `CARGO_PKG_VERSION`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
