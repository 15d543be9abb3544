//! The validated, immutable [`Options`] record produced by [`super::parse`].

use crate::address::{Address, AddressList};
use crate::error::{Error, Result};
use crate::protocol::ProtocolVersionSetting;

/// Wire scheme, determining transport and default port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Tcp,
    Tcps,
}

impl Scheme {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            "tcp" => Some(Self::Tcp),
            "tcps" => Some(Self::Tcps),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Tcp => "tcp",
            Self::Tcps => "tcps",
        }
    }

    pub fn is_http(self) -> bool {
        matches!(self, Self::Http | Self::Https)
    }

    pub fn is_tls(self) -> bool {
        matches!(self, Self::Https | Self::Tcps)
    }

    pub fn default_port(self) -> u16 {
        if self.is_http() {
            9000
        } else {
            9009
        }
    }
}

/// TLS peer-verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVerify {
    On,
    UnsafeOff,
}

impl TlsVerify {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "on" => Some(Self::On),
            "unsafe_off" => Some(Self::UnsafeOff),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::UnsafeOff => "unsafe_off",
        }
    }
}

/// Authentication material, shaped by which keys were present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    /// HTTP Basic.
    Basic { username: String, password: String },
    /// HTTP Bearer.
    Bearer { token: String },
    /// TCP(S) ECDSA challenge/response: `username` identifies the key,
    /// `token` is the base64-encoded PKCS#8 private key material.
    Ecdsa { username: String, token: String },
}

/// A threshold that may be disabled (`-1` / `off` in the configuration
/// string) or set to a positive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    Off,
    Value(u64),
}

impl Threshold {
    fn parse(s: &str) -> Result<Self> {
        if s == "off" || s == "-1" {
            return Ok(Self::Off);
        }
        s.parse::<u64>()
            .map(Self::Value)
            .map_err(|_| Error::config_parse(format!("Invalid numeric value '{s}'")))
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn value(self) -> Option<u64> {
        match self {
            Self::Off => None,
            Self::Value(v) => Some(v),
        }
    }
}

/// The fully validated, immutable configuration for a [`crate::Sender`].
///
/// Produced exclusively by [`super::parse`]; there is no public mutable
/// setter, so a parsed `Options` value's canonical serialization never
/// drifts out from under it.
#[derive(Debug, Clone)]
pub struct Options {
    pub scheme: Scheme,
    pub addresses: AddressList,
    pub protocol_version: ProtocolVersionSetting,
    pub auth: Auth,
    pub tls_verify: TlsVerify,

    pub init_buf_size: usize,
    pub max_buf_size: usize,
    pub max_name_len: usize,

    pub auto_flush: bool,
    pub auto_flush_rows: Threshold,
    pub auto_flush_bytes: Threshold,
    pub auto_flush_interval: Threshold,

    pub auth_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub retry_timeout_ms: u64,
    pub request_min_throughput: u64,

    pub gzip: bool,

    /// PEM-encoded client certificate and private key (HTTP(S) mutual TLS),
    /// concatenated the way `reqwest::Identity::from_pem` expects. Not
    /// reachable from the configuration-string grammar (`§6` names no key
    /// for it); set programmatically via [`OptionsBuilder::client_cert`].
    pub client_cert: Option<Vec<u8>>,
}

impl Options {
    /// Starts a builder for programmatic construction, as an alternative to
    /// [`super::parse`] for callers who'd rather not build a configuration
    /// string by hand.
    pub fn builder(scheme: Scheme, addresses: Vec<Address>) -> OptionsBuilder {
        OptionsBuilder::new(scheme, addresses)
    }

    /// Renders the canonical configuration string: recognized keys in
    /// alphabetical order, defaults inlined, trailing semicolon on every
    /// entry.
    pub fn to_conf_str(&self) -> String {
        let mut out = format!("{}::", self.scheme.as_str());

        for addr in self.addresses.all() {
            out.push_str(&format!("addr={addr};"));
        }
        out.push_str(&format!("auth_timeout={};", self.auth_timeout_ms));
        out.push_str(&format!(
            "auto_flush={};",
            if self.auto_flush { "on" } else { "off" }
        ));
        out.push_str(&format!(
            "auto_flush_bytes={};",
            threshold_str(self.auto_flush_bytes)
        ));
        out.push_str(&format!(
            "auto_flush_interval={};",
            threshold_str(self.auto_flush_interval)
        ));
        out.push_str(&format!(
            "auto_flush_rows={};",
            threshold_str(self.auto_flush_rows)
        ));
        if self.scheme.is_http() {
            out.push_str(&format!("gzip={};", if self.gzip { "on" } else { "off" }));
        }
        out.push_str(&format!("init_buf_size={};", self.init_buf_size));
        out.push_str(&format!("max_buf_size={};", self.max_buf_size));
        out.push_str(&format!("max_name_len={};", self.max_name_len));
        if let Auth::Basic { password, .. } = &self.auth {
            out.push_str(&format!("password={password};"));
        }
        out.push_str(&format!("protocol_version={};", self.protocol_version));
        out.push_str(&format!(
            "request_min_throughput={};",
            self.request_min_throughput
        ));
        out.push_str(&format!("request_timeout={};", self.request_timeout_ms));
        out.push_str(&format!("retry_timeout={};", self.retry_timeout_ms));
        if self.scheme.is_tls() {
            out.push_str(&format!("tls_verify={};", self.tls_verify.as_str()));
        }
        match &self.auth {
            Auth::Bearer { token } => out.push_str(&format!("token={token};")),
            Auth::Ecdsa { token, .. } => out.push_str(&format!("token={token};")),
            _ => {}
        }
        match &self.auth {
            Auth::Basic { username, .. } | Auth::Ecdsa { username, .. } => {
                out.push_str(&format!("username={username};"))
            }
            _ => {}
        }
        out
    }
}

fn threshold_str(t: Threshold) -> String {
    match t {
        Threshold::Off => "off".to_string(),
        Threshold::Value(v) => v.to_string(),
    }
}

/// Programmatic builder for [`Options`], for callers who don't want to go
/// through the configuration-string grammar at all.
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    scheme: Scheme,
    addresses: Vec<Address>,
    protocol_version: ProtocolVersionSetting,
    auth: Auth,
    tls_verify: TlsVerify,
    init_buf_size: usize,
    max_buf_size: usize,
    max_name_len: usize,
    auto_flush: bool,
    auto_flush_rows: Threshold,
    auto_flush_bytes: Threshold,
    auto_flush_interval: Threshold,
    auth_timeout_ms: u64,
    request_timeout_ms: u64,
    retry_timeout_ms: u64,
    request_min_throughput: u64,
    gzip: bool,
    client_cert: Option<Vec<u8>>,
}

impl OptionsBuilder {
    pub fn new(scheme: Scheme, addresses: Vec<Address>) -> Self {
        Self {
            scheme,
            addresses,
            protocol_version: ProtocolVersionSetting::Auto,
            auth: Auth::None,
            tls_verify: TlsVerify::On,
            init_buf_size: 65_536,
            max_buf_size: 104_857_600,
            max_name_len: 127,
            auto_flush: true,
            auto_flush_rows: Threshold::Value(75_000),
            auto_flush_bytes: Threshold::Off,
            auto_flush_interval: Threshold::Value(1_000),
            auth_timeout_ms: 15_000,
            request_timeout_ms: 10_000,
            retry_timeout_ms: 10_000,
            request_min_throughput: 102_400,
            gzip: false,
            client_cert: None,
        }
    }

    pub fn protocol_version(mut self, v: ProtocolVersionSetting) -> Self {
        self.protocol_version = v;
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Auth::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer {
            token: token.into(),
        };
        self
    }

    pub fn ecdsa_auth(mut self, username: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth = Auth::Ecdsa {
            username: username.into(),
            token: token.into(),
        };
        self
    }

    pub fn tls_verify(mut self, v: TlsVerify) -> Self {
        self.tls_verify = v;
        self
    }

    pub fn init_buf_size(mut self, v: usize) -> Self {
        self.init_buf_size = v;
        self
    }

    pub fn max_buf_size(mut self, v: usize) -> Self {
        self.max_buf_size = v;
        self
    }

    pub fn max_name_len(mut self, v: usize) -> Self {
        self.max_name_len = v;
        self
    }

    pub fn auto_flush(mut self, on: bool) -> Self {
        self.auto_flush = on;
        self
    }

    pub fn auto_flush_rows(mut self, v: Threshold) -> Self {
        self.auto_flush_rows = v;
        self
    }

    pub fn auto_flush_bytes(mut self, v: Threshold) -> Self {
        self.auto_flush_bytes = v;
        self
    }

    pub fn auto_flush_interval(mut self, v: Threshold) -> Self {
        self.auto_flush_interval = v;
        self
    }

    pub fn gzip(mut self, on: bool) -> Self {
        self.gzip = on;
        self
    }

    /// Sets an HTTP(S) client certificate: PEM-encoded certificate and
    /// private key, concatenated in the form `reqwest::Identity::from_pem`
    /// expects. Rejected at `build()` time for a `tcp`/`tcps` scheme: mutual
    /// TLS client certificates only make sense over HTTP(S).
    pub fn client_cert(mut self, pem: Vec<u8>) -> Self {
        self.client_cert = Some(pem);
        self
    }

    pub fn build(self) -> Result<Options> {
        if self.addresses.is_empty() {
            return Err(Error::config_parse("at least one address is required"));
        }
        if self.client_cert.is_some() && !self.scheme.is_http() {
            return Err(Error::unsupported(format!(
                "'client_cert' is only valid for http/https, not '{}'",
                self.scheme.as_str()
            )));
        }
        Ok(Options {
            scheme: self.scheme,
            addresses: AddressList::new(self.addresses),
            protocol_version: self.protocol_version,
            auth: self.auth,
            tls_verify: self.tls_verify,
            init_buf_size: self.init_buf_size,
            max_buf_size: self.max_buf_size,
            max_name_len: self.max_name_len,
            auto_flush: self.auto_flush,
            auto_flush_rows: self.auto_flush_rows,
            auto_flush_bytes: self.auto_flush_bytes,
            auto_flush_interval: self.auto_flush_interval,
            auth_timeout_ms: self.auth_timeout_ms,
            request_timeout_ms: self.request_timeout_ms,
            retry_timeout_ms: self.retry_timeout_ms,
            request_min_throughput: self.request_min_throughput,
            gzip: self.gzip,
            client_cert: self.client_cert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_match_scheme() {
        assert_eq!(Scheme::Http.default_port(), 9000);
        assert_eq!(Scheme::Https.default_port(), 9000);
        assert_eq!(Scheme::Tcp.default_port(), 9009);
        assert_eq!(Scheme::Tcps.default_port(), 9009);
    }

    #[test]
    fn threshold_parses_off_variants() {
        assert_eq!(Threshold::parse("off").unwrap(), Threshold::Off);
        assert_eq!(Threshold::parse("-1").unwrap(), Threshold::Off);
        assert_eq!(Threshold::parse("42").unwrap(), Threshold::Value(42));
        assert!(Threshold::parse("nope").is_err());
    }

    #[test]
    fn builder_requires_at_least_one_address() {
        let result = OptionsBuilder::new(Scheme::Http, vec![]).build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_produces_documented_defaults() {
        let opts = OptionsBuilder::new(Scheme::Http, vec![Address::new("localhost", 9000)])
            .build()
            .unwrap();
        assert_eq!(opts.init_buf_size, 65_536);
        assert_eq!(opts.max_buf_size, 104_857_600);
        assert_eq!(opts.max_name_len, 127);
        assert_eq!(opts.auto_flush_rows, Threshold::Value(75_000));
        assert_eq!(opts.auto_flush_interval, Threshold::Value(1_000));
        assert_eq!(opts.auto_flush_bytes, Threshold::Off);
        assert_eq!(opts.auth_timeout_ms, 15_000);
        assert_eq!(opts.request_timeout_ms, 10_000);
        assert_eq!(opts.retry_timeout_ms, 10_000);
        assert_eq!(opts.request_min_throughput, 102_400);
        assert_eq!(opts.client_cert, None);
    }

    #[test]
    fn client_cert_is_rejected_on_a_non_http_scheme() {
        let result = OptionsBuilder::new(Scheme::Tcp, vec![Address::new("localhost", 9009)])
            .client_cert(b"pem bytes".to_vec())
            .build();
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[test]
    fn client_cert_carries_through_to_the_built_options() {
        let opts = OptionsBuilder::new(Scheme::Https, vec![Address::new("localhost", 9000)])
            .client_cert(b"pem bytes".to_vec())
            .build()
            .unwrap();
        assert_eq!(opts.client_cert.as_deref(), Some(&b"pem bytes"[..]));
    }
}
