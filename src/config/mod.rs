//! Configuration-string parser.
//!
//! Parses `<scheme>::(key=value;)+` into a validated [`Options`] record.
//! This is the sole entry point for string-form configuration;
//! [`Options::builder`] is the programmatic alternative.

mod options;

pub use options::{Auth, Options, OptionsBuilder, Scheme, Threshold, TlsVerify};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::protocol::ProtocolVersionSetting;

/// Parses a configuration string of the form
/// `scheme::key=value;key=value;...;` into a validated [`Options`].
///
/// # Examples
///
/// ```rust
/// use ilp_sender::config;
///
/// let opts = config::parse("http::addr=localhost:9000;auto_flush=off;").unwrap();
/// assert_eq!(opts.addresses.current().port, 9000);
/// ```
pub fn parse(conf_str: &str) -> Result<Options> {
    let (scheme_str, rest) = conf_str
        .split_once("::")
        .ok_or_else(|| Error::config_parse("missing '::' after scheme"))?;

    let scheme = Scheme::parse(scheme_str)
        .ok_or_else(|| Error::config_parse(format!("Invalid scheme '{scheme_str}'")))?;

    if !rest.ends_with(';') {
        tracing::warn!(conf_str, "configuration string missing trailing ';'");
        return Err(Error::config_parse(
            "configuration string must end with ';'",
        ));
    }
    let rest = &rest[..rest.len() - 1];

    let mut addrs: Vec<String> = Vec::new();
    let mut auth_timeout_ms: Option<u64> = None;
    let mut auto_flush: Option<bool> = None;
    let mut auto_flush_bytes: Option<Threshold> = None;
    let mut auto_flush_interval: Option<Threshold> = None;
    let mut auto_flush_rows: Option<Threshold> = None;
    let mut gzip: Option<bool> = None;
    let mut init_buf_size: Option<usize> = None;
    let mut max_buf_size: Option<usize> = None;
    let mut max_name_len: Option<usize> = None;
    let mut password: Option<String> = None;
    let mut protocol_version: Option<ProtocolVersionSetting> = None;
    let mut request_min_throughput: Option<u64> = None;
    let mut request_timeout_ms: Option<u64> = None;
    let mut retry_timeout_ms: Option<u64> = None;
    let mut tls_verify: Option<TlsVerify> = None;
    let mut token: Option<String> = None;
    let mut username: Option<String> = None;

    if rest.is_empty() {
        return Err(Error::config_parse("at least one property is required"));
    }

    for entry in rest.split(';') {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| Error::config_parse(format!("Invalid property '{entry}'")))?;

        if key.is_empty() || !key.chars().next().unwrap().is_ascii_lowercase() {
            return Err(Error::config_parse(format!("Invalid property key '{key}'")));
        }

        match key {
            "addr" => addrs.push(value.to_string()),
            "auth_timeout" => auth_timeout_ms = Some(parse_u64(value)?),
            "auto_flush" => auto_flush = Some(parse_bool(value)?),
            "auto_flush_bytes" => auto_flush_bytes = Some(Threshold::parse(value)?),
            "auto_flush_interval" => auto_flush_interval = Some(Threshold::parse(value)?),
            "auto_flush_rows" => auto_flush_rows = Some(Threshold::parse(value)?),
            "gzip" => {
                require_http(scheme, "gzip")?;
                gzip = Some(parse_bool(value)?);
            }
            "init_buf_size" => init_buf_size = Some(parse_usize(value)?),
            "max_buf_size" => max_buf_size = Some(parse_usize(value)?),
            "max_name_len" => max_name_len = Some(parse_usize(value)?),
            "password" => {
                require_http(scheme, "password")?;
                password = Some(value.to_string());
            }
            "protocol_version" => {
                protocol_version = Some(ProtocolVersionSetting::parse(value).ok_or_else(|| {
                    Error::config_parse(format!("Invalid protocol_version '{value}'"))
                })?)
            }
            "request_min_throughput" => request_min_throughput = Some(parse_u64(value)?),
            "request_timeout" => request_timeout_ms = Some(parse_u64(value)?),
            "retry_timeout" => retry_timeout_ms = Some(parse_u64(value)?),
            "tls_verify" => {
                if !scheme.is_tls() {
                    return Err(Error::unsupported(format!(
                        "'tls_verify' is only valid for https/tcps, not '{}'",
                        scheme.as_str()
                    )));
                }
                tls_verify = Some(TlsVerify::parse(value).ok_or_else(|| {
                    Error::config_parse(format!("Invalid tls_verify '{value}'"))
                })?)
            }
            "token" => token = Some(value.to_string()),
            "username" => username = Some(value.to_string()),
            other => {
                tracing::warn!(key = other, "unrecognized configuration property");
                return Err(Error::config_parse(format!("Invalid property '{other}'")));
            }
        }
    }

    if addrs.is_empty() {
        return Err(Error::config_parse("at least one 'addr' is required"));
    }
    let addresses: Vec<Address> = addrs
        .iter()
        .map(|a| parse_host_port(a, scheme.default_port()))
        .collect::<Result<_>>()?;

    let auth = build_auth(scheme, username, password, token)?;

    Ok(Options {
        scheme,
        addresses: crate::address::AddressList::new(addresses),
        protocol_version: protocol_version.unwrap_or(ProtocolVersionSetting::Auto),
        auth,
        tls_verify: tls_verify.unwrap_or(TlsVerify::On),
        init_buf_size: init_buf_size.unwrap_or(65_536),
        max_buf_size: max_buf_size.unwrap_or(104_857_600),
        max_name_len: max_name_len.unwrap_or(127),
        auto_flush: auto_flush.unwrap_or(true),
        auto_flush_rows: auto_flush_rows.unwrap_or(Threshold::Value(75_000)),
        auto_flush_bytes: auto_flush_bytes.unwrap_or(Threshold::Off),
        auto_flush_interval: auto_flush_interval.unwrap_or(Threshold::Value(1_000)),
        auth_timeout_ms: auth_timeout_ms.unwrap_or(15_000),
        request_timeout_ms: request_timeout_ms.unwrap_or(10_000),
        retry_timeout_ms: retry_timeout_ms.unwrap_or(10_000),
        request_min_throughput: request_min_throughput.unwrap_or(102_400),
        gzip: gzip.unwrap_or(false),
        // Not reachable from the config-string grammar; set via
        // `OptionsBuilder::client_cert` instead.
        client_cert: None,
    })
}

fn require_http(scheme: Scheme, key: &str) -> Result<()> {
    if scheme.is_http() {
        Ok(())
    } else {
        Err(Error::unsupported(format!(
            "'{key}' is only valid for http/https, not '{}'",
            scheme.as_str()
        )))
    }
}

fn build_auth(
    scheme: Scheme,
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
) -> Result<Auth> {
    match (scheme.is_http(), username, password, token) {
        (_, None, None, None) => Ok(Auth::None),
        (true, Some(username), Some(password), None) => Ok(Auth::Basic { username, password }),
        (true, None, None, Some(token)) => Ok(Auth::Bearer { token }),
        (false, Some(username), None, Some(token)) => Ok(Auth::Ecdsa { username, token }),
        _ => Err(Error::config_parse(
            "inconsistent authentication properties for the given scheme",
        )),
    }
}

fn parse_host_port(s: &str, default_port: u16) -> Result<Address> {
    if let Some(rest) = s.strip_prefix('[') {
        // IPv6 literal: [addr]:port or [addr]
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| Error::config_parse(format!("Invalid address '{s}'")))?;
        let port = match after.strip_prefix(':') {
            Some(p) if !p.is_empty() => parse_port(p)?,
            Some(_) => default_port,
            None => default_port,
        };
        return Ok(Address::new(host, port));
    }

    match s.rsplit_once(':') {
        Some((host, port_str)) if !host.is_empty() && port_str.chars().all(|c| c.is_ascii_digit()) && !port_str.is_empty() => {
            Ok(Address::new(host, parse_port(port_str)?))
        }
        _ => {
            if s.is_empty() {
                return Err(Error::config_parse("empty address"));
            }
            Ok(Address::new(s, default_port))
        }
    }
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse::<u16>()
        .map_err(|_| Error::config_parse(format!("Invalid port '{s}'")))
}

fn parse_bool(s: &str) -> Result<bool> {
    match s {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(Error::config_parse(format!(
            "Invalid boolean value '{other}'"
        ))),
    }
}

fn parse_u64(s: &str) -> Result<u64> {
    s.parse().map_err(|_| Error::config_parse(format!("Invalid numeric value '{s}'")))
}

fn parse_usize(s: &str) -> Result<usize> {
    s.parse().map_err(|_| Error::config_parse(format!("Invalid numeric value '{s}'")))
}
