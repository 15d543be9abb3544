//! Protocol version negotiation (component D).
//!
//! The wire protocol version controls which encodings a column may use:
//! V1 is ASCII-only, V2 adds binary doubles and double arrays, V3 adds the
//! binary decimal encoding. `Auto` defers the choice to a per-endpoint
//! negotiation against the server's reported capabilities.

use std::fmt;

/// The wire protocol version, as configured or negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
    V3,
}

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 3] = [Self::V1, Self::V2, Self::V3];

    pub fn as_u8(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    pub fn supports_binary(self) -> bool {
        self >= Self::V2
    }

    pub fn supports_decimal(self) -> bool {
        self >= Self::V3
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Either a pinned version or `auto`, driving negotiation on first flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersionSetting {
    Pinned(ProtocolVersion),
    Auto,
}

impl ProtocolVersionSetting {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("auto") {
            return Some(Self::Auto);
        }
        let v: u8 = s.parse().ok()?;
        ProtocolVersion::from_u8(v).map(Self::Pinned)
    }
}

impl fmt::Display for ProtocolVersionSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pinned(v) => write!(f, "{v}"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Picks the active version for an endpoint given the configured setting
/// and the set of versions the server reports supporting.
///
/// If `setting` pins a version, that version is used regardless of what the
/// server supports (the caller asked for it explicitly). If `setting` is
/// `auto`, the highest version in `server_supported` that this client also
/// understands is chosen; if `server_supported` is empty (the server
/// answered but advertised nothing, or didn't answer at all), the client
/// falls back to V1.
pub fn negotiate(
    setting: ProtocolVersionSetting,
    server_supported: &[ProtocolVersion],
) -> ProtocolVersion {
    match setting {
        ProtocolVersionSetting::Pinned(v) => v,
        ProtocolVersionSetting::Auto => server_supported
            .iter()
            .copied()
            .max()
            .unwrap_or(ProtocolVersion::V1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_reflects_feature_tiers() {
        assert!(ProtocolVersion::V1 < ProtocolVersion::V2);
        assert!(ProtocolVersion::V2 < ProtocolVersion::V3);
        assert!(!ProtocolVersion::V1.supports_binary());
        assert!(ProtocolVersion::V2.supports_binary());
        assert!(!ProtocolVersion::V2.supports_decimal());
        assert!(ProtocolVersion::V3.supports_decimal());
    }

    #[test]
    fn setting_parses_numeric_and_auto() {
        assert_eq!(
            ProtocolVersionSetting::parse("1"),
            Some(ProtocolVersionSetting::Pinned(ProtocolVersion::V1))
        );
        assert_eq!(
            ProtocolVersionSetting::parse("AUTO"),
            Some(ProtocolVersionSetting::Auto)
        );
        assert_eq!(ProtocolVersionSetting::parse("4"), None);
        assert_eq!(ProtocolVersionSetting::parse("bogus"), None);
    }

    #[test]
    fn negotiation_picks_highest_mutually_supported() {
        let picked = negotiate(
            ProtocolVersionSetting::Auto,
            &[ProtocolVersion::V1, ProtocolVersion::V3],
        );
        assert_eq!(picked, ProtocolVersion::V3);
    }

    #[test]
    fn negotiation_falls_back_to_v1_when_server_reports_nothing() {
        let picked = negotiate(ProtocolVersionSetting::Auto, &[]);
        assert_eq!(picked, ProtocolVersion::V1);
    }

    #[test]
    fn pinned_setting_ignores_server_capabilities() {
        let picked = negotiate(
            ProtocolVersionSetting::Pinned(ProtocolVersion::V1),
            &[ProtocolVersion::V3],
        );
        assert_eq!(picked, ProtocolVersion::V1);
    }
}
