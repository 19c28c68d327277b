//! Cipher suite properties relevant to constraint negotiation.
//!
//! Properties are derived from the standard suite naming scheme, e.g.
//! `TLS_RSA_WITH_AES_128_CBC_SHA` or `TLS_DH_anon_WITH_AES_128_CBC_SHA`.

/// Markers of suites whose encryption counts as weak.
const WEAK_MARKERS: &[&str] = &["_EXPORT_", "_DES_CBC_", "_DES40_", "_40_", "RC4_40"];

/// What a cipher suite does, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSuite<'a> {
    name: &'a str,
    server_authentication: bool,
    encryption: bool,
    strong_encryption: bool,
}

impl<'a> CipherSuite<'a> {
    /// Derive the properties of the named suite.
    pub fn parse(name: &'a str) -> Self {
        let anonymous = name.contains("_anon_") || name.ends_with("_NULL_WITH_NULL_NULL");
        let encryption = !name.contains("_WITH_NULL_");
        let weak = WEAK_MARKERS.iter().any(|m| name.contains(m));
        Self {
            name,
            server_authentication: !anonymous,
            encryption,
            strong_encryption: encryption && !weak,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Whether the suite authenticates the server.
    pub fn does_server_authentication(&self) -> bool {
        self.server_authentication
    }

    /// Whether the suite encrypts application data.
    pub fn does_encryption(&self) -> bool {
        self.encryption
    }

    pub fn does_strong_encryption(&self) -> bool {
        self.strong_encryption
    }
}
