//! Transport configuration passed to every connection the client opens.
//!
//! # Design
//! The two TLS toggles are plain fields on a value the caller owns. The
//! client never consults the process environment on its own; `from_env` is
//! an explicit opt-in for applications that want environment-level control.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Set to `true` to disable TLS certificate verification.
pub const DISABLE_HOSTNAME_VERIFICATION_ENV: &str = "FLUENT_HTTP_DISABLE_HOSTNAME_VERIFICATION";

/// Path to a PEM file with the client certificate chain and private key.
pub const CLIENT_IDENTITY_ENV: &str = "FLUENT_HTTP_CLIENT_IDENTITY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub tls: TlsConfig,
}

/// TLS options applied to `https` connections only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Accept any server certificate for any host name.
    ///
    /// INSECURE: only for trusted internal or test environments.
    pub disable_hostname_verification: bool,

    /// PEM file holding the client certificate chain and its private key,
    /// presented for certificate-based client authentication.
    pub client_identity: Option<PathBuf>,
}

impl ClientConfig {
    /// Read the two TLS opt-ins from the environment.
    ///
    /// The verification bypass is enabled only by the value `true` (any
    /// case). An empty identity path counts as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let disable_hostname_verification = lookup(DISABLE_HOSTNAME_VERIFICATION_ENV)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let client_identity = lookup(CLIENT_IDENTITY_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Self {
            tls: TlsConfig {
                disable_hostname_verification,
                client_identity,
            },
        }
    }
}
