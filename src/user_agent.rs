//! User-Agent strings for library site traffic.
//!
//! Library login pages reject obvious bot agents, so the handshake presents
//! a desktop browser agent. The tool's own identifier appears in log
//! output only, never on the wire.

/// Desktop Firefox agent accepted by the supported library sites.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:138.0) Gecko/20100101 Firefox/138.0";

/// Default User-Agent for library session and catalog requests.
#[must_use]
pub(crate) fn default_library_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}

/// Identifier used in log output for this tool's version.
#[must_use]
pub fn tool_identifier() -> String {
    format!("libtrack/{}", env!("CARGO_PKG_VERSION"))
}
