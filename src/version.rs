//! Version information.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `User-Agent` sent on outbound HTTP requests: `bragi/{version}`.
pub fn user_agent() -> String {
    format!("{}/{PKG_VERSION}", env!("CARGO_PKG_NAME"))
}
