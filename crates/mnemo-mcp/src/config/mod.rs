//! Configuration resolution.

/// Default TCP listen address.
const DEFAULT_ADDR: &str = "127.0.0.1:8714";

/// Resolve the TCP listen address: explicit flag, then `MNEMO_ADDR`, then
/// the default.
pub fn resolve_listen_addr(explicit: Option<&str>) -> String {
    if let Some(addr) = explicit {
        return addr.to_string();
    }

    if let Ok(addr) = std::env::var("MNEMO_ADDR") {
        return addr;
    }

    DEFAULT_ADDR.to_string()
}
