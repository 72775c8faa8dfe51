//! Command: print version information.

/// Build version, overridable at compile time with `AGENTLINK_VERSION`.
pub const VERSION: &str = match option_env!("AGENTLINK_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// Print the agentlink version to stdout.
pub fn run() {
    println!("agentlink {VERSION}");
}
