//! Command: print version information.

/// Version string baked in by the build script, or the crate version.
#[must_use]
pub fn current() -> &'static str {
    option_env!("PROVISION_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the provision version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("provision {}", current());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_is_not_empty() {
        assert!(!current().is_empty());
    }
}
