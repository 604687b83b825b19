//! Build metadata shared across the binary and the library.
//! This includes the generated version.rs from the build script into a core module,
//! providing a single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Crate version from the manifest
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// One-line banner used in the startup log
pub fn banner() -> String {
    format!(
        "finewatch {} ({}, built {})",
        version(),
        git_hash(),
        build_time()
    )
}
