//! Export the compiler version for the `User-Agent` header.

fn main() {
    let version = rustc_version::version()
        .map(|version| format!("{}.{}.{}", version.major, version.minor, version.patch))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=XFAPI_RUSTC_VERSION={version}");
    println!("cargo:rerun-if-env-changed=RUSTC");
}
