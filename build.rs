//! Stamps the build date shown by `pdx-cli version`.
//!
//! `SOURCE_DATE_EPOCH` pins the stamp for reproducible builds.

use time::OffsetDateTime;

fn build_instant() -> OffsetDateTime {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
}

fn main() {
    let instant = build_instant();
    let stamp = |description: &str| {
        time::format_description::parse(description)
            .ok()
            .and_then(|items| instant.format(&items).ok())
            .unwrap_or_else(|| "unknown".to_string())
    };

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rustc-env=PDX_BUILD_DATE={}", stamp("[year]-[month]-[day]"));
    println!("cargo:rustc-env=PDX_BUILD_TIME={}", stamp("[hour]:[minute]:[second] UTC"));
}
