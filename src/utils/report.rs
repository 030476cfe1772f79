// src/utils/report.rs

//! Formatting helpers for run output.
//!
//! Everything goes through the `log` facade so the binary's logger decides
//! where it lands and at which level it is filtered.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a success message
pub fn success(message: &str) {
    log::info!("✓ {}", message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in items {
        log::info!("    {:<width$}  {}", key, value, width = width);
    }
}
