//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `recordstore_core` linkage.
//! - Show where a store for the given app name would live on this machine.

use recordstore_core::StoreConfig;

const DEFAULT_APP_NAME: &str = "RecordStore";

fn main() {
    let app_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
    let config = StoreConfig::new(app_name);

    println!("recordstore_core ping={}", recordstore_core::ping());
    println!("recordstore_core version={}", recordstore_core::core_version());
    match config.store_path() {
        Ok(path) => println!("recordstore_core store_path={}", path.display()),
        Err(err) => println!("recordstore_core store_path_error={err}"),
    }
}
