use std::path::Path;

fn main() {
    // Embedded dashboard assets (relative to Cargo.toml)
    let web_assets_path = Path::new("web");

    if !web_assets_path.exists() {
        println!("cargo:warning=Dashboard assets directory doesn't exist. Creating placeholder...");
        if let Err(e) = std::fs::create_dir_all(web_assets_path) {
            println!("cargo:warning=Failed to create web assets directory: {}", e);
        }
    }

    // Re-embed when the dashboard changes
    println!("cargo:rerun-if-changed=web");
    println!("cargo:rerun-if-changed=build.rs");
}
