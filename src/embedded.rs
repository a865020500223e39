use rust_embed::RustEmbed;

/// Embedded dashboard assets, compiled into the binary.
/// Path is relative to Cargo.toml.
#[derive(RustEmbed)]
#[folder = "web"]
pub struct WebAssets;
