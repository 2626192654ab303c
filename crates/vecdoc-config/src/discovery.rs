use std::path::PathBuf;

const EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// Files `StoreConfig::load(None)` looks at, highest priority first:
/// `./vecdoc.<ext>` then `~/.vecdoc/config.<ext>`.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = EXTENSIONS
        .iter()
        .map(|ext| PathBuf::from(format!("vecdoc.{ext}")))
        .collect();

    if let Some(home) = dirs::home_dir() {
        let dir = home.join(".vecdoc");
        paths.extend(EXTENSIONS.iter().map(|ext| dir.join(format!("config.{ext}"))));
    }

    paths
}

pub(crate) fn first_existing() -> Option<PathBuf> {
    candidate_paths().into_iter().find(|path| path.is_file())
}
