use std::path::{Path, PathBuf};

/// Case-insensitive batch order: directory first, then `_`-prefixed "lead"
/// names, then the lowercased file name. The raw path breaks remaining ties
/// so the order is total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    dir: String,
    not_lead: bool,
    name: String,
    raw: PathBuf,
}

pub fn sort_key(path: &Path) -> SortKey {
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    SortKey {
        dir,
        not_lead: !name.starts_with('_'),
        name,
        raw: path.to_path_buf(),
    }
}

pub fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|p| sort_key(p));
}
