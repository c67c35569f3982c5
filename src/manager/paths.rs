//! Path checks and storage-key derivation.

/// Whether `path` is acceptable as the logical path of an extra file: it
/// must be relative, stay under its root and contain no control characters.
pub fn is_path_valid(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains("..")
        && !path.chars().any(|c| c.is_control() || c == '\\')
}

/// Whether `path` is acceptable as a location (route) path.
pub fn is_location_path_valid(path: &str) -> bool {
    !path.is_empty() && !path.contains("..") && !path.chars().any(char::is_control)
}

/// Flattens a logical path into a config map key: every character outside
/// `[A-Za-z0-9._-]` becomes `_`.
pub fn convert_path_to_config_map_key(path: &str) -> String {
    path.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
