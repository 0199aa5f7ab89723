use crate::config::GrammarConfig;
use std::path::Path;

/// Base name used for tokenizing: directory and extension removed, then a trailing
/// `_<processed suffix>` (e.g. `_Cinematica`) removed when present.
pub fn file_stem<'a>(file_name: &'a str, grammar: &GrammarConfig) -> &'a str {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    match stem.rsplit_once('_') {
        Some((base, suffix)) if grammar.processed_suffixes.iter().any(|s| s == suffix) => base,
        _ => stem,
    }
}
