//! Configuration surface: the whitespace-delimited plugin list, search
//! path management, and the plugin-directory batch helper.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// One token from a parsed plugin list: a name and whether it was marked
/// critical with a trailing `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginToken {
    pub name: String,
    pub critical: bool,
}

/// Split a whitespace-delimited plugin list into tokens, stripping the
/// trailing `!` critical marker from each name.
pub fn parse_plugin_list(list: &str) -> Vec<PluginToken> {
    list.split_whitespace()
        .map(|tok| match tok.strip_suffix('!') {
            Some(name) => PluginToken {
                name: name.to_string(),
                critical: true,
            },
            None => PluginToken {
                name: tok.to_string(),
                critical: false,
            },
        })
        .collect()
}

/// The compile-time default filename formula: `<path>/libstrongswan-<name>.so`.
pub fn default_plugin_filename(name: &str) -> String {
    format!("libstrongswan-{name}.so")
}

/// Search `search_paths` in order, then `default_path` if supplied, for
/// `libstrongswan-<name>.so`. Returns the first existing candidate.
pub fn locate_plugin_file(
    name: &str,
    search_paths: &[PathBuf],
    default_path: Option<&Path>,
) -> Option<PathBuf> {
    let filename = default_plugin_filename(name);
    search_paths
        .iter()
        .map(|p| p.join(&filename))
        .chain(default_path.map(|p| p.join(&filename)))
        .find(|candidate| candidate.exists())
}

/// Transform a plugin name the way the symbol-name and directory-batch
/// rules both do: `-` becomes `_`.
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Given a base directory and a whitespace-delimited plugin list, compute
/// the `<base>/<n>/.libs` search path for each name `n` (the plugin
/// directory batch helper). Names are taken verbatim from the list
/// (ignoring any trailing `!`, since criticality is not a path concern).
///
/// Fails if any name normalizes to the empty string (e.g. a bare `!` or
/// a name made up entirely of `-`), since that would join to `base`
/// itself rather than a per-plugin subdirectory.
pub fn plugin_directory_search_paths(base: &Path, list: &str) -> Result<Vec<PathBuf>, ConfigError> {
    parse_plugin_list(list)
        .into_iter()
        .map(|tok| {
            let normalized = normalize_name(&tok.name);
            if normalized.is_empty() {
                return Err(ConfigError::EmptyName(tok.name));
            }
            Ok(base.join(normalized).join(".libs"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_critical_marker() {
        let toks = parse_plugin_list("random test-vectors! db-sqlite");
        assert_eq!(
            toks,
            vec![
                PluginToken { name: "random".into(), critical: false },
                PluginToken { name: "test-vectors".into(), critical: true },
                PluginToken { name: "db-sqlite".into(), critical: false },
            ]
        );
    }

    #[test]
    fn handles_repeated_whitespace() {
        let toks = parse_plugin_list("  a   b!  ");
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn directory_batch_helper_normalizes_nothing_but_joins_libs() {
        let base = Path::new("/opt/strongswan/plugins");
        let paths = plugin_directory_search_paths(base, "random test-vectors!").unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/opt/strongswan/plugins/random/.libs"),
                PathBuf::from("/opt/strongswan/plugins/test_vectors/.libs"),
            ]
        );
    }

    #[test]
    fn directory_batch_helper_rejects_empty_name() {
        let base = Path::new("/opt/strongswan/plugins");
        let err = plugin_directory_search_paths(base, "random !").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyName(name) if name.is_empty()));
    }
}
