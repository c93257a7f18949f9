//! Build Configuration
//!
//! Reads build defaults from an optional yate.toml in the
//! working directory. Command-line flags can only switch an
//! option on, never off.
//!

use crate::common::toml;
use super::OutputFormat;
use std::fs;
use std::path::Path;

// ------------------------------------------------------------- Public Consts

/// Project config file looked up in the working directory.
///
pub const YATE_TOML: &str = "yate.toml";

// ------------------------------------------------------------- Public Types

/// Settings from the `[build]` section.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildConfig {
    /// Emit a CommonJS module instead of a browser script.
    ///
    pub module: bool,
    /// Prefix the output with the JavaScript runtime.
    ///
    pub bundle: bool,
}

// ------------------------------------------------------------- Public Implementations

impl BuildConfig {
    /// Loads the config at `path`. A missing or unreadable file
    /// gives the defaults.
    ///
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .map(|content| Self::parse(&content))
            .unwrap_or_default()
    }

    pub fn parse(content: &str) -> Self {
        Self {
            module: toml::parse_section_bool(content, "build", "module").unwrap_or(false),
            bundle: toml::parse_section_bool(content, "build", "bundle").unwrap_or(false),
        }
    }

    /// Turns on every option set by a flag.
    ///
    pub fn with_flags(self, module: bool, bundle: bool) -> Self {
        Self {
            module: self.module || module,
            bundle: self.bundle || bundle,
        }
    }

    pub fn format(&self) -> OutputFormat {
        if self.module {
            OutputFormat::Module
        } else {
            OutputFormat::Script
        }
    }
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_build_section() {
        let config = BuildConfig::parse(
            r#"
[build]
module = true
# bundle = true
"#,
        );
        assert_eq!(
            config,
            BuildConfig {
                module: true,
                bundle: false
            }
        );
        assert_eq!(config.format(), OutputFormat::Module);
    }

    #[test]
    fn test_flags_only_switch_on() {
        let config = BuildConfig {
            module: true,
            bundle: false,
        };
        assert_eq!(
            config.with_flags(false, true),
            BuildConfig {
                module: true,
                bundle: true
            }
        );
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let dir = TempDir::new().unwrap();
        let config = BuildConfig::load(&dir.path().join(YATE_TOML));
        assert_eq!(config, BuildConfig::default());
        assert_eq!(config.format(), OutputFormat::Script);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(YATE_TOML);
        fs::write(&path, "[build]\nbundle = true\n").unwrap();

        assert!(BuildConfig::load(&path).bundle);
    }
}
