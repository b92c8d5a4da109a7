//! `quill.toml` loading and parsing.
//!
//! Discovery prefers a `quill.toml` in the working directory, then the
//! platform config directory. Unknown fields are ignored so old binaries
//! tolerate newer files; a missing file yields defaults.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
pub struct EditorSection {
    /// Cells per tab stop.
    #[serde(default = "EditorSection::default_tab_size")]
    pub tab_size: usize,
    /// Journal coalescing window in milliseconds.
    #[serde(default = "EditorSection::default_undo_coalesce_ms")]
    pub undo_coalesce_ms: u64,
    /// Persist `{journal, cursor, modtime}` snapshots across runs.
    #[serde(default)]
    pub save_session: bool,
}

impl EditorSection {
    const fn default_tab_size() -> usize {
        4
    }
    const fn default_undo_coalesce_ms() -> u64 {
        500
    }
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            tab_size: Self::default_tab_size(),
            undo_coalesce_ms: Self::default_undo_coalesce_ms(),
            save_session: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrollSection {
    /// Rows kept between the cursor and the viewport edge.
    #[serde(default = "ScrollSection::default_margin")]
    pub margin: usize,
}

impl ScrollSection {
    const fn default_margin() -> usize {
        2
    }
}

impl Default for ScrollSection {
    fn default() -> Self {
        Self {
            margin: Self::default_margin(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub editor: EditorSection,
    #[serde(default)]
    pub scroll: ScrollSection,
}

#[derive(Debug, Default, Clone)]
pub struct Config {
    /// Original file text, when one was read.
    pub raw: Option<String>,
    pub file: ConfigFile,
}

impl Config {
    /// Tab size with degenerate values floored to one cell.
    pub fn tab_size(&self) -> usize {
        self.file.editor.tab_size.max(1)
    }

    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.file.editor.undo_coalesce_ms)
    }

    pub fn vertical_margin(&self) -> usize {
        self.file.scroll.margin
    }

    pub fn save_session(&self) -> bool {
        self.file.editor.save_session
    }
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("quill.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("quill").join("quill.toml");
    }
    PathBuf::from("quill.toml")
}

/// Directory for persisted session snapshots.
pub fn state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quill")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => {
            let file = toml::from_str::<ConfigFile>(&content)?;
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                file,
            })
        }
        Err(_) => {
            info!(target: "config", path = %path.display(), "config_missing_using_defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_a_file() {
        let cfg = Config::default();
        assert_eq!(cfg.tab_size(), 4);
        assert_eq!(cfg.coalesce_window(), Duration::from_millis(500));
        assert_eq!(cfg.vertical_margin(), 2);
        assert!(!cfg.save_session());
    }

    #[test]
    fn parses_known_fields_ignores_unknown() {
        let toml_text = r#"
            [editor]
            tab_size = 8
            undo_coalesce_ms = 250
            save_session = true
            future_option = "ignored"

            [scroll]
            margin = 5
        "#;
        let file: ConfigFile = toml::from_str(toml_text).unwrap();
        let cfg = Config {
            raw: None,
            file,
        };
        assert_eq!(cfg.tab_size(), 8);
        assert_eq!(cfg.coalesce_window(), Duration::from_millis(250));
        assert!(cfg.save_session());
        assert_eq!(cfg.vertical_margin(), 5);
    }

    #[test]
    fn zero_tab_size_is_floored() {
        let file: ConfigFile = toml::from_str("[editor]\ntab_size = 0\n").unwrap();
        let cfg = Config { raw: None, file };
        assert_eq!(cfg.tab_size(), 1);
    }

    #[test]
    fn load_from_reads_a_real_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[editor]\ntab_size = 2").unwrap();
        let cfg = load_from(Some(f.path().to_path_buf())).unwrap();
        assert_eq!(cfg.tab_size(), 2);
        assert!(cfg.raw.is_some());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_from(Some(PathBuf::from("/no/such/quill.toml"))).unwrap();
        assert_eq!(cfg.tab_size(), 4);
        assert!(cfg.raw.is_none());
    }
}
