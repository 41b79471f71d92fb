//! `BoardConfig`: one board manifest, typed and as a raw JSON tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::upload::UploadOptions;
use crate::BoardError;

/// Read-only board metadata.
///
/// The typed sections cover what the build and upload steps consume; the raw
/// JSON tree is kept for [`BoardConfig::get`] so that any manifest key can be
/// queried by dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    /// Human-readable board name.
    pub name: String,
    /// Compiler-facing CPU description.
    pub build: BuildSection,
    /// Debug-probe settings.
    pub debug: DebugSection,
    /// Upload toggles.
    pub upload: UploadOptions,
    raw: Value,
}

/// `build` section of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildSection {
    /// `-mcpu` value, e.g. `cortex-m4`.
    pub cpu: String,
    /// Family name; also the variant directory holding the linker script.
    pub family: String,
    /// Variant string, e.g. `XMC4700`.
    pub variant: String,
    /// CPU clock, `F_CPU` define value.
    #[serde(default, deserialize_with = "string_or_number")]
    pub f_cpu: Option<String>,
    /// MCU part name.
    #[serde(default)]
    pub mcu: Option<String>,
}

/// `debug` section of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DebugSection {
    /// Device name passed to `JLinkExe -device`.
    #[serde(default)]
    pub jlink_device: Option<String>,
    /// Per-tool debug settings, kept opaque.
    #[serde(default)]
    pub tools: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct Manifest {
    #[serde(default)]
    name: String,
    build: BuildSection,
    #[serde(default)]
    debug: DebugSection,
    #[serde(default)]
    upload: UploadOptions,
}

impl BoardConfig {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, BoardError> {
        Self::parse(text, PathBuf::new())
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, BoardError> {
        let text = std::fs::read_to_string(path).map_err(|source| BoardError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path.to_path_buf())
    }

    fn parse(text: &str, path: PathBuf) -> Result<Self, BoardError> {
        let raw: Value = serde_json::from_str(text).map_err(|source| BoardError::Parse {
            path: path.clone(),
            source,
        })?;
        let manifest: Manifest = serde_json::from_value(raw.clone())
            .map_err(|source| BoardError::Parse { path, source })?;
        Ok(Self {
            name: manifest.name,
            build: manifest.build,
            debug: manifest.debug,
            upload: manifest.upload,
            raw,
        })
    }

    /// Look up a value by dotted path (`"build.variant"`, `"debug.jlink_device"`).
    ///
    /// Strings are returned verbatim, numbers and booleans in their JSON
    /// spelling. Objects, arrays and missing keys yield `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut node = &self.raw;
        for part in key.split('.') {
            node = node.get(part)?;
        }
        match node {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Clock {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Clock>::deserialize(deserializer)?.map(|clock| match clock {
        Clock::Text(s) => s,
        Clock::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    const RELAX_KIT: &str = r#"{
        "name": "XMC4700 Relax Kit",
        "build": {
            "cpu": "cortex-m4",
            "family": "XMC4700",
            "variant": "XMC4700",
            "f_cpu": "144000000L"
        },
        "debug": { "jlink_device": "XMC4700-2048" },
        "upload": { "protocol": "jlink", "maximum_size": 2048000 }
    }"#;

    #[test]
    fn parses_typed_sections() {
        let board = BoardConfig::from_json(RELAX_KIT).unwrap();
        assert_eq!(board.name, "XMC4700 Relax Kit");
        assert_eq!(board.build.cpu, "cortex-m4");
        assert_eq!(board.build.f_cpu.as_deref(), Some("144000000L"));
        assert_eq!(board.debug.jlink_device.as_deref(), Some("XMC4700-2048"));
        assert_eq!(board.upload.protocol.as_deref(), Some("jlink"));
    }

    #[test]
    fn dotted_get_reads_nested_values() {
        let board = BoardConfig::from_json(RELAX_KIT).unwrap();
        assert_eq!(board.get("build.variant").as_deref(), Some("XMC4700"));
        assert_eq!(board.get("upload.maximum_size").as_deref(), Some("2048000"));
        assert_eq!(board.get("debug").as_deref(), None);
        assert_eq!(board.get("build.nope"), None);
    }

    #[test]
    fn numeric_clock_is_stringified() {
        let board = BoardConfig::from_json(
            r#"{ "build": { "cpu": "cortex-m0", "family": "XMC1100", "variant": "XMC1100", "f_cpu": 32000000 } }"#,
        )
        .unwrap();
        assert_eq!(board.build.f_cpu.as_deref(), Some("32000000"));
        assert!(board.upload.is_empty());
    }

    #[test]
    fn missing_build_section_is_a_parse_error() {
        let err = BoardConfig::from_json(r#"{ "name": "broken" }"#).unwrap_err();
        assert!(matches!(err, BoardError::Parse { .. }));
    }
}
