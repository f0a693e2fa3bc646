//! Loading and saving config files, the format chosen by file
//! extension.

use std::{fmt::Display, io::Write, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};

use crate::utillib::tempfile_utils::write_atomically;

/// json5 0.4.1 carries location info in its errors, but does not show
/// it via `Display`.
#[derive(Debug, thiserror::Error)]
pub struct Json5Error(pub json5::Error);

impl Display for Json5Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            json5::Error::Message { msg, location } => {
                if let Some(json5::Location { line, column }) = location {
                    write!(f, "{msg} at line:column {line}:{column}")
                } else {
                    f.write_str(msg)
                }
            }
        }
    }
}

pub fn json5_from_str<T: DeserializeOwned>(s: &str) -> Result<T, Json5Error> {
    json5::from_str(s).map_err(Json5Error)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigBackend {
    Json5,
    Yaml,
    Ron,
}

impl ConfigBackend {
    pub fn decode<T: DeserializeOwned>(self, s: &str) -> Result<T> {
        Ok(match self {
            ConfigBackend::Json5 => json5_from_str(s)?,
            ConfigBackend::Yaml => serde_yml::from_str(s)?,
            ConfigBackend::Ron => ron::from_str(s)?,
        })
    }

    pub fn encode<T: Serialize>(self, value: &T) -> Result<String> {
        Ok(match self {
            ConfigBackend::Json5 => {
                // json5 0.4 only writes compact output; JSON is valid
                // JSON5, so pretty-print that instead
                serde_json::to_string_pretty(value)?
            }
            ConfigBackend::Yaml => serde_yml::to_string(value)?,
            ConfigBackend::Ron => {
                ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())?
            }
        })
    }

    pub fn load_config_file<T: DeserializeOwned>(self, path: &Path) -> Result<T> {
        let s = std::fs::read_to_string(path)
            .with_context(|| anyhow!("loading config file from {path:?}"))?;
        self.decode(&s)
            .with_context(|| anyhow!("decoding {self:?} from config file {path:?}"))
    }

    pub fn save_config_file<T: Serialize>(self, path: &Path, value: &T) -> Result<()> {
        let mut s = self
            .encode(value)
            .with_context(|| anyhow!("encoding config as {self:?}"))?;
        if !s.ends_with('\n') {
            s.push('\n');
        }
        write_atomically(path, |out| {
            out.write_all(s.as_bytes())
                .with_context(|| anyhow!("writing config file to {path:?}"))
        })
    }
}

pub const FILE_EXTENSIONS: &[(&str, ConfigBackend)] = &[
    ("json5", ConfigBackend::Json5),
    ("json", ConfigBackend::Json5),
    ("yml", ConfigBackend::Yaml),
    ("yaml", ConfigBackend::Yaml),
    ("ron", ConfigBackend::Ron),
];

pub fn backend_from_path(path: &Path) -> Result<ConfigBackend> {
    if let Some(ext) = path.extension() {
        if let Some(ext) = ext.to_str() {
            if let Some((_, backend)) = FILE_EXTENSIONS.iter().find(|(e, _b)| *e == ext) {
                Ok(*backend)
            } else {
                bail!("given file path has an unknown extension {ext:?}: {path:?}")
            }
        } else {
            bail!("given file path has an extension that is not unicode: {path:?}")
        }
    } else {
        bail!(
            "given file path does not have an extension \
             for determining the file type: {path:?}"
        )
    }
}

pub fn load_config_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    backend_from_path(path)?.load_config_file(path)
}

pub fn save_config_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    backend_from_path(path)?.save_config_file(path, value)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn t_backend_from_path() -> Result<()> {
        assert_eq!(backend_from_path(Path::new("a/b.json5"))?, ConfigBackend::Json5);
        assert_eq!(backend_from_path(Path::new("b.yaml"))?, ConfigBackend::Yaml);
        assert_eq!(backend_from_path(Path::new("b.ron"))?, ConfigBackend::Ron);
        assert!(backend_from_path(Path::new("b.toml")).is_err());
        assert!(backend_from_path(Path::new("config")).is_err());
        Ok(())
    }

    #[test]
    fn t_json5_error_location() {
        let res: Result<BTreeMap<String, u32>, _> = json5_from_str("{\n  a: 1,\n  b: x\n}");
        let msg = res.expect_err("invalid input").to_string();
        assert!(msg.contains("at line:column 3:"), "{msg}");
    }

    #[test]
    fn t_string_round_trip() -> Result<()> {
        let value: BTreeMap<String, Vec<u32>> =
            [("a".to_string(), vec![1, 2]), ("b".to_string(), vec![])]
                .into_iter()
                .collect();
        for (_, backend) in FILE_EXTENSIONS {
            let s = backend.encode(&value)?;
            let back: BTreeMap<String, Vec<u32>> = backend.decode(&s)?;
            assert_eq!(back, value, "{backend:?}");
        }
        Ok(())
    }
}
