//! Parameter file loading for fieldnav
//!
//! Any serde type can be read from or written to YAML, TOML or JSON. The
//! format is picked from the file extension; unknown extensions are read as
//! YAML, which also accepts plain JSON.

use crate::error::{NavError, NavResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Supported on-disk formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamFormat {
    Yaml,
    Toml,
    Json,
}

impl ParamFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("toml") => ParamFormat::Toml,
            Some("json") => ParamFormat::Json,
            _ => ParamFormat::Yaml,
        }
    }
}

/// Parse a parameter document held in memory
pub fn from_str<T: DeserializeOwned>(text: &str, format: ParamFormat) -> NavResult<T> {
    let value = match format {
        ParamFormat::Yaml => serde_yaml::from_str(text)?,
        ParamFormat::Toml => toml::from_str(text)?,
        ParamFormat::Json => serde_json::from_str(text)?,
    };
    Ok(value)
}

/// Render a parameter document
pub fn to_string<T: Serialize>(value: &T, format: ParamFormat) -> NavResult<String> {
    let text = match format {
        ParamFormat::Yaml => serde_yaml::to_string(value)?,
        ParamFormat::Toml => toml::to_string_pretty(value)?,
        ParamFormat::Json => serde_json::to_string_pretty(value)?,
    };
    Ok(text)
}

/// Load parameters from a file
pub fn load<T: DeserializeOwned>(path: &Path) -> NavResult<T> {
    if !path.exists() {
        return Err(NavError::Config(format!(
            "Parameter file not found: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)?;
    let value = from_str(&text, ParamFormat::from_path(path))?;
    tracing::debug!(path = %path.display(), "loaded parameters");
    Ok(value)
}

/// Save parameters to a file, creating parent directories as needed
pub fn save<T: Serialize>(value: &T, path: &Path) -> NavResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let text = to_string(value, ParamFormat::from_path(path))?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Gains {
        k_linear: f64,
        tick_ms: u64,
        label: String,
    }

    fn sample() -> Gains {
        Gains {
            k_linear: 0.25,
            tick_ms: 50,
            label: "bench".to_string(),
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ParamFormat::from_path(Path::new("a.toml")), ParamFormat::Toml);
        assert_eq!(ParamFormat::from_path(Path::new("a.JSON")), ParamFormat::Json);
        assert_eq!(ParamFormat::from_path(Path::new("a.yaml")), ParamFormat::Yaml);
        assert_eq!(ParamFormat::from_path(Path::new("a")), ParamFormat::Yaml);
    }

    #[test]
    fn test_save_and_load_each_format() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["gains.yaml", "gains.toml", "gains.json"] {
            let path = dir.path().join("nested").join(name);
            save(&sample(), &path).unwrap();
            let loaded: Gains = load(&path).unwrap();
            assert_eq!(loaded, sample());
        }
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load::<Gains>(Path::new("/nonexistent/gains.yaml")).unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
    }

    #[test]
    fn test_malformed_document() {
        let err = from_str::<Gains>("k_linear: [", ParamFormat::Yaml).unwrap_err();
        assert!(matches!(err, NavError::Serialization(_)));
    }
}
