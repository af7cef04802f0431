//! JSON persistence shared by the elevation cache and the CLI.
//!
//! A dataset name equal to one of [`NO_SAVE_NAMES`] disables writing; callers
//! check [`is_no_save`] before building a path.
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SurgeError};

/// Names that mean "do not persist this dataset".
pub const NO_SAVE_NAMES: [&str; 2] = ["none", "None"];

pub fn is_no_save(name: &str) -> bool {
    NO_SAVE_NAMES.contains(&name)
}

/// serde_json writes NaN as `null`; read it back as NaN.
pub fn null_as_nan<'de, D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Vec<f64>, D::Error> {
    let v: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|source| SurgeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SurgeError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` to `path`, creating parent directories as needed.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SurgeError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = serde_json::to_string(value).map_err(|source| SurgeError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| SurgeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sentinel_spellings_disable_saving() {
        assert!(is_no_save("none"));
        assert!(is_no_save("None"));
        assert!(!is_no_save("NONE"));
        assert!(!is_no_save("florida_2017"));
    }

    #[test]
    fn save_then_load_through_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/values.json");
        save_json(&path, &vec![1.5f64, -2.0]).unwrap();
        let back: Vec<f64> = load_json(&path).unwrap();
        assert_eq!(back, vec![1.5, -2.0]);
    }

    #[test]
    fn nan_survives_a_json_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Values {
            #[serde(deserialize_with = "null_as_nan")]
            v: Vec<f64>,
        }
        let text = serde_json::to_string(&Values { v: vec![1.0, f64::NAN] }).unwrap();
        let back: Values = serde_json::from_str(&text).unwrap();
        assert_eq!(back.v[0], 1.0);
        assert!(back.v[1].is_nan());
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_json::<Vec<f64>>(&path).unwrap_err();
        assert!(matches!(err, SurgeError::Io { .. }));
        assert!(err.to_string().contains("missing.json"));
    }
}
