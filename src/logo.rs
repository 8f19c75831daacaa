//! Organisation logos, keyed by the code callers pass in.
//!
//! The table is built once at start-up from the built-in list, optionally
//! extended by a JSON file:
//!
//! ```json
//! { "natural-england": { "raster": "ne.png", "vector": "ne.svg" },
//!   "ofsted": {} }
//! ```
//!
//! Missing asset names default to `<code>.png` / `<code>.svg`.

use crate::error::SanitiseError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Asset names for one organisation's logo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub raster: String,
    pub vector: String,
}

impl Logo {
    pub fn for_code(code: &str) -> Self {
        Self {
            raster: format!("{}.png", code),
            vector: format!("{}.svg", code),
        }
    }
}

const BUILTIN_CODES: &[&str] = &[
    "hm-government",
    "hmrc",
    "dwp",
    "dvla",
    "home-office",
    "land-registry",
    "companies-house",
    "ministry-of-justice",
    "department-for-education",
    "department-of-health",
    "environment-agency",
    "ofgem",
];

static BUILTIN: Lazy<BTreeMap<String, Logo>> = Lazy::new(|| {
    BUILTIN_CODES
        .iter()
        .map(|code| (code.to_string(), Logo::for_code(code)))
        .collect()
});

#[derive(Debug, Default, Deserialize)]
struct LogoEntry {
    raster: Option<String>,
    vector: Option<String>,
}

/// Immutable code → [`Logo`] lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoTable {
    logos: BTreeMap<String, Logo>,
}

impl Default for LogoTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LogoTable {
    /// The built-in organisations only.
    pub fn builtin() -> Self {
        Self {
            logos: BUILTIN.clone(),
        }
    }

    /// Built-in table extended (and, on clashing codes, overridden) by the
    /// entries of a JSON document.
    pub fn with_json(json: &str) -> Result<Self, SanitiseError> {
        let extra: BTreeMap<String, LogoEntry> = serde_json::from_str(json)
            .map_err(|e| SanitiseError::InvalidConfig(format!("logo table: {}", e)))?;

        let mut logos = BUILTIN.clone();
        for (code, entry) in extra {
            if code.trim().is_empty() {
                return Err(SanitiseError::InvalidConfig(
                    "logo table: empty organisation code".into(),
                ));
            }
            let default = Logo::for_code(&code);
            logos.insert(
                code,
                Logo {
                    raster: entry.raster.unwrap_or(default.raster),
                    vector: entry.vector.unwrap_or(default.vector),
                },
            );
        }
        Ok(Self { logos })
    }

    /// Load the extension file at `path` on top of the built-in list.
    pub fn load(path: &Path) -> Result<Self, SanitiseError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SanitiseError::InvalidConfig(format!("cannot read logo table {}: {}", path.display(), e))
        })?;
        let table = Self::with_json(&json)?;
        info!("Loaded {} logos from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn get(&self, code: &str) -> Result<&Logo, SanitiseError> {
        self.logos
            .get(code)
            .ok_or_else(|| SanitiseError::UnknownLogo(code.to_string()))
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.logos.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.logos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_codes_map_to_png_and_svg() {
        let table = LogoTable::builtin();
        let logo = table.get("hmrc").unwrap();
        assert_eq!(logo.raster, "hmrc.png");
        assert_eq!(logo.vector, "hmrc.svg");
        assert_eq!(table.len(), BUILTIN_CODES.len());
    }

    #[test]
    fn unknown_code_is_an_error() {
        let err = LogoTable::builtin().get("not-a-department").unwrap_err();
        assert!(matches!(err, SanitiseError::UnknownLogo(ref c) if c == "not-a-department"));
    }

    #[test]
    fn json_extends_and_overrides() {
        let table = LogoTable::with_json(
            r#"{ "ofsted": {}, "hmrc": { "raster": "hmrc-2024.png" } }"#,
        )
        .unwrap();
        assert_eq!(table.get("ofsted").unwrap(), &Logo::for_code("ofsted"));
        let hmrc = table.get("hmrc").unwrap();
        assert_eq!(hmrc.raster, "hmrc-2024.png");
        assert_eq!(hmrc.vector, "hmrc.svg");
        assert!(table.get("dwp").is_ok());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = LogoTable::with_json("[1, 2]").unwrap_err();
        assert!(matches!(err, SanitiseError::InvalidConfig(_)));
        let err = LogoTable::with_json(r#"{ " ": {} }"#).unwrap_err();
        assert!(matches!(err, SanitiseError::InvalidConfig(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "ofgem": {{ "vector": "ofgem-mono.svg" }} }}"#).unwrap();
        let table = LogoTable::load(file.path()).unwrap();
        assert_eq!(table.get("ofgem").unwrap().vector, "ofgem-mono.svg");
        assert!(LogoTable::load(Path::new("/nonexistent/logos.json")).is_err());
    }
}
