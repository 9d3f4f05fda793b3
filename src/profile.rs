//! Connection-profile subset that configures the descriptor source.
//!
//! Only the descriptor-related settings live here; database connectivity is
//! owned by the calling application.

use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    /// Base URL of the descriptor service, e.g. `http://localhost:18080`.
    pub desc_base_url: String,
    /// Relative URL template with `{service}`, `{doctype}`, `{version}` placeholders.
    pub desc_url_template: String,
    pub desc_version: String,
    /// Folder holding locally cached `<doctype>.desc` files used as fallback.
    pub desc_dir: Option<PathBuf>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            desc_base_url: "http://localhost:18080".to_string(),
            desc_url_template:
                "/static/resources/forms/services/{service}/{doctype}/{version}/{doctype}.desc"
                    .to_string(),
            desc_version: "1.0".to_string(),
            desc_dir: None,
        }
    }
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening profile {path:?}"))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context("Parsing profile JSON")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating profile {path:?}"))?;
        serde_json::to_writer_pretty(file, self).context("Writing profile JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let profile: Profile = serde_json::from_str(r#"{ "name": "demo" }"#).unwrap();
        assert_eq!(profile.name, "demo");
        assert_eq!(profile.desc_version, "1.0");
        assert!(profile.desc_url_template.contains("{doctype}"));
    }
}
