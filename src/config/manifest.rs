//! Declarative pipeline manifests.
//!
//! A manifest lists components and the pipelines that use them. It is read
//! from TOML or JSON (chosen by file extension) and applied through the
//! service facade, so every rule that holds for API callers also holds here.
//!
//! ```toml
//! [[components]]
//! name = "cam-0"
//! kind = "csi_source"
//! width = 1280
//! height = 720
//! fps_n = 30
//! fps_d = 1
//!
//! [[components]]
//! name = "window"
//! kind = "overlay_sink"
//! width = 1280
//! height = 720
//!
//! [[pipelines]]
//! name = "main"
//! components = ["cam-0", "window"]
//! autoplay = true
//! ```

use crate::component::ComponentParams;
use crate::config::StreamMuxSettings;
use crate::error::{Result, ServiceError};
use crate::service::Services;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(flatten)]
    pub params: ComponentParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub name: String,

    /// Component names, attached in this order
    #[serde(default)]
    pub components: Vec<String>,

    /// Overrides the service defaults for this pipeline
    #[serde(default)]
    pub streammux: Option<StreamMuxSettings>,

    /// Start playing once all components are attached
    #[serde(default)]
    pub autoplay: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineManifest {
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub pipelines: Vec<PipelineSpec>,
}

impl PipelineManifest {
    /// Load a manifest; `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("Failed to read manifest {:?}: {}", path, e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let manifest = if is_json {
            serde_json::from_str(&content).map_err(|e| {
                ServiceError::Config(format!("Failed to parse manifest {:?}: {}", path, e))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                ServiceError::Config(format!("Failed to parse manifest {:?}: {}", path, e))
            })?
        };
        Ok(manifest)
    }

    /// Create everything the manifest describes.
    ///
    /// Stops at the first failure; entities created before it are kept so
    /// the caller can inspect or tear them down.
    pub fn apply(&self, services: &Services) -> Result<()> {
        for spec in &self.components {
            services.component_create(&spec.name, spec.params.clone())?;
        }

        for spec in &self.pipelines {
            services.pipeline_new(&spec.name)?;
            if let Some(mux) = spec.streammux {
                services.pipeline_streammux_batch_properties_set(
                    &spec.name,
                    mux.batch_size,
                    mux.batch_timeout,
                )?;
                services.pipeline_streammux_output_size_set(&spec.name, mux.width, mux.height)?;
            }
            services.pipeline_component_add_many(&spec.name, &spec.components)?;
            if spec.autoplay {
                services.pipeline_play(&spec.name)?;
            }
        }

        tracing::info!(
            "Manifest applied: {} components, {} pipelines",
            self.components.len(),
            self.pipelines.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::engine::PipelineState;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"
[[components]]
name = "cam-0"
kind = "csi_source"
width = 1280
height = 720
fps_n = 30
fps_d = 1

[[components]]
name = "window"
kind = "overlay_sink"
width = 1280
height = 720

[[pipelines]]
name = "main"
components = ["cam-0", "window"]
autoplay = true

[pipelines.streammux]
batch_size = 2
"#;

    #[test]
    fn test_load_toml_and_apply() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.toml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = PipelineManifest::load(&path).unwrap();
        assert_eq!(manifest.components.len(), 2);
        assert_eq!(manifest.pipelines[0].streammux.map(|m| m.batch_size), Some(2));

        let services = Services::new(ServiceConfig::default());
        manifest.apply(&services).unwrap();
        assert_eq!(
            services.pipeline_components("main").unwrap(),
            vec!["cam-0", "window"]
        );
        assert_eq!(
            services.pipeline_get_state("main").unwrap(),
            PipelineState::Playing
        );
        assert_eq!(
            services.pipeline_streammux_settings("main").unwrap().batch_size,
            2
        );
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{"components":[{"name":"osd","kind":"osd","clock_enabled":true}]}"#,
        )
        .unwrap();

        let manifest = PipelineManifest::load(&path).unwrap();
        assert_eq!(
            manifest.components[0].params,
            ComponentParams::Osd {
                clock_enabled: true
            }
        );
        assert!(manifest.pipelines.is_empty());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[[components]]\nname = \"x\"\nkind = \"encoder\"\n").unwrap();
        assert!(matches!(
            PipelineManifest::load(&path),
            Err(ServiceError::Config(_))
        ));
    }

    #[test]
    fn test_apply_stops_at_first_failure() {
        let manifest = PipelineManifest {
            components: vec![ComponentSpec {
                name: "osd".to_string(),
                params: ComponentParams::Osd {
                    clock_enabled: false,
                },
            }],
            pipelines: vec![PipelineSpec {
                name: "p".to_string(),
                components: vec!["osd".to_string(), "missing".to_string()],
                streammux: None,
                autoplay: false,
            }],
        };
        let services = Services::new(ServiceConfig::default());
        assert!(manifest.apply(&services).is_err());
        assert_eq!(services.pipeline_list(), vec!["p"]);
        assert!(!services.component_is_in_use("osd").unwrap());
    }
}
