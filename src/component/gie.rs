//! Primary GIE (GPU inference engine): runs the detector model on every
//! batched frame.
//!
//! Both files are resolved and checked for existence by the service before
//! this type is built; the component only records the resolved paths.

use crate::component::{Component, ComponentKind, ComponentParams, InvalidParams, ParentLink};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PrimaryGie {
    name: String,
    infer_config_file: PathBuf,
    model_engine_file: PathBuf,
    /// Frames skipped between inferences (0 = every frame).
    interval: u32,
    unique_id: u32,
    link: ParentLink,
}

impl PrimaryGie {
    pub fn new(
        name: &str,
        infer_config_file: &str,
        model_engine_file: &str,
        interval: u32,
        unique_id: u32,
    ) -> Result<Self, InvalidParams> {
        if infer_config_file.is_empty() || model_engine_file.is_empty() {
            return Err(InvalidParams(
                "infer config and model engine paths are required".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            infer_config_file: PathBuf::from(infer_config_file),
            model_engine_file: PathBuf::from(model_engine_file),
            interval,
            unique_id,
            link: ParentLink::default(),
        })
    }

    pub fn infer_config_file(&self) -> &Path {
        &self.infer_config_file
    }

    pub fn model_engine_file(&self) -> &Path {
        &self.model_engine_file
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn unique_id(&self) -> u32 {
        self.unique_id
    }
}

impl Component for PrimaryGie {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::PrimaryGie
    }

    fn link(&self) -> &ParentLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut ParentLink {
        &mut self.link
    }

    fn params(&self) -> ComponentParams {
        ComponentParams::PrimaryGie {
            infer_config_file: self.infer_config_file.display().to_string(),
            model_engine_file: self.model_engine_file.display().to_string(),
            interval: self.interval,
            unique_id: self.unique_id,
        }
    }
}
