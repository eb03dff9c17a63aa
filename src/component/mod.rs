//! Component abstraction for the registry.
//!
//! Two-layer design, mirroring how pipelines treat their children:
//! - **`Component` trait** - the capability set every component shares:
//!   report in-use, report/attach-to/detach-from a single parent.
//! - **`BuiltinComponent` enum** - one variant per concrete kind so the
//!   registry can hold heterogeneous components in one map with match
//!   dispatch instead of trait objects.
//!
//! Components are built from typed [`ComponentParams`]; parameter ranges are
//! checked by each concrete constructor before the engine is asked to build
//! anything.

pub mod display;
pub mod gie;
pub mod osd;
pub mod sink;
pub mod source;

pub use display::TiledDisplay;
pub use gie::PrimaryGie;
pub use osd::Osd;
pub use sink::OverlaySink;
pub use source::{CsiSource, UriSource};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Entity family used for naming errors and result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Pipeline,
    Source,
    Sink,
    Osd,
    Display,
    Gie,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Pipeline => "Pipeline",
            EntityKind::Source => "Source",
            EntityKind::Sink => "Sink",
            EntityKind::Osd => "OSD",
            EntityKind::Display => "Display",
            EntityKind::Gie => "GIE",
        };
        f.write_str(s)
    }
}

/// Concrete component kinds the service can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    CsiSource,
    UriSource,
    OverlaySink,
    Osd,
    TiledDisplay,
    PrimaryGie,
}

impl ComponentKind {
    /// Entity family this kind belongs to.
    pub fn entity(&self) -> EntityKind {
        match self {
            ComponentKind::CsiSource | ComponentKind::UriSource => EntityKind::Source,
            ComponentKind::OverlaySink => EntityKind::Sink,
            ComponentKind::Osd => EntityKind::Osd,
            ComponentKind::TiledDisplay => EntityKind::Display,
            ComponentKind::PrimaryGie => EntityKind::Gie,
        }
    }

    pub fn is_source(&self) -> bool {
        self.entity() == EntityKind::Source
    }

    pub fn is_sink(&self) -> bool {
        self.entity() == EntityKind::Sink
    }

    /// Kinds a pipeline can hold at most one of.
    pub fn is_single_slot(&self) -> bool {
        matches!(
            self,
            ComponentKind::Osd | ComponentKind::TiledDisplay | ComponentKind::PrimaryGie
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentKind::CsiSource => "CSI Source",
            ComponentKind::UriSource => "URI Source",
            ComponentKind::OverlaySink => "Overlay Sink",
            ComponentKind::Osd => "OSD",
            ComponentKind::TiledDisplay => "Tiled Display",
            ComponentKind::PrimaryGie => "Primary GIE",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Typed construction parameters, one variant per kind.
///
/// Serialized with an internal `kind` tag so manifests can describe
/// components declaratively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentParams {
    CsiSource {
        width: u32,
        height: u32,
        fps_n: u32,
        fps_d: u32,
    },
    UriSource {
        uri: String,
        #[serde(default)]
        cudadec_mem_type: u32,
        #[serde(default)]
        intra_decode: bool,
    },
    OverlaySink {
        #[serde(default)]
        offset_x: u32,
        #[serde(default)]
        offset_y: u32,
        width: u32,
        height: u32,
    },
    Osd {
        #[serde(default)]
        clock_enabled: bool,
    },
    TiledDisplay {
        width: u32,
        height: u32,
    },
    PrimaryGie {
        infer_config_file: String,
        model_engine_file: String,
        #[serde(default)]
        interval: u32,
        unique_id: u32,
    },
}

impl ComponentParams {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentParams::CsiSource { .. } => ComponentKind::CsiSource,
            ComponentParams::UriSource { .. } => ComponentKind::UriSource,
            ComponentParams::OverlaySink { .. } => ComponentKind::OverlaySink,
            ComponentParams::Osd { .. } => ComponentKind::Osd,
            ComponentParams::TiledDisplay { .. } => ComponentKind::TiledDisplay,
            ComponentParams::PrimaryGie { .. } => ComponentKind::PrimaryGie,
        }
    }
}

/// Parameter validation failure raised by a concrete constructor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidParams(pub String);

/// Attach/detach failure on the single-parent link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("already in use by Pipeline '{0}'")]
    AlreadyAttached(String),

    #[error("not in use by Pipeline '{0}'")]
    NotAttached(String),
}

/// Single-parent link shared by every component kind.
///
/// A component is "in use" exactly when it has a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentLink {
    parent: Option<String>,
}

impl ParentLink {
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }

    /// Attach to `pipeline`. Fails if any parent is already set, including
    /// the same pipeline.
    pub fn attach(&mut self, pipeline: &str) -> Result<(), LinkError> {
        if let Some(current) = &self.parent {
            return Err(LinkError::AlreadyAttached(current.clone()));
        }
        self.parent = Some(pipeline.to_string());
        Ok(())
    }

    /// Detach from `pipeline`. Fails unless `pipeline` is the current parent.
    pub fn detach(&mut self, pipeline: &str) -> Result<(), LinkError> {
        if self.parent.as_deref() != Some(pipeline) {
            return Err(LinkError::NotAttached(pipeline.to_string()));
        }
        self.parent = None;
        Ok(())
    }
}

/// Capability set shared by every component.
pub trait Component: Send {
    /// Unique name within the component registry.
    fn name(&self) -> &str;

    fn kind(&self) -> ComponentKind;

    fn link(&self) -> &ParentLink;

    fn link_mut(&mut self) -> &mut ParentLink;

    /// Parameters that would rebuild this component.
    fn params(&self) -> ComponentParams;

    fn is_in_use(&self) -> bool {
        self.link().is_attached()
    }

    fn parent(&self) -> Option<&str> {
        self.link().parent()
    }

    fn is_parent(&self, pipeline: &str) -> bool {
        self.parent() == Some(pipeline)
    }

    fn attach_to(&mut self, pipeline: &str) -> Result<(), LinkError> {
        self.link_mut().attach(pipeline)
    }

    fn detach_from(&mut self, pipeline: &str) -> Result<(), LinkError> {
        self.link_mut().detach(pipeline)
    }
}

/// Enum dispatch over the built-in component kinds.
#[derive(Debug, Clone)]
pub enum BuiltinComponent {
    CsiSource(CsiSource),
    UriSource(UriSource),
    OverlaySink(OverlaySink),
    Osd(Osd),
    TiledDisplay(TiledDisplay),
    PrimaryGie(PrimaryGie),
}

impl BuiltinComponent {
    /// Build the concrete component described by `params`.
    pub fn from_params(name: &str, params: &ComponentParams) -> Result<Self, InvalidParams> {
        let component = match params {
            ComponentParams::CsiSource {
                width,
                height,
                fps_n,
                fps_d,
            } => BuiltinComponent::CsiSource(CsiSource::new(name, *width, *height, *fps_n, *fps_d)?),
            ComponentParams::UriSource {
                uri,
                cudadec_mem_type,
                intra_decode,
            } => BuiltinComponent::UriSource(UriSource::new(
                name,
                uri,
                *cudadec_mem_type,
                *intra_decode,
            )?),
            ComponentParams::OverlaySink {
                offset_x,
                offset_y,
                width,
                height,
            } => BuiltinComponent::OverlaySink(OverlaySink::new(
                name, *offset_x, *offset_y, *width, *height,
            )?),
            ComponentParams::Osd { clock_enabled } => {
                BuiltinComponent::Osd(Osd::new(name, *clock_enabled))
            }
            ComponentParams::TiledDisplay { width, height } => {
                BuiltinComponent::TiledDisplay(TiledDisplay::new(name, *width, *height)?)
            }
            ComponentParams::PrimaryGie {
                infer_config_file,
                model_engine_file,
                interval,
                unique_id,
            } => BuiltinComponent::PrimaryGie(PrimaryGie::new(
                name,
                infer_config_file,
                model_engine_file,
                *interval,
                *unique_id,
            )?),
        };
        Ok(component)
    }

    /// Liveness for sources, `None` for every other kind.
    pub fn is_live(&self) -> Option<bool> {
        match self {
            BuiltinComponent::CsiSource(c) => Some(c.is_live()),
            BuiltinComponent::UriSource(c) => Some(c.is_live()),
            _ => None,
        }
    }
}

impl Component for BuiltinComponent {
    fn name(&self) -> &str {
        match self {
            BuiltinComponent::CsiSource(c) => c.name(),
            BuiltinComponent::UriSource(c) => c.name(),
            BuiltinComponent::OverlaySink(c) => c.name(),
            BuiltinComponent::Osd(c) => c.name(),
            BuiltinComponent::TiledDisplay(c) => c.name(),
            BuiltinComponent::PrimaryGie(c) => c.name(),
        }
    }

    fn kind(&self) -> ComponentKind {
        match self {
            BuiltinComponent::CsiSource(c) => c.kind(),
            BuiltinComponent::UriSource(c) => c.kind(),
            BuiltinComponent::OverlaySink(c) => c.kind(),
            BuiltinComponent::Osd(c) => c.kind(),
            BuiltinComponent::TiledDisplay(c) => c.kind(),
            BuiltinComponent::PrimaryGie(c) => c.kind(),
        }
    }

    fn link(&self) -> &ParentLink {
        match self {
            BuiltinComponent::CsiSource(c) => c.link(),
            BuiltinComponent::UriSource(c) => c.link(),
            BuiltinComponent::OverlaySink(c) => c.link(),
            BuiltinComponent::Osd(c) => c.link(),
            BuiltinComponent::TiledDisplay(c) => c.link(),
            BuiltinComponent::PrimaryGie(c) => c.link(),
        }
    }

    fn link_mut(&mut self) -> &mut ParentLink {
        match self {
            BuiltinComponent::CsiSource(c) => c.link_mut(),
            BuiltinComponent::UriSource(c) => c.link_mut(),
            BuiltinComponent::OverlaySink(c) => c.link_mut(),
            BuiltinComponent::Osd(c) => c.link_mut(),
            BuiltinComponent::TiledDisplay(c) => c.link_mut(),
            BuiltinComponent::PrimaryGie(c) => c.link_mut(),
        }
    }

    fn params(&self) -> ComponentParams {
        match self {
            BuiltinComponent::CsiSource(c) => c.params(),
            BuiltinComponent::UriSource(c) => c.params(),
            BuiltinComponent::OverlaySink(c) => c.params(),
            BuiltinComponent::Osd(c) => c.params(),
            BuiltinComponent::TiledDisplay(c) => c.params(),
            BuiltinComponent::PrimaryGie(c) => c.params(),
        }
    }
}

/// Reject zero dimensions, shared by the kinds that carry a frame size.
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), InvalidParams> {
    if width == 0 || height == 0 {
        return Err(InvalidParams(format!(
            "invalid dimensions {}x{}",
            width, height
        )));
    }
    Ok(())
}
