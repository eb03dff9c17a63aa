//! Error handling for pipeline-services
//!
//! This module defines the flat [`ServiceError`] taxonomy returned by every
//! facade operation, the closed [`ResultCode`] enumeration used by the
//! C-style surface in [`crate::api`], and a Result alias.

use crate::component::EntityKind;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which registry a name lookup was made against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Component,
    Pipeline,
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryKind::Component => write!(f, "Component"),
            RegistryKind::Pipeline => write!(f, "Pipeline"),
        }
    }
}

/// External file a component needs before it can be built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Media file under the stream directory (URI sources)
    StreamFile,
    /// Inference configuration file (GIE)
    InferConfigFile,
    /// Serialized model engine file (GIE)
    ModelEngineFile,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::StreamFile => write!(f, "Stream file"),
            ResourceKind::InferConfigFile => write!(f, "Infer config file"),
            ResourceKind::ModelEngineFile => write!(f, "Model engine file"),
        }
    }
}

/// Structural operation delegated to a pipeline handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOp {
    AddComponent,
    RemoveComponent,
    StreamMuxSet,
    Play,
    Pause,
    DumpToDot,
}

impl fmt::Display for PipelineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineOp::AddComponent => "add component",
            PipelineOp::RemoveComponent => "remove component",
            PipelineOp::StreamMuxSet => "stream muxer update",
            PipelineOp::Play => "play",
            PipelineOp::Pause => "pause",
            PipelineOp::DumpToDot => "dot dump",
        };
        f.write_str(s)
    }
}

/// Main error type for service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Name absent from the addressed registry
    #[error("{registry} name '{name}' was not found")]
    NotFound { registry: RegistryKind, name: String },

    /// Name collision on create
    #[error("{kind} name '{name}' is not unique")]
    NameNotUnique { kind: EntityKind, name: String },

    /// Component is attached to a pipeline and cannot be deleted
    #[error("Component '{name}' is currently in use")]
    InUse { name: String },

    /// Component is not attached to the addressed pipeline
    #[error("Component '{component}' is not in use by Pipeline '{pipeline}'")]
    NotOwned { component: String, pipeline: String },

    /// A file required at creation time is missing
    #[error("{resource} not found: {}", path.display())]
    ResourceNotFound {
        resource: ResourceKind,
        path: PathBuf,
    },

    /// The engine (or parameter validation) refused to build the handle
    #[error("New {kind} '{name}' failed on create: {reason}")]
    ConstructionFailed {
        kind: EntityKind,
        name: String,
        reason: String,
    },

    /// A source-only query was made against another kind of component
    #[error("Component '{name}' is not a source")]
    NotASource { name: String },

    /// Attaching another source would exceed the configured bound
    #[error("Maximum number of sources in use ({max}) has been reached")]
    SourceLimitReached { max: u32 },

    /// A delegated structural call was rejected
    #[error("Pipeline '{pipeline}' failed to {op}: {reason}")]
    OperationFailed {
        op: PipelineOp,
        pipeline: String,
        reason: String,
    },

    #[error("State change listener is already registered with Pipeline '{pipeline}'")]
    ListenerNotUnique { pipeline: String },

    #[error("State change listener is not registered with Pipeline '{pipeline}'")]
    ListenerNotFound { pipeline: String },

    #[error("Display event handler is already registered with Pipeline '{pipeline}'")]
    HandlerNotUnique { pipeline: String },

    #[error("Display event handler is not registered with Pipeline '{pipeline}'")]
    HandlerNotFound { pipeline: String },

    /// The media engine could not be initialised
    #[error("Engine initialisation failed: {0}")]
    EngineInit(String),

    /// Reserved operation the active engine does not provide
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Closed set of result codes returned by the C-style surface.
///
/// Codes are grouped by entity family in the upper 16 bits.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success = 0x0000_0000,
    ApiNotImplemented = 0x0000_0001,
    ConfigInvalid = 0x0000_0002,
    IoFailed = 0x0000_0003,
    EngineInitFailed = 0x0000_0004,

    ComponentNameNotFound = 0x0001_0001,
    ComponentInUse = 0x0001_0002,
    ComponentNotUsedByPipeline = 0x0001_0003,

    SourceNameNotUnique = 0x0002_0001,
    SourceNewException = 0x0002_0002,
    SourceStreamFileNotFound = 0x0002_0003,
    SourceComponentIsNotSource = 0x0002_0004,
    SourceMaxInUseReached = 0x0002_0005,

    SinkNameNotUnique = 0x0003_0001,
    SinkNewException = 0x0003_0002,

    OsdNameNotUnique = 0x0004_0001,
    OsdNewException = 0x0004_0002,

    DisplayNameNotUnique = 0x0005_0001,
    DisplayNewException = 0x0005_0002,

    GieNameNotUnique = 0x0006_0001,
    GieNewException = 0x0006_0002,
    GieConfigFileNotFound = 0x0006_0003,
    GieModelFileNotFound = 0x0006_0004,

    PipelineNameNotUnique = 0x0007_0001,
    PipelineNameNotFound = 0x0007_0002,
    PipelineNewException = 0x0007_0003,
    PipelineComponentAddFailed = 0x0007_0004,
    PipelineComponentRemoveFailed = 0x0007_0005,
    PipelineStreamMuxSetFailed = 0x0007_0006,
    PipelineFailedToPlay = 0x0007_0007,
    PipelineFailedToPause = 0x0007_0008,
    PipelineListenerNotUnique = 0x0007_0009,
    PipelineListenerNotFound = 0x0007_000A,
    PipelineHandlerNotUnique = 0x0007_000B,
    PipelineHandlerNotFound = 0x0007_000C,
    PipelineDumpFailed = 0x0007_000D,
}

impl ResultCode {
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl From<Result<()>> for ResultCode {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => ResultCode::Success,
            Err(e) => e.code(),
        }
    }
}

impl ServiceError {
    /// Result code reported for this error at the C-style boundary
    pub fn code(&self) -> ResultCode {
        match self {
            ServiceError::NotFound { registry, .. } => match registry {
                RegistryKind::Component => ResultCode::ComponentNameNotFound,
                RegistryKind::Pipeline => ResultCode::PipelineNameNotFound,
            },
            ServiceError::NameNotUnique { kind, .. } => match kind {
                EntityKind::Source => ResultCode::SourceNameNotUnique,
                EntityKind::Sink => ResultCode::SinkNameNotUnique,
                EntityKind::Osd => ResultCode::OsdNameNotUnique,
                EntityKind::Display => ResultCode::DisplayNameNotUnique,
                EntityKind::Gie => ResultCode::GieNameNotUnique,
                EntityKind::Pipeline => ResultCode::PipelineNameNotUnique,
            },
            ServiceError::InUse { .. } => ResultCode::ComponentInUse,
            ServiceError::NotOwned { .. } => ResultCode::ComponentNotUsedByPipeline,
            ServiceError::ResourceNotFound { resource, .. } => match resource {
                ResourceKind::StreamFile => ResultCode::SourceStreamFileNotFound,
                ResourceKind::InferConfigFile => ResultCode::GieConfigFileNotFound,
                ResourceKind::ModelEngineFile => ResultCode::GieModelFileNotFound,
            },
            ServiceError::ConstructionFailed { kind, .. } => match kind {
                EntityKind::Source => ResultCode::SourceNewException,
                EntityKind::Sink => ResultCode::SinkNewException,
                EntityKind::Osd => ResultCode::OsdNewException,
                EntityKind::Display => ResultCode::DisplayNewException,
                EntityKind::Gie => ResultCode::GieNewException,
                EntityKind::Pipeline => ResultCode::PipelineNewException,
            },
            ServiceError::NotASource { .. } => ResultCode::SourceComponentIsNotSource,
            ServiceError::SourceLimitReached { .. } => ResultCode::SourceMaxInUseReached,
            ServiceError::OperationFailed { op, .. } => match op {
                PipelineOp::AddComponent => ResultCode::PipelineComponentAddFailed,
                PipelineOp::RemoveComponent => ResultCode::PipelineComponentRemoveFailed,
                PipelineOp::StreamMuxSet => ResultCode::PipelineStreamMuxSetFailed,
                PipelineOp::Play => ResultCode::PipelineFailedToPlay,
                PipelineOp::Pause => ResultCode::PipelineFailedToPause,
                PipelineOp::DumpToDot => ResultCode::PipelineDumpFailed,
            },
            ServiceError::ListenerNotUnique { .. } => ResultCode::PipelineListenerNotUnique,
            ServiceError::ListenerNotFound { .. } => ResultCode::PipelineListenerNotFound,
            ServiceError::HandlerNotUnique { .. } => ResultCode::PipelineHandlerNotUnique,
            ServiceError::HandlerNotFound { .. } => ResultCode::PipelineHandlerNotFound,
            ServiceError::EngineInit(_) => ResultCode::EngineInitFailed,
            ServiceError::NotImplemented(_) => ResultCode::ApiNotImplemented,
            ServiceError::Config(_) => ResultCode::ConfigInvalid,
            ServiceError::Io(_) => ResultCode::IoFailed,
        }
    }

    pub(crate) fn component_not_found(name: &str) -> Self {
        ServiceError::NotFound {
            registry: RegistryKind::Component,
            name: name.to_string(),
        }
    }

    pub(crate) fn pipeline_not_found(name: &str) -> Self {
        ServiceError::NotFound {
            registry: RegistryKind::Pipeline,
            name: name.to_string(),
        }
    }

    pub(crate) fn operation_failed(
        op: PipelineOp,
        pipeline: &str,
        reason: impl Into<String>,
    ) -> Self {
        ServiceError::OperationFailed {
            op,
            pipeline: pipeline.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServiceError::component_not_found("src-1");
        assert_eq!(err.to_string(), "Component name 'src-1' was not found");
    }

    #[test]
    fn test_not_unique_code_follows_entity_kind() {
        let err = ServiceError::NameNotUnique {
            kind: EntityKind::Gie,
            name: "pgie".to_string(),
        };
        assert_eq!(err.code(), ResultCode::GieNameNotUnique);
        assert!(err.to_string().contains("pgie"));
    }

    #[test]
    fn test_resource_not_found_codes() {
        let err = ServiceError::ResourceNotFound {
            resource: ResourceKind::ModelEngineFile,
            path: PathBuf::from("/models/missing.engine"),
        };
        assert_eq!(err.code(), ResultCode::GieModelFileNotFound);
        assert!(err.to_string().contains("/models/missing.engine"));
    }

    #[test]
    fn test_result_code_from_result() {
        assert_eq!(ResultCode::from(Ok(())), ResultCode::Success);
        let failed: Result<()> = Err(ServiceError::operation_failed(
            PipelineOp::Play,
            "p1",
            "no sources",
        ));
        assert_eq!(ResultCode::from(failed), ResultCode::PipelineFailedToPlay);
        assert!(!ResultCode::PipelineFailedToPlay.is_success());
    }
}
