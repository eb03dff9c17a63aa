//! Source components: CSI camera and URI file sources.
//!
//! Sources are the only kind counted against the in-use bound. A CSI
//! camera is a live source; a URI file source replays a stream file and
//! is not.

use crate::component::{
    check_dimensions, Component, ComponentKind, ComponentParams, InvalidParams, ParentLink,
};

/// Live camera source on the CSI bus.
#[derive(Debug, Clone)]
pub struct CsiSource {
    name: String,
    width: u32,
    height: u32,
    fps_n: u32,
    fps_d: u32,
    link: ParentLink,
}

impl CsiSource {
    pub fn new(
        name: &str,
        width: u32,
        height: u32,
        fps_n: u32,
        fps_d: u32,
    ) -> Result<Self, InvalidParams> {
        check_dimensions(width, height)?;
        if fps_n == 0 || fps_d == 0 {
            return Err(InvalidParams(format!(
                "invalid frame rate {}/{}",
                fps_n, fps_d
            )));
        }
        Ok(Self {
            name: name.to_string(),
            width,
            height,
            fps_n,
            fps_d,
            link: ParentLink::default(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Frame rate as a numerator/denominator pair.
    pub fn frame_rate(&self) -> (u32, u32) {
        (self.fps_n, self.fps_d)
    }

    pub fn is_live(&self) -> bool {
        true
    }
}

impl Component for CsiSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::CsiSource
    }

    fn link(&self) -> &ParentLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut ParentLink {
        &mut self.link
    }

    fn params(&self) -> ComponentParams {
        ComponentParams::CsiSource {
            width: self.width,
            height: self.height,
            fps_n: self.fps_n,
            fps_d: self.fps_d,
        }
    }
}

/// File-backed source decoding a stream from a `file:` URI.
#[derive(Debug, Clone)]
pub struct UriSource {
    name: String,
    uri: String,
    cudadec_mem_type: u32,
    intra_decode: bool,
    link: ParentLink,
}

impl UriSource {
    /// `uri` is expected to be resolved already (see
    /// [`crate::config::ServiceConfig::stream_path`]).
    pub fn new(
        name: &str,
        uri: &str,
        cudadec_mem_type: u32,
        intra_decode: bool,
    ) -> Result<Self, InvalidParams> {
        if uri.trim().is_empty() {
            return Err(InvalidParams("empty URI".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            uri: uri.to_string(),
            cudadec_mem_type,
            intra_decode,
            link: ParentLink::default(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Decoder memory type passed through to the engine.
    pub fn cudadec_mem_type(&self) -> u32 {
        self.cudadec_mem_type
    }

    pub fn intra_decode(&self) -> bool {
        self.intra_decode
    }

    pub fn is_live(&self) -> bool {
        false
    }
}

impl Component for UriSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::UriSource
    }

    fn link(&self) -> &ParentLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut ParentLink {
        &mut self.link
    }

    fn params(&self) -> ComponentParams {
        ComponentParams::UriSource {
            uri: self.uri.clone(),
            cudadec_mem_type: self.cudadec_mem_type,
            intra_decode: self.intra_decode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csi_source_is_live() {
        let source = CsiSource::new("cam", 1920, 1080, 30, 1).unwrap();
        assert!(source.is_live());
        assert_eq!(source.frame_rate(), (30, 1));
        assert_eq!(source.dimensions(), (1920, 1080));
    }

    #[test]
    fn test_csi_source_rejects_bad_parameters() {
        assert!(CsiSource::new("cam", 0, 1080, 30, 1).is_err());
        assert!(CsiSource::new("cam", 1920, 1080, 30, 0).is_err());
        assert!(CsiSource::new("cam", 1920, 1080, 0, 1).is_err());
    }

    #[test]
    fn test_uri_source() {
        let source = UriSource::new("file", "file:/streams/sample.mp4", 0, false).unwrap();
        assert!(!source.is_live());
        assert_eq!(source.uri(), "file:/streams/sample.mp4");
        assert!(UriSource::new("file", "  ", 0, false).is_err());
    }
}
