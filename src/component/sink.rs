//! Overlay sink: renders the pipeline output onto a hardware overlay plane.

use crate::component::{
    check_dimensions, Component, ComponentKind, ComponentParams, InvalidParams, ParentLink,
};

#[derive(Debug, Clone)]
pub struct OverlaySink {
    name: String,
    offset_x: u32,
    offset_y: u32,
    width: u32,
    height: u32,
    link: ParentLink,
}

impl OverlaySink {
    pub fn new(
        name: &str,
        offset_x: u32,
        offset_y: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, InvalidParams> {
        check_dimensions(width, height)?;
        Ok(Self {
            name: name.to_string(),
            offset_x,
            offset_y,
            width,
            height,
            link: ParentLink::default(),
        })
    }

    pub fn offsets(&self) -> (u32, u32) {
        (self.offset_x, self.offset_y)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Component for OverlaySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::OverlaySink
    }

    fn link(&self) -> &ParentLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut ParentLink {
        &mut self.link
    }

    fn params(&self) -> ComponentParams {
        ComponentParams::OverlaySink {
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            width: self.width,
            height: self.height,
        }
    }
}
