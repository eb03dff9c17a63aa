//! On-screen display: draws inference metadata and an optional clock.

use crate::component::{Component, ComponentKind, ComponentParams, ParentLink};

#[derive(Debug, Clone)]
pub struct Osd {
    name: String,
    clock_enabled: bool,
    link: ParentLink,
}

impl Osd {
    pub fn new(name: &str, clock_enabled: bool) -> Self {
        Self {
            name: name.to_string(),
            clock_enabled,
            link: ParentLink::default(),
        }
    }

    pub fn is_clock_enabled(&self) -> bool {
        self.clock_enabled
    }
}

impl Component for Osd {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Osd
    }

    fn link(&self) -> &ParentLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut ParentLink {
        &mut self.link
    }

    fn params(&self) -> ComponentParams {
        ComponentParams::Osd {
            clock_enabled: self.clock_enabled,
        }
    }
}
