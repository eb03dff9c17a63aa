//! Tiled display: composites every batched source into one frame.
//!
//! The tile grid is derived from the number of sources: the smallest
//! near-square grid that fits them all.

use crate::component::{
    check_dimensions, Component, ComponentKind, ComponentParams, InvalidParams, ParentLink,
};

#[derive(Debug, Clone)]
pub struct TiledDisplay {
    name: String,
    width: u32,
    height: u32,
    link: ParentLink,
}

impl TiledDisplay {
    pub fn new(name: &str, width: u32, height: u32) -> Result<Self, InvalidParams> {
        check_dimensions(width, height)?;
        Ok(Self {
            name: name.to_string(),
            width,
            height,
            link: ParentLink::default(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// `(rows, columns)` for `num_sources` tiles.
    pub fn tile_grid(num_sources: u32) -> (u32, u32) {
        if num_sources <= 1 {
            return (1, 1);
        }
        let mut columns = 1;
        while columns * columns < num_sources {
            columns += 1;
        }
        let rows = num_sources.div_ceil(columns);
        (rows, columns)
    }
}

impl Component for TiledDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::TiledDisplay
    }

    fn link(&self) -> &ParentLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut ParentLink {
        &mut self.link
    }

    fn params(&self) -> ComponentParams {
        ComponentParams::TiledDisplay {
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_grid() {
        assert_eq!(TiledDisplay::tile_grid(0), (1, 1));
        assert_eq!(TiledDisplay::tile_grid(1), (1, 1));
        assert_eq!(TiledDisplay::tile_grid(2), (1, 2));
        assert_eq!(TiledDisplay::tile_grid(4), (2, 2));
        assert_eq!(TiledDisplay::tile_grid(5), (2, 3));
        assert_eq!(TiledDisplay::tile_grid(9), (3, 3));
    }

    #[test]
    fn test_rejects_zero_size() {
        assert!(TiledDisplay::new("tiler", 0, 720).is_err());
    }
}
