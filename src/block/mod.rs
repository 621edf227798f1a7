//! Block type tags and the opacity/texture classification table the mesher
//! and lighting propagator consult.

/// An 8-bit block type tag. `Air` (0) is always transparent and non-opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockType(pub u8);

impl BlockType {
    pub const AIR: BlockType = BlockType(0);

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

/// Per-vertex texture array layer, baked into the packed vertex.
pub type TextureId = u16;

/// Which of a block's faces (or "all") map to which texture layer.
#[derive(Debug, Clone, Copy)]
pub enum FaceTextures {
    Uniform(TextureId),
    TopSideBottom { top: TextureId, side: TextureId, bottom: TextureId },
}

impl FaceTextures {
    pub fn for_direction(self, d: crate::index::Direction) -> TextureId {
        match self {
            FaceTextures::Uniform(t) => t,
            FaceTextures::TopSideBottom { top, side, bottom } => match d {
                crate::index::Direction::Top => top,
                crate::index::Direction::Bottom => bottom,
                _ => side,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockProperties {
    /// Non-opaque: light travels through, and the mesher must emit a visible
    /// face at the boundary with an opaque neighbour.
    pub transparent: bool,
    pub collidable: bool,
    pub textures: FaceTextures,
}

/// Maps `BlockType` tags to their render/physical properties. Populated by
/// the consuming application (block IDs and their textures are data, not
/// part of this core); the core only needs the classification functions
/// below to do its job.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    properties: Vec<BlockProperties>,
}

impl BlockRegistry {
    /// Builds a registry with `Air` pre-registered as entry 0.
    pub fn new() -> Self {
        Self {
            properties: vec![BlockProperties {
                transparent: true,
                collidable: false,
                textures: FaceTextures::Uniform(0),
            }],
        }
    }

    /// Registers a new block type, returning its assigned tag.
    pub fn register(&mut self, props: BlockProperties) -> BlockType {
        let id = self.properties.len() as u8;
        self.properties.push(props);
        BlockType(id)
    }

    pub fn properties(&self, t: BlockType) -> BlockProperties {
        self.properties[t.0 as usize]
    }

    pub fn is_transparent(&self, t: BlockType) -> bool {
        t.is_air() || self.properties(t).transparent
    }

    pub fn is_opaque(&self, t: BlockType) -> bool {
        !self.is_transparent(t)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
