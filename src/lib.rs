//! Streaming voxel world core: an origin-relative chunk container, its
//! demand-paged boundary set, a bucketed-BFS sunlight propagator, a quad
//! mesher with baked ambient occlusion, and the GPU-resident memory pools
//! and indirect multi-draw arenas that present meshed chunks to the
//! renderer. See `DESIGN.md` for how each module is grounded.

pub mod arrays;
pub mod block;
pub mod chunk;
pub mod concurrency;
pub mod config;
pub mod container;
pub mod error;
pub mod frustum;
pub mod gpu;
pub mod index;
pub mod lighting;
pub mod mesher;
pub mod pipeline;
pub mod sort;
pub mod terrain;

/// Common imports for consumers wiring the pipeline, container, and arenas
/// together.
pub mod prelude {
    pub use crate::arrays::{BlockArrayBox, BlockBox};
    pub use crate::block::{BlockProperties, BlockRegistry, BlockType, FaceTextures};
    pub use crate::chunk::{BlockLight, Chunk, NonOpaqueFaces};
    pub use crate::config::WorldConfig;
    pub use crate::container::{ChunkContainer, ChunkHandle};
    pub use crate::error::EngineError;
    pub use crate::frustum::Frustum;
    pub use crate::gpu::{ChunkArena, DrawHandle, IndirectDrawCommand, MemoryPool, MultiDrawArena};
    pub use crate::index::{BlockIndex, Direction, GlobalIndex, LocalIndex};
    pub use crate::mesher::{MeshedDraw, PackedVertex, Voxel};
    pub use crate::pipeline::{PipelineContext, PipelineDriver, Priority, Scheduler, TaskKind, TaskOutcome};

    pub use glam::{IVec3, Mat4, Vec3};
    pub use parking_lot::{Mutex, RwLock};
}

/// Current crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
