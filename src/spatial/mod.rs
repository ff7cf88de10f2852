//! Per-tick spatial indexing: bump arena plus the quadtree built inside it

pub mod arena;
pub mod quadtree;

pub use arena::{Arena, Span};
pub use quadtree::{InRange, QuadTree, TreeArena};
