pub mod collider;
pub mod raycast;
pub mod tile_grid;

pub use collider::{Collider, ColliderKind, ColliderSource};
pub use tile_grid::TileCollisionGrid;
