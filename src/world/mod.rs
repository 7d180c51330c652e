pub mod grid;
pub mod spawner;

pub use grid::{Coord, WorldGrid};
pub use spawner::World;
