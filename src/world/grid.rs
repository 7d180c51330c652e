use crate::pokemon::{InstanceId, PokemonInst};
use std::collections::HashMap;

/// A cell position within the world, in [0, width) x [0, height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: u16,
    pub y: u16,
}

/// The fixed-size 2D world grid. Each cell holds at most one live creature;
/// occupancy is kept sparse because the live-creature cap is tiny next to
/// the cell count.
#[derive(Debug)]
pub struct WorldGrid {
    width: u16,
    height: u16,
    cells: HashMap<Coord, PokemonInst>,
}

impl WorldGrid {
    pub fn new(width: u16, height: u16) -> Self {
        WorldGrid {
            width: width.max(1),
            height: height.max(1),
            cells: HashMap::new(),
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    pub fn occupant(&self, coord: Coord) -> Option<&PokemonInst> {
        self.cells.get(&coord)
    }

    pub fn occupant_id(&self, coord: Coord) -> Option<InstanceId> {
        self.cells.get(&coord).map(|instance| instance.id)
    }

    /// Place an instance into an empty in-bounds cell. On an occupied or
    /// out-of-bounds target the instance is handed back untouched.
    pub fn place(&mut self, coord: Coord, instance: PokemonInst) -> Result<(), PokemonInst> {
        if !self.in_bounds(coord) || self.cells.contains_key(&coord) {
            return Err(instance);
        }
        self.cells.insert(coord, instance);
        Ok(())
    }

    /// Remove and return whatever occupies the cell.
    pub fn take(&mut self, coord: Coord) -> Option<PokemonInst> {
        self.cells.remove(&coord)
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
