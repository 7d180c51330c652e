use crate::persistence::{PlayerRecord, PlayerRecordWriter};
use crate::session::{Session, SessionManager};
use crate::world::{Coord, World};
use rand::Rng;
use std::sync::Arc;
use tracing::warn;

/// One-cell movement directions. `up` moves toward row 0 and wraps to the
/// last row past the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Parse a wire token. Unrecognized tokens yield `None`: a move request
    /// with an unknown direction is a no-op, not an error.
    pub fn parse(token: &str) -> Option<Direction> {
        match token.trim() {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Direction {
        match rng.random_range(0..4) {
            0 => Direction::Up,
            1 => Direction::Down,
            2 => Direction::Left,
            _ => Direction::Right,
        }
    }

    /// Step one cell with wraparound: new coordinate = (old ± 1 + size) mod
    /// size, so moving off one edge re-enters at the opposite edge.
    pub fn step(self, from: Coord, width: u16, height: u16) -> Coord {
        let (x, y, width, height) = (
            from.x as u32,
            from.y as u32,
            width as u32,
            height as u32,
        );
        let (x, y) = match self {
            Direction::Up => (x, (y + height - 1) % height),
            Direction::Down => (x, (y + 1) % height),
            Direction::Left => ((x + width - 1) % width, y),
            Direction::Right => ((x + 1) % width, y),
        };
        Coord {
            x: x as u16,
            y: y as u16,
        }
    }
}

/// What one move produced. `opponent` is the battle trigger; capture has
/// already been applied (capture resolves first and does not preclude the
/// battle check).
#[derive(Debug)]
pub struct MoveOutcome {
    pub moved: bool,
    pub destination: Coord,
    /// Name of the creature captured at the destination, if any.
    pub captured: Option<String>,
    /// Another session standing on the destination cell.
    pub opponent: Option<Arc<Session>>,
}

/// Apply one move for a session: update the position with wraparound, then
/// resolve the destination cell. Creature capture is checked first
/// (collection capacity permitting, silently skipped otherwise), player
/// collision second. The session's own lock is taken before the world lock;
/// the collision scan runs after both are released.
pub fn resolve_move(
    session: &Session,
    direction: Direction,
    world: &World,
    sessions: &SessionManager,
    records: &dyn PlayerRecordWriter,
    team_capacity: usize,
) -> MoveOutcome {
    let (destination, captured, record) = {
        let mut state = session.state();

        // No movement while the session is fighting.
        if state.battle.is_some() {
            return MoveOutcome {
                moved: false,
                destination: state.position,
                captured: None,
                opponent: None,
            };
        }

        let destination = direction.step(state.position, world.width(), world.height());
        state.position = destination;

        let mut captured = None;
        let mut record = None;
        if state.collection.len() < team_capacity {
            if let Some(instance) = world.try_capture(destination) {
                captured = Some(instance.name().to_string());
                state.collection.push(instance);
                record = Some(PlayerRecord {
                    player_id: session.id.raw(),
                    pokemons: state.collection.clone(),
                });
            }
        }

        (destination, captured, record)
    };

    if let Some(record) = record {
        if let Err(err) = records.write_record(&record) {
            warn!(player = session.id.raw(), %err, "failed to persist capture");
        }
    }

    let opponent = sessions.find_other_at(destination, session.id);

    MoveOutcome {
        moved: true,
        destination,
        captured,
        opponent,
    }
}
