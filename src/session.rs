use crate::pokemon::PokemonInst;
use crate::server::BattleHandle;
use crate::world::Coord;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use tracing::info;

/// Identity of one connected player for the lifetime of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player{}", self.0)
    }
}

/// Mutable per-session fields, guarded by the session's own lock.
///
/// Lock order: a session's state lock comes before the world lock; the
/// session-set lock comes before any individual session's state lock. No
/// code path takes two session state locks except battle setup, which
/// acquires them in id order.
#[derive(Debug)]
pub struct SessionState {
    pub position: Coord,
    /// The creatures drafted at connection start, used in battles.
    pub battle_team: Vec<PokemonInst>,
    /// Creatures captured while roaming the world.
    pub collection: Vec<PokemonInst>,
    pub auto_until: Option<Instant>,
    /// Bumped every time auto-roam is enabled, so a stale roam task can tell
    /// it has been replaced.
    pub auto_generation: u64,
    pub battle: Option<Arc<BattleHandle>>,
}

/// One connected player: identity, an outbound line channel drained by the
/// connection's writer task, and the lock-guarded mutable state.
pub struct Session {
    pub id: SessionId,
    outbound: UnboundedSender<String>,
    /// Signalled when this session is pulled into a battle, so the
    /// connection worker can switch into the battle loop.
    pub battle_started: Notify,
    state: Mutex<SessionState>,
}

impl Session {
    /// Queue one line for the client. Errors mean the connection is gone;
    /// the line is dropped and teardown handles the rest.
    pub fn send_line(&self, line: impl Into<String>) {
        let _ = self.outbound.send(line.into());
    }

    pub fn state(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn position(&self) -> Coord {
        self.state().position
    }

    pub fn current_battle(&self) -> Option<Arc<BattleHandle>> {
        self.state().battle.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

/// The set of active sessions, one per connection. Guarded by its own lock,
/// independent of the world domain.
pub struct SessionManager {
    width: u16,
    height: u16,
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(width: u16, height: u16) -> Self {
        SessionManager {
            width: width.max(1),
            height: height.max(1),
            next_id: AtomicU64::new(0),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a session at a uniformly random position and register it.
    pub fn create_session(
        &self,
        battle_team: Vec<PokemonInst>,
        outbound: UnboundedSender<String>,
    ) -> Arc<Session> {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        let mut rng = rand::rng();
        let position = Coord {
            x: rng.random_range(0..self.width),
            y: rng.random_range(0..self.height),
        };

        let session = Arc::new(Session {
            id,
            outbound,
            battle_started: Notify::new(),
            state: Mutex::new(SessionState {
                position,
                battle_team,
                collection: Vec::new(),
                auto_until: None,
                auto_generation: 0,
                battle: None,
            }),
        });

        self.lock_sessions().insert(id, session.clone());
        info!(%id, x = position.x, y = position.y, "session created");
        session
    }

    pub fn remove_session(&self, id: SessionId) -> Option<Arc<Session>> {
        let removed = self.lock_sessions().remove(&id);
        if removed.is_some() {
            info!(%id, "session removed");
        }
        removed
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.lock_sessions().get(&id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Find another session standing on `coord`, skipping sessions already
    /// in a battle. Takes the set lock, then each candidate's state lock
    /// briefly; callers must not hold any session state lock.
    pub fn find_other_at(&self, coord: Coord, exclude: SessionId) -> Option<Arc<Session>> {
        let sessions = self.lock_sessions();
        for (id, session) in sessions.iter() {
            if *id == exclude {
                continue;
            }
            let state = session.state();
            if state.position == coord && state.battle.is_none() {
                return Some(session.clone());
            }
        }
        None
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<Session>>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
