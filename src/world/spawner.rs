use crate::config::WorldConfig;
use crate::pokedex::Pokedex;
use crate::pokemon::{InstanceId, PokemonInst};
use crate::world::grid::{Coord, WorldGrid};
use rand::Rng;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug)]
struct DespawnEntry {
    coord: Coord,
    due: Instant,
}

/// Grid, despawn schedule and live counter form one consistency domain:
/// every mutation happens under this struct's single mutex, so a capture and
/// a despawn can never race on the same cell.
#[derive(Debug)]
struct WorldInner {
    grid: WorldGrid,
    /// Entry exists iff the instance is on the grid and not yet captured.
    despawn_pending: HashMap<InstanceId, DespawnEntry>,
    /// Deadline order for the sweeper. May hold stale ids whose pending
    /// entry was cancelled by a capture; those are skipped on pop.
    despawn_queue: BinaryHeap<Reverse<(Instant, InstanceId)>>,
    live: usize,
}

/// The shared world: spawn waves, despawn processing and captures all go
/// through here. Safe to share across connection workers and the background
/// spawn/sweeper tasks.
pub struct World {
    inner: Mutex<WorldInner>,
    pokedex: Arc<Pokedex>,
    config: WorldConfig,
}

impl World {
    pub fn new(config: WorldConfig, pokedex: Arc<Pokedex>) -> Self {
        World {
            inner: Mutex::new(WorldInner {
                grid: WorldGrid::new(config.width, config.height),
                despawn_pending: HashMap::new(),
                despawn_queue: BinaryHeap::new(),
                live: 0,
            }),
            pokedex,
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn width(&self) -> u16 {
        self.config.width
    }

    pub fn height(&self) -> u16 {
        self.config.height
    }

    pub fn live_count(&self) -> usize {
        self.lock_inner().live
    }

    /// Attempt up to `count` spawns into uniformly random cells, bounded by
    /// the global live cap. An occupied target cell is skipped, not retried:
    /// per-wave capacity is probabilistic, not guaranteed.
    pub fn spawn_wave(&self, count: usize) -> usize {
        self.spawn_wave_at(count, Instant::now())
    }

    pub fn spawn_wave_at(&self, count: usize, now: Instant) -> usize {
        let mut rng = rand::rng();
        let mut inner = self.lock_inner();
        let mut placed = 0;

        for _ in 0..count {
            if inner.live >= self.config.max_live {
                break;
            }

            let coord = Coord {
                x: rng.random_range(0..self.config.width),
                y: rng.random_range(0..self.config.height),
            };
            if inner.grid.occupant(coord).is_some() {
                continue;
            }

            let template = self.pokedex.random_template(&mut rng);
            let instance = PokemonInst::spawned(template, &mut rng);
            let id = instance.id;
            let due = now + self.config.despawn_after;

            if inner.grid.place(coord, instance).is_ok() {
                inner.despawn_pending.insert(id, DespawnEntry { coord, due });
                inner.despawn_queue.push(Reverse((due, id)));
                inner.live += 1;
                placed += 1;
            }
        }

        debug!(placed, live = inner.live, "spawn wave finished");
        placed
    }

    /// Clear every creature whose despawn deadline has passed. A pending
    /// entry cancelled by a capture makes the queued deadline a no-op, and
    /// the cell is only cleared while it still holds that exact instance,
    /// so the live counter is decremented at most once per instance.
    pub fn process_due_despawns(&self, now: Instant) -> usize {
        let mut inner = self.lock_inner();
        let mut removed = 0;

        while let Some(&Reverse((due, id))) = inner.despawn_queue.peek() {
            if due > now {
                break;
            }
            inner.despawn_queue.pop();

            let Some(entry) = inner.despawn_pending.remove(&id) else {
                continue;
            };
            if inner.grid.occupant_id(entry.coord) == Some(id) {
                if let Some(instance) = inner.grid.take(entry.coord) {
                    inner.live -= 1;
                    removed += 1;
                    debug!(name = instance.name(), x = entry.coord.x, y = entry.coord.y, "despawned");
                }
            }
        }

        removed
    }

    /// Remove the creature at `coord` for capture, cancelling its scheduled
    /// despawn in the same critical section. Returns `None` when the cell is
    /// empty.
    pub fn try_capture(&self, coord: Coord) -> Option<PokemonInst> {
        let mut inner = self.lock_inner();
        let instance = inner.grid.take(coord)?;
        inner.despawn_pending.remove(&instance.id);
        inner.live -= 1;
        Some(instance)
    }

    /// Background task: one spawn wave per configured interval, independent
    /// of any connection.
    pub async fn run_spawn_cycle(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.spawn_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let placed = self.spawn_wave(self.config.spawn_batch);
            info!(placed, live = self.live_count(), "spawn cycle");
        }
    }

    /// Background task: sweep the despawn schedule once a second.
    pub async fn run_despawn_sweeper(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = self.process_due_despawns(Instant::now());
            if removed > 0 {
                info!(removed, live = self.live_count(), "despawn sweep");
            }
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, WorldInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
