use crate::pokedex::PokemonTemplate;
use crate::type_chart::PokemonType;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity for a live creature instance. Ids are process-unique and
/// never reused, so "is this the same instance" checks (capture racing a
/// scheduled despawn) are id comparisons rather than reference comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(u64);

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

impl InstanceId {
    fn next() -> Self {
        InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A live, mutable creature derived from a roster template: current HP,
/// level, and the EV multiplier assigned at spawn time. Combat math reads
/// the unscaled base stats; level and EV are spawn metadata carried for the
/// capture record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonInst {
    pub id: InstanceId,
    #[serde(flatten)]
    pub template: PokemonTemplate,
    pub level: u8,
    pub ev: f64,
    pub current_hp: u16,
}

impl PokemonInst {
    /// Instantiate a world spawn: random level in [1, 100], random EV
    /// multiplier in [0.5, 1.0), full HP.
    pub fn spawned<R: Rng + ?Sized>(template: &PokemonTemplate, rng: &mut R) -> Self {
        PokemonInst {
            id: InstanceId::next(),
            template: template.clone(),
            level: rng.random_range(1..=100),
            ev: rng.random_range(0.5..1.0),
            current_hp: template.hp,
        }
    }

    /// Instantiate a battle-team draft pick. Drafted creatures carry the
    /// catalog defaults (level 1, EV 0.5) rather than spawn randomness.
    pub fn drafted(template: &PokemonTemplate) -> Self {
        PokemonInst {
            id: InstanceId::next(),
            template: template.clone(),
            level: 1,
            ev: 0.5,
            current_hp: template.hp,
        }
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn types(&self) -> &[PokemonType] {
        &self.template.types
    }

    pub fn max_hp(&self) -> u16 {
        self.template.hp
    }

    pub fn attack(&self) -> u16 {
        self.template.attack
    }

    pub fn defense(&self) -> u16 {
        self.template.defense
    }

    pub fn speed(&self) -> u16 {
        self.template.speed
    }

    pub fn special_attack(&self) -> u16 {
        self.template.special_attack
    }

    pub fn special_defense(&self) -> u16 {
        self.template.special_defense
    }

    /// Subtract damage from current HP, flooring at 0. Returns remaining HP.
    pub fn take_damage(&mut self, damage: u16) -> u16 {
        self.current_hp = self.current_hp.saturating_sub(damage);
        self.current_hp
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    /// Build an instance directly from a template for tests.
    pub fn new_for_test(template: &PokemonTemplate) -> Self {
        PokemonInst::drafted(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pokedex::PokemonTemplate;
    use pretty_assertions::assert_eq;

    fn template() -> PokemonTemplate {
        PokemonTemplate::new_for_test(
            "pikachu",
            vec![PokemonType::Electric],
            35,
            55,
            40,
            90,
            50,
            50,
        )
    }

    #[test]
    fn instance_ids_are_unique() {
        let template = template();
        let mut rng = rand::rng();
        let a = PokemonInst::spawned(&template, &mut rng);
        let b = PokemonInst::spawned(&template, &mut rng);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn spawned_instance_is_within_spawn_ranges() {
        let template = template();
        let mut rng = rand::rng();
        for _ in 0..50 {
            let instance = PokemonInst::spawned(&template, &mut rng);
            assert!((1..=100).contains(&instance.level));
            assert!((0.5..1.0).contains(&instance.ev));
            assert_eq!(instance.current_hp, 35);
        }
    }

    #[test]
    fn damage_floors_at_zero_and_faints() {
        let template = template();
        let mut instance = PokemonInst::drafted(&template);

        assert_eq!(instance.take_damage(30), 5);
        assert!(!instance.is_fainted());
        assert_eq!(instance.take_damage(100), 0);
        assert!(instance.is_fainted());
    }
}
