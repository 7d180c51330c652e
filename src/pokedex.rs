use crate::errors::{PokedexError, PokedexResult};
use crate::type_chart::PokemonType;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Immutable base definition of a creature: name, elemental types, and base
/// stats. Field names follow the on-disk roster format produced by the
/// catalog importer, so a roster file decodes directly into templates.
/// Never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub types: Vec<PokemonType>,
    pub hp: u16,
    pub base_exp: u16,
    pub attack: u16,
    pub defense: u16,
    pub speed: u16,
    pub special_attack: u16,
    pub special_defense: u16,
}

/// The finalized roster of creature templates. World spawns and team drafts
/// both draw instances from here; the registry itself is read-only for the
/// lifetime of the server.
#[derive(Debug, Clone)]
pub struct Pokedex {
    templates: Vec<PokemonTemplate>,
}

impl Pokedex {
    /// Wrap an already-materialized template list. An empty roster is
    /// rejected up front so spawn and draft code never has to handle it.
    pub fn new(templates: Vec<PokemonTemplate>) -> PokedexResult<Self> {
        if templates.is_empty() {
            return Err(PokedexError::EmptyRoster);
        }
        Ok(Pokedex { templates })
    }

    /// Load the roster from a JSON file in the catalog importer's format
    /// (a top-level array of template records).
    pub fn load_from_json(path: &Path) -> PokedexResult<Self> {
        let content = fs::read_to_string(path)?;
        let templates: Vec<PokemonTemplate> = serde_json::from_str(&content)?;
        Pokedex::new(templates)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Get a template by 0-based index.
    pub fn get(&self, index: usize) -> Option<&PokemonTemplate> {
        self.templates.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PokemonTemplate> {
        self.templates.iter()
    }

    /// Draw a uniformly random template, for world spawns.
    pub fn random_template<R: Rng + ?Sized>(&self, rng: &mut R) -> &PokemonTemplate {
        let index = rng.random_range(0..self.templates.len());
        &self.templates[index]
    }
}

impl PokemonTemplate {
    /// Build a bare template for tests without going through a roster file.
    pub fn new_for_test(
        name: &str,
        types: Vec<PokemonType>,
        hp: u16,
        attack: u16,
        defense: u16,
        speed: u16,
        special_attack: u16,
        special_defense: u16,
    ) -> Self {
        PokemonTemplate {
            name: name.to_string(),
            types,
            hp,
            base_exp: 0,
            attack,
            defense,
            speed,
            special_attack,
            special_defense,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ROSTER_JSON: &str = r#"[
        {
            "name": "bulbasaur",
            "type": ["grass", "poison"],
            "hp": 45,
            "base_exp": 64,
            "attack": 49,
            "defense": 49,
            "speed": 45,
            "special_attack": 65,
            "special_defense": 65,
            "level": 1,
            "accum_exp": 0,
            "ev": 0.5
        }
    ]"#;

    #[test]
    fn decodes_importer_format_and_ignores_instance_fields() {
        let templates: Vec<PokemonTemplate> = serde_json::from_str(ROSTER_JSON).unwrap();
        let dex = Pokedex::new(templates).unwrap();

        assert_eq!(dex.len(), 1);
        let bulbasaur = dex.get(0).unwrap();
        assert_eq!(bulbasaur.name, "bulbasaur");
        assert_eq!(
            bulbasaur.types,
            vec![PokemonType::Grass, PokemonType::Poison]
        );
        assert_eq!(bulbasaur.special_attack, 65);
    }

    #[test]
    fn empty_roster_is_rejected() {
        assert!(matches!(
            Pokedex::new(Vec::new()),
            Err(PokedexError::EmptyRoster)
        ));
    }

    #[test]
    fn random_template_draws_from_roster() {
        let templates = vec![
            PokemonTemplate::new_for_test("a", vec![PokemonType::Normal], 10, 1, 1, 1, 1, 1),
            PokemonTemplate::new_for_test("b", vec![PokemonType::Fire], 10, 1, 1, 1, 1, 1),
        ];
        let dex = Pokedex::new(templates).unwrap();
        let mut rng = rand::rng();

        for _ in 0..20 {
            let template = dex.random_template(&mut rng);
            assert!(template.name == "a" || template.name == "b");
        }
    }
}
