use crate::errors::PersistenceResult;
use crate::pokemon::PokemonInst;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Snapshot of a player's captured creatures, handed to the record writer
/// after every capture.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRecord {
    pub player_id: u64,
    pub pokemons: Vec<PokemonInst>,
}

/// Sink for player records. The core only hands over the full updated
/// collection; format and location are the implementation's concern.
pub trait PlayerRecordWriter: Send + Sync {
    fn write_record(&self, record: &PlayerRecord) -> PersistenceResult<()>;
}

/// Writes one pretty-printed JSON file per player under a records directory.
#[derive(Debug, Clone)]
pub struct JsonRecordWriter {
    dir: PathBuf,
}

impl JsonRecordWriter {
    pub fn new(dir: PathBuf) -> Self {
        JsonRecordWriter { dir }
    }
}

impl PlayerRecordWriter for JsonRecordWriter {
    fn write_record(&self, record: &PlayerRecord) -> PersistenceResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("player{}_data.json", record.player_id));
        let json = serde_json::to_string_pretty(record)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Discards every record. For world setups that run without persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecordWriter;

impl PlayerRecordWriter for NullRecordWriter {
    fn write_record(&self, _record: &PlayerRecord) -> PersistenceResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pokedex::PokemonTemplate;
    use crate::pokemon::PokemonInst;
    use crate::type_chart::PokemonType;

    #[test]
    fn writes_one_file_per_player() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonRecordWriter::new(dir.path().to_path_buf());

        let template =
            PokemonTemplate::new_for_test("pidgey", vec![PokemonType::Flying], 40, 45, 40, 56, 35, 35);
        let record = PlayerRecord {
            player_id: 7,
            pokemons: vec![PokemonInst::new_for_test(&template)],
        };

        writer.write_record(&record).unwrap();

        let path = dir.path().join("player7_data.json");
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("pidgey"));
        assert!(contents.contains("\"player_id\": 7"));
    }
}
