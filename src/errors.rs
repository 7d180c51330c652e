use std::fmt;

/// Errors related to loading or querying the pokedex roster
#[derive(Debug)]
pub enum PokedexError {
    /// The roster file could not be read
    Io(std::io::Error),
    /// The roster file could not be decoded
    Parse(serde_json::Error),
    /// The roster contained no templates
    EmptyRoster,
}

/// Errors related to writing player records
#[derive(Debug)]
pub enum PersistenceError {
    /// The record file or its directory could not be written
    Io(std::io::Error),
    /// The record could not be serialized
    Serialize(serde_json::Error),
}

/// Errors related to invalid battle transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleError {
    /// An attack was submitted while the battle was not in progress
    NotInProgress,
    /// An attack was submitted by the side that does not own the turn
    NotYourTurn(usize),
    /// A side index outside 0..2 was used
    InvalidSide(usize),
}

impl fmt::Display for PokedexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PokedexError::Io(err) => write!(f, "failed to read roster file: {}", err),
            PokedexError::Parse(err) => write!(f, "failed to decode roster file: {}", err),
            PokedexError::EmptyRoster => write!(f, "roster file contains no creatures"),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io(err) => write!(f, "failed to write player record: {}", err),
            PersistenceError::Serialize(err) => {
                write!(f, "failed to serialize player record: {}", err)
            }
        }
    }
}

impl fmt::Display for BattleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleError::NotInProgress => write!(f, "battle is not in progress"),
            BattleError::NotYourTurn(side) => write!(f, "it is not side {}'s turn", side),
            BattleError::InvalidSide(side) => write!(f, "invalid side index: {}", side),
        }
    }
}

impl std::error::Error for PokedexError {}
impl std::error::Error for PersistenceError {}
impl std::error::Error for BattleError {}

impl From<std::io::Error> for PokedexError {
    fn from(err: std::io::Error) -> Self {
        PokedexError::Io(err)
    }
}

impl From<serde_json::Error> for PokedexError {
    fn from(err: serde_json::Error) -> Self {
        PokedexError::Parse(err)
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialize(err)
    }
}

/// Type alias for Results using PokedexError
pub type PokedexResult<T> = Result<T, PokedexError>;

/// Type alias for Results using PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Type alias for Results using BattleError
pub type BattleResult<T> = Result<T, BattleError>;
