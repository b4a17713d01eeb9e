use crate::symbols::Symbol;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaytableEntry {
    pub symbol: Symbol,
    pub multiplier: u32,
}

/// Three-of-a-kind multipliers. Symbols without an entry pay nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paytable(pub Vec<PaytableEntry>);

#[derive(thiserror::Error, Debug)]
pub enum PaytableError {
    #[error("failed to read paytable: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid paytable json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate entry for {0:?}")]
    Duplicate(Symbol),
}

impl Paytable {
    pub fn classic() -> Self {
        Self(vec![
            PaytableEntry {
                symbol: Symbol::Cherry,
                multiplier: 10,
            },
            PaytableEntry {
                symbol: Symbol::Lemon,
                multiplier: 15,
            },
            PaytableEntry {
                symbol: Symbol::Orange,
                multiplier: 20,
            },
            PaytableEntry {
                symbol: Symbol::Grape,
                multiplier: 25,
            },
            PaytableEntry {
                symbol: Symbol::Watermelon,
                multiplier: 30,
            },
            PaytableEntry {
                symbol: Symbol::Diamond,
                multiplier: 50,
            },
            PaytableEntry {
                symbol: Symbol::SlotMachine,
                multiplier: 100,
            },
            PaytableEntry {
                symbol: Symbol::Seven,
                multiplier: 500,
            },
        ])
    }

    pub fn multiplier_for(&self, symbol: Symbol) -> Option<u32> {
        self.0
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| e.multiplier)
    }

    pub fn from_json(json: &str) -> Result<Self, PaytableError> {
        let entries: Vec<PaytableEntry> = serde_json::from_str(json)?;
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.symbol == entry.symbol) {
                return Err(PaytableError::Duplicate(entry.symbol));
            }
        }
        Ok(Self(entries))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PaytableError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Default for Paytable {
    fn default() -> Self {
        Self::classic()
    }
}
