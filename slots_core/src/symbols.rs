use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of distinct symbols on each reel.
pub const SYMBOL_COUNT: usize = 8;

/// Number of reels drawn per round.
pub const REELS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Cherry,
    Lemon,
    Orange,
    Grape,
    Watermelon,
    Diamond,
    SlotMachine,
    Seven,
}

impl Symbol {
    pub const ALL: [Symbol; SYMBOL_COUNT] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Orange,
        Symbol::Grape,
        Symbol::Watermelon,
        Symbol::Diamond,
        Symbol::SlotMachine,
        Symbol::Seven,
    ];

    pub fn from_index(i: u8) -> Self {
        Self::ALL[i as usize % SYMBOL_COUNT]
    }

    pub fn to_index(self) -> u8 {
        self as u8
    }

    /// Glyph shown on the reel.
    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Orange => "🍊",
            Symbol::Grape => "🍇",
            Symbol::Watermelon => "🍉",
            Symbol::Diamond => "💎",
            Symbol::SlotMachine => "🎰",
            Symbol::Seven => "7️⃣",
        }
    }

    pub fn from_glyph(glyph: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.glyph() == glyph)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Formats a reel line as space separated glyphs.
pub fn render_line(symbols: &[Symbol; REELS]) -> String {
    symbols
        .iter()
        .map(|s| s.glyph())
        .collect::<Vec<_>>()
        .join(" ")
}
