pub mod engine;
pub mod paytable;
pub mod rng;
pub mod symbols;

pub use crate::engine::{
    evaluate_round, simulate_rtp, spin_once, theoretical_rtp, RoundResult, RtpReport, WinTier,
};
pub use crate::paytable::{Paytable, PaytableEntry, PaytableError};
pub use crate::rng::{
    derive_floats, derive_hash_hex, symbol_from_float, verify_draw, ProvablyFairRng, SymbolSource,
    ThreadRngSource,
};
pub use crate::symbols::{render_line, Symbol, REELS, SYMBOL_COUNT};
