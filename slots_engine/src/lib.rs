//! Slot round engine: one [`RoundEngine`] per game frame, settling bets and
//! wins against a remote [`Ledger`] and falling back to an in-memory balance
//! when there is no remote session or the ledger cannot be reached.

pub mod config;
pub mod error;
pub mod ledger;
pub mod round;
pub mod session;

pub use config::{BetFallback, BetLimits, ConfigError, EngineConfig};
pub use error::{LedgerError, Result};
pub use ledger::{HttpLedger, Ledger};
pub use round::{
    new_round_id, Message, MessageKind, Refusal, RoundEngine, RoundPhase, RoundReport,
    Settlement, SpinOutcome,
};
pub use session::{RemoteContext, Session, SessionParams};
