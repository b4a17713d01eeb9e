use serde::{Deserialize, Serialize};

use crate::{
    paytable::Paytable,
    rng::SymbolSource,
    symbols::{Symbol, REELS},
};

/// Outcome of one round. Produced per spin and dropped after display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub symbols: [Symbol; REELS],
    pub is_win: bool,
    pub win_amount: f64,
    pub multiplier: u32,
}

impl RoundResult {
    pub fn tier(&self) -> Option<WinTier> {
        self.is_win.then(|| WinTier::for_multiplier(self.multiplier))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinTier {
    Regular,
    BigWin,
    Jackpot,
}

impl WinTier {
    pub const BIG_WIN_MULTIPLIER: u32 = 50;
    pub const JACKPOT_MULTIPLIER: u32 = 500;

    pub fn for_multiplier(multiplier: u32) -> Self {
        if multiplier >= Self::JACKPOT_MULTIPLIER {
            WinTier::Jackpot
        } else if multiplier >= Self::BIG_WIN_MULTIPLIER {
            WinTier::BigWin
        } else {
            WinTier::Regular
        }
    }
}

/// Pays only when all three reels show the same symbol.
pub fn evaluate_round(bet: u32, symbols: [Symbol; REELS], paytable: &Paytable) -> RoundResult {
    let [a, b, c] = symbols;
    let multiplier = if a == b && b == c {
        paytable.multiplier_for(a).unwrap_or(0)
    } else {
        0
    };
    RoundResult {
        symbols,
        is_win: multiplier > 0,
        win_amount: f64::from(bet) * f64::from(multiplier),
        multiplier,
    }
}

/// Draws from `source` and evaluates the line.
pub fn spin_once<S: SymbolSource + ?Sized>(
    source: &mut S,
    paytable: &Paytable,
    bet: u32,
) -> RoundResult {
    evaluate_round(bet, source.draw(), paytable)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RtpReport {
    pub rounds: u64,
    pub hits: u64,
    pub total_bet: f64,
    pub total_paid: f64,
}

impl RtpReport {
    pub fn record(&mut self, bet: u32, result: &RoundResult) {
        self.rounds += 1;
        self.total_bet += f64::from(bet);
        self.total_paid += result.win_amount;
        if result.is_win {
            self.hits += 1;
        }
    }

    pub fn rtp(&self) -> f64 {
        if self.total_bet == 0.0 {
            0.0
        } else {
            self.total_paid / self.total_bet
        }
    }

    pub fn hit_rate(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.hits as f64 / self.rounds as f64
        }
    }
}

/// Plays `rounds` rounds at a flat bet and reports the empirical return.
pub fn simulate_rtp<S: SymbolSource + ?Sized>(
    source: &mut S,
    paytable: &Paytable,
    bet: u32,
    rounds: u64,
) -> RtpReport {
    let mut report = RtpReport::default();
    for _ in 0..rounds {
        let result = spin_once(source, paytable, bet);
        report.record(bet, &result);
    }
    report
}

/// Theoretical return of a flat three-reel draw: each triple has probability 1/8^3.
pub fn theoretical_rtp(paytable: &Paytable) -> f64 {
    let per_triple = 1.0 / (crate::symbols::SYMBOL_COUNT as f64).powi(REELS as i32);
    Symbol::ALL
        .iter()
        .filter_map(|s| paytable.multiplier_for(*s))
        .map(|m| f64::from(m) * per_triple)
        .sum()
}
