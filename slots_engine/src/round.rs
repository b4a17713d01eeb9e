use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use rand::{distributions::Alphanumeric, Rng};
use slots_core::{
    evaluate_round, render_line, Paytable, RoundResult, SymbolSource, ThreadRngSource, WinTier,
};
use slots_shared::{BetRequest, FrameMessage, WinRequest};
use tracing::{debug, info, warn};

use crate::config::{BetFallback, EngineConfig};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::session::{RemoteContext, Session, SessionParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Betting,
    Spinning,
    Settling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Win,
    Error,
}

/// Last line of feedback shown to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Where a balance change was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Remote,
    Local,
}

/// Why a spin did not produce a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    InsufficientBalance,
    BetRejected(String),
    LedgerUnreachable,
}

impl Refusal {
    pub fn message(&self) -> String {
        match self {
            Refusal::InsufficientBalance => "Insufficient balance!".to_string(),
            Refusal::BetRejected(reason) => format!("Bet failed: {reason}"),
            Refusal::LedgerUnreachable => "Bet failed: ledger unreachable".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round_id: String,
    pub bet: u32,
    pub result: RoundResult,
    pub balance: f64,
    pub bet_settlement: Settlement,
    /// `None` for losing rounds.
    pub win_settlement: Option<Settlement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpinOutcome {
    /// A round was already in flight.
    Ignored,
    Refused(Refusal),
    Settled(RoundReport),
}

struct EngineState {
    session: Session,
    phase: RoundPhase,
    message: Option<Message>,
}

/// Runs rounds for one game frame.
///
/// Rounds go `Idle -> Betting -> Spinning -> Settling -> Idle`. With a remote
/// context every balance change is sent to the [`Ledger`] first and the
/// ledger's reply replaces the local balance; without one (demo mode) the
/// ledger is never called.
///
/// All methods take `&self`, so the spin trigger and host messages can be
/// driven from separate tasks. At most one round is in flight; extra spin
/// requests return [`SpinOutcome::Ignored`].
pub struct RoundEngine<L> {
    ledger: L,
    config: EngineConfig,
    paytable: Paytable,
    remote: Option<RemoteContext>,
    source: Mutex<Box<dyn SymbolSource + Send>>,
    state: Mutex<EngineState>,
    spinning: AtomicBool,
}

impl<L: Ledger> RoundEngine<L> {
    /// Creates the session for a freshly loaded frame.
    ///
    /// Remote play needs all three launch identifiers and ledger credentials.
    /// If the opening balance cannot be fetched the demo balance is used, but
    /// bets still go to the ledger.
    pub async fn load(params: SessionParams, ledger: L, config: EngineConfig) -> Self {
        let remote = params
            .remote_context()
            .filter(|_| ledger.has_credentials());
        let balance = match &remote {
            Some(ctx) => match ledger.balance().await {
                Ok(balance) => {
                    info!(game_id = ctx.game_id, balance, "session loaded from ledger");
                    balance
                }
                Err(e) => {
                    warn!(error = %e, "failed to load balance, using demo balance");
                    config.demo_balance
                }
            },
            None => {
                info!("running in demo mode");
                config.demo_balance
            }
        };
        Self {
            ledger,
            paytable: Paytable::classic(),
            remote,
            source: Mutex::new(Box::new(ThreadRngSource)),
            state: Mutex::new(EngineState {
                session: Session::new(params, balance),
                phase: RoundPhase::Idle,
                message: None,
            }),
            spinning: AtomicBool::new(false),
            config,
        }
    }

    pub fn with_paytable(mut self, paytable: Paytable) -> Self {
        self.paytable = paytable;
        self
    }

    pub fn with_source(self, source: impl SymbolSource + Send + 'static) -> Self {
        *lock(&self.source) = Box::new(source);
        self
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> RoundPhase {
        self.state().phase
    }

    pub fn session(&self) -> Session {
        self.state().session.clone()
    }

    pub fn balance(&self) -> f64 {
        self.state().session.balance
    }

    pub fn message(&self) -> Option<Message> {
        self.state().message.clone()
    }

    pub fn paytable(&self) -> &Paytable {
        &self.paytable
    }

    pub fn change_bet(&self, delta: i64) -> bool {
        self.state()
            .session
            .change_bet(delta, self.config.bet_limits)
    }

    pub fn set_bet(&self, amount: u32) -> bool {
        self.state().session.set_bet(amount, self.config.bet_limits)
    }

    /// Message announcing the frame to its host window.
    pub fn loaded_message(&self) -> FrameMessage {
        FrameMessage::GameLoaded {
            game_id: self.state().session.game_id,
        }
    }

    /// Applies a message from the host window. Returns whether it was understood.
    pub fn handle_frame_message(&self, message: &FrameMessage) -> bool {
        match message {
            FrameMessage::UpdateBalance { balance } => {
                debug!(balance, "balance updated by host");
                self.state().session.balance = *balance;
                true
            }
            FrameMessage::GameLoaded { .. } => false,
        }
    }

    pub fn handle_frame_json(&self, json: &str) -> bool {
        FrameMessage::parse(json).is_some_and(|m| self.handle_frame_message(&m))
    }

    /// Plays one round with the current bet.
    pub async fn spin(&self) -> SpinOutcome {
        let Some(_guard) = RoundGuard::acquire(self) else {
            debug!("spin ignored: round in flight");
            return SpinOutcome::Ignored;
        };

        let bet = {
            let mut state = self.state();
            let bet = state.session.bet_amount;
            if !state.session.can_cover(bet) {
                state.message = Some(Message::new(
                    MessageKind::Error,
                    Refusal::InsufficientBalance.message(),
                ));
                return SpinOutcome::Refused(Refusal::InsufficientBalance);
            }
            state.phase = RoundPhase::Betting;
            state.message = Some(Message::new(MessageKind::Info, "Good luck!"));
            bet
        };

        let round_id = new_round_id();
        let bet_settlement = match self.place_bet(&round_id, bet).await {
            Ok(settlement) => settlement,
            Err(refusal) => {
                warn!(%round_id, ?refusal, "bet failed");
                self.state().message = Some(Message::new(MessageKind::Error, refusal.message()));
                return SpinOutcome::Refused(refusal);
            }
        };

        self.set_phase(RoundPhase::Spinning);
        let symbols = lock(&self.source).draw();
        let result = evaluate_round(bet, symbols, &self.paytable);

        self.set_phase(RoundPhase::Settling);
        let win_settlement = if result.is_win {
            Some(self.settle_win(&round_id, result.win_amount).await)
        } else {
            None
        };

        let mut state = self.state();
        state.session.record_round(bet, result.win_amount);
        state.message = Some(round_message(&result));
        info!(
            %round_id,
            bet,
            line = %render_line(&result.symbols),
            win = result.win_amount,
            balance = state.session.balance,
            "round settled"
        );
        SpinOutcome::Settled(RoundReport {
            round_id,
            bet,
            result,
            balance: state.session.balance,
            bet_settlement,
            win_settlement,
        })
    }

    async fn place_bet(&self, round_id: &str, bet: u32) -> Result<Settlement, Refusal> {
        let amount = f64::from(bet);
        if let Some(ctx) = &self.remote {
            let request = BetRequest {
                game_id: ctx.game_id,
                session_token: ctx.session_token.clone(),
                bet_amount: amount,
                round_id: round_id.to_string(),
            };
            match self.ledger.place_bet(&request).await {
                Ok(balance) => {
                    self.state().session.balance = balance;
                    return Ok(Settlement::Remote);
                }
                Err(LedgerError::Unreachable(reason)) => {
                    if self.config.bet_fallback == BetFallback::Abort {
                        return Err(Refusal::LedgerUnreachable);
                    }
                    warn!(round_id, %reason, "ledger unreachable, deducting bet locally");
                }
                Err(e) => {
                    let reason = e.reason().unwrap_or("Unknown error").to_string();
                    return Err(Refusal::BetRejected(reason));
                }
            }
        }

        let mut state = self.state();
        if !state.session.can_cover(bet) {
            return Err(Refusal::InsufficientBalance);
        }
        state.session.balance -= amount;
        Ok(Settlement::Local)
    }

    // Never fails: the bet is already gone, so an unsettled win is credited locally.
    async fn settle_win(&self, round_id: &str, amount: f64) -> Settlement {
        if let Some(ctx) = &self.remote {
            let request = WinRequest {
                game_id: ctx.game_id,
                session_token: ctx.session_token.clone(),
                win_amount: amount,
                round_id: round_id.to_string(),
            };
            match self.ledger.settle_win(&request).await {
                Ok(balance) => {
                    self.state().session.balance = balance;
                    return Settlement::Remote;
                }
                Err(e) => warn!(round_id, error = %e, "win settlement failed, crediting locally"),
            }
        }
        self.state().session.balance += amount;
        Settlement::Local
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        lock(&self.state)
    }

    fn set_phase(&self, phase: RoundPhase) {
        self.state().phase = phase;
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a round in flight; dropping it returns the engine to idle.
struct RoundGuard<'a, L: Ledger> {
    engine: &'a RoundEngine<L>,
}

impl<'a, L: Ledger> RoundGuard<'a, L> {
    fn acquire(engine: &'a RoundEngine<L>) -> Option<Self> {
        engine
            .spinning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { engine })
    }
}

impl<L: Ledger> Drop for RoundGuard<'_, L> {
    fn drop(&mut self) {
        self.engine.set_phase(RoundPhase::Idle);
        self.engine.spinning.store(false, Ordering::Release);
    }
}

fn round_message(result: &RoundResult) -> Message {
    let amount = result.win_amount;
    match result.tier() {
        None => Message::new(MessageKind::Info, "Try again!"),
        Some(WinTier::Jackpot) => {
            Message::new(MessageKind::Win, format!("JACKPOT! You won ₾{amount:.2}!"))
        }
        Some(WinTier::BigWin) => {
            Message::new(MessageKind::Win, format!("BIG WIN! You won ₾{amount:.2}!"))
        }
        Some(WinTier::Regular) => Message::new(
            MessageKind::Win,
            format!("You won ₾{amount:.2}! ({}x)", result.multiplier),
        ),
    }
}

/// `round-<unix millis>-<9 base36 chars>`, used for both legs of a round.
pub fn new_round_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|c| char::from(c).to_ascii_lowercase())
        .take(9)
        .collect();
    format!("round-{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
}
