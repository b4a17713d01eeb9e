//! Round engine against the development ledger served on an ephemeral port.

use std::sync::Arc;

use slots_core::{Symbol, SymbolSource};
use slots_engine::{
    EngineConfig, HttpLedger, Ledger, LedgerError, Refusal, RoundEngine, SessionParams,
    Settlement, SpinOutcome,
};
use slots_ledger::{connect, init_db, router, LedgerState};

struct Fixed([Symbol; 3]);

impl SymbolSource for Fixed {
    fn draw(&mut self) -> [Symbol; 3] {
        self.0
    }
}

struct TestContext {
    base_url: String,
    server_handle: tokio::task::JoinHandle<()>,
}

impl TestContext {
    async fn new(starting_balance: f64) -> Self {
        let db = connect("sqlite::memory:").await.unwrap();
        init_db(&db).await.unwrap();
        let app = router(Arc::new(LedgerState {
            db,
            starting_balance,
        }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}/api"),
            server_handle,
        }
    }

    fn config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_base_url(&self.base_url)
            .unwrap()
            .with_access_token("player-token")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

fn params() -> SessionParams {
    SessionParams::from_query("sessionToken=sess-9&gameId=2&userId=7")
}

#[tokio::test]
async fn plays_rounds_against_ledger() {
    let ctx = TestContext::new(1000.0).await;
    let ledger = HttpLedger::new(&ctx.config()).unwrap();
    let engine = RoundEngine::load(params(), ledger.clone(), ctx.config())
        .await
        .with_source(Fixed([Symbol::Cherry; 3]));
    assert!(engine.is_remote());
    assert_eq!(engine.balance(), 1000.0);
    assert!(engine.set_bet(10));

    let SpinOutcome::Settled(report) = engine.spin().await else {
        panic!("round should settle");
    };
    assert_eq!(report.bet_settlement, Settlement::Remote);
    assert_eq!(report.win_settlement, Some(Settlement::Remote));
    assert_eq!(report.balance, 1090.0);
    assert_eq!(ledger.balance().await.unwrap(), 1090.0);
}

#[tokio::test]
async fn losing_round_is_recorded_remotely() {
    let ctx = TestContext::new(50.0).await;
    let ledger = HttpLedger::new(&ctx.config()).unwrap();
    let engine = RoundEngine::load(params(), ledger.clone(), ctx.config())
        .await
        .with_source(Fixed([Symbol::Seven, Symbol::Lemon, Symbol::Seven]));
    assert!(engine.set_bet(20));

    let SpinOutcome::Settled(report) = engine.spin().await else {
        panic!("round should settle");
    };
    assert_eq!(report.win_settlement, None);
    assert_eq!(report.balance, 30.0);
    assert_eq!(ledger.balance().await.unwrap(), 30.0);
}

#[tokio::test]
async fn ledger_rejection_surfaces_reason() {
    let ctx = TestContext::new(5.0).await;
    let ledger = HttpLedger::new(&ctx.config()).unwrap();
    let engine = RoundEngine::load(params(), ledger, ctx.config())
        .await
        .with_source(Fixed([Symbol::Cherry; 3]));
    // local view believes there is more money than the ledger holds
    assert!(engine.handle_frame_json(r#"{"type":"updateBalance","balance":100}"#));
    assert!(engine.set_bet(50));

    let outcome = engine.spin().await;
    assert_eq!(
        outcome,
        SpinOutcome::Refused(Refusal::BetRejected("Insufficient balance".into()))
    );
    assert_eq!(engine.balance(), 100.0);
    assert_eq!(engine.session().rounds_played, 0);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let ctx = TestContext::new(5.0).await;
    let config = EngineConfig::default().with_base_url(&ctx.base_url).unwrap();
    let ledger = HttpLedger::new(&config).unwrap();
    assert!(!ledger.has_credentials());
    assert_eq!(ledger.balance().await, Err(LedgerError::MissingCredentials));

    let authorized = HttpLedger::new(&ctx.config()).unwrap();
    assert_eq!(authorized.balance().await, Ok(5.0));
}

#[tokio::test]
async fn unreachable_ledger_falls_back_to_local_play() {
    // reserve a port, then close it so connections are refused
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = EngineConfig::default()
        .with_base_url(&format!("http://{addr}/api"))
        .unwrap()
        .with_access_token("player-token");
    let ledger = HttpLedger::new(&config).unwrap();
    assert!(matches!(
        ledger.balance().await,
        Err(LedgerError::Unreachable(_))
    ));

    let engine = RoundEngine::load(params(), ledger, config)
        .await
        .with_source(Fixed([Symbol::Lemon; 3]));
    assert!(engine.is_remote());
    assert_eq!(engine.balance(), 100.0);

    let SpinOutcome::Settled(report) = engine.spin().await else {
        panic!("round should settle locally");
    };
    assert_eq!(report.bet_settlement, Settlement::Local);
    assert_eq!(report.win_settlement, Some(Settlement::Local));
    assert_eq!(report.balance, 100.0 - 1.0 + 15.0);
}
