use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slots_core::{
    render_line, spin_once, theoretical_rtp, Paytable, ProvablyFairRng, RtpReport,
};
use slots_engine::{
    BetFallback, EngineConfig, HttpLedger, Ledger, RoundEngine, Session, SessionParams,
    SpinOutcome,
};
use slots_shared::FrameMessage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use url::Url;

#[derive(Parser)]
#[command(name = "slots", about = "Terminal front end for the slot round engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Ledger Service base url, default http://localhost:8080/api
    #[arg(long, global = true, env = "SLOTS_API_BASE_URL")]
    api_base_url: Option<String>,
    /// Bearer token of the player; without it every round is played locally
    #[arg(long, global = true, env = "SLOTS_ACCESS_TOKEN")]
    access_token: Option<String>,
    /// `local` or `abort` when the ledger is unreachable while betting
    #[arg(long, global = true, env = "SLOTS_BET_FALLBACK")]
    bet_fallback: Option<BetFallback>,
    #[arg(long, global = true, env = "SLOTS_HTTP_TIMEOUT_SECS")]
    http_timeout_secs: Option<u64>,
    /// JSON payout table, default is the classic table
    #[arg(long, global = true)]
    paytable: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a game session and play rounds
    Play {
        /// Game launch url carrying sessionToken, gameId and userId
        #[arg(long)]
        url: Option<Url>,
        #[arg(long)]
        session_token: Option<String>,
        #[arg(long)]
        game_id: Option<i64>,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long, default_value_t = 1)]
        bet: u32,
        /// Play this many rounds without prompting
        #[arg(long)]
        rounds: Option<u64>,
    },
    /// Measure the return of a payout table with provably-fair draws
    Simulate {
        #[arg(long, default_value_t = 100_000)]
        rounds: u64,
        #[arg(long, default_value_t = 1)]
        bet: u32,
        #[arg(long, default_value = "simulation-server-seed")]
        server_seed: String,
        #[arg(long, default_value = "simulation-client-seed")]
        client_seed: String,
        /// Write one row per round to this path
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

impl Cli {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = EngineConfig::default();
        if let Some(url) = &self.api_base_url {
            config = config.with_base_url(url)?;
        }
        if let Some(token) = self.access_token.as_ref().filter(|t| !t.is_empty()) {
            config = config.with_access_token(token.clone());
        }
        if let Some(policy) = self.bet_fallback {
            config = config.with_bet_fallback(policy);
        }
        if let Some(secs) = self.http_timeout_secs {
            config.http_timeout = std::time::Duration::from_secs(secs);
        }
        Ok(config)
    }

    fn load_paytable(&self) -> anyhow::Result<Paytable> {
        Ok(match &self.paytable {
            Some(path) => Paytable::load(path)?,
            None => Paytable::classic(),
        })
    }
}

fn session_params(
    url: Option<Url>,
    session_token: Option<String>,
    game_id: Option<i64>,
    user_id: Option<String>,
) -> SessionParams {
    let mut params = url
        .as_ref()
        .map(SessionParams::from_url)
        .unwrap_or_default();
    params.session_token = session_token.or(params.session_token);
    params.game_id = game_id.or(params.game_id);
    params.user_id = user_id.or(params.user_id);
    params
}

fn print_outcome<L: Ledger>(engine: &RoundEngine<L>, outcome: &SpinOutcome) {
    if let SpinOutcome::Settled(report) = outcome {
        println!("[ {} ]", render_line(&report.result.symbols));
    }
    if let Some(message) = engine.message() {
        println!("{}", message.text);
    }
    let session = engine.session();
    println!("balance ₾{:.2}  bet ₾{}", session.balance, session.bet_amount);
}

fn print_summary(session: &Session) {
    println!(
        "rounds {}  total bets ₾{:.2}  total wins ₾{:.2}  balance ₾{:.2}",
        session.rounds_played, session.total_bets, session.total_wins, session.balance
    );
}

const HELP: &str = "enter: spin  +/-: change bet  bet N  balance N  q: quit";

async fn interactive<L: Ledger>(engine: &RoundEngine<L>) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let cmd = line.trim();
        match cmd {
            "" | "spin" => {
                let outcome = engine.spin().await;
                print_outcome(engine, &outcome);
            }
            "+" | "-" => {
                let delta = if cmd == "+" { 1 } else { -1 };
                if !engine.change_bet(delta) {
                    println!("bet must stay between 1 and min(100, balance)");
                }
                println!("bet ₾{}", engine.session().bet_amount);
            }
            "q" | "quit" => break,
            _ => {
                if let Some(amount) = cmd.strip_prefix("bet ") {
                    match amount.trim().parse() {
                        Ok(amount) if engine.set_bet(amount) => println!("bet ₾{amount}"),
                        _ => println!("bet must be a whole amount between 1 and min(100, balance)"),
                    }
                } else if let Some(balance) = cmd.strip_prefix("balance ") {
                    match balance.trim().parse() {
                        Ok(balance) => {
                            engine.handle_frame_message(&FrameMessage::UpdateBalance { balance });
                            println!("balance ₾{balance:.2}");
                        }
                        Err(_) => println!("balance must be a number"),
                    }
                } else if !engine.handle_frame_json(cmd) {
                    println!("{HELP}");
                }
            }
        }
    }
    Ok(())
}

async fn play(
    config: EngineConfig,
    paytable: Paytable,
    params: SessionParams,
    bet: u32,
    rounds: Option<u64>,
) -> anyhow::Result<()> {
    let ledger = HttpLedger::new(&config)?;
    let engine = RoundEngine::load(params, ledger, config)
        .await
        .with_paytable(paytable);
    // host notification, one JSON message per line
    println!("{}", engine.loaded_message().to_json());
    if !engine.set_bet(bet) {
        warn!(bet, "bet out of range, keeping {}", engine.session().bet_amount);
    }

    match rounds {
        Some(rounds) => {
            for _ in 0..rounds {
                let outcome = engine.spin().await;
                print_outcome(&engine, &outcome);
                if matches!(outcome, SpinOutcome::Refused(_)) {
                    break;
                }
            }
        }
        None => interactive(&engine).await?,
    }
    print_summary(&engine.session());
    Ok(())
}

fn simulate(
    paytable: &Paytable,
    rounds: u64,
    bet: u32,
    server_seed: String,
    client_seed: String,
    csv: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, 0);
    let mut writer = match &csv {
        Some(path) => {
            let mut w = csv::Writer::from_path(path)?;
            w.write_record(["nonce", "line", "multiplier", "win"])?;
            Some(w)
        }
        None => None,
    };

    let mut report = RtpReport::default();
    for _ in 0..rounds {
        let nonce = rng.nonce;
        let result = spin_once(&mut rng, paytable, bet);
        report.record(bet, &result);
        if let Some(w) = writer.as_mut() {
            w.write_record(&[
                nonce.to_string(),
                render_line(&result.symbols),
                result.multiplier.to_string(),
                result.win_amount.to_string(),
            ])?;
        }
    }
    if let Some(mut w) = writer {
        w.flush()?;
    }

    println!("server_seed_hash={}", rng.server_seed_hash_hex());
    println!(
        "rounds={} hits={} hit_rate={:.4} wagered={:.2} paid={:.2}",
        report.rounds,
        report.hits,
        report.hit_rate(),
        report.total_bet,
        report.total_paid
    );
    println!(
        "rtp={:.4} theoretical_rtp={:.4}",
        report.rtp(),
        theoretical_rtp(paytable)
    );
    if let Some(path) = csv {
        info!(rounds = report.rounds, "exported rounds to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let cli = Cli::parse();
    let paytable = cli.load_paytable()?;
    let config = cli.engine_config()?;

    match cli.command {
        Commands::Play {
            url,
            session_token,
            game_id,
            user_id,
            bet,
            rounds,
        } => {
            let params = session_params(url, session_token, game_id, user_id);
            play(config, paytable, params, bet, rounds).await?;
        }
        Commands::Simulate {
            rounds,
            bet,
            server_seed,
            client_seed,
            csv,
        } => simulate(&paytable, rounds, bet, server_seed, client_seed, csv)?,
    }

    Ok(())
}
