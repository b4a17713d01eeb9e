//! Development Ledger Service: the wallet and game-settlement endpoints the
//! round engine talks to, backed by SQLite.

use std::{str::FromStr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use slots_shared::{ApiError, BalanceResponse, BetRequest, ErrorBody, WinRequest};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqliteConnection, SqlitePool,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub const DEFAULT_STARTING_BALANCE: f64 = 1000.0;
pub const MIN_BET: f64 = 0.01;
pub const MAX_WIN_MULTIPLIER: f64 = 1000.0;

const STATUS_BET_PLACED: &str = "BET_PLACED";
const STATUS_COMPLETED: &str = "COMPLETED";
const STATUS_ROLLED_BACK: &str = "ROLLED_BACK";

#[derive(Clone)]
pub struct LedgerState {
    pub db: SqlitePool,
    /// Balance given to an access token the first time it is seen.
    pub starting_balance: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct StoredRound {
    session_token: String,
    bet_amount: f64,
    status: String,
}

/// Error response: `{"error": "..."}` with a matching status code.
pub struct Rejection(pub ApiError);

impl From<ApiError> for Rejection {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<sqlx::Error> for Rejection {
    fn from(e: sqlx::Error) -> Self {
        error!(error = %e, "database error");
        Self(ApiError::Internal)
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match self.0 {
            ApiError::Invalid(reason) => ErrorBody::new(reason),
            ApiError::Unauthorized => ErrorBody::new("Authentication required"),
            ApiError::Internal => ErrorBody::new("Internal server error"),
        };
        (status, Json(body)).into_response()
    }
}

fn invalid(reason: &str) -> Rejection {
    Rejection(ApiError::Invalid(reason.to_string()))
}

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn access_token(header: BearerHeader) -> Result<String, Rejection> {
    match header {
        Some(TypedHeader(Authorization(bearer))) if !bearer.token().is_empty() => {
            Ok(bearer.token().to_string())
        }
        _ => Err(Rejection(ApiError::Unauthorized)),
    }
}

/// Opens the database, creating the file if needed. In-memory databases keep a single
/// connection alive for the lifetime of the pool.
pub async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };
    Ok(pool)
}

pub async fn init_db(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS accounts (
            access_token TEXT PRIMARY KEY,
            balance REAL NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(db)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS rounds (
            round_id TEXT PRIMARY KEY,
            access_token TEXT NOT NULL,
            game_id INTEGER NOT NULL,
            session_token TEXT NOT NULL,
            bet_amount REAL NOT NULL,
            win_amount REAL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            settled_at TEXT
        )",
    )
    .execute(db)
    .await?;
    Ok(())
}

async fn ensure_account(
    conn: &mut SqliteConnection,
    token: &str,
    starting_balance: f64,
) -> Result<f64, sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO accounts (access_token, balance, created_at) VALUES (?, ?, ?)",
    )
    .bind(token)
    .bind(starting_balance)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;
    sqlx::query_scalar("SELECT balance FROM accounts WHERE access_token = ?")
        .bind(token)
        .fetch_one(&mut *conn)
        .await
}

async fn set_balance(
    conn: &mut SqliteConnection,
    token: &str,
    balance: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE accounts SET balance = ? WHERE access_token = ?")
        .bind(balance)
        .bind(token)
        .execute(conn)
        .await?;
    Ok(())
}

async fn find_round(
    conn: &mut SqliteConnection,
    token: &str,
    round_id: &str,
) -> Result<Option<StoredRound>, sqlx::Error> {
    sqlx::query_as::<_, StoredRound>(
        "SELECT session_token, bet_amount, status FROM rounds WHERE round_id = ? AND access_token = ?",
    )
    .bind(round_id)
    .bind(token)
    .fetch_optional(conn)
    .await
}

async fn route_balance(
    State(state): State<Arc<LedgerState>>,
    auth: BearerHeader,
) -> Result<Json<f64>, Rejection> {
    let token = access_token(auth)?;
    let mut conn = state.db.acquire().await?;
    let balance = ensure_account(&mut conn, &token, state.starting_balance).await?;
    Ok(Json(balance))
}

async fn route_bet(
    State(state): State<Arc<LedgerState>>,
    auth: BearerHeader,
    Json(req): Json<BetRequest>,
) -> Result<Json<BalanceResponse>, Rejection> {
    let token = access_token(auth)?;
    if req.session_token.trim().is_empty() {
        return Err(invalid("Invalid session"));
    }
    if req.round_id.trim().is_empty() {
        return Err(invalid("Round ID is required"));
    }
    if !(req.bet_amount >= MIN_BET) {
        return Err(invalid("Minimum bet is 0.01"));
    }

    let mut tx = state.db.begin().await?;
    let balance = ensure_account(&mut tx, &token, state.starting_balance).await?;
    let existing: Option<String> =
        sqlx::query_scalar("SELECT round_id FROM rounds WHERE round_id = ?")
            .bind(&req.round_id)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_some() {
        return Err(invalid("Round already exists"));
    }
    if balance < req.bet_amount {
        return Err(invalid("Insufficient balance"));
    }

    let balance = balance - req.bet_amount;
    set_balance(&mut tx, &token, balance).await?;
    sqlx::query(
        "INSERT INTO rounds (round_id, access_token, game_id, session_token, bet_amount, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&req.round_id)
    .bind(&token)
    .bind(req.game_id)
    .bind(&req.session_token)
    .bind(req.bet_amount)
    .bind(STATUS_BET_PLACED)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(round_id = %req.round_id, bet = req.bet_amount, balance, "bet placed");
    Ok(Json(BalanceResponse { balance }))
}

async fn route_win(
    State(state): State<Arc<LedgerState>>,
    auth: BearerHeader,
    Json(req): Json<WinRequest>,
) -> Result<Json<BalanceResponse>, Rejection> {
    let token = access_token(auth)?;
    if req.session_token.trim().is_empty() {
        return Err(invalid("Invalid session"));
    }

    let mut tx = state.db.begin().await?;
    let round = find_round(&mut tx, &token, &req.round_id)
        .await?
        .ok_or_else(|| invalid("Round not found"))?;
    if round.session_token != req.session_token {
        return Err(invalid("Invalid session"));
    }
    if round.status != STATUS_BET_PLACED {
        return Err(invalid("Round already completed"));
    }
    if req.win_amount < 0.0 || req.win_amount > round.bet_amount * MAX_WIN_MULTIPLIER {
        return Err(invalid("Invalid win amount"));
    }

    let balance = ensure_account(&mut tx, &token, state.starting_balance).await? + req.win_amount;
    set_balance(&mut tx, &token, balance).await?;
    sqlx::query(
        "UPDATE rounds SET win_amount = ?, status = ?, settled_at = ? WHERE round_id = ?",
    )
    .bind(req.win_amount)
    .bind(STATUS_COMPLETED)
    .bind(Utc::now().to_rfc3339())
    .bind(&req.round_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(round_id = %req.round_id, win = req.win_amount, balance, "win settled");
    Ok(Json(BalanceResponse { balance }))
}

/// Refunds the bet of a round that never settled.
async fn route_rollback(
    State(state): State<Arc<LedgerState>>,
    auth: BearerHeader,
    Path(round_id): Path<String>,
) -> Result<Json<BalanceResponse>, Rejection> {
    let token = access_token(auth)?;
    let mut tx = state.db.begin().await?;
    let round = find_round(&mut tx, &token, &round_id)
        .await?
        .ok_or_else(|| invalid("Round not found"))?;
    match round.status.as_str() {
        STATUS_ROLLED_BACK => return Err(invalid("Round already rolled back")),
        STATUS_COMPLETED => return Err(invalid("Round already completed")),
        _ => {}
    }

    let balance =
        ensure_account(&mut tx, &token, state.starting_balance).await? + round.bet_amount;
    set_balance(&mut tx, &token, balance).await?;
    sqlx::query("UPDATE rounds SET status = ?, settled_at = ? WHERE round_id = ?")
        .bind(STATUS_ROLLED_BACK)
        .bind(Utc::now().to_rfc3339())
        .bind(&round_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(%round_id, refund = round.bet_amount, balance, "bet rolled back");
    Ok(Json(BalanceResponse { balance }))
}

pub fn router(state: Arc<LedgerState>) -> Router {
    Router::new()
        .route("/api/user/wallet/balance", get(route_balance))
        .route("/api/user/games/bet", post(route_bet))
        .route("/api/user/games/win", post(route_win))
        .route("/api/user/games/rollback/:round_id", post(route_rollback))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
