use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use slots_ledger::{connect, init_db, router, LedgerState};

async fn start(starting_balance: f64) -> String {
    let db = connect("sqlite::memory:").await.unwrap();
    init_db(&db).await.unwrap();
    let app = router(Arc::new(LedgerState {
        db,
        starting_balance,
    }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn post(client: &Client, url: String, body: Value) -> (StatusCode, Value) {
    let resp = client
        .post(url)
        .bearer_auth("player-token")
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

fn bet(round_id: &str, amount: f64) -> Value {
    json!({"gameId": 1, "sessionToken": "sess", "betAmount": amount, "roundId": round_id})
}

fn win(round_id: &str, amount: f64) -> Value {
    json!({"gameId": 1, "sessionToken": "sess", "winAmount": amount, "roundId": round_id})
}

#[tokio::test]
async fn balance_requires_bearer_token() {
    let base = start(250.0).await;
    let client = Client::new();

    let resp = client
        .get(format!("{base}/user/wallet/balance"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let balance: f64 = client
        .get(format!("{base}/user/wallet/balance"))
        .bearer_auth("player-token")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(balance, 250.0);
}

#[tokio::test]
async fn bet_then_win_settles_round() {
    let base = start(100.0).await;
    let client = Client::new();

    let (status, body) = post(&client, format!("{base}/user/games/bet"), bet("r1", 10.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"balance": 90.0}));

    let (status, body) = post(&client, format!("{base}/user/games/win"), win("r1", 100.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"balance": 190.0}));

    let (status, body) = post(&client, format!("{base}/user/games/win"), win("r1", 100.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Round already completed"}));
}

#[tokio::test]
async fn bet_rejections() {
    let base = start(5.0).await;
    let client = Client::new();
    let url = format!("{base}/user/games/bet");

    let (status, body) = post(&client, url.clone(), bet("r1", 10.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient balance");

    let (status, _) = post(&client, url.clone(), bet("r1", 5.0)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = post(&client, url.clone(), bet("r1", 0.0)).await;
    assert_eq!(body["error"], "Minimum bet is 0.01");
    let (_, body) = post(&client, url.clone(), bet("r1", 1.0)).await;
    assert_eq!(body["error"], "Round already exists");

    let (status, body) = post(
        &client,
        url,
        json!({"gameId": 1, "sessionToken": "", "betAmount": 1.0, "roundId": "r2"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid session");
}

#[tokio::test]
async fn win_validation() {
    let base = start(100.0).await;
    let client = Client::new();

    let (_, body) = post(&client, format!("{base}/user/games/win"), win("missing", 1.0)).await;
    assert_eq!(body["error"], "Round not found");

    post(&client, format!("{base}/user/games/bet"), bet("r1", 1.0)).await;
    let (status, body) =
        post(&client, format!("{base}/user/games/win"), win("r1", 1_000.5)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid win amount");

    let (_, body) = post(
        &client,
        format!("{base}/user/games/win"),
        json!({"gameId": 1, "sessionToken": "other", "winAmount": 1.0, "roundId": "r1"}),
    )
    .await;
    assert_eq!(body["error"], "Invalid session");
}

#[tokio::test]
async fn rollback_refunds_once() {
    let base = start(100.0).await;
    let client = Client::new();

    post(&client, format!("{base}/user/games/bet"), bet("r1", 40.0)).await;
    let (status, body) =
        post(&client, format!("{base}/user/games/rollback/r1"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"balance": 100.0}));

    let (_, body) = post(&client, format!("{base}/user/games/rollback/r1"), json!({})).await;
    assert_eq!(body["error"], "Round already rolled back");
    let (_, body) = post(&client, format!("{base}/user/games/win"), win("r1", 1.0)).await;
    assert_eq!(body["error"], "Round already completed");
}
