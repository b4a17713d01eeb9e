use std::borrow::Cow;

use url::Url;

use crate::config::BetLimits;

/// Identifiers handed to the game frame in its launch URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    pub session_token: Option<String>,
    pub game_id: Option<i64>,
    pub user_id: Option<String>,
}

impl SessionParams {
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }

    /// Parses a raw query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "sessionToken" => params.session_token = Some(value.to_string()),
                "gameId" => params.game_id = value.parse().ok(),
                "userId" => params.user_id = Some(value.to_string()),
                _ => {}
            }
        }
        params
    }

    /// The identifiers needed to settle with the ledger, when all are present.
    pub fn remote_context(&self) -> Option<RemoteContext> {
        Some(RemoteContext {
            session_token: self.session_token.clone()?,
            game_id: self.game_id?,
            user_id: self.user_id.clone()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContext {
    pub session_token: String,
    pub game_id: i64,
    pub user_id: String,
}

/// State of one game frame: balance, selected bet and running totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_token: Option<String>,
    pub game_id: Option<i64>,
    pub user_id: Option<String>,
    pub balance: f64,
    pub bet_amount: u32,
    pub rounds_played: u64,
    pub total_bets: f64,
    pub total_wins: f64,
}

impl Session {
    pub fn new(params: SessionParams, balance: f64) -> Self {
        Self {
            session_token: params.session_token,
            game_id: params.game_id,
            user_id: params.user_id,
            balance,
            bet_amount: 1,
            rounds_played: 0,
            total_bets: 0.0,
            total_wins: 0.0,
        }
    }

    /// Largest bet the player may currently choose.
    pub fn max_bet(&self, limits: BetLimits) -> u32 {
        let affordable = self.balance.max(0.0).floor();
        if affordable >= f64::from(limits.max) {
            limits.max
        } else {
            affordable as u32
        }
    }

    fn bet_allowed(&self, amount: i64, limits: BetLimits) -> bool {
        amount >= i64::from(limits.min) && amount <= i64::from(self.max_bet(limits))
    }

    /// Moves the bet by `delta`. Out-of-range results leave the bet untouched.
    pub fn change_bet(&mut self, delta: i64, limits: BetLimits) -> bool {
        let next = i64::from(self.bet_amount) + delta;
        if !self.bet_allowed(next, limits) {
            return false;
        }
        self.bet_amount = next as u32;
        true
    }

    pub fn set_bet(&mut self, amount: u32, limits: BetLimits) -> bool {
        if !self.bet_allowed(i64::from(amount), limits) {
            return false;
        }
        self.bet_amount = amount;
        true
    }

    pub fn can_cover(&self, amount: u32) -> bool {
        self.balance >= f64::from(amount)
    }

    pub(crate) fn record_round(&mut self, bet: u32, win_amount: f64) {
        self.rounds_played += 1;
        self.total_bets += f64::from(bet);
        self.total_wins += win_amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_from_launch_url() {
        let url =
            Url::parse("https://games.example/slots/first/?sessionToken=abc&gameId=12&userId=u-9")
                .unwrap();
        let params = SessionParams::from_url(&url);
        assert_eq!(params.session_token.as_deref(), Some("abc"));
        assert_eq!(params.game_id, Some(12));
        assert_eq!(params.user_id.as_deref(), Some("u-9"));
        assert_eq!(
            params.remote_context(),
            Some(RemoteContext {
                session_token: "abc".into(),
                game_id: 12,
                user_id: "u-9".into(),
            })
        );
    }

    #[test]
    fn incomplete_params_have_no_remote_context() {
        assert_eq!(SessionParams::from_query("").remote_context(), None);
        assert_eq!(
            SessionParams::from_query("?sessionToken=abc&gameId=12").remote_context(),
            None
        );
        let bad_game = SessionParams::from_query("sessionToken=abc&gameId=slots&userId=1");
        assert_eq!(bad_game.game_id, None);
        assert_eq!(bad_game.remote_context(), None);
        let blank = SessionParams::from_query("sessionToken=&gameId=1&userId=1");
        assert_eq!(blank.session_token, None);
    }

    #[test]
    fn bet_stays_within_limits_and_balance() {
        let limits = BetLimits::default();
        let mut session = Session::new(SessionParams::default(), 20.0);
        assert_eq!(session.bet_amount, 1);
        assert!(!session.change_bet(-1, limits));
        assert!(session.change_bet(9, limits));
        assert_eq!(session.bet_amount, 10);
        assert!(!session.set_bet(21, limits));
        assert!(session.set_bet(20, limits));
        assert!(!session.change_bet(1, limits));
        assert!(!session.set_bet(0, limits));

        session.balance = 1_000.0;
        assert_eq!(session.max_bet(limits), 100);
        assert!(!session.set_bet(101, limits));
        assert!(session.set_bet(100, limits));
    }

    #[test]
    fn max_bet_of_fractional_and_empty_balance() {
        let limits = BetLimits::default();
        let mut session = Session::new(SessionParams::default(), 7.5);
        assert_eq!(session.max_bet(limits), 7);
        session.balance = 0.4;
        assert_eq!(session.max_bet(limits), 0);
        assert!(!session.change_bet(1, limits));
    }
}
