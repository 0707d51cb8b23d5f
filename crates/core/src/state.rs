//! Player-facing game state and the value types it is made of.
//!
//! Everything here serializes with camelCase field names so that state
//! files written by earlier front-ends keep loading unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Milli-token fixed-point balance.
///
/// Token balances accrue in whole tokens but withdrawals may carry a
/// fractional amount, so the balance is stored as an integer count of
/// thousandths. Serializes as a plain number: whole balances as an
/// integer, fractional ones as a float.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(u64);

impl TokenAmount {
    /// Thousandths per whole token.
    pub const MILLIS_PER_TOKEN: u64 = 1_000;

    /// The zero balance.
    pub const ZERO: TokenAmount = TokenAmount(0);

    /// Builds an amount from a whole-token count.
    pub fn from_whole(tokens: u64) -> Self {
        Self(tokens.saturating_mul(Self::MILLIS_PER_TOKEN))
    }

    /// Builds an amount from a raw milli-token count.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Raw milli-token count.
    pub fn millis(self) -> u64 {
        self.0
    }

    /// Whole-token part, discarding any fraction.
    pub fn whole(self) -> u64 {
        self.0 / Self::MILLIS_PER_TOKEN
    }

    /// True for the zero balance.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, clamping at the maximum representable balance.
    pub fn saturating_add(self, other: TokenAmount) -> TokenAmount {
        TokenAmount(self.0.saturating_add(other.0))
    }

    /// Subtracts `other`, or `None` when the balance does not cover it.
    pub fn checked_sub(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_sub(other.0).map(TokenAmount)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::MILLIS_PER_TOKEN;
        let frac = self.0 % Self::MILLIS_PER_TOKEN;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{frac:03}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

/// Failure modes when parsing a token amount from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    /// Not a non-negative decimal number.
    #[error("not a valid token amount")]
    Invalid,
    /// More than three fractional digits.
    #[error("token amounts carry at most three decimal places")]
    TooPrecise,
}

impl FromStr for TokenAmount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(ParseAmountError::Invalid);
        }
        if frac.len() > 3 {
            return Err(ParseAmountError::TooPrecise);
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseAmountError::Invalid);
        }
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ParseAmountError::Invalid)?
        };
        let mut millis = whole
            .checked_mul(Self::MILLIS_PER_TOKEN)
            .ok_or(ParseAmountError::Invalid)?;
        if !frac.is_empty() {
            let padded = format!("{frac:0<3}");
            let frac: u64 = padded.parse().map_err(|_| ParseAmountError::Invalid)?;
            millis = millis
                .checked_add(frac)
                .ok_or(ParseAmountError::Invalid)?;
        }
        Ok(TokenAmount(millis))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % Self::MILLIS_PER_TOKEN == 0 {
            serializer.serialize_u64(self.whole())
        } else {
            serializer.serialize_f64(self.0 as f64 / Self::MILLIS_PER_TOKEN as f64)
        }
    }
}

struct TokenAmountVisitor;

impl<'de> Visitor<'de> for TokenAmountVisitor {
    type Value = TokenAmount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative token balance")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(TokenAmount::from_whole(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        if value < 0 {
            return Err(E::custom("token balance cannot be negative"));
        }
        Ok(TokenAmount::from_whole(value as u64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        if !value.is_finite() || value < 0.0 {
            return Err(E::custom("token balance cannot be negative"));
        }
        Ok(TokenAmount::from_millis(
            (value * TokenAmount::MILLIS_PER_TOKEN as f64).round() as u64,
        ))
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TokenAmountVisitor)
    }
}

/// One completed withdrawal request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    /// Destination wallet address.
    pub address: String,
    /// Amount deducted from the token balance.
    pub amount: TokenAmount,
    /// When the request was made.
    pub timestamp: DateTime<Utc>,
    /// Synthetic transaction id, `0x` plus 32 hex characters.
    pub tx_hash: String,
}

/// The whole player state, as loaded from and written to disk.
///
/// Missing fields deserialize to their defaults, so state files from
/// older builds (which lack the streak counters, for instance) still
/// restore cleanly.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    /// Spendable point balance.
    pub points: u64,
    /// Token balance available for withdrawal.
    pub tokens: TokenAmount,
    /// Connected wallet address, empty when none has been connected yet.
    pub wallet_address: String,
    /// Whether a wallet is currently connected.
    pub is_connected: bool,
    /// This player's own referral code, derived from the wallet address.
    pub referral_code: String,
    /// Addresses of players who joined with this player's code.
    pub referred_users: Vec<String>,
    /// Lifetime points earned through referrals.
    pub referral_points: u64,
    /// Unix-millisecond timestamp of the last accepted tap.
    pub last_tap_time: i64,
    /// Whether today's daily reward has been claimed.
    pub daily_reward_claimed: bool,
    /// Calendar day of the most recent daily claim.
    pub last_daily_reward: Option<NaiveDate>,
    /// Consecutive-day claim streak ending at `last_daily_reward`.
    pub daily_streak: u32,
    /// Lifetime count of daily claims.
    pub daily_claims: u64,
    /// Lifetime count of accepted taps.
    pub total_taps: u64,
    /// Completed withdrawals, oldest first.
    pub withdrawals: Vec<Withdrawal>,
}

impl GameState {
    /// True when the daily reward was already taken on `today`.
    ///
    /// `daily_reward_claimed` is a convenience flag that goes stale at
    /// midnight; the claim date is what actually decides.
    pub fn claimed_today(&self, today: NaiveDate) -> bool {
        self.last_daily_reward == Some(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn token_amount_display() {
        assert_eq!(TokenAmount::from_whole(3).to_string(), "3");
        assert_eq!(TokenAmount::from_millis(2_500).to_string(), "2.5");
        assert_eq!(TokenAmount::from_millis(1_025).to_string(), "1.025");
        assert_eq!(TokenAmount::ZERO.to_string(), "0");
    }

    #[test]
    fn token_amount_parses_text() {
        assert_eq!("5".parse::<TokenAmount>().unwrap(), TokenAmount::from_whole(5));
        assert_eq!(
            "1.5".parse::<TokenAmount>().unwrap(),
            TokenAmount::from_millis(1_500)
        );
        assert_eq!(
            ".25".parse::<TokenAmount>().unwrap(),
            TokenAmount::from_millis(250)
        );
        assert_eq!(
            "0.005".parse::<TokenAmount>().unwrap(),
            TokenAmount::from_millis(5)
        );
        assert_eq!("1.2345".parse::<TokenAmount>(), Err(ParseAmountError::TooPrecise));
        assert_eq!("-1".parse::<TokenAmount>(), Err(ParseAmountError::Invalid));
        assert_eq!("abc".parse::<TokenAmount>(), Err(ParseAmountError::Invalid));
        assert_eq!(".".parse::<TokenAmount>(), Err(ParseAmountError::Invalid));
    }

    #[test]
    fn token_amount_serializes_as_number() {
        let whole = serde_json::to_string(&TokenAmount::from_whole(4)).unwrap();
        assert_eq!(whole, "4");
        let frac = serde_json::to_string(&TokenAmount::from_millis(2_500)).unwrap();
        assert_eq!(frac, "2.5");

        let back: TokenAmount = serde_json::from_str("2.5").unwrap();
        assert_eq!(back, TokenAmount::from_millis(2_500));
        let back: TokenAmount = serde_json::from_str("7").unwrap();
        assert_eq!(back, TokenAmount::from_whole(7));
        assert!(serde_json::from_str::<TokenAmount>("-3").is_err());
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = GameState {
            points: 1_234,
            tokens: TokenAmount::from_millis(2_500),
            wallet_address: "0x1234567890123456789012345678901234567890".into(),
            is_connected: true,
            referral_code: "REF-1234567834567890".into(),
            referred_users: vec!["0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".into()],
            referral_points: 1_500,
            last_tap_time: 1_756_100_000_000,
            daily_reward_claimed: true,
            last_daily_reward: NaiveDate::from_ymd_opt(2026, 8, 25),
            daily_streak: 3,
            daily_claims: 9,
            total_taps: 321,
            withdrawals: vec![Withdrawal {
                address: "0x1234567890123456789012345678901234567890".into(),
                amount: TokenAmount::from_millis(1_500),
                timestamp: Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap(),
                tx_hash: "0x0123456789abcdef0123456789abcdef".into(),
            }],
        };

        let raw = serde_json::to_string_pretty(&state).unwrap();
        assert!(raw.contains("\"walletAddress\""));
        assert!(raw.contains("\"lastDailyReward\""));
        let back: GameState = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn state_restores_older_shapes_with_defaults() {
        // A file written before the streak counters existed.
        let raw = r#"{
            "points": 42,
            "tokens": 1.5,
            "walletAddress": "0x1234567890123456789012345678901234567890",
            "isConnected": true,
            "lastTapTime": 1700000000000
        }"#;
        let state: GameState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.points, 42);
        assert_eq!(state.tokens, TokenAmount::from_millis(1_500));
        assert!(state.is_connected);
        assert_eq!(state.daily_streak, 0);
        assert_eq!(state.daily_claims, 0);
        assert!(state.referred_users.is_empty());
        assert_eq!(state.last_daily_reward, None);
    }

    #[test]
    fn claimed_today_follows_the_date_not_the_flag() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let mut state = GameState {
            daily_reward_claimed: true,
            last_daily_reward: NaiveDate::from_ymd_opt(2026, 8, 24),
            ..GameState::default()
        };
        assert!(!state.claimed_today(today));
        state.last_daily_reward = Some(today);
        assert!(state.claimed_today(today));
    }
}
