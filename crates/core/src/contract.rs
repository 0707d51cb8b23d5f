#![allow(missing_docs)]

//! Backend surface shaped like the on-chain game contract.
//!
//! Frontends talk to [`GameBackend`] instead of the engine directly, so
//! the local simulation can later be swapped for a real chain client
//! without touching them. The local implementation runs everything
//! through [`GameEngine`] and mirrors the contract's event stream over a
//! broadcast channel.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Duration;
use tokio::sync::broadcast;

use crate::engine::GameEngine;
use crate::outcome::{
    ClaimOutcome, ConvertOutcome, InviteOutcome, ReferralOutcome, TapOutcome, TransitionError,
    WithdrawOutcome,
};
use crate::state::TokenAmount;
use crate::wallet;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events a contract-shaped backend announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    UserRegistered {
        user: String,
        referral_code: String,
    },
    Tapped {
        user: String,
        points: u64,
        total_taps: u64,
    },
    DailyRewardClaimed {
        user: String,
        points: u64,
        streak: u32,
    },
    PointsConverted {
        user: String,
        points: u64,
        tokens: u64,
    },
    ReferralRegistered {
        referrer: String,
        referred: String,
        bonus: u64,
    },
}

/// Aggregate per-player figures, the shape a stats query returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub points: u64,
    pub tokens: TokenAmount,
    pub total_taps: u64,
    pub referral_points: u64,
    pub referrals_count: usize,
    pub daily_claims: u64,
    pub streak: u32,
    pub referral_code: String,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub address: String,
    pub points: u64,
    pub taps: u64,
}

/// Result of registering with the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    /// This player's own referral code.
    pub referral_code: String,
    /// Credited referral bonus when a code was passed in.
    pub redeemed: Option<ReferralOutcome>,
}

/// The operations any game backend offers, local or on-chain.
///
/// Errors surface as [`anyhow::Error`]; rule rejections stay
/// downcastable to [`TransitionError`] so frontends can phrase them.
#[allow(async_fn_in_trait)]
pub trait GameBackend {
    /// Registers the connected player, optionally redeeming a referral
    /// code. An empty code registers without redeeming anything.
    async fn register(&self, referral_code: &str) -> Result<RegisterOutcome>;
    async fn tap(&self) -> Result<TapOutcome>;
    async fn claim_daily_reward(&self) -> Result<ClaimOutcome>;
    async fn convert_points(&self) -> Result<ConvertOutcome>;
    async fn request_withdrawal(&self, address: &str, amount: TokenAmount)
        -> Result<WithdrawOutcome>;
    async fn user_stats(&self, address: &str) -> Result<UserStats>;
    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;
    async fn can_claim_daily_reward(&self, address: &str) -> Result<bool>;
    async fn time_until_next_claim(&self, address: &str) -> Result<Duration>;
    /// Subscribes to the backend's event stream.
    fn subscribe(&self) -> broadcast::Receiver<GameEvent>;
}

/// The local simulation backend.
///
/// Events carry the session wallet as the acting user; the field stays
/// empty until a wallet connects, the same looseness the rest of the
/// single-player state has.
pub struct LocalBackend {
    engine: Arc<GameEngine>,
    events: broadcast::Sender<GameEvent>,
}

impl LocalBackend {
    /// Wraps an engine in the backend surface.
    pub fn new(engine: Arc<GameEngine>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { engine, events }
    }

    fn emit(&self, event: GameEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn current_user(&self) -> String {
        self.engine.store().get().wallet_address
    }

    /// Records a player who joined with this session's code.
    ///
    /// Not part of [`GameBackend`]: on chain this happens inside the
    /// other player's `register` call. Locally it is fed in by hand and
    /// still produces the referral event.
    pub async fn record_referred_user(&self, address: &str) -> Result<InviteOutcome> {
        let outcome = self.engine.add_referred_user(address)?;
        if !outcome.already_known {
            self.emit(GameEvent::ReferralRegistered {
                referrer: self.current_user(),
                referred: address.to_string(),
                bonus: outcome.bonus,
            });
        }
        Ok(outcome)
    }
}

impl GameBackend for LocalBackend {
    async fn register(&self, referral_code: &str) -> Result<RegisterOutcome> {
        let state = self.engine.snapshot();
        if !state.is_connected {
            return Err(TransitionError::NotConnected.into());
        }
        let code = referral_code.trim();
        let redeemed = if code.is_empty() {
            None
        } else {
            Some(self.engine.redeem_referral(code)?)
        };
        self.emit(GameEvent::UserRegistered {
            user: state.wallet_address,
            referral_code: state.referral_code.clone(),
        });
        Ok(RegisterOutcome {
            referral_code: state.referral_code,
            redeemed,
        })
    }

    async fn tap(&self) -> Result<TapOutcome> {
        let outcome = self.engine.tap()?;
        self.emit(GameEvent::Tapped {
            user: self.current_user(),
            points: outcome.points_awarded,
            total_taps: outcome.total_taps,
        });
        Ok(outcome)
    }

    async fn claim_daily_reward(&self) -> Result<ClaimOutcome> {
        let outcome = self.engine.claim_daily_reward()?;
        self.emit(GameEvent::DailyRewardClaimed {
            user: self.current_user(),
            points: outcome.points_awarded,
            streak: outcome.streak,
        });
        Ok(outcome)
    }

    async fn convert_points(&self) -> Result<ConvertOutcome> {
        let outcome = self.engine.convert_points()?;
        self.emit(GameEvent::PointsConverted {
            user: self.current_user(),
            points: outcome.points_spent,
            tokens: outcome.tokens_gained,
        });
        Ok(outcome)
    }

    async fn request_withdrawal(
        &self,
        address: &str,
        amount: TokenAmount,
    ) -> Result<WithdrawOutcome> {
        // The contract emits nothing for withdrawals, so neither do we.
        Ok(self.engine.simulate_withdrawal(address, amount)?)
    }

    async fn user_stats(&self, address: &str) -> Result<UserStats> {
        let state = self.engine.snapshot();
        if !state.wallet_address.eq_ignore_ascii_case(address) {
            bail!(
                "no stats tracked for {}; this backend only knows the local player",
                wallet::short_address(address)
            );
        }
        Ok(UserStats {
            points: state.points,
            tokens: state.tokens,
            total_taps: state.total_taps,
            referral_points: state.referral_points,
            referrals_count: state.referred_users.len(),
            daily_claims: state.daily_claims,
            streak: state.daily_streak,
            referral_code: state.referral_code,
        })
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        // A board of one: the local player, once a wallet is connected.
        let state = self.engine.snapshot();
        let mut rows = Vec::new();
        if state.is_connected {
            rows.push(LeaderboardEntry {
                address: state.wallet_address,
                points: state.points,
                taps: state.total_taps,
            });
        }
        rows.truncate(limit);
        Ok(rows)
    }

    async fn can_claim_daily_reward(&self, _address: &str) -> Result<bool> {
        // Claim state is session-wide here; the address matters on chain.
        Ok(self.engine.can_claim_daily_reward())
    }

    async fn time_until_next_claim(&self, _address: &str) -> Result<Duration> {
        Ok(self.engine.time_until_next_claim())
    }

    fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }
}
