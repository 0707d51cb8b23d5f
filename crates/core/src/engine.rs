//! The game economy engine.
//!
//! One transition, one [`StateStore::apply`] call: preconditions are
//! checked against a working copy, rejections leave the state exactly as
//! it was, and accepted transitions commit and persist in one step.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::luck::Luck;
use crate::outcome::{
    ClaimOutcome, ConnectOutcome, ConvertOutcome, DisconnectOutcome, InviteOutcome,
    ReferralOutcome, TapOutcome, TransitionError, WithdrawOutcome,
};
use crate::state::{GameState, TokenAmount, Withdrawal};
use crate::store::StateStore;
use crate::wallet;

/// Chance that an accepted tap is lucky.
pub const LUCKY_TAP_CHANCE: f64 = 0.05;
/// Points a lucky tap awards instead of the configured per-tap points.
pub const LUCKY_TAP_BONUS: u64 = 10;
/// Points for redeeming someone else's referral code.
pub const REFERRAL_REDEEM_BONUS: u64 = 500;
/// Points for each new player who joins with this player's code.
pub const REFERRED_USER_BONUS: u64 = 1_000;

/// Streak length at which the daily reward doubles.
pub const STREAK_DOUBLE_AT: u32 = 7;
/// Streak length at which the daily reward gains half again.
pub const STREAK_HALF_AGAIN_AT: u32 = 3;

/// Multiplier applied to the daily reward for a given streak length.
pub fn streak_multiplier(streak: u32) -> f64 {
    if streak >= STREAK_DOUBLE_AT {
        2.0
    } else if streak >= STREAK_HALF_AGAIN_AT {
        1.5
    } else {
        1.0
    }
}

fn next_streak(last: Option<NaiveDate>, current: u32, today: NaiveDate) -> u32 {
    match last {
        Some(prev) if today.pred_opt() == Some(prev) => current.saturating_add(1),
        Some(prev) if prev == today => current.max(1),
        _ => 1,
    }
}

fn new_tx_hash() -> String {
    format!("0x{}", Uuid::new_v4().simple())
}

/// Applies game transitions to a [`StateStore`].
///
/// Time and randomness are injected, so every rule in here can be tested
/// without sleeping or praying to the RNG.
pub struct GameEngine {
    store: StateStore,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    luck: Mutex<Box<dyn Luck>>,
}

impl GameEngine {
    /// Creates an engine over `store` with the given time and luck sources.
    pub fn new(
        store: StateStore,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        luck: Box<dyn Luck>,
    ) -> Self {
        Self {
            store,
            config,
            clock,
            luck: Mutex::new(luck),
        }
    }

    /// The store this engine drives.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// The economy settings in effect.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current state with the claimed-today flag freshly re-derived.
    pub fn snapshot(&self) -> GameState {
        self.store.refresh_daily_flag(self.clock.today());
        self.store.get()
    }

    /// Connects a wallet, deriving a referral code the first time.
    ///
    /// Reconnecting a different wallet keeps the original code; the code
    /// is bound to the state, not to the address of the day.
    pub fn connect_wallet(&self, address: &str) -> Result<ConnectOutcome, TransitionError> {
        if !wallet::is_valid_address(address) {
            return Err(TransitionError::InvalidAddress);
        }
        let (mut outcome, persisted) = self.store.apply(|state| {
            state.wallet_address = address.to_string();
            state.is_connected = true;
            let code_assigned = if state.referral_code.is_empty() {
                state.referral_code = wallet::referral_code_for(address);
                true
            } else {
                false
            };
            Ok(ConnectOutcome {
                address: state.wallet_address.clone(),
                referral_code: state.referral_code.clone(),
                code_assigned,
                persisted: false,
            })
        })?;
        outcome.persisted = persisted;
        info!(address = %wallet::short_address(address), "wallet connected");
        Ok(outcome)
    }

    /// Disconnects the wallet. Balances and history stay behind.
    pub fn disconnect_wallet(&self) -> Result<DisconnectOutcome, TransitionError> {
        let (_, persisted) = self.store.apply(|state| {
            state.wallet_address.clear();
            state.is_connected = false;
            Ok(())
        })?;
        info!("wallet disconnected");
        Ok(DisconnectOutcome { persisted })
    }

    /// One tap: rate limited, occasionally lucky.
    ///
    /// A rejected tap consumes no luck draw and moves no timestamps.
    pub fn tap(&self) -> Result<TapOutcome, TransitionError> {
        let now = self.clock.now_millis();
        let min_interval = self.config.min_tap_interval_ms();
        let points_per_tap = self.config.points_per_tap;
        let (mut outcome, persisted) = self.store.apply(|state| {
            let elapsed = now - state.last_tap_time;
            if elapsed < min_interval {
                return Err(TransitionError::RateLimited {
                    retry_in_ms: min_interval - elapsed,
                });
            }
            let lucky = self.luck.lock().lucky(LUCKY_TAP_CHANCE);
            let awarded = if lucky { LUCKY_TAP_BONUS } else { points_per_tap };
            state.points = state.points.saturating_add(awarded);
            state.total_taps = state.total_taps.saturating_add(1);
            state.last_tap_time = now;
            Ok(TapOutcome {
                points_awarded: awarded,
                lucky,
                points_total: state.points,
                total_taps: state.total_taps,
                persisted: false,
            })
        })?;
        outcome.persisted = persisted;
        debug!(
            points = outcome.points_awarded,
            lucky = outcome.lucky,
            total = outcome.points_total,
            "tap accepted"
        );
        Ok(outcome)
    }

    /// Claims the daily reward for the current calendar day.
    ///
    /// Consecutive-day claims build a streak that multiplies the base
    /// reward; the award is floored to whole points.
    pub fn claim_daily_reward(&self) -> Result<ClaimOutcome, TransitionError> {
        let today = self.clock.today();
        let base = self.config.daily_bonus_points;
        let (mut outcome, persisted) = self.store.apply(|state| {
            if state.claimed_today(today) {
                return Err(TransitionError::AlreadyClaimed);
            }
            let streak = next_streak(state.last_daily_reward, state.daily_streak, today);
            let multiplier = streak_multiplier(streak);
            let awarded = (base as f64 * multiplier).floor() as u64;
            state.points = state.points.saturating_add(awarded);
            state.daily_reward_claimed = true;
            state.last_daily_reward = Some(today);
            state.daily_streak = streak;
            state.daily_claims = state.daily_claims.saturating_add(1);
            Ok(ClaimOutcome {
                points_awarded: awarded,
                streak,
                multiplier,
                persisted: false,
            })
        })?;
        outcome.persisted = persisted;
        info!(
            points = outcome.points_awarded,
            streak = outcome.streak,
            "daily reward claimed"
        );
        Ok(outcome)
    }

    /// Converts points into whole tokens at the configured rate.
    ///
    /// Floor semantics: the remainder below one token's worth of points
    /// stays as points.
    pub fn convert_points(&self) -> Result<ConvertOutcome, TransitionError> {
        let rate = self.config.conversion_rate;
        let (mut outcome, persisted) = self.store.apply(|state| {
            if state.points < rate {
                return Err(TransitionError::InsufficientPoints {
                    needed: rate,
                    have: state.points,
                });
            }
            let gained = state.points / rate;
            let spent = gained * rate;
            state.points %= rate;
            state.tokens = state.tokens.saturating_add(TokenAmount::from_whole(gained));
            Ok(ConvertOutcome {
                points_spent: spent,
                tokens_gained: gained,
                points_remaining: state.points,
                tokens_total: state.tokens,
                persisted: false,
            })
        })?;
        outcome.persisted = persisted;
        info!(
            tokens = outcome.tokens_gained,
            remaining = outcome.points_remaining,
            "points converted"
        );
        Ok(outcome)
    }

    /// Simulates a withdrawal: deducts tokens and records a ledger entry
    /// with a synthetic transaction id. No chain is involved.
    pub fn simulate_withdrawal(
        &self,
        address: &str,
        amount: TokenAmount,
    ) -> Result<WithdrawOutcome, TransitionError> {
        if !wallet::is_valid_address(address) {
            return Err(TransitionError::InvalidAddress);
        }
        let timestamp = self.clock.now();
        let (mut outcome, persisted) = self.store.apply(|state| {
            let remaining = match state.tokens.checked_sub(amount) {
                Some(remaining) if !amount.is_zero() => remaining,
                _ => {
                    return Err(TransitionError::InvalidAmount {
                        requested: amount,
                        available: state.tokens,
                    })
                }
            };
            state.tokens = remaining;
            let withdrawal = Withdrawal {
                address: address.to_string(),
                amount,
                timestamp,
                tx_hash: new_tx_hash(),
            };
            state.withdrawals.push(withdrawal.clone());
            Ok(WithdrawOutcome {
                withdrawal,
                tokens_remaining: remaining,
                persisted: false,
            })
        })?;
        outcome.persisted = persisted;
        info!(
            amount = %outcome.withdrawal.amount,
            tx = %outcome.withdrawal.tx_hash,
            "withdrawal recorded"
        );
        Ok(outcome)
    }

    /// Redeems someone else's referral code for a point bonus.
    ///
    /// The code is not checked against any registry; there is none to
    /// ask. Only redeeming your own code is refused.
    pub fn redeem_referral(&self, code: &str) -> Result<ReferralOutcome, TransitionError> {
        let (mut outcome, persisted) = self.store.apply(|state| {
            if !state.is_connected {
                return Err(TransitionError::NotConnected);
            }
            if code == state.referral_code {
                return Err(TransitionError::SelfReferral);
            }
            state.points = state.points.saturating_add(REFERRAL_REDEEM_BONUS);
            state.referral_points = state.referral_points.saturating_add(REFERRAL_REDEEM_BONUS);
            Ok(ReferralOutcome {
                bonus: REFERRAL_REDEEM_BONUS,
                referral_points_total: state.referral_points,
                persisted: false,
            })
        })?;
        outcome.persisted = persisted;
        info!(bonus = outcome.bonus, "referral code redeemed");
        Ok(outcome)
    }

    /// Records a player who joined with this player's code and credits
    /// the referrer bonus. Recording the same address again is a no-op.
    pub fn add_referred_user(&self, address: &str) -> Result<InviteOutcome, TransitionError> {
        let (mut outcome, persisted) = self.store.apply(|state| {
            if state.referred_users.iter().any(|known| known == address) {
                return Ok(InviteOutcome {
                    already_known: true,
                    bonus: 0,
                    referred_total: state.referred_users.len(),
                    persisted: false,
                });
            }
            state.referred_users.push(address.to_string());
            state.points = state.points.saturating_add(REFERRED_USER_BONUS);
            Ok(InviteOutcome {
                already_known: false,
                bonus: REFERRED_USER_BONUS,
                referred_total: state.referred_users.len(),
                persisted: false,
            })
        })?;
        outcome.persisted = persisted;
        if !outcome.already_known {
            info!(
                referred = %wallet::short_address(address),
                "referred user recorded"
            );
        }
        Ok(outcome)
    }

    /// Wipes the state back to defaults, removing the persisted file.
    pub fn reset(&self) -> Result<()> {
        self.store.reset()?;
        info!("game state reset");
        Ok(())
    }

    /// True when the daily reward can be claimed right now.
    pub fn can_claim_daily_reward(&self) -> bool {
        !self.snapshot().claimed_today(self.clock.today())
    }

    /// Time until the next claim becomes available; zero when it already is.
    pub fn time_until_next_claim(&self) -> Duration {
        let now = self.clock.now();
        let today = now.date_naive();
        if !self.store.get().claimed_today(today) {
            return Duration::zero();
        }
        match today.succ_opt().and_then(|next| next.and_hms_opt(0, 0, 0)) {
            Some(midnight) => midnight.and_utc() - now,
            None => Duration::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::luck::ScriptedLuck;
    use chrono::{TimeZone, Utc};
    use tempfile::{tempdir, TempDir};

    const ADDRESS: &str = "0x1234567890123456789012345678901234567890";
    const OTHER_ADDRESS: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

    fn noon(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn engine_with_luck(draws: Vec<bool>) -> (GameEngine, ManualClock, TempDir) {
        let dir = tempdir().unwrap();
        let clock = ManualClock::starting_at(noon(2026, 8, 25));
        let engine = GameEngine::new(
            StateStore::open(dir.path()),
            AppConfig::default(),
            Arc::new(clock.clone()),
            Box::new(ScriptedLuck::new(draws)),
        );
        (engine, clock, dir)
    }

    fn engine() -> (GameEngine, ManualClock, TempDir) {
        engine_with_luck(Vec::new())
    }

    #[test]
    fn spaced_taps_accrue_points() {
        let (engine, clock, _dir) = engine();
        for expected in 1..=3u64 {
            let outcome = engine.tap().unwrap();
            assert!(!outcome.lucky);
            assert_eq!(outcome.points_awarded, 1);
            assert_eq!(outcome.points_total, expected);
            assert_eq!(outcome.total_taps, expected);
            assert!(outcome.persisted);
            clock.advance(Duration::milliseconds(100));
        }
    }

    #[test]
    fn fast_taps_are_rejected_with_a_retry_hint() {
        let (engine, clock, _dir) = engine();
        engine.tap().unwrap();
        clock.advance(Duration::milliseconds(40));

        let err = engine.tap().unwrap_err();
        assert_eq!(err, TransitionError::RateLimited { retry_in_ms: 60 });
        let state = engine.store().get();
        assert_eq!(state.points, 1);
        assert_eq!(state.total_taps, 1);

        // Exactly on the boundary is allowed again.
        clock.advance(Duration::milliseconds(60));
        assert!(engine.tap().is_ok());
    }

    #[test]
    fn lucky_taps_award_the_flat_bonus() {
        let (engine, clock, _dir) = engine_with_luck(vec![true, false]);
        let lucky = engine.tap().unwrap();
        assert!(lucky.lucky);
        assert_eq!(lucky.points_awarded, LUCKY_TAP_BONUS);

        clock.advance(Duration::milliseconds(100));
        let plain = engine.tap().unwrap();
        assert!(!plain.lucky);
        assert_eq!(plain.points_awarded, 1);
        assert_eq!(plain.points_total, LUCKY_TAP_BONUS + 1);
    }

    #[test]
    fn rejected_taps_do_not_consume_luck_draws() {
        let (engine, clock, _dir) = engine_with_luck(vec![false, true]);
        engine.tap().unwrap();
        // Burst of rejected taps; the scripted lucky draw must survive them.
        assert!(engine.tap().is_err());
        assert!(engine.tap().is_err());
        clock.advance(Duration::milliseconds(100));
        let outcome = engine.tap().unwrap();
        assert!(outcome.lucky);
    }

    #[test]
    fn daily_claim_builds_a_streak_with_multipliers() {
        let (engine, clock, _dir) = engine();

        // Days 1 and 2 pay the base, day 3 half again, day 7 double.
        let expected = [100, 100, 150, 150, 150, 150, 200];
        for (day, want) in expected.iter().enumerate() {
            clock.set(noon(2026, 9, 1 + day as u32));
            let outcome = engine.claim_daily_reward().unwrap();
            assert_eq!(outcome.points_awarded, *want, "day {}", day + 1);
            assert_eq!(outcome.streak, day as u32 + 1);
        }

        let state = engine.store().get();
        assert_eq!(state.points, expected.iter().sum::<u64>());
        assert_eq!(state.daily_streak, 7);
        assert_eq!(state.daily_claims, 7);
    }

    #[test]
    fn second_claim_on_the_same_day_is_rejected() {
        let (engine, _clock, _dir) = engine();
        engine.claim_daily_reward().unwrap();
        assert_eq!(
            engine.claim_daily_reward().unwrap_err(),
            TransitionError::AlreadyClaimed
        );
        assert_eq!(engine.store().get().daily_claims, 1);
    }

    #[test]
    fn skipping_a_day_resets_the_streak() {
        let (engine, clock, _dir) = engine();
        clock.set(noon(2026, 9, 1));
        engine.claim_daily_reward().unwrap();
        clock.set(noon(2026, 9, 2));
        engine.claim_daily_reward().unwrap();
        clock.set(noon(2026, 9, 3));
        let third = engine.claim_daily_reward().unwrap();
        assert_eq!(third.streak, 3);
        assert_eq!(third.points_awarded, 150);

        clock.set(noon(2026, 9, 5));
        let after_gap = engine.claim_daily_reward().unwrap();
        assert_eq!(after_gap.streak, 1);
        assert_eq!(after_gap.points_awarded, 100);
    }

    #[test]
    fn claim_works_right_after_midnight() {
        let (engine, clock, _dir) = engine();
        clock.set(Utc.with_ymd_and_hms(2026, 9, 1, 23, 59, 0).unwrap());
        engine.claim_daily_reward().unwrap();
        clock.advance(Duration::minutes(2));
        let outcome = engine.claim_daily_reward().unwrap();
        assert_eq!(outcome.streak, 2);
    }

    #[test]
    fn conversion_needs_a_full_token_worth_of_points() {
        let (engine, _clock, _dir) = engine();
        engine
            .store()
            .apply(|state| {
                state.points = 30;
                Ok(())
            })
            .unwrap();

        let err = engine.convert_points().unwrap_err();
        assert_eq!(
            err,
            TransitionError::InsufficientPoints {
                needed: 1_000,
                have: 30
            }
        );
        assert_eq!(engine.store().get().points, 30);
    }

    #[test]
    fn conversion_floors_and_keeps_the_remainder() {
        let (engine, _clock, _dir) = engine();
        engine
            .store()
            .apply(|state| {
                state.points = 2_500;
                Ok(())
            })
            .unwrap();

        let outcome = engine.convert_points().unwrap();
        assert_eq!(outcome.tokens_gained, 2);
        assert_eq!(outcome.points_spent, 2_000);
        assert_eq!(outcome.points_remaining, 500);
        assert_eq!(outcome.tokens_total, TokenAmount::from_whole(2));

        let state = engine.store().get();
        assert_eq!(state.points, 500);
        assert_eq!(state.tokens, TokenAmount::from_whole(2));

        // The remainder alone is below the rate, so converting again
        // changes nothing.
        assert_eq!(
            engine.convert_points(),
            Err(TransitionError::InsufficientPoints {
                needed: 1_000,
                have: 500
            })
        );
        assert_eq!(engine.store().get().points, 500);
    }

    #[test]
    fn withdrawal_deducts_and_records_a_ledger_entry() {
        let (engine, _clock, _dir) = engine();
        engine
            .store()
            .apply(|state| {
                state.tokens = TokenAmount::from_whole(5);
                Ok(())
            })
            .unwrap();

        let outcome = engine
            .simulate_withdrawal(ADDRESS, TokenAmount::from_millis(1_500))
            .unwrap();
        assert_eq!(outcome.tokens_remaining, TokenAmount::from_millis(3_500));
        assert_eq!(outcome.withdrawal.address, ADDRESS);
        assert!(outcome.withdrawal.tx_hash.starts_with("0x"));
        assert_eq!(outcome.withdrawal.tx_hash.len(), 34);

        let second = engine
            .simulate_withdrawal(ADDRESS, TokenAmount::from_whole(1))
            .unwrap();
        assert_ne!(second.withdrawal.tx_hash, outcome.withdrawal.tx_hash);

        let state = engine.store().get();
        assert_eq!(state.withdrawals.len(), 2);
        assert_eq!(state.tokens, TokenAmount::from_millis(2_500));

        // Cashing out the whole balance is allowed and lands exactly on
        // zero.
        let last = engine
            .simulate_withdrawal(ADDRESS, TokenAmount::from_millis(2_500))
            .unwrap();
        assert_eq!(last.tokens_remaining, TokenAmount::ZERO);
        let state = engine.store().get();
        assert_eq!(state.withdrawals.len(), 3);
        assert!(state.tokens.is_zero());
    }

    #[test]
    fn withdrawal_rejects_bad_amounts_and_addresses() {
        let (engine, _clock, _dir) = engine();
        engine
            .store()
            .apply(|state| {
                state.tokens = TokenAmount::from_whole(1);
                Ok(())
            })
            .unwrap();

        assert_eq!(
            engine.simulate_withdrawal("0xnope", TokenAmount::from_whole(1)),
            Err(TransitionError::InvalidAddress)
        );
        assert_eq!(
            engine.simulate_withdrawal(ADDRESS, TokenAmount::ZERO),
            Err(TransitionError::InvalidAmount {
                requested: TokenAmount::ZERO,
                available: TokenAmount::from_whole(1)
            })
        );
        assert_eq!(
            engine.simulate_withdrawal(ADDRESS, TokenAmount::from_whole(2)),
            Err(TransitionError::InvalidAmount {
                requested: TokenAmount::from_whole(2),
                available: TokenAmount::from_whole(1)
            })
        );
        assert!(engine.store().get().withdrawals.is_empty());
    }

    #[test]
    fn connect_derives_a_code_once_and_keeps_it() {
        let (engine, _clock, _dir) = engine();
        assert_eq!(
            engine.connect_wallet("not-an-address"),
            Err(TransitionError::InvalidAddress)
        );

        let first = engine.connect_wallet(ADDRESS).unwrap();
        assert!(first.code_assigned);
        assert_eq!(first.referral_code, "REF-1234567834567890");

        engine.disconnect_wallet().unwrap();
        let state = engine.store().get();
        assert!(!state.is_connected);
        assert!(state.wallet_address.is_empty());
        assert_eq!(state.referral_code, "REF-1234567834567890");

        let again = engine.connect_wallet(OTHER_ADDRESS).unwrap();
        assert!(!again.code_assigned);
        assert_eq!(again.referral_code, "REF-1234567834567890");

        // A malformed address bounces without touching the session.
        assert_eq!(
            engine.connect_wallet("0xZZ"),
            Err(TransitionError::InvalidAddress)
        );
        let state = engine.store().get();
        assert!(state.is_connected);
        assert_eq!(state.wallet_address, OTHER_ADDRESS);
    }

    #[test]
    fn redeeming_a_code_needs_a_connected_wallet() {
        let (engine, _clock, _dir) = engine();
        assert_eq!(
            engine.redeem_referral("REF-AAAAAAAABBBBBBBB"),
            Err(TransitionError::NotConnected)
        );

        engine.connect_wallet(ADDRESS).unwrap();
        assert_eq!(
            engine.redeem_referral("REF-1234567834567890"),
            Err(TransitionError::SelfReferral)
        );

        let outcome = engine.redeem_referral("REF-AAAAAAAABBBBBBBB").unwrap();
        assert_eq!(outcome.bonus, REFERRAL_REDEEM_BONUS);
        let state = engine.store().get();
        assert_eq!(state.points, REFERRAL_REDEEM_BONUS);
        assert_eq!(state.referral_points, REFERRAL_REDEEM_BONUS);
    }

    #[test]
    fn redeemed_codes_are_not_checked_against_a_registry() {
        // Nothing ties redeemed codes to invited users; the two referral
        // paths deliberately do not reconcile.
        let (engine, _clock, _dir) = engine();
        engine.connect_wallet(ADDRESS).unwrap();
        let outcome = engine.redeem_referral("REF-DOESNOTEXIST00").unwrap();
        assert_eq!(outcome.bonus, REFERRAL_REDEEM_BONUS);
        assert!(engine.store().get().referred_users.is_empty());
    }

    #[test]
    fn inviting_a_user_pays_once() {
        let (engine, _clock, _dir) = engine();
        let first = engine.add_referred_user(OTHER_ADDRESS).unwrap();
        assert!(!first.already_known);
        assert_eq!(first.bonus, REFERRED_USER_BONUS);
        assert_eq!(first.referred_total, 1);

        let repeat = engine.add_referred_user(OTHER_ADDRESS).unwrap();
        assert!(repeat.already_known);
        assert_eq!(repeat.bonus, 0);
        assert_eq!(repeat.referred_total, 1);

        let state = engine.store().get();
        assert_eq!(state.points, REFERRED_USER_BONUS);
        assert_eq!(state.referred_users, vec![OTHER_ADDRESS.to_string()]);
        // The invite path credits points but not referralPoints.
        assert_eq!(state.referral_points, 0);
    }

    #[test]
    fn reset_wipes_everything() {
        let (engine, _clock, _dir) = engine();
        engine.connect_wallet(ADDRESS).unwrap();
        engine.tap().unwrap();
        engine.claim_daily_reward().unwrap();

        engine.reset().unwrap();
        assert_eq!(engine.store().get(), GameState::default());
        assert!(!engine.store().path().exists());
    }

    #[test]
    fn snapshot_rolls_the_daily_flag_over_at_midnight() {
        let (engine, clock, _dir) = engine();
        clock.set(Utc.with_ymd_and_hms(2026, 9, 1, 23, 0, 0).unwrap());
        engine.claim_daily_reward().unwrap();
        assert!(engine.snapshot().daily_reward_claimed);
        assert!(!engine.can_claim_daily_reward());

        let until = engine.time_until_next_claim();
        assert_eq!(until, Duration::hours(1));

        clock.advance(Duration::hours(2));
        assert!(!engine.snapshot().daily_reward_claimed);
        assert!(engine.can_claim_daily_reward());
        assert_eq!(engine.time_until_next_claim(), Duration::zero());
    }

    #[test]
    fn persisted_sessions_pick_up_where_they_left_off() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::starting_at(noon(2026, 8, 25));
        {
            let engine = GameEngine::new(
                StateStore::open(dir.path()),
                AppConfig::default(),
                Arc::new(clock.clone()),
                Box::new(ScriptedLuck::new(Vec::new())),
            );
            engine.connect_wallet(ADDRESS).unwrap();
            engine.tap().unwrap();
            engine.claim_daily_reward().unwrap();
        }

        let engine = GameEngine::new(
            StateStore::open(dir.path()),
            AppConfig::default(),
            Arc::new(clock.clone()),
            Box::new(ScriptedLuck::new(Vec::new())),
        );
        let state = engine.snapshot();
        assert_eq!(state.points, 101);
        assert!(state.is_connected);
        assert_eq!(state.daily_streak, 1);
        assert_eq!(
            engine.claim_daily_reward().unwrap_err(),
            TransitionError::AlreadyClaimed
        );
    }
}
