#![allow(missing_docs)]

use thiserror::Error;

use crate::state::{TokenAmount, Withdrawal};

/// Why a transition was rejected. The state is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("wallet address is not a valid 0x-prefixed 40 hex digit address")]
    InvalidAddress,
    #[error("tapping too fast, retry in {retry_in_ms} ms")]
    RateLimited { retry_in_ms: i64 },
    #[error("daily reward already claimed today")]
    AlreadyClaimed,
    #[error("need {needed} points to convert, only {have} available")]
    InsufficientPoints { needed: u64, have: u64 },
    #[error("requested {requested} tokens with {available} available")]
    InvalidAmount {
        requested: TokenAmount,
        available: TokenAmount,
    },
    #[error("no wallet connected")]
    NotConnected,
    #[error("cannot redeem your own referral code")]
    SelfReferral,
}

/// An accepted tap. `lucky` taps award the flat bonus instead of the
/// configured per-tap points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapOutcome {
    pub points_awarded: u64,
    pub lucky: bool,
    pub points_total: u64,
    pub total_taps: u64,
    pub persisted: bool,
}

/// A claimed daily reward, with the streak that priced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimOutcome {
    pub points_awarded: u64,
    pub streak: u32,
    pub multiplier: f64,
    pub persisted: bool,
}

/// A completed point-to-token conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOutcome {
    pub points_spent: u64,
    pub tokens_gained: u64,
    pub points_remaining: u64,
    pub tokens_total: TokenAmount,
    pub persisted: bool,
}

/// A simulated withdrawal, including the recorded ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawOutcome {
    pub withdrawal: Withdrawal,
    pub tokens_remaining: TokenAmount,
    pub persisted: bool,
}

/// A wallet connection. `code_assigned` is set the first time a referral
/// code is derived for this state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    pub address: String,
    pub referral_code: String,
    pub code_assigned: bool,
    pub persisted: bool,
}

/// A wallet disconnection. The balances stay behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub persisted: bool,
}

/// A redeemed referral code (this player used someone else's code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralOutcome {
    pub bonus: u64,
    pub referral_points_total: u64,
    pub persisted: bool,
}

/// A recorded referred user (someone joined with this player's code).
/// Recording the same address twice is a no-op with `already_known` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteOutcome {
    pub already_known: bool,
    pub bonus: u64,
    pub referred_total: usize,
    pub persisted: bool,
}
