use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tapmint_core::{
    contract::{GameBackend, LocalBackend, UserStats},
    engine::{GameEngine, LUCKY_TAP_BONUS},
    outcome::TransitionError,
    rollover::RolloverEvent,
    state::{GameState, TokenAmount},
    wallet,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// Interactive command loop over the local game backend.
pub struct TapmintApp {
    engine: Arc<GameEngine>,
    backend: LocalBackend,
    rollover_rx: Option<mpsc::Receiver<RolloverEvent>>,
}

impl TapmintApp {
    pub fn new(engine: Arc<GameEngine>, backend: LocalBackend) -> Self {
        Self {
            engine,
            backend,
            rollover_rx: None,
        }
    }

    pub fn attach_rollover(&mut self, receiver: mpsc::Receiver<RolloverEvent>) {
        self.rollover_rx = Some(receiver);
    }

    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut events = self.backend.subscribe();
        let mut rollover_rx = self.rollover_rx.take();

        loop {
            print!("> ");
            io::stdout().flush()?;

            let input = if rollover_rx.is_some() {
                let mut rollover_closed = false;
                let rx = rollover_rx.as_mut().unwrap();
                let input = tokio::select! {
                    maybe_line = lines.next_line() => Some(maybe_line?),
                    maybe_roll = rx.recv() => {
                        match maybe_roll {
                            Some(event) => self.handle_rollover(event),
                            None => rollover_closed = true,
                        }
                        None
                    }
                };
                if rollover_closed {
                    rollover_rx = None;
                }
                input
            } else {
                Some(lines.next_line().await?)
            };

            // No input means a rollover interrupted the prompt; reprint it.
            let Some(maybe_line) = input else { continue };
            let Some(line) = maybe_line else { break };
            if !self.handle_command(line.trim()).await {
                break;
            }
            while let Ok(event) = events.try_recv() {
                debug!(?event, "backend event");
            }
        }

        println!("bye.");
        Ok(())
    }

    fn handle_rollover(&self, event: RolloverEvent) {
        let RolloverEvent::DayAdvanced { today } = event;
        println!();
        println!("A new day ({today}). The daily reward is available again.");
    }

    async fn handle_command(&self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return true;
        };
        let args: Vec<&str> = parts.collect();

        match command {
            "help" | "h" | "?" => self.print_help(),
            "tap" | "t" => self.handle_tap(&args).await,
            "claim" | "c" => self.handle_claim().await,
            "convert" => self.handle_convert().await,
            "withdraw" | "w" => self.handle_withdraw(&args).await,
            "connect" => self.handle_connect(&args).await,
            "disconnect" => self.handle_disconnect(),
            "redeem" => self.handle_redeem(&args).await,
            "invite" => self.handle_invite(&args).await,
            "stats" | "s" => self.handle_stats(&args).await,
            "board" | "top" => self.handle_board(&args).await,
            "reset" => self.handle_reset(&args),
            "quit" | "exit" | "q" => return false,
            other => println!("Unknown command '{other}'. Type 'help' for the list."),
        }
        true
    }

    fn print_welcome(&self) {
        println!("tapmint: a tap-to-earn economy sandbox. Type 'help' for commands.");
        let state = self.engine.snapshot();
        if state.is_connected {
            println!(
                "Welcome back, {}. {} points, {} tokens.",
                wallet::short_address(&state.wallet_address),
                state.points,
                state.tokens
            );
        }
    }

    fn print_help(&self) {
        println!("Commands:");
        println!("  tap [count]               tap to earn points (rate limited)");
        println!("  claim                     claim the daily reward");
        println!(
            "  convert                   turn {} points into a token",
            self.engine.config().conversion_rate
        );
        println!("  withdraw <amount> [addr]  withdraw tokens (simulated)");
        println!("  connect <address>         connect a wallet (0x + 40 hex digits)");
        println!("  disconnect                disconnect the wallet, keep progress");
        println!("  redeem <code>             redeem someone's referral code");
        println!("  invite <address>          count a player who joined with your code");
        println!("  stats [address]           show session or per-player stats");
        println!("  board [n]                 show the leaderboard");
        println!("  reset yes                 wipe all progress");
        println!("  quit                      leave");
    }

    async fn handle_tap(&self, args: &[&str]) {
        let count: u64 = match args.first() {
            Some(raw) => match raw.parse() {
                Ok(n) if n >= 1 => n,
                _ => {
                    println!("Usage: tap [count]");
                    return;
                }
            },
            None => 1,
        };

        let mut accepted = 0u64;
        let mut lucky_hits = 0u64;
        let mut gained = 0u64;
        let mut retry_hint = None;
        let mut last = None;
        for _ in 0..count {
            match self.backend.tap().await {
                Ok(outcome) => {
                    accepted += 1;
                    gained += outcome.points_awarded;
                    if outcome.lucky {
                        lucky_hits += 1;
                    }
                    last = Some(outcome);
                }
                Err(err) => {
                    if let Some(TransitionError::RateLimited { retry_in_ms }) =
                        err.downcast_ref::<TransitionError>()
                    {
                        retry_hint = Some(*retry_in_ms);
                    } else {
                        report_error(&err);
                        return;
                    }
                }
            }
        }

        match last {
            Some(outcome) => {
                if lucky_hits > 0 {
                    println!("Lucky tap! +{LUCKY_TAP_BONUS} points");
                }
                let mut summary = format!("+{gained} points");
                if count > 1 {
                    summary.push_str(&format!(" from {accepted} of {count} taps"));
                    if count > accepted {
                        summary.push_str(&format!(" ({} rate limited)", count - accepted));
                    }
                }
                println!(
                    "{summary}. {} points total, {} taps.{}",
                    outcome.points_total,
                    outcome.total_taps,
                    save_note(outcome.persisted)
                );
            }
            None => {
                if let Some(ms) = retry_hint {
                    println!("Tap too fast! Slow down (retry in {ms} ms).");
                }
            }
        }
    }

    async fn handle_claim(&self) {
        match self.backend.claim_daily_reward().await {
            Ok(outcome) => println!(
                "Daily reward claimed: +{} points (day {} of the streak, x{}).{}",
                outcome.points_awarded,
                outcome.streak,
                outcome.multiplier,
                save_note(outcome.persisted)
            ),
            Err(err) => {
                if matches!(
                    err.downcast_ref::<TransitionError>(),
                    Some(TransitionError::AlreadyClaimed)
                ) {
                    println!(
                        "Daily reward already claimed. Next one in {}.",
                        format_duration(self.engine.time_until_next_claim())
                    );
                } else {
                    report_error(&err);
                }
            }
        }
    }

    async fn handle_convert(&self) {
        match self.backend.convert_points().await {
            Ok(outcome) => println!(
                "Converted {} points into {} tokens. {} points and {} tokens now.{}",
                outcome.points_spent,
                outcome.tokens_gained,
                outcome.points_remaining,
                outcome.tokens_total,
                save_note(outcome.persisted)
            ),
            Err(err) => report_error(&err),
        }
    }

    async fn handle_withdraw(&self, args: &[&str]) {
        let Some(raw_amount) = args.first() else {
            println!("Usage: withdraw <amount> [address]");
            return;
        };
        let amount = match raw_amount.parse::<TokenAmount>() {
            Ok(amount) => amount,
            Err(err) => {
                println!("{err}.");
                return;
            }
        };
        let address = match args.get(1) {
            Some(explicit) => (*explicit).to_string(),
            None => {
                let state = self.engine.snapshot();
                if !state.is_connected {
                    println!("Connect a wallet first, or name a destination address.");
                    return;
                }
                state.wallet_address
            }
        };

        match self.backend.request_withdrawal(&address, amount).await {
            Ok(outcome) => println!(
                "Withdrew {} tokens to {}, recorded as {}. {} tokens left.{}",
                outcome.withdrawal.amount,
                wallet::short_address(&outcome.withdrawal.address),
                outcome.withdrawal.tx_hash,
                outcome.tokens_remaining,
                save_note(outcome.persisted)
            ),
            Err(err) => report_error(&err),
        }
    }

    async fn handle_connect(&self, args: &[&str]) {
        let Some(address) = args.first() else {
            println!("Usage: connect <address>");
            return;
        };
        match self.engine.connect_wallet(address) {
            Ok(outcome) => {
                println!(
                    "Wallet {} connected.{}",
                    wallet::short_address(&outcome.address),
                    save_note(outcome.persisted)
                );
                if outcome.code_assigned {
                    println!("Your referral code: {}", outcome.referral_code);
                }
                // Register with the backend so the event stream sees the join.
                if let Err(err) = self.backend.register("").await {
                    report_error(&err);
                }
            }
            Err(err) => println!("{}", transition_message(&err)),
        }
    }

    fn handle_disconnect(&self) {
        match self.engine.disconnect_wallet() {
            Ok(outcome) => println!(
                "Wallet disconnected. Progress stays on this device.{}",
                save_note(outcome.persisted)
            ),
            Err(err) => println!("{}", transition_message(&err)),
        }
    }

    async fn handle_redeem(&self, args: &[&str]) {
        let Some(code) = args.first() else {
            println!("Usage: redeem <code>");
            return;
        };
        if !wallet::is_referral_code(code) {
            println!("'{code}' does not look like a referral code; trying anyway.");
        }
        match self.backend.register(code).await {
            Ok(outcome) => {
                if let Some(redeemed) = outcome.redeemed {
                    println!(
                        "Referral code accepted: +{} points, {} referral points overall.{}",
                        redeemed.bonus,
                        redeemed.referral_points_total,
                        save_note(redeemed.persisted)
                    );
                }
            }
            Err(err) => report_error(&err),
        }
    }

    async fn handle_invite(&self, args: &[&str]) {
        let Some(address) = args.first() else {
            println!("Usage: invite <address>");
            return;
        };
        match self.backend.record_referred_user(address).await {
            Ok(outcome) if outcome.already_known => {
                println!("{} has already been counted.", wallet::short_address(address));
            }
            Ok(outcome) => println!(
                "+{} points for referring {}. {} players referred so far.{}",
                outcome.bonus,
                wallet::short_address(address),
                outcome.referred_total,
                save_note(outcome.persisted)
            ),
            Err(err) => report_error(&err),
        }
    }

    async fn handle_stats(&self, args: &[&str]) {
        match args.first() {
            Some(address) => match self.backend.user_stats(address).await {
                Ok(stats) => print_user_stats(address, &stats),
                Err(err) => report_error(&err),
            },
            None => self.print_session(&self.engine.snapshot()),
        }
    }

    fn print_session(&self, state: &GameState) {
        if state.is_connected {
            println!("Wallet:        {}", wallet::short_address(&state.wallet_address));
        } else {
            println!("Wallet:        not connected");
        }
        if !state.referral_code.is_empty() {
            println!("Referral code: {}", state.referral_code);
        }
        println!("Points:        {}", state.points);
        println!("Tokens:        {}", state.tokens);
        println!("Taps:          {}", state.total_taps);
        if self.engine.can_claim_daily_reward() {
            println!("Daily reward:  available now");
        } else {
            println!(
                "Daily reward:  claimed, next one in {}",
                format_duration(self.engine.time_until_next_claim())
            );
        }
        if state.daily_streak > 0 {
            println!(
                "Streak:        {} days, {} claims overall",
                state.daily_streak, state.daily_claims
            );
        }
        if !state.referred_users.is_empty() || state.referral_points > 0 {
            println!(
                "Referrals:     {} invited, {} referral points",
                state.referred_users.len(),
                state.referral_points
            );
        }
        if let Some(last) = state.withdrawals.last() {
            println!(
                "Withdrawals:   {} in total, last {} tokens as {}",
                state.withdrawals.len(),
                last.amount,
                last.tx_hash
            );
        }
    }

    async fn handle_board(&self, args: &[&str]) {
        let limit = args
            .first()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(10);
        match self.backend.leaderboard(limit).await {
            Ok(rows) if rows.is_empty() => {
                println!("Leaderboard is empty. Connect a wallet and start tapping.");
            }
            Ok(rows) => {
                for (rank, row) in rows.iter().enumerate() {
                    println!(
                        "{:>2}. {}  {} points, {} taps",
                        rank + 1,
                        wallet::short_address(&row.address),
                        row.points,
                        row.taps
                    );
                }
            }
            Err(err) => report_error(&err),
        }
    }

    fn handle_reset(&self, args: &[&str]) {
        if args.first() != Some(&"yes") {
            println!("This wipes points, tokens, referrals and history. Run 'reset yes' to confirm.");
            return;
        }
        match self.engine.reset() {
            Ok(()) => println!("Fresh start. Everything is back to zero."),
            Err(err) => println!("Error: {err:#}"),
        }
    }
}

fn print_user_stats(address: &str, stats: &UserStats) {
    println!("Stats for {}:", wallet::short_address(address));
    println!("  Points:          {}", stats.points);
    println!("  Tokens:          {}", stats.tokens);
    println!("  Taps:            {}", stats.total_taps);
    println!("  Daily claims:    {} (streak {})", stats.daily_claims, stats.streak);
    println!(
        "  Referrals:       {} invited, {} referral points",
        stats.referrals_count, stats.referral_points
    );
    println!("  Referral code:   {}", stats.referral_code);
}

fn transition_message(err: &TransitionError) -> String {
    match err {
        TransitionError::InvalidAddress => "Invalid wallet address.".to_string(),
        TransitionError::RateLimited { retry_in_ms } => {
            format!("Tap too fast! Slow down (retry in {retry_in_ms} ms).")
        }
        TransitionError::AlreadyClaimed => "Daily reward already claimed today.".to_string(),
        TransitionError::InsufficientPoints { needed, have } => {
            format!("Need at least {needed} points to convert (have {have}).")
        }
        TransitionError::InvalidAmount {
            requested,
            available,
        } => format!("Cannot withdraw {requested} tokens with {available} available."),
        TransitionError::NotConnected => "Connect a wallet first.".to_string(),
        TransitionError::SelfReferral => "You cannot redeem your own referral code.".to_string(),
    }
}

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<TransitionError>() {
        Some(transition) => println!("{}", transition_message(transition)),
        None => println!("Error: {err:#}"),
    }
}

fn save_note(persisted: bool) -> &'static str {
    if persisted {
        ""
    } else {
        " (warning: progress not saved to disk)"
    }
}

fn format_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}
