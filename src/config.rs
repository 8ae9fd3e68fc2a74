use crate::{constants::MIN_SECRET_KEY_LENGTH, store::TransferPolicy, transfer::RetryPolicy};
use clap::{ArgAction, Parser};
use std::time::Duration;

/// Runtime settings. Every flag can also come from the environment (or `.env`).
#[derive(Parser, Debug, Clone)]
#[command(name = "simple-bank", version, about = "Simple bank transfer service")]
pub struct Config {
	#[arg(long, env = "DATABASE_URL")]
	pub database_url: String,

	#[arg(long, env = "SOCKET_URL", default_value = "0.0.0.0:8080")]
	pub socket_url: String,

	#[arg(long, env = "JWT_SECRET", hide_env_values = true)]
	pub jwt_secret: String,

	#[arg(long, env = "ACCESS_TOKEN_DURATION_SECS", default_value_t = 900)]
	pub access_token_duration_secs: u64,

	#[arg(long, env = "DB_POOL_SIZE", default_value_t = 10)]
	pub pool_size: u32,

	#[arg(long, env = "DB_CONNECTION_TIMEOUT_SECS", default_value_t = 5)]
	pub connection_timeout_secs: u64,

	#[arg(long, env = "DB_STATEMENT_TIMEOUT_MS", default_value_t = 5_000)]
	pub statement_timeout_ms: u64,

	#[arg(long, env = "ALLOW_NEGATIVE_BALANCE", default_value_t = true, action = ArgAction::Set)]
	pub allow_negative_balance: bool,

	#[arg(long, env = "TRANSFER_MAX_ATTEMPTS", default_value_t = 1)]
	pub transfer_max_attempts: u32,

	#[arg(long, env = "TRANSFER_RETRY_BACKOFF_MS", default_value_t = 50)]
	pub transfer_retry_backoff_ms: u64,

	#[arg(long, env = "WORKERS")]
	pub workers: Option<usize>,
}

impl Config {
	pub fn validate(&self) -> anyhow::Result<()> {
		anyhow::ensure!(
			self.jwt_secret.len() >= MIN_SECRET_KEY_LENGTH,
			"JWT_SECRET must be at least {} characters",
			MIN_SECRET_KEY_LENGTH
		);
		anyhow::ensure!(self.pool_size > 0, "DB_POOL_SIZE must be positive");
		anyhow::ensure!(self.transfer_max_attempts > 0, "TRANSFER_MAX_ATTEMPTS must be at least 1");
		Ok(())
	}

	pub fn workers(&self) -> usize {
		self.workers.unwrap_or_else(num_cpus::get)
	}

	pub fn transfer_policy(&self) -> TransferPolicy {
		TransferPolicy { allow_negative_balance: self.allow_negative_balance }
	}

	pub fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy {
			max_attempts: self.transfer_max_attempts,
			backoff: Duration::from_millis(self.transfer_retry_backoff_ms),
		}
	}
}
