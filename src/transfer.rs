use crate::{
	error::StoreError,
	gate::valid_account,
	models::{TransferRequest, TransferTxResult},
	store::Store,
};
use std::{thread, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
	#[error("from account [{0}] does not belong to the authenticated user")]
	NotOwner(i64),
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// How often a transfer is re-run after a transient store failure.
///
/// Each attempt is a brand new transfer; a retry never reuses or deduplicates
/// the rows of a failed attempt, which were rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_attempts: 1, backoff: Duration::from_millis(50) }
	}
}

impl RetryPolicy {
	/// Pause after the `attempt`-th failure; grows linearly and saturates.
	fn delay(&self, attempt: u32) -> Duration {
		self.backoff.saturating_mul(attempt)
	}

	pub fn run<T, F>(&self, mut op: F) -> Result<T, StoreError>
	where
		F: FnMut() -> Result<T, StoreError>,
	{
		let mut attempt = 1;
		loop {
			match op() {
				Err(e) if e.is_transient() && attempt < self.max_attempts => {
					log::warn!("Attempt {}/{} failed, retrying: {}", attempt, self.max_attempts, e);
					thread::sleep(self.delay(attempt));
					attempt += 1;
				},
				res => return res,
			}
		}
	}
}

/// Validates both accounts, checks `username` owns the sending one, then moves the money.
///
/// Nothing is written unless both accounts exist and hold `req.currency`.
pub fn create_transfer(
	store: &dyn Store,
	retry: &RetryPolicy,
	username: &str,
	req: &TransferRequest,
) -> Result<TransferTxResult, TransferError> {
	if req.from_account_id == req.to_account_id {
		return Err(StoreError::InvalidTransfer(format!(
			"cannot transfer from account [{}] to itself",
			req.from_account_id
		))
		.into());
	}

	let from_account = valid_account(store, req.from_account_id, &req.currency)?;
	if from_account.owner != username {
		return Err(TransferError::NotOwner(from_account.id));
	}
	valid_account(store, req.to_account_id, &req.currency)?;

	let params = req.params();
	Ok(retry.run(|| store.transfer_tx(params))?)
}
