use crate::{error::StoreError, models::Account, store::Store};

/// Loads the account and checks it holds `currency`.
pub fn valid_account(store: &dyn Store, account_id: i64, currency: &str) -> Result<Account, StoreError> {
	let account = store.get_account(account_id)?;
	if account.currency != currency {
		return Err(StoreError::CurrencyMismatch {
			account_id,
			actual: account.currency,
			expected: currency.to_string(),
		});
	}
	Ok(account)
}
