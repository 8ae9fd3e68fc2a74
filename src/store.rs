use crate::{
	db::DbPool,
	error::StoreError,
	models::{
		Account, Entry, NewAccount, NewEntry, NewTransfer, NewUser, Transfer, TransferTxParams,
		TransferTxResult, User,
	},
	repo::Queries,
};
use diesel::{
	connection::{AnsiTransactionManager, TransactionManager},
	PgConnection,
};

/// What the HTTP layer needs from persistence.
#[cfg_attr(test, mockall::automock)]
pub trait Store: Send + Sync {
	fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;
	fn get_user(&self, username: &str) -> Result<User, StoreError>;
	fn create_account(&self, new_account: NewAccount) -> Result<Account, StoreError>;
	fn get_account(&self, id: i64) -> Result<Account, StoreError>;
	fn list_accounts(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>, StoreError>;
	fn get_entry(&self, id: i64) -> Result<Entry, StoreError>;
	fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>, StoreError>;
	fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError>;
	/// Transfers where the account is on either side.
	fn list_transfers(
		&self,
		account_id: i64,
		limit: i64,
		offset: i64,
	) -> Result<Vec<Transfer>, StoreError>;
	fn transfer_tx(&self, params: TransferTxParams) -> Result<TransferTxResult, StoreError>;
}

/// Whether a transfer may leave the sending account below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
	pub allow_negative_balance: bool,
}

impl Default for TransferPolicy {
	fn default() -> Self {
		Self { allow_negative_balance: true }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
	pub account_id: i64,
	pub delta: i64,
}

/// The two balance updates of a transfer, smaller account id first.
///
/// Every transfer touching the same pair locks the rows in the same order, so
/// A->B and B->A running together can only wait on each other, never cycle.
pub fn balance_updates(params: &TransferTxParams) -> [BalanceUpdate; 2] {
	let debit = BalanceUpdate { account_id: params.from_account_id, delta: -params.amount };
	let credit = BalanceUpdate { account_id: params.to_account_id, delta: params.amount };
	if params.from_account_id < params.to_account_id {
		[debit, credit]
	} else {
		[credit, debit]
	}
}

fn check_params(params: &TransferTxParams) -> Result<(), StoreError> {
	if params.from_account_id == params.to_account_id {
		return Err(StoreError::InvalidTransfer(format!(
			"from and to account are both [{}]",
			params.from_account_id
		)));
	}
	if params.amount <= 0 {
		return Err(StoreError::InvalidTransfer(format!(
			"amount must be positive, got {}",
			params.amount
		)));
	}
	Ok(())
}

pub struct PgStore {
	pool: DbPool,
	policy: TransferPolicy,
}

impl PgStore {
	pub fn new(pool: DbPool, policy: TransferPolicy) -> Self {
		Self { pool, policy }
	}

	/// Runs `f` inside one database transaction.
	///
	/// Commits when `f` succeeds and rolls back when it fails. A failed rollback
	/// is returned together with the error that caused it.
	pub fn exec_tx<T, F>(&self, f: F) -> Result<T, StoreError>
	where
		F: FnOnce(&mut Queries<'_>) -> Result<T, StoreError>,
	{
		let mut pooled = self.pool.get()?;
		let conn: &mut PgConnection = &mut pooled;
		AnsiTransactionManager::begin_transaction(conn)
			.map_err(|e| StoreError::query("begin transaction", e))?;

		let outcome = f(&mut Queries::new(conn));

		match outcome {
			Ok(value) => {
				AnsiTransactionManager::commit_transaction(conn)
					.map_err(|e| StoreError::query("commit transaction", e))?;
				Ok(value)
			},
			Err(cause) => match AnsiTransactionManager::rollback_transaction(conn) {
				Ok(()) => Err(cause),
				Err(rollback) => {
					log::error!("Rollback failed after {}: {}", cause, rollback);
					Err(StoreError::Rollback { cause: Box::new(cause), rollback })
				},
			},
		}
	}

	/// Runs a read outside of an explicit transaction.
	fn with_queries<T, F>(&self, f: F) -> Result<T, StoreError>
	where
		F: FnOnce(&mut Queries<'_>) -> Result<T, StoreError>,
	{
		let mut pooled = self.pool.get()?;
		f(&mut Queries::new(&mut pooled))
	}
}

impl Store for PgStore {
	fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
		self.with_queries(|q| {
			q.create_user(&new_user)
				.map_err(|e| StoreError::query(format!("create user {}", new_user.username), e))
		})
	}

	fn get_user(&self, username: &str) -> Result<User, StoreError> {
		self.with_queries(|q| q.get_user(username).map_err(|e| StoreError::lookup("user", username, e)))
	}

	fn create_account(&self, new_account: NewAccount) -> Result<Account, StoreError> {
		self.with_queries(|q| {
			q.create_account(&new_account).map_err(|e| {
				StoreError::query(
					format!("create {} account for {}", new_account.currency, new_account.owner),
					e,
				)
			})
		})
	}

	fn get_account(&self, id: i64) -> Result<Account, StoreError> {
		self.with_queries(|q| q.get_account(id).map_err(|e| StoreError::lookup("account", id, e)))
	}

	fn list_accounts(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>, StoreError> {
		self.with_queries(|q| {
			q.list_accounts(owner, limit, offset)
				.map_err(|e| StoreError::query(format!("list accounts of {}", owner), e))
		})
	}

	fn get_entry(&self, id: i64) -> Result<Entry, StoreError> {
		self.with_queries(|q| q.get_entry(id).map_err(|e| StoreError::lookup("entry", id, e)))
	}

	fn list_entries(&self, account_id: i64, limit: i64, offset: i64) -> Result<Vec<Entry>, StoreError> {
		self.with_queries(|q| {
			q.list_entries(account_id, limit, offset).map_err(|e| {
				StoreError::query(format!("list entries of account [{}]", account_id), e)
			})
		})
	}

	fn get_transfer(&self, id: i64) -> Result<Transfer, StoreError> {
		self.with_queries(|q| q.get_transfer(id).map_err(|e| StoreError::lookup("transfer", id, e)))
	}

	fn list_transfers(
		&self,
		account_id: i64,
		limit: i64,
		offset: i64,
	) -> Result<Vec<Transfer>, StoreError> {
		self.with_queries(|q| {
			q.list_transfers(account_id, account_id, limit, offset).map_err(|e| {
				StoreError::query(format!("list transfers of account [{}]", account_id), e)
			})
		})
	}

	fn transfer_tx(&self, params: TransferTxParams) -> Result<TransferTxResult, StoreError> {
		check_params(&params)?;
		let policy = self.policy;
		let TransferTxParams { from_account_id, to_account_id, amount } = params;

		let result = self.exec_tx(|q| {
			let transfer = q
				.create_transfer(&NewTransfer { from_account_id, to_account_id, amount })
				.map_err(|e| {
					StoreError::query(
						format!("create transfer [{}] -> [{}]", from_account_id, to_account_id),
						e,
					)
				})?;

			let from_entry = q
				.create_entry(&NewEntry { account_id: from_account_id, amount: -amount })
				.map_err(|e| {
					StoreError::query(format!("create entry for account [{}]", from_account_id), e)
				})?;

			let to_entry = q
				.create_entry(&NewEntry { account_id: to_account_id, amount })
				.map_err(|e| {
					StoreError::query(format!("create entry for account [{}]", to_account_id), e)
				})?;

			let [first, second] = balance_updates(&params);
			let first_account = add_money(q, first)?;
			let second_account = add_money(q, second)?;
			let (from_account, to_account) = if first.account_id == from_account_id {
				(first_account, second_account)
			} else {
				(second_account, first_account)
			};

			if !policy.allow_negative_balance && from_account.balance < 0 {
				return Err(StoreError::InsufficientFunds {
					account_id: from_account.id,
					balance: from_account.balance,
				});
			}

			Ok(TransferTxResult { transfer, from_entry, to_entry, from_account, to_account })
		});

		match &result {
			Ok(res) => log::info!(
				"Transfer {} committed: {} from account [{}] to account [{}]",
				res.transfer.id,
				amount,
				from_account_id,
				to_account_id
			),
			Err(e) => log::warn!(
				"Transfer of {} from account [{}] to account [{}] rolled back: {}",
				amount,
				from_account_id,
				to_account_id,
				e
			),
		}
		result
	}
}

fn add_money(q: &mut Queries<'_>, update: BalanceUpdate) -> Result<Account, StoreError> {
	q.add_account_balance(update.account_id, update.delta).map_err(|e| {
		StoreError::query(format!("add {} to account [{}]", update.delta, update.account_id), e)
	})
}
