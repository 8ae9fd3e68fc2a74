//! Runs against the PostgreSQL at `DATABASE_URL`:
//! `cargo test -- --ignored`

use crate::{
	config::Config,
	db::{self, DbPool},
	error::{ErrorKind, StoreError},
	models::{Account, NewEntry, NewTransfer, TransferTxParams},
	store::{PgStore, Store, TransferPolicy},
	tests::fixtures::{random_currency, random_money, TestFixtures},
};
use clap::Parser;
use dotenv::dotenv;
use std::{collections::HashSet, thread};

fn test_pool() -> DbPool {
	dotenv().ok();
	let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
	let config = Config::try_parse_from([
		"simple-bank",
		"--database-url",
		database_url.as_str(),
		"--jwt-secret",
		"test-secret-0123456789abcdef0123",
		"--pool-size",
		"16",
	])
	.expect("test config");
	let pool = db::get_db_pool(&config).expect("pool");
	db::init(&pool).expect("migrations");
	pool
}

fn test_store() -> PgStore {
	PgStore::new(test_pool(), TransferPolicy::default())
}

fn create_account(store: &PgStore, balance: i64, currency: &str) -> Account {
	let user = store.create_user(TestFixtures::random_new_user()).expect("user");
	let account = store
		.create_account(TestFixtures::new_account(&user.username, balance, currency))
		.expect("account");
	assert_eq!(account.owner, user.username);
	assert_eq!(account.balance, balance);
	assert!(account.id > 0);
	account
}

fn create_random_account(store: &PgStore) -> Account {
	create_account(store, random_money(), &random_currency())
}

fn transfer(from: i64, to: i64, amount: i64) -> TransferTxParams {
	TransferTxParams { from_account_id: from, to_account_id: to, amount }
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_get_account() {
	let store = test_store();
	let account = create_random_account(&store);
	let fetched = store.get_account(account.id).unwrap();
	assert_eq!(fetched.id, account.id);
	assert_eq!(fetched.owner, account.owner);
	assert_eq!(fetched.balance, account.balance);
	assert_eq!(fetched.currency, account.currency);
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_missing_rows_are_not_found() {
	let store = test_store();
	assert_eq!(store.get_account(i64::MAX).unwrap_err().kind(), ErrorKind::NotFound);
	assert_eq!(store.get_entry(i64::MAX).unwrap_err().kind(), ErrorKind::NotFound);
	assert_eq!(store.get_transfer(i64::MAX).unwrap_err().kind(), ErrorKind::NotFound);
	assert_eq!(store.get_user("no_such_user_x").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_owner_currency_is_unique() {
	let store = test_store();
	let account = create_account(&store, 0, "USD");
	let err = store
		.create_account(TestFixtures::new_account(&account.owner, 0, "USD"))
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_transfer_tx() {
	let store = test_store();
	let from_account = create_random_account(&store);
	let to_account = create_random_account(&store);
	let n = 5;
	let amount = 10;

	let results: Vec<_> = thread::scope(|s| {
		let handles: Vec<_> = (0..n)
			.map(|_| s.spawn(|| store.transfer_tx(transfer(from_account.id, to_account.id, amount))))
			.collect();
		handles.into_iter().map(|h| h.join().expect("transfer thread")).collect()
	});

	let mut existed = HashSet::new();
	for result in results {
		let result = result.expect("transfer");

		let t = &result.transfer;
		assert_eq!(t.from_account_id, from_account.id);
		assert_eq!(t.to_account_id, to_account.id);
		assert_eq!(t.amount, amount);
		assert!(t.id > 0);
		assert_eq!(store.get_transfer(t.id).unwrap(), *t);

		let from_entry = &result.from_entry;
		assert_eq!(from_entry.account_id, from_account.id);
		assert_eq!(from_entry.amount, -amount);
		assert_eq!(store.get_entry(from_entry.id).unwrap(), *from_entry);

		let to_entry = &result.to_entry;
		assert_eq!(to_entry.account_id, to_account.id);
		assert_eq!(to_entry.amount, amount);
		assert_eq!(store.get_entry(to_entry.id).unwrap(), *to_entry);

		assert_eq!(result.from_account.id, from_account.id);
		assert_eq!(result.to_account.id, to_account.id);

		// every transfer sees a distinct number of prior transfers applied
		let diff1 = from_account.balance - result.from_account.balance;
		let diff2 = result.to_account.balance - to_account.balance;
		assert_eq!(diff1, diff2);
		assert!(diff1 > 0);
		assert_eq!(diff1 % amount, 0);
		let k = diff1 / amount;
		assert!(k >= 1 && k <= n);
		assert!(existed.insert(k), "balance step {} seen twice", k);
	}

	let updated_from = store.get_account(from_account.id).unwrap();
	let updated_to = store.get_account(to_account.id).unwrap();
	assert_eq!(updated_from.balance, from_account.balance - n * amount);
	assert_eq!(updated_to.balance, to_account.balance + n * amount);
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_transfer_tx_deadlock() {
	let store = test_store();
	let account1 = create_random_account(&store);
	let account2 = create_random_account(&store);
	let n = 10;
	let amount = 10;

	let results: Vec<_> = thread::scope(|s| {
		let handles: Vec<_> = (0..n)
			.map(|i| {
				let params = if i % 2 == 0 {
					transfer(account1.id, account2.id, amount)
				} else {
					transfer(account2.id, account1.id, amount)
				};
				let store = &store;
				s.spawn(move || store.transfer_tx(params))
			})
			.collect();
		handles.into_iter().map(|h| h.join().expect("transfer thread")).collect()
	});

	for result in results {
		result.expect("transfer must not deadlock");
	}

	assert_eq!(store.get_account(account1.id).unwrap().balance, account1.balance);
	assert_eq!(store.get_account(account2.id).unwrap().balance, account2.balance);
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_concurrent_transfers_build_ledger() {
	let store = test_store();
	let a = create_account(&store, 100, "USD");
	let b = create_account(&store, 50, "USD");

	thread::scope(|s| {
		let handles: Vec<_> =
			(0..5).map(|_| s.spawn(|| store.transfer_tx(transfer(a.id, b.id, 10)))).collect();
		for h in handles {
			h.join().expect("transfer thread").expect("transfer");
		}
	});

	assert_eq!(store.get_account(a.id).unwrap().balance, 50);
	assert_eq!(store.get_account(b.id).unwrap().balance, 100);

	let a_entries = store.list_entries(a.id, 10, 0).unwrap();
	assert_eq!(a_entries.len(), 5);
	assert!(a_entries.iter().all(|e| e.amount == -10));
	let b_entries = store.list_entries(b.id, 10, 0).unwrap();
	assert_eq!(b_entries.len(), 5);
	assert!(b_entries.iter().all(|e| e.amount == 10));

	let transfers = store.list_transfers(a.id, 10, 0).unwrap();
	assert_eq!(transfers.len(), 5);
	assert!(transfers.iter().all(|t| t.from_account_id == a.id && t.to_account_id == b.id));
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_transfer_to_missing_account_writes_nothing() {
	let store = test_store();
	let from = create_random_account(&store);

	let err = store.transfer_tx(transfer(from.id, i64::MAX, 10)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

	assert_eq!(store.get_account(from.id).unwrap().balance, from.balance);
	assert!(store.list_entries(from.id, 10, 0).unwrap().is_empty());
	assert!(store.list_transfers(from.id, 10, 0).unwrap().is_empty());
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_overdraft_policy_rolls_back_every_write() {
	let pool = test_pool();
	let store = PgStore::new(pool, TransferPolicy { allow_negative_balance: false });
	let from = create_account(&store, 30, "USD");
	let to = create_account(&store, 0, "USD");

	let err = store.transfer_tx(transfer(from.id, to.id, 40)).unwrap_err();
	assert!(matches!(err, StoreError::InsufficientFunds { account_id, .. } if account_id == from.id));

	assert_eq!(store.get_account(from.id).unwrap().balance, 30);
	assert_eq!(store.get_account(to.id).unwrap().balance, 0);
	assert!(store.list_entries(from.id, 10, 0).unwrap().is_empty());
	assert!(store.list_entries(to.id, 10, 0).unwrap().is_empty());
	assert!(store.list_transfers(from.id, 10, 0).unwrap().is_empty());

	let ok = store.transfer_tx(transfer(from.id, to.id, 30)).unwrap();
	assert_eq!(ok.from_account.balance, 0);
	assert_eq!(ok.to_account.balance, 30);
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_balance_overflow_is_rejected_and_rolled_back() {
	let store = test_store();
	let from = create_account(&store, 100, "USD");
	let to = create_account(&store, i64::MAX - 5, "USD");

	let err = store.transfer_tx(transfer(from.id, to.id, 10)).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::InvalidInput);

	assert_eq!(store.get_account(from.id).unwrap().balance, 100);
	assert_eq!(store.get_account(to.id).unwrap().balance, i64::MAX - 5);
	assert!(store.list_entries(from.id, 10, 0).unwrap().is_empty());
	assert!(store.list_transfers(to.id, 10, 0).unwrap().is_empty());
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_exec_tx_rolls_back_on_error() {
	let store = test_store();
	let from = create_random_account(&store);
	let to = create_random_account(&store);

	let res: Result<(), StoreError> = store.exec_tx(|q| {
		q.create_transfer(&NewTransfer {
			from_account_id: from.id,
			to_account_id: to.id,
			amount: 5,
		})
		.map_err(|e| StoreError::query("create transfer", e))?;
		q.create_entry(&NewEntry { account_id: from.id, amount: -5 })
			.map_err(|e| StoreError::query("create entry", e))?;
		q.add_account_balance(from.id, -5).map_err(|e| StoreError::query("add balance", e))?;
		Err(StoreError::InvalidTransfer("abort".to_string()))
	});
	assert!(matches!(res, Err(StoreError::InvalidTransfer(_))));

	assert_eq!(store.get_account(from.id).unwrap().balance, from.balance);
	assert!(store.list_entries(from.id, 10, 0).unwrap().is_empty());
	assert!(store.list_transfers(from.id, 10, 0).unwrap().is_empty());
}

#[test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
fn test_exec_tx_commits_on_success() {
	let store = test_store();
	let account = create_random_account(&store);

	let entry = store
		.exec_tx(|q| {
			let entry = q
				.create_entry(&NewEntry { account_id: account.id, amount: 25 })
				.map_err(|e| StoreError::query("create entry", e))?;
			q.add_account_balance(account.id, 25).map_err(|e| StoreError::query("add balance", e))?;
			Ok(entry)
		})
		.unwrap();

	assert_eq!(store.get_entry(entry.id).unwrap(), entry);
	assert_eq!(store.get_account(account.id).unwrap().balance, account.balance + 25);
}
