use crate::{
	models::{Account, Entry, NewAccount, NewEntry, NewTransfer, NewUser, Transfer, User},
	schema::{accounts, entries, transfers, users},
};
use diesel::prelude::*;

/// Typed statements over the bank relations.
///
/// `Queries` borrows the connection it runs on, so inside a transaction every
/// statement goes through the transaction's own connection.
pub struct Queries<'c> {
	conn: &'c mut PgConnection,
}

impl<'c> Queries<'c> {
	pub fn new(conn: &'c mut PgConnection) -> Self {
		Self { conn }
	}

	pub fn create_user(&mut self, new_user: &NewUser) -> QueryResult<User> {
		diesel::insert_into(users::table)
			.values(new_user)
			.returning(User::as_returning())
			.get_result(self.conn)
	}

	pub fn get_user(&mut self, username: &str) -> QueryResult<User> {
		users::table.find(username).select(User::as_select()).first(self.conn)
	}

	pub fn create_account(&mut self, new_account: &NewAccount) -> QueryResult<Account> {
		diesel::insert_into(accounts::table)
			.values(new_account)
			.returning(Account::as_returning())
			.get_result(self.conn)
	}

	pub fn get_account(&mut self, id: i64) -> QueryResult<Account> {
		accounts::table.find(id).select(Account::as_select()).first(self.conn)
	}

	pub fn list_accounts(&mut self, owner: &str, limit: i64, offset: i64) -> QueryResult<Vec<Account>> {
		accounts::table
			.filter(accounts::owner.eq(owner))
			.order(accounts::id.asc())
			.limit(limit)
			.offset(offset)
			.select(Account::as_select())
			.load(self.conn)
	}

	/// `balance = balance + delta`, evaluated by the database under the row lock.
	pub fn add_account_balance(&mut self, id: i64, delta: i64) -> QueryResult<Account> {
		diesel::update(accounts::table.find(id))
			.set(accounts::balance.eq(accounts::balance + delta))
			.returning(Account::as_returning())
			.get_result(self.conn)
	}

	pub fn create_entry(&mut self, new_entry: &NewEntry) -> QueryResult<Entry> {
		diesel::insert_into(entries::table)
			.values(new_entry)
			.returning(Entry::as_returning())
			.get_result(self.conn)
	}

	pub fn get_entry(&mut self, id: i64) -> QueryResult<Entry> {
		entries::table.find(id).select(Entry::as_select()).first(self.conn)
	}

	pub fn list_entries(&mut self, account_id: i64, limit: i64, offset: i64) -> QueryResult<Vec<Entry>> {
		entries::table
			.filter(entries::account_id.eq(account_id))
			.order(entries::id.asc())
			.limit(limit)
			.offset(offset)
			.select(Entry::as_select())
			.load(self.conn)
	}

	pub fn create_transfer(&mut self, new_transfer: &NewTransfer) -> QueryResult<Transfer> {
		diesel::insert_into(transfers::table)
			.values(new_transfer)
			.returning(Transfer::as_returning())
			.get_result(self.conn)
	}

	pub fn get_transfer(&mut self, id: i64) -> QueryResult<Transfer> {
		transfers::table.find(id).select(Transfer::as_select()).first(self.conn)
	}

	pub fn list_transfers(
		&mut self,
		from_account_id: i64,
		to_account_id: i64,
		limit: i64,
		offset: i64,
	) -> QueryResult<Vec<Transfer>> {
		transfers::table
			.filter(
				transfers::from_account_id
					.eq(from_account_id)
					.or(transfers::to_account_id.eq(to_account_id)),
			)
			.order(transfers::id.asc())
			.limit(limit)
			.offset(offset)
			.select(Transfer::as_select())
			.load(self.conn)
	}
}
