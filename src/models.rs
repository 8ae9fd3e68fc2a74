use crate::{constants::SUPPORTED_CURRENCIES, schema::*};
use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
pub struct User {
	pub username: String,
	pub hashed_password: String,
	pub full_name: String,
	pub email: String,
	pub password_changed_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
pub struct NewUser {
	pub username: String,
	pub hashed_password: String,
	pub full_name: String,
	pub email: String,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(Pg))]
pub struct Account {
	pub id: i64,
	pub owner: String,
	pub balance: i64,
	pub currency: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
	pub owner: String,
	pub balance: i64,
	pub currency: String,
}

/// One signed balance movement against one account. Negative amounts are debits.
#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = entries)]
#[diesel(check_for_backend(Pg))]
pub struct Entry {
	pub id: i64,
	pub account_id: i64,
	pub amount: i64,
	pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, Copy, PartialEq)]
#[diesel(table_name = entries)]
pub struct NewEntry {
	pub account_id: i64,
	pub amount: i64,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = transfers)]
#[diesel(check_for_backend(Pg))]
pub struct Transfer {
	pub id: i64,
	pub from_account_id: i64,
	pub to_account_id: i64,
	pub amount: i64,
	pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, Copy, PartialEq)]
#[diesel(table_name = transfers)]
pub struct NewTransfer {
	pub from_account_id: i64,
	pub to_account_id: i64,
	pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxParams {
	pub from_account_id: i64,
	pub to_account_id: i64,
	pub amount: i64,
}

/// Everything a committed transfer produced, in the caller's from/to orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferTxResult {
	pub transfer: Transfer,
	pub from_entry: Entry,
	pub to_entry: Entry,
	pub from_account: Account,
	pub to_account: Account,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
	#[validate(length(min = 1, max = 255), custom(function = "validate_username"))]
	pub username: String,
	#[validate(length(min = 6))]
	pub password: String,
	#[validate(length(min = 1, max = 255))]
	pub full_name: String,
	#[validate(email)]
	pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserResponse {
	pub username: String,
	pub full_name: String,
	pub email: String,
	pub password_changed_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
	fn from(user: User) -> Self {
		Self {
			username: user.username,
			full_name: user.full_name,
			email: user.email,
			password_changed_at: user.password_changed_at,
			created_at: user.created_at,
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginUserRequest {
	#[validate(length(min = 1), custom(function = "validate_username"))]
	pub username: String,
	#[validate(length(min = 6))]
	pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResp {
	pub access_token: String,
	pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateAccountRequest {
	#[validate(custom(function = "validate_currency"))]
	pub currency: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PageRequest {
	#[validate(range(min = 1))]
	pub page_id: i64,
	#[validate(range(min = 5, max = 10))]
	pub page_size: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TransferRequest {
	#[validate(range(min = 1))]
	pub from_account_id: i64,
	#[validate(range(min = 1))]
	pub to_account_id: i64,
	#[validate(custom(function = "validate_currency"))]
	pub currency: String,
	#[validate(range(min = 1))]
	pub amount: i64,
}

impl TransferRequest {
	pub fn params(&self) -> TransferTxParams {
		TransferTxParams {
			from_account_id: self.from_account_id,
			to_account_id: self.to_account_id,
			amount: self.amount,
		}
	}
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
	pub status: String,
	pub data: Option<T>,
	pub error: Option<String>,
}

impl<T> ApiResponse<T> {
	pub fn success(data: T) -> Self {
		Self { status: "success".to_string(), data: Some(data), error: None }
	}

	pub fn failure(error: impl Into<String>) -> Self {
		Self { status: "error".to_string(), data: None, error: Some(error.into()) }
	}
}

pub fn validate_currency(currency: &str) -> Result<(), ValidationError> {
	if SUPPORTED_CURRENCIES.contains(&currency) {
		Ok(())
	} else {
		Err(ValidationError::new("unsupported_currency"))
	}
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
		Ok(())
	} else {
		Err(ValidationError::new("invalid_username"))
	}
}
