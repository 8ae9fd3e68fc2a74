use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Coarse classification callers use to decide between reporting and retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	NotFound,
	InvalidInput,
	ConstraintViolation,
	Transient,
	Fatal,
}

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("{entity} [{id}] not found")]
	NotFound { entity: &'static str, id: String },

	#[error("account [{account_id}] currency mismatch: {actual} vs {expected}")]
	CurrencyMismatch { account_id: i64, actual: String, expected: String },

	#[error("account [{account_id}] has insufficient funds: balance would become {balance}")]
	InsufficientFunds { account_id: i64, balance: i64 },

	#[error("invalid transfer: {0}")]
	InvalidTransfer(String),

	#[error("{context}: {source}")]
	Query {
		context: String,
		#[source]
		source: DieselError,
	},

	#[error("tx err: {cause}, rb err: {rollback}")]
	Rollback {
		cause: Box<StoreError>,
		#[source]
		rollback: DieselError,
	},

	#[error("connection pool error: {0}")]
	Pool(#[from] r2d2::Error),
}

impl StoreError {
	pub fn query(context: impl Into<String>, source: DieselError) -> Self {
		StoreError::Query { context: context.into(), source }
	}

	/// Like [`StoreError::query`] but turns a missing row into `NotFound`.
	pub fn lookup(entity: &'static str, id: impl ToString, source: DieselError) -> Self {
		match source {
			DieselError::NotFound => StoreError::NotFound { entity, id: id.to_string() },
			source => StoreError::query(format!("get {} [{}]", entity, id.to_string()), source),
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			StoreError::NotFound { .. } => ErrorKind::NotFound,
			StoreError::CurrencyMismatch { .. } |
			StoreError::InsufficientFunds { .. } |
			StoreError::InvalidTransfer(_) => ErrorKind::InvalidInput,
			StoreError::Query { source, .. } => classify(source),
			StoreError::Rollback { .. } => ErrorKind::Fatal,
			StoreError::Pool(_) => ErrorKind::Transient,
		}
	}

	pub fn is_transient(&self) -> bool {
		self.kind() == ErrorKind::Transient
	}
}

pub fn classify(err: &DieselError) -> ErrorKind {
	match err {
		DieselError::NotFound => ErrorKind::NotFound,
		DieselError::DatabaseError(kind, info) => match kind {
			DatabaseErrorKind::UniqueViolation |
			DatabaseErrorKind::ForeignKeyViolation |
			DatabaseErrorKind::NotNullViolation |
			DatabaseErrorKind::CheckViolation => ErrorKind::ConstraintViolation,
			DatabaseErrorKind::SerializationFailure |
			DatabaseErrorKind::ClosedConnection |
			DatabaseErrorKind::UnableToSendCommand => ErrorKind::Transient,
			_ if is_transient_message(info.message()) => ErrorKind::Transient,
			_ if is_out_of_range_message(info.message()) => ErrorKind::InvalidInput,
			_ => ErrorKind::Fatal,
		},
		_ => ErrorKind::Fatal,
	}
}

// postgres reports 40P01 and 57014 without a dedicated diesel kind
fn is_transient_message(message: &str) -> bool {
	message.contains("deadlock detected") ||
		message.contains("canceling statement due to statement timeout") ||
		message.contains("could not serialize access")
}

// 22003: a balance pushed past BIGINT
fn is_out_of_range_message(message: &str) -> bool {
	message.contains("out of range")
}
