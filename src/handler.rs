use crate::{
	error::{ErrorKind, StoreError},
	midware::jwt::{Claims, TokenMaker},
	models::{
		ApiResponse, CreateAccountRequest, CreateUserRequest, Entry, PageRequest, LoginResp,
		LoginUserRequest, NewAccount, NewUser, Transfer, TransferRequest, UserResponse,
	},
	store::Store,
	transfer::{create_transfer, RetryPolicy, TransferError},
};
use actix_web::{http::StatusCode, web, HttpResponse, Responder, ResponseError};
use bcrypt::{hash, verify, DEFAULT_COST};
use serde::Serialize;
use validator::Validate;

impl ResponseError for StoreError {
	fn status_code(&self) -> StatusCode {
		match self.kind() {
			ErrorKind::NotFound => StatusCode::NOT_FOUND,
			ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
			ErrorKind::ConstraintViolation => StatusCode::FORBIDDEN,
			ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
			ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn error_response(&self) -> HttpResponse {
		let status = self.status_code();
		let message = if status.is_server_error() {
			log::error!("Store error: {}", self);
			status.canonical_reason().unwrap_or("Internal Server Error").to_string()
		} else {
			log::info!("Request rejected: {}", self);
			self.to_string()
		};
		HttpResponse::build(status).json(ApiResponse::<()>::failure(message))
	}
}

impl ResponseError for TransferError {
	fn status_code(&self) -> StatusCode {
		match self {
			TransferError::NotOwner(_) => StatusCode::UNAUTHORIZED,
			TransferError::Store(e) => e.status_code(),
		}
	}

	fn error_response(&self) -> HttpResponse {
		match self {
			TransferError::NotOwner(_) => {
				log::warn!("{}", self);
				HttpResponse::Unauthorized().json(ApiResponse::<()>::failure(self.to_string()))
			},
			TransferError::Store(e) => e.error_response(),
		}
	}
}

/// Runs blocking store work off the async workers.
async fn blocking<T, E, F>(f: F) -> Result<T, HttpResponse>
where
	F: FnOnce() -> Result<T, E> + Send + 'static,
	T: Send + 'static,
	E: ResponseError + Send + 'static,
{
	match web::block(f).await {
		Ok(res) => res.map_err(|e| e.error_response()),
		Err(e) => {
			log::error!("Blocking task failed: {:?}", e);
			Err(internal_error())
		},
	}
}

fn internal_error() -> HttpResponse {
	HttpResponse::InternalServerError().json(ApiResponse::<()>::failure("Internal Server Error"))
}

fn ok<T: Serialize>(data: T) -> HttpResponse {
	HttpResponse::Ok().json(ApiResponse::success(data))
}

fn bad_request(error: impl ToString) -> HttpResponse {
	HttpResponse::BadRequest().json(ApiResponse::<()>::failure(error.to_string()))
}

fn unauthorized(error: &str) -> HttpResponse {
	HttpResponse::Unauthorized().json(ApiResponse::<()>::failure(error))
}

/// Row offset of a page, or a 400 when it does not fit in an i64.
fn page_window(page: &PageRequest) -> Result<(i64, i64), HttpResponse> {
	(page.page_id - 1)
		.checked_mul(page.page_size)
		.map(|skip| (page.page_size, skip))
		.ok_or_else(|| bad_request(format!("page_id {} is out of range", page.page_id)))
}

pub struct UserHandler;

impl UserHandler {
	pub async fn create_user_handler(
		store: web::Data<dyn Store>,
		req: web::Json<CreateUserRequest>,
	) -> impl Responder {
		if let Err(e) = req.validate() {
			log::info!("Invalid user request: {}", e);
			return bad_request(e);
		}
		let req = req.into_inner();
		let store = store.into_inner();
		log::info!("Creating user {}", req.username);

		let password = req.password.clone();
		let hashed_password = match web::block(move || hash(password, DEFAULT_COST)).await {
			Ok(Ok(hashed)) => hashed,
			Ok(Err(e)) => {
				log::error!("Password hashing failed for {}: {}", req.username, e);
				return internal_error();
			},
			Err(e) => {
				log::error!("Blocking task failed: {:?}", e);
				return internal_error();
			},
		};

		let user = blocking(move || {
			store.create_user(NewUser {
				username: req.username,
				hashed_password,
				full_name: req.full_name,
				email: req.email,
			})
		})
		.await;

		match user {
			Ok(user) => ok(UserResponse::from(user)),
			Err(resp) => resp,
		}
	}

	pub async fn login_user_handler(
		store: web::Data<dyn Store>,
		tokens: web::Data<dyn TokenMaker>,
		req: web::Json<LoginUserRequest>,
	) -> impl Responder {
		if let Err(e) = req.validate() {
			return bad_request(e);
		}
		let req = req.into_inner();
		let store = store.into_inner();

		let login = blocking(move || {
			let user = store.get_user(&req.username)?;
			let matches = verify(req.password.as_bytes(), &user.hashed_password).unwrap_or(false);
			Ok::<_, StoreError>((user, matches))
		})
		.await;

		let (user, matches) = match login {
			Ok(login) => login,
			Err(resp) => return resp,
		};
		if !matches {
			log::warn!("Wrong password for user {}", user.username);
			return unauthorized("incorrect username or password");
		}

		match tokens.create_token(&user.username) {
			Ok(access_token) => {
				log::info!("Login successful for user {}", user.username);
				ok(LoginResp { access_token, user: UserResponse::from(user) })
			},
			Err(e) => {
				log::error!("Token creation error: {:?}", e);
				HttpResponse::InternalServerError()
					.json(ApiResponse::<()>::failure("Failed to create authentication token"))
			},
		}
	}
}

pub struct AccountHandler;

impl AccountHandler {
	pub async fn create_account_handler(
		store: web::Data<dyn Store>,
		claims: web::ReqData<Claims>,
		req: web::Json<CreateAccountRequest>,
	) -> impl Responder {
		if let Err(e) = req.validate() {
			return bad_request(e);
		}
		let new_account =
			NewAccount { owner: claims.sub.clone(), balance: 0, currency: req.into_inner().currency };
		let store = store.into_inner();

		match blocking(move || store.create_account(new_account)).await {
			Ok(account) => {
				log::info!("Account {} created for {}", account.id, account.owner);
				ok(account)
			},
			Err(resp) => resp,
		}
	}

	pub async fn get_account_handler(
		store: web::Data<dyn Store>,
		claims: web::ReqData<Claims>,
		path: web::Path<i64>,
	) -> impl Responder {
		let id = path.into_inner();
		if id < 1 {
			return bad_request(format!("invalid account id {}", id));
		}
		let store = store.into_inner();

		match blocking(move || store.get_account(id)).await {
			Ok(account) if account.owner != claims.sub => {
				unauthorized("account doesn't belong to the authenticated user")
			},
			Ok(account) => ok(account),
			Err(resp) => resp,
		}
	}

	pub async fn list_accounts_handler(
		store: web::Data<dyn Store>,
		claims: web::ReqData<Claims>,
		query: web::Query<PageRequest>,
	) -> impl Responder {
		if let Err(e) = query.validate() {
			return bad_request(e);
		}
		let owner = claims.sub.clone();
		let (limit, skip) = match page_window(&query) {
			Ok(window) => window,
			Err(resp) => return resp,
		};
		let store = store.into_inner();

		match blocking(move || store.list_accounts(&owner, limit, skip)).await {
			Ok(accounts) => ok(accounts),
			Err(resp) => resp,
		}
	}

	pub async fn list_entries_handler(
		store: web::Data<dyn Store>,
		claims: web::ReqData<Claims>,
		path: web::Path<i64>,
		query: web::Query<PageRequest>,
	) -> impl Responder {
		if let Err(e) = query.validate() {
			return bad_request(e);
		}
		let account_id = path.into_inner();
		let owner = claims.sub.clone();
		let (limit, skip) = match page_window(&query) {
			Ok(window) => window,
			Err(resp) => return resp,
		};
		let store = store.into_inner();

		let entries = blocking(move || -> Result<Option<Vec<Entry>>, StoreError> {
			let account = store.get_account(account_id)?;
			if account.owner != owner {
				return Ok(None);
			}
			store.list_entries(account_id, limit, skip).map(Some)
		})
		.await;

		match entries {
			Ok(Some(entries)) => ok(entries),
			Ok(None) => unauthorized("account doesn't belong to the authenticated user"),
			Err(resp) => resp,
		}
	}

	pub async fn list_transfers_handler(
		store: web::Data<dyn Store>,
		claims: web::ReqData<Claims>,
		path: web::Path<i64>,
		query: web::Query<PageRequest>,
	) -> impl Responder {
		if let Err(e) = query.validate() {
			return bad_request(e);
		}
		let account_id = path.into_inner();
		let owner = claims.sub.clone();
		let (limit, skip) = match page_window(&query) {
			Ok(window) => window,
			Err(resp) => return resp,
		};
		let store = store.into_inner();

		let transfers = blocking(move || -> Result<Option<Vec<Transfer>>, StoreError> {
			let account = store.get_account(account_id)?;
			if account.owner != owner {
				return Ok(None);
			}
			store.list_transfers(account_id, limit, skip).map(Some)
		})
		.await;

		match transfers {
			Ok(Some(transfers)) => ok(transfers),
			Ok(None) => unauthorized("account doesn't belong to the authenticated user"),
			Err(resp) => resp,
		}
	}
}

pub struct TransferHandler;

impl TransferHandler {
	pub async fn create_transfer_handler(
		store: web::Data<dyn Store>,
		retry: web::Data<RetryPolicy>,
		claims: web::ReqData<Claims>,
		req: web::Json<TransferRequest>,
	) -> impl Responder {
		if let Err(e) = req.validate() {
			log::info!("Invalid transfer request: {}", e);
			return bad_request(e);
		}
		let req = req.into_inner();
		let username = claims.sub.clone();
		let retry = *retry.get_ref();
		let store = store.into_inner();

		match blocking(move || create_transfer(&*store, &retry, &username, &req)).await {
			Ok(result) => ok(result),
			Err(resp) => resp,
		}
	}

	pub async fn get_transfer_handler(
		store: web::Data<dyn Store>,
		claims: web::ReqData<Claims>,
		path: web::Path<i64>,
	) -> impl Responder {
		let id = path.into_inner();
		let username = claims.sub.clone();
		let store = store.into_inner();

		let transfer = blocking(move || {
			let transfer = store.get_transfer(id)?;
			let owned = store.get_account(transfer.from_account_id)?.owner == username ||
				store.get_account(transfer.to_account_id)?.owner == username;
			Ok::<_, StoreError>((transfer, owned))
		})
		.await;

		match transfer {
			Ok((transfer, true)) => ok(transfer),
			Ok((_, false)) => unauthorized("transfer doesn't involve the authenticated user"),
			Err(resp) => resp,
		}
	}

	pub async fn get_entry_handler(
		store: web::Data<dyn Store>,
		claims: web::ReqData<Claims>,
		path: web::Path<i64>,
	) -> impl Responder {
		let id = path.into_inner();
		let username = claims.sub.clone();
		let store = store.into_inner();

		let entry = blocking(move || {
			let entry = store.get_entry(id)?;
			let owned = store.get_account(entry.account_id)?.owner == username;
			Ok::<_, StoreError>((entry, owned))
		})
		.await;

		match entry {
			Ok((entry, true)) => ok(entry),
			Ok((_, false)) => unauthorized("entry doesn't belong to the authenticated user"),
			Err(resp) => resp,
		}
	}
}
