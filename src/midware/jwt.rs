use crate::constants::{AUTHORIZATION, EMPTY, IGNORE_ROUTES, MESSAGE_INVALID_TOKEN};
use actix_service::forward_ready;
use actix_web::{
	body::EitherBody,
	dev::{Service, ServiceRequest, ServiceResponse, Transform},
	http::Method,
	Error as AxError, HttpMessage, HttpResponse,
};
use chrono::Utc;
use futures::future::{ok, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, encode, errors::Error, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
	pub iat: usize,
	pub exp: usize,
	/// Username of the authenticated user.
	pub sub: String,
}

#[derive(Serialize, Deserialize)]
pub struct ResponseBody {
	message: String,
	data: String,
}

impl ResponseBody {
	fn new(m: &str, d: &str) -> Self {
		Self { message: String::from(m), data: String::from(d) }
	}
}

/// Issues and checks access tokens for a username.
pub trait TokenMaker: Send + Sync {
	fn create_token(&self, username: &str) -> Result<String, Error>;
	fn verify_token(&self, token: &str) -> Result<Claims, Error>;
}

#[derive(Clone)]
pub struct JWT {
	secret: String,
	duration_secs: usize,
}

impl JWT {
	pub fn new(s: &str, duration_secs: u64) -> Self {
		Self { secret: s.to_string(), duration_secs: duration_secs as usize }
	}
}

impl TokenMaker for JWT {
	fn create_token(&self, username: &str) -> Result<String, Error> {
		let now = Utc::now().timestamp() as usize;
		let claims = Claims { iat: now, exp: now + self.duration_secs, sub: username.to_string() };
		debug!("Creating token for {}", claims.sub);
		encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_ref()))
	}

	fn verify_token(&self, token: &str) -> Result<Claims, Error> {
		decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_ref()), &Validation::default())
			.map(|data| data.claims)
	}
}

fn bearer_token(header: &str) -> Option<&str> {
	let (scheme, token) = header.split_once(' ')?;
	if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
		Some(token.trim())
	} else {
		None
	}
}

/// Rejects requests without a valid bearer token and stores the token's
/// [`Claims`] in the request extensions for the handlers.
pub struct Authentication {
	tokens: Arc<dyn TokenMaker>,
}

impl Authentication {
	pub fn new(tokens: Arc<dyn TokenMaker>) -> Self {
		Self { tokens }
	}
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
	S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = AxError>,
	S::Future: 'static,
	B: 'static,
{
	type Response = ServiceResponse<EitherBody<B>>;
	type Error = AxError;
	type InitError = ();
	type Transform = AuthenticationMiddleware<S>;
	type Future = Ready<Result<Self::Transform, Self::InitError>>;

	fn new_transform(&self, service: S) -> Self::Future {
		ok(AuthenticationMiddleware { tokens: self.tokens.clone(), service })
	}
}

pub struct AuthenticationMiddleware<S> {
	tokens: Arc<dyn TokenMaker>,
	service: S,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
	S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = AxError>,
	S::Future: 'static,
	B: 'static,
{
	type Response = ServiceResponse<EitherBody<B>>;
	type Error = AxError;
	type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

	forward_ready!(service);

	fn call(&self, req: ServiceRequest) -> Self::Future {
		let bypass = Method::OPTIONS == *req.method() ||
			IGNORE_ROUTES.iter().any(|route| req.path().starts_with(route));

		if !bypass {
			let claims = req
				.headers()
				.get(AUTHORIZATION)
				.and_then(|h| h.to_str().ok())
				.and_then(bearer_token)
				.map(|token| self.tokens.verify_token(token));

			match claims {
				Some(Ok(claims)) => {
					req.extensions_mut().insert(claims);
				},
				Some(Err(e)) => {
					warn!("Invalid token on {}: {:?}", req.path(), e);
					return unauthorized(req);
				},
				None => {
					debug!("Missing bearer token on {}", req.path());
					return unauthorized(req);
				},
			}
		}

		let res = self.service.call(req);

		Box::pin(async move { res.await.map(ServiceResponse::map_into_left_body) })
	}
}

fn unauthorized<B: 'static>(
	req: ServiceRequest,
) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, AxError>> {
	let (request, _pl) = req.into_parts();
	let response = HttpResponse::Unauthorized()
		.json(ResponseBody::new(MESSAGE_INVALID_TOKEN, EMPTY))
		.map_into_right_body();

	Box::pin(async { Ok(ServiceResponse::new(request, response)) })
}
