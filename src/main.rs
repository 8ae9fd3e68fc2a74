mod account_routes;
mod config;
mod constants;
mod db;
mod error;
mod gate;
mod handler;
mod midware;
mod models;
mod repo;
mod schema;
mod store;
#[cfg(test)]
mod tests;
mod transfer;
mod transfer_routes;
mod user_routes;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use dotenv::dotenv;
use env_logger::Env;
use midware::jwt::{Authentication, TokenMaker, JWT};
use std::sync::Arc;
use store::{PgStore, Store};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
	dotenv().ok();
	env_logger::init_from_env(Env::default().default_filter_or("info"));

	let config = config::Config::parse();
	config.validate()?;

	let pool = db::get_db_pool(&config)?;
	db::init(&pool)?;

	let store: Arc<dyn Store> = Arc::new(PgStore::new(pool, config.transfer_policy()));
	let store = web::Data::from(store);
	let tokens: Arc<dyn TokenMaker> =
		Arc::new(JWT::new(&config.jwt_secret, config.access_token_duration_secs));
	let retry = web::Data::new(config.retry_policy());
	log::info!(
		"Listening on: {} (overdraft allowed: {}, transfer attempts: {})",
		config.socket_url,
		config.allow_negative_balance,
		config.transfer_max_attempts
	);

	HttpServer::new(move || {
		App::new()
			.app_data(store.clone())
			.app_data(web::Data::from(tokens.clone()))
			.app_data(retry.clone())
			.wrap(Authentication::new(tokens.clone()))
			.wrap(
				Cors::default()
					.allow_any_origin()
					.allow_any_method()
					.allow_any_header()
					.supports_credentials()
					.max_age(3600),
			)
			.wrap(actix_web::middleware::Logger::default())
			.configure(user_routes::init)
			.configure(account_routes::init)
			.configure(transfer_routes::init)
	})
	.workers(config.workers())
	.bind(&config.socket_url)?
	.run()
	.await?;

	Ok(())
}
