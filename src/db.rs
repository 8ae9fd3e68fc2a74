use crate::config::Config;
use diesel::{
	prelude::*,
	r2d2::{self, ConnectionManager, CustomizeConnection},
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Bounds how long any statement may block, so a stuck transfer is aborted by
/// the server and its transaction rolled back instead of being left open.
#[derive(Debug, Clone, Copy)]
struct StatementTimeout {
	millis: u64,
}

impl CustomizeConnection<PgConnection, r2d2::Error> for StatementTimeout {
	fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), r2d2::Error> {
		diesel::sql_query(format!("SET statement_timeout = {}", self.millis))
			.execute(conn)
			.map(|_| ())
			.map_err(r2d2::Error::QueryError)
	}
}

pub fn get_db_pool(config: &Config) -> Result<DbPool, r2d2::PoolError> {
	let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
	r2d2::Pool::builder()
		.max_size(config.pool_size)
		.connection_timeout(Duration::from_secs(config.connection_timeout_secs))
		.connection_customizer(Box::new(StatementTimeout { millis: config.statement_timeout_ms }))
		.build(manager)
}

pub fn init(pool: &DbPool) -> anyhow::Result<()> {
	let mut conn = pool.get()?;
	let applied = conn
		.run_pending_migrations(MIGRATIONS)
		.map_err(|e| anyhow::anyhow!("failed to run migrations: {}", e))?;
	for migration in applied {
		log::info!("Applied migration {}", migration);
	}
	Ok(())
}
