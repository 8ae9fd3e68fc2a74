use crate::handler::AccountHandler;
use actix_web::web;

pub fn init(cfg: &mut web::ServiceConfig) {
	cfg.route("/accounts", web::post().to(AccountHandler::create_account_handler))
		.route("/accounts", web::get().to(AccountHandler::list_accounts_handler))
		.route("/accounts/{id}", web::get().to(AccountHandler::get_account_handler))
		// ledger of one account
		.route("/accounts/{id}/entries", web::get().to(AccountHandler::list_entries_handler))
		.route("/accounts/{id}/transfers", web::get().to(AccountHandler::list_transfers_handler));
}
