use crate::handler::TransferHandler;
use actix_web::web;

pub fn init(cfg: &mut web::ServiceConfig) {
	cfg.route("/transfers", web::post().to(TransferHandler::create_transfer_handler))
		.route("/transfers/{id}", web::get().to(TransferHandler::get_transfer_handler))
		.route("/entries/{id}", web::get().to(TransferHandler::get_entry_handler));
}
