use crate::handler::UserHandler;
use actix_web::web;

pub fn init(cfg: &mut web::ServiceConfig) {
	cfg
		// user mgmt routes
		.route("/users", web::post().to(UserHandler::create_user_handler))
		.route("/users/login", web::post().to(UserHandler::login_user_handler));
}
