pub const AUTHORIZATION: &str = "Authorization";
pub const EMPTY: &str = "";
pub const MESSAGE_INVALID_TOKEN: &str = "Invalid token, please login again";

// Routes reachable without a bearer token
pub const IGNORE_ROUTES: [&str; 1] = ["/users"];

pub const SUPPORTED_CURRENCIES: [&str; 4] = ["USD", "EUR", "CAD", "SGD"];

pub const MIN_SECRET_KEY_LENGTH: usize = 32;
