mod health;
mod internal;
mod url;
mod user;

pub use health::{health_handler, ping_handler};
pub use internal::stats_handler;
pub use url::{create_json_handler, create_plain_handler, create_batch_handler, redirect_handler};
pub use user::{delete_user_urls_handler, list_user_urls_handler};
