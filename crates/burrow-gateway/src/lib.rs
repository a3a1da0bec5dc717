//! HTTP front end of the Burrow URL shortener.

pub mod app;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod model;
pub mod state;

pub use app::App;
pub use state::AppState;
