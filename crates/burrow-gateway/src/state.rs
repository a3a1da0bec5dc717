use std::sync::Arc;

use burrow_core::{Shortener, TrustedSubnet};

#[derive(Clone)]
pub struct AppState {
    pub(crate) shortener: Arc<dyn Shortener>,
    pub(crate) trusted_subnet: Option<TrustedSubnet>,
}

impl AppState {
    pub fn new(shortener: Arc<dyn Shortener>, trusted_subnet: Option<TrustedSubnet>) -> Self {
        Self {
            shortener,
            trusted_subnet,
        }
    }
}
