pub mod shortener;

pub mod v1 {
    pub use crate::shortener::v1::*;
}
