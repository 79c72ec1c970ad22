//! External service integrations.

pub mod accessors {
    pub use crate::accessors::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod page_cache {
    pub use crate::page_cache::*;
}
