// Domain-layer modules and shared errors/models
pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod enrichment {
    pub use crate::enrichment::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod query_parser {
    pub use crate::query_parser::*;
}

pub mod brand_filter {
    pub use crate::brand_filter::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
