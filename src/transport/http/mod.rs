pub mod router;
pub mod types;
pub mod handlers {
    pub mod admin;
    pub mod common;
    pub mod execute;
    pub mod health;
    pub mod interfaces;
    pub mod stats;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
