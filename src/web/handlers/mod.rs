pub mod admin_handlers;
pub mod analysis_handlers;
pub mod system_handlers;

pub use admin_handlers::*;
pub use analysis_handlers::*;
pub use system_handlers::*;
