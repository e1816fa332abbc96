// Configuration
pub mod config;
pub mod service_config;

// Service modules
pub mod http_server;
pub mod process;
pub mod resolver;
pub mod service_state;

pub use config::AppConfig;
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
