pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod service;

pub use bootstrap::{Backends, init_backends, seed_identity};
pub use cache::{STUDENTS_KEY, StudentCache};
pub use config::{AppConfig, CacheConfig, ServerConfig, StorageBackend};
pub use observability::init_tracing;
pub use server::{AppState, ServerBuilder, StudentDeskServer, build_app};
pub use service::StudentService;
