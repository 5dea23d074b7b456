/// Kubernetes cluster operations
pub mod resources;
pub mod services;

pub use resources::ResourceManager;
pub use services::ServiceManager;
