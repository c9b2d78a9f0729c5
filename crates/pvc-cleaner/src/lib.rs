pub mod config;
pub mod domain;
pub mod platform;

pub use domain::CleanupJob;
pub use platform::k8s;
pub use platform::kube_client;
