/// Istio release handling and control plane installation
pub mod install;
pub mod release;

pub use install::{IstioInstaller, OperatorVars};
pub use release::IstioRelease;
