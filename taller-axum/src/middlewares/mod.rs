pub mod preflight;

pub use preflight::PreflightLayer;
