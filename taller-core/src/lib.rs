//! taller-core: transport-agnostic core of the workshop backend.
//!
//! Services are registered by name on a [`TallerApp`], run through a hook
//! pipeline, and always receive a [`TenantContext`] derived from a verified
//! credential.

pub mod app;
pub mod config;
pub mod errors;
pub mod hooks;
pub mod params;
pub mod registry;
pub mod service;
pub mod tenant;

pub use app::{ServiceHandle, TallerApp};
pub use config::{TallerConfig, TallerConfigSnapshot};
pub use errors::{ErrorKind, TallerError, TallerResult};
pub use hooks::{HookContext, HookResult, ServiceHooks, TallerAfterHook, TallerBeforeHook, TallerErrorHook};
pub use params::RequestParams;
pub use registry::TallerServiceRegistry;
pub use service::{ServiceCapabilities, ServiceMethodKind, TallerService};
pub use tenant::{Principal, TenantContext, TenantId};
