pub mod hash_password;
pub mod protect;

pub use hash_password::HashPasswordHook;
pub use protect::ProtectHook;
