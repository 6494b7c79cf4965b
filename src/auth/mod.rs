//! Authentication: password hashing, cookie sessions and the login gate.

pub mod gate;
pub mod password;
pub mod session;

pub use gate::{require_login, LoginRouterExt};
pub use password::{hash_password, verify_password, PasswordError};
pub use session::{session_middleware, Flash, FlashLevel, Session, SessionStore};
