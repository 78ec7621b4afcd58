pub mod matrix;
pub mod session;
pub mod store;
pub mod sync;

pub use matrix::MatrixSession;
pub use session::{ChatSession, SessionError};
pub use store::SessionStore;
