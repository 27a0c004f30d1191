pub mod handlers;
pub mod session;

pub use handlers::{ActionError, Download, Handlers};
pub use session::{DownloadFlags, SessionId, SessionState, SessionStore};
