pub mod loader;

pub use loader::{LoadError, PageLoader, WebPageLoader};
