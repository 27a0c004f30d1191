pub mod pages;
pub mod server;

pub use server::{router, serve, AppState, WebError};
