pub mod config;
pub mod pipeline;
pub mod session;
pub mod web;
