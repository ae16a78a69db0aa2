pub mod api;
pub mod health;
pub mod present;
pub mod session;
pub mod store;
