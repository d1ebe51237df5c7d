pub mod api;
pub mod auth;
pub mod google;
pub mod mutation;
pub mod overlap;
pub mod patch;
pub mod request;
pub mod service;
pub mod types;
pub mod window;

#[cfg(test)]
pub mod memory;

pub use service::CalendarService;
