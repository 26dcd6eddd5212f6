pub mod error;
pub mod gateway;
pub mod handlers;
pub mod listing;
pub mod notify;
pub mod payment;
pub mod policy;
pub mod scheduler;
