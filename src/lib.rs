pub mod clock;
pub mod config;
pub mod events;
pub mod logging;
pub mod presenter;
pub mod price;
pub mod proxy;
pub mod schedule;
