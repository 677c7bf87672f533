pub mod agent;
pub mod condition;
pub mod error;
pub mod events;
pub mod experiment;
pub mod persist;
pub mod ring;
pub mod score;
pub mod session;
pub mod store;
pub mod summary;
pub mod window;
