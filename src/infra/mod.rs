pub mod auth;
pub mod catalog;
pub mod error;
#[cfg(test)]
pub mod memory;
pub mod mongo;
pub mod payload;
pub mod routes;
pub mod store;
pub mod users;
pub mod views;

pub use catalog::*;
pub use mongo::*;
pub use routes::*;
pub use store::Db;
pub use users::*;
