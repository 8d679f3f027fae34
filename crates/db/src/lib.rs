pub mod connection;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod schema;

pub use connection::*;
pub use memory::*;
pub use postgres::*;
pub use repository::*;
pub use schema::*;
