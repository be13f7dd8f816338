/// `PostgreSQL` embedded database functionality
pub mod embedded;


pub use embedded::*;
