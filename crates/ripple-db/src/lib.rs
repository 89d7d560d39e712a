pub mod context;
pub mod dao;
pub mod error;
pub mod query;
pub mod reactive;
pub mod schema;
pub mod sink;
