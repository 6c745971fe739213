pub mod dialect;
pub mod errors;
pub mod helpers;
pub mod schema;
