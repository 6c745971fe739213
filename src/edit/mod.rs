pub mod editor;
pub mod query;
