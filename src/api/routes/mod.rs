pub mod ask;
pub mod root;
