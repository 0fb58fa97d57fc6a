pub mod import;
pub mod nav;
