pub mod backend;
pub mod key_details_loader;
