pub mod colon_listing;
pub mod gpg_backend;
