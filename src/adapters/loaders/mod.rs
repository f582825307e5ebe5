pub mod uid_loader;
