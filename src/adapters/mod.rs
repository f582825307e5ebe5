pub mod cipher;
pub mod loaders;
