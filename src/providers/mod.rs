//! Catalog providers

pub mod animeunity;
pub mod vavoo;

pub use animeunity::AnimeUnity;
pub use vavoo::Vavoo;
