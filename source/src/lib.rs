//! Readers for Source Engine material assets.
//!
//! [`kv`] parses the KeyValues text that `.vmt` files are written in, [`vmt`] interprets a
//! parsed material into texture slots and scalar overrides, and [`vtf`] decodes `.vtf`
//! texture containers into flat RGBA buffers.

pub mod binaries;
pub mod kv;
pub mod prelude;
pub mod vmt;
pub mod vtf;
