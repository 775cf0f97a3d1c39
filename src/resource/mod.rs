//! Resource types served by the `util` provider

pub mod indestructible;
