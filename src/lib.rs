mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod views;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod config;
mod constants;

mod cache {
    pub mod cache;
    pub mod catalog;
}
pub mod media {
    pub mod image;
}
pub mod reply;

pub use authentication::*;
pub use cache::cache::*;
pub use cache::catalog::*;
pub use constants::*;
pub use database::*;
