mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

pub mod api;
pub mod config;
pub mod fixtures;
pub mod media;
pub mod serializers;
pub mod shopping_list;
pub mod validation;

pub use authentication::*;
pub use constants::*;
pub use database::*;
