mod config;
pub(crate) use config::*;
mod database;
pub(crate) use database::*;
mod tera;
pub(crate) use tera::*;
