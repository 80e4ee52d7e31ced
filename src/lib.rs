pub mod error;

pub mod config;
pub mod issuer;
pub mod profile;
pub mod section;
pub mod session;

pub mod cli;
pub mod cmd;

#[cfg(test)]
pub(crate) mod dev;
