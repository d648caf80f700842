pub mod config;
pub mod error;
pub mod feed_parser;
pub mod source_client;
