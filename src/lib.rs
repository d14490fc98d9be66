pub mod cache;
pub mod collection;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod gateway;
pub mod normalize;
pub mod output;
pub mod storage;
pub mod xml;
