//! Financial Modeling Prep market-data client
//!
//! # Components
//! - `FmpClient`: REST client for daily gainers and company profiles
//!
//! # Source
//! - https://site.financialmodelingprep.com/developer/docs

mod client;

pub use client::FmpClient;
