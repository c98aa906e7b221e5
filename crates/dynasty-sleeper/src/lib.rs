// Sleeper public API client implementing the league-data provider contract.

pub mod client;
pub mod wire;

pub use client::SleeperClient;
