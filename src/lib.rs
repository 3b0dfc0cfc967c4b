//! # Gasless Relay
//!
//! A relay service that lets EIP-7702 delegated accounts execute calls without
//! holding native gas, by routing an ERC-4337 v0.7 user operation through a
//! sponsoring paymaster and a bundler.

pub mod bundler;
pub mod chains;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod rpc;
pub mod spawn;
pub mod storage;
pub mod types;
