//! Constant-Product AMM Core
//!
//! This library holds the transactional core of a two-token pool: the pool
//! ledger, constant-product swap pricing, and LP share issuance and
//! redemption. Token movements are delegated to a [`TokenCustody`].

pub mod amm;
pub mod constants;
pub mod custody;
pub mod errors;
pub mod liquidity;
pub mod state;
pub mod swap;
pub mod utils;

// Re-export for convenience
pub use amm::Amm;
pub use constants::*;
pub use custody::{
    CustodyEffect, CustodyError, CustodyJournal, Holding, MemoryCustody, TokenCustody,
};
pub use errors::ErrorCode;
pub use liquidity::{deposit_lp, initial_lp, withdraw_lp};
pub use state::{
    AmmConfig, DepositRequest, DepositResult, InitializeResult, Pool, PoolKey, PoolStatus,
    SwapRequest, SwapResult, TokenPair, WithdrawRequest, WithdrawResult,
};
pub use swap::quote;

#[cfg(test)]
mod proptest_properties;
