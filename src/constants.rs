/// Fee denominator: fees are expressed in basis points of the input amount.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fee applied when a pool is created without an explicit config (0.30%).
pub const DEFAULT_FEE_BPS: u16 = 30;

/// Highest fee a pool may be created with (10%).
pub const MAX_FEE_BPS: u16 = 1_000;

pub const POOL_SEED: &[u8] = b"pool";
pub const AUTHORITY_SEED: &[u8] = b"authority";
pub const LP_MINT_SEED: &[u8] = b"lp_mint";
