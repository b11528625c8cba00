use anchor_lang::prelude::error_code;

#[error_code]
pub enum ErrorCode {
    #[msg("Pool already initialized")]
    AlreadyInitialized,
    #[msg("Token mints must differ")]
    IdenticalMints,
    #[msg("Invalid amount")]
    InvalidAmount,
    #[msg("Slippage tolerance exceeded")]
    SlippageExceeded,
    #[msg("Output rounds to zero")]
    InsufficientOutput,
    #[msg("Math overflow")]
    Overflow,
    #[msg("Pool not found")]
    PoolNotFound,
    #[msg("Pool does not hold enough liquidity")]
    InsufficientLiquidity,
    #[msg("Fee exceeds the allowed maximum")]
    InvalidFee,
}
