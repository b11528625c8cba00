use anchor_lang::prelude::*;
use anchor_lang::solana_program::hash::hashv;

use crate::{
    custody::Holding, ErrorCode, AUTHORITY_SEED, DEFAULT_FEE_BPS, LP_MINT_SEED, MAX_FEE_BPS,
    POOL_SEED,
};

/// Pool parameters fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmmConfig {
    pub fee_bps: u16, // 10^4 = 100%
}

impl Default for AmmConfig {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
        }
    }
}

impl AmmConfig {
    pub fn new(fee_bps: u16) -> Result<Self> {
        let config = Self { fee_bps };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require!(self.fee_bps <= MAX_FEE_BPS, ErrorCode::InvalidFee);
        Ok(())
    }
}

/// Two token mints in canonical (byte-wise ascending) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenPair {
    pub token_a_mint: Pubkey,
    pub token_b_mint: Pubkey,
}

impl TokenPair {
    /// Orders `x` and `y` so that `(x, y)` and `(y, x)` give the same pair.
    pub fn new(x: Pubkey, y: Pubkey) -> Result<Self> {
        require!(x != y, ErrorCode::IdenticalMints);
        let (token_a_mint, token_b_mint) = if x.to_bytes() < y.to_bytes() {
            (x, y)
        } else {
            (y, x)
        };
        Ok(Self {
            token_a_mint,
            token_b_mint,
        })
    }

    /// `Some(true)` when `mint` is the A side, `Some(false)` for B.
    pub fn is_token_a(&self, mint: &Pubkey) -> Option<bool> {
        if *mint == self.token_a_mint {
            Some(true)
        } else if *mint == self.token_b_mint {
            Some(false)
        } else {
            None
        }
    }

    fn derive(&self, seed: &[u8]) -> [u8; 32] {
        hashv(&[
            seed,
            self.token_a_mint.as_ref(),
            self.token_b_mint.as_ref(),
        ])
        .to_bytes()
    }

    pub fn pool_key(&self) -> PoolKey {
        PoolKey(self.derive(POOL_SEED))
    }

    /// Owner of both vaults. Only the pool moves funds out of it.
    pub fn authority(&self) -> Pubkey {
        Pubkey::new_from_array(self.derive(AUTHORITY_SEED))
    }

    pub fn lp_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.derive(LP_MINT_SEED))
    }
}

/// Content address of a pool: sha256 over the seed and the canonical pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey(pub [u8; 32]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Active,
    Drained,
}

/// Ledger record for one pool.
///
/// Vault balances equal `reserve + fees` on each side after every committed
/// operation. Swap fees stay in the vault but are kept out of the reserves
/// until the next deposit or withdrawal folds them in for the LPs.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub token_a_mint: Pubkey,
    pub token_b_mint: Pubkey,
    pub authority: Pubkey,
    pub lp_mint: Pubkey,
    pub reserve_a: u64,
    pub reserve_b: u64,
    pub lp_supply: u64,
    pub fee_bps: u16,
    pub fees_a: u64,
    pub fees_b: u64,
}

impl Pool {
    pub fn new(pair: &TokenPair, config: &AmmConfig) -> Self {
        Self {
            token_a_mint: pair.token_a_mint,
            token_b_mint: pair.token_b_mint,
            authority: pair.authority(),
            lp_mint: pair.lp_mint(),
            reserve_a: 0,
            reserve_b: 0,
            lp_supply: 0,
            fee_bps: config.fee_bps,
            fees_a: 0,
            fees_b: 0,
        }
    }

    pub fn pair(&self) -> TokenPair {
        TokenPair {
            token_a_mint: self.token_a_mint,
            token_b_mint: self.token_b_mint,
        }
    }

    pub fn vault_a(&self) -> Holding {
        Holding::new(self.authority, self.token_a_mint)
    }

    pub fn vault_b(&self) -> Holding {
        Holding::new(self.authority, self.token_b_mint)
    }

    pub fn status(&self) -> PoolStatus {
        if self.lp_supply == 0 {
            PoolStatus::Drained
        } else {
            PoolStatus::Active
        }
    }

    /// Copy of the record with accrued fees moved into the reserves.
    pub fn with_fees_folded(&self) -> Result<Self> {
        let mut folded = self.clone();
        folded.reserve_a = self
            .reserve_a
            .checked_add(self.fees_a)
            .ok_or(ErrorCode::Overflow)?;
        folded.reserve_b = self
            .reserve_b
            .checked_add(self.fees_b)
            .ok_or(ErrorCode::Overflow)?;
        folded.fees_a = 0;
        folded.fees_b = 0;
        Ok(folded)
    }

    /// Serialized ledger record.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.serialize(&mut buf)
            .map_err(|_| anchor_lang::error::ErrorCode::AccountDidNotSerialize)?;
        Ok(buf)
    }

    pub fn unpack(mut data: &[u8]) -> Result<Self> {
        let pool = Self::deserialize(&mut data)
            .map_err(|_| anchor_lang::error::ErrorCode::AccountDidNotDeserialize)?;
        Ok(pool)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub amount_in: u64,
    pub minimum_out: u64,
    pub a_to_b: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRequest {
    pub amount_a_desired: u64,
    pub amount_b_desired: u64,
    pub minimum_lp_out: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub lp_amount_in: u64,
    pub minimum_a_out: u64,
    pub minimum_b_out: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeResult {
    pub amount_a: u64,
    pub amount_b: u64,
    pub lp_minted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapResult {
    /// Amount taken from the caller
    pub amount_in: u64,
    /// Portion of `amount_in` credited to the input reserve
    pub amount_in_after_fee: u64,
    /// Amount paid out of the opposite vault
    pub amount_out: u64,
    pub fee: u64,
    pub new_reserve_in: u64,
    pub new_reserve_out: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositResult {
    pub amount_a: u64,
    pub amount_b: u64,
    pub lp_minted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawResult {
    pub amount_a: u64,
    pub amount_b: u64,
    pub lp_burned: u64,
}
