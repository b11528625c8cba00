//! Pool registry and the four state-changing entry points.
//!
//! Every operation follows the same shape: lock the pool, price the request
//! against the locked ledger, build the next ledger record with checked
//! arithmetic, hand the custody effects over as one all-or-nothing batch,
//! and only then store the next record. Any failure before the store leaves
//! the ledger exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;

use anchor_lang::prelude::*;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::{
    custody::{CustodyEffect, Holding, TokenCustody},
    liquidity::{initial_lp, quote_deposit, quote_withdraw},
    state::{
        AmmConfig, DepositRequest, DepositResult, InitializeResult, Pool, PoolKey, SwapRequest,
        SwapResult, TokenPair, WithdrawRequest, WithdrawResult,
    },
    swap::quote,
    ErrorCode,
};

/// Registry slot. `None` while the pool is still being seeded.
type PoolSlot = Arc<Mutex<Option<Pool>>>;

/// All pools served by one custody backend.
///
/// Pools are independent: each sits behind its own mutex, so operations on
/// different pools run in parallel while operations on the same pool are
/// serialized. The registry lock is only held to look a slot up or to claim
/// one; custody work always happens outside it.
pub struct Amm<C: TokenCustody> {
    custody: C,
    pools: RwLock<HashMap<PoolKey, PoolSlot>>,
}

impl<C: TokenCustody> Amm<C> {
    pub fn new(custody: C) -> Self {
        Self {
            custody,
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    fn slot(&self, pair: &TokenPair) -> Option<PoolSlot> {
        self.pools.read().get(&pair.pool_key()).cloned()
    }

    /// Snapshot of the pool ledger for `pair`.
    pub fn pool(&self, pair: &TokenPair) -> Option<Pool> {
        let slot = self.slot(pair)?;
        let pool = slot.lock().clone();
        pool
    }

    /// Registered pools, counting ones still being seeded.
    pub fn pool_count(&self) -> usize {
        self.pools.read().len()
    }

    /// Runs `op` inside the pool's exclusive section and hands the lock over
    /// fairly on the way out.
    fn with_pool<T, F>(&self, pair: &TokenPair, op: F) -> Result<T>
    where
        F: FnOnce(&mut Pool) -> Result<T>,
    {
        let slot = self.slot(pair).ok_or(ErrorCode::PoolNotFound)?;
        let mut guard = slot.lock();
        let outcome = match &mut *guard {
            Some(pool) => op(pool),
            None => Err(ErrorCode::PoolNotFound.into()),
        };
        MutexGuard::unlock_fair(guard);
        outcome
    }

    /// Creates the pool for `(mint_x, mint_y)` in canonical order and seeds
    /// it from `creator`'s holdings. The creator receives
    /// `floor(sqrt(amount_a * amount_b))` shares.
    pub fn initialize_pool(
        &self,
        creator: &Pubkey,
        mint_x: Pubkey,
        amount_x: u64,
        mint_y: Pubkey,
        amount_y: u64,
        config: AmmConfig,
    ) -> Result<InitializeResult> {
        let pair = TokenPair::new(mint_x, mint_y)?;
        config.validate()?;
        let (amount_a, amount_b) = if pair.token_a_mint == mint_x {
            (amount_x, amount_y)
        } else {
            (amount_y, amount_x)
        };
        let lp_minted = initial_lp(amount_a, amount_b)?;

        // Claim the slot, locked and empty, then let go of the registry.
        let key = pair.pool_key();
        let slot: PoolSlot = Arc::new(Mutex::new(None));
        let mut guard = slot.lock();
        {
            let mut pools = self.pools.write();
            require!(!pools.contains_key(&key), ErrorCode::AlreadyInitialized);
            pools.insert(key, Arc::clone(&slot));
        }

        let mut pool = Pool::new(&pair, &config);
        let seeded = self.custody.apply(&[
            CustodyEffect::Transfer {
                from: Holding::new(*creator, pair.token_a_mint),
                to: pool.vault_a(),
                amount: amount_a,
            },
            CustodyEffect::Transfer {
                from: Holding::new(*creator, pair.token_b_mint),
                to: pool.vault_b(),
                amount: amount_b,
            },
            CustodyEffect::Mint {
                lp_mint: pool.lp_mint,
                holder: *creator,
                amount: lp_minted,
            },
        ]);
        if let Err(e) = seeded {
            self.pools.write().remove(&key);
            MutexGuard::unlock_fair(guard);
            return Err(e);
        }

        pool.reserve_a = amount_a;
        pool.reserve_b = amount_b;
        pool.lp_supply = lp_minted;
        *guard = Some(pool);
        MutexGuard::unlock_fair(guard);

        msg!(
            "Pool initialized: reserves ({}, {}), fee {} bps, {} LP minted",
            amount_a,
            amount_b,
            config.fee_bps,
            lp_minted
        );
        Ok(InitializeResult {
            amount_a,
            amount_b,
            lp_minted,
        })
    }

    /// Prices a swap without touching any balance.
    pub fn quote_swap(&self, pair: &TokenPair, request: &SwapRequest) -> Result<SwapResult> {
        self.with_pool(pair, |pool| quote(pool, request))
    }

    /// Sells `request.amount_in` of the input side for at least
    /// `request.minimum_out` of the other side.
    pub fn swap(
        &self,
        trader: &Pubkey,
        pair: &TokenPair,
        request: SwapRequest,
    ) -> Result<SwapResult> {
        self.with_pool(pair, |pool| {
            let result = quote(pool, &request)?;

            let mut next = pool.clone();
            let (vault_in, vault_out) = if request.a_to_b {
                next.reserve_a = result.new_reserve_in;
                next.reserve_b = result.new_reserve_out;
                next.fees_a = next
                    .fees_a
                    .checked_add(result.fee)
                    .ok_or(ErrorCode::Overflow)?;
                (pool.vault_a(), pool.vault_b())
            } else {
                next.reserve_b = result.new_reserve_in;
                next.reserve_a = result.new_reserve_out;
                next.fees_b = next
                    .fees_b
                    .checked_add(result.fee)
                    .ok_or(ErrorCode::Overflow)?;
                (pool.vault_b(), pool.vault_a())
            };

            self.custody.apply(&[
                CustodyEffect::Transfer {
                    from: Holding::new(*trader, vault_in.mint),
                    to: vault_in,
                    amount: result.amount_in,
                },
                CustodyEffect::Transfer {
                    from: vault_out,
                    to: Holding::new(*trader, vault_out.mint),
                    amount: result.amount_out,
                },
            ])?;

            *pool = next;
            msg!(
                "Swap {}: in {} (fee {}), out {}",
                if request.a_to_b { "A->B" } else { "B->A" },
                result.amount_in,
                result.fee,
                result.amount_out
            );
            Ok(result)
        })
    }

    /// Deposits both tokens at the pool's current ratio and mints shares.
    ///
    /// Only the ratio-matched part of the desired amounts is taken. Accrued
    /// swap fees are folded into the reserves first.
    pub fn add_liquidity(
        &self,
        provider: &Pubkey,
        pair: &TokenPair,
        request: DepositRequest,
    ) -> Result<DepositResult> {
        self.with_pool(pair, |pool| {
            let result = quote_deposit(pool, &request)?;

            let mut next = pool.with_fees_folded()?;
            next.reserve_a = next
                .reserve_a
                .checked_add(result.amount_a)
                .ok_or(ErrorCode::Overflow)?;
            next.reserve_b = next
                .reserve_b
                .checked_add(result.amount_b)
                .ok_or(ErrorCode::Overflow)?;
            next.lp_supply = next
                .lp_supply
                .checked_add(result.lp_minted)
                .ok_or(ErrorCode::Overflow)?;

            self.custody.apply(&[
                CustodyEffect::Transfer {
                    from: Holding::new(*provider, pool.token_a_mint),
                    to: pool.vault_a(),
                    amount: result.amount_a,
                },
                CustodyEffect::Transfer {
                    from: Holding::new(*provider, pool.token_b_mint),
                    to: pool.vault_b(),
                    amount: result.amount_b,
                },
                CustodyEffect::Mint {
                    lp_mint: pool.lp_mint,
                    holder: *provider,
                    amount: result.lp_minted,
                },
            ])?;

            *pool = next;
            msg!(
                "Liquidity added: ({}, {}) for {} LP",
                result.amount_a,
                result.amount_b,
                result.lp_minted
            );
            Ok(result)
        })
    }

    /// Burns shares and pays out the matching slice of both reserves,
    /// accrued swap fees included.
    pub fn remove_liquidity(
        &self,
        provider: &Pubkey,
        pair: &TokenPair,
        request: WithdrawRequest,
    ) -> Result<WithdrawResult> {
        self.with_pool(pair, |pool| {
            let result = quote_withdraw(pool, &request)?;

            let mut next = pool.with_fees_folded()?;
            next.reserve_a = next
                .reserve_a
                .checked_sub(result.amount_a)
                .ok_or(ErrorCode::Overflow)?;
            next.reserve_b = next
                .reserve_b
                .checked_sub(result.amount_b)
                .ok_or(ErrorCode::Overflow)?;
            next.lp_supply = next
                .lp_supply
                .checked_sub(result.lp_burned)
                .ok_or(ErrorCode::Overflow)?;

            self.custody.apply(&[
                CustodyEffect::Burn {
                    lp_mint: pool.lp_mint,
                    holder: *provider,
                    amount: result.lp_burned,
                },
                CustodyEffect::Transfer {
                    from: pool.vault_a(),
                    to: Holding::new(*provider, pool.token_a_mint),
                    amount: result.amount_a,
                },
                CustodyEffect::Transfer {
                    from: pool.vault_b(),
                    to: Holding::new(*provider, pool.token_b_mint),
                    amount: result.amount_b,
                },
            ])?;

            *pool = next;
            msg!(
                "Liquidity removed: {} LP for ({}, {})",
                result.lp_burned,
                result.amount_a,
                result.amount_b
            );
            Ok(result)
        })
    }
}
