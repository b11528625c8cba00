//! Token custody seam.
//!
//! The pool never moves balances itself: it hands a [`TokenCustody`] the
//! list of effects one operation needs (token transfers, LP share mints and
//! burns) and the custody applies all of them or none. [`MemoryCustody`] is
//! an in-process implementation used by the demo binary and the tests.

use std::collections::{HashMap, HashSet};

use anchor_lang::prelude::*;
use parking_lot::Mutex;

#[error_code(offset = 7000)]
pub enum CustodyError {
    #[msg("Holding balance is lower than the transfer amount")]
    InsufficientFunds,
    #[msg("Holding is frozen")]
    HoldingFrozen,
    #[msg("Share balance is lower than the burn amount")]
    InsufficientShares,
    #[msg("Balance or share supply would overflow")]
    SupplyOverflow,
    #[msg("Holdings belong to different mints")]
    MintMismatch,
    #[msg("Failed effects could not be undone; custody is out of sync")]
    RollbackFailed,
}

/// A token account: `owner`'s balance of `mint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Holding {
    pub owner: Pubkey,
    pub mint: Pubkey,
}

impl Holding {
    pub fn new(owner: Pubkey, mint: Pubkey) -> Self {
        Self { owner, mint }
    }
}

/// One balance change requested by a pool operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustodyEffect {
    Transfer {
        from: Holding,
        to: Holding,
        amount: u64,
    },
    Mint {
        lp_mint: Pubkey,
        holder: Pubkey,
        amount: u64,
    },
    Burn {
        lp_mint: Pubkey,
        holder: Pubkey,
        amount: u64,
    },
}

impl CustodyEffect {
    /// The effect that cancels this one.
    pub fn inverse(&self) -> Self {
        match *self {
            Self::Transfer { from, to, amount } => Self::Transfer {
                from: to,
                to: from,
                amount,
            },
            Self::Mint {
                lp_mint,
                holder,
                amount,
            } => Self::Burn {
                lp_mint,
                holder,
                amount,
            },
            Self::Burn {
                lp_mint,
                holder,
                amount,
            } => Self::Mint {
                lp_mint,
                holder,
                amount,
            },
        }
    }
}

pub trait TokenCustody: Send + Sync {
    /// Moves `amount` of `from.mint` from `from` to `to`.
    fn transfer(&self, from: &Holding, to: &Holding, amount: u64) -> Result<()>;

    fn mint_shares(&self, lp_mint: &Pubkey, holder: &Pubkey, amount: u64) -> Result<()>;

    /// Fails with [`CustodyError::InsufficientShares`] when `holder` has
    /// fewer than `amount` shares.
    fn burn_shares(&self, lp_mint: &Pubkey, holder: &Pubkey, amount: u64) -> Result<()>;

    fn balance_of(&self, holding: &Holding) -> u64;

    fn share_balance(&self, lp_mint: &Pubkey, holder: &Pubkey) -> u64;

    /// Applies every effect in order, or none of them.
    ///
    /// The provided body runs the effects one by one through a
    /// [`CustodyJournal`] and compensates on failure. Between two steps
    /// another caller may touch the same holdings, so compensation can fail;
    /// that surfaces as [`CustodyError::RollbackFailed`]. Backends that can
    /// apply a batch under one critical section should override this.
    fn apply(&self, effects: &[CustodyEffect]) -> Result<()> {
        let mut journal = CustodyJournal::new(self);
        for effect in effects {
            if let Err(e) = journal.apply(effect) {
                journal.rollback()?;
                return Err(e);
            }
        }
        journal.commit();
        Ok(())
    }
}

/// Custody effects applied so far by one batch.
///
/// If a later step fails the caller hands the journal to [`rollback`], which
/// applies the inverse effects newest-first.
///
/// [`rollback`]: CustodyJournal::rollback
pub struct CustodyJournal<'a, C: TokenCustody + ?Sized> {
    custody: &'a C,
    applied: Vec<CustodyEffect>,
}

impl<'a, C: TokenCustody + ?Sized> CustodyJournal<'a, C> {
    pub fn new(custody: &'a C) -> Self {
        Self {
            custody,
            applied: Vec::with_capacity(3),
        }
    }

    pub fn apply(&mut self, effect: &CustodyEffect) -> Result<()> {
        match *effect {
            CustodyEffect::Transfer { from, to, amount } => {
                self.custody.transfer(&from, &to, amount)?
            }
            CustodyEffect::Mint {
                lp_mint,
                holder,
                amount,
            } => self.custody.mint_shares(&lp_mint, &holder, amount)?,
            CustodyEffect::Burn {
                lp_mint,
                holder,
                amount,
            } => self.custody.burn_shares(&lp_mint, &holder, amount)?,
        }
        self.applied.push(*effect);
        Ok(())
    }

    /// Undoes every applied effect. Keeps going past a failed step so as
    /// little as possible stays moved, then reports
    /// [`CustodyError::RollbackFailed`].
    pub fn rollback(self) -> Result<()> {
        let mut undo = CustodyJournal::new(self.custody);
        let mut failed = false;
        for effect in self.applied.iter().rev() {
            if let Err(e) = undo.apply(&effect.inverse()) {
                msg!("Custody rollback failed for {:?}: {}", effect, e);
                failed = true;
            }
        }
        require!(!failed, CustodyError::RollbackFailed);
        Ok(())
    }

    /// Keeps the applied effects.
    pub fn commit(self) {}
}

#[derive(Default)]
struct Ledger {
    balances: HashMap<Holding, u64>,
    frozen: HashSet<Holding>,
    shares: HashMap<(Pubkey, Pubkey), u64>,
    share_supply: HashMap<Pubkey, u64>,
}

impl Ledger {
    fn balance(&self, holding: &Holding) -> u64 {
        self.balances.get(holding).copied().unwrap_or(0)
    }

    fn shares_of(&self, lp_mint: &Pubkey, holder: &Pubkey) -> u64 {
        self.shares.get(&(*lp_mint, *holder)).copied().unwrap_or(0)
    }

    fn supply(&self, lp_mint: &Pubkey) -> u64 {
        self.share_supply.get(lp_mint).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Holding, to: &Holding, amount: u64) -> Result<()> {
        require!(
            !self.frozen.contains(from) && !self.frozen.contains(to),
            CustodyError::HoldingFrozen
        );
        self.move_balance(from, to, amount)
    }

    /// Balance move without the freeze check; used to undo a transfer.
    fn move_balance(&mut self, from: &Holding, to: &Holding, amount: u64) -> Result<()> {
        require_keys_eq!(from.mint, to.mint, CustodyError::MintMismatch);

        let remaining = self
            .balance(from)
            .checked_sub(amount)
            .ok_or(CustodyError::InsufficientFunds)?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(CustodyError::SupplyOverflow)?;

        self.balances.insert(*from, remaining);
        self.balances.insert(*to, credited);
        Ok(())
    }

    fn mint(&mut self, lp_mint: &Pubkey, holder: &Pubkey, amount: u64) -> Result<()> {
        let new_supply = self
            .supply(lp_mint)
            .checked_add(amount)
            .ok_or(CustodyError::SupplyOverflow)?;
        let new_balance = self
            .shares_of(lp_mint, holder)
            .checked_add(amount)
            .ok_or(CustodyError::SupplyOverflow)?;

        self.share_supply.insert(*lp_mint, new_supply);
        self.shares.insert((*lp_mint, *holder), new_balance);
        Ok(())
    }

    fn burn(&mut self, lp_mint: &Pubkey, holder: &Pubkey, amount: u64) -> Result<()> {
        let new_balance = self
            .shares_of(lp_mint, holder)
            .checked_sub(amount)
            .ok_or(CustodyError::InsufficientShares)?;
        let new_supply = self
            .supply(lp_mint)
            .checked_sub(amount)
            .ok_or(CustodyError::InsufficientShares)?;

        self.shares.insert((*lp_mint, *holder), new_balance);
        self.share_supply.insert(*lp_mint, new_supply);
        Ok(())
    }

    fn apply(&mut self, effect: &CustodyEffect) -> Result<()> {
        match effect {
            CustodyEffect::Transfer { from, to, amount } => self.transfer(from, to, *amount),
            CustodyEffect::Mint {
                lp_mint,
                holder,
                amount,
            } => self.mint(lp_mint, holder, *amount),
            CustodyEffect::Burn {
                lp_mint,
                holder,
                amount,
            } => self.burn(lp_mint, holder, *amount),
        }
    }

    fn revert(&mut self, effect: &CustodyEffect) -> Result<()> {
        match effect.inverse() {
            CustodyEffect::Transfer { from, to, amount } => self.move_balance(&from, &to, amount),
            inverse => self.apply(&inverse),
        }
    }
}

/// Thread-safe in-memory custody.
#[derive(Default)]
pub struct MemoryCustody {
    ledger: Mutex<Ledger>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `holding` out of thin air (test/demo provisioning).
    pub fn deposit(&self, holding: &Holding, amount: u64) -> Result<()> {
        let mut ledger = self.ledger.lock();
        let balance = ledger.balances.entry(*holding).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(CustodyError::SupplyOverflow)?;
        Ok(())
    }

    pub fn freeze(&self, holding: &Holding) {
        self.ledger.lock().frozen.insert(*holding);
    }

    pub fn thaw(&self, holding: &Holding) {
        self.ledger.lock().frozen.remove(holding);
    }

    pub fn share_supply(&self, lp_mint: &Pubkey) -> u64 {
        self.ledger.lock().supply(lp_mint)
    }

    /// Sum of every holder's share balance for `lp_mint`.
    pub fn total_share_balances(&self, lp_mint: &Pubkey) -> u128 {
        self.ledger
            .lock()
            .shares
            .iter()
            .filter(|((mint, _), _)| mint == lp_mint)
            .map(|(_, amount)| u128::from(*amount))
            .sum()
    }
}

impl TokenCustody for MemoryCustody {
    fn transfer(&self, from: &Holding, to: &Holding, amount: u64) -> Result<()> {
        self.ledger.lock().transfer(from, to, amount)
    }

    fn mint_shares(&self, lp_mint: &Pubkey, holder: &Pubkey, amount: u64) -> Result<()> {
        self.ledger.lock().mint(lp_mint, holder, amount)
    }

    fn burn_shares(&self, lp_mint: &Pubkey, holder: &Pubkey, amount: u64) -> Result<()> {
        self.ledger.lock().burn(lp_mint, holder, amount)
    }

    fn balance_of(&self, holding: &Holding) -> u64 {
        self.ledger.lock().balance(holding)
    }

    fn share_balance(&self, lp_mint: &Pubkey, holder: &Pubkey) -> u64 {
        self.ledger.lock().shares_of(lp_mint, holder)
    }

    /// The whole batch runs under one ledger lock, so nothing can spend a
    /// credit before a failed batch is unwound.
    fn apply(&self, effects: &[CustodyEffect]) -> Result<()> {
        let mut ledger = self.ledger.lock();
        for (done, effect) in effects.iter().enumerate() {
            if let Err(e) = ledger.apply(effect) {
                for applied in effects[..done].iter().rev() {
                    ledger
                        .revert(applied)
                        .map_err(|_| CustodyError::RollbackFailed)?;
                }
                return Err(e);
            }
        }
        Ok(())
    }
}
