use anchor_lang::prelude::*;
use cp_amm::{
    Amm, AmmConfig, DepositRequest, Holding, MemoryCustody, SwapRequest, TokenCustody, TokenPair,
    WithdrawRequest,
};

fn main() -> Result<()> {
    let sol = Pubkey::new_from_array([10; 32]);
    let usdc = Pubkey::new_from_array([20; 32]);
    let alice = Pubkey::new_from_array([1; 32]);

    let custody = MemoryCustody::new();
    custody.deposit(&Holding::new(alice, sol), 10_000)?;
    custody.deposit(&Holding::new(alice, usdc), 10_000)?;
    let amm = Amm::new(custody);

    // Example 1: Seed a pool
    let init = amm.initialize_pool(&alice, sol, 1_000, usdc, 5_000, AmmConfig::default())?;
    println!(
        "Initialize: {} SOL + {} USDC -> {} LP",
        init.amount_a, init.amount_b, init.lp_minted
    );
    let pair = TokenPair::new(sol, usdc)?;

    // Example 2: Swap both ways
    let sell = amm.swap(
        &alice,
        &pair,
        SwapRequest {
            amount_in: 100,
            minimum_out: 450,
            a_to_b: true,
        },
    )?;
    println!(
        "Swap: {} SOL (fee {}) -> {} USDC",
        sell.amount_in, sell.fee, sell.amount_out
    );
    let buy = amm.swap(
        &alice,
        &pair,
        SwapRequest {
            amount_in: 1_000,
            minimum_out: 150,
            a_to_b: false,
        },
    )?;
    println!(
        "Swap: {} USDC (fee {}) -> {} SOL",
        buy.amount_in, buy.fee, buy.amount_out
    );

    // Example 3: Deposit at the current ratio
    let deposit = amm.add_liquidity(
        &alice,
        &pair,
        DepositRequest {
            amount_a_desired: 1_000,
            amount_b_desired: 1_000,
            minimum_lp_out: 350,
        },
    )?;
    println!(
        "Deposit: {} SOL + {} USDC -> {} LP",
        deposit.amount_a, deposit.amount_b, deposit.lp_minted
    );

    // Example 4: Withdraw everything
    let lp_mint = pair.lp_mint();
    let shares = amm.custody().share_balance(&lp_mint, &alice);
    let withdrawn = amm.remove_liquidity(
        &alice,
        &pair,
        WithdrawRequest {
            lp_amount_in: shares,
            minimum_a_out: 1,
            minimum_b_out: 1,
        },
    )?;
    println!(
        "Withdraw: {} LP -> {} SOL + {} USDC",
        withdrawn.lp_burned, withdrawn.amount_a, withdrawn.amount_b
    );

    if let Some(pool) = amm.pool(&pair) {
        println!(
            "Pool {:?}: reserves ({}, {}), fees ({}, {})",
            pool.status(),
            pool.reserve_a,
            pool.reserve_b,
            pool.fees_a,
            pool.fees_b
        );
    }
    Ok(())
}
