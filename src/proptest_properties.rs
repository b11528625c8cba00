//! Property-based checks for the pool invariants.
//!
//! 1. LP conservation: holder balances always sum to the recorded supply.
//! 2. Vault accounting: custody balance == reserve + fees on each side.
//! 3. Curve rounding: `new_in * new_out <= k < new_in * (new_out + 1)`.
//! 4. Value growth: vault product never shrinks across a swap.
//! 5. Slippage: a minimum one above the quote fails and changes nothing.
//! 6. Determinism: unrelated pools never influence a result.

use anchor_lang::error::Error;
use anchor_lang::prelude::Pubkey;
use proptest::prelude::*;

use crate::{
    swap::swap, Amm, AmmConfig, DepositRequest, ErrorCode, Holding, MemoryCustody, SwapRequest,
    TokenCustody, TokenPair, WithdrawRequest,
};

const USERS: u8 = 3;
const FUNDING: u64 = 1_000_000_000_000;

fn key(byte: u8) -> Pubkey {
    Pubkey::new_from_array([byte; 32])
}

fn user(index: u8) -> Pubkey {
    key(index + 1)
}

fn mint_a() -> Pubkey {
    key(100)
}

fn mint_b() -> Pubkey {
    key(200)
}

fn pair() -> TokenPair {
    TokenPair::new(mint_a(), mint_b()).unwrap()
}

fn funded_amm(mints: &[Pubkey]) -> Amm<MemoryCustody> {
    let custody = MemoryCustody::new();
    for index in 0..USERS {
        for mint in mints {
            custody
                .deposit(&Holding::new(user(index), *mint), FUNDING)
                .unwrap();
        }
    }
    Amm::new(custody)
}

fn seeded_amm(reserve_a: u64, reserve_b: u64) -> Amm<MemoryCustody> {
    let amm = funded_amm(&[mint_a(), mint_b()]);
    amm.initialize_pool(
        &user(0),
        mint_a(),
        reserve_a,
        mint_b(),
        reserve_b,
        AmmConfig::default(),
    )
    .unwrap();
    amm
}

fn check_accounting(amm: &Amm<MemoryCustody>, pair: &TokenPair) -> Result<(), TestCaseError> {
    let pool = amm.pool(pair).unwrap();
    let custody = amm.custody();
    prop_assert_eq!(
        custody.total_share_balances(&pool.lp_mint),
        u128::from(pool.lp_supply)
    );
    prop_assert_eq!(custody.share_supply(&pool.lp_mint), pool.lp_supply);
    prop_assert_eq!(
        u128::from(custody.balance_of(&pool.vault_a())),
        u128::from(pool.reserve_a) + u128::from(pool.fees_a)
    );
    prop_assert_eq!(
        u128::from(custody.balance_of(&pool.vault_b())),
        u128::from(pool.reserve_b) + u128::from(pool.fees_b)
    );
    Ok(())
}

#[derive(Debug, Clone)]
enum Op {
    Swap { user: u8, amount: u64, a_to_b: bool },
    Add { user: u8, amount_a: u64, amount_b: u64 },
    Remove { user: u8, fraction_bps: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..USERS, 1u64..500_000, any::<bool>()).prop_map(|(user, amount, a_to_b)| Op::Swap {
            user,
            amount,
            a_to_b
        }),
        (0..USERS, 1u64..500_000, 1u64..2_000_000).prop_map(|(user, amount_a, amount_b)| {
            Op::Add {
                user,
                amount_a,
                amount_b,
            }
        }),
        (0..USERS, 1u64..=10_000).prop_map(|(user, fraction_bps)| Op::Remove {
            user,
            fraction_bps
        }),
    ]
}

fn apply(amm: &Amm<MemoryCustody>, pair: &TokenPair, op: &Op) {
    // Rejections are expected; only the accounting afterwards matters.
    let _ = match *op {
        Op::Swap {
            user: index,
            amount,
            a_to_b,
        } => amm
            .swap(
                &user(index),
                pair,
                SwapRequest {
                    amount_in: amount,
                    minimum_out: 0,
                    a_to_b,
                },
            )
            .map(|_| ()),
        Op::Add {
            user: index,
            amount_a,
            amount_b,
        } => amm
            .add_liquidity(
                &user(index),
                pair,
                DepositRequest {
                    amount_a_desired: amount_a,
                    amount_b_desired: amount_b,
                    minimum_lp_out: 0,
                },
            )
            .map(|_| ()),
        Op::Remove {
            user: index,
            fraction_bps,
        } => {
            let lp_mint = pair.lp_mint();
            let held = amm.custody().share_balance(&lp_mint, &user(index));
            let lp_amount_in = held * fraction_bps / 10_000;
            amm.remove_liquidity(
                &user(index),
                pair,
                WithdrawRequest {
                    lp_amount_in,
                    minimum_a_out: 0,
                    minimum_b_out: 0,
                },
            )
            .map(|_| ())
        }
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_accounting_holds_across_operations(
        reserve_a in 1_000u64..10_000_000,
        reserve_b in 1_000u64..10_000_000,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let amm = seeded_amm(reserve_a, reserve_b);
        let pair = pair();
        check_accounting(&amm, &pair)?;
        for op in &ops {
            apply(&amm, &pair, op);
            check_accounting(&amm, &pair)?;
        }
    }

    #[test]
    fn prop_swap_rounding_bounds(
        amount_in in 1u64..u64::from(u32::MAX),
        reserve_in in 1u64..u64::from(u32::MAX),
        reserve_out in 1u64..u64::from(u32::MAX),
        fee_bps in 0u16..=1_000,
    ) {
        if let Ok(result) = swap(amount_in, reserve_in, reserve_out, fee_bps) {
            let k = u128::from(reserve_in) * u128::from(reserve_out);
            let new_in = u128::from(result.new_reserve_in);
            let new_out = u128::from(result.new_reserve_out);

            prop_assert!(new_in * new_out <= k);
            prop_assert!(new_in * (new_out + 1) > k);
            prop_assert!(result.amount_out < reserve_out);
            prop_assert_eq!(result.amount_in_after_fee + result.fee, amount_in);
            prop_assert_eq!(result.new_reserve_in, reserve_in + result.amount_in_after_fee);
            prop_assert_eq!(result.new_reserve_out + result.amount_out, reserve_out);
        }
    }

    #[test]
    fn prop_vault_product_never_shrinks(
        reserve_a in 1_000_000u64..1_000_000_000_000,
        reserve_b in 1_000_000u64..1_000_000_000_000,
        size_bps in 100u64..=1_000,
        a_to_b in any::<bool>(),
    ) {
        let amm = seeded_amm(reserve_a, reserve_b);
        let pair = pair();
        let reserve_in = if a_to_b { reserve_a } else { reserve_b };
        let amount_in = reserve_in / 10_000 * size_bps;

        let before = u128::from(reserve_a) * u128::from(reserve_b);
        amm.swap(&user(1), &pair, SwapRequest { amount_in, minimum_out: 0, a_to_b }).unwrap();

        let pool = amm.pool(&pair).unwrap();
        let custody = amm.custody();
        let after = u128::from(custody.balance_of(&pool.vault_a()))
            * u128::from(custody.balance_of(&pool.vault_b()));
        prop_assert!(after >= before);
        check_accounting(&amm, &pair)?;
    }

    #[test]
    fn prop_slippage_floor_is_exact(
        reserve_a in 1_000u64..1_000_000_000,
        reserve_b in 1_000u64..1_000_000_000,
        amount_in in 1_000u64..1_000_000,
        a_to_b in any::<bool>(),
    ) {
        let amm = seeded_amm(reserve_a, reserve_b);
        let pair = pair();
        let request = SwapRequest { amount_in, minimum_out: 0, a_to_b };
        let Ok(quoted) = amm.quote_swap(&pair, &request) else {
            return Ok(());
        };
        let before = amm.pool(&pair).unwrap();

        let err = amm
            .swap(&user(1), &pair, SwapRequest { minimum_out: quoted.amount_out + 1, ..request })
            .unwrap_err();
        prop_assert_eq!(err, Error::from(ErrorCode::SlippageExceeded));
        prop_assert_eq!(amm.pool(&pair).unwrap(), before);

        let filled = amm
            .swap(&user(1), &pair, SwapRequest { minimum_out: quoted.amount_out, ..request })
            .unwrap();
        prop_assert_eq!(filled, quoted);
    }

    #[test]
    fn prop_unrelated_pools_do_not_matter(
        reserve_a in 1_000u64..1_000_000_000,
        reserve_b in 1_000u64..1_000_000_000,
        amount_in in 1_000u64..1_000_000,
        noise in 1_000u64..1_000_000,
        a_to_b in any::<bool>(),
    ) {
        let mint_c = key(150);
        let lone = funded_amm(&[mint_a(), mint_b()]);
        let busy = funded_amm(&[mint_a(), mint_b(), mint_c]);
        for amm in [&lone, &busy] {
            amm.initialize_pool(&user(0), mint_a(), reserve_a, mint_b(), reserve_b, AmmConfig::default())
                .unwrap();
        }

        busy.initialize_pool(&user(0), mint_a(), noise, mint_c, noise * 2, AmmConfig::new(100).unwrap())
            .unwrap();
        let other = TokenPair::new(mint_c, mint_a()).unwrap();
        let _ = busy.swap(&user(2), &other, SwapRequest { amount_in: noise / 3, minimum_out: 0, a_to_b });

        let request = SwapRequest { amount_in, minimum_out: 0, a_to_b };
        let pair = pair();
        prop_assert_eq!(
            lone.swap(&user(1), &pair, request),
            busy.swap(&user(1), &pair, request)
        );
        prop_assert_eq!(lone.pool(&pair), busy.pool(&pair));
    }

    #[test]
    fn prop_add_then_remove_never_profits(
        reserve_a in 1_000u64..1_000_000_000,
        reserve_b in 1_000u64..1_000_000_000,
        amount_a in 1u64..1_000_000_000,
        amount_b in 1u64..1_000_000_000,
    ) {
        let amm = seeded_amm(reserve_a, reserve_b);
        let pair = pair();
        let Ok(deposit) = amm.add_liquidity(
            &user(1),
            &pair,
            DepositRequest { amount_a_desired: amount_a, amount_b_desired: amount_b, minimum_lp_out: 0 },
        ) else {
            return Ok(());
        };
        prop_assert!(deposit.amount_a <= amount_a && deposit.amount_b <= amount_b);

        let withdrawn = amm.remove_liquidity(
            &user(1),
            &pair,
            WithdrawRequest { lp_amount_in: deposit.lp_minted, minimum_a_out: 0, minimum_b_out: 0 },
        );
        if let Ok(withdrawn) = withdrawn {
            prop_assert!(withdrawn.amount_a <= deposit.amount_a);
            prop_assert!(withdrawn.amount_b <= deposit.amount_b);
        }
        check_accounting(&amm, &pair)?;
    }
}
