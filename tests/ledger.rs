//! End-to-end tests against the public service API: full identity/session
//! flows and the ledger's behavior under concurrent access.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rust_decimal::Decimal;

use rustbank::account::{AccountService, AccountSummary};
use rustbank::auth::tokens::Authenticator;
use rustbank::auth::{AuthService, MfaService, SessionStore, TokenSigner};
use rustbank::error::BankError;
use rustbank::ledger::{LedgerEngine, LogAlert};
use rustbank::storage::memory::MemoryStore;
use rustbank::storage::BankStore;

struct Bank {
    auth: Arc<AuthService>,
    accounts: Arc<AccountService>,
    ledger: Arc<LedgerEngine>,
    signer: Arc<TokenSigner>,
}

fn bank() -> Bank {
    let store: Arc<dyn BankStore> = Arc::new(MemoryStore::new());
    let signer = Arc::new(TokenSigner::new(
        "0123456789abcdef0123456789abcdef",
        Duration::from_secs(1800),
        Duration::from_secs(604800),
        Duration::from_secs(60),
    ));
    let sessions = Arc::new(SessionStore::new());
    let accounts = Arc::new(AccountService::new(Arc::clone(&store), 1000));
    let auth = Arc::new(AuthService::new(
        Arc::clone(&store),
        Arc::clone(&signer),
        Arc::clone(&sessions),
        Arc::clone(&accounts),
        MfaService::new("RustBank"),
    ));
    let ledger = Arc::new(LedgerEngine::new(
        Arc::clone(&store),
        Authenticator::new(Arc::clone(&signer), Arc::clone(&sessions)),
        Arc::new(LogAlert),
        Decimal::from(1_000_000u64),
        Duration::from_secs(2),
    ));
    Bank {
        auth,
        accounts,
        ledger,
        signer,
    }
}

/// Join + login, returning the access token and the auto-provisioned
/// account number.
fn onboard(bank: &Bank, name: &str, email: &str) -> (String, String) {
    bank.auth.join(name, email, "a long enough password").unwrap();
    let login = bank.auth.login(email, "a long enough password").unwrap();
    let summaries = bank_accounts(bank, &login.access_token);
    (login.access_token, summaries[0].account_number.clone())
}

fn bank_accounts(bank: &Bank, token: &str) -> Vec<AccountSummary> {
    let owner = bank.signer.validate(token).unwrap();
    bank.accounts.list_for_owner(&owner).unwrap()
}

#[test]
fn full_session_and_ledger_flow() {
    let bank = bank();
    let (alice_token, alice_account) = onboard(&bank, "Alice", "alice@example.com");
    let (_bob_token, bob_account) = onboard(&bank, "Bob", "bob@example.com");

    bank.ledger
        .deposit(&alice_token, &alice_account, Decimal::from(50_000u64), None)
        .unwrap();
    let tx = bank
        .ledger
        .transfer(
            &alice_token,
            &alice_account,
            &bob_account,
            Decimal::from(10_000u64),
            Some("books".to_string()),
        )
        .unwrap();
    assert_eq!(tx.balance_after, Decimal::from(40_000u64));

    let history = bank.ledger.history(&alice_token).unwrap();
    assert_eq!(history.len(), 2);

    // Logout kills the access token for ledger access.
    bank.auth.logout(&alice_token).unwrap();
    let err = bank
        .ledger
        .deposit(&alice_token, &alice_account, Decimal::from(1u64), None)
        .unwrap_err();
    assert!(matches!(err, BankError::Unauthenticated));
}

#[test]
fn concurrent_withdrawals_never_overdraw() {
    let bank = bank();
    let (token, account) = onboard(&bank, "Carol", "carol@example.com");
    bank.ledger
        .deposit(&token, &account, Decimal::from(1_000u64), None)
        .unwrap();

    // 16 threads each try to withdraw 300 from a balance of 1000; at most 3
    // can individually observe sufficient funds at lock time.
    let successes: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&bank.ledger);
                let token = token.clone();
                let account = account.clone();
                s.spawn(move || {
                    match ledger.withdraw(&token, &account, Decimal::from(300u64), None) {
                        Ok(_) => 1,
                        Err(BankError::InsufficientFunds(_)) => 0,
                        Err(e) => panic!("unexpected failure: {e}"),
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(successes, 3);
    let final_balance = Decimal::from(1_000u64) - Decimal::from(300u64) * Decimal::from(successes as u64);
    let summaries = bank_accounts(&bank, &token);
    assert_eq!(summaries[0].balance, final_balance);
    assert!(summaries[0].balance >= Decimal::ZERO);

    // One committed withdrawal record per success, plus the seed deposit.
    let history = bank.ledger.history(&token).unwrap();
    assert_eq!(history.len(), successes + 1);
}

#[test]
fn crossing_transfers_do_not_deadlock() {
    let bank = bank();
    let (alice_token, alice_account) = onboard(&bank, "Alice", "alice@example.com");
    let (bob_token, bob_account) = onboard(&bank, "Bob", "bob@example.com");
    bank.ledger
        .deposit(&alice_token, &alice_account, Decimal::from(10_000u64), None)
        .unwrap();
    bank.ledger
        .deposit(&bob_token, &bob_account, Decimal::from(10_000u64), None)
        .unwrap();

    // Opposite-direction transfers between the same pair, many times over.
    // Canonical lock ordering means none of these can cycle.
    thread::scope(|s| {
        let l1 = Arc::clone(&bank.ledger);
        let (t1, a1, b1) = (alice_token.clone(), alice_account.clone(), bob_account.clone());
        let forward = s.spawn(move || {
            for _ in 0..100 {
                l1.transfer(&t1, &a1, &b1, Decimal::from(10u64), None).unwrap();
            }
        });
        let l2 = Arc::clone(&bank.ledger);
        let (t2, a2, b2) = (bob_token.clone(), bob_account.clone(), alice_account.clone());
        let backward = s.spawn(move || {
            for _ in 0..100 {
                l2.transfer(&t2, &a2, &b2, Decimal::from(10u64), None).unwrap();
            }
        });
        forward.join().unwrap();
        backward.join().unwrap();
    });

    // Equal flow both ways: balances end where they started, and the total
    // is conserved.
    let alice_balance = bank_accounts(&bank, &alice_token)[0].balance;
    let bob_balance = bank_accounts(&bank, &bob_token)[0].balance;
    assert_eq!(alice_balance, Decimal::from(10_000u64));
    assert_eq!(bob_balance, Decimal::from(10_000u64));
}

#[test]
fn disjoint_accounts_proceed_in_parallel() {
    let bank = bank();
    let (t1, a1) = onboard(&bank, "P1", "p1@example.com");
    let (t2, a2) = onboard(&bank, "P2", "p2@example.com");

    thread::scope(|s| {
        for (token, account) in [(t1.clone(), a1.clone()), (t2.clone(), a2.clone())] {
            let ledger = Arc::clone(&bank.ledger);
            s.spawn(move || {
                for _ in 0..50 {
                    ledger
                        .deposit(&token, &account, Decimal::from(2u64), None)
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(bank_accounts(&bank, &t1)[0].balance, Decimal::from(100u64));
    assert_eq!(bank_accounts(&bank, &t2)[0].balance, Decimal::from(100u64));
}
