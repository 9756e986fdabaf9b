//! # bither-multisig: M-of-N multisignature wallet.
//!
//! Owners submit transactions and confirm them. A transaction executes
//! exactly once, on the first attempt made after it reaches the required
//! number of confirmations. A failed attempt leaves it pending so it can be
//! retried with [`MultiSigWallet::execute`].
//!
//! The payload of a transaction is a closed set of calls ([`Call`]) rather
//! than arbitrary bytes: a plain value transfer, an ERC-20 style `approve`
//! on a token, or one of the wallet's own governance operations.

pub mod transaction;
pub mod wallet;

pub use transaction::{Call, Execution, MultiSigTransaction};
pub use wallet::{MultiSigWallet, WalletEvent, WalletSnapshot, WalletState};
