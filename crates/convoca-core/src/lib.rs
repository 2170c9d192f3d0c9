//! Core types and decision logic for the Convoca hiring pipeline.
//!
//! This crate is deliberately free of database and runtime dependencies.
//! The three decision components ([`pipeline`], [`attendance`], [`dates`])
//! are pure functions over the domain types; storage backends (e.g.
//! `convoca-store-sqlite`) call them inside their own transactions.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

/// Wire keys for a fieldless enum: `ALL`, `key()`, `Display` and a
/// `FromStr` that rejects unknown keys with [`Error::UnknownKey`].
macro_rules! keyed {
  ($ty:ident, $domain:literal, { $($variant:ident => $key:literal),+ $(,)? }) => {
    impl $ty {
      pub const ALL: &'static [Self] = &[$(Self::$variant),+];

      pub fn key(self) -> &'static str {
        match self {
          $(Self::$variant => $key),+
        }
      }
    }

    impl ::std::fmt::Display for $ty {
      fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.write_str(self.key())
      }
    }

    impl ::std::str::FromStr for $ty {
      type Err = $crate::Error;

      fn from_str(s: &str) -> $crate::Result<Self> {
        Self::ALL
          .iter()
          .copied()
          .find(|v| v.key() == s)
          .ok_or_else(|| $crate::Error::unknown_key($domain, s))
      }
    }
  };
}

pub mod attendance;
pub mod audit;
pub mod board;
pub mod candidate;
pub mod clock;
pub mod dates;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod qualification;
pub mod reference;
pub mod retry;
pub mod store;

pub use error::{Error, ErrorKind, Result};
