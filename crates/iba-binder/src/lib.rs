//! IBA Binder - Tamper-evident binding of intents to principals.
//!
//! Binding an [`IntentDeclaration`](iba_intent::IntentDeclaration) produces
//! a [`BindingToken`]: the declaration's deterministic hash, the principal
//! that bound it, and a signature over both. Any later change to the
//! declaration changes its hash, so verification fails.
//!
//! Two binders are provided:
//!
//! - [`SimpleIntentBinder`] signs with HMAC-SHA256 from a rotating
//!   [`HmacKeyring`]. Signer and verifier share the secret.
//! - [`SignedIntentBinder`] signs with Ed25519. Verify-only parties use an
//!   [`IntentVerifier`] holding public keys.
//!
//! # Example
//!
//! ```
//! use iba_binder::prelude::*;
//! use iba_intent::{IntentDeclaration, IntentScope};
//!
//! let intent = IntentDeclaration::new(
//!     "healthcare-001",
//!     "Schedule dentist appointment",
//!     "user@example.com",
//!     IntentScope::new().allow("calendar:*"),
//! )?;
//!
//! let binder = SimpleIntentBinder::generate();
//! let token = binder.bind_intent(&intent, "user@example.com")?;
//! assert!(binder.verify_intent(&token, &intent));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod binder;
mod error;
mod keys;
mod signed;
mod simple;
mod token;

pub use binder::{BindingVerifier, IntentBinder, from_section};
pub use error::{BinderError, BinderResult};
pub use keys::HmacKeyring;
pub use signed::{IntentVerifier, SignedIntentBinder};
pub use simple::{DEFAULT_KEY_ID, SimpleIntentBinder};
pub use token::{BindingAlgorithm, BindingToken};
