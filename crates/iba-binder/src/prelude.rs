//! Commonly used types for convenient import.
//!
//! Use `use iba_binder::prelude::*;` to import the essentials.

pub use crate::{BinderError, BinderResult};

pub use crate::{BindingVerifier, IntentBinder};

pub use crate::{IntentVerifier, SignedIntentBinder, SimpleIntentBinder};

pub use crate::{BindingAlgorithm, BindingToken};
