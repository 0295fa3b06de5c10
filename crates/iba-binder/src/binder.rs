//! Binder traits and the shared verification flow.

use iba_config::BinderSection;
use iba_intent::IntentDeclaration;
use tracing::{debug, warn};

use crate::error::{BinderError, BinderResult};
use crate::signed::SignedIntentBinder;
use crate::simple::SimpleIntentBinder;
use crate::token::{BindingAlgorithm, BindingToken};

/// Something that can check a [`BindingToken`] against a declaration.
pub trait BindingVerifier: Send + Sync {
    /// Whether `token` binds exactly the current contents of `declaration`.
    ///
    /// The declaration's hash is recomputed from its current fields and
    /// compared with the token first; any post-binding change fails here
    /// without the signature being examined. Only then is the signature
    /// checked.
    fn verify_intent(&self, token: &BindingToken, declaration: &IntentDeclaration) -> bool;
}

/// Something that can issue binding tokens.
pub trait IntentBinder: BindingVerifier {
    /// The scheme this binder signs with.
    fn algorithm(&self) -> BindingAlgorithm;

    /// Bind `declaration`'s current hash to `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::InvalidPrincipal`] for an empty principal and
    /// [`BinderError::Crypto`] if the key cannot sign.
    fn bind_intent(
        &self,
        declaration: &IntentDeclaration,
        principal: &str,
    ) -> BinderResult<BindingToken>;
}

pub(crate) fn check_principal(principal: &str) -> BinderResult<()> {
    if principal.is_empty() {
        return Err(BinderError::InvalidPrincipal);
    }
    Ok(())
}

pub(crate) fn log_bound(token: &BindingToken, declaration: &IntentDeclaration) {
    tracing::info!(
        intent_id = %declaration.intent_id,
        principal = %token.bound_by,
        algorithm = %token.algorithm,
        key_id = %token.key_id,
        "intent bound"
    );
}

/// Hash check, then algorithm check, then `check_signature` over the
/// token's signing data.
pub(crate) fn verify_with(
    token: &BindingToken,
    declaration: &IntentDeclaration,
    algorithm: BindingAlgorithm,
    check_signature: impl FnOnce(&[u8]) -> bool,
) -> bool {
    let current = declaration.get_deterministic_hash();
    if !current.ct_eq(&token.intent_hash) {
        warn!(
            intent_id = %declaration.intent_id,
            expected = %token.intent_hash,
            actual = %current,
            "intent hash mismatch, declaration changed after binding"
        );
        return false;
    }

    if token.algorithm != algorithm {
        debug!(
            intent_id = %declaration.intent_id,
            token_algorithm = %token.algorithm,
            binder_algorithm = %algorithm,
            "token algorithm does not match verifier"
        );
        return false;
    }

    let valid = check_signature(&token.signing_data());
    if !valid {
        warn!(
            intent_id = %declaration.intent_id,
            key_id = %token.key_id,
            "binding signature rejected"
        );
    }
    valid
}

/// Build the binder described by the `[binder]` config section.
///
/// # Errors
///
/// Returns [`BinderError::Config`] for an unknown algorithm, and key loading
/// errors from the selected binder.
pub fn from_section(section: &BinderSection) -> BinderResult<Box<dyn IntentBinder>> {
    match section.algorithm.as_str() {
        "hmac-sha256" => Ok(Box::new(SimpleIntentBinder::from_section(section)?)),
        "ed25519" => Ok(Box::new(SignedIntentBinder::from_section(section)?)),
        other => Err(BinderError::Config(format!("unknown algorithm '{other}'"))),
    }
}
