//! Short human-readable order codes.

use crate::collab::OrderStore;
use crate::error::SyncError;
use crate::retry::RetryPolicy;
use rand::Rng;
use tracing::debug;

/// Uppercase letters and digits without the look-alikes `I`, `O`, `0` and `1`.
pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn random_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Draws codes from `next_code` until one is not yet used by the tenant.
///
/// Running out of attempts is reported as transient: the caller may simply try again.
pub async fn generate_unique<F>(
    store: &dyn OrderStore,
    tenant_id: &str,
    attempts: u32,
    retry: &RetryPolicy,
    mut next_code: F,
) -> Result<String, SyncError>
where
    F: FnMut() -> String + Send,
{
    for attempt in 1..=attempts {
        let code = next_code();
        let taken = retry
            .run("code_exists", || store.code_exists(tenant_id, &code))
            .await?;
        if !taken {
            return Ok(code);
        }
        debug!(tenant_id, %code, attempt, "Order code collision");
    }
    Err(SyncError::Transient(format!(
        "no free order code after {attempts} attempts"
    )))
}
