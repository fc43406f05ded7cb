/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains common functions to implement bounded wait routines.

--*/

use crate::{CryptoError, CryptoResult};

/// Polls `predicate` up to `max_polls` times.
///
/// # Returns
///
/// * `Ok(())` on the first poll that returns true, `Err(err)` once the
///   budget is spent.
pub fn until<F>(max_polls: u32, err: CryptoError, mut predicate: F) -> CryptoResult<()>
where
    F: FnMut() -> bool,
{
    for _ in 0..max_polls {
        if predicate() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(err)
}
