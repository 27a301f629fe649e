//! Driving a future to completion under a deadline
//!
//! Chip HALs hand out async peripheral drivers, while the bus recovery
//! path wants a plain blocking write. [`block_until`] spins the future on
//! the spot and polls `expired` between polls of the future.
//!
//! No timer is armed: the expiry check is a plain clock read, so this works
//! under any waker, including the one `embassy_futures::block_on` creates
//! inside a running executor task.

use core::future::Future;

use embassy_futures::select::{select, Either};
use embassy_futures::{block_on, yield_now};

/// Run `fut` until it completes or `expired` returns true
///
/// Returns `None` on expiry; the unfinished future is dropped.
pub fn block_until<F, E>(fut: F, mut expired: E) -> Option<F::Output>
where
    F: Future,
    E: FnMut() -> bool,
{
    let watchdog = async {
        while !expired() {
            yield_now().await;
        }
    };

    match block_on(select(fut, watchdog)) {
        Either::First(output) => Some(output),
        Either::Second(()) => None,
    }
}
