mod countdown;
mod ticker;

pub use countdown::{CountdownFrame, CountdownPresenter};
pub use ticker::{format_price, PriceTickerPresenter, TickerFrame, TickerHandle};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Presenter state is plain data, so a poisoned lock is still usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
