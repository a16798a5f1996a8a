use crate::presenter::{CountdownFrame, TickerFrame};

// Everything the presenters push to the front-end loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Countdown recomputed (every second)
    Countdown(CountdownFrame),

    // Price ticker committed a new sample
    Price(TickerFrame),

    // Ctrl+C or kill signal
    Shutdown,
}
