use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Single-permit guard for an interactive control. The UI takes the permit
/// before firing a request and holds it until the response lands, so a
/// double-tap cannot race two toggles against the same row.
#[derive(Debug, Default)]
pub struct InFlightGate {
    busy: AtomicBool,
}

impl InFlightGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while a previous permit is still alive.
    pub fn begin(&self) -> Option<InFlightPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightPermit { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct InFlightPermit<'a> {
    gate: &'a InFlightGate,
}

impl Drop for InFlightPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

/// Generation counter for a date/week view. Navigation advances the
/// generation; a load response is applied only if the ticket it was issued
/// under is still current, so a late response for an abandoned view is
/// discarded instead of clobbering the one on screen.
#[derive(Debug, Default)]
pub struct ViewVersion {
    generation: AtomicU64,
}

impl ViewVersion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Called on navigation; invalidates every earlier ticket and returns the
    /// new one.
    pub fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current() == ticket
    }
}
