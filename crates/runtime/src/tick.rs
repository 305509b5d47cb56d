/// Cooperative scheduler tick.
///
/// One tick is one turn of the host's event loop. Work deferred "to the next
/// tick" runs only after the call that deferred it has returned.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(pub u64);

impl Tick {
    pub fn next(self) -> Self {
        Tick(self.0 + 1)
    }

    pub fn after(self, ticks: u64) -> Self {
        Tick(self.0.saturating_add(ticks))
    }
}
