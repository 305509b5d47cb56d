use std::collections::{BTreeMap, VecDeque};

use crate::tick::Tick;

/// Semantic channels handled locally by the bus.
///
/// Any other event name belongs to the rendering engine and is forwarded
/// there untouched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    ZoomNext,
    ZoomPrev,
    HoverStart,
    HoverEnd,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::ZoomNext,
        Channel::ZoomPrev,
        Channel::HoverStart,
        Channel::HoverEnd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::ZoomNext => "zoomnext",
            Channel::ZoomPrev => "zoomprev",
            Channel::HoverStart => "hoverstart",
            Channel::HoverEnd => "hoverend",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Channel::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A fired semantic event, kept for traceability.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<P> {
    pub tick: Tick,
    pub channel: Channel,
    pub payload: P,
}

pub type Handler<P> = Box<dyn FnMut(&P)>;

/// Events retained by [`EventBus::new`] before the oldest are dropped.
pub const DEFAULT_EVENT_LOG: usize = 256;

/// Typed publish/subscribe over the semantic channels.
///
/// Handlers run synchronously, in registration order, inside `fire`.
/// Fired events go to a bounded log that the owner drains.
pub struct EventBus<P> {
    handlers: BTreeMap<Channel, Vec<Handler<P>>>,
    events: VecDeque<Event<P>>,
    log_limit: usize,
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<Channel, usize> =
            self.handlers.iter().map(|(c, h)| (*c, h.len())).collect();
        f.debug_struct("EventBus")
            .field("handlers", &counts)
            .field("events", &self.events.len())
            .field("log_limit", &self.log_limit)
            .finish()
    }
}

impl<P> EventBus<P> {
    pub fn new() -> Self {
        Self::with_log_limit(DEFAULT_EVENT_LOG)
    }

    /// A bus keeping at most `log_limit` events; 0 disables recording.
    pub fn with_log_limit(log_limit: usize) -> Self {
        Self {
            handlers: BTreeMap::new(),
            events: VecDeque::new(),
            log_limit,
        }
    }

    pub fn log_limit(&self) -> usize {
        self.log_limit
    }

    pub fn on(&mut self, channel: Channel, handler: impl FnMut(&P) + 'static) {
        self.handlers
            .entry(channel)
            .or_default()
            .push(Box::new(handler));
    }

    pub fn handler_count(&self, channel: Channel) -> usize {
        self.handlers.get(&channel).map_or(0, Vec::len)
    }

    /// Invokes every handler of `channel` and records the event, evicting the
    /// oldest one when the log is full.
    ///
    /// Returns the number of handlers invoked.
    pub fn fire(&mut self, tick: Tick, channel: Channel, payload: P) -> usize {
        let mut invoked = 0;
        if let Some(handlers) = self.handlers.get_mut(&channel) {
            for handler in handlers.iter_mut() {
                handler(&payload);
                invoked += 1;
            }
        }
        if self.log_limit == 0 {
            return invoked;
        }
        if self.events.len() == self.log_limit {
            self.events.pop_front();
        }
        self.events.push_back(Event {
            tick,
            channel,
            payload,
        });
        invoked
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> &VecDeque<Event<P>> {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event<P>> {
        self.events.drain(..).collect()
    }
}
