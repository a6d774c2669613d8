//! Reactor Module
//!
//! Single-threaded, readiness-driven event loop over owned handlers.
//!
//! ## Responsibilities
//! - Own every registered handler in a generation-checked slot table
//! - Wait for readiness with `mio::Poll` and dispatch to the ready handler
//! - Destroy handlers on error/hangup or when dispatch asks to close
//!
//! ## Dispatch
//! ```text
//!  poll ──► event(token) ──► slot lookup ──► error/hangup? ──► destroy
//!                                 │
//!                                 ▼
//!                 checkout ──► dispatch(cx) ──► true  ──► checkin
//!                                          └──► false ──► destroy
//! ```
//!
//! A handler is checked out of the table while it runs, so dispatch can
//! register new handlers or be deregistered from another thread without
//! aliasing; a deregistration that lands mid-dispatch takes effect at
//! check-in.

mod slots;

pub use slots::{HandlerId, Removal, SlotTable};

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::event::{Event, Source};
use mio::{Events, Interest, Poll, Registry, Token, Waker};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::error::Result;

/// Token reserved for the stop waker
const WAKE_TOKEN: Token = Token(usize::MAX);

/// Events fetched per poll
const EVENTS_CAPACITY: usize = 1024;

/// A unit of I/O owned by the reactor
///
/// `S` is the state the reactor thread lends to every dispatch.
pub trait Handler<S>: Send {
    /// The registered I/O source
    fn source(&mut self) -> &mut dyn Source;

    /// Handle readiness
    ///
    /// Return `Ok(true)` to stay registered and `Ok(false)` to be destroyed.
    /// Errors destroy the handler; fatal ones also stop the loop.
    fn dispatch(&mut self, cx: &mut Context<'_, S>) -> Result<bool>;
}

type BoxedHandler<S> = Box<dyn Handler<S>>;

struct Shared<S> {
    registry: Registry,
    handlers: Mutex<SlotTable<BoxedHandler<S>>>,
    stopped: Arc<AtomicBool>,
    waker: Waker,
}

impl<S> Shared<S> {
    fn register(&self, mut handler: BoxedHandler<S>, interest: Interest) -> Result<HandlerId> {
        // Reserve first: the token must exist before the source is armed
        let id = self.handlers.lock().reserve();

        if let Err(e) = self.registry.register(handler.source(), id.token(), interest) {
            self.handlers.lock().release(id);
            return Err(e.into());
        }

        if let Err(mut handler) = self.handlers.lock().fill(id, handler) {
            let _ = self.registry.deregister(handler.source());
            return Err(io::Error::new(io::ErrorKind::Other, "handler slot lost").into());
        }

        trace!(index = id.index(), generation = id.generation(), "Handler registered");
        Ok(id)
    }

    fn deregister(&self, id: HandlerId) -> bool {
        let removal = self.handlers.lock().remove(id);
        match removal {
            Removal::Removed(handler) => {
                self.destroy(id, handler);
                true
            }
            Removal::Deferred => true,
            Removal::Missing => false,
        }
    }

    fn destroy(&self, id: HandlerId, mut handler: BoxedHandler<S>) {
        if let Err(e) = self.registry.deregister(handler.source()) {
            trace!(index = id.index(), error = %e, "Deregister failed");
        }
        drop(handler);
        trace!(index = id.index(), generation = id.generation(), "Handler destroyed");
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            warn!(error = %e, "Failed to wake reactor");
        }
    }
}

/// What a handler sees during dispatch
pub struct Context<'r, S> {
    /// State lent by the reactor thread
    pub state: &'r mut S,
    id: HandlerId,
    event: &'r Event,
    shared: &'r Shared<S>,
}

impl<'r, S> Context<'r, S> {
    /// Id of the handler being dispatched
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// The readiness event being handled
    pub fn event(&self) -> &Event {
        self.event
    }

    /// Register a new handler; it receives events from the next poll on
    pub fn register(&self, handler: Box<dyn Handler<S>>, interest: Interest) -> Result<HandlerId> {
        self.shared.register(handler, interest)
    }

    /// Change the current handler's interest
    ///
    /// `source` must be the handler's own source.
    pub fn reregister(&self, source: &mut dyn Source, interest: Interest) -> bool {
        match self.shared.registry.reregister(source, self.id.token(), interest) {
            Ok(()) => true,
            Err(e) => {
                warn!(index = self.id.index(), error = %e, "Reregister failed");
                false
            }
        }
    }

    /// Remove another handler
    pub fn deregister(&self, id: HandlerId) -> bool {
        self.shared.deregister(id)
    }

    /// Live handlers, including the one being dispatched
    pub fn handler_count(&self) -> usize {
        self.shared.handlers.lock().len()
    }

    /// Ask the loop to stop after this iteration
    pub fn stop(&self) {
        self.shared.stop();
    }
}

/// Thread-safe handle for managing a reactor from outside its thread
pub struct ReactorHandle<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for ReactorHandle<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> ReactorHandle<S> {
    pub fn register(&self, handler: Box<dyn Handler<S>>, interest: Interest) -> Result<HandlerId> {
        self.shared.register(handler, interest)
    }

    /// Remove and destroy a handler; deferred if it is being dispatched
    pub fn deregister(&self, id: HandlerId) -> bool {
        self.shared.deregister(id)
    }

    /// Stop the loop and wake it if it is waiting
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    pub fn handler_count(&self) -> usize {
        self.shared.handlers.lock().len()
    }
}

/// The event loop
pub struct Reactor<S> {
    poll: Poll,
    events: Events,
    shared: Arc<Shared<S>>,
}

impl<S> Reactor<S> {
    pub fn new() -> Result<Self> {
        let poll = Poll::new()?;
        let registry = poll.registry().try_clone()?;
        let waker = Waker::new(poll.registry(), WAKE_TOKEN)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            shared: Arc::new(Shared {
                registry,
                handlers: Mutex::new(SlotTable::new()),
                stopped: Arc::new(AtomicBool::new(false)),
                waker,
            }),
        })
    }

    /// Register a handler for readiness events
    pub fn register(&self, handler: Box<dyn Handler<S>>, interest: Interest) -> Result<HandlerId> {
        self.shared.register(handler, interest)
    }

    pub fn deregister(&self, id: HandlerId) -> bool {
        self.shared.deregister(id)
    }

    pub fn handle(&self) -> ReactorHandle<S> {
        ReactorHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The stop flag, e.g. for `signal_hook::flag::register`
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.stopped)
    }

    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    pub fn handler_count(&self) -> usize {
        self.shared.handlers.lock().len()
    }

    /// Wait for readiness once and dispatch every event
    ///
    /// Returns the number of dispatches made. An interrupted wait counts as
    /// an empty round.
    pub fn run_once(&mut self, state: &mut S, timeout: Option<Duration>) -> Result<usize> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(e) => return Err(e.into()),
        }

        let shared = &*self.shared;
        let mut dispatched = 0;

        for event in self.events.iter() {
            if event.token() == WAKE_TOKEN {
                continue;
            }
            let id = HandlerId::from_token(event.token());

            // Step 1: Error or full hangup destroys the handler unseen
            if event.is_error() || (event.is_read_closed() && event.is_write_closed()) {
                debug!(index = id.index(), "Handler hung up");
                shared.deregister(id);
                continue;
            }

            // Step 2: Take the handler out; stale tokens find nothing
            let Some(mut handler) = shared.handlers.lock().checkout(id) else {
                trace!(index = id.index(), "Event for stale handler");
                continue;
            };

            // Step 3: Dispatch without holding the table lock
            let mut cx = Context {
                state: &mut *state,
                id,
                event,
                shared,
            };
            let outcome = handler.dispatch(&mut cx);
            dispatched += 1;

            // Step 4: Put it back or destroy it
            let keep = match outcome {
                Ok(keep) => keep,
                Err(e) if e.is_fatal() => {
                    error!(index = id.index(), error = %e, "Fatal error in handler");
                    shared.handlers.lock().release(id);
                    shared.destroy(id, handler);
                    return Err(e);
                }
                Err(e) => {
                    warn!(index = id.index(), error = %e, "Handler failed");
                    false
                }
            };

            if keep {
                if let Some(doomed) = shared.handlers.lock().checkin(id, handler) {
                    shared.destroy(id, doomed);
                }
            } else {
                shared.handlers.lock().release(id);
                shared.destroy(id, handler);
            }
        }

        Ok(dispatched)
    }

    /// Dispatch until stopped
    pub fn run(&mut self, state: &mut S, timeout: Option<Duration>) -> Result<()> {
        while !self.is_stopped() {
            self.run_once(state, timeout)?;
        }
        debug!("Reactor stopped");
        Ok(())
    }
}
