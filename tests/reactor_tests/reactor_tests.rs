//! Tests for the Reactor
//!
//! These tests verify:
//! - Readiness reaches the registered handler
//! - Handlers are destroyed exactly once, whichever path removes them
//! - Registration and deregistration from inside dispatch
//! - Fatal handler errors stop the loop
//! - Stopping from another thread wakes a blocked poll

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kvs::error::{KvsError, Result};
use kvs::reactor::{Context, Handler, Reactor};
use mio::event::Source;
use mio::net::UnixStream;
use mio::Interest;

const TIMEOUT: Option<Duration> = Some(Duration::from_secs(2));

// =============================================================================
// Test Handlers
// =============================================================================

/// What a [`Recorder`] does once it has drained its stream
#[derive(Clone, Copy)]
enum Then {
    Keep,
    Close,
    Fail,
    FailFatally,
    DeregisterSelf,
}

/// Reads everything available into the reactor state
struct Recorder {
    stream: UnixStream,
    then: Then,
    drops: Arc<AtomicUsize>,
    spawn: Option<Box<dyn Handler<Vec<u8>>>>,
}

impl Recorder {
    fn new(stream: UnixStream, then: Then, drops: &Arc<AtomicUsize>) -> Self {
        Self {
            stream,
            then,
            drops: Arc::clone(drops),
            spawn: None,
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl Handler<Vec<u8>> for Recorder {
    fn source(&mut self) -> &mut dyn Source {
        &mut self.stream
    }

    fn dispatch(&mut self, cx: &mut Context<'_, Vec<u8>>) -> Result<bool> {
        let mut buf = [0u8; 256];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Ok(false),
                Ok(n) => cx.state.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(child) = self.spawn.take() {
            cx.register(child, Interest::READABLE)?;
        }

        match self.then {
            Then::Keep => Ok(true),
            Then::Close => Ok(false),
            Then::Fail => Err(KvsError::Protocol("bad input".into())),
            Then::FailFatally => Err(KvsError::WalWrite("disk full".into())),
            Then::DeregisterSelf => {
                assert!(cx.deregister(cx.id()));
                Ok(true)
            }
        }
    }
}

fn pair() -> (UnixStream, UnixStream) {
    UnixStream::pair().unwrap()
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_readable_handler_is_dispatched() {
    let mut reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (ours, mut theirs) = pair();

    reactor
        .register(Box::new(Recorder::new(ours, Then::Keep, &drops)), Interest::READABLE)
        .unwrap();
    theirs.write_all(b"hello").unwrap();

    let mut state = Vec::new();
    let dispatched = reactor.run_once(&mut state, TIMEOUT).unwrap();

    assert_eq!(dispatched, 1);
    assert_eq!(state, b"hello");
    assert_eq!(reactor.handler_count(), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
}

#[test]
fn test_handler_closing_itself_is_destroyed() {
    let mut reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (ours, mut theirs) = pair();

    let id = reactor
        .register(Box::new(Recorder::new(ours, Then::Close, &drops)), Interest::READABLE)
        .unwrap();
    theirs.write_all(b"x").unwrap();

    reactor.run_once(&mut Vec::new(), TIMEOUT).unwrap();

    assert_eq!(reactor.handler_count(), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert!(!reactor.deregister(id));
}

#[test]
fn test_peer_hangup_destroys_once() {
    let mut reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (ours, theirs) = pair();

    reactor
        .register(Box::new(Recorder::new(ours, Then::Keep, &drops)), Interest::READABLE)
        .unwrap();
    drop(theirs);

    let mut state = Vec::new();
    reactor.run_once(&mut state, TIMEOUT).unwrap();
    reactor
        .run_once(&mut state, Some(Duration::from_millis(20)))
        .unwrap();

    assert_eq!(reactor.handler_count(), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_non_fatal_error_destroys_only_that_handler() {
    let mut reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (bad, mut bad_peer) = pair();
    let (good, _good_peer) = pair();

    reactor
        .register(Box::new(Recorder::new(bad, Then::Fail, &drops)), Interest::READABLE)
        .unwrap();
    reactor
        .register(Box::new(Recorder::new(good, Then::Keep, &drops)), Interest::READABLE)
        .unwrap();
    bad_peer.write_all(b"?").unwrap();

    let result = reactor.run_once(&mut Vec::new(), TIMEOUT);

    assert!(result.is_ok());
    assert_eq!(reactor.handler_count(), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fatal_error_is_returned() {
    let mut reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (ours, mut theirs) = pair();

    reactor
        .register(
            Box::new(Recorder::new(ours, Then::FailFatally, &drops)),
            Interest::READABLE,
        )
        .unwrap();
    theirs.write_all(b"x").unwrap();

    match reactor.run(&mut Vec::new(), TIMEOUT) {
        Err(KvsError::WalWrite(_)) => {}
        other => panic!("Expected fatal WAL error, got {:?}", other),
    }
    assert_eq!(reactor.handler_count(), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_register_from_dispatch() {
    let mut reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (parent, mut parent_peer) = pair();
    let (child, mut child_peer) = pair();

    let mut parent = Recorder::new(parent, Then::Keep, &drops);
    parent.spawn = Some(Box::new(Recorder::new(child, Then::Keep, &drops)));
    reactor.register(Box::new(parent), Interest::READABLE).unwrap();

    parent_peer.write_all(b"a").unwrap();
    let mut state = Vec::new();
    reactor.run_once(&mut state, TIMEOUT).unwrap();
    assert_eq!(reactor.handler_count(), 2);

    child_peer.write_all(b"b").unwrap();
    reactor.run_once(&mut state, TIMEOUT).unwrap();
    assert_eq!(state, b"ab");
}

#[test]
fn test_deregister_self_during_dispatch_is_deferred() {
    let mut reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (ours, mut theirs) = pair();

    reactor
        .register(
            Box::new(Recorder::new(ours, Then::DeregisterSelf, &drops)),
            Interest::READABLE,
        )
        .unwrap();
    theirs.write_all(b"x").unwrap();

    reactor.run_once(&mut Vec::new(), TIMEOUT).unwrap();

    assert_eq!(reactor.handler_count(), 0);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_external_deregister() {
    let reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (ours, _theirs) = pair();

    let id = reactor
        .register(Box::new(Recorder::new(ours, Then::Keep, &drops)), Interest::READABLE)
        .unwrap();
    let handle = reactor.handle();

    assert!(handle.deregister(id));
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    // The id is now stale
    assert!(!handle.deregister(id));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_slot_reuse_does_not_revive_stale_id() {
    let reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let drops = Arc::new(AtomicUsize::new(0));
    let (first, _first_peer) = pair();
    let (second, _second_peer) = pair();

    let old = reactor
        .register(Box::new(Recorder::new(first, Then::Keep, &drops)), Interest::READABLE)
        .unwrap();
    reactor.deregister(old);
    let new = reactor
        .register(Box::new(Recorder::new(second, Then::Keep, &drops)), Interest::READABLE)
        .unwrap();

    assert_eq!(old.index(), new.index());
    assert_ne!(old.token(), new.token());
    assert!(!reactor.deregister(old));
    assert_eq!(reactor.handler_count(), 1);
}

// =============================================================================
// Stop Tests
// =============================================================================

#[test]
fn test_stop_from_another_thread() {
    let mut reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let handle = reactor.handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.stop();
    });

    // No timeout: only the waker can end the wait
    reactor.run(&mut Vec::new(), None).unwrap();
    stopper.join().unwrap();

    assert!(reactor.is_stopped());
}

#[test]
fn test_stop_flag_is_shared() {
    let reactor: Reactor<Vec<u8>> = Reactor::new().unwrap();
    let flag = reactor.stop_flag();

    flag.store(true, Ordering::SeqCst);

    assert!(reactor.is_stopped());
    assert!(reactor.handle().is_stopped());
}
