//! Process lifecycle: the keep-going flag, exit requests and the SIGINT hook.
//!
//! `Lifecycle` is an ordinary shared object. The only global state is the
//! pointer the signal trampoline uses to find it, because the OS handler
//! receives no user data.

use crate::error::{DisplayError, DisplayResult};
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Interrupts beyond this many terminate the process immediately
pub const MAX_GRACEFUL_INTERRUPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Keep-going was cleared; the exit request goes out with the next present
    Graceful,
    /// Shutdown is not happening, give up
    HardExit,
}

#[derive(Debug)]
pub struct Lifecycle {
    keep_going: AtomicBool,
    exit_pending: AtomicBool,
    interrupts: AtomicU32,
}

impl Lifecycle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            keep_going: AtomicBool::new(true),
            exit_pending: AtomicBool::new(false),
            interrupts: AtomicU32::new(0),
        })
    }

    /// False once anything has asked the application to stop
    #[inline]
    pub fn keep_going(&self) -> bool {
        self.keep_going.load(Ordering::SeqCst)
    }

    /// Clear keep-going and queue an exit event for the next present
    pub fn request_exit(&self) {
        self.keep_going.store(false, Ordering::SeqCst);
        self.exit_pending.store(true, Ordering::SeqCst);
    }

    /// Take the queued exit event, if any
    pub fn take_exit_request(&self) -> bool {
        self.exit_pending.swap(false, Ordering::SeqCst)
    }

    /// Count an interrupt and decide what to do about it. Signal safe.
    pub fn interrupt(&self) -> InterruptAction {
        let count = self.interrupts.fetch_add(1, Ordering::SeqCst) + 1;
        if count > MAX_GRACEFUL_INTERRUPTS {
            return InterruptAction::HardExit;
        }
        self.request_exit();
        InterruptAction::Graceful
    }

    pub fn interrupt_count(&self) -> u32 {
        self.interrupts.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SIGINT trampoline
// ============================================================================

static ACTIVE: AtomicPtr<Lifecycle> = AtomicPtr::new(ptr::null_mut());
static CHAINED: AtomicUsize = AtomicUsize::new(0);
static CHAINED_KIND: AtomicU8 = AtomicU8::new(CHAIN_NONE);

const CHAIN_NONE: u8 = 0;
const CHAIN_HANDLER: u8 = 1;
const CHAIN_SIGINFO: u8 = 2;

type InfoHandler = extern "C" fn(libc::c_int, *mut libc::siginfo_t, *mut libc::c_void);

extern "C" fn on_interrupt(signum: libc::c_int, info: *mut libc::siginfo_t, context: *mut libc::c_void) {
    let chained = CHAINED.load(Ordering::SeqCst);
    match CHAINED_KIND.load(Ordering::SeqCst) {
        CHAIN_HANDLER if chained != 0 => {
            // Stored from a SigHandler::Handler, so it is a valid handler pointer.
            let previous: extern "C" fn(libc::c_int) = unsafe { std::mem::transmute(chained) };
            previous(signum);
        },
        CHAIN_SIGINFO if chained != 0 => {
            // Stored from a SigHandler::SigAction; this handler runs with SA_SIGINFO too.
            let previous: InfoHandler = unsafe { std::mem::transmute(chained) };
            previous(signum, info, context);
        },
        _ => {},
    }

    let state = ACTIVE.load(Ordering::SeqCst);
    if state.is_null() {
        return;
    }
    // The guard that published this pointer keeps the Arc alive until it is cleared.
    if unsafe { &*state }.interrupt() == InterruptAction::HardExit {
        unsafe { libc::_exit(1) };
    }
}

/// Routes SIGINT into a `Lifecycle` while alive. Any handler that was already
/// installed is called first, and is put back on drop.
pub struct InterruptGuard {
    state: Arc<Lifecycle>,
    previous: SigAction,
}

impl InterruptGuard {
    pub fn install(state: Arc<Lifecycle>) -> DisplayResult<Self> {
        let raw = Arc::as_ptr(&state).cast_mut();
        if ACTIVE
            .compare_exchange(ptr::null_mut(), raw, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DisplayError::Signal(Errno::EBUSY));
        }

        let action = SigAction::new(SigHandler::SigAction(on_interrupt), SaFlags::SA_SIGINFO, SigSet::empty());
        let previous = match unsafe { signal::sigaction(Signal::SIGINT, &action) } {
            Ok(previous) => previous,
            Err(e) => {
                ACTIVE.store(ptr::null_mut(), Ordering::SeqCst);
                return Err(e.into());
            },
        };

        let (kind, chained) = match previous.handler() {
            SigHandler::Handler(f) => (CHAIN_HANDLER, f as usize),
            SigHandler::SigAction(f) => (CHAIN_SIGINFO, f as usize),
            SigHandler::SigDfl | SigHandler::SigIgn => (CHAIN_NONE, 0),
        };
        CHAINED.store(chained, Ordering::SeqCst);
        CHAINED_KIND.store(kind, Ordering::SeqCst);
        log::debug!("SIGINT handler installed (chaining: {})", kind != CHAIN_NONE);

        Ok(Self { state, previous })
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.state
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Err(e) = unsafe { signal::sigaction(Signal::SIGINT, &self.previous) } {
            log::warn!("Failed to restore SIGINT handler: {}", e);
        }
        CHAINED_KIND.store(CHAIN_NONE, Ordering::SeqCst);
        CHAINED.store(0, Ordering::SeqCst);
        ACTIVE.store(ptr::null_mut(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_exit_is_delivered_once() {
        let state = Lifecycle::new();
        assert!(state.keep_going());
        assert!(!state.take_exit_request());

        state.request_exit();
        assert!(!state.keep_going());
        assert!(state.take_exit_request());
        assert!(!state.take_exit_request());
    }

    #[test]
    fn test_third_interrupt_escalates() {
        let state = Lifecycle::new();
        assert_eq!(state.interrupt(), InterruptAction::Graceful);
        assert!(!state.keep_going());
        assert_eq!(state.interrupt(), InterruptAction::Graceful);
        assert_eq!(state.interrupt(), InterruptAction::HardExit);
        assert_eq!(state.interrupt_count(), 3);
    }

    static USER_HANDLER_CALLS: AtomicU32 = AtomicU32::new(0);

    static USER_SIGINFO_CALLS: AtomicU32 = AtomicU32::new(0);

    extern "C" fn user_handler(_: libc::c_int) {
        USER_HANDLER_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn user_siginfo_handler(signum: libc::c_int, info: *mut libc::siginfo_t, _: *mut libc::c_void) {
        if signum == libc::SIGINT && !info.is_null() {
            USER_SIGINFO_CALLS.fetch_add(1, Ordering::SeqCst);
        }
    }

    // The only test that touches the real SIGINT disposition.
    #[test]
    fn test_signal_chains_and_restores() {
        let users = [
            SigAction::new(SigHandler::Handler(user_handler), SaFlags::empty(), SigSet::empty()),
            SigAction::new(SigHandler::SigAction(user_siginfo_handler), SaFlags::SA_SIGINFO, SigSet::empty()),
        ];
        let original = unsafe { signal::sigaction(Signal::SIGINT, &users[0]) }.unwrap();

        for user in users {
            unsafe { signal::sigaction(Signal::SIGINT, &user) }.unwrap();

            let state = Lifecycle::new();
            let guard = InterruptGuard::install(Arc::clone(&state)).unwrap();
            assert!(InterruptGuard::install(Lifecycle::new()).is_err());

            signal::raise(Signal::SIGINT).unwrap();
            assert!(!state.keep_going());
            assert!(state.take_exit_request());
            assert_eq!(guard.lifecycle().interrupt_count(), 1);

            drop(guard);
            let current = unsafe { signal::sigaction(Signal::SIGINT, &user) }.unwrap();
            assert_eq!(current.handler(), user.handler());
        }
        assert_eq!(USER_HANDLER_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(USER_SIGINFO_CALLS.load(Ordering::SeqCst), 1);

        unsafe { signal::sigaction(Signal::SIGINT, &original) }.unwrap();
    }
}
