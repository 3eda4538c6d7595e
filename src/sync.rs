//! Synchronization building blocks shared by the menu and test loops.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::bitmap::Bitmap;
use crate::error::{Error, HardwareError};
use crate::hardware::OledDisplay;

// =============================================================================
// Shared Display
// =============================================================================

/// The OLED behind a single exclusive guard.
///
/// Every writer goes through [`SharedDisplay::show`] or [`SharedDisplay::blank`],
/// each of which holds the guard for exactly one clear/draw/flush sequence.
#[derive(Clone)]
pub struct SharedDisplay {
    inner: Arc<Mutex<Box<dyn OledDisplay>>>,
}

impl SharedDisplay {
    /// Wrap a display driver.
    pub fn new(display: impl OledDisplay + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(display))),
        }
    }

    /// Replace the screen contents with `image`.
    pub fn show(&self, image: &Bitmap) -> Result<(), HardwareError> {
        let mut display = self.lock();
        display.clear();
        display.set_image(image);
        display.display()
    }

    /// Clear the screen.
    pub fn blank(&self) -> Result<(), HardwareError> {
        let mut display = self.lock();
        display.clear();
        display.display()
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn OledDisplay>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Stop Flag
// =============================================================================

/// A cooperative stop signal whose sleeps wake up as soon as it is raised.
#[derive(Clone, Default)]
pub struct StopFlag {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopFlag {
    /// A lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake every sleeper.
    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    /// Lower the flag so it can be reused.
    pub fn reset(&self) {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Whether the flag is raised.
    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `duration` or until stopped. Returns `true` if stopped.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = cvar
            .wait_timeout_while(guard, duration, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}

// =============================================================================
// Clock and Navigation Window
// =============================================================================

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Debounce for user navigation, kept as a "navigating until" deadline.
///
/// Re-arming replaces the previous deadline, so there is never more than one
/// pending expiry.
#[derive(Debug)]
pub struct NavigationWindow {
    quiet: Duration,
    until: Mutex<Option<Instant>>,
}

impl NavigationWindow {
    /// A window lasting `quiet` after each press.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            until: Mutex::new(None),
        }
    }

    /// Mark navigation as active for the next quiet period starting at `now`.
    pub fn arm(&self, now: Instant) {
        let mut until = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        if until.is_some() {
            debug!("navigation window re-armed");
        } else {
            debug!("navigation started, pausing bluetooth updates");
        }
        *until = Some(now + self.quiet);
    }

    /// Whether navigation is still active at `now`. Expired deadlines are cleared.
    pub fn is_active(&self, now: Instant) -> bool {
        let mut until = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        match *until {
            Some(deadline) if now < deadline => true,
            Some(_) => {
                debug!("navigation ended, resuming bluetooth updates");
                *until = None;
                false
            }
            None => false,
        }
    }

    /// Drop any pending deadline.
    pub fn cancel(&self) {
        *self.until.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// =============================================================================
// Background Task
// =============================================================================

/// A named thread with its own [`StopFlag`], joined when dropped.
pub struct BackgroundTask {
    name: String,
    stop: StopFlag,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundTask {
    /// Spawn `body` on a new thread. The body must return once its flag is raised.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the OS refuses to create the thread.
    pub fn spawn<F>(name: &str, body: F) -> Result<Self, Error>
    where
        F: FnOnce(StopFlag) + Send + 'static,
    {
        let stop = StopFlag::new();
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))?;
        debug!("spawned {name} thread");

        Ok(Self {
            name: name.to_string(),
            stop,
            handle: Some(handle),
        })
    }

    /// Whether the thread has not exited yet.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop_and_join(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} thread panicked", self.name);
            } else {
                debug!("{} thread joined", self.name);
            }
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
