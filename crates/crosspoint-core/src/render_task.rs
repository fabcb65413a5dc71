//! Per-screen background render loop.
//!
//! One producer (input handling or screen entry) raises a single-slot
//! [`RenderRequest`]; the render thread polls it every tick, clears it and runs
//! one pass with the screen state locked. A burst of requests collapses into a
//! single pass. Teardown takes the same lock, so it waits for an in-flight
//! pass and no pass can start once it has begun.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::ReaderError;

/// Lock `mutex`, recovering the data if a previous holder panicked.
pub fn lock_unpoisoned<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::error!("[RENDER] Recovering poisoned lock");
        poisoned.into_inner()
    })
}

/// Coalescing "please redraw" flag.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest(Arc<AtomicBool>);

impl RenderRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct RenderTask<T: Send + 'static> {
    name: String,
    state: Arc<Mutex<T>>,
    request: RenderRequest,
    stop: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> RenderTask<T> {
    /// Start the render thread. `render` runs with `state` locked.
    pub fn spawn<F>(
        name: &str,
        state: Arc<Mutex<T>>,
        tick: Duration,
        stack_size: usize,
        mut render: F,
    ) -> Result<Self, ReaderError>
    where
        F: FnMut(&mut T) + Send + 'static,
    {
        let request = RenderRequest::new();
        let stop = Arc::new(AtomicBool::new(false));
        let busy = Arc::new(AtomicBool::new(false));

        let thread_state = Arc::clone(&state);
        let thread_request = request.clone();
        let thread_stop = Arc::clone(&stop);
        let thread_busy = Arc::clone(&busy);
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .stack_size(stack_size)
            .spawn(move || {
                log::debug!("[RENDER] {} task started", thread_name);
                while !thread_stop.load(Ordering::SeqCst) {
                    // Mark busy before clearing the request so waiters never
                    // see both flags down while a pass is about to run.
                    thread_busy.store(true, Ordering::SeqCst);
                    if thread_request.take() {
                        let mut guard = lock_unpoisoned(&thread_state);
                        if thread_stop.load(Ordering::SeqCst) {
                            thread_busy.store(false, Ordering::SeqCst);
                            break;
                        }
                        render(&mut guard);
                    }
                    thread_busy.store(false, Ordering::SeqCst);
                    thread::sleep(tick);
                }
                log::debug!("[RENDER] {} task stopped", thread_name);
            })
            .map_err(|err| ReaderError::TaskSpawn(err.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            state,
            request,
            stop,
            busy,
            handle: Some(handle),
        })
    }

    pub fn request_render(&self) {
        self.request.request();
    }

    pub fn request(&self) -> RenderRequest {
        self.request.clone()
    }

    /// Run `f` with the shared state locked.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut lock_unpoisoned(&self.state))
    }

    /// Block until no request is pending and no pass is running.
    ///
    /// Returns `false` on timeout.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.request.is_pending() && !self.busy.load(Ordering::SeqCst) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Stop the thread after any in-flight pass and join it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        {
            let _guard = lock_unpoisoned(&self.state);
            self.stop.store(true, Ordering::SeqCst);
        }
        if handle.join().is_err() {
            log::error!("[RENDER] {} task panicked", self.name);
        }
    }
}

impl<T: Send + 'static> Drop for RenderTask<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
