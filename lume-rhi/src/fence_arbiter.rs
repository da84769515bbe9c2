//! Fence arbiter (C1): a dedicated thread that polls in-flight fences so callers never block
//! the render thread on `waitForFences`.
//!
//! Grounded on `original_source/Core/Framework/Private/Vulkan/GraphicsDevice.{h,cpp}`'s fence
//! pump: pending fences are polled with a zero timeout on a cadence, ready ones are reset in
//! bulk and handed back to a reuse pool, and their completion callbacks run on the arbiter
//! thread rather than the submitter's.

use crate::Fence;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// A fence plus the callback to invoke once it signals.
struct Entry {
    fence: Box<dyn Fence>,
    callback: Box<dyn FnOnce() + Send>,
}

struct Shared {
    pending: Vec<Entry>,
    reusable: Vec<Box<dyn Fence>>,
    stop: bool,
}

/// Handle to the background polling thread. Dropping it requests a stop and joins.
pub struct FenceArbiter {
    shared: Arc<(Mutex<Shared>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl FenceArbiter {
    /// Spawns the polling thread. `poll_interval` is how long the thread sleeps between passes
    /// when nothing was ready (`EngineConfig::fence_poll_interval`, ~2ms by default).
    pub fn spawn(poll_interval: Duration) -> Self {
        let shared = Arc::new((
            Mutex::new(Shared {
                pending: Vec::new(),
                reusable: Vec::new(),
                stop: false,
            }),
            Condvar::new(),
        ));
        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("lume-fence-arbiter".to_string())
            .spawn(move || run(worker_shared, poll_interval))
            .expect("failed to spawn fence arbiter thread");
        log::info!("fence arbiter thread started (poll_interval={:?})", poll_interval);
        Self { shared, handle: Some(handle) }
    }

    /// Hands the fence to the arbiter; `callback` runs on the arbiter thread once it signals.
    pub fn watch(&self, fence: Box<dyn Fence>, callback: impl FnOnce() + Send + 'static) {
        let (mutex, condvar) = &*self.shared;
        let mut shared = mutex.lock().expect("fence arbiter mutex poisoned");
        shared.pending.push(Entry { fence, callback: Box::new(callback) });
        condvar.notify_one();
    }

    /// Takes a previously-signaled, reset fence out of the reuse pool, if one is available.
    pub fn take_reusable(&self) -> Option<Box<dyn Fence>> {
        let (mutex, _) = &*self.shared;
        mutex.lock().expect("fence arbiter mutex poisoned").reusable.pop()
    }
}

impl Drop for FenceArbiter {
    fn drop(&mut self) {
        {
            let (mutex, condvar) = &*self.shared;
            let mut shared = mutex.lock().expect("fence arbiter mutex poisoned");
            shared.stop = true;
            condvar.notify_one();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        log::info!("fence arbiter thread stopped");
    }
}

fn run(shared: Arc<(Mutex<Shared>, Condvar)>, poll_interval: Duration) {
    let (mutex, condvar) = &*shared;
    let mut waiting: Vec<Entry> = Vec::new();

    loop {
        let (newly_pending, should_stop) = {
            let mut guard = mutex.lock().expect("fence arbiter mutex poisoned");
            (std::mem::take(&mut guard.pending), guard.stop)
        };
        waiting.extend(newly_pending);

        if waiting.is_empty() {
            if should_stop {
                return;
            }
            let guard = mutex.lock().expect("fence arbiter mutex poisoned");
            let _ = condvar.wait_timeout(guard, poll_interval);
            continue;
        }

        let mut still_waiting = Vec::with_capacity(waiting.len());
        let mut ready = Vec::new();
        for entry in waiting.drain(..) {
            match entry.fence.wait(0) {
                Ok(()) => ready.push(entry),
                Err(_) => still_waiting.push(entry),
            }
        }
        waiting = still_waiting;

        if !ready.is_empty() {
            let mut reused = Vec::with_capacity(ready.len());
            for entry in ready {
                if let Err(e) = entry.fence.reset() {
                    log::warn!("fence arbiter: failed to reset signaled fence: {e}");
                }
                (entry.callback)();
                reused.push(entry.fence);
            }
            let mut guard = mutex.lock().expect("fence arbiter mutex poisoned");
            guard.reusable.extend(reused);
            continue;
        }

        if waiting.is_empty() && should_stop {
            return;
        }
        let guard = mutex.lock().expect("fence arbiter mutex poisoned");
        if guard.stop && waiting.is_empty() {
            return;
        }
        let _ = condvar.wait_timeout(guard, poll_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[derive(Debug)]
    struct TestFence {
        signaled: Arc<AtomicBool>,
        reset_count: Arc<AtomicUsize>,
    }

    impl Fence for TestFence {
        fn wait(&self, _timeout_ns: u64) -> Result<(), String> {
            if self.signaled.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err("not signaled".to_string())
            }
        }
        fn reset(&self) -> Result<(), String> {
            self.reset_count.fetch_add(1, Ordering::SeqCst);
            self.signaled.store(false, Ordering::SeqCst);
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn callback_fires_once_fence_signals() {
        let arbiter = FenceArbiter::spawn(Duration::from_millis(1));
        let signaled = Arc::new(AtomicBool::new(false));
        let reset_count = Arc::new(AtomicUsize::new(0));
        let fence = Box::new(TestFence { signaled: Arc::clone(&signaled), reset_count: Arc::clone(&reset_count) });

        let (tx, rx) = mpsc::channel();
        arbiter.watch(fence, move || {
            let _ = tx.send(());
        });

        std::thread::sleep(Duration::from_millis(5));
        assert!(rx.try_recv().is_err(), "callback must not fire before the fence signals");

        signaled.store(true, Ordering::SeqCst);
        rx.recv_timeout(Duration::from_secs(1)).expect("callback should fire after signaling");
        assert_eq!(reset_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reused_fence_is_returned_to_the_pool() {
        let arbiter = FenceArbiter::spawn(Duration::from_millis(1));
        let signaled = Arc::new(AtomicBool::new(true));
        let reset_count = Arc::new(AtomicUsize::new(0));
        let fence = Box::new(TestFence { signaled, reset_count });
        arbiter.watch(fence, || {});
        let mut got = None;
        for _ in 0..200 {
            if let Some(f) = arbiter.take_reusable() {
                got = Some(f);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(got.is_some());
    }
}
