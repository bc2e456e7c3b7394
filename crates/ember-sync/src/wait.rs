//! Blocking wait/notify on atomic channel words.
//!
//! Two backends sit behind one interface: a native futex wait on Linux and a
//! bounded ~10ms polling loop everywhere else (or when the probe fails). The
//! backend is chosen once per process; callers cannot tell which is active.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Result of waiting on a word, mirroring the platform wait primitive:
/// `NotEqual` when the value already differed before sleeping, `Ok` when the
/// sleeper observed a change, `TimedOut` when the budget elapsed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Ok,
    NotEqual,
    TimedOut,
}

impl WaitOutcome {
    /// True when the word is known to differ from the expected value.
    pub fn changed(self) -> bool {
        matches!(self, WaitOutcome::Ok | WaitOutcome::NotEqual)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    Futex,
    Poll,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

static BACKEND: OnceLock<Backend> = OnceLock::new();

fn backend() -> Backend {
    *BACKEND.get_or_init(probe)
}

#[cfg(target_os = "linux")]
fn probe() -> Backend {
    // A wait against a mismatched expected value returns EAGAIN immediately
    // when the syscall exists at all.
    let word = AtomicI32::new(0);
    let rc = unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            1i32,
            std::ptr::null::<libc::timespec>(),
        )
    };
    if rc == -1 && last_errno() == libc::ENOSYS {
        Backend::Poll
    } else {
        Backend::Futex
    }
}

#[cfg(not(target_os = "linux"))]
fn probe() -> Backend {
    Backend::Poll
}

#[cfg(target_os = "linux")]
fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Blocks until `word` differs from `expected`, or `timeout` elapses.
/// `None` waits without bound.
pub fn wait(word: &AtomicI32, expected: i32, timeout: Option<Duration>) -> WaitOutcome {
    if word.load(Ordering::SeqCst) != expected {
        return WaitOutcome::NotEqual;
    }
    match backend() {
        #[cfg(target_os = "linux")]
        Backend::Futex => futex_wait(word, expected, timeout),
        #[cfg(not(target_os = "linux"))]
        Backend::Futex => poll_wait(word, expected, timeout),
        Backend::Poll => poll_wait(word, expected, timeout),
    }
}

/// Wakes every thread blocked on `word`. A no-op for pollers, which notice
/// the change on their next tick.
pub fn wake_all(word: &AtomicI32) {
    #[cfg(target_os = "linux")]
    if backend() == Backend::Futex {
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                word.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                i32::MAX,
            );
        }
        return;
    }
    let _ = word;
}

#[cfg(target_os = "linux")]
fn futex_wait(word: &AtomicI32, expected: i32, timeout: Option<Duration>) -> WaitOutcome {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        if word.load(Ordering::SeqCst) != expected {
            return WaitOutcome::Ok;
        }
        let remaining = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) if !left.is_zero() => Some(left),
                _ => return WaitOutcome::TimedOut,
            },
            None => None,
        };
        let ts = remaining.map(|left| libc::timespec {
            tv_sec: left.as_secs() as libc::time_t,
            tv_nsec: left.subsec_nanos() as libc::c_long,
        });
        let ts_ptr = ts
            .as_ref()
            .map_or(std::ptr::null(), |ts| ts as *const libc::timespec);
        let rc = unsafe {
            libc::syscall(
                libc::SYS_futex,
                word.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                expected,
                ts_ptr,
            )
        };
        if rc == -1 {
            match last_errno() {
                // Value changed between the check and the sleep.
                libc::EAGAIN => return WaitOutcome::Ok,
                libc::ETIMEDOUT => return WaitOutcome::TimedOut,
                // EINTR: retry with the remaining budget.
                _ => {}
            }
        }
        // Woken (possibly spuriously): loop re-checks the word.
    }
}

fn poll_wait(word: &AtomicI32, expected: i32, timeout: Option<Duration>) -> WaitOutcome {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        if word.load(Ordering::SeqCst) != expected {
            return WaitOutcome::Ok;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return WaitOutcome::TimedOut;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn mismatched_value_returns_not_equal_without_sleeping() {
        let word = AtomicI32::new(5);
        let start = Instant::now();
        let outcome = wait(&word, 4, Some(Duration::from_secs(2)));
        assert_eq!(outcome, WaitOutcome::NotEqual);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn times_out_when_nothing_changes() {
        let word = AtomicI32::new(0);
        let start = Instant::now();
        let outcome = wait(&word, 0, Some(Duration::from_millis(80)));
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn store_plus_wake_releases_a_sleeper() {
        let word = Arc::new(AtomicI32::new(0));
        let sleeper = {
            let word = Arc::clone(&word);
            std::thread::spawn(move || wait(&word, 0, Some(Duration::from_secs(5))))
        };
        std::thread::sleep(Duration::from_millis(30));
        word.store(1, Ordering::SeqCst);
        wake_all(&word);
        assert!(sleeper.join().unwrap().changed());
    }
}
