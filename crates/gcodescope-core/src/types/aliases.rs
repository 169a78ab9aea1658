//! Type aliases for commonly used complex types.
//!
//! Host callbacks and state shared between the pipeline and its host are
//! spelled out here once so the visualizer crate reads `DataCallback<LayerInfo>`
//! instead of the boxed closure type.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gcodescope_core::types::*;
//!
//! let seen: ThreadSafeVec<f64> = thread_safe_vec();
//! let sink = seen.clone();
//! let on_value: DataCallback<f64> = Box::new(move |v| sink.lock().push(v));
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

// =============================================================================
// THREAD-SAFE SHARED TYPES (Arc<Mutex<T>>)
// =============================================================================

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe vector for cross-thread collection management.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// A callback that receives a single parameter.
///
/// Thread-safe, suitable for cross-thread data notification.
pub type DataCallback<T> = Box<dyn Fn(T) + Send + Sync>;

/// A callback that receives two parameters.
pub type DataCallback2<T, U> = Box<dyn Fn(T, U) + Send + Sync>;

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Wrap a value for cross-thread sharing.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create an empty thread-safe vector.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_writes_into_shared_vec() {
        let seen: ThreadSafeVec<u32> = thread_safe_vec();
        let sink = seen.clone();
        let cb: DataCallback<u32> = Box::new(move |v| sink.lock().push(v));
        cb(3);
        cb(5);
        assert_eq!(*seen.lock(), vec![3, 5]);
    }

    #[test]
    fn test_two_arg_callback() {
        let total = thread_safe(0.0_f64);
        let sink = total.clone();
        let cb: DataCallback2<f64, f64> = Box::new(move |a, b| *sink.lock() += a * b);
        cb(2.0, 4.0);
        assert_eq!(*total.lock(), 8.0);
    }
}
