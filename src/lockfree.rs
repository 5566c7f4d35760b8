//! Lock-free primitives shared between the audio thread and control threads.

use atomic_float::AtomicF64;
use std::sync::atomic::{AtomicI64, Ordering};

/// Cache-line aligned atomic f64.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicDouble {
    value: AtomicF64,
}

impl AtomicDouble {
    pub fn new(value: f64) -> Self {
        Self {
            value: AtomicF64::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn get_relaxed(&self) -> f64 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: f64) -> f64 {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Clone for AtomicDouble {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicDouble {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic microsecond count.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicMicros {
    value: AtomicI64,
}

impl AtomicMicros {
    pub fn new(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: i64) -> i64 {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Clone for AtomicMicros {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl Default for AtomicMicros {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_double_roundtrip() {
        let value = AtomicDouble::new(1.5);
        assert!((value.get() - 1.5).abs() < f64::EPSILON);
        value.set(-3.25);
        assert!((value.get() + 3.25).abs() < f64::EPSILON);
        assert!((value.swap(0.5) + 3.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_atomic_micros_roundtrip() {
        let value = AtomicMicros::new(0);
        value.set(-12_000);
        assert_eq!(value.get(), -12_000);
        assert_eq!(value.swap(7), -12_000);
        assert_eq!(value.get(), 7);
    }
}
