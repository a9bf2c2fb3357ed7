//! Socket driver traits
//!
//! This module defines the trait every socket backend implements: the
//! microcontroller's own GPIO ports, Linux GPIO lines, or the in-memory
//! simulator used by tests.

mod traits;

pub use traits::*;
