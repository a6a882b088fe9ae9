//! A RAL-like module for DMA stream and channel registers
//!
//! Stream register blocks repeat at a fixed stride within each controller,
//! and the interrupt flags for every stream share a few controller registers.
//! Neither maps well onto a per-peripheral RAL instance, so the blocks are
//! described here and reached through [`Static`] pointers. The RAL macros
//! still work on them.

#![allow(
    non_snake_case, // Compatibility with RAL
    non_upper_case_globals,
    unused, // Not every field is programmed
)]

pub use ral_registers::{modify_reg, read_reg, write_reg};
use ral_registers::{RORegister, RWRegister, WORegister};

/// Define RAL field modules for a register
///
/// Each entry is `FIELD: offset, width`.
macro_rules! fields {
    ($($field:ident: $offset:expr, $width:expr;)+) => {
        $(
            pub mod $field {
                pub const offset: u32 = $offset;
                pub const mask: u32 = (((1u64 << $width) - 1) << $offset) as u32;
                pub mod R {}
                pub mod W {}
                pub mod RW {}
            }
        )+
    };
}

pub mod channel;
pub mod stream;

//
// Helper types for static memory
//

pub(crate) struct Static<T>(pub(crate) *const T);
impl<T> core::ops::Deref for Static<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        // Safety: pointer points to static memory (peripheral memory)
        unsafe { &*self.0 }
    }
}
impl<T> Clone for Static<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Static<T> {}

/// A single register at a fixed address, like a clock enable register
pub(crate) type Register = Static<RWRegister<u32>>;
