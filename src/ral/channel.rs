//! Channel-based controllers (L4)

use super::{RORegister, RWRegister, WORegister};

/// One channel's registers
#[repr(C)]
pub struct RegisterBlock {
    /// Configuration register
    pub CCR: RWRegister<u32>,
    /// Number of data items
    pub CNDTR: RWRegister<u32>,
    /// Peripheral address
    pub CPAR: RWRegister<u32>,
    /// Memory address
    pub CMAR: RWRegister<u32>,
}

pub mod CCR {
    fields! {
        EN: 0, 1;
        TCIE: 1, 1;
        HTIE: 2, 1;
        TEIE: 3, 1;
        DIR: 4, 1;
        CIRC: 5, 1;
        PINC: 6, 1;
        MINC: 7, 1;
        PSIZE: 8, 2;
        MSIZE: 10, 2;
        PL: 12, 2;
    }
}

/// Controller-wide registers
#[repr(C)]
pub struct Controller {
    pub ISR: RORegister<u32>,
    pub IFCR: WORegister<u32>,
    _reserved: [u32; 40],
    /// Request selection, four bits per channel
    pub CSELR: RWRegister<u32>,
}

const _: () = assert!(core::mem::offset_of!(Controller, CSELR) == 0xA8);

pub const GIF: u32 = 1 << 0;
pub const TCIF: u32 = 1 << 1;
pub const HTIF: u32 = 1 << 2;
pub const TEIF: u32 = 1 << 3;
pub const ALL_FLAGS: u32 = GIF | TCIF | HTIF | TEIF;

impl Controller {
    /// Read `channel`'s flags, shifted down to bit 0
    pub fn status(&self, channel: usize) -> u32 {
        (self.ISR.read() >> (4 * channel)) & ALL_FLAGS
    }

    /// Clear `flags`, given relative to bit 0, for `channel`
    pub fn clear(&self, channel: usize, flags: u32) {
        self.IFCR.write((flags & ALL_FLAGS) << (4 * channel));
    }

    /// Route `request` to `channel`
    pub fn select(&self, channel: usize, request: u8) {
        let shift = 4 * channel;
        let cselr = self.CSELR.read() & !(0xF << shift);
        self.CSELR.write(cselr | (u32::from(request) & 0xF) << shift);
    }
}
