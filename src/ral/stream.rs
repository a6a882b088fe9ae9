//! Stream-based controllers (F4, F7)

use super::{RORegister, RWRegister, WORegister};

/// One stream's registers
#[repr(C)]
pub struct RegisterBlock {
    /// Configuration register
    pub CR: RWRegister<u32>,
    /// Number of data items
    pub NDTR: RWRegister<u32>,
    /// Peripheral address
    pub PAR: RWRegister<u32>,
    /// Memory 0 address
    pub M0AR: RWRegister<u32>,
    /// Memory 1 address
    pub M1AR: RWRegister<u32>,
    /// FIFO control register
    pub FCR: RWRegister<u32>,
}

const _: () = assert!(core::mem::size_of::<RegisterBlock>() == 0x18);

pub mod CR {
    fields! {
        EN: 0, 1;
        DMEIE: 1, 1;
        TEIE: 2, 1;
        HTIE: 3, 1;
        TCIE: 4, 1;
        PFCTRL: 5, 1;
        DIR: 6, 2;
        CIRC: 8, 1;
        PINC: 9, 1;
        MINC: 10, 1;
        PSIZE: 11, 2;
        MSIZE: 13, 2;
        PL: 16, 2;
        PBURST: 21, 2;
        MBURST: 23, 2;
        CHSEL: 25, 4;
    }
}

pub mod FCR {
    fields! {
        FTH: 0, 2;
        DMDIS: 2, 1;
    }
}

/// `FCR` out of reset
pub const FCR_RESET: u32 = 0x21;

/// Interrupt status and clear registers, at the controller's base
///
/// Streams 0 to 3 use the low registers, streams 4 to 7 the high ones.
#[repr(C)]
pub struct Flags {
    pub LISR: RORegister<u32>,
    pub HISR: RORegister<u32>,
    pub LIFCR: WORegister<u32>,
    pub HIFCR: WORegister<u32>,
}

pub const FEIF: u32 = 1 << 0;
pub const DMEIF: u32 = 1 << 2;
pub const TEIF: u32 = 1 << 3;
pub const HTIF: u32 = 1 << 4;
pub const TCIF: u32 = 1 << 5;
pub const ALL_FLAGS: u32 = FEIF | DMEIF | TEIF | HTIF | TCIF;

/// Position of a stream's flags within its status register
pub const fn flag_shift(stream: usize) -> u32 {
    const SHIFTS: [u32; 4] = [0, 6, 16, 22];
    SHIFTS[stream % 4]
}

impl Flags {
    /// Read `stream`'s flags, shifted down to bit 0
    pub fn status(&self, stream: usize) -> u32 {
        let isr = if stream < 4 {
            self.LISR.read()
        } else {
            self.HISR.read()
        };
        (isr >> flag_shift(stream)) & ALL_FLAGS
    }

    /// Clear `flags`, given relative to bit 0, for `stream`
    pub fn clear(&self, stream: usize, flags: u32) {
        let bits = (flags & ALL_FLAGS) << flag_shift(stream);
        if stream < 4 {
            self.LIFCR.write(bits);
        } else {
            self.HIFCR.write(bits);
        }
    }
}
