//! Per-target route tables and controller geometry
//!
//! Every supported series instantiates the same [`Platform`] schema. The
//! resolver and manager never change between series; only the data does.
//!
//! Route tables are authoritative configuration. Some request lines are
//! reachable from more than one stream, and the tables pick the streams that
//! avoid conflicts among the peripherals in use. Don't reorder rows without
//! checking the reference manual's request mapping.
//!
//! The series is chosen at build time with the `stm32f4`, `stm32f7` or
//! `stm32l4` feature. [`DEFAULT`] and [`STREAMS`] name the selected platform.
//! `stm32l4` takes precedence over the default `stm32f4`, so L4 users don't
//! need `default-features = false`. Building with none of them is an error.

use crate::{
    descriptor::{Burst, DataSize, FifoThreshold, InitTemplate, Mode, Priority},
    hardware::Irq,
    route::{StreamId, TransferRoute},
};

pub mod stm32f4;
pub mod stm32l4;

cfg_if::cfg_if! {
    if #[cfg(feature = "stm32l4")] {
        /// Number of streams on the selected platform
        pub const STREAMS: usize = stm32l4::STREAMS;
        /// The platform selected by features
        pub static DEFAULT: &Platform<STREAMS> = &stm32l4::PLATFORM;
    } else if #[cfg(any(feature = "stm32f4", feature = "stm32f7"))] {
        /// Number of streams on the selected platform
        pub const STREAMS: usize = stm32f4::STREAMS;
        /// The platform selected by features
        pub static DEFAULT: &Platform<STREAMS> = &stm32f4::PLATFORM;
    } else {
        compile_error!("Enable one of the 'stm32f4', 'stm32f7' or 'stm32l4' features");
    }
}

/// How a controller organizes its request lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Generation {
    /// Streams, each with a channel select field (F4, F7)
    Stream,
    /// Channels, with a shared request select register (L4)
    Channel,
}

/// Preemption and sub-priority for an interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqPriority {
    pub preempt: u8,
    pub sub: u8,
}

/// Register addresses for a series
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub generation: Generation,
    pub streams_per_controller: usize,
    /// Base address of each controller
    pub controllers: [usize; 2],
    /// Offset of stream 0 from its controller's base
    pub first_stream: usize,
    /// Distance between stream register blocks
    pub stream_stride: usize,
    /// Address of the clock enable register
    pub clock_enable: usize,
    /// Clock enable bit of each controller
    pub clock_bits: [u32; 2],
}

/// A series' DMA resources and the routes onto them
#[derive(Debug)]
pub struct Platform<const STREAMS: usize> {
    pub name: &'static str,
    pub layout: Layout,
    /// Interrupt for each stream, indexed by stream id
    pub irqs: [Irq; STREAMS],
    /// Priority used for every stream interrupt
    pub irq_priority: IrqPriority,
    /// Idle ticks a controller waits before gating its clock
    pub idle_tick_max: u8,
    pub routes: &'static [TransferRoute],
}

/// Number of DMA controllers on every supported series
pub const CONTROLLERS: usize = 2;

impl<const STREAMS: usize> Platform<STREAMS> {
    /// Returns the controller that owns `stream`
    pub const fn controller(&self, stream: StreamId) -> usize {
        stream.index() / self.layout.streams_per_controller
    }

    /// Position of `stream` within its controller
    pub const fn stream_in_controller(&self, stream: StreamId) -> usize {
        stream.index() % self.layout.streams_per_controller
    }

    /// Enable mask bits belonging to `controller`
    pub const fn controller_mask(&self, controller: usize) -> u32 {
        let per = self.layout.streams_per_controller as u32;
        ((1 << per) - 1) << (per * controller as u32)
    }

    /// Streams belonging to `controller`
    pub fn streams_of(&self, controller: usize) -> impl Iterator<Item = StreamId> {
        let per = self.layout.streams_per_controller;
        (controller * per..(controller + 1) * per).map(|idx| StreamId::new(idx as u8))
    }

    pub const fn irq(&self, stream: StreamId) -> Irq {
        self.irqs[stream.index()]
    }
}

/// Shared by SPI and I2C
///
/// Channel and direction vary by peripheral instance and come from the route.
pub const SPI_I2C: InitTemplate = InitTemplate {
    peripheral_increment: false,
    memory_increment: true,
    peripheral_size: DataSize::Byte,
    memory_size: DataSize::Byte,
    mode: Mode::Normal,
    priority: Priority::Low,
    fifo: None,
    memory_burst: Burst::Incr4,
    peripheral_burst: Burst::Incr4,
};

/// Stream-based SDIO, with peripheral flow control and FIFO
pub const SDIO_STREAM: InitTemplate = InitTemplate {
    peripheral_increment: false,
    memory_increment: true,
    peripheral_size: DataSize::Word,
    memory_size: DataSize::Word,
    mode: Mode::PeripheralFlowControl,
    priority: Priority::VeryHigh,
    fifo: Some(FifoThreshold::Full),
    memory_burst: Burst::Incr4,
    peripheral_burst: Burst::Incr4,
};

/// Channel-based SDIO
pub const SDIO_CHANNEL: InitTemplate = InitTemplate {
    peripheral_increment: false,
    memory_increment: true,
    peripheral_size: DataSize::Word,
    memory_size: DataSize::Word,
    mode: Mode::Normal,
    priority: Priority::VeryHigh,
    fifo: None,
    memory_burst: Burst::Single,
    peripheral_burst: Burst::Single,
};
