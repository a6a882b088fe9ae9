//! Transfer routes
//!
//! A route maps a logical transfer request, described by a [`RouteKey`], onto
//! a physical DMA stream and the request line that stream listens to. Routes
//! are compiled into each [`Platform`](crate::platform::Platform) as a table.
//!
//! Several rows may name the same physical stream. That's fine as long as the
//! peripherals sharing the stream never transfer at the same time; resolution
//! performs no conflict detection. Row order encodes preference, and the first
//! exact match wins.
//!
//! ```
//! use stm32_dma_streams::route::{self, Direction, Periphery, RouteKey};
//! use stm32_dma_streams::platform::stm32f4;
//!
//! let key = RouteKey::new(Periphery::Spi, 1, Direction::PeripheralToMemory);
//! let route = route::resolve(stm32f4::PLATFORM.routes, &key).unwrap();
//! assert_eq!(route.stream.index(), 10);
//! assert_eq!(route.sub_channel.raw(), 3);
//! ```

use crate::descriptor::InitTemplate;
use core::fmt::{self, Display};

/// The kind of peripheral requesting a DMA transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Periphery {
    Spi,
    I2c,
    Dac,
    Adc,
    Sdio,
}

/// The direction of a peripheral transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// The peripheral supplies data, memory receives it ("RX")
    PeripheralToMemory,
    /// Memory supplies data, the peripheral receives it ("TX")
    MemoryToPeripheral,
}

/// A logical transfer request
///
/// `instance` is the peripheral's instance number as it appears in the
/// reference manual, so SPI1 is `1`. The one exception is SDIO on F4 parts,
/// which has a single, unnumbered instance `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RouteKey {
    pub periphery: Periphery,
    pub instance: u8,
    pub direction: Direction,
}

impl RouteKey {
    pub const fn new(periphery: Periphery, instance: u8, direction: Direction) -> Self {
        RouteKey {
            periphery,
            instance,
            direction,
        }
    }
}

impl Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::PeripheralToMemory => "rx",
            Direction::MemoryToPeripheral => "tx",
        };
        write!(f, "{:?}{} {}", self.periphery, self.instance, direction)
    }
}

/// Index of a physical DMA stream (or channel)
///
/// Stream identifiers count up across controllers. On a part with eight
/// streams per controller, `StreamId(9)` is DMA2 stream 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamId(u8);

impl StreamId {
    pub const fn new(index: u8) -> Self {
        StreamId(index)
    }
    /// Returns the stream index, usable as an array index
    pub const fn index(self) -> usize {
        self.0 as usize
    }
    /// Returns this stream's bit in an enable mask
    pub const fn mask(self) -> u32 {
        1 << self.0
    }
}

/// The request multiplexer value for a stream
///
/// This is `CHSEL` on stream-based controllers and the `CSELR` request number
/// on channel-based controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubChannel(u8);

impl SubChannel {
    pub const fn new(raw: u8) -> Self {
        SubChannel(raw)
    }
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Address of a stream's register block
///
/// This is what a driver holds on to during teardown. It maps back to a
/// [`StreamId`] with [`stream_of_instance`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamInstance(usize);

impl StreamInstance {
    pub const fn new(address: usize) -> Self {
        StreamInstance(address)
    }
    pub const fn address(self) -> usize {
        self.0
    }
}

impl fmt::Debug for StreamInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamInstance({:#010X})", self.0)
    }
}

/// A compiled-in route
#[derive(Debug, Clone, Copy)]
pub struct TransferRoute {
    pub key: RouteKey,
    /// Register block of the physical stream
    pub instance: StreamInstance,
    pub stream: StreamId,
    pub sub_channel: SubChannel,
    /// Default stream configuration
    ///
    /// `None` when the owning driver supplies its own configuration.
    pub template: Option<&'static InitTemplate>,
}

/// Find the first route that exactly matches `key`
pub fn resolve<'a>(routes: &'a [TransferRoute], key: &RouteKey) -> Option<&'a TransferRoute> {
    routes.iter().find(|route| route.key == *key)
}

/// Find the stream behind a register block
///
/// Matches on the instance only, so any row naming the stream will do.
pub fn stream_of_instance(routes: &[TransferRoute], instance: StreamInstance) -> Option<StreamId> {
    routes
        .iter()
        .find(|route| route.instance == instance)
        .map(|route| route.stream)
}
