//! The hardware seam
//!
//! [`DmaManager`](crate::DmaManager) decides *when* to touch the hardware; a
//! [`DmaHardware`] implementation decides *how*. The [`stm32`](crate::stm32)
//! module provides the register-level implementation. Tests substitute a
//! recording implementation.

use crate::{
    descriptor::{TransferDescriptor, TransferOutcome},
    error::HardwareError,
    platform::IrqPriority,
    route::StreamId,
};

/// An NVIC interrupt number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Irq(u16);

impl Irq {
    pub const fn new(number: u16) -> Self {
        Irq(number)
    }
    pub const fn number(self) -> u16 {
        self.0
    }
}

// Safety: numbers come from the platform's vector tables, which only name
// device interrupts.
unsafe impl cortex_m::interrupt::InterruptNumber for Irq {
    fn number(self) -> u16 {
        self.0
    }
}

/// Hardware operations needed by the stream manager
///
/// `controller` is a zero-based controller index (DMA1 is `0`). Every method
/// is called inside a critical section and must not block for long.
pub trait DmaHardware {
    /// Returns `true` if the controller's bus clock is running
    fn clock_enabled(&self, controller: usize) -> bool;
    /// Start the controller's bus clock
    fn enable_clock(&mut self, controller: usize);
    /// Gate the controller's bus clock
    ///
    /// Register contents are undefined once the clock stops.
    fn disable_clock(&mut self, controller: usize);

    /// Return the stream to its reset configuration
    fn reset_stream(&mut self, stream: StreamId, descriptor: &mut TransferDescriptor);
    /// Program the stream from `descriptor`'s configuration
    ///
    /// On success, the implementation leaves `descriptor` in the
    /// [`Ready`](crate::descriptor::DescriptorState::Ready) state.
    fn init_stream(
        &mut self,
        stream: StreamId,
        descriptor: &mut TransferDescriptor,
    ) -> Result<(), HardwareError>;

    fn set_priority(&mut self, irq: Irq, priority: IrqPriority);
    fn enable_irq(&mut self, irq: Irq);
    fn disable_irq(&mut self, irq: Irq);

    /// Acknowledge the stream's interrupt flags
    ///
    /// Returns the outcome of the bound descriptor's transfer, or `None` for
    /// events that don't end the transfer. The manager runs the descriptor's
    /// callbacks after the critical section ends, so implementations must not
    /// call [`complete`](TransferDescriptor::complete) or
    /// [`fail`](TransferDescriptor::fail) themselves.
    fn service_interrupt(
        &mut self,
        stream: StreamId,
        descriptor: &mut TransferDescriptor,
    ) -> Option<TransferOutcome>;
}
