//! A `DmaHardware` that records what the manager asks of it

#![allow(dead_code)]

use std::collections::BTreeSet;

use stm32_dma_streams::{
    descriptor::{DescriptorState, TransferDescriptor, TransferOutcome},
    hardware::{DmaHardware, Irq},
    platform::IrqPriority,
    route::StreamId,
    HardwareError,
};

#[derive(Default)]
pub struct Recorder {
    pub clocks: [bool; 2],
    pub clock_disables: [u32; 2],
    pub resets: [u32; 16],
    pub inits: [u32; 16],
    pub priorities: Vec<(u16, IrqPriority)>,
    pub enabled: BTreeSet<u16>,
    pub irq_enables: u32,
    pub irq_disables: u32,
    /// Fail every `init_stream` with this error
    pub fail_init: Option<HardwareError>,
    /// Reported by the next `service_interrupt`
    pub pending: Option<TransferOutcome>,
    pub serviced: u32,
}

impl DmaHardware for Recorder {
    fn clock_enabled(&self, controller: usize) -> bool {
        self.clocks[controller]
    }
    fn enable_clock(&mut self, controller: usize) {
        self.clocks[controller] = true;
    }
    fn disable_clock(&mut self, controller: usize) {
        self.clocks[controller] = false;
        self.clock_disables[controller] += 1;
    }
    fn reset_stream(&mut self, stream: StreamId, descriptor: &mut TransferDescriptor) {
        self.resets[stream.index()] += 1;
        descriptor.set_state(DescriptorState::Reset);
    }
    fn init_stream(
        &mut self,
        stream: StreamId,
        descriptor: &mut TransferDescriptor,
    ) -> Result<(), HardwareError> {
        self.inits[stream.index()] += 1;
        match self.fail_init {
            Some(err) => Err(err),
            None => {
                descriptor.set_state(DescriptorState::Ready);
                Ok(())
            }
        }
    }
    fn set_priority(&mut self, irq: Irq, priority: IrqPriority) {
        self.priorities.push((irq.number(), priority));
    }
    fn enable_irq(&mut self, irq: Irq) {
        self.irq_enables += 1;
        self.enabled.insert(irq.number());
    }
    fn disable_irq(&mut self, irq: Irq) {
        self.irq_disables += 1;
        self.enabled.remove(&irq.number());
    }
    fn service_interrupt(
        &mut self,
        _: StreamId,
        _: &mut TransferDescriptor,
    ) -> Option<TransferOutcome> {
        self.serviced += 1;
        self.pending.take()
    }
}
