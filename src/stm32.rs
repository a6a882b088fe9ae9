//! Register-level [`DmaHardware`] for STM32 controllers
//!
//! [`Stm32Hardware`] drives both controller generations from a platform
//! [`Layout`]. Stream-based controllers (F4, F7) select requests with
//! `CHSEL`; channel-based controllers (L4) select them in the shared `CSELR`
//! register and have neither a FIFO nor peripheral flow control.

use crate::{
    descriptor::{
        Burst, DataSize, DescriptorState, FifoThreshold, Mode, Priority, StreamConfig,
        TransferDescriptor, TransferOutcome,
    },
    error::HardwareError,
    hardware::{DmaHardware, Irq},
    platform::{Generation, IrqPriority, Layout},
    ral::{self, channel, stream, Register, Static},
    route::{Direction, StreamId},
};
use cortex_m::peripheral::NVIC;

/// Polls of the enable bit before giving up on a stream
const DISABLE_SPINS: u32 = 10_000;

/// Implemented NVIC priority bits on every supported series
const NVIC_PRIORITY_BITS: u8 = 4;

/// Where a stream lives
#[derive(Clone, Copy)]
struct Location {
    controller: usize,
    /// Position within the controller
    index: usize,
    address: usize,
}

/// STM32 DMA controllers, accessed through their registers
///
/// There should be one of these per program, owned by the
/// [`DmaManager`](crate::DmaManager).
pub struct Stm32Hardware {
    layout: &'static Layout,
}

impl Stm32Hardware {
    pub const fn new(layout: &'static Layout) -> Self {
        Stm32Hardware { layout }
    }

    fn locate(&self, stream: StreamId) -> Location {
        let per = self.layout.streams_per_controller;
        let controller = stream.index() / per;
        let index = stream.index() % per;
        Location {
            controller,
            index,
            address: self.layout.controllers[controller]
                + self.layout.first_stream
                + index * self.layout.stream_stride,
        }
    }

    fn clock(&self) -> Register {
        Static(self.layout.clock_enable as *const _)
    }

    fn stream_registers(location: Location) -> Static<stream::RegisterBlock> {
        Static(location.address as *const _)
    }

    fn stream_flags(&self, location: Location) -> Static<stream::Flags> {
        Static(self.layout.controllers[location.controller] as *const _)
    }

    fn channel_registers(location: Location) -> Static<channel::RegisterBlock> {
        Static(location.address as *const _)
    }

    fn channel_controller(&self, location: Location) -> Static<channel::Controller> {
        Static(self.layout.controllers[location.controller] as *const _)
    }
}

//
// Stream-based controllers
//

fn disable_stream(registers: Static<stream::RegisterBlock>) -> Result<(), HardwareError> {
    ral::modify_reg!(crate::ral::stream, registers, CR, EN: 0);
    for _ in 0..DISABLE_SPINS {
        if ral::read_reg!(crate::ral::stream, registers, CR, EN == 0) {
            return Ok(());
        }
    }
    Err(HardwareError::Timeout)
}

impl Stm32Hardware {
    fn reset_stream_registers(&self, location: Location) {
        let registers = Self::stream_registers(location);
        if disable_stream(registers).is_err() {
            log::warn!(
                "DMA{} stream {} still enabled at reset",
                location.controller + 1,
                location.index
            );
        }
        ral::write_reg!(crate::ral::stream, registers, CR, 0);
        ral::write_reg!(crate::ral::stream, registers, NDTR, 0);
        ral::write_reg!(crate::ral::stream, registers, PAR, 0);
        ral::write_reg!(crate::ral::stream, registers, M0AR, 0);
        ral::write_reg!(crate::ral::stream, registers, M1AR, 0);
        ral::write_reg!(crate::ral::stream, registers, FCR, stream::FCR_RESET);
        self.stream_flags(location).clear(location.index, stream::ALL_FLAGS);
    }

    fn init_stream_registers(
        &self,
        location: Location,
        config: &StreamConfig,
    ) -> Result<(), HardwareError> {
        let registers = Self::stream_registers(location);
        disable_stream(registers)?;

        let init = &config.init;
        // Bursts require the FIFO
        let (memory_burst, peripheral_burst) = match init.fifo {
            Some(_) => (burst(init.memory_burst), burst(init.peripheral_burst)),
            None => (0, 0),
        };
        let direction: u32 = match config.direction {
            Direction::PeripheralToMemory => 0b00,
            Direction::MemoryToPeripheral => 0b01,
        };

        ral::write_reg!(
            crate::ral::stream,
            registers,
            CR,
            CHSEL: u32::from(config.sub_channel.raw()),
            MBURST: memory_burst,
            PBURST: peripheral_burst,
            PL: priority(init.priority),
            MSIZE: data_size(init.memory_size),
            PSIZE: data_size(init.peripheral_size),
            MINC: u32::from(init.memory_increment),
            PINC: u32::from(init.peripheral_increment),
            CIRC: u32::from(init.mode == Mode::Circular),
            DIR: direction,
            PFCTRL: u32::from(init.mode == Mode::PeripheralFlowControl),
            TCIE: 1,
            TEIE: 1
        );
        match init.fifo {
            Some(level) => {
                ral::write_reg!(crate::ral::stream, registers, FCR, DMDIS: 1, FTH: threshold(level))
            }
            None => ral::write_reg!(crate::ral::stream, registers, FCR, stream::FCR_RESET),
        }

        self.stream_flags(location).clear(location.index, stream::ALL_FLAGS);
        Ok(())
    }

    fn service_stream(&self, location: Location) -> Option<TransferOutcome> {
        let flags = self.stream_flags(location);
        let status = flags.status(location.index);
        flags.clear(location.index, status);

        if status & stream::TEIF != 0 {
            Some(TransferOutcome::Error)
        } else if status & stream::TCIF != 0 {
            Some(TransferOutcome::Complete)
        } else {
            if status & (stream::FEIF | stream::DMEIF) != 0 {
                log::debug!(
                    "DMA{} stream {} FIFO or direct mode error",
                    location.controller + 1,
                    location.index
                );
            }
            None
        }
    }
}

//
// Channel-based controllers
//

impl Stm32Hardware {
    fn reset_channel_registers(&self, location: Location) {
        let registers = Self::channel_registers(location);
        ral::write_reg!(crate::ral::channel, registers, CCR, 0);
        ral::write_reg!(crate::ral::channel, registers, CNDTR, 0);
        ral::write_reg!(crate::ral::channel, registers, CPAR, 0);
        ral::write_reg!(crate::ral::channel, registers, CMAR, 0);

        let controller = self.channel_controller(location);
        controller.clear(location.index, channel::ALL_FLAGS);
        controller.select(location.index, 0);
    }

    fn init_channel_registers(
        &self,
        location: Location,
        config: &StreamConfig,
    ) -> Result<(), HardwareError> {
        let init = &config.init;
        if init.fifo.is_some() || init.mode == Mode::PeripheralFlowControl {
            return Err(HardwareError::Unsupported);
        }

        let registers = Self::channel_registers(location);
        // Channels stop as soon as EN clears
        ral::modify_reg!(crate::ral::channel, registers, CCR, EN: 0);

        let direction: u32 = match config.direction {
            Direction::PeripheralToMemory => 0,
            Direction::MemoryToPeripheral => 1,
        };
        ral::write_reg!(
            crate::ral::channel,
            registers,
            CCR,
            PL: priority(init.priority),
            MSIZE: data_size(init.memory_size),
            PSIZE: data_size(init.peripheral_size),
            MINC: u32::from(init.memory_increment),
            PINC: u32::from(init.peripheral_increment),
            CIRC: u32::from(init.mode == Mode::Circular),
            DIR: direction,
            TEIE: 1,
            TCIE: 1
        );

        let controller = self.channel_controller(location);
        controller.select(location.index, config.sub_channel.raw());
        controller.clear(location.index, channel::ALL_FLAGS);
        Ok(())
    }

    fn service_channel(&self, location: Location) -> Option<TransferOutcome> {
        let controller = self.channel_controller(location);
        let status = controller.status(location.index);
        controller.clear(location.index, status);

        if status & channel::TEIF != 0 {
            Some(TransferOutcome::Error)
        } else if status & channel::TCIF != 0 {
            Some(TransferOutcome::Complete)
        } else {
            None
        }
    }
}

impl DmaHardware for Stm32Hardware {
    fn clock_enabled(&self, controller: usize) -> bool {
        self.clock().read() & self.layout.clock_bits[controller] != 0
    }

    fn enable_clock(&mut self, controller: usize) {
        let clock = self.clock();
        clock.write(clock.read() | self.layout.clock_bits[controller]);
        // Delay until the clock is running
        let _ = clock.read();
    }

    fn disable_clock(&mut self, controller: usize) {
        let clock = self.clock();
        clock.write(clock.read() & !self.layout.clock_bits[controller]);
    }

    fn reset_stream(&mut self, stream: StreamId, descriptor: &mut TransferDescriptor) {
        let location = self.locate(stream);
        match self.layout.generation {
            Generation::Stream => self.reset_stream_registers(location),
            Generation::Channel => self.reset_channel_registers(location),
        }
        descriptor.set_state(DescriptorState::Reset);
    }

    fn init_stream(
        &mut self,
        stream: StreamId,
        descriptor: &mut TransferDescriptor,
    ) -> Result<(), HardwareError> {
        let location = self.locate(stream);
        let config = descriptor.config();
        match self.layout.generation {
            Generation::Stream => self.init_stream_registers(location, config)?,
            Generation::Channel => self.init_channel_registers(location, config)?,
        }
        descriptor.set_state(DescriptorState::Ready);
        Ok(())
    }

    fn set_priority(&mut self, irq: Irq, priority: IrqPriority) {
        // Safety: only the manager touches DMA interrupt priorities, and it
        // does so inside a critical section.
        unsafe {
            let mut peripherals = cortex_m::Peripherals::steal();
            peripherals.NVIC.set_priority(irq, nvic_priority(priority));
        }
    }

    fn enable_irq(&mut self, irq: Irq) {
        // Safety: the stream's handler only reaches bound descriptors.
        unsafe { NVIC::unmask(irq) };
    }

    fn disable_irq(&mut self, irq: Irq) {
        NVIC::mask(irq);
    }

    fn service_interrupt(
        &mut self,
        stream: StreamId,
        _: &mut TransferDescriptor,
    ) -> Option<TransferOutcome> {
        let location = self.locate(stream);
        match self.layout.generation {
            Generation::Stream => self.service_stream(location),
            Generation::Channel => self.service_channel(location),
        }
    }
}

/// Encode a priority for the NVIC's priority registers
///
/// All implemented bits are preemption bits, so the sub-priority has no
/// effect.
const fn nvic_priority(priority: IrqPriority) -> u8 {
    let max = (1 << NVIC_PRIORITY_BITS) - 1;
    let preempt = if priority.preempt > max {
        max
    } else {
        priority.preempt
    };
    preempt << (8 - NVIC_PRIORITY_BITS)
}

const fn data_size(size: DataSize) -> u32 {
    match size {
        DataSize::Byte => 0b00,
        DataSize::HalfWord => 0b01,
        DataSize::Word => 0b10,
    }
}

const fn priority(priority: Priority) -> u32 {
    match priority {
        Priority::Low => 0b00,
        Priority::Medium => 0b01,
        Priority::High => 0b10,
        Priority::VeryHigh => 0b11,
    }
}

const fn burst(burst: Burst) -> u32 {
    match burst {
        Burst::Single => 0b00,
        Burst::Incr4 => 0b01,
        Burst::Incr8 => 0b10,
        Burst::Incr16 => 0b11,
    }
}

const fn threshold(level: FifoThreshold) -> u32 {
    match level {
        FifoThreshold::Quarter => 0b00,
        FifoThreshold::Half => 0b01,
        FifoThreshold::ThreeQuarters => 0b10,
        FifoThreshold::Full => 0b11,
    }
}
