//! STM32L4 channels
//!
//! Two controllers of seven channels, with request selection in `CSELR`.
//! Rows are ordered by channel, then by request number.

use super::{Generation, IrqPriority, Layout, Platform, SPI_I2C};
#[cfg(feature = "sdcard")]
use super::SDIO_CHANNEL;
use crate::{
    descriptor::InitTemplate,
    hardware::Irq,
    route::{
        Direction::{MemoryToPeripheral as TX, PeripheralToMemory as RX},
        Periphery::{self, *},
        RouteKey, StreamId, StreamInstance, SubChannel, TransferRoute,
    },
};

pub const STREAMS: usize = 14;
const PER_CONTROLLER: usize = 7;

pub const LAYOUT: Layout = Layout {
    generation: Generation::Channel,
    streams_per_controller: PER_CONTROLLER,
    controllers: [0x4002_0000, 0x4002_0400],
    first_stream: 0x08,
    stream_stride: 0x14,
    // RCC_AHB1ENR
    clock_enable: 0x4002_1048,
    clock_bits: [1 << 0, 1 << 1],
};

/// Channels are numbered from 1 in the reference manual
const fn channel(controller: usize, number: usize) -> StreamInstance {
    StreamInstance::new(
        LAYOUT.controllers[controller]
            + LAYOUT.first_stream
            + (number - 1) * LAYOUT.stream_stride,
    )
}

const DMA1_CHANNEL1: StreamInstance = channel(0, 1);
const DMA1_CHANNEL2: StreamInstance = channel(0, 2);
const DMA1_CHANNEL3: StreamInstance = channel(0, 3);
const DMA1_CHANNEL4: StreamInstance = channel(0, 4);
const DMA1_CHANNEL5: StreamInstance = channel(0, 5);
const DMA1_CHANNEL6: StreamInstance = channel(0, 6);
const DMA1_CHANNEL7: StreamInstance = channel(0, 7);
const DMA2_CHANNEL1: StreamInstance = channel(1, 1);
const DMA2_CHANNEL2: StreamInstance = channel(1, 2);
const DMA2_CHANNEL3: StreamInstance = channel(1, 3);
const DMA2_CHANNEL4: StreamInstance = channel(1, 4);
const DMA2_CHANNEL5: StreamInstance = channel(1, 5);
const DMA2_CHANNEL6: StreamInstance = channel(1, 6);
const DMA2_CHANNEL7: StreamInstance = channel(1, 7);

const fn row(
    periphery: Periphery,
    instance: u8,
    direction: crate::route::Direction,
    registers: StreamInstance,
    request: u8,
    id: u8,
    template: Option<&'static InitTemplate>,
) -> TransferRoute {
    TransferRoute {
        key: RouteKey::new(periphery, instance, direction),
        instance: registers,
        stream: StreamId::new(id),
        sub_channel: SubChannel::new(request),
        template,
    }
}

#[rustfmt::skip]
pub const ROUTES: &[TransferRoute] = &[
    // DMA1
    row(Adc,  1, RX, DMA1_CHANNEL1, 0,  0, None),
    row(Adc,  2, RX, DMA1_CHANNEL2, 0,  1, None),
    row(Spi,  1, RX, DMA1_CHANNEL2, 1,  1, Some(&SPI_I2C)),
    row(I2c,  3, TX, DMA1_CHANNEL2, 3,  1, Some(&SPI_I2C)),
    row(Adc,  3, RX, DMA1_CHANNEL3, 0,  2, None),
    row(Spi,  1, TX, DMA1_CHANNEL3, 1,  2, Some(&SPI_I2C)),
    row(I2c,  3, RX, DMA1_CHANNEL3, 3,  2, Some(&SPI_I2C)),
    row(Dac,  1, TX, DMA1_CHANNEL3, 6,  2, None),
    row(Spi,  2, RX, DMA1_CHANNEL4, 1,  3, Some(&SPI_I2C)),
    row(I2c,  2, TX, DMA1_CHANNEL4, 3,  3, Some(&SPI_I2C)),
    row(Dac,  2, TX, DMA1_CHANNEL4, 5,  3, None),
    row(Spi,  2, TX, DMA1_CHANNEL5, 1,  4, Some(&SPI_I2C)),
    row(I2c,  2, RX, DMA1_CHANNEL5, 3,  4, Some(&SPI_I2C)),
    row(I2c,  1, TX, DMA1_CHANNEL6, 3,  5, Some(&SPI_I2C)),
    row(I2c,  1, RX, DMA1_CHANNEL7, 3,  6, Some(&SPI_I2C)),
    // DMA2
    row(Spi,  3, RX, DMA2_CHANNEL1, 3,  7, Some(&SPI_I2C)),
    row(Spi,  3, TX, DMA2_CHANNEL2, 3,  8, Some(&SPI_I2C)),
    row(Adc,  1, RX, DMA2_CHANNEL3, 0,  9, None),
    row(Spi,  1, RX, DMA2_CHANNEL3, 4,  9, Some(&SPI_I2C)),
    row(Adc,  2, RX, DMA2_CHANNEL4, 0, 10, None),
    row(Dac,  1, TX, DMA2_CHANNEL4, 3, 10, None),
    row(Spi,  1, TX, DMA2_CHANNEL4, 4, 10, Some(&SPI_I2C)),
    #[cfg(feature = "sdcard")]
    row(Sdio, 1, TX, DMA2_CHANNEL4, 7, 10, Some(&SDIO_CHANNEL)),
    row(Adc,  3, RX, DMA2_CHANNEL5, 0, 11, None),
    row(Dac,  2, TX, DMA2_CHANNEL5, 3, 11, None),
    #[cfg(feature = "sdcard")]
    row(Sdio, 1, RX, DMA2_CHANNEL5, 7, 11, Some(&SDIO_CHANNEL)),
    row(I2c,  1, RX, DMA2_CHANNEL6, 5, 12, Some(&SPI_I2C)),
    row(I2c,  1, TX, DMA2_CHANNEL7, 5, 13, Some(&SPI_I2C)),
];

#[rustfmt::skip]
pub static PLATFORM: Platform<STREAMS> = Platform {
    name: "stm32l4",
    layout: LAYOUT,
    irqs: [
        // DMA1_Channel1..7
        Irq::new(11), Irq::new(12), Irq::new(13), Irq::new(14),
        Irq::new(15), Irq::new(16), Irq::new(17),
        // DMA2_Channel1..7
        Irq::new(56), Irq::new(57), Irq::new(58), Irq::new(59),
        Irq::new(60), Irq::new(68), Irq::new(69),
    ],
    irq_priority: IrqPriority { preempt: 6, sub: 0 },
    idle_tick_max: 8,
    routes: ROUTES,
};
