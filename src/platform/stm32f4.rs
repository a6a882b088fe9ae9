//! STM32F4 and STM32F7 streams
//!
//! Two controllers of eight streams. Within a controller, rows are ordered by
//! stream, then by channel.

use super::{Generation, IrqPriority, Layout, Platform, SPI_I2C};
#[cfg(feature = "sdcard")]
use super::SDIO_STREAM;
use crate::{
    descriptor::InitTemplate,
    hardware::Irq,
    route::{
        Direction::{MemoryToPeripheral as TX, PeripheralToMemory as RX},
        Periphery::{self, *},
        RouteKey, StreamId, StreamInstance, SubChannel, TransferRoute,
    },
};

pub const STREAMS: usize = 16;
const PER_CONTROLLER: usize = 8;

pub const LAYOUT: Layout = Layout {
    generation: Generation::Stream,
    streams_per_controller: PER_CONTROLLER,
    controllers: [0x4002_6000, 0x4002_6400],
    first_stream: 0x10,
    stream_stride: 0x18,
    // RCC_AHB1ENR
    clock_enable: 0x4002_3830,
    clock_bits: [1 << 21, 1 << 22],
};

const fn stream(controller: usize, stream: usize) -> StreamInstance {
    StreamInstance::new(
        LAYOUT.controllers[controller] + LAYOUT.first_stream + stream * LAYOUT.stream_stride,
    )
}

const DMA1_STREAM0: StreamInstance = stream(0, 0);
const DMA1_STREAM2: StreamInstance = stream(0, 2);
const DMA1_STREAM3: StreamInstance = stream(0, 3);
const DMA1_STREAM4: StreamInstance = stream(0, 4);
const DMA1_STREAM5: StreamInstance = stream(0, 5);
const DMA1_STREAM6: StreamInstance = stream(0, 6);
const DMA1_STREAM7: StreamInstance = stream(0, 7);
const DMA2_STREAM2: StreamInstance = stream(1, 2);
const DMA2_STREAM3: StreamInstance = stream(1, 3);
const DMA2_STREAM4: StreamInstance = stream(1, 4);
const DMA2_STREAM5: StreamInstance = stream(1, 5);
const DMA2_STREAM6: StreamInstance = stream(1, 6);

const fn row(
    periphery: Periphery,
    instance: u8,
    direction: crate::route::Direction,
    registers: StreamInstance,
    channel: u8,
    id: u8,
    template: Option<&'static InitTemplate>,
) -> TransferRoute {
    TransferRoute {
        key: RouteKey::new(periphery, instance, direction),
        instance: registers,
        stream: StreamId::new(id),
        sub_channel: SubChannel::new(channel),
        template,
    }
}

// Streams that share a row group are time multiplexed. SPI and I2C bind
// around every transfer, so they never overlap.
//
// Unused alternates: SPI3 RX on DMA1 S0, I2C1 TX on DMA1 S6, SPI1 RX and
// SPI4 RX on DMA2 S0, SPI4 TX on DMA2 S1, SPI5 RX on DMA2 S5, SPI5 TX on
// DMA2 S6.
#[rustfmt::skip]
pub const ROUTES: &[TransferRoute] = &[
    // DMA1
    row(I2c,  1, RX, DMA1_STREAM0, 1,  0, Some(&SPI_I2C)),
    row(Spi,  3, RX, DMA1_STREAM2, 0,  2, Some(&SPI_I2C)),
    row(I2c,  3, RX, DMA1_STREAM2, 3,  2, Some(&SPI_I2C)),
    row(I2c,  2, RX, DMA1_STREAM2, 7,  2, Some(&SPI_I2C)),
    row(Spi,  2, RX, DMA1_STREAM3, 0,  3, Some(&SPI_I2C)),
    row(Spi,  2, TX, DMA1_STREAM4, 0,  4, Some(&SPI_I2C)),
    row(I2c,  3, TX, DMA1_STREAM4, 3,  4, Some(&SPI_I2C)),
    row(Dac,  1, TX, DMA1_STREAM5, 7,  5, None),
    row(Dac,  2, TX, DMA1_STREAM6, 7,  6, None),
    row(Spi,  3, TX, DMA1_STREAM7, 0,  7, Some(&SPI_I2C)),
    row(I2c,  1, TX, DMA1_STREAM7, 1,  7, Some(&SPI_I2C)),
    row(I2c,  2, TX, DMA1_STREAM7, 7,  7, Some(&SPI_I2C)),
    // DMA2
    row(Spi,  1, RX, DMA2_STREAM2, 3, 10, Some(&SPI_I2C)),
    row(Spi,  5, RX, DMA2_STREAM3, 2, 11, Some(&SPI_I2C)),
    row(Spi,  1, TX, DMA2_STREAM3, 3, 11, Some(&SPI_I2C)),
    #[cfg(feature = "sdcard")]
    row(Sdio, 0, RX, DMA2_STREAM3, 4, 11, Some(&SDIO_STREAM)),
    row(Spi,  4, RX, DMA2_STREAM3, 5, 11, Some(&SPI_I2C)),
    row(Spi,  5, TX, DMA2_STREAM4, 2, 12, Some(&SPI_I2C)),
    row(Spi,  4, TX, DMA2_STREAM4, 5, 12, Some(&SPI_I2C)),
    row(Spi,  6, TX, DMA2_STREAM5, 1, 13, Some(&SPI_I2C)),
    row(Spi,  1, TX, DMA2_STREAM5, 3, 13, Some(&SPI_I2C)),
    row(Spi,  6, RX, DMA2_STREAM6, 1, 14, Some(&SPI_I2C)),
    #[cfg(feature = "sdcard")]
    row(Sdio, 0, TX, DMA2_STREAM6, 4, 14, Some(&SDIO_STREAM)),
];

#[rustfmt::skip]
pub static PLATFORM: Platform<STREAMS> = Platform {
    name: "stm32f4",
    layout: LAYOUT,
    irqs: [
        // DMA1_Stream0..7
        Irq::new(11), Irq::new(12), Irq::new(13), Irq::new(14),
        Irq::new(15), Irq::new(16), Irq::new(17), Irq::new(47),
        // DMA2_Stream0..7
        Irq::new(56), Irq::new(57), Irq::new(58), Irq::new(59),
        Irq::new(60), Irq::new(68), Irq::new(69), Irq::new(70),
    ],
    irq_priority: IrqPriority { preempt: 6, sub: 0 },
    idle_tick_max: 8,
    routes: ROUTES,
};
