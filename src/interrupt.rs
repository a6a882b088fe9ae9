//! DMA interrupt handlers
//!
//! Every stream has its own interrupt vector. The handlers do nothing but
//! forward to [`DmaManager::on_interrupt`](crate::DmaManager::on_interrupt)
//! with the stream's identifier, so they are generated by macro.
//!
//! Use [`dma_stream_handlers`](crate::dma_stream_handlers) to name the vectors
//! yourself, or the per-series shorthands to get the names from the device's
//! vector table:
//!
//! ```no_run
//! use stm32_dma_streams::{platform::stm32f4, stm32::Stm32Hardware, DmaManager};
//!
//! static DMA: DmaManager<Stm32Hardware, { stm32f4::STREAMS }> =
//!     DmaManager::new(&stm32f4::PLATFORM, Stm32Hardware::new(&stm32f4::LAYOUT));
//!
//! stm32_dma_streams::stm32f4_stream_handlers!(DMA);
//! ```

/// Define `extern "C"` interrupt handlers that dispatch to a manager
///
/// `$manager` is a path to a `static` [`DmaManager`](crate::DmaManager). Each
/// `vector: stream` pair defines a function named `vector` that services
/// stream `stream`.
///
/// ```no_run
/// # use stm32_dma_streams::{platform::stm32f4, stm32::Stm32Hardware, DmaManager};
/// # static DMA: DmaManager<Stm32Hardware, 16> =
/// #     DmaManager::new(&stm32f4::PLATFORM, Stm32Hardware::new(&stm32f4::LAYOUT));
/// stm32_dma_streams::dma_stream_handlers!(DMA => {
///     DMA1_Stream3: 3,
///     DMA2_Stream2: 10,
/// });
/// ```
#[macro_export]
macro_rules! dma_stream_handlers {
    ($manager:path => { $($vector:ident: $stream:expr),+ $(,)? }) => {
        $(
            #[allow(non_snake_case)]
            #[no_mangle]
            pub extern "C" fn $vector() {
                // Safety: called from the stream's own vector.
                unsafe { $manager.on_interrupt($crate::route::StreamId::new($stream)) }
            }
        )+
    };
}

/// Handlers for every STM32F4 and STM32F7 DMA stream
#[macro_export]
macro_rules! stm32f4_stream_handlers {
    ($manager:path) => {
        $crate::dma_stream_handlers!($manager => {
            DMA1_Stream0: 0,
            DMA1_Stream1: 1,
            DMA1_Stream2: 2,
            DMA1_Stream3: 3,
            DMA1_Stream4: 4,
            DMA1_Stream5: 5,
            DMA1_Stream6: 6,
            DMA1_Stream7: 7,
            DMA2_Stream0: 8,
            DMA2_Stream1: 9,
            DMA2_Stream2: 10,
            DMA2_Stream3: 11,
            DMA2_Stream4: 12,
            DMA2_Stream5: 13,
            DMA2_Stream6: 14,
            DMA2_Stream7: 15,
        });
    };
}

/// Handlers for every STM32L4 DMA channel
#[macro_export]
macro_rules! stm32l4_stream_handlers {
    ($manager:path) => {
        $crate::dma_stream_handlers!($manager => {
            DMA1_Channel1: 0,
            DMA1_Channel2: 1,
            DMA1_Channel3: 2,
            DMA1_Channel4: 3,
            DMA1_Channel5: 4,
            DMA1_Channel6: 5,
            DMA1_Channel7: 6,
            DMA2_Channel1: 7,
            DMA2_Channel2: 8,
            DMA2_Channel3: 9,
            DMA2_Channel4: 10,
            DMA2_Channel5: 11,
            DMA2_Channel6: 12,
            DMA2_Channel7: 13,
        });
    };
}
