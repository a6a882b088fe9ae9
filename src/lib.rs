//! DMA stream arbitration for STM32 microcontrollers
//!
//! `stm32-dma-streams` lets many peripheral drivers share a small pool of
//! DMA streams. It provides
//!
//! - compiled-in route tables that map a peripheral, instance and direction
//!   onto a physical stream and request selector
//! - a [`DmaManager`] that binds driver-owned [`TransferDescriptor`]s to
//!   streams, skipping hardware reinitialization when a stream already holds
//!   the right configuration
//! - idle clock gating for DMA controllers, driven from SysTick
//! - interrupt handler generation, dispatching stream interrupts to the bound
//!   descriptor's callbacks
//!
//! The manager reaches hardware through the [`DmaHardware`] trait.
//! [`stm32::Stm32Hardware`] implements it with register access; tests and
//! other targets can supply their own.
//!
//! ```no_run
//! use stm32_dma_streams::{
//!     platform::stm32f4,
//!     route::{Direction, Periphery, RouteKey},
//!     stm32::Stm32Hardware,
//!     DmaManager, TransferDescriptor,
//! };
//!
//! static DMA: DmaManager<Stm32Hardware, { stm32f4::STREAMS }> =
//!     DmaManager::new(&stm32f4::PLATFORM, Stm32Hardware::new(&stm32f4::LAYOUT));
//!
//! stm32_dma_streams::stm32f4_stream_handlers!(DMA);
//!
//! // #[cortex_m_rt::exception]
//! fn SysTick() {
//!     # let ms = 0;
//!     DMA.on_systick(ms);
//! }
//!
//! let mut descriptor = TransferDescriptor::new();
//! let key = RouteKey::new(Periphery::Spi, 1, Direction::MemoryToPeripheral);
//! // Safety: descriptor lives, and doesn't move, until we unbind.
//! unsafe { DMA.bind(&mut descriptor, key, None) }.unwrap();
//! // Program addresses and counts, then start the transfer...
//! DMA.unbind(&descriptor);
//! ```
//!
//! # Portability
//!
//! Route tables exist for STM32F4 and STM32F7 (stream-based controllers) and
//! STM32L4 (channel-based controllers). Select one with the `stm32f4`,
//! `stm32f7` or `stm32l4` feature; [`platform::DEFAULT`] names the selection.
//! SDIO routes need the `sdcard` feature.
//!
//! ### License
//!
//! Licensed under either of
//!
//! - [Apache License, Version 2.0](http://www.apache.org/licenses/LICENSE-2.0) ([LICENSE-APACHE](./LICENSE-APACHE))
//! - [MIT License](http://opensource.org/licenses/MIT) ([LICENSE-MIT](./LICENSE-MIT))
//!
//! at your option.

#![no_std]

pub mod activity;
pub mod descriptor;
mod error;
pub mod hardware;
mod interrupt;
mod manager;
pub mod platform;
mod ral;
pub mod route;
pub mod stm32;

pub use descriptor::TransferDescriptor;
pub use error::{Error, HardwareError};
pub use hardware::DmaHardware;
pub use manager::DmaManager;

/// A DMA manager result
pub type Result<T> = core::result::Result<T, Error>;
