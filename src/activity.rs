//! Controller clock gating
//!
//! A controller's clock stays on while any of its streams is bound. When the
//! last stream unbinds, the controller's idle counter is armed instead of
//! gating the clock right away. Periodic [`tick`](ControllerActivity::tick)s
//! advance the counter, and the clock is gated only once the counter passes
//! the platform's idle limit with nothing active. Back-to-back transfers
//! therefore keep their stream configuration.
//!
//! Each tick services one controller, chosen by the tick's low bit.

use crate::{
    hardware::DmaHardware,
    platform::{Platform, CONTROLLERS},
    route::StreamId,
};

/// SysTick bits that must be clear for the idle handler to run
///
/// With a 1 ms SysTick, the handler runs on two consecutive ticks out of
/// every sixteen, once per controller.
pub const SYSTICK_MASK: u32 = 0x0e;

/// Returns `true` if a SysTick count should drive the idle handler
pub const fn is_idle_tick(tick: u32) -> bool {
    tick & SYSTICK_MASK == 0
}

/// Active streams and idle counters for every controller
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerActivity {
    enable_mask: u32,
    idle: [u8; CONTROLLERS],
}

impl ControllerActivity {
    pub const fn new() -> Self {
        ControllerActivity {
            enable_mask: 0,
            idle: [0; CONTROLLERS],
        }
    }

    /// Bit `n` is set while stream `n` is bound
    pub fn enable_mask(&self) -> u32 {
        self.enable_mask
    }

    /// Zero when the controller's idle timer is not armed
    ///
    /// Returns `None` if `controller` doesn't exist.
    pub fn idle_counter(&self, controller: usize) -> Option<u8> {
        self.idle.get(controller).copied()
    }

    /// Returns `true` while any controller's idle timer is armed
    pub fn is_idle_armed(&self) -> bool {
        self.idle.iter().any(|&counter| counter != 0)
    }

    /// Mark `stream` in use, starting its controller's clock if needed
    ///
    /// Returns `true` if the clock was started. In that case every stream on
    /// the controller lost its configuration.
    pub fn mark_active<H: DmaHardware, const N: usize>(
        &mut self,
        platform: &Platform<N>,
        hardware: &mut H,
        stream: StreamId,
    ) -> bool {
        let old_mask = self.enable_mask;
        self.enable_mask |= stream.mask();

        let controller = platform.controller(stream);
        if old_mask & platform.controller_mask(controller) == 0
            && !hardware.clock_enabled(controller)
        {
            hardware.enable_clock(controller);
            log::debug!("DMA{} clock on", controller + 1);
            true
        } else {
            false
        }
    }

    /// Mark `stream` unused and arm its controller's idle timer
    pub fn mark_inactive<const N: usize>(&mut self, platform: &Platform<N>, stream: StreamId) {
        self.idle[platform.controller(stream)] = 1;
        self.enable_mask &= !stream.mask();
    }

    /// Advance the idle timer of the controller selected by `tick`'s low bit
    ///
    /// Returns `true` if this tick gated the controller's clock.
    pub fn tick<H: DmaHardware, const N: usize>(
        &mut self,
        platform: &Platform<N>,
        hardware: &mut H,
        tick: u32,
    ) -> bool {
        let controller = (tick & 1) as usize;
        let counter = &mut self.idle[controller];
        if *counter == 0 {
            return false;
        }

        *counter += 1;
        if *counter <= platform.idle_tick_max {
            return false;
        }

        if self.enable_mask & platform.controller_mask(controller) == 0 {
            *counter = 0;
            hardware.disable_clock(controller);
            log::debug!("DMA{} clock off", controller + 1);
            true
        } else {
            // A stream was bound after the timer was armed. Keep counting.
            *counter = 1;
            false
        }
    }
}
