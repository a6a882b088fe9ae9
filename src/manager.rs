//! Stream arbitration and lifecycle
//!
//! [`DmaManager`] owns the process-wide DMA state: which descriptor is bound
//! to each stream, the request selector each stream was last programmed
//! with, and which controllers are active. Drivers call
//! [`bind`](DmaManager::bind) before a transfer and
//! [`unbind`](DmaManager::unbind) afterwards. The periodic
//! [`tick`](DmaManager::tick) gates idle controller clocks.
//!
//! Every operation runs inside a critical section, so the manager may be
//! shared between thread mode and interrupt handlers through a `static`.

use crate::{
    activity::{self, ControllerActivity},
    descriptor::{DescriptorState, TransferDescriptor},
    error::Error,
    hardware::DmaHardware,
    platform::Platform,
    route::{self, RouteKey, StreamId, StreamInstance, SubChannel, TransferRoute},
    Result,
};
use core::{cell::RefCell, ptr::NonNull};
use critical_section::Mutex;

/// A non-owning reference to a bound descriptor
#[derive(Clone, Copy)]
struct Bound(NonNull<TransferDescriptor>);

// Safety: the pointer is only dereferenced in a stream's interrupt handler
// or during `bind`, under the contract of `DmaManager::bind`.
unsafe impl Send for Bound {}

struct Inner<H, const STREAMS: usize> {
    hardware: H,
    bound: [Option<Bound>; STREAMS],
    /// `None` when the stream's registers can't be trusted
    last_sub: [Option<SubChannel>; STREAMS],
    activity: ControllerActivity,
}

impl<H, const STREAMS: usize> Inner<H, STREAMS> {
    fn invalidate_controller<const N: usize>(&mut self, platform: &Platform<N>, controller: usize) {
        for stream in platform.streams_of(controller) {
            if let Some(sub) = self.last_sub.get_mut(stream.index()) {
                *sub = None;
            }
        }
    }
}

/// Arbitrates a platform's DMA streams among drivers
///
/// `STREAMS` must match the platform's stream count, which the type system
/// enforces through [`Platform<STREAMS>`](Platform).
///
/// ```
/// use stm32_dma_streams::{DmaManager, TransferDescriptor};
/// use stm32_dma_streams::route::{Direction, Periphery, RouteKey};
/// use stm32_dma_streams::platform::stm32f4;
/// # use stm32_dma_streams::{descriptor::TransferOutcome, hardware::{DmaHardware, Irq}, platform::IrqPriority, route::StreamId, HardwareError};
/// # #[derive(Default)] struct Noop;
/// # impl DmaHardware for Noop {
/// #     fn clock_enabled(&self, _: usize) -> bool { false }
/// #     fn enable_clock(&mut self, _: usize) {}
/// #     fn disable_clock(&mut self, _: usize) {}
/// #     fn reset_stream(&mut self, _: StreamId, _: &mut TransferDescriptor) {}
/// #     fn init_stream(&mut self, _: StreamId, _: &mut TransferDescriptor) -> Result<(), HardwareError> { Ok(()) }
/// #     fn set_priority(&mut self, _: Irq, _: IrqPriority) {}
/// #     fn enable_irq(&mut self, _: Irq) {}
/// #     fn disable_irq(&mut self, _: Irq) {}
/// #     fn service_interrupt(&mut self, _: StreamId, _: &mut TransferDescriptor) -> Option<TransferOutcome> { None }
/// # }
///
/// static DMA: DmaManager<Noop, 16> = DmaManager::new(&stm32f4::PLATFORM, Noop);
///
/// let mut descriptor = TransferDescriptor::new();
/// let key = RouteKey::new(Periphery::Spi, 2, Direction::MemoryToPeripheral);
/// // Safety: descriptor outlives the binding.
/// let stream = unsafe { DMA.bind(&mut descriptor, key, None) }.unwrap();
/// assert_eq!(stream.index(), 4);
///
/// // Start and wait for the transfer...
///
/// DMA.unbind(&descriptor);
/// assert_eq!(DMA.enable_mask(), 0);
/// ```
pub struct DmaManager<H, const STREAMS: usize> {
    platform: &'static Platform<STREAMS>,
    inner: Mutex<RefCell<Inner<H, STREAMS>>>,
}

impl<H, const STREAMS: usize> DmaManager<H, STREAMS> {
    /// Create a manager with every stream unbound and every controller idle
    pub const fn new(platform: &'static Platform<STREAMS>, hardware: H) -> Self {
        DmaManager {
            platform,
            inner: Mutex::new(RefCell::new(Inner {
                hardware,
                bound: [None; STREAMS],
                last_sub: [None; STREAMS],
                activity: ControllerActivity::new(),
            })),
        }
    }

    pub fn platform(&self) -> &'static Platform<STREAMS> {
        self.platform
    }
}

impl<H: DmaHardware, const STREAMS: usize> DmaManager<H, STREAMS> {
    fn with<R>(&self, f: impl FnOnce(&mut Inner<H, STREAMS>) -> R) -> R {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow(cs).borrow_mut();
            f(&mut inner)
        })
    }

    fn route(&self, key: &RouteKey) -> Result<&'static TransferRoute> {
        route::resolve(self.platform.routes, key).ok_or_else(|| {
            log::warn!("no DMA route for {}", key);
            Error::RouteNotFound(*key)
        })
    }

    /// Fill in `descriptor` for the route behind `key`, without binding
    ///
    /// The route's template, if any, replaces the descriptor's configuration.
    /// Otherwise the descriptor keeps its configuration. The direction and
    /// sub-channel always come from the route.
    pub fn prepare(
        &self,
        descriptor: &mut TransferDescriptor,
        key: RouteKey,
        context: Option<NonNull<()>>,
    ) -> Result<StreamId> {
        let route = self.route(&key)?;
        populate(descriptor, route, context);
        Ok(route.stream)
    }

    /// Bind `descriptor` to the stream serving `key`, and prepare the stream
    ///
    /// Binding populates the descriptor from the route, registers it as the
    /// stream's owner, and powers the stream's controller. The stream's
    /// registers are reset and reprogrammed only if they don't already hold
    /// this route's request selector. Finally, the stream's interrupt is
    /// enabled.
    ///
    /// Any descriptor previously bound to the stream is displaced. The caller
    /// is responsible for not binding a stream that's already in use.
    ///
    /// If the route is unknown, nothing changes. If the hardware can't be
    /// initialized, the binding is rolled back and the next bind on the
    /// stream performs a full initialization.
    ///
    /// # Safety
    ///
    /// `descriptor` must not move, and must remain valid, until it's unbound
    /// or displaced. The stream's interrupt handler accesses the descriptor
    /// through [`on_interrupt`](Self::on_interrupt) while it's bound.
    pub unsafe fn bind(
        &self,
        descriptor: &mut TransferDescriptor,
        key: RouteKey,
        context: Option<NonNull<()>>,
    ) -> Result<StreamId> {
        let route = self.route(&key)?;
        let stream = route.stream;
        let idx = stream.index();
        let irq = self.platform.irq(stream);
        let platform = self.platform;

        populate(descriptor, route, context);

        self.with(|inner| {
            if inner
                .activity
                .mark_active(platform, &mut inner.hardware, stream)
            {
                inner.invalidate_controller(platform, platform.controller(stream));
            }

            if inner.last_sub[idx] == Some(route.sub_channel) {
                log::trace!("{} reuses stream {}", key, idx);
                descriptor.set_state(DescriptorState::Ready);
            } else {
                inner.hardware.reset_stream(stream, descriptor);
                if let Err(cause) = inner.hardware.init_stream(stream, descriptor) {
                    inner.hardware.disable_irq(irq);
                    inner.bound[idx] = None;
                    inner.last_sub[idx] = None;
                    inner.activity.mark_inactive(platform, stream);
                    log::error!("{} stream {} init failed: {}", key, idx, cause);
                    return Err(Error::HardwareInit { stream, cause });
                }
                inner.last_sub[idx] = Some(route.sub_channel);
                inner.hardware.set_priority(irq, platform.irq_priority);
                log::debug!(
                    "{} stream {} initialized, sub-channel {}",
                    key,
                    idx,
                    route.sub_channel.raw()
                );
            }

            inner.bound[idx] = Some(Bound(NonNull::from(descriptor)));
            inner.hardware.enable_irq(irq);
            Ok(stream)
        })
    }

    /// Release the stream bound to `descriptor`
    ///
    /// The stream keeps its configuration, and its controller stays powered
    /// until the idle timer expires. Descriptors that were never routed are
    /// ignored.
    pub fn unbind(&self, descriptor: &TransferDescriptor) {
        if let Some(instance) = descriptor.instance() {
            self.unbind_instance(instance);
        }
    }

    /// Release the stream behind a register block
    ///
    /// Does nothing if no route names `instance`.
    pub fn unbind_instance(&self, instance: StreamInstance) {
        let stream = match route::stream_of_instance(self.platform.routes, instance) {
            Some(stream) => stream,
            None => return,
        };
        let irq = self.platform.irq(stream);
        let platform = self.platform;

        self.with(|inner| {
            inner.hardware.disable_irq(irq);
            inner.bound[stream.index()] = None;
            inner.activity.mark_inactive(platform, stream);
        });
        log::trace!("unbound stream {}", stream.index());
    }

    /// Force the next bind of `key`'s stream to reinitialize the hardware
    ///
    /// Use this after reconfiguring the stream's registers behind the
    /// manager's back. Only affects the stream if it's programmed for this
    /// route's request selector. Unknown routes are ignored.
    pub fn invalidate(&self, key: RouteKey) {
        let route = match route::resolve(self.platform.routes, &key) {
            Some(route) => route,
            None => return,
        };
        self.with(|inner| {
            let last = &mut inner.last_sub[route.stream.index()];
            if *last == Some(route.sub_channel) {
                *last = None;
                log::trace!("{} invalidated stream {}", key, route.stream.index());
            }
        });
    }

    /// Advance the idle timer of the controller selected by `tick`'s low bit
    ///
    /// Once a controller has no active streams for the platform's idle limit,
    /// its clock is gated and its idle timer disarmed.
    pub fn tick(&self, tick: u32) {
        let platform = self.platform;
        self.with(|inner| {
            inner.activity.tick(platform, &mut inner.hardware, tick);
        });
    }

    /// Drive the idle timer from a millisecond SysTick count
    ///
    /// Calls [`tick`](Self::tick) when an idle timer is armed and `ms` falls
    /// on the idle cadence. Call this from every SysTick interrupt.
    pub fn on_systick(&self, ms: u32) {
        if !activity::is_idle_tick(ms) {
            return;
        }
        let platform = self.platform;
        self.with(|inner| {
            if inner.activity.is_idle_armed() {
                inner.activity.tick(platform, &mut inner.hardware, ms);
            }
        });
    }

    /// Dispatch a stream interrupt to the bound descriptor
    ///
    /// The hardware acknowledges the interrupt inside a critical section.
    /// The descriptor's callbacks run afterwards, so they may bind and unbind
    /// streams. Does nothing if `stream` is out of range or unbound.
    ///
    /// # Safety
    ///
    /// Call this only from `stream`'s interrupt handler, or with that
    /// interrupt masked. The [`dma_stream_handlers`](crate::dma_stream_handlers)
    /// macro generates suitable handlers.
    pub unsafe fn on_interrupt(&self, stream: StreamId) {
        if stream.index() >= STREAMS {
            return;
        }
        let finished = self.with(|inner| {
            let bound = inner.bound[stream.index()]?;
            // Safety: bound descriptors are valid per `bind`'s contract.
            let descriptor = unsafe { &mut *bound.0.as_ptr() };
            inner
                .hardware
                .service_interrupt(stream, descriptor)
                .map(|outcome| (bound, outcome))
        });

        if let Some((bound, outcome)) = finished {
            // Safety: as above. The critical section no longer holds a
            // reference to the descriptor.
            let descriptor = unsafe { &mut *bound.0.as_ptr() };
            descriptor.finish(outcome);
        }
    }

    /// Bit `n` is set while stream `n` is bound
    pub fn enable_mask(&self) -> u32 {
        self.with(|inner| inner.activity.enable_mask())
    }

    /// The controller's idle counter, zero when disarmed
    ///
    /// Returns `None` if `controller` doesn't exist.
    pub fn idle_counter(&self, controller: usize) -> Option<u8> {
        self.with(|inner| inner.activity.idle_counter(controller))
    }

    /// Returns `true` while any controller's idle timer is armed
    pub fn is_idle_armed(&self) -> bool {
        self.with(|inner| inner.activity.is_idle_armed())
    }

    /// Returns `true` if a descriptor is bound to `stream`
    pub fn is_bound(&self, stream: StreamId) -> bool {
        self.with(|inner| matches!(inner.bound.get(stream.index()), Some(Some(_))))
    }

    /// The request selector `stream` was last programmed with
    ///
    /// `None` if the stream was never initialized, or if its configuration
    /// was invalidated.
    pub fn last_sub_channel(&self, stream: StreamId) -> Option<SubChannel> {
        self.with(|inner| inner.last_sub.get(stream.index()).copied().flatten())
    }

    /// Access the hardware backend inside a critical section
    pub fn with_hardware<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        self.with(|inner| f(&mut inner.hardware))
    }
}

fn populate(
    descriptor: &mut TransferDescriptor,
    route: &TransferRoute,
    context: Option<NonNull<()>>,
) {
    let mut config = *descriptor.config();
    if let Some(template) = route.template {
        config.init = *template;
    }
    config.direction = route.key.direction;
    config.sub_channel = route.sub_channel;
    descriptor.populate(route.instance, config, context);
}
