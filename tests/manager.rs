mod support;

use core::ptr::NonNull;

use stm32_dma_streams::{
    descriptor::{DataSize, DescriptorState, Mode, TransferOutcome},
    platform::{stm32f4, stm32l4, IrqPriority},
    route::{Direction, Periphery, RouteKey, StreamId, StreamInstance, SubChannel},
    DmaManager, Error, HardwareError, TransferDescriptor,
};
use support::Recorder;

type Manager = DmaManager<Recorder, 16>;

const SPI2_RX: RouteKey = RouteKey::new(Periphery::Spi, 2, Direction::PeripheralToMemory);
const SPI2_TX: RouteKey = RouteKey::new(Periphery::Spi, 2, Direction::MemoryToPeripheral);
const SPI3_RX: RouteKey = RouteKey::new(Periphery::Spi, 3, Direction::PeripheralToMemory);
const I2C3_RX: RouteKey = RouteKey::new(Periphery::I2c, 3, Direction::PeripheralToMemory);
const SPI1_RX: RouteKey = RouteKey::new(Periphery::Spi, 1, Direction::PeripheralToMemory);
const DAC1_TX: RouteKey = RouteKey::new(Periphery::Dac, 1, Direction::MemoryToPeripheral);
const I2C1_RX: RouteKey = RouteKey::new(Periphery::I2c, 1, Direction::PeripheralToMemory);

fn manager() -> Manager {
    DmaManager::new(&stm32f4::PLATFORM, Recorder::default())
}

fn bind(dma: &Manager, descriptor: &mut TransferDescriptor, key: RouteKey) -> StreamId {
    // Safety: every test keeps its descriptors alive longer than the manager
    // uses them.
    unsafe { dma.bind(descriptor, key, None) }.unwrap()
}

fn resets(dma: &Manager, stream: usize) -> u32 {
    dma.with_hardware(|hw| hw.resets[stream])
}

fn clock_on(dma: &Manager, controller: usize) -> bool {
    dma.with_hardware(|hw| hw.clocks[controller])
}

#[test]
fn bind_unbind_and_idle_gating() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();

    let stream = bind(&dma, &mut descriptor, SPI2_RX);
    assert_eq!(stream.index(), 3);
    assert_eq!(dma.enable_mask(), 0x0008);
    assert!(clock_on(&dma, 0));
    assert!(dma.is_bound(stream));
    assert!(dma.with_hardware(|hw| hw.enabled.contains(&14)));

    dma.unbind(&descriptor);
    assert_eq!(dma.enable_mask(), 0x0000);
    assert_eq!(dma.idle_counter(0), Some(1));
    assert!(!dma.is_bound(stream));
    assert!(dma.with_hardware(|hw| hw.enabled.is_empty()));

    // Eight of these sixteen ticks land on controller A. The eighth gates it.
    for tick in 0..16 {
        dma.tick(tick);
        if tick < 14 {
            assert!(clock_on(&dma, 0), "gated early at tick {}", tick);
        }
    }
    assert!(!clock_on(&dma, 0));
    assert_eq!(dma.idle_counter(0), Some(0));
    assert_eq!(dma.with_hardware(|hw| hw.clock_disables), [1, 0]);
    assert!(!dma.is_idle_armed());
}

#[test]
fn rebinding_same_route_skips_reinit() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();

    bind(&dma, &mut descriptor, SPI2_RX);
    dma.unbind(&descriptor);

    let mut completions = 0u32;
    let mut again = TransferDescriptor::new();
    again.on_complete = Some(count);
    let context = NonNull::from(&mut completions).cast();
    let stream = unsafe { dma.bind(&mut again, SPI2_RX, Some(context)) }.unwrap();

    assert_eq!(resets(&dma, 3), 1);
    assert_eq!(dma.with_hardware(|hw| hw.inits[3]), 1);
    assert_eq!(dma.with_hardware(|hw| hw.priorities.len()), 1);
    assert_eq!(dma.with_hardware(|hw| hw.irq_enables), 2);
    assert_eq!(again.state(), DescriptorState::Ready);
    assert_eq!(again.instance(), descriptor.instance());

    // The reused configuration still completes transfers
    dma.with_hardware(|hw| hw.pending = Some(TransferOutcome::Complete));
    unsafe { dma.on_interrupt(stream) };
    assert_eq!(again.state(), DescriptorState::Complete);
    assert_eq!(completions, 1);
    assert_eq!(resets(&dma, 3), 1);
}

#[test]
fn full_init_sets_dma_priority() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();
    bind(&dma, &mut descriptor, SPI2_RX);
    assert_eq!(
        dma.with_hardware(|hw| hw.priorities.clone()),
        vec![(14, IrqPriority { preempt: 6, sub: 0 })]
    );
}

#[test]
fn other_route_on_shared_stream_reinitializes() {
    let dma = manager();
    let mut spi = TransferDescriptor::new();
    let mut i2c = TransferDescriptor::new();

    assert_eq!(bind(&dma, &mut spi, SPI3_RX).index(), 2);
    dma.unbind(&spi);
    assert_eq!(bind(&dma, &mut i2c, I2C3_RX).index(), 2);

    assert_eq!(resets(&dma, 2), 2);
    assert_eq!(dma.last_sub_channel(StreamId::new(2)), Some(SubChannel::new(3)));
    assert_eq!(i2c.config().sub_channel, SubChannel::new(3));
}

#[test]
fn invalidate_forces_reinit() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();

    bind(&dma, &mut descriptor, SPI3_RX);
    dma.unbind(&descriptor);

    // Different selector on the same stream; nothing to invalidate
    dma.invalidate(I2C3_RX);
    assert_eq!(dma.last_sub_channel(StreamId::new(2)), Some(SubChannel::new(0)));

    dma.invalidate(SPI3_RX);
    assert_eq!(dma.last_sub_channel(StreamId::new(2)), None);

    bind(&dma, &mut descriptor, SPI3_RX);
    assert_eq!(resets(&dma, 2), 2);
    assert_eq!(dma.last_sub_channel(StreamId::new(2)), Some(SubChannel::new(0)));
}

#[test]
fn invalidate_unknown_route_is_ignored() {
    let dma = manager();
    dma.invalidate(RouteKey::new(Periphery::Adc, 1, Direction::PeripheralToMemory));
    assert_eq!(dma.enable_mask(), 0);
}

#[test]
fn clock_on_invalidates_only_that_controller() {
    let dma = manager();
    let mut rx = TransferDescriptor::new();
    let mut tx = TransferDescriptor::new();
    let mut other = TransferDescriptor::new();

    bind(&dma, &mut rx, SPI2_RX);
    bind(&dma, &mut tx, SPI2_TX);
    assert_eq!(bind(&dma, &mut other, SPI1_RX).index(), 10);
    dma.unbind(&rx);
    dma.unbind(&tx);

    // Gate controller A while controller B stays busy
    for tick in 0..20 {
        dma.tick(tick);
    }
    assert!(!clock_on(&dma, 0));
    assert!(clock_on(&dma, 1));
    assert_eq!(dma.last_sub_channel(StreamId::new(3)), Some(SubChannel::new(0)));

    bind(&dma, &mut rx, SPI2_RX);
    assert!(clock_on(&dma, 0));
    assert_eq!(resets(&dma, 3), 2);
    assert_eq!(dma.last_sub_channel(StreamId::new(4)), None);
    assert_eq!(dma.last_sub_channel(StreamId::new(10)), Some(SubChannel::new(3)));
}

#[test]
fn clock_stays_on_below_idle_limit() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();
    bind(&dma, &mut descriptor, SPI2_RX);
    dma.unbind(&descriptor);

    for _ in 0..7 {
        dma.tick(0);
    }
    assert!(clock_on(&dma, 0));

    dma.tick(0);
    assert!(!clock_on(&dma, 0));

    for _ in 0..20 {
        dma.tick(0);
    }
    assert_eq!(dma.with_hardware(|hw| hw.clock_disables[0]), 1);
}

#[test]
fn reactivation_rearms_idle_timer() {
    let dma = manager();
    let mut rx = TransferDescriptor::new();
    let mut tx = TransferDescriptor::new();

    bind(&dma, &mut rx, SPI2_RX);
    dma.unbind(&rx);
    for _ in 0..4 {
        dma.tick(0);
    }
    bind(&dma, &mut tx, SPI2_TX);
    for _ in 0..4 {
        dma.tick(0);
    }
    // The limit passed while SPI2 TX was bound
    assert!(clock_on(&dma, 0));
    assert_eq!(dma.idle_counter(0), Some(1));

    dma.unbind(&tx);
    for _ in 0..8 {
        dma.tick(0);
    }
    assert!(!clock_on(&dma, 0));
    assert_eq!(dma.with_hardware(|hw| hw.clock_disables[0]), 1);
}

#[test]
fn systick_cadence_drives_idle_timer() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();
    bind(&dma, &mut descriptor, SPI2_RX);
    dma.unbind(&descriptor);

    // Controller A is examined when ms % 16 == 0
    for ms in 0..112 {
        dma.on_systick(ms);
    }
    assert!(clock_on(&dma, 0));
    dma.on_systick(112);
    assert!(!clock_on(&dma, 0));
    assert!(!dma.is_idle_armed());
}

#[test]
fn at_most_one_descriptor_per_stream() {
    let dma = manager();
    let mut first = TransferDescriptor::new();
    let mut second = TransferDescriptor::new();

    bind(&dma, &mut first, SPI3_RX);
    dma.unbind(&first);
    bind(&dma, &mut second, I2C3_RX);
    assert!(dma.is_bound(StreamId::new(2)));
    dma.unbind(&second);

    for stream in 0..16 {
        assert!(!dma.is_bound(StreamId::new(stream)));
    }
    assert_eq!(dma.enable_mask(), 0);
}

#[test]
fn unknown_unbind_is_silent() {
    let dma = manager();
    dma.unbind(&TransferDescriptor::new());
    dma.unbind_instance(StreamInstance::new(0x2000_0000));

    assert_eq!(dma.with_hardware(|hw| hw.irq_disables), 0);
    assert!(!dma.is_idle_armed());
}

#[test]
fn double_unbind_is_harmless() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();
    bind(&dma, &mut descriptor, SPI2_RX);
    dma.unbind(&descriptor);
    dma.unbind(&descriptor);
    assert_eq!(dma.enable_mask(), 0);
    assert_eq!(dma.idle_counter(0), Some(1));
}

#[test]
fn missing_route_changes_nothing() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();
    let key = RouteKey::new(Periphery::Adc, 1, Direction::PeripheralToMemory);

    let result = unsafe { dma.bind(&mut descriptor, key, None) };
    assert_eq!(result, Err(Error::RouteNotFound(key)));
    assert_eq!(descriptor.instance(), None);
    assert_eq!(dma.enable_mask(), 0);
    assert_eq!(dma.with_hardware(|hw| hw.clocks), [false, false]);
    assert_eq!(dma.with_hardware(|hw| hw.irq_enables), 0);
}

#[test]
fn failed_init_rolls_back() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();
    dma.with_hardware(|hw| hw.fail_init = Some(HardwareError::Timeout));

    let result = unsafe { dma.bind(&mut descriptor, SPI2_RX, None) };
    assert_eq!(
        result,
        Err(Error::HardwareInit {
            stream: StreamId::new(3),
            cause: HardwareError::Timeout
        })
    );
    assert!(!dma.is_bound(StreamId::new(3)));
    assert_eq!(dma.last_sub_channel(StreamId::new(3)), None);
    assert_eq!(dma.enable_mask(), 0);
    assert_eq!(dma.idle_counter(0), Some(1));
    assert!(dma.with_hardware(|hw| hw.enabled.is_empty()));

    // The retry starts from scratch
    dma.with_hardware(|hw| hw.fail_init = None);
    bind(&dma, &mut descriptor, SPI2_RX);
    assert_eq!(resets(&dma, 3), 2);
    assert_eq!(descriptor.state(), DescriptorState::Ready);
}

fn count(descriptor: &mut TransferDescriptor) {
    let mut counter = descriptor.context().unwrap().cast::<u32>();
    // Safety: tests point the context at a live counter.
    unsafe { *counter.as_mut() += 1 };
}

#[test]
fn interrupt_runs_bound_descriptor_callback() {
    let dma = manager();
    let mut completions = 0u32;
    let mut descriptor = TransferDescriptor::new();
    descriptor.on_complete = Some(count);

    let context = NonNull::from(&mut completions).cast();
    let stream = unsafe { dma.bind(&mut descriptor, SPI2_RX, Some(context)) }.unwrap();

    // Half transfer, or anything else that doesn't end the transfer
    unsafe { dma.on_interrupt(stream) };
    assert_eq!(descriptor.state(), DescriptorState::Ready);

    dma.with_hardware(|hw| hw.pending = Some(TransferOutcome::Complete));
    unsafe { dma.on_interrupt(stream) };
    assert_eq!(descriptor.state(), DescriptorState::Complete);
    assert_eq!(completions, 1);
    assert_eq!(dma.with_hardware(|hw| hw.serviced), 2);
}

fn never(_: &mut TransferDescriptor) {
    panic!("transfer did not complete");
}

#[test]
fn interrupt_error_runs_error_callback() {
    let dma = manager();
    let mut errors = 0u32;
    let mut descriptor = TransferDescriptor::new();
    descriptor.on_complete = Some(never);
    descriptor.on_error = Some(count);

    let context = NonNull::from(&mut errors).cast();
    let stream = unsafe { dma.bind(&mut descriptor, SPI2_RX, Some(context)) }.unwrap();
    dma.with_hardware(|hw| hw.pending = Some(TransferOutcome::Error));
    unsafe { dma.on_interrupt(stream) };

    assert_eq!(descriptor.state(), DescriptorState::Error);
    assert_eq!(errors, 1);
}

#[test]
fn interrupt_on_unbound_stream_is_ignored() {
    let dma = manager();
    dma.with_hardware(|hw| hw.pending = Some(TransferOutcome::Complete));
    unsafe {
        dma.on_interrupt(StreamId::new(3));
        dma.on_interrupt(StreamId::new(40));
    }
    assert_eq!(dma.with_hardware(|hw| hw.serviced), 0);
}

fn unbind_from_callback(descriptor: &mut TransferDescriptor) {
    // Safety: the test points the context at its manager.
    let dma = unsafe { descriptor.context().unwrap().cast::<Manager>().as_ref() };
    dma.unbind(descriptor);
}

#[test]
fn callbacks_may_unbind() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();
    descriptor.on_complete = Some(unbind_from_callback);

    let context = NonNull::from(&dma).cast();
    let stream = unsafe { dma.bind(&mut descriptor, SPI2_RX, Some(context)) }.unwrap();
    dma.with_hardware(|hw| hw.pending = Some(TransferOutcome::Complete));
    unsafe { dma.on_interrupt(stream) };

    assert!(!dma.is_bound(stream));
    assert_eq!(dma.enable_mask(), 0);
}

#[test]
fn prepare_applies_template_and_route() {
    let dma = manager();
    let mut spi = TransferDescriptor::new();
    let stream = dma.prepare(&mut spi, SPI2_TX, None).unwrap();

    assert_eq!(stream.index(), 4);
    assert_eq!(spi.config().direction, Direction::MemoryToPeripheral);
    assert!(spi.config().init.memory_increment);
    assert_eq!(spi.instance(), Some(stm32f4::ROUTES[5].instance));
    assert!(!dma.is_bound(stream));
    assert_eq!(dma.enable_mask(), 0);
}

#[test]
fn route_without_template_keeps_caller_config() {
    let dma = manager();
    let mut dac = TransferDescriptor::new();
    dac.config_mut().init.mode = Mode::Circular;
    dac.config_mut().init.memory_size = DataSize::HalfWord;

    let stream = dma.prepare(&mut dac, DAC1_TX, None).unwrap();
    assert_eq!(stream.index(), 5);
    assert_eq!(dac.config().init.mode, Mode::Circular);
    assert_eq!(dac.config().init.memory_size, DataSize::HalfWord);
    assert_eq!(dac.config().sub_channel, SubChannel::new(7));
    assert_eq!(dac.config().direction, Direction::MemoryToPeripheral);
}

#[test]
fn prepare_reports_missing_route() {
    let dma = manager();
    let mut descriptor = TransferDescriptor::new();
    let key = RouteKey::new(Periphery::Sdio, 2, Direction::PeripheralToMemory);
    assert_eq!(
        dma.prepare(&mut descriptor, key, None),
        Err(Error::RouteNotFound(key))
    );
}

#[test]
fn l4_last_dma1_channel_gates_with_its_controller() {
    let dma: DmaManager<Recorder, 14> =
        DmaManager::new(&stm32l4::PLATFORM, Recorder::default());
    let mut i2c = TransferDescriptor::new();
    let mut spi = TransferDescriptor::new();

    // DMA1 channel 7, then DMA2 channel 1
    let i2c_stream = unsafe { dma.bind(&mut i2c, I2C1_RX, None) }.unwrap();
    let spi_stream = unsafe { dma.bind(&mut spi, SPI3_RX, None) }.unwrap();
    assert_eq!(i2c_stream.index(), 6);
    assert_eq!(spi_stream.index(), 7);
    assert_eq!(dma.enable_mask(), 0x00C0);
    assert_eq!(dma.with_hardware(|hw| hw.clocks), [true, true]);
    assert!(dma.with_hardware(|hw| hw.enabled.contains(&17)));

    dma.unbind(&i2c);
    assert_eq!(dma.idle_counter(0), Some(1));
    assert_eq!(dma.idle_counter(1), Some(0));
    for tick in 0..16 {
        dma.tick(tick);
    }
    assert_eq!(dma.with_hardware(|hw| hw.clocks), [false, true]);
    assert_eq!(dma.enable_mask(), 0x0080);
    assert_eq!(dma.last_sub_channel(i2c_stream), Some(SubChannel::new(3)));
    assert_eq!(dma.last_sub_channel(spi_stream), Some(SubChannel::new(3)));

    // Restarting DMA1 drops channel 7's configuration, not DMA2 channel 1's
    unsafe { dma.bind(&mut i2c, I2C1_RX, None) }.unwrap();
    assert_eq!(dma.with_hardware(|hw| hw.clocks), [true, true]);
    assert_eq!(dma.with_hardware(|hw| (hw.resets[6], hw.resets[7])), (2, 1));
    assert_eq!(dma.last_sub_channel(spi_stream), Some(SubChannel::new(3)));
    assert!(dma.is_bound(spi_stream));
}
