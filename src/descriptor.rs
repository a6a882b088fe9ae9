//! Transfer descriptors
//!
//! A [`TransferDescriptor`] is the driver's view of one DMA stream for the
//! duration of a transfer. Drivers own their descriptors, often on the stack
//! of a synchronous transfer routine. The [`DmaManager`](crate::DmaManager)
//! fills one in when binding and keeps a non-owning pointer to it so that the
//! stream's interrupt can reach it.

use crate::route::{Direction, StreamInstance, SubChannel};
use core::ptr::NonNull;

/// Size of a single peripheral or memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataSize {
    Byte,
    HalfWord,
    Word,
}

/// Stream operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Normal,
    Circular,
    /// The peripheral decides when the transfer ends
    ///
    /// Only stream-based controllers support this.
    PeripheralFlowControl,
}

/// Software priority among streams on the same controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// FIFO fill level that triggers a memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoThreshold {
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

/// Burst length, in beats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Burst {
    Single,
    Incr4,
    Incr8,
    Incr16,
}

/// Default stream configuration carried by a route
///
/// Everything about a stream's setup except the direction and the request
/// selector, which vary per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InitTemplate {
    pub peripheral_increment: bool,
    pub memory_increment: bool,
    pub peripheral_size: DataSize,
    pub memory_size: DataSize,
    pub mode: Mode,
    pub priority: Priority,
    /// `None` selects direct mode
    ///
    /// Channel-based controllers have no FIFO and reject `Some`.
    pub fifo: Option<FifoThreshold>,
    /// Ignored by channel-based controllers
    pub memory_burst: Burst,
    /// Ignored by channel-based controllers
    pub peripheral_burst: Burst,
}

impl InitTemplate {
    /// The all-zeros configuration a stream has out of reset
    pub const RESET: Self = InitTemplate {
        peripheral_increment: false,
        memory_increment: false,
        peripheral_size: DataSize::Byte,
        memory_size: DataSize::Byte,
        mode: Mode::Normal,
        priority: Priority::Low,
        fifo: None,
        memory_burst: Burst::Single,
        peripheral_burst: Burst::Single,
    };
}

/// A complete stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamConfig {
    pub direction: Direction,
    pub sub_channel: SubChannel,
    pub init: InitTemplate,
}

impl StreamConfig {
    pub const RESET: Self = StreamConfig {
        direction: Direction::PeripheralToMemory,
        sub_channel: SubChannel::new(0),
        init: InitTemplate::RESET,
    };
}

/// Lifecycle of a descriptor, as seen by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorState {
    /// Never initialized, or reset
    Reset,
    /// Stream configured and idle
    Ready,
    /// A transfer is running
    Busy,
    /// The last transfer completed
    Complete,
    /// The last transfer failed
    Error,
}

/// How a transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferOutcome {
    Complete,
    Error,
}

/// Callback invoked from the stream's interrupt
pub type Callback = fn(&mut TransferDescriptor);

/// A driver-owned handle to a DMA stream
///
/// The descriptor does not own the stream. It records which stream it was
/// routed to, how that stream is configured, and a back-reference to the
/// owning driver that this crate never dereferences.
pub struct TransferDescriptor {
    instance: Option<StreamInstance>,
    config: StreamConfig,
    state: DescriptorState,
    context: Option<NonNull<()>>,
    /// Runs when the stream reports transfer complete
    pub on_complete: Option<Callback>,
    /// Runs when the stream reports a transfer error
    pub on_error: Option<Callback>,
}

impl TransferDescriptor {
    pub const fn new() -> Self {
        TransferDescriptor {
            instance: None,
            config: StreamConfig::RESET,
            state: DescriptorState::Reset,
            context: None,
            on_complete: None,
            on_error: None,
        }
    }

    /// The stream this descriptor was routed to, if any
    pub fn instance(&self) -> Option<StreamInstance> {
        self.instance
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Adjust the configuration before binding
    ///
    /// Routes without a template keep whatever is set here, apart from the
    /// direction and sub-channel.
    pub fn config_mut(&mut self) -> &mut StreamConfig {
        &mut self.config
    }

    pub fn state(&self) -> DescriptorState {
        self.state
    }

    /// Hardware backends track the transfer through this
    pub fn set_state(&mut self, state: DescriptorState) {
        self.state = state;
    }

    /// The owning driver's back-reference
    pub fn context(&self) -> Option<NonNull<()>> {
        self.context
    }

    /// Mark the transfer complete and run `on_complete`
    pub fn complete(&mut self) {
        self.state = DescriptorState::Complete;
        if let Some(callback) = self.on_complete {
            callback(self);
        }
    }

    /// Mark the transfer failed and run `on_error`
    pub fn fail(&mut self) {
        self.state = DescriptorState::Error;
        if let Some(callback) = self.on_error {
            callback(self);
        }
    }

    pub(crate) fn finish(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Complete => self.complete(),
            TransferOutcome::Error => self.fail(),
        }
    }

    pub(crate) fn populate(
        &mut self,
        instance: StreamInstance,
        config: StreamConfig,
        context: Option<NonNull<()>>,
    ) {
        self.instance = Some(instance);
        self.config = config;
        self.context = context;
    }
}

impl core::fmt::Debug for TransferDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransferDescriptor")
            .field("instance", &self.instance)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("context", &self.context)
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl Default for TransferDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
