//! Fixed-size collection of PWM outputs
//!
//! The channel count is a const generic so the registry lives inline in the
//! device context and every per-tick array has a size known at compile time.

use alloc::vec::Vec;

use crate::command::{ModeRequest, OutputCommand};
use crate::errors::{ControlResult, ValidationError};
use crate::output::{Output, OutputKind, OutputSnapshot};
use crate::sensors::PwmDriver;

/// All outputs of a device, indexed by channel
#[derive(Debug, Clone)]
pub struct OutputRegistry<const N: usize> {
    outputs: [Output; N],
}

impl<const N: usize> OutputRegistry<N> {
    /// Create one output per entry of `kinds`, channel `i` from `kinds[i]`.
    ///
    /// Channel indices are `u8`; a registry holds at most 256 outputs.
    pub fn new(kinds: [OutputKind; N]) -> Self {
        Self {
            outputs: core::array::from_fn(|i| Output::new(i as u8, kinds[i])),
        }
    }

    /// Drive every channel to duty 0
    pub fn reset<D: PwmDriver + ?Sized>(&mut self, driver: &mut D) {
        for output in &mut self.outputs {
            output.reset(driver);
        }
    }

    /// Number of channels
    pub const fn len(&self) -> usize {
        N
    }

    /// Whether the registry has no channels
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Output at `index`
    pub fn get(&self, index: usize) -> Option<&Output> {
        self.outputs.get(index)
    }

    /// All outputs, indexed by channel
    pub fn outputs(&self) -> &[Output; N] {
        &self.outputs
    }

    /// Outputs in channel order
    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter()
    }

    /// Reportable state of every output
    pub fn snapshot(&self) -> Vec<OutputSnapshot> {
        self.outputs.iter().map(Output::snapshot).collect()
    }

    /// Record a probe sample for `index` without regulating
    pub fn observe_temperature(&mut self, index: usize, reading: Option<f32>) -> ControlResult<()> {
        self.output_mut(index)?.observe_temperature(reading);
        Ok(())
    }

    /// Record one probe sample per channel without regulating
    pub fn observe_all(&mut self, readings: &[Option<f32>; N]) {
        for (output, reading) in self.outputs.iter_mut().zip(readings) {
            output.observe_temperature(*reading);
        }
    }

    /// Switch channel `index` to a new mode. See [`Output::apply_state`].
    pub fn apply_state<D: PwmDriver + ?Sized>(
        &mut self,
        index: usize,
        request: ModeRequest,
        ambient_dewpoint: Option<f32>,
        driver: &mut D,
    ) -> ControlResult<f32> {
        self.output_mut(index)?.apply_state(request, ambient_dewpoint, driver)
    }

    /// Apply a validated command, updating the persistence flag on success
    pub fn apply_command<D: PwmDriver + ?Sized>(
        &mut self,
        command: &OutputCommand,
        ambient_dewpoint: Option<f32>,
        driver: &mut D,
    ) -> ControlResult<f32> {
        let output = self.output_mut(usize::from(command.index))?;
        let duty = output.apply_state(command.request, ambient_dewpoint, driver)?;
        output.set_apply_at_startup(command.apply_at_startup);
        Ok(duty)
    }

    /// Regulate every channel with this tick's readings
    pub fn regulate_all<D: PwmDriver + ?Sized>(
        &mut self,
        readings: &[Option<f32>; N],
        ambient_dewpoint: Option<f32>,
        driver: &mut D,
    ) -> [f32; N] {
        core::array::from_fn(|i| self.outputs[i].regulate(readings[i], ambient_dewpoint, &mut *driver))
    }

    fn output_mut(&mut self, index: usize) -> ControlResult<&mut Output> {
        self.outputs.get_mut(index).ok_or_else(|| {
            ValidationError::InvalidIndex {
                index: index as i64,
                channels: N,
            }
            .into()
        })
    }
}
