//! Borrowed views over the host's audio buffers.
//!
//! [`AudioPorts`] wraps the pointer arrays of one `clap_process` call
//! without copying a single sample. The view is only valid for the duration
//! of that call and must never be retained; lifetimes enforce this on the
//! Rust side, and the managed side receives the same raw pointer arrays
//! under the same contract.

use crate::util::{slice_from_external_parts, slice_from_external_parts_mut};
use clap_sys::audio_buffer::clap_audio_buffer;
use clap_sys::process::clap_process;

/// Hint bitmask marking which channels of a port are constant.
///
/// A constant channel has the same value in every sample, which is not
/// necessarily silence. Capacity is 64 channels, as per the CLAP ABI;
/// channels beyond that are reported as never constant.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
#[repr(transparent)]
pub struct ConstantMask(u64);

impl ConstantMask {
    pub const FULLY_CONSTANT: ConstantMask = ConstantMask(u64::MAX);
    pub const FULLY_DYNAMIC: ConstantMask = ConstantMask(0);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        ConstantMask(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_channel_constant(&self, channel_index: u32) -> bool {
        if channel_index > 63 {
            return false;
        }
        (self.0 & (1 << channel_index)) != 0
    }

    #[inline]
    pub fn set_channel_constant(&mut self, channel_index: u32, value: bool) {
        if channel_index > 63 {
            return;
        }
        if value {
            self.0 |= 1 << channel_index;
        } else {
            self.0 &= !(1 << channel_index);
        }
    }
}

impl std::fmt::Debug for ConstantMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Binary::fmt(&self.0, f)
    }
}

/// All audio ports of one process call.
pub struct AudioPorts<'a> {
    inputs: &'a [clap_audio_buffer],
    outputs: &'a mut [clap_audio_buffer],
    frames_count: u32,
}

impl<'a> AudioPorts<'a> {
    /// Builds the view from the host's process struct.
    ///
    /// # Safety
    ///
    /// `process` must be the current, valid process struct; the returned
    /// view must not outlive the process call.
    pub unsafe fn from_process(process: &'a clap_process) -> Self {
        Self {
            inputs: slice_from_external_parts(
                process.audio_inputs,
                process.audio_inputs_count as usize,
            ),
            outputs: slice_from_external_parts_mut(
                process.audio_outputs,
                process.audio_outputs_count as usize,
            ),
            frames_count: process.frames_count,
        }
    }

    #[inline]
    pub fn frames_count(&self) -> u32 {
        self.frames_count
    }

    #[inline]
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input(&self, index: usize) -> Option<InputPort<'_>> {
        self.inputs.get(index).map(|raw| InputPort {
            raw,
            frames_count: self.frames_count,
        })
    }

    pub fn output(&mut self, index: usize) -> Option<OutputPort<'_>> {
        let frames_count = self.frames_count;
        self.outputs
            .get_mut(index)
            .map(move |raw| OutputPort { raw, frames_count })
    }

    /// Whether an input and an output port share sample storage.
    ///
    /// In-place pairs are declared through the audio-ports extension; at
    /// process time the only observable fact is pointer identity, which is
    /// what hosts actually use.
    pub fn is_in_place(&self, input_index: usize, output_index: usize) -> bool {
        let (Some(input), Some(output)) =
            (self.inputs.get(input_index), self.outputs.get(output_index))
        else {
            return false;
        };

        (!input.data32.is_null() && input.data32 == output.data32)
            || (!input.data64.is_null() && input.data64 == output.data64)
    }

    /// Zeroes every output channel and marks them constant.
    ///
    /// Used when the managed process reports an error: the host may keep
    /// playing whatever is in the buffers, so they must not carry garbage.
    pub fn silence_outputs(&mut self) {
        let frames_count = self.frames_count;
        for index in 0..self.outputs.len() {
            let mut port = OutputPort {
                raw: &mut self.outputs[index],
                frames_count,
            };
            port.silence();
        }
    }
}

/// One input port: read-only channel data.
pub struct InputPort<'a> {
    raw: &'a clap_audio_buffer,
    frames_count: u32,
}

impl<'a> InputPort<'a> {
    #[inline]
    pub fn channel_count(&self) -> u32 {
        self.raw.channel_count
    }

    #[inline]
    pub fn constant_mask(&self) -> ConstantMask {
        ConstantMask::from_bits(self.raw.constant_mask)
    }

    #[inline]
    pub fn latency(&self) -> u32 {
        self.raw.latency
    }

    /// `true` if the host provided 64-bit sample data for this port.
    #[inline]
    pub fn is_64_bit(&self) -> bool {
        !self.raw.data64.is_null()
    }

    pub fn channel32(&self, channel: u32) -> Option<&'a [f32]> {
        if channel >= self.raw.channel_count || self.raw.data32.is_null() {
            return None;
        }
        // SAFETY: the host guarantees channel_count valid pointers of
        // frames_count samples each for the duration of the process call.
        unsafe {
            let ptr = *self.raw.data32.add(channel as usize);
            Some(slice_from_external_parts(ptr, self.frames_count as usize))
        }
    }

    pub fn channel64(&self, channel: u32) -> Option<&'a [f64]> {
        if channel >= self.raw.channel_count || self.raw.data64.is_null() {
            return None;
        }
        // SAFETY: as in channel32.
        unsafe {
            let ptr = *self.raw.data64.add(channel as usize);
            Some(slice_from_external_parts(ptr, self.frames_count as usize))
        }
    }
}

/// One output port: writable channel data plus its constant mask.
pub struct OutputPort<'a> {
    raw: &'a mut clap_audio_buffer,
    frames_count: u32,
}

impl OutputPort<'_> {
    #[inline]
    pub fn channel_count(&self) -> u32 {
        self.raw.channel_count
    }

    #[inline]
    pub fn constant_mask(&self) -> ConstantMask {
        ConstantMask::from_bits(self.raw.constant_mask)
    }

    #[inline]
    pub fn set_constant_mask(&mut self, mask: ConstantMask) {
        self.raw.constant_mask = mask.to_bits();
    }

    pub fn channel32_mut(&mut self, channel: u32) -> Option<&mut [f32]> {
        if channel >= self.raw.channel_count || self.raw.data32.is_null() {
            return None;
        }
        // SAFETY: the host guarantees channel_count valid, writable pointers
        // of frames_count samples each for the duration of the process call.
        unsafe {
            let ptr = *self.raw.data32.add(channel as usize);
            Some(slice_from_external_parts_mut(
                ptr,
                self.frames_count as usize,
            ))
        }
    }

    pub fn channel64_mut(&mut self, channel: u32) -> Option<&mut [f64]> {
        if channel >= self.raw.channel_count || self.raw.data64.is_null() {
            return None;
        }
        // SAFETY: as in channel32_mut.
        unsafe {
            let ptr = *self.raw.data64.add(channel as usize);
            Some(slice_from_external_parts_mut(
                ptr,
                self.frames_count as usize,
            ))
        }
    }

    /// Writes silence to every channel and flags them all constant.
    pub fn silence(&mut self) {
        for channel in 0..self.raw.channel_count {
            if let Some(samples) = self.channel32_mut(channel) {
                samples.fill(0.0);
            }
            if let Some(samples) = self.channel64_mut(channel) {
                samples.fill(0.0);
            }
        }
        self.set_constant_mask(ConstantMask::FULLY_CONSTANT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StereoFixture {
        left: Vec<f32>,
        right: Vec<f32>,
        channels: Vec<*mut f32>,
    }

    impl StereoFixture {
        fn new(frames: usize) -> Self {
            let mut fixture = Self {
                left: vec![0.25; frames],
                right: vec![-0.5; frames],
                channels: Vec::new(),
            };
            fixture.channels = vec![
                fixture.left.as_mut_ptr(),
                fixture.right.as_mut_ptr(),
            ];
            fixture
        }

        fn buffer(&mut self) -> clap_audio_buffer {
            clap_audio_buffer {
                data32: self.channels.as_mut_ptr(),
                data64: std::ptr::null_mut(),
                channel_count: 2,
                latency: 0,
                constant_mask: 0b10,
            }
        }
    }

    fn process_with(
        inputs: *const clap_audio_buffer,
        n_in: u32,
        outputs: *mut clap_audio_buffer,
        n_out: u32,
        frames: u32,
    ) -> clap_process {
        clap_process {
            steady_time: 0,
            frames_count: frames,
            transport: std::ptr::null(),
            audio_inputs: inputs,
            audio_outputs: outputs,
            audio_inputs_count: n_in,
            audio_outputs_count: n_out,
            in_events: std::ptr::null(),
            out_events: std::ptr::null(),
        }
    }

    #[test]
    fn views_expose_channels_without_copying() {
        let mut fixture = StereoFixture::new(64);
        let input = [fixture.buffer()];
        let process = process_with(input.as_ptr(), 1, std::ptr::null_mut(), 0, 64);

        // SAFETY: all pointers live for this test body.
        let ports = unsafe { AudioPorts::from_process(&process) };

        assert_eq!(ports.input_count(), 1);
        assert_eq!(ports.frames_count(), 64);

        let port = ports.input(0).unwrap();
        assert_eq!(port.channel_count(), 2);
        assert!(!port.is_64_bit());
        assert_eq!(port.channel32(0).unwrap()[0], 0.25);
        assert_eq!(port.channel32(1).unwrap()[63], -0.5);
        assert!(port.channel32(2).is_none());
        assert!(port.channel64(0).is_none());

        assert!(!port.constant_mask().is_channel_constant(0));
        assert!(port.constant_mask().is_channel_constant(1));
    }

    #[test]
    fn silencing_outputs_zeroes_and_marks_constant() {
        let mut fixture = StereoFixture::new(16);
        let mut output = [fixture.buffer()];
        let process = process_with(std::ptr::null(), 0, output.as_mut_ptr(), 1, 16);

        // SAFETY: all pointers live for this test body.
        let mut ports = unsafe { AudioPorts::from_process(&process) };
        ports.silence_outputs();

        assert!(fixture.left.iter().all(|&s| s == 0.0));
        assert!(fixture.right.iter().all(|&s| s == 0.0));
        assert_eq!(output[0].constant_mask, u64::MAX);
    }

    #[test]
    fn in_place_pairs_are_detected_by_pointer_identity() {
        let mut shared = StereoFixture::new(8);
        let mut distinct = StereoFixture::new(8);

        let input = [shared.buffer()];
        let mut outputs = [shared.buffer(), distinct.buffer()];
        let process = process_with(input.as_ptr(), 1, outputs.as_mut_ptr(), 2, 8);

        // SAFETY: all pointers live for this test body.
        let ports = unsafe { AudioPorts::from_process(&process) };
        assert!(ports.is_in_place(0, 0));
        assert!(!ports.is_in_place(0, 1));
    }

    #[test]
    fn constant_mask_bit_operations() {
        let mut mask = ConstantMask::from_bits(0b101);
        assert!(mask.is_channel_constant(0));
        assert!(!mask.is_channel_constant(1));
        assert!(mask.is_channel_constant(2));
        assert!(!mask.is_channel_constant(64));

        mask.set_channel_constant(1, true);
        assert_eq!(mask.to_bits(), 0b111);
        mask.set_channel_constant(0, false);
        assert_eq!(mask.to_bits(), 0b110);
    }
}
