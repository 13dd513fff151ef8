use serde::{Deserialize, Serialize};

/// Channel configuration of a single bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Disabled,
    Mono,
    Stereo,
    Surround51,
    Custom(u8),
}

impl ChannelLayout {
    pub fn channels(&self) -> u8 {
        match self {
            ChannelLayout::Disabled => 0,
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Surround51 => 6,
            ChannelLayout::Custom(channels) => *channels,
        }
    }

    pub fn is_mono_or_stereo(&self) -> bool {
        matches!(self, ChannelLayout::Mono | ChannelLayout::Stereo)
    }
}

/// Main input and output bus layout proposed by the host during negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusesLayout {
    pub main_input: ChannelLayout,
    pub main_output: ChannelLayout,
}

impl BusesLayout {
    pub fn new(main_input: ChannelLayout, main_output: ChannelLayout) -> Self {
        Self {
            main_input,
            main_output,
        }
    }

    /// Same layout on input and output, the usual shape of an effect.
    pub fn matched(layout: ChannelLayout) -> Self {
        Self::new(layout, layout)
    }

    /// Output only, the usual shape of an instrument.
    pub fn generator(output: ChannelLayout) -> Self {
        Self::new(ChannelLayout::Disabled, output)
    }
}

/// Shared configuration passed to processors during preparation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BufferConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    pub layout: ChannelLayout,
    pub input: ChannelLayout,
}

impl BufferConfig {
    pub fn new(sample_rate: f32, block_size: usize, layout: ChannelLayout) -> Self {
        Self {
            sample_rate,
            block_size,
            layout,
            input: layout,
        }
    }

    pub fn with_input(mut self, input: ChannelLayout) -> Self {
        self.input = input;
        self
    }

    pub fn buses(&self) -> BusesLayout {
        BusesLayout::new(self.input, self.layout)
    }

    pub fn input_channels(&self) -> usize {
        self.input.channels() as usize
    }

    pub fn output_channels(&self) -> usize {
        self.layout.channels() as usize
    }
}

/// Non-interleaved audio buffer for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, block_size: usize) -> Self {
        let channels = (0..num_channels).map(|_| vec![0.0; block_size]).collect();
        Self { channels }
    }

    pub fn from_config(config: &BufferConfig) -> Self {
        Self::new(
            config.output_channels().max(config.input_channels()),
            config.block_size,
        )
    }

    /// Wraps existing channel data. Channels are expected to share a length.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        debug_assert!(channels.windows(2).all(|w| w[0].len() == w[1].len()));
        Self { channels }
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    pub fn clear_channel(&mut self, index: usize) {
        if let Some(channel) = self.channels.get_mut(index) {
            channel.fill(0.0);
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn len(&self) -> usize {
        self.channels
            .first()
            .map(|channel| channel.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.channels.get_mut(index).map(Vec::as_mut_slice)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.channels
            .iter_mut()
            .flat_map(|channel| channel.iter_mut())
    }

    pub fn channels(&self) -> impl Iterator<Item = &Vec<f32>> {
        self.channels.iter()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Vec<f32>> {
        self.channels.iter_mut()
    }

    pub fn as_slice(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn as_mut_slice(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_from_config_covers_both_buses() {
        let config = BufferConfig::new(48_000.0, 64, ChannelLayout::Stereo)
            .with_input(ChannelLayout::Mono);
        let buffer = AudioBuffer::from_config(&config);
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.len(), 64);
        assert_eq!(config.input_channels(), 1);
    }

    #[test]
    fn clear_channel_leaves_others() {
        let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 3], vec![2.0; 3]]);
        buffer.clear_channel(1);
        assert_eq!(buffer.channel(0), Some(&[1.0, 1.0, 1.0][..]));
        assert_eq!(buffer.channel(1), Some(&[0.0, 0.0, 0.0][..]));
        buffer.clear_channel(5);
    }
}
