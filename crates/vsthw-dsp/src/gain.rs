/// Linear multiplier derived from a decibel value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gain {
    linear: f32,
}

impl Gain {
    #[inline]
    pub fn unity() -> Self {
        Self { linear: 1.0 }
    }

    #[inline]
    pub fn from_db(db: f32) -> Self {
        Self {
            linear: db_to_linear(db),
        }
    }

    #[inline]
    pub fn linear(&self) -> f32 {
        self.linear
    }

    /// Scales every sample of `samples` in place.
    #[inline]
    pub fn process_in_place(&self, samples: &mut [f32]) {
        let linear = self.linear;
        for sample in samples {
            *sample *= linear;
        }
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::unity()
    }
}

/// `10^(db / 20)`. Non-finite input is passed through the formula untouched.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Applies `gain_db` to the first `num_input_channels` channels of a
/// non-interleaved block. Remaining channels are left as they are.
#[inline]
pub fn apply_gain<C>(channels: &mut [C], num_input_channels: usize, gain_db: f32)
where
    C: AsMut<[f32]>,
{
    let gain = Gain::from_db(gain_db);
    for channel in channels.iter_mut().take(num_input_channels) {
        gain.process_in_place(channel.as_mut());
    }
}
