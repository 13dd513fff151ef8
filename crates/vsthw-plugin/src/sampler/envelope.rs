/// Linear ADSR used by each sampler voice.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    sample_rate: f32,
    stage: EnvelopeStage,
    value: f32,
    release_rate: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
            sample_rate: 44_100.0,
            stage: EnvelopeStage::Idle,
            value: 0.0,
            release_rate: 0.0,
        }
    }
}

impl Envelope {
    pub(crate) fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
    }

    pub(crate) fn set_params(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.attack = attack.max(0.0);
        self.decay = decay.max(0.0);
        self.sustain = sustain.clamp(0.0, 1.0);
        self.release = release.max(0.0);
    }

    pub(crate) fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub(crate) fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Starts from the current level, so a retriggered voice does not click.
    pub(crate) fn note_on(&mut self) {
        if self.attack_rate() > 0.0 {
            self.stage = EnvelopeStage::Attack;
        } else if self.decay_rate() > 0.0 {
            self.value = 1.0;
            self.stage = EnvelopeStage::Decay;
        } else {
            self.value = self.sustain;
            self.stage = EnvelopeStage::Sustain;
        }
    }

    pub(crate) fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        if self.release > 0.0 {
            self.release_rate = self.value / (self.release * self.sample_rate);
            self.stage = EnvelopeStage::Release;
        } else {
            self.reset();
        }
    }

    pub(crate) fn reset(&mut self) {
        self.value = 0.0;
        self.stage = EnvelopeStage::Idle;
    }

    pub(crate) fn next(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => return 0.0,
            EnvelopeStage::Attack => {
                self.value += self.attack_rate();
                if self.value >= 1.0 {
                    self.value = 1.0;
                    self.stage = if self.decay_rate() > 0.0 {
                        EnvelopeStage::Decay
                    } else {
                        EnvelopeStage::Sustain
                    };
                }
            }
            EnvelopeStage::Decay => {
                self.value -= self.decay_rate();
                if self.value <= self.sustain {
                    self.value = self.sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                self.value = self.sustain;
            }
            EnvelopeStage::Release => {
                self.value -= self.release_rate;
                if self.value <= 0.0 {
                    self.reset();
                }
            }
        }
        self.value
    }

    fn attack_rate(&self) -> f32 {
        if self.attack > 0.0 {
            1.0 / (self.attack * self.sample_rate)
        } else {
            0.0
        }
    }

    fn decay_rate(&self) -> f32 {
        if self.decay > 0.0 {
            (1.0 - self.sustain) / (self.decay * self.sample_rate)
        } else {
            0.0
        }
    }
}
