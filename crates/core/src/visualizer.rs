//! Visualizer - generator and bus wired together.
//!
//! This is the producer side of the pipeline: each call to
//! [`Visualizer::handle_effect_event`] renders one frame and publishes it on
//! [`FRAME_EVENT`].

use tracing::debug;

use crate::bus::{EventBus, HandlerResult, SubscriptionId, FRAME_EVENT};
use crate::generator::FrameGenerator;
use crate::rng::{RandomSource, SimpleRng};
use crate::types::{EffectEvent, FramePayload, RenderMode};

#[derive(Debug)]
pub struct Visualizer<R = SimpleRng> {
    generator: FrameGenerator<R>,
    bus: EventBus<FramePayload>,
}

impl Visualizer<SimpleRng> {
    pub fn new(seed: u32) -> Self {
        Self::with_generator(FrameGenerator::new(seed))
    }
}

impl Default for Visualizer<SimpleRng> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<R: RandomSource> Visualizer<R> {
    pub fn with_generator(generator: FrameGenerator<R>) -> Self {
        Self {
            generator,
            bus: EventBus::new(),
        }
    }

    /// Render a frame for `event` and publish it to every frame subscriber.
    pub fn handle_effect_event(&mut self, event: &EffectEvent, mode: RenderMode, full_view: bool) {
        let frame = self.generator.generate_frame(event, mode, full_view);
        let report = self.bus.emit(FRAME_EVENT, &frame);
        debug!(
            tick = frame.meta.tick,
            mode = mode.as_str(),
            delivered = report.delivered,
            failed = report.failed,
            "frame emitted"
        );
    }

    /// Shorthand for subscribing to [`FRAME_EVENT`].
    pub fn on_frame<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&FramePayload) -> HandlerResult + 'static,
    {
        self.bus.on(FRAME_EVENT, handler)
    }

    pub fn off_frame(&mut self, id: SubscriptionId) -> bool {
        self.bus.off(FRAME_EVENT, id)
    }

    pub fn generator(&self) -> &FrameGenerator<R> {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut FrameGenerator<R> {
        &mut self.generator
    }
}
