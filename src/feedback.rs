//! Turns collision events into throttled audio triggers.

use std::collections::HashMap;

use crate::{
    audio::{AudioClip, AudioSink, NullAudioSink},
    collision::contact::CollisionEvent,
    config::FeedbackConfig,
    core::rigidbody::BodyHandle,
    error::AudioError,
    registry::EntryHandle,
    utils::allocator::{typed_handle, Arena},
    world::CollisionListener,
};

typed_handle!(
    /// Subscription of one body to collision feedback; returned by
    /// [`CollisionFeedbackBridge::attach`].
    ListenerToken
);

/// Body-to-entry subscriptions the registry keeps in step with its entries.
pub trait FeedbackRoutes {
    fn attach(&mut self, body: BodyHandle, entry: Option<EntryHandle>) -> ListenerToken;

    /// Returns `false` for stale tokens.
    fn detach(&mut self, token: ListenerToken) -> bool;
}

/// Request to play the hit sound once.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrigger {
    pub clip: AudioClip,
    /// In `[0, 1]`.
    pub volume: f32,
    /// Routed body that took part in the collision.
    pub body: BodyHandle,
    pub entry: Option<EntryHandle>,
}

/// Counters describing what happened to each received event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackStats {
    pub dispatched: usize,
    pub below_threshold: usize,
    /// Triggers lost to a missing clip or an unavailable/busy device.
    pub dropped: usize,
    /// Events involving no attached body.
    pub unrouted: usize,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    body: BodyHandle,
    entry: Option<EntryHandle>,
}

/// Collision listener that maps impact strength to hit-sound volume.
pub struct CollisionFeedbackBridge {
    config: FeedbackConfig,
    clip: Option<AudioClip>,
    sink: Box<dyn AudioSink>,
    routes: Arena<Route>,
    by_body: HashMap<BodyHandle, ListenerToken>,
    stats: FeedbackStats,
}

impl Default for CollisionFeedbackBridge {
    fn default() -> Self {
        Self::new(FeedbackConfig::default(), None, Box::new(NullAudioSink))
    }
}

impl CollisionFeedbackBridge {
    pub fn new(config: FeedbackConfig, clip: Option<AudioClip>, sink: Box<dyn AudioSink>) -> Self {
        Self {
            config,
            clip,
            sink,
            routes: Arena::new(),
            by_body: HashMap::new(),
            stats: FeedbackStats::default(),
        }
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    /// Sets the clip once asset loading completes (or clears it).
    pub fn set_clip(&mut self, clip: Option<AudioClip>) {
        self.clip = clip;
    }

    pub fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    pub fn set_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.sink = sink;
    }

    pub fn stats(&self) -> FeedbackStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = FeedbackStats::default();
    }

    /// Routes events for `body` to feedback. Re-attaching a body replaces
    /// its previous subscription.
    pub fn attach(&mut self, body: BodyHandle, entry: Option<EntryHandle>) -> ListenerToken {
        if let Some(previous) = self.by_body.get(&body).copied() {
            self.detach(previous);
        }
        let token = ListenerToken(self.routes.insert(Route { body, entry }));
        self.by_body.insert(body, token);
        token
    }

    /// Stops routing for the token's body. Stale tokens are ignored.
    pub fn detach(&mut self, token: ListenerToken) -> bool {
        match self.routes.remove(token.id()) {
            Some(route) => {
                self.by_body.remove(&route.body);
                true
            }
            None => false,
        }
    }

    pub fn is_routed(&self, body: BodyHandle) -> bool {
        self.by_body.contains_key(&body)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Volume for an impact of `strength`, or `None` below the threshold.
    pub fn volume_for(&self, strength: f32) -> Option<f32> {
        if strength.is_finite() && strength >= self.config.min_impact_strength {
            Some((strength / self.config.normalization).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    fn route_for(&self, event: &CollisionEvent) -> Option<Route> {
        [event.body_a, event.body_b]
            .into_iter()
            .filter_map(|body| self.by_body.get(&body))
            .find_map(|token| self.routes.get(token.id()).copied())
    }

    fn dispatch(&mut self, route: Route, volume: f32) -> Result<(), AudioError> {
        let clip = self
            .clip
            .clone()
            .ok_or_else(|| AudioError::AssetMissing("hit".to_string()))?;
        self.sink.submit(AudioTrigger {
            clip,
            volume,
            body: route.body,
            entry: route.entry,
        })
    }
}

impl FeedbackRoutes for CollisionFeedbackBridge {
    fn attach(&mut self, body: BodyHandle, entry: Option<EntryHandle>) -> ListenerToken {
        CollisionFeedbackBridge::attach(self, body, entry)
    }

    fn detach(&mut self, token: ListenerToken) -> bool {
        CollisionFeedbackBridge::detach(self, token)
    }
}

impl CollisionListener for CollisionFeedbackBridge {
    fn on_collision(&mut self, event: &CollisionEvent) {
        let Some(route) = self.route_for(event) else {
            self.stats.unrouted += 1;
            return;
        };

        let Some(volume) = self.volume_for(event.impact_strength()) else {
            self.stats.below_threshold += 1;
            return;
        };

        match self.dispatch(route, volume) {
            Ok(()) => self.stats.dispatched += 1,
            Err(err) => {
                self.stats.dropped += 1;
                log::warn!("collision sound dropped: {err}");
            }
        }
    }
}
