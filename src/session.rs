//! Try-on sessions
//!
//! A session owns one placement controller and the selected garment view.
//! Placement is never persisted; closing a session discards it.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::garment::{GarmentImages, GarmentView, ViewSelector};
use crate::placement::{
    InputEvent, InputOutcome, PlacementConfig, PlacementController, PlacementState, StepConfig,
};

/// Marks an auto-placement run with the generation it started from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimationTicket {
    pub session_id: Uuid,
    pub generation: u64,
}

/// One open try-on view
#[derive(Debug, Clone)]
pub struct TryOnSession {
    id: Uuid,
    controller: PlacementController,
    view: ViewSelector,
    images: Option<GarmentImages>,
    open: bool,
    fullscreen: bool,
    /// Bumped by every manual edit; stale estimates compare against it
    generation: u64,
    last_touched: Instant,
}

impl TryOnSession {
    pub fn new(config: PlacementConfig, images: Option<GarmentImages>) -> Self {
        Self {
            id: Uuid::new_v4(),
            controller: PlacementController::new(config),
            view: ViewSelector::default(),
            images,
            open: true,
            fullscreen: false,
            generation: 0,
            last_touched: Instant::now(),
        }
    }

    fn touch(&mut self, now: Instant) {
        self.last_touched = now;
    }

    /// Time since the session was last used, as of `now`
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_touched)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn placement(&self) -> PlacementState {
        self.controller.state()
    }

    pub fn view(&self) -> GarmentView {
        self.view.current()
    }

    /// Image for the selected view, if the session has a garment
    pub fn view_image(&self) -> Option<&str> {
        self.images.as_ref().map(|images| self.view.image(images))
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.controller.move_by(dx, dy);
        self.generation += 1;
    }

    pub fn drag_to(&mut self, delta_x: f32, delta_y: f32) {
        self.controller.drag_to(delta_x, delta_y);
        self.generation += 1;
    }

    pub fn scale_by(&mut self, ds: f32) {
        self.controller.scale_by(ds);
        self.generation += 1;
    }

    pub fn reset(&mut self) {
        self.controller.reset();
        self.generation += 1;
    }

    /// Switch garment view, keeping placement as is
    pub fn select_view(&mut self, view: GarmentView) {
        self.view.select(view);
    }

    /// Route an input event through the controller
    pub fn apply_input(&mut self, event: &InputEvent, steps: &StepConfig) -> InputOutcome {
        let outcome = event.apply(&mut self.controller, steps, self.open, self.fullscreen);
        match outcome {
            InputOutcome::Updated => self.generation += 1,
            InputOutcome::ExitFullscreen => self.fullscreen = false,
            InputOutcome::Close => self.close(),
            InputOutcome::Ignored => {}
        }
        outcome
    }

    pub fn close(&mut self) {
        self.open = false;
        self.generation += 1;
    }

    /// Start an auto-placement run
    pub fn begin_estimation(&self) -> EstimationTicket {
        EstimationTicket {
            session_id: self.id,
            generation: self.generation,
        }
    }

    /// Apply an estimate unless the session moved on since the ticket was taken.
    ///
    /// Returns whether the placement was replaced.
    pub fn apply_estimate(&mut self, ticket: EstimationTicket, state: PlacementState) -> bool {
        if ticket.session_id != self.id || !self.open || ticket.generation != self.generation {
            tracing::debug!(
                session = %self.id,
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                "Discarding stale placement estimate"
            );
            return false;
        }
        self.controller.replace(state);
        self.generation += 1;
        true
    }
}

/// All live sessions of the process
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, TryOnSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session and return a copy of it
    pub fn open(&self, config: PlacementConfig, images: Option<GarmentImages>) -> TryOnSession {
        let session = TryOnSession::new(config, images);
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session.id(), session.clone());
        tracing::info!(session = %session.id(), "Try-on session opened");
        session
    }

    /// Copy of a session; counts as activity
    pub fn get(&self, id: Uuid) -> Option<TryOnSession> {
        self.with_session(id, |s| s.clone())
    }

    /// Run `f` against a session under the write lock, marking it active
    pub fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut TryOnSession) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.get_mut(&id).map(|session| {
            session.touch(Instant::now());
            f(session)
        })
    }

    /// Close and forget a session; late estimates for it are dropped
    pub fn close(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        match sessions.remove(&id) {
            Some(mut session) => {
                session.close();
                tracing::info!(session = %id, "Try-on session closed");
                true
            }
            None => false,
        }
    }

    /// Remove sessions closed through input (Escape)
    pub fn prune_closed(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| s.is_open());
        before - sessions.len()
    }

    /// Drop closed sessions and those idle for longer than `ttl`
    pub fn sweep_idle(&self, ttl: Duration) -> usize {
        self.sweep_idle_at(Instant::now(), ttl)
    }

    pub fn sweep_idle_at(&self, now: Instant, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|id, s| {
            let keep = s.is_open() && s.idle_for(now) <= ttl;
            if !keep {
                tracing::info!(session = %id, "Try-on session expired");
            }
            keep
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::Key;

    fn seed() -> PlacementState {
        PlacementState::new(-80.0, -15.0, 1.0)
    }

    #[test]
    fn test_estimate_applies_when_fresh() {
        let mut session = TryOnSession::new(PlacementConfig::default(), None);
        let ticket = session.begin_estimation();
        assert!(session.apply_estimate(ticket, seed()));
        assert_eq!(session.placement(), seed());
    }

    #[test]
    fn test_manual_edit_beats_pending_estimate() {
        let mut session = TryOnSession::new(PlacementConfig::default(), None);
        let ticket = session.begin_estimation();
        session.move_by(5.0, 0.0);
        let after_edit = session.placement();
        assert!(!session.apply_estimate(ticket, seed()));
        assert_eq!(session.placement(), after_edit);
    }

    #[test]
    fn test_estimate_for_other_or_closed_session_dropped() {
        let mut a = TryOnSession::new(PlacementConfig::default(), None);
        let b = TryOnSession::new(PlacementConfig::default(), None);
        assert!(!a.apply_estimate(b.begin_estimation(), seed()));

        let ticket = a.begin_estimation();
        a.close();
        assert!(!a.apply_estimate(ticket, seed()));
    }

    #[test]
    fn test_view_switch_keeps_placement() {
        let mut session = TryOnSession::new(PlacementConfig::default(), None);
        session.move_by(7.0, 3.0);
        session.scale_by(0.2);
        let before = session.placement();
        session.select_view(GarmentView::Back);
        session.select_view(GarmentView::Front);
        assert_eq!(session.placement(), before);
        assert_eq!(session.view(), GarmentView::Front);
    }

    #[test]
    fn test_escape_closes_or_exits_fullscreen() {
        let steps = StepConfig::default();
        let mut session = TryOnSession::new(PlacementConfig::default(), None);
        session.set_fullscreen(true);
        let esc = InputEvent::Key { key: Key::Escape };
        assert_eq!(session.apply_input(&esc, &steps), InputOutcome::ExitFullscreen);
        assert!(session.is_open());
        assert_eq!(session.apply_input(&esc, &steps), InputOutcome::Close);
        assert!(!session.is_open());

        let up = InputEvent::Key { key: Key::ArrowUp };
        assert_eq!(session.apply_input(&up, &steps), InputOutcome::Ignored);
        assert_eq!(session.placement(), PlacementState::DEFAULT);
    }

    #[test]
    fn test_registry_lifecycle() {
        let registry = SessionRegistry::new();
        let session = registry.open(PlacementConfig::default(), None);
        let id = session.id();
        assert_eq!(registry.len(), 1);

        registry.with_session(id, |s| s.scale_by(0.1));
        let stored = registry.get(id).unwrap();
        assert!((stored.placement().scale - 0.6).abs() < 1e-6);

        assert!(registry.close(id));
        assert!(!registry.close(id));
        assert!(registry.get(id).is_none());
        assert!(registry.with_session(id, |s| s.reset()).is_none());
    }

    #[test]
    fn test_prune_closed() {
        let registry = SessionRegistry::new();
        let id = registry.open(PlacementConfig::default(), None).id();
        registry.open(PlacementConfig::default(), None);
        registry.with_session(id, |s| s.close());
        assert_eq!(registry.prune_closed(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sweep_drops_idle_sessions() {
        let registry = SessionRegistry::new();
        let idle = registry.open(PlacementConfig::default(), None).id();
        let busy = registry.open(PlacementConfig::default(), None).id();
        let ttl = Duration::from_secs(60);

        assert_eq!(registry.sweep_idle(ttl), 0);

        let later = Instant::now() + Duration::from_secs(90);
        registry.with_session(busy, |s| s.touch(later));
        assert_eq!(registry.sweep_idle_at(later, ttl), 1);
        assert!(registry.get(idle).is_none());
        assert!(registry.get(busy).is_some());
    }
}
