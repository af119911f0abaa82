use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{GameError, GameResult};
use crate::signal::RedrawNotifier;
use crate::types::{MAILBOX_CAPACITY, MAX_HIT_POINTS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeltaKind {
    Damage,
    Heal,
}

/// The player's life counter, always within `0..=MAX_HIT_POINTS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthState {
    hit_points: u8,
}

impl HealthState {
    pub fn new(hit_points: u8) -> Self {
        Self {
            hit_points: hit_points.min(MAX_HIT_POINTS),
        }
    }

    pub fn hit_points(&self) -> u8 {
        self.hit_points
    }

    pub fn apply(&mut self, kind: DeltaKind, amount: u8) -> u8 {
        self.hit_points = match kind {
            DeltaKind::Damage => self.hit_points.saturating_sub(amount),
            DeltaKind::Heal => self.hit_points.saturating_add(amount).min(MAX_HIT_POINTS),
        };
        self.hit_points
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new(MAX_HIT_POINTS)
    }
}

#[derive(Debug)]
pub(crate) enum HealthCommand {
    Apply {
        kind: DeltaKind,
        amount: u8,
        reply: oneshot::Sender<u8>,
    },
}

/// Cloneable access to the health owner.
#[derive(Clone, Debug)]
pub struct HealthHandle {
    tx: mpsc::Sender<HealthCommand>,
}

impl HealthHandle {
    /// Applies a delta and waits for the acknowledgment, which carries the
    /// hit points right after this delta.
    pub async fn apply(&self, kind: DeltaKind, amount: u8) -> GameResult<u8> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(HealthCommand::Apply { kind, amount, reply })
            .await
            .map_err(|_| GameError::ActorStopped("health"))?;
        response.await.map_err(|_| GameError::ActorStopped("health"))
    }

    pub async fn damage(&self, amount: u8) -> GameResult<u8> {
        self.apply(DeltaKind::Damage, amount).await
    }

    pub async fn heal(&self, amount: u8) -> GameResult<u8> {
        self.apply(DeltaKind::Heal, amount).await
    }
}

struct HealthActor {
    state: HealthState,
    published: watch::Sender<u8>,
    redraw: RedrawNotifier,
    inbox: mpsc::Receiver<HealthCommand>,
}

impl HealthActor {
    async fn run(mut self) {
        while let Some(HealthCommand::Apply { kind, amount, reply }) = self.inbox.recv().await {
            let hit_points = self.state.apply(kind, amount);
            self.published.send_replace(hit_points);
            debug!(?kind, amount, hit_points, "health delta");
            let _ = reply.send(hit_points);
            self.redraw.notify();
        }
        debug!("health actor stopped");
    }
}

/// Starts the health owner.
///
/// The returned receiver is the read-only view of the hit points; it updates
/// after every applied delta.
pub fn spawn_health_actor(
    state: HealthState,
    redraw: RedrawNotifier,
) -> (HealthHandle, watch::Receiver<u8>, JoinHandle<()>) {
    let (tx, inbox) = mpsc::channel(MAILBOX_CAPACITY);
    let (published, hit_points) = watch::channel(state.hit_points());
    let actor = HealthActor {
        state,
        published,
        redraw,
        inbox,
    };
    (HealthHandle { tx }, hit_points, tokio::spawn(actor.run()))
}

#[cfg(test)]
pub(crate) fn handle_pair() -> (HealthHandle, mpsc::Receiver<HealthCommand>) {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    (HealthHandle { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::redraw_channel;
    use proptest::prelude::*;

    #[test]
    fn clamps_at_both_ends() {
        let mut health = HealthState::new(2);
        assert_eq!(health.apply(DeltaKind::Damage, 3), 0);
        assert_eq!(health.apply(DeltaKind::Damage, 1), 0);
        assert_eq!(health.apply(DeltaKind::Heal, 255), MAX_HIT_POINTS);
        assert_eq!(HealthState::new(200).hit_points(), MAX_HIT_POINTS);
    }

    #[tokio::test]
    async fn actor_acknowledges_and_publishes() {
        let (notifier, mut redraw) = redraw_channel();
        let (health, view, _task) = spawn_health_actor(HealthState::new(7), notifier);

        assert_eq!(health.damage(3).await.unwrap(), 4);
        assert_eq!(*view.borrow(), 4);
        assert!(redraw.try_take());

        assert_eq!(health.heal(1).await.unwrap(), 5);
        assert_eq!(*view.borrow(), 5);
    }

    fn run_concurrently(initial: u8, deltas: Vec<(DeltaKind, u8)>) -> (u8, Vec<u8>) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let (notifier, _redraw) = redraw_channel();
            let (health, view, _task) = spawn_health_actor(HealthState::new(initial), notifier);
            let tasks: Vec<_> = deltas
                .into_iter()
                .map(|(kind, amount)| {
                    let health = health.clone();
                    tokio::spawn(async move { health.apply(kind, amount).await.unwrap() })
                })
                .collect();
            let mut acks = Vec::new();
            for task in tasks {
                acks.push(task.await.unwrap());
            }
            let last = *view.borrow();
            (last, acks)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_mixed_deltas_stay_in_range(
            initial in 0u8..=10,
            deltas in proptest::collection::vec((prop::bool::ANY, 0u8..4), 1..40)
        ) {
            let deltas = deltas
                .into_iter()
                .map(|(heal, amount)| (if heal { DeltaKind::Heal } else { DeltaKind::Damage }, amount))
                .collect();
            let (last, acks) = run_concurrently(initial, deltas);
            prop_assert!(last <= MAX_HIT_POINTS);
            prop_assert!(acks.iter().all(|hp| *hp <= MAX_HIT_POINTS));
        }

        /// Damage only: clamping at zero commutes, so the order is irrelevant.
        #[test]
        fn prop_concurrent_damage_sums(initial in 0u8..=10, amounts in proptest::collection::vec(0u8..4, 1..30)) {
            let total: u32 = amounts.iter().map(|a| u32::from(*a)).sum();
            let deltas = amounts.into_iter().map(|a| (DeltaKind::Damage, a)).collect();
            let (last, _) = run_concurrently(initial, deltas);
            prop_assert_eq!(u32::from(last), u32::from(initial).saturating_sub(total));
        }

        #[test]
        fn prop_concurrent_heals_sum(initial in 0u8..=10, amounts in proptest::collection::vec(0u8..4, 1..30)) {
            let total: u32 = amounts.iter().map(|a| u32::from(*a)).sum();
            let deltas = amounts.into_iter().map(|a| (DeltaKind::Heal, a)).collect();
            let (last, _) = run_concurrently(initial, deltas);
            prop_assert_eq!(u32::from(last), (u32::from(initial) + total).min(u32::from(MAX_HIT_POINTS)));
        }
    }
}
