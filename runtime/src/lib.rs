//! # Seatbook Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns state, runs the reducer, executes effects
//! - **Effect Executor**: Spawns effect descriptions and feeds produced actions back
//! - **`EffectHandle`**: Lets callers wait until the effects of an action (and any
//!   actions they fed back) have finished
//!
//! ## Example
//!
//! ```ignore
//! use seatbook_runtime::Store;
//!
//! let store = Store::new(ThemeState::default(), ThemeReducer, environment);
//!
//! // Send an action and wait for its effects
//! let mut handle = store.send(ThemeAction::Toggle).await?;
//! handle.wait().await;
//!
//! // Read state
//! let dark = store.state(|s| s.is_dark()).await;
//! ```

use seatbook_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,
    }
}

pub use error::StoreError;
pub use store::Store;

/// Handle to the effects spawned by one `send`.
///
/// Dropping the handle does not cancel anything; effects keep running.
#[derive(Debug, Default)]
pub struct EffectHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl EffectHandle {
    /// A handle with nothing to wait for
    #[must_use]
    pub const fn completed() -> Self {
        Self { tasks: Vec::new() }
    }

    fn push(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Whether every tracked effect has finished
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every tracked effect, including actions they fed back.
    ///
    /// A panicking effect is logged and does not abort the wait.
    pub async fn wait(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(error) = task.await {
                tracing::error!(%error, "Effect task failed");
            }
        }
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{Arc, AtomicBool, Effect, EffectHandle, Ordering, Reducer, RwLock, StoreError};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (state transitions)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Cloning a Store yields another handle to the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Send an action to the store
        ///
        /// Runs the reducer under the state write lock, then starts every
        /// returned effect. The returned handle tracks those effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] after [`Store::shutdown`].
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(StoreError::ShutdownInProgress);
            }

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.environment)
            };

            let mut handle = EffectHandle::completed();
            for effect in effects {
                self.execute_effect(effect, &mut handle);
            }
            Ok(handle)
        }

        /// Read state via a closure
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Stop accepting actions. Effects already running are not cancelled.
        pub fn shutdown(&self) {
            self.shutdown.store(true, Ordering::SeqCst);
            tracing::debug!("Store shut down");
        }

        /// Whether [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shutdown(&self) -> bool {
            self.shutdown.load(Ordering::SeqCst)
        }

        async fn feed_back(&self, action: A) {
            match self.send(action).await {
                Ok(mut handle) => handle.wait().await,
                Err(error) => {
                    tracing::warn!(%error, "Dropped action produced by effect");
                },
            }
        }

        /// Execute an effect, registering spawned work on `handle`
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        fn execute_effect(&self, effect: Effect<A>, handle: &mut EffectHandle) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    let store = self.clone();
                    handle.push(tokio::spawn(async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action).await;
                        }
                    }));
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
            }
        }
    }
}
