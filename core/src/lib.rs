//! # Seatbook Core
//!
//! Core traits and seam types shared by every Seatbook crate.
//!
//! The crate has two halves:
//!
//! - The **reducer architecture** used for local UI-facing state
//!   (session, theme): [`reducer::Reducer`], [`effect::Effect`] and the
//!   injected [`environment`] traits.
//! - The **external seams** the application talks to: the
//!   [`document::DocumentStore`] (managed document database) and the
//!   [`identity::IdentityProvider`] (managed auth service).
//!
//! ## Core Concepts
//!
//! - **State**: Owned, clonable domain state for a feature
//! - **Action**: All possible inputs to a reducer
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use seatbook_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for ThemeReducer {
//!     type State = ThemeState;
//!     type Action = ThemeAction;
//!     type Environment = ThemeEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ThemeState,
//!         action: ThemeAction,
//!         env: &ThemeEnvironment,
//!     ) -> SmallVec<[Effect<ThemeAction>; 4]> {
//!         // Business logic goes here
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

pub mod document;
pub mod identity;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They are deterministic and testable without a runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates state in place and returns effect descriptions for the
        /// runtime to execute. Most reducers return one or two effects, so
        /// the inline capacity of four avoids heap allocation.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions returned
    /// from reducers and executed by the runtime `Store`. A reducer that
    /// returns several effects has them run concurrently.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// Everything a component needs from the outside world that is not one of
/// the two managed-backend seams lives here: time and client-local storage.
pub mod environment {
    use chrono::{DateTime, Utc};
    use thiserror::Error;

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Errors raised by a [`LocalStorage`] implementation.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StorageError {
        /// Backing medium could not be read
        #[error("Storage read failed: {0}")]
        ReadFailed(String),

        /// Backing medium could not be written
        #[error("Storage write failed: {0}")]
        WriteFailed(String),
    }

    /// Client-local string key/value storage (the browser `localStorage` role).
    ///
    /// Calls are synchronous; implementations are expected to be small and
    /// local (a file, a map).
    pub trait LocalStorage: Send + Sync {
        /// Read the value stored under `key`.
        ///
        /// # Errors
        ///
        /// Returns [`StorageError::ReadFailed`] if the backing medium fails.
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

        /// Store `value` under `key`, replacing any previous value.
        ///
        /// # Errors
        ///
        /// Returns [`StorageError::WriteFailed`] if the backing medium fails.
        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    }
}
