//! # Core Entities
//!
//! Identifiers and state enums shared by every crate in the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since an arbitrary epoch supplied by a [`crate::TimeSource`].
pub type Timestamp = u64;

/// Closed set of subsystems the runtime knows how to manage.
///
/// The registry is keyed by this tag set instead of free-form strings, so a
/// lookup for a subsystem that does not exist fails at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubsystemId {
    /// Configuration loading.
    Config,
    /// Asset bundles and content packs.
    Assets,
    /// Audio mixing and playback.
    Audio,
    /// Input device mapping.
    Input,
    /// Localization tables.
    Localization,
    /// Save-file encoding and persistence.
    Save,
    /// UI widgets and overlays.
    Ui,
    /// Scene cache and loader.
    Scenes,
    /// Educational content (lessons, assessments, dialogue).
    Content,
}

impl SubsystemId {
    /// Get the display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Config => "Config",
            Self::Assets => "Assets",
            Self::Audio => "Audio",
            Self::Input => "Input",
            Self::Localization => "Localization",
            Self::Save => "Save",
            Self::Ui => "UI",
            Self::Scenes => "Scenes",
            Self::Content => "Content",
        }
    }

    /// Parse a display name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Get all subsystem IDs.
    #[must_use]
    pub fn all() -> Vec<SubsystemId> {
        vec![
            Self::Config,
            Self::Assets,
            Self::Audio,
            Self::Input,
            Self::Localization,
            Self::Save,
            Self::Ui,
            Self::Scenes,
            Self::Content,
        ]
    }

    /// Boot order used when none is configured.
    ///
    /// Config first, content last: every later entry may read what an
    /// earlier one set up.
    #[must_use]
    pub fn default_init_order() -> Vec<SubsystemId> {
        vec![
            Self::Config,
            Self::Save,
            Self::Localization,
            Self::Assets,
            Self::Audio,
            Self::Input,
            Self::Ui,
            Self::Scenes,
            Self::Content,
        ]
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-subsystem lifecycle state tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Registered but never initialized (or shut down).
    NotInitialized,
    /// `initialize()` is in flight.
    Initializing,
    /// Initialized and available.
    Ready,
    /// Initialization or a health check failed.
    Error,
    /// `shutdown()` is in flight.
    ShuttingDown,
}

impl LifecycleState {
    /// Whether `next` is a forward edge of the lifecycle.
    ///
    /// `Error -> Initializing` is deliberately absent: only the recovery
    /// controller may take that edge, through an explicit reset.
    #[must_use]
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::{Error, Initializing, NotInitialized, Ready, ShuttingDown};
        matches!(
            (self, next),
            (NotInitialized, Initializing)
                | (Initializing, Ready)
                | (Initializing, Error)
                | (Ready, Error)
                | (Ready, ShuttingDown)
                | (Error, ShuttingDown)
                | (ShuttingDown, NotInitialized)
        )
    }
}

/// Global application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// Booting subsystems.
    Initializing,
    /// Main menu is shown.
    MainMenu,
    /// A scene swap is in progress.
    Loading,
    /// A scene is being played.
    Playing,
    /// Simulation suspended.
    Paused,
    /// An assessment is running.
    Assessment,
    /// A non-interactive cutscene is playing.
    Cutscene,
    /// Settings screen is open.
    Settings,
    /// Unrecoverable startup failure or explicit error state.
    Error,
}

impl GameState {
    /// Every game state.
    #[must_use]
    pub fn all() -> [GameState; 9] {
        [
            Self::Initializing,
            Self::MainMenu,
            Self::Loading,
            Self::Playing,
            Self::Paused,
            Self::Assessment,
            Self::Cutscene,
            Self::Settings,
            Self::Error,
        ]
    }

    /// Legal successors of this state.
    ///
    /// This is the static adjacency table; anything not listed here is an
    /// invalid transition unless forced.
    #[must_use]
    pub fn successors(self) -> &'static [GameState] {
        use GameState::{
            Assessment, Cutscene, Error, Initializing, Loading, MainMenu, Paused, Playing,
            Settings,
        };
        match self {
            Initializing => &[MainMenu, Error],
            MainMenu => &[Loading, Settings, Error],
            Loading => &[Playing, MainMenu, Cutscene, Assessment, Error],
            Playing => &[Paused, Loading, Assessment, Cutscene, MainMenu, Settings, Error],
            Paused => &[Playing, MainMenu, Settings, Error],
            Assessment => &[Playing, Loading, MainMenu, Error],
            Cutscene => &[Playing, Loading, Error],
            Settings => &[MainMenu, Playing, Paused, Error],
            Error => &[MainMenu, Initializing],
        }
    }

    /// Check the adjacency table for `self -> next`.
    #[must_use]
    pub fn can_transition_to(self, next: GameState) -> bool {
        self.successors().contains(&next)
    }

    /// States in which a usage session may be started.
    #[must_use]
    pub fn allows_session_start(self) -> bool {
        matches!(self, GameState::MainMenu | GameState::Playing)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Logical identifier of a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(String);

impl SceneId {
    /// Create a scene id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SceneId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
