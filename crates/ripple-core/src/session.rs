//! Session context
//!
//! The current user's identity and presentation preferences, supplied by the
//! embedding application at construction time. The engine and merger consume
//! this read-only; nothing in the core reads process-wide mutable state.

use crate::identifiers::UserId;
use serde::{Deserialize, Serialize};

/// UI theme preference carried alongside the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    /// Light color scheme
    #[default]
    Light,
    /// Dark color scheme
    Dark,
}

/// Identity and ambient preferences for the active session
///
/// Used to author provisional entities (the speculated comment carries the
/// current user's display fields) and to derive authorship-dependent view
/// state. Never mutated by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// The current user's id
    pub user_id: UserId,
    /// Display name shown on authored entities
    pub display_name: String,
    /// Handle shown on authored entities
    pub username: String,
    /// Avatar URL, if the user has one
    pub avatar: Option<String>,
    /// Theme preference
    pub theme: Theme,
}

impl SessionContext {
    /// Create a session context for the given user
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            username: username.into(),
            avatar: None,
            theme: Theme::default(),
        }
    }

    /// Set the avatar URL
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Set the theme preference
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Whether the given user is the session user
    pub fn is_self(&self, user: &UserId) -> bool {
        self.user_id == *user
    }
}
