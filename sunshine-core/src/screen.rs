//! Screen state machines driven by fetch completion, explicit refresh and
//! store change events.

pub mod detail;
pub mod list;

pub use detail::{DetailScreen, DetailView};
pub use list::{ForecastListScreen, ListItem};

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState<T> {
    Uninitialized,
    Loading,
    Loaded(T),
    Error(String),
}

impl<T> Default for ScreenState<T> {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl<T> ScreenState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}
