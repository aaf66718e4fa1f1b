//! Core assistant components
//!
//! This module contains the interaction loop and the preference storage it
//! reads the personality from.

mod chat;
mod preferences;

pub use chat::ChatEngine;
pub use preferences::{JsonFileStore, PreferenceError, PreferenceStore, Preferences};
