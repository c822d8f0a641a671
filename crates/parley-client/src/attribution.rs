//! Which channel an inbound message belongs to.
//!
//! The backend protocol does not always label inbound text, so the
//! decision is a policy the session is configured with.

use parley_store::ChannelStore;

pub trait ChannelAttribution: Send {
    /// Target channel for an inbound message carrying `label` (if any).
    fn resolve(&self, label: Option<&str>, channels: &ChannelStore) -> String;
}

/// Everything goes to the channel the user is looking at.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectedChannelAttribution;

impl ChannelAttribution for SelectedChannelAttribution {
    fn resolve(&self, _label: Option<&str>, channels: &ChannelStore) -> String {
        channels.selected().to_string()
    }
}

/// Honour the backend's channel label when present, otherwise fall back to
/// the selected channel. A label naming an unknown channel is returned as
/// is, so the append fails visibly instead of landing in the wrong place.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedChannelAttribution;

impl ChannelAttribution for TaggedChannelAttribution {
    fn resolve(&self, label: Option<&str>, channels: &ChannelStore) -> String {
        match label {
            Some(label) => label.to_string(),
            None => channels.selected().to_string(),
        }
    }
}
