//! Channel registry and per-channel message history.

use chrono::Utc;
use tracing::{debug, info};

use parley_shared::constants::DEFAULT_CHANNEL;
use parley_shared::{ChatError, Message, Sender};

use crate::error::Result;
use crate::models::{Channel, ChannelSummary};

/// Mapping from channel name to history, plus the current selection.
///
/// Always contains the non-deletable default channel, and the selected name
/// is always a key present in the store.
#[derive(Debug)]
pub struct ChannelStore {
    /// Creation order is preserved for listing.
    channels: Vec<Channel>,
    selected: String,
    default_name: String,
}

impl ChannelStore {
    /// Store seeded with the default `"General"` channel, selected.
    pub fn new() -> Self {
        Self::with_default(DEFAULT_CHANNEL)
    }

    /// Store whose protected channel has a custom name.
    pub fn with_default(default_name: &str) -> Self {
        let mut store = Self {
            channels: Vec::new(),
            selected: default_name.to_string(),
            default_name: default_name.to_string(),
        };
        store.ensure_default();
        store
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Guarantee the default channel exists. Safe to call repeatedly.
    pub fn ensure_default(&mut self) {
        if self.position(&self.default_name).is_none() {
            debug!(channel = %self.default_name, "Seeding default channel");
            self.channels
                .insert(0, Channel::new(self.default_name.clone(), false));
        }
    }

    /// Create an empty, deletable channel.
    pub fn create(&mut self, name: &str) -> Result<&Channel> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::InvalidChannelName(name.to_string()));
        }
        if self.position(name).is_some() {
            return Err(ChatError::DuplicateChannel(name.to_string()));
        }

        self.channels.push(Channel::new(name.to_string(), true));
        info!(channel = %name, "Channel created");

        let last = self.channels.len() - 1;
        Ok(&self.channels[last])
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Make `name` the selected channel. History is left untouched.
    pub fn select(&mut self, name: &str) -> Result<&Channel> {
        let name = name.trim();
        let idx = self
            .position(name)
            .ok_or_else(|| ChatError::UnknownChannel(name.to_string()))?;
        if self.selected != name {
            debug!(from = %self.selected, to = %name, "Channel selected");
            self.selected = name.to_string();
        }
        Ok(&self.channels[idx])
    }

    /// Append a message to the end of a channel's history.
    pub fn append(&mut self, name: &str, text: &str, sender: Sender) -> Result<&Message> {
        let name = name.trim();
        let idx = self
            .position(name)
            .ok_or_else(|| ChatError::UnknownChannel(name.to_string()))?;

        let channel = &mut self.channels[idx];
        let message = Message {
            text: text.to_string(),
            sender,
            seq: channel.messages.len() as u64,
            received_at: Utc::now(),
        };
        channel.messages.push(message);

        let last = channel.messages.len() - 1;
        Ok(&channel.messages[last])
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.position(name).map(|idx| &self.channels[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Name of the selected channel.
    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn selected_channel(&self) -> Option<&Channel> {
        self.get(&self.selected)
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Channel names in creation order, default first.
    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn summaries(&self) -> Vec<ChannelSummary> {
        self.channels
            .iter()
            .map(|c| ChannelSummary {
                name: c.name.clone(),
                deletable: c.deletable,
                selected: c.name == self.selected,
                message_count: c.messages.len(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Remove a channel and its history.
    ///
    /// Returns `true` when the deleted channel was selected and the
    /// selection fell back to the default channel.
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name == self.default_name {
            return Err(ChatError::ProtectedChannel(name.to_string()));
        }
        let idx = self
            .position(name)
            .ok_or_else(|| ChatError::UnknownChannel(name.to_string()))?;

        let removed = self.channels.remove(idx);
        info!(
            channel = %removed.name,
            dropped_messages = removed.messages.len(),
            "Channel deleted"
        );

        if self.selected == name {
            self.selected = self.default_name.clone();
            return Ok(true);
        }
        Ok(false)
    }

    /// Names are matched after trimming surrounding whitespace.
    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.channels.iter().position(|c| c.name == name)
    }
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_has_default_selected() {
        let store = ChannelStore::new();
        assert_eq!(store.names(), vec!["General"]);
        assert_eq!(store.selected(), "General");
        assert!(!store.get("General").unwrap().deletable);
    }

    #[test]
    fn test_ensure_default_is_idempotent() {
        let mut store = ChannelStore::new();
        store.append("General", "kept", Sender::Local).unwrap();
        store.ensure_default();
        store.ensure_default();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("General").unwrap().len(), 1);
    }

    #[test]
    fn test_create_duplicate_is_case_sensitive() {
        let mut store = ChannelStore::new();
        let work = store.create("Work").unwrap();
        assert!(work.deletable);
        assert!(work.is_empty());

        assert_eq!(
            store.create("Work").unwrap_err(),
            ChatError::DuplicateChannel("Work".into())
        );
        assert!(store.create("work").is_ok());
        assert_eq!(
            store.create("General").unwrap_err(),
            ChatError::DuplicateChannel("General".into())
        );
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let mut store = ChannelStore::new();
        assert!(matches!(
            store.create("   "),
            Err(ChatError::InvalidChannelName(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_default_is_protected() {
        let mut store = ChannelStore::new();
        assert_eq!(
            store.delete("General").unwrap_err(),
            ChatError::ProtectedChannel("General".into())
        );
        assert!(store.contains("General"));
    }

    #[test]
    fn test_delete_unknown() {
        let mut store = ChannelStore::new();
        assert_eq!(
            store.delete("Nope").unwrap_err(),
            ChatError::UnknownChannel("Nope".into())
        );
    }

    #[test]
    fn test_delete_selected_falls_back_to_default() {
        let mut store = ChannelStore::new();
        store.create("Work").unwrap();
        store.select("Work").unwrap();
        store.append("Work", "status?", Sender::Local).unwrap();

        assert!(store.delete("Work").unwrap());
        assert_eq!(store.selected(), "General");
        assert!(store.get("Work").is_none());

        // Re-creating starts from an empty history.
        assert!(store.create("Work").unwrap().is_empty());
    }

    #[test]
    fn test_delete_unselected_keeps_selection() {
        let mut store = ChannelStore::new();
        store.create("Work").unwrap();
        store.create("Random").unwrap();
        store.select("Random").unwrap();

        assert!(!store.delete("Work").unwrap());
        assert_eq!(store.selected(), "Random");
    }

    #[test]
    fn test_names_are_trimmed_everywhere() {
        let mut store = ChannelStore::new();
        store.create("Work ").unwrap();
        assert_eq!(
            store.create(" Work").unwrap_err(),
            ChatError::DuplicateChannel("Work".into())
        );

        assert_eq!(store.select(" Work ").unwrap().name, "Work");
        assert_eq!(store.selected(), "Work");
        assert_eq!(store.append("Work\t", "hi", Sender::Local).unwrap().seq, 0);
        assert!(store.contains(" Work"));

        assert_eq!(
            store.delete(" General ").unwrap_err(),
            ChatError::ProtectedChannel("General".into())
        );
        assert!(store.delete(" Work").unwrap());
        assert_eq!(store.selected(), "General");
        assert!(!store.contains("Work"));
    }

    #[test]
    fn test_select_unknown_keeps_selection() {
        let mut store = ChannelStore::new();
        assert_eq!(
            store.select("Ghost").unwrap_err(),
            ChatError::UnknownChannel("Ghost".into())
        );
        assert_eq!(store.selected(), "General");
    }

    #[test]
    fn test_history_survives_channel_switch() {
        let mut store = ChannelStore::new();
        store.create("Work").unwrap();
        store.append("General", "one", Sender::Remote).unwrap();
        store.select("Work").unwrap();
        store.select("General").unwrap();
        assert_eq!(store.get("General").unwrap().messages()[0].text, "one");
    }

    #[test]
    fn test_append_assigns_sequence_per_channel() {
        let mut store = ChannelStore::new();
        store.create("Work").unwrap();

        assert_eq!(store.append("General", "a", Sender::Local).unwrap().seq, 0);
        assert_eq!(store.append("General", "b", Sender::Remote).unwrap().seq, 1);
        assert_eq!(store.append("Work", "c", Sender::Remote).unwrap().seq, 0);
        // Inbound empty text is still stored.
        assert_eq!(store.append("Work", "", Sender::Remote).unwrap().seq, 1);

        let texts: Vec<_> = store
            .get("General")
            .unwrap()
            .messages()
            .iter()
            .map(|m| (m.text.as_str(), m.sender))
            .collect();
        assert_eq!(texts, vec![("a", Sender::Local), ("b", Sender::Remote)]);
    }

    #[test]
    fn test_append_unknown_channel() {
        let mut store = ChannelStore::new();
        assert_eq!(
            store.append("Gone", "late", Sender::Remote).unwrap_err(),
            ChatError::UnknownChannel("Gone".into())
        );
    }

    #[test]
    fn test_summaries_flag_selection() {
        let mut store = ChannelStore::new();
        store.create("Work").unwrap();
        store.select("Work").unwrap();
        store.append("Work", "x", Sender::Local).unwrap();

        let summaries = store.summaries();
        assert_eq!(summaries.len(), 2);
        assert!(!summaries[0].selected);
        assert!(!summaries[0].deletable);
        assert!(summaries[1].selected);
        assert_eq!(summaries[1].message_count, 1);
    }

    #[test]
    fn test_default_survives_random_create_delete_sequences() {
        let names = ["General", "Work", "Random", "work", "Ops"];
        let mut seed: u64 = 0x5eed;

        for _ in 0..200 {
            let mut store = ChannelStore::new();
            for _ in 0..50 {
                // xorshift keeps the sequence reproducible.
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                let name = names[(seed % names.len() as u64) as usize];
                match seed % 3 {
                    0 => {
                        let _ = store.create(name);
                    }
                    1 => {
                        let _ = store.delete(name);
                    }
                    _ => {
                        let _ = store.select(name);
                    }
                }

                assert!(store.contains("General"));
                assert!(!store.get("General").unwrap().deletable);
                assert!(store.contains(store.selected()));
            }
        }
    }
}
