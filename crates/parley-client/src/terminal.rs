//! Line-oriented renderer and intent parser for the `parley` binary.

use std::io::Write;

use parley_shared::Credential;

use crate::boundary::Renderer;
use crate::events::SessionEvent;
use crate::runtime::Intent;
use crate::state::SessionSnapshot;

pub const HELP: &str = "\
Commands:
  <text>            send to the selected channel
  /join <name>      select a channel
  /create <name>    create a channel
  /delete <name>    delete a channel
  /channels         list channels and show the selected history
  /login <token>    log in with a bearer token
  /logout           disconnect and forget the token
  /quit             exit";

/// Outcome of parsing one input line.
#[derive(Debug)]
pub enum Parsed {
    Intent(Intent),
    Help,
    Invalid(String),
    Empty,
}

pub fn parse_line(line: &str) -> Parsed {
    let line = line.trim();
    if line.is_empty() {
        return Parsed::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Parsed::Intent(Intent::Send(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let needs_arg = |build: fn(String) -> Intent| {
        if arg.is_empty() {
            Parsed::Invalid(format!("/{name} needs an argument"))
        } else {
            Parsed::Intent(build(arg.to_string()))
        }
    };

    match name {
        "join" => needs_arg(Intent::Select),
        "create" => needs_arg(Intent::Create),
        "delete" => needs_arg(Intent::Delete),
        "channels" => Parsed::Intent(Intent::Refresh),
        "login" => match Credential::new(arg) {
            Some(credential) => Parsed::Intent(Intent::Login(credential)),
            None => Parsed::Invalid("/login needs a token".into()),
        },
        "logout" => Parsed::Intent(Intent::Logout),
        "quit" | "exit" => Parsed::Intent(Intent::Quit),
        "help" => Parsed::Help,
        other => Parsed::Invalid(format!("Unknown command /{other}")),
    }
}

/// Prints session events to a writer (stdout in the binary).
pub struct TerminalRenderer<W> {
    out: W,
    selected: String,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            selected: parley_shared::constants::DEFAULT_CHANNEL.to_string(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        // Nothing sensible to do if stdout is gone.
        let _ = writeln!(self.out, "{text}");
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn on_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::MessageAppended { channel, message } => {
                let time = message.received_at.format("%H:%M:%S");
                if *channel == self.selected {
                    self.line(format_args!("[{time}] {}: {}", message.sender, message.text));
                } else {
                    self.line(format_args!(
                        "[{time}] #{channel} {}: {}",
                        message.sender, message.text
                    ));
                }
            }
            SessionEvent::ChannelsChanged(channels) => {
                let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
                self.line(format_args!("* channels: {}", names.join(", ")));
            }
            SessionEvent::SelectionChanged { channel } => {
                self.selected = channel.clone();
                self.line(format_args!("* now in #{channel}"));
            }
            SessionEvent::ConnectionStateChanged { to, .. } => {
                self.line(format_args!("* {to}"));
            }
            SessionEvent::Notice(text) => self.line(format_args!("! {text}")),
            SessionEvent::AuthenticationRequired => {
                self.line(format_args!("! authentication required, use /login <token>"));
            }
        }
    }

    fn render(&mut self, snapshot: &SessionSnapshot) {
        self.selected = snapshot.selected.clone();
        self.line(format_args!(
            "* {} ({})",
            snapshot.connection,
            if snapshot.authenticated { "logged in" } else { "logged out" }
        ));
        for channel in &snapshot.channels {
            let marker = if channel.selected { '>' } else { ' ' };
            self.line(format_args!(
                "{marker} #{} ({} messages)",
                channel.name, channel.message_count
            ));
        }
        for message in &snapshot.history {
            self.line(format_args!("  {}: {}", message.sender, message.text));
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use parley_shared::{Message, Sender};

    use super::*;

    #[test]
    fn test_plain_text_is_a_send() {
        assert!(matches!(parse_line("hello there"), Parsed::Intent(Intent::Send(t)) if t == "hello there"));
        assert!(matches!(parse_line("   "), Parsed::Empty));
    }

    #[test]
    fn test_commands() {
        assert!(matches!(parse_line("/join Work"), Parsed::Intent(Intent::Select(n)) if n == "Work"));
        assert!(matches!(parse_line("/create  Ops "), Parsed::Intent(Intent::Create(n)) if n == "Ops"));
        assert!(matches!(parse_line("/delete Ops"), Parsed::Intent(Intent::Delete(n)) if n == "Ops"));
        assert!(matches!(parse_line("/channels"), Parsed::Intent(Intent::Refresh)));
        assert!(matches!(parse_line("/logout"), Parsed::Intent(Intent::Logout)));
        assert!(matches!(parse_line("/quit"), Parsed::Intent(Intent::Quit)));
        assert!(matches!(parse_line("/help"), Parsed::Help));
        assert!(
            matches!(parse_line("/login abc"), Parsed::Intent(Intent::Login(c)) if c.as_str() == "abc")
        );
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(parse_line("/join"), Parsed::Invalid(_)));
        assert!(matches!(parse_line("/login   "), Parsed::Invalid(_)));
        assert!(matches!(parse_line("/dance"), Parsed::Invalid(_)));
    }

    #[test]
    fn test_renderer_prefixes_other_channels() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let message = |text: &str| Message {
            text: text.into(),
            sender: Sender::Remote,
            seq: 0,
            received_at: Utc::now(),
        };
        renderer.on_event(&SessionEvent::MessageAppended {
            channel: "General".into(),
            message: message("here"),
        });
        renderer.on_event(&SessionEvent::MessageAppended {
            channel: "Work".into(),
            message: message("there"),
        });

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].ends_with("remote: here"));
        assert!(lines[1].ends_with("#Work remote: there"));
    }
}
