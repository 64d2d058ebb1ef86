//! Session events and the motivation sink.
//!
//! The session returns events from every transition; the owner forwards them
//! to an `EventSink` once the transition is done. Sinks never feed back into
//! the state machine.

use crate::config::MotivationConfig;
use serde::{Deserialize, Serialize};

/// Transition reported by the session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    EnteredWork {
        step_index: usize,
        title: String,
    },
    EnteredRest {
        step_index: usize,
        /// Seconds of rest ahead
        duration: u32,
    },
    ConfirmedSet {
        step_index: usize,
        set_number: u32,
        total_sets: u32,
        skipped: bool,
    },
    WorkoutCompleted {
        elapsed_seconds: u32,
    },
}

/// Category names exposed to audio/text mappings
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Work,
    Rest,
    Set,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Work => "work",
            EventCategory::Rest => "rest",
            EventCategory::Set => "set",
        }
    }

    fn index(&self) -> usize {
        match self {
            EventCategory::Work => 0,
            EventCategory::Rest => 1,
            EventCategory::Set => 2,
        }
    }
}

impl SessionEvent {
    /// Category of the event; completion has none
    pub fn category(&self) -> Option<EventCategory> {
        match self {
            SessionEvent::EnteredWork { .. } => Some(EventCategory::Work),
            SessionEvent::EnteredRest { .. } => Some(EventCategory::Rest),
            SessionEvent::ConfirmedSet { .. } => Some(EventCategory::Set),
            SessionEvent::WorkoutCompleted { .. } => None,
        }
    }
}

/// Observer of session events
pub trait EventSink {
    fn on_event(&mut self, event: &SessionEvent);
}

/// Collects events, mostly for tests and replay
impl EventSink for Vec<SessionEvent> {
    fn on_event(&mut self, event: &SessionEvent) {
        self.push(event.clone());
    }
}

/// Logs every event through tracing
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_event(&mut self, event: &SessionEvent) {
        tracing::info!("Session event: {:?}", event);
    }
}

/// Message set used by the motivator
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MotivationTheme {
    #[default]
    Default,
    Coach,
    Calm,
}

impl MotivationTheme {
    fn messages(&self, category: EventCategory) -> &'static [&'static str] {
        match (self, category) {
            (MotivationTheme::Default, EventCategory::Work) => &["Let's go!", "Time to work.", "Here we go."],
            (MotivationTheme::Default, EventCategory::Rest) => &["Rest up.", "Breathe.", "Take a moment."],
            (MotivationTheme::Default, EventCategory::Set) => &["Set done!", "Nice set.", "Logged."],
            (MotivationTheme::Coach, EventCategory::Work) => {
                &["Move! Move! Move!", "No excuses, get after it!", "Push the pace!"]
            }
            (MotivationTheme::Coach, EventCategory::Rest) => {
                &["Shake it out, you've earned ten seconds.", "Recover fast.", "Don't get comfortable."]
            }
            (MotivationTheme::Coach, EventCategory::Set) => {
                &["That's how it's done!", "One more in the bank!", "Strong!"]
            }
            (MotivationTheme::Calm, EventCategory::Work) => {
                &["Begin when ready.", "Find your rhythm.", "Steady effort."]
            }
            (MotivationTheme::Calm, EventCategory::Rest) => {
                &["Slow your breath.", "Let the heart rate settle.", "Relax your shoulders."]
            }
            (MotivationTheme::Calm, EventCategory::Set) => {
                &["Well done.", "Good work.", "One step further."]
            }
        }
    }

    fn completion_message(&self) -> &'static str {
        match self {
            MotivationTheme::Default => "Workout complete!",
            MotivationTheme::Coach => "Done! That's a wrap, champion!",
            MotivationTheme::Calm => "Practice complete. Well done.",
        }
    }
}

/// Human-facing notification for one event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub message: String,
    /// Category name of the audio cue to play, when audio is on
    pub cue: Option<String>,
    pub volume: f32,
}

/// Maps events to notifications, rotating through the theme's messages
#[derive(Clone, Debug)]
pub struct Motivator {
    theme: MotivationTheme,
    audio_enabled: bool,
    volume: f32,
    rotation: [usize; 3],
}

impl Motivator {
    pub fn new(theme: MotivationTheme, audio_enabled: bool, volume: f32) -> Self {
        Self {
            theme,
            audio_enabled,
            volume: volume.clamp(0.0, 1.0),
            rotation: [0; 3],
        }
    }

    pub fn from_config(config: &MotivationConfig) -> Self {
        Self::new(config.theme, config.audio_enabled, config.volume)
    }

    pub fn notification_for(&mut self, event: &SessionEvent) -> Notification {
        let Some(category) = event.category() else {
            return Notification {
                message: self.theme.completion_message().to_string(),
                cue: None,
                volume: self.volume,
            };
        };

        let messages = self.theme.messages(category);
        let slot = &mut self.rotation[category.index()];
        let message = messages[*slot % messages.len()];
        *slot += 1;

        Notification {
            message: message.to_string(),
            cue: self.audio_enabled.then(|| category.as_str().to_string()),
            volume: self.volume,
        }
    }
}

/// Sink that turns events into notifications and hands them to `deliver`
pub struct MotivationSink<F>
where
    F: FnMut(&Notification),
{
    motivator: Motivator,
    deliver: F,
}

impl<F> MotivationSink<F>
where
    F: FnMut(&Notification),
{
    pub fn new(motivator: Motivator, deliver: F) -> Self {
        Self { motivator, deliver }
    }
}

impl<F> EventSink for MotivationSink<F>
where
    F: FnMut(&Notification),
{
    fn on_event(&mut self, event: &SessionEvent) {
        let notification = self.motivator.notification_for(event);
        tracing::debug!("Notification: {}", notification.message);
        (self.deliver)(&notification);
    }
}
