use serde::{Deserialize, Serialize};

pub type TaskId = String;

pub const HOURS_PER_DAY: u32 = 24;
pub const LAST_HOUR: u32 = HOURS_PER_DAY - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub start: u32,
    pub duration: u32,
    pub color: Swatch,
}

/// A task as written in config, before the store hands it an id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TaskSeed {
    pub name: String,
    pub start: u32,
    #[serde(default = "one_hour")]
    pub duration: u32,
    #[serde(default)]
    pub color: Swatch,
}

/// The add-task form contents while the modal is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub start: u32,
    pub duration: u32,
    pub color: Swatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftPatch {
    pub name: Option<String>,
    pub start: Option<i64>,
    pub duration: Option<i64>,
    pub color: Option<Swatch>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Swatch {
    Blue,
    Green,
    Yellow,
    Red,
    #[default]
    Purple,
    Pink,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task name must not be empty")]
    EmptyName,
    #[error("no task is being composed")]
    NoOpenDraft,
}

impl Task {
    /// First hour past the block. Not clamped to the day, only kept from
    /// wrapping past `u32::MAX`.
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.duration)
    }
}

impl TaskSeed {
    pub fn new(name: impl Into<String>, start: u32, duration: u32, color: Swatch) -> Self {
        TaskSeed {
            name: name.into(),
            start,
            duration,
            color,
        }
    }

    /// Initial day shown when no seeds are configured.
    pub fn defaults() -> Vec<TaskSeed> {
        vec![
            TaskSeed::new("Meeting", 9, 2, Swatch::Blue),
            TaskSeed::new("Coding", 13, 3, Swatch::Green),
            TaskSeed::new("Break", 16, 1, Swatch::Yellow),
        ]
    }
}

impl TaskDraft {
    pub fn at_hour(start: u32, color: Swatch) -> Self {
        TaskDraft {
            name: String::new(),
            start,
            duration: 1,
            color,
        }
    }

    pub fn apply(&mut self, patch: DraftPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(start) = patch.start {
            self.start = clamp_hour(start);
        }
        if let Some(duration) = patch.duration {
            self.duration = clamp_duration(duration);
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
    }
}

impl DraftPatch {
    pub fn name(name: impl Into<String>) -> Self {
        DraftPatch {
            name: Some(name.into()),
            ..DraftPatch::default()
        }
    }

    pub fn color(color: Swatch) -> Self {
        DraftPatch {
            color: Some(color),
            ..DraftPatch::default()
        }
    }
}

impl Swatch {
    pub const ALL: [Swatch; 6] = [
        Swatch::Blue,
        Swatch::Green,
        Swatch::Yellow,
        Swatch::Red,
        Swatch::Purple,
        Swatch::Pink,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Swatch::Blue => "blue",
            Swatch::Green => "green",
            Swatch::Yellow => "yellow",
            Swatch::Red => "red",
            Swatch::Purple => "purple",
            Swatch::Pink => "pink",
        }
    }

    fn index(&self) -> usize {
        Swatch::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Swatch {
        Swatch::ALL[(self.index() + 1) % Swatch::ALL.len()]
    }

    pub fn prev(&self) -> Swatch {
        Swatch::ALL[(self.index() + Swatch::ALL.len() - 1) % Swatch::ALL.len()]
    }
}

/// Constrains an arbitrary hour into `0..=23`.
pub fn clamp_hour(hour: i64) -> u32 {
    hour.clamp(0, LAST_HOUR as i64) as u32
}

pub fn clamp_duration(hours: i64) -> u32 {
    hours.clamp(1, u32::MAX as i64) as u32
}

fn one_hour() -> u32 {
    1
}
