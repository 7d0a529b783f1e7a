use crate::model::{
    clamp_duration, clamp_hour, DraftPatch, Swatch, Task, TaskDraft, TaskId, TaskSeed,
    ValidationError,
};
use chrono::{Duration as ChronoDuration, NaiveDate};
use log::{debug, info, warn};
use rand::{distributions::Alphanumeric, Rng};

/// Hands out task ids. The store owns one and asks it for every new task.
pub trait IdSource {
    fn next_id(&mut self) -> TaskId;
}

#[derive(Debug, Default)]
pub struct SequentialIds {
    last: u64,
}

#[derive(Debug, Default)]
pub struct RandomIds;

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> TaskId {
        self.last += 1;
        self.last.to_string()
    }
}

impl IdSource for RandomIds {
    fn next_id(&mut self) -> TaskId {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect()
    }
}

pub struct TimelineStore {
    date: NaiveDate,
    tasks: Vec<Task>,
    draft: Option<TaskDraft>,
    default_color: Swatch,
    ids: Box<dyn IdSource>,
}

impl TimelineStore {
    pub fn new(
        date: NaiveDate,
        seeds: Vec<TaskSeed>,
        default_color: Swatch,
        ids: Box<dyn IdSource>,
    ) -> Self {
        let mut store = TimelineStore {
            date,
            tasks: Vec::with_capacity(seeds.len()),
            draft: None,
            default_color,
            ids,
        };
        for seed in seeds {
            let id = store.fresh_id();
            store.tasks.push(Task {
                id,
                name: seed.name,
                start: clamp_hour(seed.start as i64),
                duration: clamp_duration(seed.duration as i64),
                color: seed.color,
            });
        }
        store
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn draft(&self) -> Option<&TaskDraft> {
        self.draft.as_ref()
    }

    pub fn is_drafting(&self) -> bool {
        self.draft.is_some()
    }

    pub fn change_date(&mut self, delta_days: i64) {
        if let Some(new_date) = ChronoDuration::try_days(delta_days)
            .and_then(|delta| self.date.checked_add_signed(delta))
        {
            debug!("change_date delta={} date={}", delta_days, new_date);
            self.date = new_date;
        }
    }

    /// Opens a draft at `at_hour`. Returns `false` and leaves the open draft
    /// untouched when one already exists.
    pub fn begin_draft(&mut self, at_hour: i64) -> bool {
        if self.draft.is_some() {
            debug!("begin_draft ignored hour={}: draft already open", at_hour);
            return false;
        }
        let start = clamp_hour(at_hour);
        self.draft = Some(TaskDraft::at_hour(start, self.default_color));
        debug!("begin_draft start={}", start);
        true
    }

    pub fn update_draft(&mut self, patch: DraftPatch) {
        if let Some(draft) = self.draft.as_mut() {
            draft.apply(patch);
        }
    }

    pub fn commit_draft(&mut self) -> Result<Task, ValidationError> {
        let draft = self.draft.as_ref().ok_or(ValidationError::NoOpenDraft)?;
        if draft.name.trim().is_empty() {
            warn!("commit_draft rejected: empty name");
            return Err(ValidationError::EmptyName);
        }
        let name = draft.name.clone();
        let (start, duration, color) = (draft.start, draft.duration, draft.color);
        let task = Task {
            id: self.fresh_id(),
            name,
            start,
            duration,
            color,
        };
        self.tasks.push(task.clone());
        self.draft = None;
        info!(
            "task added id={} start={} duration={} color={}",
            task.id,
            task.start,
            task.duration,
            task.color.label()
        );
        Ok(task)
    }

    pub fn cancel_draft(&mut self) {
        if self.draft.take().is_some() {
            debug!("draft canceled");
        }
    }

    /// Moves a task to `new_start`, clamped into the day. Unknown ids are ignored.
    pub fn reposition_task(&mut self, id: &str, new_start: i64) {
        let start = clamp_hour(new_start);
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            if task.start != start {
                debug!("reposition id={} {} -> {}", id, task.start, start);
            }
            task.start = start;
        }
    }

    fn fresh_id(&mut self) -> TaskId {
        loop {
            let id = self.ids.next_id();
            if self.task(&id).is_none() {
                return id;
            }
            debug!("id {} already taken, drawing again", id);
        }
    }
}
