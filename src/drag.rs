use crate::layout::{HoverTarget, TimelineLayout};
use crate::model::TaskId;
use crate::store::TimelineStore;
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        task_id: TaskId,
        /// Hours between the grabbed row and the task start.
        grab_offset: i64,
        hover: Option<HoverTarget>,
    },
}

impl DragState {
    /// Picks up the topmost task under content row `y`.
    pub fn begin(&mut self, store: &TimelineStore, layout: &TimelineLayout, y: i32) -> bool {
        let blocks = layout.layout_tasks(store.tasks());
        let task = match layout
            .block_at(&blocks, y)
            .and_then(|block| store.task(&block.task_id))
        {
            Some(task) => task,
            None => return false,
        };
        let grab_offset = layout.hour_from_vertical_position(y) as i64 - task.start as i64;
        debug!("drag start id={} grab_offset={}", task.id, grab_offset);
        *self = DragState::Dragging {
            task_id: task.id.clone(),
            grab_offset,
            hover: None,
        };
        true
    }

    /// Moves the dragged task to whatever is under `y` right away. Returns the
    /// requested start, before the store clamps it.
    pub fn hover(
        &mut self,
        store: &mut TimelineStore,
        layout: &TimelineLayout,
        y: i32,
    ) -> Option<i64> {
        let (task_id, grab_offset, hover) = match self {
            DragState::Dragging {
                task_id,
                grab_offset,
                hover,
            } => (task_id, *grab_offset, hover),
            DragState::Idle => return None,
        };
        let blocks = layout.layout_tasks(store.tasks());
        let target = layout.hover_target(store.tasks(), &blocks, y, task_id);
        let start = match &target {
            Some(HoverTarget::Row(hour)) => *hour as i64 - grab_offset,
            Some(HoverTarget::TopEdge { start, .. })
            | Some(HoverTarget::BottomEdge { start, .. }) => *start as i64,
            None => {
                *hover = None;
                return None;
            }
        };
        store.reposition_task(task_id, start);
        *hover = target;
        Some(start)
    }

    pub fn end(&mut self) {
        if let DragState::Dragging { task_id, .. } = self {
            debug!("drag end id={}", task_id);
        }
        *self = DragState::Idle;
    }

    pub fn dragged_id(&self) -> Option<&str> {
        match self {
            DragState::Dragging { task_id, .. } => Some(task_id),
            DragState::Idle => None,
        }
    }

    pub fn hover_target(&self) -> Option<&HoverTarget> {
        match self {
            DragState::Dragging { hover, .. } => hover.as_ref(),
            DragState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Swatch, TaskSeed};
    use crate::store::SequentialIds;
    use chrono::NaiveDate;

    fn store() -> TimelineStore {
        TimelineStore::new(
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            TaskSeed::defaults(),
            Swatch::Purple,
            Box::new(SequentialIds::default()),
        )
    }

    fn start_of(store: &TimelineStore, id: &str) -> u32 {
        store.task(id).unwrap().start
    }

    #[test]
    fn meeting_dropped_on_coding_top_edge_starts_at_thirteen() {
        let mut store = store();
        let layout = TimelineLayout::new(2);
        let mut drag = DragState::default();
        // Meeting occupies rows 18..22; grab its last row.
        assert!(drag.begin(&store, &layout, 21));
        assert_eq!(drag.dragged_id(), Some("1"));
        assert_eq!(drag.hover(&mut store, &layout, 26), Some(13));
        assert_eq!(start_of(&store, "1"), 13);
        assert_eq!(store.task("1").unwrap().duration, 2);
        assert!(matches!(
            drag.hover_target(),
            Some(HoverTarget::TopEdge { start: 13, .. })
        ));
        drag.end();
        assert_eq!(drag, DragState::Idle);
        assert_eq!(start_of(&store, "1"), 13);
    }

    #[test]
    fn bottom_edge_moves_to_end_of_other_task() {
        let mut store = store();
        let layout = TimelineLayout::new(2);
        let mut drag = DragState::default();
        assert!(drag.begin(&store, &layout, 33));
        assert_eq!(drag.hover(&mut store, &layout, 31), Some(16));
        assert_eq!(start_of(&store, "3"), 16);
        drag.hover(&mut store, &layout, 21);
        assert_eq!(start_of(&store, "3"), 11);
    }

    #[test]
    fn rows_keep_grip_offset() {
        let mut store = store();
        let layout = TimelineLayout::new(1);
        let mut drag = DragState::default();
        // grab Meeting by its second hour
        assert!(drag.begin(&store, &layout, 10));
        drag.hover(&mut store, &layout, 4);
        assert_eq!(start_of(&store, "1"), 3);
        assert_eq!(drag.hover_target(), Some(&HoverTarget::Row(4)));
    }

    #[test]
    fn hover_updates_live_and_clamps() {
        let mut store = store();
        let layout = TimelineLayout::new(1);
        let mut drag = DragState::default();
        drag.begin(&store, &layout, 9);
        for y in [8, 6, 3, 0] {
            drag.hover(&mut store, &layout, y);
            assert_eq!(start_of(&store, "1"), y as u32);
        }
        assert_eq!(drag.hover(&mut store, &layout, -7), Some(0));
        assert_eq!(start_of(&store, "1"), 0);
    }

    #[test]
    fn interior_of_other_task_leaves_position() {
        let mut store = store();
        let layout = TimelineLayout::new(3);
        let mut drag = DragState::default();
        drag.begin(&store, &layout, 27);
        assert_eq!(drag.hover(&mut store, &layout, 43), None);
        assert_eq!(start_of(&store, "1"), 9);
        assert!(drag.hover_target().is_none());
    }

    #[test]
    fn press_on_empty_row_does_not_drag() {
        let mut store = store();
        let layout = TimelineLayout::new(2);
        let mut drag = DragState::default();
        assert!(!drag.begin(&store, &layout, 2));
        assert_eq!(drag.hover(&mut store, &layout, 10), None);
        assert_eq!(start_of(&store, "1"), 9);
    }
}
