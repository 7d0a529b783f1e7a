use crate::model::{Task, TaskId, HOURS_PER_DAY, LAST_HOUR};

/// Maps hours to terminal rows. One hour is `unit_height` rows tall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineLayout {
    unit_height: u16,
}

/// Where a task sits in timeline content rows, before scrolling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBlock {
    pub task_id: TaskId,
    pub top: u32,
    pub height: u32,
}

/// What the pointer is over while a task is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverTarget {
    Row(u32),
    TopEdge { task_id: TaskId, start: u32 },
    BottomEdge { task_id: TaskId, start: u32 },
}

impl TaskBlock {
    pub fn contains(&self, y: i32) -> bool {
        let y = y as i64;
        y >= self.top as i64 && y < self.bottom() as i64
    }

    /// First row below the block.
    pub fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }
}

impl HoverTarget {
    pub fn task_id(&self) -> Option<&str> {
        match self {
            HoverTarget::Row(_) => None,
            HoverTarget::TopEdge { task_id, .. } | HoverTarget::BottomEdge { task_id, .. } => {
                Some(task_id)
            }
        }
    }
}

impl TimelineLayout {
    pub fn new(unit_height: u16) -> Self {
        TimelineLayout {
            unit_height: unit_height.max(1),
        }
    }

    pub fn unit_height(&self) -> u16 {
        self.unit_height
    }

    pub fn content_height(&self) -> u32 {
        HOURS_PER_DAY * self.unit_height as u32
    }

    pub fn offset_for(&self, hour: u32) -> u32 {
        hour.saturating_mul(self.unit_height as u32)
    }

    /// Row clicked to hour, floored and clamped into the day.
    pub fn hour_from_vertical_position(&self, y: i32) -> u32 {
        let hour = (y as i64).div_euclid(self.unit_height as i64);
        hour.clamp(0, LAST_HOUR as i64) as u32
    }

    pub fn layout_tasks(&self, tasks: &[Task]) -> Vec<TaskBlock> {
        tasks
            .iter()
            .map(|task| TaskBlock {
                task_id: task.id.clone(),
                top: self.offset_for(task.start),
                height: task.duration.saturating_mul(self.unit_height as u32),
            })
            .collect()
    }

    /// The block drawn on top at content row `y`.
    pub fn block_at<'a>(&self, blocks: &'a [TaskBlock], y: i32) -> Option<&'a TaskBlock> {
        blocks.iter().rev().find(|b| b.contains(y))
    }

    /// Drop target under `y`, ignoring the block being dragged. The inside of
    /// another block is not a target.
    pub fn hover_target(
        &self,
        tasks: &[Task],
        blocks: &[TaskBlock],
        y: i32,
        dragged: &str,
    ) -> Option<HoverTarget> {
        let hit = blocks
            .iter()
            .rev()
            .filter(|b| b.task_id != dragged)
            .find(|b| b.contains(y));
        let block = match hit {
            Some(block) => block,
            None => return Some(HoverTarget::Row(self.hour_from_vertical_position(y))),
        };
        let task = tasks.iter().find(|t| t.id == block.task_id)?;
        let row = y as i64;
        if row == block.top as i64 {
            Some(HoverTarget::TopEdge {
                task_id: task.id.clone(),
                start: task.start,
            })
        } else if row == block.bottom() as i64 - 1 {
            Some(HoverTarget::BottomEdge {
                task_id: task.id.clone(),
                start: task.end(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Swatch, TaskSeed};
    use proptest::prelude::*;

    fn tasks() -> Vec<Task> {
        TaskSeed::defaults()
            .into_iter()
            .enumerate()
            .map(|(idx, seed)| Task {
                id: (idx + 1).to_string(),
                name: seed.name,
                start: seed.start,
                duration: seed.duration,
                color: seed.color,
            })
            .collect()
    }

    #[test]
    fn blocks_follow_start_and_duration() {
        let layout = TimelineLayout::new(2);
        let blocks = layout.layout_tasks(&tasks());
        let shape: Vec<_> = blocks.iter().map(|b| (b.top, b.height)).collect();
        assert_eq!(shape, [(18, 4), (26, 6), (32, 2)]);
        assert_eq!(layout.content_height(), 48);
    }

    #[test]
    fn zero_unit_height_is_raised() {
        assert_eq!(TimelineLayout::new(0).unit_height(), 1);
    }

    #[test]
    fn hour_floors_and_clamps() {
        let layout = TimelineLayout::new(3);
        assert_eq!(layout.hour_from_vertical_position(0), 0);
        assert_eq!(layout.hour_from_vertical_position(2), 0);
        assert_eq!(layout.hour_from_vertical_position(3), 1);
        assert_eq!(layout.hour_from_vertical_position(-1), 0);
        assert_eq!(layout.hour_from_vertical_position(500), 23);
    }

    #[test]
    fn later_blocks_win_overlaps() {
        let layout = TimelineLayout::new(1);
        let mut list = tasks();
        list[2].start = 14;
        let blocks = layout.layout_tasks(&list);
        assert_eq!(layout.block_at(&blocks, 14).unwrap().task_id, "3");
        assert_eq!(layout.block_at(&blocks, 13).unwrap().task_id, "2");
        assert!(layout.block_at(&blocks, 2).is_none());
    }

    #[test]
    fn hover_resolves_edges_rows_and_interiors() {
        let layout = TimelineLayout::new(2);
        let list = tasks();
        let blocks = layout.layout_tasks(&list);
        assert_eq!(
            layout.hover_target(&list, &blocks, 26, "1"),
            Some(HoverTarget::TopEdge {
                task_id: "2".into(),
                start: 13
            })
        );
        assert_eq!(
            layout.hover_target(&list, &blocks, 31, "1"),
            Some(HoverTarget::BottomEdge {
                task_id: "2".into(),
                start: 16
            })
        );
        assert_eq!(layout.hover_target(&list, &blocks, 28, "1"), None);
        assert_eq!(
            layout.hover_target(&list, &blocks, 41, "1"),
            Some(HoverTarget::Row(20))
        );
        // the dragged block itself is transparent
        assert_eq!(
            layout.hover_target(&list, &blocks, 19, "1"),
            Some(HoverTarget::Row(9))
        );
    }

    #[test]
    fn single_row_block_is_top_edge() {
        let layout = TimelineLayout::new(1);
        let list = tasks();
        let blocks = layout.layout_tasks(&list);
        let target = layout.hover_target(&list, &blocks, 16, "1").unwrap();
        assert_eq!(target.task_id(), Some("3"));
        assert!(matches!(target, HoverTarget::TopEdge { start: 16, .. }));
    }

    #[test]
    fn block_shape_ignores_color() {
        let layout = TimelineLayout::new(1);
        let mut list = tasks();
        list[0].color = Swatch::Pink;
        assert_eq!(layout.layout_tasks(&list)[0].top, 9);
    }

    proptest! {
        #[test]
        fn offset_round_trips(hour in 0u32..24, unit in 1u16..8) {
            let layout = TimelineLayout::new(unit);
            let y = layout.offset_for(hour) as i32;
            prop_assert_eq!(layout.hour_from_vertical_position(y), hour);
        }

        #[test]
        fn any_row_maps_into_day(y in any::<i32>(), unit in 1u16..8) {
            let hour = TimelineLayout::new(unit).hour_from_vertical_position(y);
            prop_assert!(hour <= 23);
        }
    }
}
