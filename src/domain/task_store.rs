use crate::domain::models::Task;
use chrono::NaiveDateTime;

/// Ordered task collection; insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
    last_id: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task unless `text` is blank.
    ///
    /// Ids are seeded from `clock_millis` and forced strictly above the last
    /// issued id, so two adds in the same millisecond still get distinct ids.
    pub fn add(
        &mut self,
        text: &str,
        reminder_date_time: Option<NaiveDateTime>,
        clock_millis: u64,
    ) -> Option<Task> {
        if text.trim().is_empty() {
            return None;
        }

        let id = clock_millis.max(self.last_id.saturating_add(1));
        self.last_id = id;

        let task = Task {
            id,
            text: text.to_string(),
            completed: false,
            reminder_date_time,
        };
        debug_assert!(task.validate().is_ok());
        self.tasks.push(task.clone());
        Some(task)
    }

    pub fn toggle(&mut self, id: u64) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|task| task.id == id)?;
        task.completed = !task.completed;
        Some(task.clone())
    }

    pub fn delete(&mut self, id: u64) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(index))
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.tasks.iter().filter(|task| !task.completed).count()
    }
}
