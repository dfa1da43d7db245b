use crate::domain::models::CalendarEvent;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

/// Holds the result of the most recent event fetch. Every fetch replaces the
/// whole snapshot; writes only patch it until the next fetch.
pub trait CalendarCacheRepository: Send + Sync {
    fn replace_all(&self, events: &[CalendarEvent]) -> Result<(), InfraError>;
    fn upsert(&self, event: &CalendarEvent) -> Result<(), InfraError>;
    fn remove(&self, event_id: &str) -> Result<(), InfraError>;
    fn list_all(&self) -> Result<Vec<CalendarEvent>, InfraError>;
    fn clear(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCalendarCacheRepository {
    events: Mutex<Vec<CalendarEvent>>,
}

impl InMemoryCalendarCacheRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<CalendarEvent>>, InfraError> {
        self.events
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("calendar cache lock poisoned: {error}")))
    }
}

impl CalendarCacheRepository for InMemoryCalendarCacheRepository {
    fn replace_all(&self, events: &[CalendarEvent]) -> Result<(), InfraError> {
        let mut cached = self.lock()?;
        *cached = events.to_vec();
        Ok(())
    }

    fn upsert(&self, event: &CalendarEvent) -> Result<(), InfraError> {
        let event_id = event.id.trim();
        if event_id.is_empty() {
            return Err(InfraError::InvalidConfig(
                "event id is required for cache upsert".to_string(),
            ));
        }

        let mut cached = self.lock()?;
        match cached.iter_mut().find(|existing| existing.id == event_id) {
            Some(existing) => *existing = event.clone(),
            None => cached.push(event.clone()),
        }
        Ok(())
    }

    fn remove(&self, event_id: &str) -> Result<(), InfraError> {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            return Ok(());
        }
        self.lock()?.retain(|existing| existing.id != event_id);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<CalendarEvent>, InfraError> {
        Ok(self.lock()?.clone())
    }

    fn clear(&self) -> Result<(), InfraError> {
        self.lock()?.clear();
        Ok(())
    }
}
