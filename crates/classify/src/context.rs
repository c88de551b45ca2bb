use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub title: String,
    pub date: NaiveDate,
    pub attendees: Vec<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactHit {
    pub name: String,
    pub organization: Option<String>,
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Context provider unavailable: {0}")]
    Unavailable(String),
}

/// Calendar lookups near a transaction date. Providers that cannot answer
/// return an error so the classifier can record a degraded run.
pub trait CalendarSource: Send + Sync {
    fn events_near(&self, date: NaiveDate, window_days: i64)
        -> Result<Vec<CalendarEvent>, ContextError>;
}

/// Contact interactions on a transaction date.
pub trait ContactSource: Send + Sync {
    fn contacts_near(&self, date: NaiveDate) -> Result<Vec<ContactHit>, ContextError>;
}

/// Fixed event list filtered by window, for tests and offline runs.
#[derive(Debug, Default)]
pub struct MockCalendar {
    events: Vec<CalendarEvent>,
}

impl MockCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events }
    }
}

impl CalendarSource for MockCalendar {
    fn events_near(
        &self,
        date: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<CalendarEvent>, ContextError> {
        Ok(self
            .events
            .iter()
            .filter(|e| (e.date - date).num_days().abs() <= window_days)
            .cloned()
            .collect())
    }
}

/// Fixed (date, contact) pairs, for tests and offline runs.
#[derive(Debug, Default)]
pub struct MockContacts {
    hits: Vec<(NaiveDate, ContactHit)>,
}

impl MockContacts {
    pub fn new(hits: Vec<(NaiveDate, ContactHit)>) -> Self {
        Self { hits }
    }
}

impl ContactSource for MockContacts {
    fn contacts_near(&self, date: NaiveDate) -> Result<Vec<ContactHit>, ContextError> {
        Ok(self
            .hits
            .iter()
            .filter(|(d, _)| *d == date)
            .map(|(_, hit)| hit.clone())
            .collect())
    }
}

/// Providers that always fail, for exercising degraded-mode paths.
#[derive(Debug, Default)]
pub struct UnavailableCalendar;

impl CalendarSource for UnavailableCalendar {
    fn events_near(
        &self,
        _date: NaiveDate,
        _window_days: i64,
    ) -> Result<Vec<CalendarEvent>, ContextError> {
        Err(ContextError::Unavailable("calendar offline".to_string()))
    }
}

#[derive(Debug, Default)]
pub struct UnavailableContacts;

impl ContactSource for UnavailableContacts {
    fn contacts_near(&self, _date: NaiveDate) -> Result<Vec<ContactHit>, ContextError> {
        Err(ContextError::Unavailable("contacts offline".to_string()))
    }
}
