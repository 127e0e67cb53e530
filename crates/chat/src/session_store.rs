use uibuilder_core::SessionSummary;

/// Session summaries in display order, newest created first.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Vec<SessionSummary>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list. Later duplicates of an id are dropped.
    pub fn replace_all(&mut self, sessions: Vec<SessionSummary>) {
        self.sessions.clear();
        for session in sessions {
            if !self.contains(&session.id) {
                self.sessions.push(session);
            }
        }
    }

    /// Insert at the front, replacing any existing entry with the same id.
    pub fn prepend(&mut self, session: SessionSummary) {
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session);
    }

    pub fn remove(&mut self, session_id: &str) -> Option<SessionSummary> {
        let index = self.sessions.iter().position(|s| s.id == session_id)?;
        Some(self.sessions.remove(index))
    }

    /// Returns false when no session has this id.
    pub fn rename(&mut self, session_id: &str, title: impl Into<String>) -> bool {
        match self.sessions.iter_mut().find(|s| s.id == session_id) {
            Some(session) => {
                session.rename(title);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionSummary> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.get(session_id).is_some()
    }

    pub fn as_slice(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionSummary> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
