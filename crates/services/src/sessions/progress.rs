/// Sidebar view of a loaded session.
///
/// `completed` counts questions the server flagged as completed. It is for
/// display only: whether the subject is done is decided by the subject's
/// server-side `user_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOverview {
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
    pub current_index: Option<usize>,
    pub can_prev: bool,
    pub can_next: bool,
    pub can_finish: bool,
}

/// Rounded percentage, half up. Zero when `total` is zero.
#[must_use]
pub fn percent_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    let rounded = (completed * 100 + total / 2) / total;
    u8::try_from(rounded).unwrap_or(100)
}
