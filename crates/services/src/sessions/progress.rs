/// Aggregated view of quiz progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    /// 1-based position of the current question; `0` before questions load.
    pub current: usize,
    pub total: usize,
    pub answered: usize,
    pub percent: u8,
}
