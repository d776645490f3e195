/// Unread-notification badge count.
///
/// Maintained on its own: it is bumped by notification events, overwritten
/// by a server-reported count and zeroed by mark-all-read. It is not the
/// number of notifications whose `unread` flag is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadCounter(u64);

impl UnreadCounter {
    pub fn get(self) -> u64 {
        self.0
    }

    pub fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// Overwrite with a server-reported value. Negative reports read as 0.
    pub fn set(&mut self, count: i64) {
        self.0 = u64::try_from(count).unwrap_or(0);
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}
