use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a single render request.
///
/// The value is the UNIX time in milliseconds at which the request was
/// accepted, bumped forward when two requests land in the same millisecond.
/// It names both the request's workspace and the video it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderId(u64);

impl RenderId {
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn workspace_name(self) -> String {
        format!("render-{self}")
    }

    #[must_use]
    pub fn video_file_name(self) -> String {
        format!("video-{self}.mp4")
    }
}

impl From<u64> for RenderId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues strictly increasing [`RenderId`]s.
#[derive(Debug, Default)]
pub struct RenderIdGenerator {
    last: AtomicU64,
}

impl RenderIdGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> RenderId {
        let now =
            u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_after(now)
    }

    fn next_after(&self, now: u64) -> RenderId {
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return RenderId(candidate),
                Err(current) => last = current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_file_names() {
        let id = RenderId(1_700_000_000_123);
        assert_eq!(id.workspace_name(), "render-1700000000123");
        assert_eq!(id.video_file_name(), "video-1700000000123.mp4");
    }

    #[test]
    fn test_same_millisecond_is_disambiguated() {
        let generator = RenderIdGenerator::new();

        let first = generator.next_after(1000);
        let second = generator.next_after(1000);
        let third = generator.next_after(999);

        assert_eq!(first.as_u64(), 1000);
        assert_eq!(second.as_u64(), 1001);
        assert_eq!(third.as_u64(), 1002);
    }

    #[test]
    fn test_follows_clock_when_it_moves_ahead() {
        let generator = RenderIdGenerator::new();

        generator.next_after(1000);
        assert_eq!(generator.next_after(5000).as_u64(), 5000);
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let generator = RenderIdGenerator::new();

        let ids: Vec<RenderId> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..250).map(|_| generator.next_id()).collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });

        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
