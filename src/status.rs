use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Default lifetime of an ephemeral message.
pub const DEFAULT_CLEAR_DELAY: Duration = Duration::from_millis(3500);

/// Configured delays are clamped into this window.
pub const MIN_CLEAR_DELAY: Duration = Duration::from_millis(3000);
pub const MAX_CLEAR_DELAY: Duration = Duration::from_millis(4000);

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// The workflow step a message belongs to. Each has exactly one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Upload,
    Sheet,
    Search,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Upload, Section::Sheet, Section::Search];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Upload => "upload",
            Section::Sheet => "sheet",
            Section::Search => "search",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub section: Section,
    pub kind: StatusKind,
    pub text: String,
    /// Persistent messages stay until replaced or cleared explicitly.
    pub persistent: bool,
}

// ---------------------------------------------------------------------------
// StatusNotifier
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Slot {
    message: Option<StatusMessage>,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledClear {
    section: Section,
    generation: u64,
    due: Instant,
}

/// Per-section single-slot message channel.
///
/// Every post bumps the section's generation. A scheduled clear only fires if
/// the generation it was armed with is still current, so an older timer can
/// never wipe a newer message.
#[derive(Debug)]
pub struct StatusNotifier {
    delay: Duration,
    slots: BTreeMap<Section, Slot>,
    scheduled: Vec<ScheduledClear>,
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CLEAR_DELAY)
    }
}

impl StatusNotifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slots: Section::ALL.iter().map(|s| (*s, Slot::default())).collect(),
            scheduled: Vec::new(),
        }
    }

    /// Replace the message shown for `section`.
    pub fn post(
        &mut self,
        section: Section,
        kind: StatusKind,
        text: impl Into<String>,
        persistent: bool,
        now: Instant,
    ) {
        let slot = self.slots.entry(section).or_default();
        slot.generation += 1;
        slot.message = Some(StatusMessage {
            section,
            kind,
            text: text.into(),
            persistent,
        });

        if !persistent {
            self.scheduled.push(ScheduledClear {
                section,
                generation: slot.generation,
                due: now + self.delay,
            });
        }
    }

    /// Fire every clear that is due at `now`. Returns `true` if a visible
    /// message was removed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        let (due, pending): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|c| c.due <= now);
        self.scheduled = pending;

        for clear in due {
            let slot = self.slots.entry(clear.section).or_default();
            if slot.generation == clear.generation && slot.message.is_some() {
                slot.message = None;
                changed = true;
            }
        }
        changed
    }

    pub fn clear(&mut self, section: Section) {
        let slot = self.slots.entry(section).or_default();
        slot.generation += 1;
        slot.message = None;
    }

    pub fn clear_all(&mut self) {
        for section in Section::ALL {
            self.clear(section);
        }
        self.scheduled.clear();
    }

    pub fn message(&self, section: Section) -> Option<&StatusMessage> {
        self.slots.get(&section).and_then(|s| s.message.as_ref())
    }

    /// Earliest pending clear, for scheduling the next repaint.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.iter().map(|c| c.due).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(3);

    fn text(n: &StatusNotifier, section: Section) -> Option<&str> {
        n.message(section).map(|m| m.text.as_str())
    }

    #[test]
    fn ephemeral_message_clears_after_delay() {
        let t0 = Instant::now();
        let mut n = StatusNotifier::new(DELAY);
        n.post(Section::Upload, StatusKind::Success, "uploaded", false, t0);

        assert!(!n.tick(t0 + Duration::from_secs(2)));
        assert_eq!(text(&n, Section::Upload), Some("uploaded"));

        assert!(n.tick(t0 + DELAY));
        assert_eq!(text(&n, Section::Upload), None);
    }

    #[test]
    fn persistent_message_survives_ticks() {
        let t0 = Instant::now();
        let mut n = StatusNotifier::new(DELAY);
        n.post(Section::Search, StatusKind::Error, "search failed", true, t0);

        n.tick(t0 + Duration::from_secs(60));
        assert_eq!(text(&n, Section::Search), Some("search failed"));
        assert_eq!(n.next_deadline(), None);
    }

    #[test]
    fn superseded_timer_does_not_clear_newer_message() {
        let t0 = Instant::now();
        let mut n = StatusNotifier::new(DELAY);
        n.post(Section::Sheet, StatusKind::Error, "first", false, t0);
        n.post(Section::Sheet, StatusKind::Success, "second", false, t0 + Duration::from_secs(2));

        // First message's timer fires; the second message must remain.
        n.tick(t0 + DELAY);
        assert_eq!(text(&n, Section::Sheet), Some("second"));

        n.tick(t0 + Duration::from_secs(2) + DELAY);
        assert_eq!(text(&n, Section::Sheet), None);
    }

    #[test]
    fn ephemeral_timer_does_not_clear_later_persistent_message() {
        let t0 = Instant::now();
        let mut n = StatusNotifier::new(DELAY);
        n.post(Section::Search, StatusKind::Info, "searching", false, t0);
        n.post(Section::Search, StatusKind::Error, "failed", true, t0 + Duration::from_secs(1));

        n.tick(t0 + Duration::from_secs(10));
        assert_eq!(text(&n, Section::Search), Some("failed"));
    }

    #[test]
    fn sections_are_independent() {
        let t0 = Instant::now();
        let mut n = StatusNotifier::new(DELAY);
        n.post(Section::Upload, StatusKind::Success, "up", false, t0);
        n.post(Section::Search, StatusKind::Info, "0 results", true, t0);

        n.tick(t0 + DELAY);
        assert_eq!(text(&n, Section::Upload), None);
        assert_eq!(text(&n, Section::Search), Some("0 results"));
    }

    #[test]
    fn clear_all_drops_messages_and_timers() {
        let t0 = Instant::now();
        let mut n = StatusNotifier::new(DELAY);
        n.post(Section::Upload, StatusKind::Success, "up", false, t0);
        n.post(Section::Sheet, StatusKind::Error, "bad", true, t0);
        n.clear_all();

        assert!(Section::ALL.iter().all(|s| n.message(*s).is_none()));
        assert_eq!(n.next_deadline(), None);
    }
}
