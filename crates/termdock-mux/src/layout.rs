//! Split-view state machine.
//!
//! A workspace is either unsplit or shows exactly two distinct sessions in a
//! primary and a secondary pane. [`Split`] can only be built from two
//! different IDs, so a layout with the same session in both panes cannot be
//! represented.

use serde::{Deserialize, Serialize};
use termdock_pty::SessionId;

pub const DEFAULT_RATIO: f32 = 0.5;
pub const MIN_RATIO: f32 = 0.1;
pub const MAX_RATIO: f32 = 0.9;

/// How the two panes are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Side by side: primary on the left, secondary on the right.
    Horizontal,
    /// Stacked: primary on top, secondary below.
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Primary,
    Secondary,
}

impl Pane {
    pub fn other(self) -> Pane {
        match self {
            Pane::Primary => Pane::Secondary,
            Pane::Secondary => Pane::Primary,
        }
    }
}

/// Two distinct sessions shown together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    primary: SessionId,
    secondary: SessionId,
    orientation: Orientation,
    ratio: f32,
}

impl Split {
    /// Returns `None` when both panes would show the same session.
    pub fn new(primary: SessionId, secondary: SessionId, orientation: Orientation) -> Option<Self> {
        (primary != secondary).then_some(Self {
            primary,
            secondary,
            orientation,
            ratio: DEFAULT_RATIO,
        })
    }

    pub fn primary(&self) -> SessionId {
        self.primary
    }

    pub fn secondary(&self) -> SessionId {
        self.secondary
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Share of the space given to the primary pane.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn get(&self, pane: Pane) -> SessionId {
        match pane {
            Pane::Primary => self.primary,
            Pane::Secondary => self.secondary,
        }
    }

    pub fn pane_of(&self, id: SessionId) -> Option<Pane> {
        if id == self.primary {
            Some(Pane::Primary)
        } else if id == self.secondary {
            Some(Pane::Secondary)
        } else {
            None
        }
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.pane_of(id).is_some()
    }

    /// The same pair under a different orientation, at the default ratio.
    pub fn reoriented(&self, orientation: Orientation) -> Split {
        Split {
            orientation,
            ratio: DEFAULT_RATIO,
            ..*self
        }
    }
}

/// What [`PaneLayout::toggle`] asks the caller to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Toggle {
    /// Same orientation requested while split: leave split view.
    Exit,
    /// Different orientation requested while split: keep the pair.
    Reorient(Split),
    /// Not split: split the active session with a fresh one.
    Enter,
}

/// Result of [`PaneLayout::swap_into`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Not split, or the session already occupies that pane.
    Unchanged,
    /// The session was in the other pane; primary and secondary traded places.
    Exchanged,
    /// The session took the pane; the previous occupant went back to the tabs.
    Replaced { evicted: SessionId },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaneLayout {
    split: Option<Split>,
}

impl PaneLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn split(&self) -> Option<&Split> {
        self.split.as_ref()
    }

    pub fn is_split(&self) -> bool {
        self.split.is_some()
    }

    pub fn pane_of(&self, id: SessionId) -> Option<Pane> {
        self.split.and_then(|s| s.pane_of(id))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.pane_of(id).is_some()
    }

    /// Show `split`, replacing any current split in a single step.
    pub fn enter(&mut self, split: Split) {
        self.split = Some(split);
    }

    /// Leave split view. Both sessions stay open.
    pub fn exit(&mut self) -> Option<Split> {
        self.split.take()
    }

    /// Decide what a split request with `orientation` means right now.
    pub fn toggle(&self, orientation: Orientation) -> Toggle {
        match self.split {
            Some(split) if split.orientation == orientation => Toggle::Exit,
            Some(split) => Toggle::Reorient(split.reoriented(orientation)),
            None => Toggle::Enter,
        }
    }

    /// Put `id` into `pane`.
    pub fn swap_into(&mut self, pane: Pane, id: SessionId) -> SwapOutcome {
        let Some(split) = self.split.as_mut() else {
            return SwapOutcome::Unchanged;
        };

        match split.pane_of(id) {
            Some(current) if current == pane => SwapOutcome::Unchanged,
            Some(_) => {
                std::mem::swap(&mut split.primary, &mut split.secondary);
                SwapOutcome::Exchanged
            }
            None => {
                let slot = match pane {
                    Pane::Primary => &mut split.primary,
                    Pane::Secondary => &mut split.secondary,
                };
                let evicted = std::mem::replace(slot, id);
                SwapOutcome::Replaced { evicted }
            }
        }
    }

    /// Set the primary pane's share, clamped to `[MIN_RATIO, MAX_RATIO]`.
    /// Returns `false` when not split.
    pub fn set_ratio(&mut self, ratio: f32) -> bool {
        match self.split.as_mut() {
            Some(split) if ratio.is_finite() => {
                split.ratio = ratio.clamp(MIN_RATIO, MAX_RATIO);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(a: SessionId, b: SessionId) -> Split {
        Split::new(a, b, Orientation::Horizontal).unwrap()
    }

    fn assert_distinct(layout: &PaneLayout) {
        if let Some(s) = layout.split() {
            assert_ne!(s.primary(), s.secondary());
        }
    }

    #[test]
    fn test_split_rejects_same_session() {
        assert!(Split::new(1, 1, Orientation::Vertical).is_none());
        assert!(Split::new(1, 2, Orientation::Vertical).is_some());
    }

    #[test]
    fn test_enter_replaces_existing_split() {
        let mut layout = PaneLayout::new();
        layout.enter(split(1, 2));
        layout.enter(Split::new(3, 4, Orientation::Vertical).unwrap());

        let s = layout.split().unwrap();
        assert_eq!((s.primary(), s.secondary()), (3, 4));
        assert_eq!(s.orientation(), Orientation::Vertical);
        assert!(!layout.contains(1));
    }

    #[test]
    fn test_exit_returns_previous_split() {
        let mut layout = PaneLayout::new();
        layout.enter(split(1, 2));

        assert_eq!(layout.exit(), Some(split(1, 2)));
        assert!(!layout.is_split());
        assert_eq!(layout.exit(), None);
    }

    #[test]
    fn test_toggle_decisions() {
        let mut layout = PaneLayout::new();
        assert_eq!(layout.toggle(Orientation::Horizontal), Toggle::Enter);

        layout.enter(split(1, 2));
        assert_eq!(layout.toggle(Orientation::Horizontal), Toggle::Exit);

        match layout.toggle(Orientation::Vertical) {
            Toggle::Reorient(s) => {
                assert_eq!((s.primary(), s.secondary()), (1, 2));
                assert_eq!(s.orientation(), Orientation::Vertical);
            }
            other => panic!("expected reorient, got {other:?}"),
        }
    }

    #[test]
    fn test_reorient_resets_ratio() {
        let mut layout = PaneLayout::new();
        layout.enter(split(1, 2));
        layout.set_ratio(0.7);

        let Toggle::Reorient(s) = layout.toggle(Orientation::Vertical) else {
            panic!("expected reorient");
        };
        assert_eq!(s.ratio(), DEFAULT_RATIO);
    }

    #[test]
    fn test_swap_into_other_pane_exchanges() {
        let mut layout = PaneLayout::new();
        layout.enter(split(1, 2));

        assert_eq!(layout.swap_into(Pane::Primary, 2), SwapOutcome::Exchanged);
        let s = layout.split().unwrap();
        assert_eq!((s.primary(), s.secondary()), (2, 1));

        assert_eq!(layout.swap_into(Pane::Primary, 1), SwapOutcome::Exchanged);
        let s = layout.split().unwrap();
        assert_eq!((s.primary(), s.secondary()), (1, 2));
    }

    #[test]
    fn test_swap_into_same_pane_is_noop() {
        let mut layout = PaneLayout::new();
        layout.enter(split(1, 2));

        assert_eq!(layout.swap_into(Pane::Secondary, 2), SwapOutcome::Unchanged);
        assert_eq!(layout.split(), Some(&split(1, 2)));
    }

    #[test]
    fn test_swap_into_evicts_previous_occupant() {
        let mut layout = PaneLayout::new();
        layout.enter(split(1, 2));

        assert_eq!(
            layout.swap_into(Pane::Secondary, 5),
            SwapOutcome::Replaced { evicted: 2 }
        );
        assert_eq!(layout.pane_of(5), Some(Pane::Secondary));
        assert!(!layout.contains(2));
    }

    #[test]
    fn test_swap_into_unsplit_is_noop() {
        let mut layout = PaneLayout::new();
        assert_eq!(layout.swap_into(Pane::Primary, 1), SwapOutcome::Unchanged);
        assert!(!layout.is_split());
    }

    #[test]
    fn test_set_ratio_clamps() {
        let mut layout = PaneLayout::new();
        assert!(!layout.set_ratio(0.3));

        layout.enter(split(1, 2));
        assert!(layout.set_ratio(0.95));
        assert_eq!(layout.split().unwrap().ratio(), MAX_RATIO);
        assert!(layout.set_ratio(0.0));
        assert_eq!(layout.split().unwrap().ratio(), MIN_RATIO);
        assert!(!layout.set_ratio(f32::NAN));
    }

    #[test]
    fn test_panes_stay_distinct_through_any_sequence() {
        let mut layout = PaneLayout::new();
        let ids = [1, 2, 3];
        let panes = [Pane::Primary, Pane::Secondary];

        for (step, &id) in ids.iter().cycle().take(30).enumerate() {
            match step % 5 {
                0 => {
                    if let Some(s) = Split::new(id, ids[(step + 1) % 3], Orientation::Vertical) {
                        layout.enter(s);
                    }
                }
                1 | 2 => {
                    layout.swap_into(panes[step % 2], id);
                }
                3 => {
                    if let Toggle::Reorient(s) = layout.toggle(Orientation::Horizontal) {
                        layout.enter(s);
                    }
                }
                _ => {
                    if step % 3 == 0 {
                        layout.exit();
                    }
                }
            }
            assert_distinct(&layout);
        }
    }
}
