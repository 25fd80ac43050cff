use std::time::{Duration, Instant};

/// Minimum intersection ratio for the secondary promotion path.
pub const INTERSECTION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_y: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(scroll_y: f64, height: f64) -> Self {
        Self { scroll_y, height }
    }

    pub fn bottom(&self) -> f64 {
        self.scroll_y + self.height
    }

    pub fn center(&self) -> f64 {
        self.scroll_y + self.height / 2.0
    }
}

/// Rendered element of one entry, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementBox {
    pub id: i64,
    pub top: f64,
    pub height: f64,
}

impl ElementBox {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> f64 {
        self.top + self.height / 2.0
    }

    fn overlaps(&self, viewport: &Viewport) -> bool {
        self.bottom() > viewport.scroll_y && self.top < viewport.bottom()
    }
}

/// Boxes keyed by entry id, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub boxes: Vec<ElementBox>,
    pub document_height: f64,
}

impl Layout {
    /// Stacks entries of the given heights top to bottom starting at `offset`.
    pub fn stacked(offset: f64, items: impl IntoIterator<Item = (i64, f64)>) -> Self {
        let mut top = offset;
        let boxes = items
            .into_iter()
            .map(|(id, height)| {
                let element = ElementBox { id, top, height };
                top += height;
                element
            })
            .collect();
        Self {
            boxes,
            document_height: top,
        }
    }
}

/// True once the reader is within `threshold` pixels of the end of the content.
pub fn near_bottom(viewport: &Viewport, document_height: f64, threshold: f64) -> bool {
    viewport.bottom() >= document_height - threshold
}

/// Leading-edge throttle: lets one call through, then drops calls for `interval`.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Decides which entry is "in view".
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    throttle: Throttle,
    /// Last scroll the throttle dropped, replayed once the window closes.
    trailing: Option<(Viewport, Layout)>,
}

impl ViewportTracker {
    pub fn new(throttle: Duration) -> Self {
        Self {
            throttle: Throttle::new(throttle),
            trailing: None,
        }
    }

    /// Among boxes overlapping the viewport, the one whose centre is closest to
    /// the viewport centre. Ties go to the earlier entry.
    pub fn most_centered(viewport: &Viewport, layout: &Layout) -> Option<i64> {
        let center = viewport.center();
        let mut best: Option<(i64, f64)> = None;

        for element in layout.boxes.iter().filter(|b| b.overlaps(viewport)) {
            let distance = (element.center() - center).abs();
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((element.id, distance)),
            }
        }

        best.map(|(id, _)| id)
    }

    /// Throttled scroll handler. Returns the id to promote, if it changed.
    pub fn on_scroll(
        &mut self,
        now: Instant,
        viewport: &Viewport,
        layout: &Layout,
        active: Option<i64>,
    ) -> Option<i64> {
        if !self.throttle.ready(now) {
            self.trailing = Some((*viewport, layout.clone()));
            return None;
        }
        self.trailing = None;
        self.rescan(viewport, layout, active)
    }

    /// Scans the last dropped scroll position once the throttle allows it.
    pub fn flush(&mut self, now: Instant, active: Option<i64>) -> Option<i64> {
        if self.trailing.is_none() || !self.throttle.ready(now) {
            return None;
        }
        let (viewport, layout) = self.trailing.take()?;
        self.rescan(&viewport, &layout, active)
    }

    pub fn has_trailing(&self) -> bool {
        self.trailing.is_some()
    }

    /// Unthrottled scan, used after the entry list changes.
    pub fn rescan(&self, viewport: &Viewport, layout: &Layout, active: Option<i64>) -> Option<i64> {
        Self::most_centered(viewport, layout).filter(|id| Some(*id) != active)
    }

    /// Intersection-ratio path. Only ever moves to a lower id (or sets an unset
    /// one) so the address bar does not jump back while scrolling forward.
    pub fn on_intersection(&self, id: i64, ratio: f64, active: Option<i64>) -> Option<i64> {
        if ratio < INTERSECTION_THRESHOLD {
            return None;
        }
        match active {
            None => Some(id),
            Some(current) if id < current => Some(id),
            Some(_) => None,
        }
    }

    pub fn reset(&mut self) {
        self.throttle.reset();
        self.trailing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_entries() -> Layout {
        Layout::stacked(0.0, [(100, 1000.0), (101, 1000.0), (102, 1000.0)])
    }

    #[test]
    fn stacked_layout_accumulates_tops() {
        let layout = three_entries();
        assert_eq!(layout.boxes[1].top, 1000.0);
        assert_eq!(layout.boxes[2].bottom(), 3000.0);
        assert_eq!(layout.document_height, 3000.0);
    }

    #[test]
    fn picks_entry_closest_to_viewport_center() {
        let layout = three_entries();
        // viewport 800..1600, centre 1200: 101 (centre 1500) beats 100 (centre 500)
        let viewport = Viewport::new(800.0, 800.0);
        assert_eq!(ViewportTracker::most_centered(&viewport, &layout), Some(101));

        let top = Viewport::new(0.0, 800.0);
        assert_eq!(ViewportTracker::most_centered(&top, &layout), Some(100));
    }

    #[test]
    fn ignores_elements_outside_viewport() {
        let layout = Layout::stacked(0.0, [(100, 100.0), (101, 100.0)]);
        let viewport = Viewport::new(5000.0, 800.0);
        assert_eq!(ViewportTracker::most_centered(&viewport, &layout), None);
    }

    #[test]
    fn equal_distance_prefers_earlier_entry() {
        let layout = Layout::stacked(0.0, [(100, 500.0), (101, 500.0)]);
        let viewport = Viewport::new(250.0, 500.0);
        assert_eq!(ViewportTracker::most_centered(&viewport, &layout), Some(100));
    }

    #[test]
    fn scroll_reports_only_changes() {
        let layout = three_entries();
        let mut tracker = ViewportTracker::new(Duration::from_millis(100));
        let start = Instant::now();

        let viewport = Viewport::new(1100.0, 800.0);
        assert_eq!(tracker.on_scroll(start, &viewport, &layout, Some(100)), Some(101));
        let later = start + Duration::from_millis(200);
        assert_eq!(tracker.on_scroll(later, &viewport, &layout, Some(101)), None);
    }

    #[test]
    fn scroll_is_throttled() {
        let layout = three_entries();
        let mut tracker = ViewportTracker::new(Duration::from_millis(100));
        let start = Instant::now();

        assert_eq!(
            tracker.on_scroll(start, &Viewport::new(0.0, 800.0), &layout, None),
            Some(100)
        );
        let soon = start + Duration::from_millis(40);
        assert_eq!(
            tracker.on_scroll(soon, &Viewport::new(2100.0, 800.0), &layout, Some(100)),
            None
        );
        let later = start + Duration::from_millis(120);
        assert_eq!(
            tracker.on_scroll(later, &Viewport::new(2100.0, 800.0), &layout, Some(100)),
            Some(102)
        );
    }

    #[test]
    fn dropped_scroll_is_replayed_after_interval() {
        let layout = three_entries();
        let mut tracker = ViewportTracker::new(Duration::from_millis(100));
        let start = Instant::now();

        assert_eq!(
            tracker.on_scroll(start, &Viewport::new(0.0, 800.0), &layout, None),
            Some(100)
        );
        let soon = start + Duration::from_millis(50);
        assert_eq!(
            tracker.on_scroll(soon, &Viewport::new(1100.0, 800.0), &layout, Some(100)),
            None
        );
        assert!(tracker.has_trailing());

        assert_eq!(tracker.flush(start + Duration::from_millis(80), Some(100)), None);
        assert!(tracker.has_trailing());

        assert_eq!(tracker.flush(start + Duration::from_millis(150), Some(100)), Some(101));
        assert!(!tracker.has_trailing());
        assert_eq!(tracker.flush(start + Duration::from_secs(5), Some(101)), None);
    }

    #[test]
    fn scan_that_passes_the_throttle_clears_trailing() {
        let layout = three_entries();
        let mut tracker = ViewportTracker::new(Duration::from_millis(100));
        let start = Instant::now();

        tracker.on_scroll(start, &Viewport::new(0.0, 800.0), &layout, None);
        let dropped = start + Duration::from_millis(10);
        tracker.on_scroll(dropped, &Viewport::new(1100.0, 800.0), &layout, Some(100));
        let passed = start + Duration::from_millis(200);
        tracker.on_scroll(passed, &Viewport::new(2100.0, 800.0), &layout, Some(100));
        assert!(!tracker.has_trailing());
    }

    #[test]
    fn scrolling_back_up_can_lower_active_id() {
        let layout = three_entries();
        let tracker = ViewportTracker::new(Duration::from_millis(100));
        assert_eq!(
            tracker.rescan(&Viewport::new(0.0, 800.0), &layout, Some(102)),
            Some(100)
        );
    }

    #[test]
    fn intersection_never_raises_active_id() {
        let tracker = ViewportTracker::new(Duration::from_millis(100));
        assert_eq!(tracker.on_intersection(100, 0.6, None), Some(100));
        assert_eq!(tracker.on_intersection(101, 0.9, Some(100)), None);
        assert_eq!(tracker.on_intersection(99, 0.5, Some(100)), Some(99));
        assert_eq!(tracker.on_intersection(99, 0.49, Some(100)), None);
        assert_eq!(tracker.on_intersection(100, 1.0, Some(100)), None);
    }

    #[test]
    fn bottom_proximity_uses_threshold() {
        assert!(near_bottom(&Viewport::new(2000.0, 800.0), 3000.0, 200.0));
        assert!(!near_bottom(&Viewport::new(1999.0, 800.0), 3000.0, 200.0));
        assert!(near_bottom(&Viewport::new(0.0, 800.0), 500.0, 200.0));
    }
}
