//! Placement of new shapes next to the shapes they came from, and the links
//! between them.
//!
//! Results grow left-to-right, then top-to-bottom, away from their anchor.
//! Existing shapes are never moved.

use easel_core::canvas::Canvas;
use easel_core::{NewShape, Position, Rect, Shape, ShapeId, ShapeKind, Size};

/// Space between a shape and its neighbour.
pub const GAP: f64 = 40.0;

/// Slots tried per direction before giving up and going past everything.
pub const MAX_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Direction {
    Right,
    Below,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    distance: f64,
    direction: Direction,
    rect: Rect,
}

/// Candidate rects around `anchor`, nearest first, right before below on ties.
fn candidate_slots(anchor: &Rect, size: Size) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(MAX_SLOTS * 2);
    for i in 0..MAX_SLOTS {
        let step = i as f64;
        let right_offset = GAP + step * (size.w + GAP);
        slots.push(Slot {
            distance: right_offset,
            direction: Direction::Right,
            rect: Rect {
                x: anchor.max_x() + right_offset,
                y: anchor.y,
                w: size.w,
                h: size.h,
            },
        });
        let below_offset = GAP + step * (size.h + GAP);
        slots.push(Slot {
            distance: below_offset,
            direction: Direction::Below,
            rect: Rect {
                x: anchor.x,
                y: anchor.max_y() + below_offset,
                w: size.w,
                h: size.h,
            },
        });
    }
    slots.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.direction.cmp(&b.direction))
    });
    slots
}

/// Bounds that a new shape must not overlap: everything but links and itself.
fn obstacles(shapes: &[Shape], exclude: &ShapeId) -> Vec<Rect> {
    shapes
        .iter()
        .filter(|s| &s.id != exclude && !s.kind.is_link())
        .map(Shape::bounds)
        .collect()
}

fn is_free(rect: &Rect, obstacles: &[Rect]) -> bool {
    obstacles.iter().all(|o| !rect.overlaps(o))
}

/// Choose a free position for a shape of `size`.
///
/// With an anchor the nearest free slot to its right or below wins. Without
/// one, the viewport center is tried first and, if taken, used as the anchor.
pub fn choose_position(anchor: Option<&Rect>, viewport: &Rect, size: Size, obstacles: &[Rect]) -> Position {
    let anchor = match anchor {
        Some(a) => *a,
        None => {
            let center = viewport.center();
            let centered = Rect {
                x: center.x - size.w / 2.0,
                y: center.y - size.h / 2.0,
                w: size.w,
                h: size.h,
            };
            if is_free(&centered, obstacles) {
                return Position {
                    x: centered.x,
                    y: centered.y,
                };
            }
            centered
        }
    };

    if let Some(slot) = candidate_slots(&anchor, size)
        .into_iter()
        .find(|slot| is_free(&slot.rect, obstacles))
    {
        return Position {
            x: slot.rect.x,
            y: slot.rect.y,
        };
    }

    // Every slot is taken: go right of the rightmost shape.
    let rightmost = obstacles
        .iter()
        .map(Rect::max_x)
        .fold(anchor.max_x(), f64::max);
    Position {
        x: rightmost + GAP,
        y: anchor.y,
    }
}

/// Layout operations bound to a canvas.
pub struct Placer<'a> {
    canvas: &'a dyn Canvas,
}

impl<'a> Placer<'a> {
    pub fn new(canvas: &'a dyn Canvas) -> Self {
        Self { canvas }
    }

    /// Move `id` next to `anchor` (or into the viewport) without overlapping
    /// anything. Returns the new position, or `None` if the shape is gone.
    pub fn place(&self, id: &ShapeId, anchor: Option<&ShapeId>) -> Option<Position> {
        let shape = self.canvas.shape(id)?;
        let anchor_rect = anchor.and_then(|a| self.canvas.shape(a)).map(|s| s.bounds());
        let shapes = self.canvas.shapes();
        let position = choose_position(
            anchor_rect.as_ref(),
            &self.canvas.viewport_bounds(),
            shape.size,
            &obstacles(&shapes, id),
        );
        self.canvas.set_position(id, position);
        tracing::trace!(shape = %id, x = position.x, y = position.y, "placed shape");
        Some(position)
    }

    /// Create `shape`, then place it. Returns its id.
    pub fn create_placed(&self, shape: NewShape, anchor: Option<&ShapeId>) -> ShapeId {
        let id = self.canvas.create_shape(shape);
        self.place(&id, anchor);
        id
    }

    /// Draw a link from `from` to `to`. Skipped if either shape is gone.
    pub fn link(&self, from: &ShapeId, to: &ShapeId) -> Option<ShapeId> {
        let (Some(source), Some(target)) = (self.canvas.shape(from), self.canvas.shape(to)) else {
            tracing::debug!(%from, %to, "link endpoint no longer exists, skipping");
            return None;
        };
        let start = source.bounds().center();
        let end = target.bounds().center();
        let arrow = NewShape {
            id: ShapeId::new(),
            position: Position {
                x: start.x.min(end.x),
                y: start.y.min(end.y),
            },
            size: Size {
                w: (end.x - start.x).abs(),
                h: (end.y - start.y).abs(),
            },
            kind: ShapeKind::Arrow {
                from: from.clone(),
                to: to.clone(),
            },
        };
        Some(self.canvas.create_shape(arrow))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::canvas::MemoryCanvas;
    use pretty_assertions::assert_eq;

    const SIZE: Size = Size { w: 200.0, h: 100.0 };
    const VIEWPORT: Rect = Rect { x: 0.0, y: 0.0, w: 1000.0, h: 800.0 };

    fn at(canvas: &MemoryCanvas, x: f64, y: f64, size: Size) -> ShapeId {
        let mut shape = NewShape::text("x", size);
        shape.position = Position { x, y };
        canvas.create_shape(shape)
    }

    #[test]
    fn prefers_the_right_of_the_anchor() {
        let anchor = Rect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 };
        let pos = choose_position(Some(&anchor), &VIEWPORT, SIZE, &[anchor]);
        assert_eq!(pos, Position { x: 140.0, y: 0.0 });
    }

    #[test]
    fn falls_back_below_when_right_is_taken() {
        let anchor = Rect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 };
        let blocker = Rect { x: 140.0, y: 0.0, w: 200.0, h: 100.0 };
        let pos = choose_position(Some(&anchor), &VIEWPORT, SIZE, &[anchor, blocker]);
        assert_eq!(pos, Position { x: 0.0, y: 140.0 });
    }

    #[test]
    fn nearest_slot_wins_over_direction() {
        // Right slot 1 is 280 away, below slot 1 only 180: below wins.
        let anchor = Rect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 };
        let right0 = Rect { x: 140.0, y: 0.0, w: 200.0, h: 100.0 };
        let below0 = Rect { x: 0.0, y: 140.0, w: 200.0, h: 100.0 };
        let pos = choose_position(Some(&anchor), &VIEWPORT, SIZE, &[anchor, right0, below0]);
        assert_eq!(pos, Position { x: 0.0, y: 280.0 });
    }

    #[test]
    fn without_anchor_centers_in_viewport() {
        let pos = choose_position(None, &VIEWPORT, SIZE, &[]);
        assert_eq!(pos, Position { x: 400.0, y: 350.0 });
    }

    #[test]
    fn crowded_canvas_goes_past_rightmost_shape() {
        let anchor = Rect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 };
        let wall = Rect { x: 100.0, y: -10_000.0, w: 20_000.0, h: 20_000.0 };
        let below = Rect { x: -10_000.0, y: 100.0, w: 10_100.0, h: 20_000.0 };
        let pos = choose_position(Some(&anchor), &VIEWPORT, SIZE, &[anchor, wall, below]);
        assert_eq!(pos, Position { x: 20_140.0, y: 0.0 });
    }

    #[test]
    fn two_shapes_placed_on_same_anchor_do_not_overlap() {
        let canvas = MemoryCanvas::new(VIEWPORT);
        let anchor = at(&canvas, 0.0, 0.0, Size { w: 100.0, h: 100.0 });
        let placer = Placer::new(&canvas);

        let a = placer.create_placed(NewShape::text("a", SIZE), Some(&anchor));
        let b = placer.create_placed(NewShape::text("b", SIZE), Some(&anchor));

        let a = canvas.shape(&a).unwrap().bounds();
        let b = canvas.shape(&b).unwrap().bounds();
        assert!(!a.overlaps(&b), "{a:?} overlaps {b:?}");
        assert_eq!((a.x, a.y), (140.0, 0.0));
        assert_eq!((b.x, b.y), (0.0, 140.0));
    }

    #[test]
    fn links_are_ignored_as_obstacles() {
        let canvas = MemoryCanvas::new(VIEWPORT);
        let anchor = at(&canvas, 0.0, 0.0, Size { w: 100.0, h: 100.0 });
        let far = at(&canvas, 2000.0, 0.0, Size { w: 100.0, h: 100.0 });
        let placer = Placer::new(&canvas);
        placer.link(&anchor, &far).unwrap();

        let placed = placer.create_placed(NewShape::text("a", SIZE), Some(&anchor));
        assert_eq!(canvas.shape(&placed).unwrap().position, Position { x: 140.0, y: 0.0 });
    }

    #[test]
    fn place_does_not_move_other_shapes() {
        let canvas = MemoryCanvas::new(VIEWPORT);
        let anchor = at(&canvas, 0.0, 0.0, Size { w: 100.0, h: 100.0 });
        let before = canvas.shape(&anchor).unwrap();
        Placer::new(&canvas).create_placed(NewShape::text("a", SIZE), Some(&anchor));
        assert_eq!(canvas.shape(&anchor).unwrap(), before);
    }

    #[test]
    fn missing_anchor_falls_back_to_viewport() {
        let canvas = MemoryCanvas::new(VIEWPORT);
        let placer = Placer::new(&canvas);
        let id = placer.create_placed(NewShape::text("a", SIZE), Some(&ShapeId::from("shape:gone")));
        assert_eq!(canvas.shape(&id).unwrap().position, Position { x: 400.0, y: 350.0 });
    }

    #[test]
    fn link_records_direction() {
        let canvas = MemoryCanvas::new(VIEWPORT);
        let a = at(&canvas, 0.0, 0.0, SIZE);
        let b = at(&canvas, 300.0, 0.0, SIZE);
        let link = Placer::new(&canvas).link(&a, &b).unwrap();
        assert_eq!(canvas.links_between(&a, &b), vec![link]);
        assert!(canvas.links_between(&b, &a).is_empty());
    }

    #[test]
    fn link_to_deleted_shape_is_skipped() {
        let canvas = MemoryCanvas::new(VIEWPORT);
        let a = at(&canvas, 0.0, 0.0, SIZE);
        let b = at(&canvas, 300.0, 0.0, SIZE);
        canvas.delete_shapes(&[b.clone()]);
        assert_eq!(Placer::new(&canvas).link(&a, &b), None);
        assert_eq!(canvas.shapes().len(), 1);
    }
}
