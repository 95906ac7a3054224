//! Falling Objects
//!
//! Object kinds, their fixed sizes, and the arena that owns every object
//! currently on the play-field.
//!
//! The arena is a `BTreeMap` keyed by a monotonic [`ObjectId`], so iteration
//! order is insertion order and the newest object is always the last key.
//! Tap resolution relies on that to prefer the most recently spawned object.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::game::input::HitRegion;

/// Stable handle of an object within one run.
pub type ObjectId = u32;

/// Point in play-field coordinates (top-left origin, y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point {
    /// The origin.
    pub const ZERO: Point = Point::new(0.0, 0.0);

    /// Create a point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Colors of the catchable crabs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrabColor {
    /// Pink crab.
    Pink,
    /// Purple crab.
    Purple,
    /// Orange crab.
    Orange,
    /// Blue crab.
    Blue,
    /// Green crab.
    Green,
}

impl CrabColor {
    /// Every crab color, in spawn-table order.
    pub const ALL: [CrabColor; 5] = [
        CrabColor::Pink,
        CrabColor::Purple,
        CrabColor::Orange,
        CrabColor::Blue,
        CrabColor::Green,
    ];

    /// Lower-case name, matching the sprite names the renderer loads.
    pub fn name(self) -> &'static str {
        match self {
            CrabColor::Pink => "pink",
            CrabColor::Purple => "purple",
            CrabColor::Orange => "orange",
            CrabColor::Blue => "blue",
            CrabColor::Green => "green",
        }
    }
}

/// What a falling object is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Neutral, catchable object. Tapping scores, missing counts.
    Crab(CrabColor),
    /// Tapping costs points.
    SmallBomb,
    /// Tapping ends the run.
    BigBomb,
    /// Tapping slows everything down for a while.
    PowerSlow,
    /// Tapping removes every bomb on the field.
    PowerClear,
}

impl ObjectKind {
    /// Edge length of the object's square box.
    ///
    /// Spawn placement and hit-testing both use this table.
    #[inline]
    pub fn size(self) -> f32 {
        match self {
            ObjectKind::BigBomb => 48.0,
            ObjectKind::SmallBomb => 24.0,
            ObjectKind::PowerSlow | ObjectKind::PowerClear => 30.0,
            ObjectKind::Crab(_) => 36.0,
        }
    }

    /// Small or big bomb.
    #[inline]
    pub fn is_bomb(self) -> bool {
        matches!(self, ObjectKind::SmallBomb | ObjectKind::BigBomb)
    }

    /// Slow or clear power-up.
    #[inline]
    pub fn is_power_up(self) -> bool {
        matches!(self, ObjectKind::PowerSlow | ObjectKind::PowerClear)
    }

    /// Neither a bomb nor a power-up.
    #[inline]
    pub fn is_neutral(self) -> bool {
        matches!(self, ObjectKind::Crab(_))
    }

    /// Sprite name for the renderer.
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Crab(color) => color.name(),
            ObjectKind::SmallBomb => "small_bomb",
            ObjectKind::BigBomb => "big_bomb",
            ObjectKind::PowerSlow => "slow",
            ObjectKind::PowerClear => "clear",
        }
    }
}

/// A single object on the play-field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallingObject {
    /// Arena handle (also the insertion order)
    pub id: ObjectId,

    /// Kind, which fixes the size
    pub kind: ObjectKind,

    /// Top-left corner of the object's box
    pub position: Point,

    /// Base fall speed in units per frame, before the run multiplier
    pub speed: f32,
}

impl FallingObject {
    /// Edge length of this object's box.
    #[inline]
    pub fn size(&self) -> f32 {
        self.kind.size()
    }

    /// The object's box `[x, x+size] × [y, y+size]`.
    pub fn bounds(&self) -> HitRegion {
        let size = self.size();
        HitRegion::new(
            self.position.x,
            self.position.y,
            self.position.x + size,
            self.position.y + size,
        )
    }

    /// Move down by `speed * multiplier`.
    #[inline]
    pub fn fall(&mut self, multiplier: f32) {
        self.position.y += self.speed * multiplier;
    }
}

/// Arena of the objects currently falling in one run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectStore {
    objects: BTreeMap<ObjectId, FallingObject>,
    next_id: ObjectId,
}

impl ObjectStore {
    /// Empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects on the field.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// No objects on the field.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Add an object and return its handle.
    pub fn insert(&mut self, kind: ObjectKind, position: Point, speed: f32) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, FallingObject { id, kind, position, speed });
        id
    }

    /// Look up an object.
    pub fn get(&self, id: ObjectId) -> Option<&FallingObject> {
        self.objects.get(&id)
    }

    /// Remove an object, returning it if it was present.
    pub fn remove(&mut self, id: ObjectId) -> Option<FallingObject> {
        self.objects.remove(&id)
    }

    /// Objects oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &FallingObject> {
        self.objects.values()
    }

    /// Objects newest first (topmost on screen first).
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &FallingObject> {
        self.objects.values().rev()
    }

    /// Move every object down by its speed times `multiplier`.
    pub fn advance_all(&mut self, multiplier: f32) {
        for object in self.objects.values_mut() {
            object.fall(multiplier);
        }
    }

    /// Remove and return every object whose top edge is below `bottom`,
    /// oldest first.
    pub fn take_exited(&mut self, bottom: f32) -> Vec<FallingObject> {
        let exited: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|o| o.position.y > bottom)
            .map(|o| o.id)
            .collect();

        exited
            .into_iter()
            .filter_map(|id| self.objects.remove(&id))
            .collect()
    }

    /// Remove every bomb. Crabs and power-ups stay. Returns how many went.
    pub fn remove_bombs(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|_, o| !o.kind.is_bomb());
        before - self.objects.len()
    }

    /// Remove everything. Handles are not reused.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Owned copy of every object, oldest first.
    pub fn to_vec(&self) -> Vec<FallingObject> {
        self.objects.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_table() {
        assert_eq!(ObjectKind::BigBomb.size(), 48.0);
        assert_eq!(ObjectKind::SmallBomb.size(), 24.0);
        assert_eq!(ObjectKind::PowerSlow.size(), 30.0);
        assert_eq!(ObjectKind::PowerClear.size(), 30.0);
        for color in CrabColor::ALL {
            assert_eq!(ObjectKind::Crab(color).size(), 36.0);
        }
    }

    #[test]
    fn test_kind_classes_are_disjoint() {
        let kinds = [
            ObjectKind::Crab(CrabColor::Blue),
            ObjectKind::SmallBomb,
            ObjectKind::BigBomb,
            ObjectKind::PowerSlow,
            ObjectKind::PowerClear,
        ];

        for kind in kinds {
            let classes = [kind.is_bomb(), kind.is_power_up(), kind.is_neutral()];
            assert_eq!(classes.iter().filter(|c| **c).count(), 1, "{:?}", kind);
        }
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut store = ObjectStore::new();
        let a = store.insert(ObjectKind::SmallBomb, Point::new(0.0, 0.0), 2.0);
        let b = store.insert(ObjectKind::BigBomb, Point::new(10.0, 0.0), 3.0);
        let c = store.insert(ObjectKind::PowerSlow, Point::new(20.0, 0.0), 4.0);

        let oldest: Vec<_> = store.iter().map(|o| o.id).collect();
        assert_eq!(oldest, vec![a, b, c]);

        let newest: Vec<_> = store.iter_newest_first().map(|o| o.id).collect();
        assert_eq!(newest, vec![c, b, a]);
    }

    #[test]
    fn test_handles_not_reused() {
        let mut store = ObjectStore::new();
        let a = store.insert(ObjectKind::SmallBomb, Point::default(), 2.0);
        store.remove(a);
        store.clear();
        let b = store.insert(ObjectKind::SmallBomb, Point::default(), 2.0);
        assert!(b > a);
    }

    #[test]
    fn test_advance_all_uses_multiplier() {
        let mut store = ObjectStore::new();
        let id = store.insert(ObjectKind::Crab(CrabColor::Pink), Point::new(5.0, 10.0), 4.0);

        store.advance_all(0.5);

        let obj = store.get(id).unwrap();
        assert_eq!(obj.position.y, 12.0);
        assert_eq!(obj.position.x, 5.0);
    }

    #[test]
    fn test_take_exited() {
        let mut store = ObjectStore::new();
        let inside = store.insert(ObjectKind::Crab(CrabColor::Pink), Point::new(0.0, 450.0), 2.0);
        let out1 = store.insert(ObjectKind::SmallBomb, Point::new(0.0, 451.0), 2.0);
        let out2 = store.insert(ObjectKind::Crab(CrabColor::Green), Point::new(0.0, 500.0), 2.0);

        let exited = store.take_exited(450.0);

        let ids: Vec<_> = exited.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![out1, out2]);
        assert_eq!(store.len(), 1);
        assert!(store.get(inside).is_some());
    }

    #[test]
    fn test_remove_bombs() {
        let mut store = ObjectStore::new();
        store.insert(ObjectKind::SmallBomb, Point::default(), 2.0);
        store.insert(ObjectKind::BigBomb, Point::default(), 2.0);
        store.insert(ObjectKind::PowerClear, Point::default(), 2.0);
        store.insert(ObjectKind::Crab(CrabColor::Orange), Point::default(), 2.0);

        assert_eq!(store.remove_bombs(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.iter().all(|o| !o.kind.is_bomb()));
    }

    #[test]
    fn test_bounds() {
        let obj = FallingObject {
            id: 0,
            kind: ObjectKind::BigBomb,
            position: Point::new(100.0, 50.0),
            speed: 3.0,
        };
        let bounds = obj.bounds();
        assert_eq!(bounds, HitRegion::new(100.0, 50.0, 148.0, 98.0));
    }
}
