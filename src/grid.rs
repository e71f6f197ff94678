//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::AllocatorError;

/// A point on the layout grid. Coordinates are 1-based and `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        GridPoint { x, y }
    }

    /// The point one step away, or `None` past the coordinate range
    pub fn offset(self, (dx, dy): (i32, i32)) -> Option<Self> {
        Some(GridPoint::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    /// Every unit step between two collinear points, or `None` if the points
    /// are equal or do not share an axis.
    pub fn unit_steps_to(self, other: GridPoint) -> Option<Vec<(GridPoint, GridPoint)>> {
        if self == other {
            return None;
        }
        let step = if self.y == other.y {
            (other.x.cmp(&self.x) as i32, 0)
        } else if self.x == other.x {
            (0, other.y.cmp(&self.y) as i32)
        } else {
            return None;
        };
        let mut steps = Vec::new();
        let mut current = self;
        while current != other {
            let next = current.offset(step)?;
            steps.push((current, next));
            current = next;
        }
        Some(steps)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

impl FromStr for GridPoint {
    type Err = AllocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AllocatorError::InvalidKey(s.to_string());
        let (x, y) = s.trim().split_once('_').ok_or_else(invalid)?;
        Ok(GridPoint::new(
            x.parse().map_err(|_| invalid())?,
            y.parse().map_err(|_| invalid())?,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "h")]
    Horizontal,
    #[serde(rename = "v")]
    Vertical,
}

impl Orientation {
    /// The two faces of a panel with this orientation, side A first
    pub fn sides(self) -> [Side; 2] {
        match self {
            Orientation::Horizontal => [Side::Up, Side::Down],
            Orientation::Vertical => [Side::Left, Side::Right],
        }
    }

    /// Unit step along the panel, from endpoint A toward endpoint B
    pub fn along(self) -> (i32, i32) {
        match self {
            Orientation::Horizontal => (1, 0),
            Orientation::Vertical => (0, 1),
        }
    }
}

/// One face of a panel. Horizontal panels have `Up`/`Down`, vertical panels
/// have `Left`/`Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "u")]
    Up,
    #[serde(rename = "d")]
    Down,
    #[serde(rename = "l")]
    Left,
    #[serde(rename = "r")]
    Right,
}

impl Side {
    pub fn code(self) -> char {
        match self {
            Side::Up => 'u',
            Side::Down => 'd',
            Side::Left => 'l',
            Side::Right => 'r',
        }
    }

    pub fn from_code(code: &str) -> Option<Side> {
        match code {
            "u" => Some(Side::Up),
            "d" => Some(Side::Down),
            "l" => Some(Side::Left),
            "r" => Some(Side::Right),
            _ => None,
        }
    }

    /// Unit vector pointing away from the panel into the space this face looks at
    pub fn normal(self) -> (i32, i32) {
        match self {
            Side::Up => (0, -1),
            Side::Down => (0, 1),
            Side::Left => (-1, 0),
            Side::Right => (1, 0),
        }
    }

    pub fn from_normal(normal: (i32, i32)) -> Option<Side> {
        match normal {
            (0, -1) => Some(Side::Up),
            (0, 1) => Some(Side::Down),
            (-1, 0) => Some(Side::Left),
            (1, 0) => Some(Side::Right),
            _ => None,
        }
    }

    pub fn orientation(self) -> Orientation {
        match self {
            Side::Up | Side::Down => Orientation::Horizontal,
            Side::Left | Side::Right => Orientation::Vertical,
        }
    }
}

/// Which faces of a panel may hold art
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Usability {
    None,
    SideA,
    SideB,
    #[default]
    Both,
}

impl Usability {
    /// The next state in the none -> A -> B -> both cycle
    pub fn next(self) -> Usability {
        match self {
            Usability::None => Usability::SideA,
            Usability::SideA => Usability::SideB,
            Usability::SideB => Usability::Both,
            Usability::Both => Usability::None,
        }
    }

    pub fn allows(self, orientation: Orientation, side: Side) -> bool {
        let [a, b] = orientation.sides();
        match self {
            Usability::None => false,
            Usability::SideA => side == a,
            Usability::SideB => side == b,
            Usability::Both => side == a || side == b,
        }
    }

    /// Wire code, which depends on the orientation for single-sided panels
    pub fn code(self, orientation: Orientation) -> char {
        match self {
            Usability::None => 'n',
            Usability::Both => 'b',
            Usability::SideA => orientation.sides()[0].code(),
            Usability::SideB => orientation.sides()[1].code(),
        }
    }

    pub fn from_code(code: &str, orientation: Orientation) -> Option<Usability> {
        match code {
            "n" => Some(Usability::None),
            "b" => Some(Usability::Both),
            other => {
                let side = Side::from_code(other)?;
                let [a, b] = orientation.sides();
                if side == a {
                    Some(Usability::SideA)
                } else if side == b {
                    Some(Usability::SideB)
                } else {
                    None
                }
            }
        }
    }
}

/// Canonical identity of a panel: two grid-adjacent endpoints, top-left first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelKey {
    a: GridPoint,
    b: GridPoint,
}

impl PanelKey {
    /// Canonicalizes the endpoint order. Returns `None` when the points are not
    /// adjacent along a single axis.
    pub fn new(p: GridPoint, q: GridPoint) -> Option<Self> {
        if !matches!((p.x.abs_diff(q.x), p.y.abs_diff(q.y)), (1, 0) | (0, 1)) {
            return None;
        }
        let (a, b) = if p <= q { (p, q) } else { (q, p) };
        Some(PanelKey { a, b })
    }

    pub fn a(&self) -> GridPoint {
        self.a
    }

    pub fn b(&self) -> GridPoint {
        self.b
    }

    pub fn orientation(&self) -> Orientation {
        if self.a.y == self.b.y {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    pub fn face(&self, side: Side) -> FaceKey {
        FaceKey { panel: *self, side }
    }

    /// The panel running from `start` one unit in `direction`
    pub fn from_step(start: GridPoint, direction: (i32, i32)) -> Option<Self> {
        PanelKey::new(start, start.offset(direction)?)
    }
}

impl fmt::Display for PanelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.a, self.b)
    }
}

impl FromStr for PanelKey {
    type Err = AllocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once('|')
            .ok_or_else(|| AllocatorError::InvalidKey(s.to_string()))?;
        PanelKey::new(a.parse()?, b.parse()?).ok_or_else(|| AllocatorError::InvalidKey(s.to_string()))
    }
}

/// One assignable face: a panel plus the side of it art hangs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceKey {
    pub panel: PanelKey,
    pub side: Side,
}

impl FaceKey {
    pub fn new(panel: PanelKey, side: Side) -> Option<Self> {
        (side.orientation() == panel.orientation()).then_some(FaceKey { panel, side })
    }
}

impl fmt::Display for FaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.panel, self.side.code())
    }
}

impl FromStr for FaceKey {
    type Err = AllocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AllocatorError::InvalidKey(s.to_string());
        let (panel, side) = s.trim().rsplit_once('|').ok_or_else(invalid)?;
        let side = Side::from_code(side).ok_or_else(invalid)?;
        FaceKey::new(panel.parse()?, side).ok_or_else(invalid)
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(PanelKey);
string_serde!(FaceKey);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_key_is_canonical_regardless_of_endpoint_order() {
        let forward = PanelKey::new(GridPoint::new(5, 6), GridPoint::new(6, 6)).unwrap();
        let backward = PanelKey::new(GridPoint::new(6, 6), GridPoint::new(5, 6)).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.to_string(), "5_6|6_6");

        let vertical = PanelKey::new(GridPoint::new(3, 5), GridPoint::new(3, 4)).unwrap();
        assert_eq!(vertical.to_string(), "3_4|3_5");
        assert_eq!(vertical.orientation(), Orientation::Vertical);
    }

    #[test]
    fn non_adjacent_points_do_not_form_a_panel() {
        assert!(PanelKey::new(GridPoint::new(1, 1), GridPoint::new(3, 1)).is_none());
        assert!(PanelKey::new(GridPoint::new(1, 1), GridPoint::new(2, 2)).is_none());
        assert!(PanelKey::new(GridPoint::new(1, 1), GridPoint::new(1, 1)).is_none());
    }

    #[test]
    fn steps_at_the_coordinate_limit_do_not_overflow() {
        let edge: PanelKey = "2147483646_1|2147483647_1".parse().unwrap();
        assert_eq!(edge.b(), GridPoint::new(i32::MAX, 1));
        assert!(PanelKey::from_step(edge.b(), (1, 0)).is_none());
        assert!(PanelKey::from_step(GridPoint::new(1, i32::MIN), (0, -1)).is_none());
        assert!(PanelKey::new(GridPoint::new(i32::MIN, 0), GridPoint::new(i32::MAX, 0)).is_none());
        assert_eq!(
            GridPoint::new(i32::MAX - 2, 4).unit_steps_to(GridPoint::new(i32::MAX, 4)).map(|s| s.len()),
            Some(2)
        );
    }

    #[test]
    fn face_keys_parse_from_wire_form() {
        let face: FaceKey = "2_3|3_3|u".parse().unwrap();
        assert_eq!(face.side, Side::Up);
        assert_eq!(face.to_string(), "2_3|3_3|u");
        assert!("2_3|3_3|l".parse::<FaceKey>().is_err());
        assert!("2_3|4_3|u".parse::<FaceKey>().is_err());
        assert!("garbage".parse::<FaceKey>().is_err());
    }

    #[test]
    fn usability_cycles_through_all_states() {
        let mut u = Usability::None;
        let mut seen = vec![u];
        for _ in 0..4 {
            u = u.next();
            seen.push(u);
        }
        assert_eq!(
            seen,
            vec![
                Usability::None,
                Usability::SideA,
                Usability::SideB,
                Usability::Both,
                Usability::None
            ]
        );
        assert_eq!(Usability::SideA.code(Orientation::Vertical), 'l');
        assert_eq!(
            Usability::from_code("d", Orientation::Horizontal),
            Some(Usability::SideB)
        );
        assert_eq!(Usability::from_code("d", Orientation::Vertical), None);
    }

    #[test]
    fn unit_steps_cover_collinear_runs_in_either_direction() {
        let steps = GridPoint::new(4, 2).unit_steps_to(GridPoint::new(1, 2)).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], (GridPoint::new(4, 2), GridPoint::new(3, 2)));
        assert!(GridPoint::new(1, 1).unit_steps_to(GridPoint::new(2, 2)).is_none());
    }

    #[test]
    fn keys_serialize_as_strings() {
        let face: FaceKey = "1_1|1_2|r".parse().unwrap();
        let json = serde_json::to_string(&face).unwrap();
        assert_eq!(json, "\"1_1|1_2|r\"");
        let back: FaceKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, face);
    }
}
