//! Shape records and the closed type/color sets they are built from.
//!
//! `ShapeStyle` is the editable part of a shape, `ShapeSpec` adds the position
//! fixed at creation, and `Shape` is the registry record with identity and owner.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Server-assigned actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActorId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ActorId)
    }
}

/// Server-assigned shape identifier, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub u64);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShapeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ShapeId)
    }
}

/// Kind of shape a client can draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Circle,
    Triangle,
    Rectangle,
}

impl ShapeType {
    pub const ALL: [ShapeType; 3] = [ShapeType::Circle, ShapeType::Triangle, ShapeType::Rectangle];

    /// Wire name
    pub fn name(self) -> &'static str {
        match self {
            ShapeType::Circle => "Circle",
            ShapeType::Triangle => "Triangle",
            ShapeType::Rectangle => "Rectangle",
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Circle" => Ok(ShapeType::Circle),
            "Triangle" => Ok(ShapeType::Triangle),
            "Rectangle" => Ok(ShapeType::Rectangle),
            other => Err(ValidationError::UnknownShapeType(other.to_string())),
        }
    }
}

/// Fill color palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeColor {
    Black,
    Red,
    Green,
    Blue,
}

impl ShapeColor {
    pub const ALL: [ShapeColor; 4] = [
        ShapeColor::Black,
        ShapeColor::Red,
        ShapeColor::Green,
        ShapeColor::Blue,
    ];

    /// Wire name
    pub fn name(self) -> &'static str {
        match self {
            ShapeColor::Black => "Black",
            ShapeColor::Red => "Red",
            ShapeColor::Green => "Green",
            ShapeColor::Blue => "Blue",
        }
    }
}

impl fmt::Display for ShapeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeColor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Black" => Ok(ShapeColor::Black),
            "Red" => Ok(ShapeColor::Red),
            "Green" => Ok(ShapeColor::Green),
            "Blue" => Ok(ShapeColor::Blue),
            other => Err(ValidationError::UnknownColor(other.to_string())),
        }
    }
}

/// A position on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Bounds every accepted shape must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasLimits {
    /// Inclusive range for width and height
    pub dimensions: RangeInclusive<i32>,
    /// Largest x coordinate (inclusive, smallest is 0)
    pub width: i32,
    /// Largest y coordinate (inclusive, smallest is 0)
    pub height: i32,
}

impl Default for CanvasLimits {
    fn default() -> Self {
        Self {
            dimensions: 10..=100,
            width: 400,
            height: 400,
        }
    }
}

impl CanvasLimits {
    pub fn check_style(&self, style: &ShapeStyle) -> Result<(), ValidationError> {
        for value in [style.width, style.height] {
            if !self.dimensions.contains(&value) {
                return Err(ValidationError::DimensionOutOfRange {
                    value,
                    min: *self.dimensions.start(),
                    max: *self.dimensions.end(),
                });
            }
        }
        Ok(())
    }

    pub fn check_position(&self, pos: Position) -> Result<(), ValidationError> {
        if (0..=self.width).contains(&pos.x) && (0..=self.height).contains(&pos.y) {
            Ok(())
        } else {
            Err(ValidationError::OutsideCanvas { x: pos.x, y: pos.y })
        }
    }
}

/// The replaceable part of a shape (everything `edit` may change)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub kind: ShapeType,
    pub color: ShapeColor,
    pub width: i32,
    pub height: i32,
}

impl ShapeStyle {
    pub fn new(kind: ShapeType, color: ShapeColor, width: i32, height: i32) -> Self {
        Self {
            kind,
            color,
            width,
            height,
        }
    }
}

/// Everything a client supplies to create a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeSpec {
    pub style: ShapeStyle,
    pub position: Position,
}

impl ShapeSpec {
    pub fn new(style: ShapeStyle, position: Position) -> Self {
        Self { style, position }
    }

    pub fn validate(&self, limits: &CanvasLimits) -> Result<(), ValidationError> {
        limits.check_style(&self.style)?;
        limits.check_position(self.position)
    }
}

/// A shape record as held by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub owner: ActorId,
    pub style: ShapeStyle,
    pub position: Position,
    /// Transient marker highlight, never persisted
    #[serde(default, skip_serializing)]
    pub highlighted: bool,
}

impl Shape {
    pub fn new(id: ShapeId, owner: ActorId, spec: ShapeSpec) -> Self {
        Self {
            id,
            owner,
            style: spec.style,
            position: spec.position,
            highlighted: false,
        }
    }

    /// Frozen copy suitable for a snapshot
    pub fn detached(&self) -> Self {
        Self {
            highlighted: false,
            ..self.clone()
        }
    }

    /// `<Type> <Color> <W> <H> <X> <Y>`
    pub fn data(&self) -> ShapeData<'_> {
        ShapeData(self)
    }

    /// `<id>:<owner>:<Type> <Color> <W> <H> <X> <Y>`
    pub fn record(&self) -> ShapeRecord<'_> {
        ShapeRecord(self)
    }
}

/// Display adapter for the `<shapeData>` grammar
pub struct ShapeData<'a>(&'a Shape);

impl fmt::Display for ShapeData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        write!(
            f,
            "{} {} {} {} {} {}",
            s.style.kind, s.style.color, s.style.width, s.style.height, s.position.x, s.position.y
        )
    }
}

/// Display adapter for `<shapeId>:<ownerId>:<shapeData>`
pub struct ShapeRecord<'a>(&'a Shape);

impl fmt::Display for ShapeRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.0.id, self.0.owner, self.0.data())
    }
}

/// Parse `<Type> <Color> <W> <H> <X> <Y>` into a spec (bounds are not checked here)
pub fn parse_shape_data(s: &str) -> Result<ShapeSpec, ValidationError> {
    let fields: Vec<&str> = s.split_whitespace().collect();
    let [kind, color, w, h, x, y] = fields.as_slice() else {
        return Err(ValidationError::FieldCount {
            expected: 6,
            found: fields.len(),
        });
    };
    let style = ShapeStyle::new(kind.parse()?, color.parse()?, parse_int(w)?, parse_int(h)?);
    Ok(ShapeSpec::new(style, Position::new(parse_int(x)?, parse_int(y)?)))
}

/// Parse a `<shapeId>:<ownerId>:<shapeData>` record
pub fn parse_shape_record(s: &str) -> Result<Shape, ValidationError> {
    let mut parts = s.splitn(3, ':');
    let (Some(id), Some(owner), Some(data)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::MalformedRecord(s.to_string()));
    };
    let id: ShapeId = id
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber(id.to_string()))?;
    let owner: ActorId = owner
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber(owner.to_string()))?;
    Ok(Shape::new(id, owner, parse_shape_data(data)?))
}

pub(crate) fn parse_int(s: &str) -> Result<i32, ValidationError> {
    s.parse()
        .map_err(|_| ValidationError::NotANumber(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle() -> Shape {
        let style = ShapeStyle::new(ShapeType::Circle, ShapeColor::Black, 50, 50);
        Shape::new(ShapeId(1), ActorId(1), ShapeSpec::new(style, Position::new(10, 10)))
    }

    #[test]
    fn test_record_format() {
        assert_eq!(circle().record().to_string(), "1:1:Circle Black 50 50 10 10");
    }

    #[test]
    fn test_parse_record() {
        let shape = parse_shape_record("7:3:Triangle Blue 75 25 100 100").unwrap();
        assert_eq!(shape.id, ShapeId(7));
        assert_eq!(shape.owner, ActorId(3));
        assert_eq!(shape.style.kind, ShapeType::Triangle);
        assert_eq!(shape.style.color, ShapeColor::Blue);
        assert_eq!(shape.position, Position::new(100, 100));
        assert!(!shape.highlighted);
    }

    #[test]
    fn test_unknown_color_is_rejected() {
        let err = parse_shape_data("Circle Purple 50 50 10 10").unwrap_err();
        assert_eq!(err, ValidationError::UnknownColor("Purple".into()));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!("circle".parse::<ShapeType>().is_err());
        assert!("BLACK".parse::<ShapeColor>().is_err());
    }

    #[test]
    fn test_wrong_field_count() {
        assert!(matches!(
            parse_shape_data("Circle Black 50 50 10"),
            Err(ValidationError::FieldCount { expected: 6, found: 5 })
        ));
    }

    #[test]
    fn test_limits() {
        let limits = CanvasLimits::default();
        let mut spec = ShapeSpec::new(
            ShapeStyle::new(ShapeType::Rectangle, ShapeColor::Red, 10, 100),
            Position::new(0, 400),
        );
        assert!(spec.validate(&limits).is_ok());

        spec.style.width = 9;
        assert!(matches!(
            spec.validate(&limits),
            Err(ValidationError::DimensionOutOfRange { value: 9, .. })
        ));

        spec.style.width = 50;
        spec.position = Position::new(-1, 10);
        assert!(matches!(
            spec.validate(&limits),
            Err(ValidationError::OutsideCanvas { x: -1, y: 10 })
        ));
    }

    #[test]
    fn test_detached_clears_highlight() {
        let mut shape = circle();
        shape.highlighted = true;
        let copy = shape.detached();
        assert!(!copy.highlighted);
        assert_eq!(copy.id, shape.id);
    }
}
