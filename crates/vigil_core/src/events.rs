//! Input events
//!
//! Pointer and keyboard events as delivered by the platform, plus the small
//! geometry needed for content-boundary hit testing.

/// Event type identifier
pub type EventType = u32;

/// Common event types
pub mod event_types {
    use super::EventType;

    pub const POINTER_DOWN: EventType = 1;
    pub const POINTER_UP: EventType = 2;
    pub const KEY_DOWN: EventType = 20;
    pub const KEY_UP: EventType = 21;
}

/// A point in logical pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in logical pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            width,
            height,
        }
    }

    /// Check whether a point falls inside the rectangle (edges inclusive)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.height
    }
}

/// A UI event with associated data
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    pub data: EventData,
    /// Milliseconds on the engine clock
    pub timestamp: f64,
    pub propagation_stopped: bool,
}

/// Event-specific data
#[derive(Clone, Debug)]
pub enum EventData {
    Pointer { position: Point },
    Key { key: KeyCode },
}

/// Virtual key codes (platform-agnostic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const TAB: KeyCode = KeyCode(0x09);
    pub const ENTER: KeyCode = KeyCode(0x0D);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);

    // Unknown/unmapped key
    pub const UNKNOWN: KeyCode = KeyCode(0);

    /// Map a DOM-style key name onto a key code
    pub fn from_name(name: &str) -> KeyCode {
        match name.to_ascii_lowercase().as_str() {
            "escape" | "esc" => KeyCode::ESCAPE,
            "enter" | "return" => KeyCode::ENTER,
            "tab" => KeyCode::TAB,
            "space" | " " => KeyCode::SPACE,
            _ => KeyCode::UNKNOWN,
        }
    }
}

impl Event {
    pub fn pointer_down(position: Point, timestamp: f64) -> Self {
        Self {
            event_type: event_types::POINTER_DOWN,
            data: EventData::Pointer { position },
            timestamp,
            propagation_stopped: false,
        }
    }

    pub fn key_down(key: KeyCode, timestamp: f64) -> Self {
        Self {
            event_type: event_types::KEY_DOWN,
            data: EventData::Key { key },
            timestamp,
            propagation_stopped: false,
        }
    }

    /// Pointer position, if this is a pointer event
    pub fn position(&self) -> Option<Point> {
        match self.data {
            EventData::Pointer { position } => Some(position),
            EventData::Key { .. } => None,
        }
    }

    /// Key code, if this is a keyboard event
    pub fn key(&self) -> Option<KeyCode> {
        match self.data {
            EventData::Key { key } => Some(key),
            EventData::Pointer { .. } => None,
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_edges() {
        let rect = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(rect.contains(Point::new(110.0, 60.0)));
        assert!(rect.contains(Point::new(50.0, 30.0)));
        assert!(!rect.contains(Point::new(9.9, 30.0)));
        assert!(!rect.contains(Point::new(50.0, 60.1)));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(KeyCode::from_name("Escape"), KeyCode::ESCAPE);
        assert_eq!(KeyCode::from_name("esc"), KeyCode::ESCAPE);
        assert_eq!(KeyCode::from_name("F13"), KeyCode::UNKNOWN);
    }

    #[test]
    fn test_stop_propagation() {
        let mut event = Event::pointer_down(Point::new(1.0, 2.0), 0.0);
        assert!(!event.propagation_stopped);
        event.stop_propagation();
        assert!(event.propagation_stopped);
        assert_eq!(event.position(), Some(Point::new(1.0, 2.0)));
        assert_eq!(event.key(), None);
    }
}
