use std::fmt;

/// Discriminant of an [`FfiValue`]. The numeric tags take part in call hashing
/// and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueKind {
    Int = 0,
    Float = 1,
    Double = 2,
    Bool = 3,
    String = 4,
    Opaque = 5,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::Double,
        ValueKind::Bool,
        ValueKind::String,
        ValueKind::Opaque,
    ];

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
            ValueKind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address of a foreign object owned by some bridge.
///
/// The engine never dereferences or frees it. Cloning a handle copies the
/// address, so two clones refer to the same foreign object and hash the same.
/// Bridges that need owned heap data must move it into a `String` payload or
/// keep it alive on their side for as long as cached values may refer to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpaqueHandle(usize);

impl OpaqueHandle {
    pub const NULL: OpaqueHandle = OpaqueHandle(0);

    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    pub const fn addr(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Value crossing a language boundary.
///
/// `Clone` deep-copies string payloads; every other variant is copied by value.
#[derive(Debug, Clone, PartialEq)]
pub enum FfiValue {
    Int(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    Opaque(OpaqueHandle),
}

impl FfiValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FfiValue::Int(_) => ValueKind::Int,
            FfiValue::Float(_) => ValueKind::Float,
            FfiValue::Double(_) => ValueKind::Double,
            FfiValue::Bool(_) => ValueKind::Bool,
            FfiValue::String(_) => ValueKind::String,
            FfiValue::Opaque(_) => ValueKind::Opaque,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FfiValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            FfiValue::Double(v) => Some(*v),
            FfiValue::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FfiValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FfiValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<OpaqueHandle> {
        match self {
            FfiValue::Opaque(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Bit-level identity: floats compare by bit pattern (so `NaN` matches
    /// itself), opaque handles by address.
    pub fn same_as(&self, other: &FfiValue) -> bool {
        match (self, other) {
            (FfiValue::Int(a), FfiValue::Int(b)) => a == b,
            (FfiValue::Float(a), FfiValue::Float(b)) => a.to_bits() == b.to_bits(),
            (FfiValue::Double(a), FfiValue::Double(b)) => a.to_bits() == b.to_bits(),
            (FfiValue::Bool(a), FfiValue::Bool(b)) => a == b,
            (FfiValue::String(a), FfiValue::String(b)) => a == b,
            (FfiValue::Opaque(a), FfiValue::Opaque(b)) => a == b,
            _ => false,
        }
    }

    /// Heap bytes owned by this value, not counting the enum itself.
    pub fn heap_size(&self) -> usize {
        match self {
            FfiValue::String(s) => s.capacity(),
            _ => 0,
        }
    }
}

impl fmt::Display for FfiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FfiValue::Int(v) => write!(f, "{v}"),
            FfiValue::Float(v) => write!(f, "{v}"),
            FfiValue::Double(v) => write!(f, "{v}"),
            FfiValue::Bool(v) => write!(f, "{v}"),
            FfiValue::String(s) => write!(f, "{s:?}"),
            FfiValue::Opaque(handle) => write!(f, "<opaque {handle}>"),
        }
    }
}

impl From<i64> for FfiValue {
    fn from(value: i64) -> Self {
        FfiValue::Int(value)
    }
}

impl From<i32> for FfiValue {
    fn from(value: i32) -> Self {
        FfiValue::Int(i64::from(value))
    }
}

impl From<f32> for FfiValue {
    fn from(value: f32) -> Self {
        FfiValue::Float(value)
    }
}

impl From<f64> for FfiValue {
    fn from(value: f64) -> Self {
        FfiValue::Double(value)
    }
}

impl From<bool> for FfiValue {
    fn from(value: bool) -> Self {
        FfiValue::Bool(value)
    }
}

impl From<&str> for FfiValue {
    fn from(value: &str) -> Self {
        FfiValue::String(value.to_string())
    }
}

impl From<String> for FfiValue {
    fn from(value: String) -> Self {
        FfiValue::String(value)
    }
}

impl From<OpaqueHandle> for FfiValue {
    fn from(value: OpaqueHandle) -> Self {
        FfiValue::Opaque(value)
    }
}
