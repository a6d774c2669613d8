//! Value Module
//!
//! Typed values stored under keys: Null, a single native scalar, or a
//! homogeneous list of one scalar kind.
//!
//! ## Encoding
//! ```text
//! Null:   ┌─────────┐
//!         │ Tag (2) │
//!         └─────────┘
//! Scalar: ┌─────────┬───────────────┐
//!         │ Tag (2) │ Element (w)   │
//!         └─────────┴───────────────┘
//! List:   ┌─────────┬───────────┬──────────────────┐
//!         │ Tag (2) │ Count (8) │ Elements (n * w) │
//!         └─────────┴───────────┴──────────────────┘
//! ```
//!
//! Fields use native byte order. A list tag is the scalar tag with the
//! list flag (bit 0) set, so the tag alone determines the payload length.
//!
//! ### Tags
//! - 0: null, 1: list flag
//! - 2/4/6/8: i8/i16/i32/i64
//! - 10/12/14/16: u8/u16/u32/u64
//! - 18/20: f32/f64

mod codec;
mod list;
mod text;

pub use codec::{
    decode, decode_kind, encode, encoded_len, size_of, COUNT_SIZE, LIST_HEADER_SIZE,
    NULL_ENCODED, TAG_SIZE,
};
pub use list::{pop_encoded, push_encoded, reduce_encoded, PushOutcome, Reduction};

use list::Element;

/// Bit OR'd into a scalar tag to mark a list
pub const LIST_FLAG: u16 = 1;

/// Tag of the Null value
pub const NULL_TAG: u16 = 0;

macro_rules! scalars {
    ($( $variant:ident($ty:ty) = $tag:literal ),* $(,)?) => {
        /// Native scalar kinds; the discriminant is the wire tag.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum ScalarKind {
            $( $variant = $tag, )*
        }

        impl ScalarKind {
            /// Every scalar kind in tag order
            pub const ALL: &'static [ScalarKind] = &[$( ScalarKind::$variant, )*];

            /// Scalar kind for a tag without the list flag
            pub fn from_tag(tag: u16) -> Option<Self> {
                match tag {
                    $( $tag => Some(ScalarKind::$variant), )*
                    _ => None,
                }
            }

            /// Wire tag
            pub fn tag(self) -> u16 {
                self as u16
            }

            /// Encoded width of one element
            pub const fn width(self) -> usize {
                match self {
                    $( ScalarKind::$variant => std::mem::size_of::<$ty>(), )*
                }
            }

            /// Rust type name, also used as the text suffix
            pub fn name(self) -> &'static str {
                match self {
                    $( ScalarKind::$variant => stringify!($ty), )*
                }
            }

            /// Additive identity of this kind
            pub fn zero(self) -> Scalar {
                match self {
                    $( ScalarKind::$variant => Scalar::$variant(<$ty as Element>::ZERO), )*
                }
            }
        }

        /// A single native number
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum Scalar {
            $( $variant($ty), )*
        }

        impl Scalar {
            pub fn kind(&self) -> ScalarKind {
                match self {
                    $( Scalar::$variant(_) => ScalarKind::$variant, )*
                }
            }

            pub(crate) fn extend_ne(&self, dest: &mut Vec<u8>) {
                match self {
                    $( Scalar::$variant(v) => dest.extend_from_slice(&v.to_ne_bytes()), )*
                }
            }

            pub(crate) fn read_ne(kind: ScalarKind, src: &[u8]) -> Option<Scalar> {
                match kind {
                    $(
                        ScalarKind::$variant => {
                            let mut raw = [0u8; std::mem::size_of::<$ty>()];
                            raw.copy_from_slice(src.get(..std::mem::size_of::<$ty>())?);
                            Some(Scalar::$variant(<$ty>::from_ne_bytes(raw)))
                        }
                    )*
                }
            }
        }

        /// A homogeneous list of one scalar kind
        #[derive(Debug, Clone, PartialEq)]
        pub enum List {
            $( $variant(Vec<$ty>), )*
        }

        impl List {
            /// Empty list of the given kind
            pub fn empty(kind: ScalarKind) -> List {
                match kind {
                    $( ScalarKind::$variant => List::$variant(Vec::new()), )*
                }
            }

            pub fn kind(&self) -> ScalarKind {
                match self {
                    $( List::$variant(_) => ScalarKind::$variant, )*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $( List::$variant(v) => v.len(), )*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn get(&self, index: usize) -> Option<Scalar> {
                match self {
                    $( List::$variant(v) => v.get(index).copied().map(Scalar::$variant), )*
                }
            }

            /// Elements as scalars
            pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
                (0..self.len()).filter_map(move |i| self.get(i))
            }

            /// Append `item` if it has this list's kind
            pub fn push(&mut self, item: Scalar) -> bool {
                match (self, item) {
                    $( (List::$variant(v), Scalar::$variant(x)) => {
                        v.push(x);
                        true
                    } )*
                    _ => false,
                }
            }

            /// Wrapping sum for integers, native-width sum for floats
            pub fn sum(&self) -> Scalar {
                match self {
                    $( List::$variant(v) => Scalar::$variant(list::sum(v)), )*
                }
            }

            /// Largest element, `None` when empty
            pub fn max(&self) -> Option<Scalar> {
                match self {
                    $( List::$variant(v) => list::max(v).map(Scalar::$variant), )*
                }
            }

            /// Smallest element, `None` when empty
            pub fn min(&self) -> Option<Scalar> {
                match self {
                    $( List::$variant(v) => list::min(v).map(Scalar::$variant), )*
                }
            }

            pub(crate) fn extend_ne(&self, dest: &mut Vec<u8>) {
                match self {
                    $( List::$variant(v) => {
                        for x in v {
                            dest.extend_from_slice(&x.to_ne_bytes());
                        }
                    } )*
                }
            }

            pub(crate) fn read_ne(kind: ScalarKind, count: usize, src: &[u8]) -> Option<List> {
                let bytes = src.get(..count.checked_mul(kind.width())?)?;
                match kind {
                    $(
                        ScalarKind::$variant => {
                            let items = bytes
                                .chunks_exact(std::mem::size_of::<$ty>())
                                .map(|chunk| {
                                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                                    raw.copy_from_slice(chunk);
                                    <$ty>::from_ne_bytes(raw)
                                })
                                .collect();
                            Some(List::$variant(items))
                        }
                    )*
                }
            }
        }

        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::$variant(v))
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::List(List::$variant(v))
                }
            }
        )*
    };
}

scalars! {
    I8(i8) = 2,
    I16(i16) = 4,
    I32(i32) = 6,
    I64(i64) = 8,
    U8(u8) = 10,
    U16(u16) = 12,
    U32(u32) = 14,
    U64(u64) = 16,
    F32(f32) = 18,
    F64(f64) = 20,
}

/// Kind of a value, as carried by its tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Scalar(ScalarKind),
    List(ScalarKind),
}

impl Kind {
    /// Parse a tag strictly; `None` for tags no value carries
    pub fn parse(tag: u16) -> Option<Kind> {
        if tag == NULL_TAG {
            return Some(Kind::Null);
        }
        let scalar = ScalarKind::from_tag(tag & !LIST_FLAG)?;
        if tag & LIST_FLAG != 0 {
            Some(Kind::List(scalar))
        } else {
            Some(Kind::Scalar(scalar))
        }
    }

    /// Parse a tag, mapping unknown tags to Null
    pub fn from_tag(tag: u16) -> Kind {
        Kind::parse(tag).unwrap_or(Kind::Null)
    }

    pub fn tag(self) -> u16 {
        match self {
            Kind::Null => NULL_TAG,
            Kind::Scalar(k) => k.tag(),
            Kind::List(k) => k.tag() | LIST_FLAG,
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, Kind::List(_))
    }

    /// Element kind for scalars and lists
    pub fn scalar(self) -> Option<ScalarKind> {
        match self {
            Kind::Null => None,
            Kind::Scalar(k) | Kind::List(k) => Some(k),
        }
    }
}

/// A typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Scalar(Scalar),
    List(List),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Scalar(s) => Kind::Scalar(s.kind()),
            Value::List(l) => Kind::List(l.kind()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Encode into a fresh buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(size_of(self));
        encode(self, &mut out);
        out
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}
