//! Index types for mesh elements.
//!
//! Faces, vertices and UVs are addressed through distinct newtypes so a UV
//! index can never be passed where a vertex index is expected. All ids are
//! backed by `u32`, which matches the index width hosts store UV and face
//! components with.

use std::fmt::{self, Debug};

/// A type-safe vertex index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId(u32);

/// A type-safe polygon face index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId(u32);

/// A type-safe index into a UV set's coordinate arrays.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct UvId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            ///
            /// # Panics
            /// Panics in debug builds if the value does not fit in `u32`.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $display, self.0)
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(VertexId, "V");
impl_index_type!(FaceId, "F");
impl_index_type!(UvId, "UV");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uv_id() {
        let uv = UvId::new(42);
        assert_eq!(uv.index(), 42);
        assert_eq!(UvId::from(42), uv);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", VertexId::new(3)), "V(3)");
        assert_eq!(format!("{:?}", FaceId::new(7)), "F(7)");
        assert_eq!(format!("{:?}", UvId::new(0)), "UV(0)");
    }

    #[test]
    fn test_ordering() {
        let mut faces = vec![FaceId::new(2), FaceId::new(0), FaceId::new(1)];
        faces.sort();
        assert_eq!(faces, vec![FaceId::new(0), FaceId::new(1), FaceId::new(2)]);
    }
}
