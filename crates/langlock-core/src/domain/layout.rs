//! Keyboard layout handle value type.
//!
//! Windows identifies an installed input layout with an `HKL`, a
//! pointer-sized value whose low word is the language identifier (LANGID)
//! and whose high word names the physical layout or IME.  The locker never
//! interprets the value beyond equality, so it is carried as a plain `isize`.

use std::fmt;

/// Opaque identifier of an input layout (keyboard language).
///
/// [`LayoutHandle::NONE`] is the null sentinel: in a lock request it means
/// "whatever layout is active now", in a lock result it means "no lock".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayoutHandle(isize);

impl LayoutHandle {
    /// The null sentinel.
    pub const NONE: LayoutHandle = LayoutHandle(0);

    /// Wraps a raw handle value as received over the bridge or from the OS.
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub const fn raw(self) -> isize {
        self.0
    }

    /// Returns `true` for the null sentinel.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Converts the null sentinel to `None`.
    pub fn non_null(self) -> Option<Self> {
        (!self.is_none()).then_some(self)
    }

    /// Language identifier stored in the low word of the handle.
    ///
    /// `0x0409` is US English, `0x040C` French, `0x0419` Russian.
    pub const fn language_id(self) -> u16 {
        (self.0 as usize & 0xFFFF) as u16
    }
}

impl fmt::Display for LayoutHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0 as usize)
    }
}

impl From<isize> for LayoutHandle {
    fn from(raw: isize) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_null_sentinel() {
        assert!(LayoutHandle::NONE.is_none());
        assert_eq!(LayoutHandle::NONE.non_null(), None);
        assert_eq!(LayoutHandle::default(), LayoutHandle::NONE);
    }

    #[test]
    fn test_non_null_handle_round_trips_raw_value() {
        let hkl = LayoutHandle::from_raw(0x0409_0409);
        assert!(!hkl.is_none());
        assert_eq!(hkl.raw(), 0x0409_0409);
        assert_eq!(hkl.non_null(), Some(hkl));
    }

    #[test]
    fn test_language_id_is_low_word() {
        assert_eq!(LayoutHandle::from_raw(0xF002_0409).language_id(), 0x0409);
        assert_eq!(LayoutHandle::from_raw(0x040C_040C).language_id(), 0x040C);
    }

    #[test]
    fn test_display_is_hexadecimal() {
        assert_eq!(LayoutHandle::from_raw(0x0409_0409).to_string(), "0x04090409");
    }
}
