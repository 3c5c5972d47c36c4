//! # Str
//!
//! NUL-terminated byte strings in an arena, for names handed to the
//! graphics driver.

use crate::containers::Arr;
use crate::error::MemResult;
use crate::memory::{ArenaClass, ArenaRegistry};

/// A NUL-terminated UTF-8 string in an arena.
#[derive(Clone, Copy, Debug)]
pub struct Str {
    /// Text plus the trailing NUL.
    arr: Arr<u8>,
}

impl Str {
    /// Copies `text` into `class` and terminates it.
    pub fn new(registry: &mut ArenaRegistry, class: ArenaClass, text: &str) -> Self {
        Self::concat(registry, class, &[text])
    }

    /// Joins `parts` into one string: the total length is computed first,
    /// then every fragment is copied in place.
    ///
    /// ```rust
    /// use vkclicker_mem::{ArenaClass, ArenaRegistry, RegistryConfig, Str};
    ///
    /// let mut mem = ArenaRegistry::init(&RegistryConfig::default().with_frame_size(4096)).unwrap();
    /// let name = Str::concat(&mut mem, ArenaClass::Frame, &["shaders/", "quad", ".vert.spv"]);
    /// assert_eq!(name.as_str(&mem).unwrap(), "shaders/quad.vert.spv");
    /// ```
    pub fn concat(registry: &mut ArenaRegistry, class: ArenaClass, parts: &[&str]) -> Self {
        let len: usize = parts.iter().map(|p| p.len()).sum();
        let arr = Arr::new(registry, class, len + 1);
        let mut at = 0;
        for part in parts {
            arr.put(registry, at, part.as_bytes());
            at += part.len();
        }
        // Fresh allocations are zeroed, so the terminator is already in place.
        Self { arr }
    }

    /// Formats `value` in decimal.
    pub fn from_i32(registry: &mut ArenaRegistry, class: ArenaClass, value: i32) -> Self {
        let negative = value < 0;
        let mut magnitude = value.unsigned_abs();
        let mut digits = [0u8; 10];
        let mut n = 0;
        loop {
            digits[n] = b'0' + (magnitude % 10) as u8;
            n += 1;
            magnitude /= 10;
            if magnitude == 0 {
                break;
            }
        }

        let len = n + usize::from(negative);
        let arr = Arr::new(registry, class, len + 1);
        if negative {
            arr.set(registry, 0, b'-');
        }
        for (i, &digit) in digits[..n].iter().rev().enumerate() {
            arr.set(registry, len - n + i, digit);
        }
        Self { arr }
    }

    /// Length in bytes, without the terminator.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.arr.len() - 1
    }

    /// Returns true if the string has no text.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The text bytes, without the terminator.
    #[must_use]
    pub fn as_bytes<'a>(&self, registry: &'a ArenaRegistry) -> &'a [u8] {
        &self.arr.as_bytes(registry)[..self.len()]
    }

    /// The text bytes followed by the terminator.
    #[must_use]
    pub fn as_bytes_with_nul<'a>(&self, registry: &'a ArenaRegistry) -> &'a [u8] {
        self.arr.as_bytes(registry)
    }

    /// The text as `&str`.
    ///
    /// # Errors
    ///
    /// Returns [`MemError::InvalidUtf8`](crate::MemError::InvalidUtf8) if the
    /// bytes were overwritten with invalid UTF-8 through [`Self::arr`].
    pub fn as_str<'a>(&self, registry: &'a ArenaRegistry) -> MemResult<&'a str> {
        Ok(std::str::from_utf8(self.as_bytes(registry))?)
    }

    /// The underlying bytes, terminator included.
    #[must_use]
    pub const fn arr(&self) -> Arr<u8> {
        self.arr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::error::MemError;

    fn registry() -> ArenaRegistry {
        let config = RegistryConfig::default()
            .with_scratch_size(512)
            .with_frame_size(512)
            .with_long_lived(1, 512);
        ArenaRegistry::init(&config).unwrap()
    }

    #[test]
    fn test_literal_is_terminated() {
        let mut mem = registry();
        let s = Str::new(&mut mem, ArenaClass::Frame, "VK_LAYER_KHRONOS_validation");
        assert_eq!(s.len(), 27);
        assert_eq!(s.as_str(&mem).unwrap(), "VK_LAYER_KHRONOS_validation");
        assert_eq!(s.as_bytes_with_nul(&mem).last(), Some(&0));
    }

    #[test]
    fn test_concat_fragments() {
        let mut mem = registry();
        let s = Str::concat(&mut mem, ArenaClass::Frame, &["frame ", "", "42", "/", "60"]);
        assert_eq!(s.as_str(&mem).unwrap(), "frame 42/60");
        assert_eq!(s.arr().len(), 12);
    }

    #[test]
    fn test_empty_string() {
        let mut mem = registry();
        let s = Str::new(&mut mem, ArenaClass::Frame, "");
        assert!(s.is_empty());
        assert_eq!(s.as_bytes_with_nul(&mem), &[0]);
    }

    #[test]
    fn test_from_i32() {
        let mut mem = registry();
        for (value, text) in [
            (0, "0"),
            (7, "7"),
            (-15, "-15"),
            (2_147_483_647, "2147483647"),
            (i32::MIN, "-2147483648"),
        ] {
            let s = Str::from_i32(&mut mem, ArenaClass::Frame, value);
            assert_eq!(s.as_str(&mem).unwrap(), text);
        }
    }

    #[test]
    fn test_invalid_utf8_is_reported() {
        let mut mem = registry();
        let s = Str::new(&mut mem, ArenaClass::Frame, "ab");
        s.arr().set(&mut mem, 0, 0xFF);
        assert!(matches!(s.as_str(&mem), Err(MemError::InvalidUtf8(_))));
    }
}
