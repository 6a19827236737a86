use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use super::Bitmap;

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.cardinality() < 32 {
            write!(f, "Bitmap<{:?}>", self.to_vec())
        } else {
            write!(
                f,
                "Bitmap<{:?} values between {:?} and {:?}>",
                self.cardinality(),
                self.minimum().unwrap(),
                self.maximum().unwrap()
            )
        }
    }
}

/// Equality is on contents, not on representation: a run-optimized bitmap
/// equals its unoptimized form.
impl PartialEq for Bitmap {
    #[inline]
    fn eq(&self, other: &Bitmap) -> bool {
        self.index == other.index
    }
}

impl Eq for Bitmap {}

impl Clone for Bitmap {
    /// Create a copy of a Bitmap
    ///
    /// If the copy-on-write flag is set, the copy shares container storage
    /// with the original until one of them is mutated.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::new();
    /// bitmap1.add(11);
    ///
    /// let bitmap2 = bitmap1.clone();
    ///
    /// assert_eq!(bitmap1, bitmap2);
    /// ```
    fn clone(&self) -> Bitmap {
        let index = if self.copy_on_write {
            self.index.clone()
        } else {
            self.index.deep_clone()
        };
        Bitmap {
            index,
            copy_on_write: self.copy_on_write,
        }
    }
}

impl BitAnd for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.and`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[1]);
    /// let bitmap2 = Bitmap::of(&[1, 2]);
    ///
    /// let bitmap3 = bitmap1 & bitmap2;
    ///
    /// assert!(bitmap3.contains(1));
    /// assert!(!bitmap3.contains(2));
    /// ```
    #[inline]
    fn bitand(self, other: Bitmap) -> Bitmap {
        self.and(&other)
    }
}

impl<'a> BitAnd<&'a Bitmap> for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.and`
    #[inline]
    fn bitand(self, other: &'a Bitmap) -> Bitmap {
        self.and(other)
    }
}

impl<'a, 'b> BitAnd<&'a Bitmap> for &'b Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.and`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[1]);
    /// let bitmap2 = Bitmap::of(&[1, 2]);
    ///
    /// let bitmap3 = &bitmap1 & &bitmap2;
    ///
    /// assert!(bitmap3.contains(1));
    /// assert!(!bitmap3.contains(2));
    /// ```
    #[inline]
    fn bitand(self, other: &'a Bitmap) -> Bitmap {
        self.and(other)
    }
}

impl BitAndAssign for Bitmap {
    /// Syntactic sugar for `.and_inplace`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15]);
    /// bitmap1 &= Bitmap::of(&[25]);
    ///
    /// assert!(bitmap1.is_empty());
    ///
    /// let mut bitmap2 = Bitmap::of(&[15]);
    /// bitmap2 &= Bitmap::of(&[15, 25]);
    ///
    /// assert_eq!(bitmap2.to_vec(), [15]);
    /// ```
    #[inline]
    fn bitand_assign(&mut self, other: Bitmap) {
        self.and_inplace(&other);
    }
}

impl BitOr for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.or`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap3 = Bitmap::of(&[15]) | Bitmap::of(&[25]);
    ///
    /// assert!(bitmap3.cardinality() == 2);
    /// assert!(bitmap3.contains(15));
    /// assert!(bitmap3.contains(25));
    /// ```
    #[inline]
    fn bitor(self, other: Bitmap) -> Bitmap {
        self.or(&other)
    }
}

impl<'a> BitOr<&'a Bitmap> for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.or`
    #[inline]
    fn bitor(self, other: &'a Bitmap) -> Bitmap {
        self.or(other)
    }
}

impl<'a, 'b> BitOr<&'a Bitmap> for &'b Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.or`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// let bitmap3 = &bitmap1 | &bitmap2;
    ///
    /// assert_eq!(bitmap3.to_vec(), [15, 25]);
    /// ```
    #[inline]
    fn bitor(self, other: &'a Bitmap) -> Bitmap {
        self.or(other)
    }
}

impl BitOrAssign for Bitmap {
    /// Syntactic sugar for `.or_inplace`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15]);
    /// bitmap1 |= Bitmap::of(&[25]);
    ///
    /// assert_eq!(bitmap1.to_vec(), [15, 25]);
    /// ```
    #[inline]
    fn bitor_assign(&mut self, other: Bitmap) {
        self.or_inplace(&other);
    }
}

impl BitXor for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.xor`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap3 = Bitmap::of(&[15, 25]) ^ Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap3.to_vec(), [15, 35]);
    /// ```
    #[inline]
    fn bitxor(self, other: Bitmap) -> Bitmap {
        self.xor(&other)
    }
}

impl<'a> BitXor<&'a Bitmap> for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.xor`
    #[inline]
    fn bitxor(self, other: &'a Bitmap) -> Bitmap {
        self.xor(other)
    }
}

impl<'a, 'b> BitXor<&'a Bitmap> for &'b Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.xor`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = &bitmap1 ^ &bitmap2;
    ///
    /// assert_eq!(bitmap3.to_vec(), [15, 35]);
    /// ```
    #[inline]
    fn bitxor(self, other: &'a Bitmap) -> Bitmap {
        self.xor(other)
    }
}

impl BitXorAssign for Bitmap {
    /// Syntactic sugar for `.xor_inplace`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15, 25]);
    /// bitmap1 ^= Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap1.to_vec(), [15, 35]);
    /// ```
    #[inline]
    fn bitxor_assign(&mut self, other: Bitmap) {
        self.xor_inplace(&other);
    }
}

impl Sub for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.andnot`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap3 = Bitmap::of(&[15, 25]) - Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap3.to_vec(), [15]);
    /// ```
    #[inline]
    fn sub(self, other: Bitmap) -> Bitmap {
        self.andnot(&other)
    }
}

impl<'a> Sub<&'a Bitmap> for Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.andnot`
    #[inline]
    fn sub(self, other: &'a Bitmap) -> Bitmap {
        self.andnot(other)
    }
}

impl<'a, 'b> Sub<&'a Bitmap> for &'b Bitmap {
    type Output = Bitmap;

    /// Syntactic sugar for `.andnot`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = &bitmap1 - &bitmap2;
    ///
    /// assert_eq!(bitmap3.to_vec(), [15]);
    /// ```
    #[inline]
    fn sub(self, other: &'a Bitmap) -> Bitmap {
        self.andnot(other)
    }
}

impl SubAssign for Bitmap {
    /// Syntactic sugar for `.andnot_inplace`
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::of(&[15, 25]);
    /// bitmap1 -= Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap1.to_vec(), [15]);
    /// ```
    #[inline]
    fn sub_assign(&mut self, other: Bitmap) {
        self.andnot_inplace(&other);
    }
}
