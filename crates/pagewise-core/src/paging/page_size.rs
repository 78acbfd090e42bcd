//! Validated page sizes.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Number of records per page; always a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageSize(NonZeroUsize);

impl PageSize {
    /// Create a page size, rejecting zero.
    pub fn new(size: usize) -> Result<Self> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or_else(|| Error::InvalidArgument("page size must be positive".into()))
    }

    /// The size as a plain integer.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for PageSize {
    type Error = Error;

    fn try_from(size: usize) -> Result<Self> {
        Self::new(size)
    }
}

impl TryFrom<u32> for PageSize {
    type Error = Error;

    fn try_from(size: u32) -> Result<Self> {
        Self::new(size as usize)
    }
}

impl TryFrom<i32> for PageSize {
    type Error = Error;

    fn try_from(size: i32) -> Result<Self> {
        Self::try_from(i64::from(size))
    }
}

impl TryFrom<i64> for PageSize {
    type Error = Error;

    fn try_from(size: i64) -> Result<Self> {
        let size = usize::try_from(size)
            .map_err(|_| Error::InvalidArgument(format!("page size {size} is negative")))?;
        Self::new(size)
    }
}

impl TryFrom<f64> for PageSize {
    type Error = Error;

    fn try_from(size: f64) -> Result<Self> {
        if !size.is_finite() || size.fract() != 0.0 || size < 0.0 || size > usize::MAX as f64 {
            return Err(Error::InvalidArgument(format!(
                "page size {size} is not a whole number"
            )));
        }
        Self::new(size as usize)
    }
}

impl FromStr for PageSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let size: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("page size '{s}' is not a number")))?;
        Self::try_from(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_sizes() {
        assert_eq!(PageSize::try_from(4usize).unwrap().get(), 4);
        assert_eq!(PageSize::try_from(4i32).unwrap().get(), 4);
        assert_eq!(PageSize::try_from(4i64).unwrap().get(), 4);
        assert_eq!(PageSize::try_from(4.0f64).unwrap().get(), 4);
        assert_eq!("4".parse::<PageSize>().unwrap().get(), 4);
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(PageSize::try_from(0usize), Err(Error::InvalidArgument(_))));
        assert!(matches!(PageSize::try_from(-1i32), Err(Error::InvalidArgument(_))));
        assert!(matches!(PageSize::try_from(1.5f64), Err(Error::InvalidArgument(_))));
        assert!(matches!(PageSize::try_from(f64::NAN), Err(Error::InvalidArgument(_))));
        assert!(matches!("invalid".parse::<PageSize>(), Err(Error::InvalidArgument(_))));
        assert!(matches!("-3".parse::<PageSize>(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(PageSize::new(25).unwrap().to_string(), "25");
    }
}
