//! Splitting a branch length around a new ancestor.

use tracing::warn;

use crate::domain::error::DomainError;

/// Accepted difference between `top + bottom` and the original length.
pub const LENGTH_TOLERANCE: f64 = 1e-9;

/// Lengths of the two edges that replace one split edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLengths {
    /// parent -> new ancestor
    pub top: f64,
    /// new ancestor -> original child
    pub bottom: f64,
}

/// Split `original` into `top` and the remainder, or accept a forced bottom length.
///
/// A forced bottom length never fails; a mismatch is only reported, the
/// displayed lengths get fixed later with `halUpdateBranchLengths`.
pub fn resolve(
    original: f64,
    top: f64,
    forced_bottom: Option<f64>,
) -> Result<ResolvedLengths, DomainError> {
    match forced_bottom {
        None => {
            if top > original {
                return Err(DomainError::LengthOverflow { top, original });
            }
            Ok(ResolvedLengths {
                top,
                bottom: original - top,
            })
        }
        Some(bottom) => {
            warn!("forced bottom branch length in use: {}", bottom);
            if (top + bottom - original).abs() > LENGTH_TOLERANCE {
                warn!(
                    "{} (bottom) + {} (top) != {} (original branch length); \
                     run halUpdateBranchLengths after the update to fix the displayed tree",
                    bottom, top, original
                );
            }
            Ok(ResolvedLengths { top, bottom })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_top_within_original_when_resolving_then_bottom_is_remainder() {
        let lengths = resolve(10.0, 4.0, None).unwrap();
        assert_eq!(lengths.bottom, 6.0);
        assert_eq!(lengths.top, 4.0);
    }

    #[test]
    fn given_top_equal_to_original_when_resolving_then_bottom_is_zero() {
        assert_eq!(resolve(10.0, 10.0, None).unwrap().bottom, 0.0);
    }

    #[test]
    fn given_top_above_original_when_resolving_then_overflow() {
        assert_eq!(
            resolve(10.0, 12.0, None).unwrap_err(),
            DomainError::LengthOverflow {
                top: 12.0,
                original: 10.0
            }
        );
    }

    #[test]
    fn given_mismatched_override_when_resolving_then_accepts_verbatim() {
        let lengths = resolve(10.0, 4.0, Some(7.0)).unwrap();
        assert_eq!(lengths, ResolvedLengths { top: 4.0, bottom: 7.0 });
    }

    #[test]
    fn given_override_above_original_when_resolving_then_never_overflows() {
        let lengths = resolve(10.0, 12.0, Some(1.0)).unwrap();
        assert_eq!(lengths.top, 12.0);
        assert_eq!(lengths.bottom, 1.0);
    }

    #[test]
    fn given_matching_override_within_tolerance_when_resolving_then_uses_override() {
        let lengths = resolve(0.3, 0.1, Some(0.2)).unwrap();
        assert_eq!(lengths.bottom, 0.2);
    }
}
