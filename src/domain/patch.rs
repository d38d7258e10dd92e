//! Newick fragments describing one topology edit.

use itertools::Itertools;

use crate::domain::arena::format_length;

/// Build a patch `(c1:w1,c2:w2)target[:top][;]`.
///
/// `top_weight` is None when the target's own upstream edge is untouched by
/// the edit. Only a root-level patch is terminated. A child name may itself
/// be a non-terminated patch, which is how a branch split nests its bottom
/// half inside the top half.
pub fn build_patch<S: AsRef<str>>(
    target: &str,
    top_weight: Option<f64>,
    children: &[(S, f64)],
    terminate: bool,
) -> String {
    let mut patch = format!(
        "({}){}",
        children
            .iter()
            .map(|(name, weight)| format!("{}:{}", name.as_ref(), format_length(*weight)))
            .join(","),
        target
    );
    if let Some(top) = top_weight {
        patch.push(':');
        patch.push_str(&format_length(top));
    }
    if terminate {
        patch.push(';');
    }
    patch
}
