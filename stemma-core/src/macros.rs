//! Helper macros.

/// Build a [`Path`](crate::Path) from a comma-separated list of elements.
///
/// Elements may be index literals, bare slot names, or `(slot, index)`
/// pairs:
///
/// ```
/// use stemma_core::{path, Path, PathElem};
///
/// assert_eq!(path![], Path::new());
/// assert_eq!(path![1, 0], Path::from(vec![PathElem::index(1), PathElem::index(0)]));
/// assert_eq!(path![cond], Path::from(vec![PathElem::slot("cond")]));
/// assert_eq!(path![(body, 2), 0], Path::from(vec![PathElem::slot_index("body", 2), PathElem::index(0)]));
/// ```
#[macro_export]
macro_rules! path {
    () => { $crate::Path::new() };
    ($($elem:tt),+ $(,)?) => {
        $crate::Path::from(vec![$($crate::path_elem!($elem)),+])
    };
}

/// Build a single [`PathElem`](crate::PathElem). Used by [`path!`].
#[doc(hidden)]
#[macro_export]
macro_rules! path_elem {
    (($slot:ident, $idx:expr)) => {
        $crate::PathElem::slot_index(stringify!($slot), $idx)
    };
    ($idx:literal) => {
        $crate::PathElem::index($idx)
    };
    ($slot:ident) => {
        $crate::PathElem::slot(stringify!($slot))
    };
}
