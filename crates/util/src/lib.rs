//! Small helpers shared by the DSP crates.

/// Allocates a `[T; N]` filled with `value` directly on the heap, without building it on the
/// stack first.
pub fn boxed_array<T: Clone, const N: usize>(value: T) -> Box<[T; N]> {
    let boxed = vec![value; N].into_boxed_slice();
    match boxed.try_into() {
        Ok(array) => array,
        Err(_) => unreachable!("vec has exactly N elements"),
    }
}
