/// The exact length of a container identifier as the runtime names its state directories.
pub const CONTAINER_ID_LEN: usize = 64;

/// Returns true if the given name has the shape of a container identifier.
///
/// A container identifier is exactly [`CONTAINER_ID_LEN`] ASCII hex digits. Upper-case digits
/// are accepted; runtimes emit lower-case, but the state directory name is taken verbatim.
///
/// # Arguments
///
/// * `name` - A directory entry name to check.
pub fn is_container_id_shape(name: &str) -> bool {
    name.len() == CONTAINER_ID_LEN && is_non_empty_hex_string(name)
}

/// Returns true if the input string is not empty and contains only ASCII hex digits.
pub(super) fn is_non_empty_hex_string(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    s.bytes().all(|b| b.is_ascii_hexdigit())
}
