use nanoid::nanoid;
use uuid::Uuid;

/// Canonical alphabet for row identifiers (no ambiguous glyphs).
const ROW_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Default row id length.
const ROW_ID_LENGTH: usize = 20;

/// Generates a new row identifier for posts, likes, comments and follows.
pub fn generate_row_id() -> String {
    nanoid!(ROW_ID_LENGTH, ROW_ID_ALPHABET)
}

/// Generates an account identifier. Profiles share this id.
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}

/// Random opaque token used for sessions and stored object names.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}
