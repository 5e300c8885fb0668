//! Recursion skeleton shared by the three parsers: begin the struct, hand
//! the base layer to the transform, read this level's fields, end.

use crate::bonded::Bonded;
use crate::error::Result;
use crate::protocol::Reader;
use crate::schema::Schema;
use crate::transform::Transform;

/// Walk one struct level of `schema`.
///
/// `read_fields` reads this level's own fields; it receives `true` when the
/// transform already stopped inside the base layer and must then only skip.
/// `Transform::end` is called even after an early stop.
pub(crate) fn read_hierarchy<R, S, T, F>(reader: &mut R, schema: S, transform: &mut T, read_fields: F) -> Result<bool>
where
    R: Reader,
    S: Schema,
    T: Transform,
    F: FnOnce(&mut R, &mut T, bool) -> Result<bool>,
{
    transform.begin(schema.metadata())?;
    let mut done = false;
    if let Some(base) = schema.base() {
        let mut value = Bonded::new(&mut *reader, base, true);
        done = transform.base(&mut value)?;
        value.skip()?;
    }
    let done = read_fields(reader, transform, done)?;
    transform.end()?;
    Ok(done)
}
