use std::fmt;
use std::io::Read;
use std::ops::ControlFlow;

use serde::de::{Deserializer as _, SeqAccess, Visitor};
use serde_json::Value;

/// Visit each element of a top-level JSON array without loading the whole
/// document. Returns the number of elements visited.
///
/// Elements handed to `visit` before a syntax error are not rolled back.
/// Breaking out of `visit` stops reading; the resulting error is then the
/// caller's to ignore.
pub fn for_each_array_item<R, F>(reader: R, mut visit: F) -> Result<u64, serde_json::Error>
where
    R: Read,
    F: FnMut(Value) -> ControlFlow<()>,
{
    let mut de = serde_json::Deserializer::from_reader(reader);
    let count = (&mut de).deserialize_seq(ItemVisitor { visit: &mut visit })?;
    de.end()?;
    Ok(count)
}

struct ItemVisitor<'f, F> {
    visit: &'f mut F,
}

impl<'de, F> Visitor<'de> for ItemVisitor<'_, F>
where
    F: FnMut(Value) -> ControlFlow<()>,
{
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON array")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<u64, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut count = 0;
        while let Some(item) = seq.next_element::<Value>()? {
            count += 1;
            if (self.visit)(item).is_break() {
                break;
            }
        }
        Ok(count)
    }
}
