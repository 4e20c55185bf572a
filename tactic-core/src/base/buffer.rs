//! Experience buffer interface.
use anyhow::Result;

/// Interface of buffers storing experiences pushed one by one.
pub trait ExperienceBufferBase {
    /// Items pushed into the buffer.
    type Item;

    /// Pushes an item into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// The number of items in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no item.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
