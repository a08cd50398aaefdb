//! Walk a buffer holding several storage copies back to back.

use crate::core::Result;
use crate::view::View;

/// Iterator over concatenated storage copies.
///
/// Each storage declares its own size through its metadata, so copies of
/// different stores can be mixed. Construction walks the whole buffer once
/// and fails if the declared sizes do not add up to its length. A short
/// final storage is reported as `Truncated` with the size its metadata
/// declares.
#[derive(Debug, Clone)]
pub struct ViewIterator<'a> {
    views: std::vec::IntoIter<View<'a>>,
}

impl<'a> ViewIterator<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut views = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let mut view = View::new();
            pos += view.bind_storage_prefix(&data[pos..])?;
            views.push(view);
        }
        Ok(Self {
            views: views.into_iter(),
        })
    }
}

impl<'a> Iterator for ViewIterator<'a> {
    type Item = View<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.views.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.views.size_hint()
    }
}

impl ExactSizeIterator for ViewIterator<'_> {}
