//! The chunk list underlying [`super::Buffer`].
//!
//! Bytes are accumulated into fixed-size `Box<[u8]>` chunks rather than one
//! growable `Vec<u8>`: an explicit chunk list plus a `(current, position)`
//! cursor avoids the realloc-and-copy spikes a single growable buffer hits
//! once it must double past its initial capacity, and chunks are never
//! shared across buffers.

use crate::error::{Error, Result};

/// An ordered list of fixed-size byte chunks with a cursor pointing at the
/// next free byte.
#[derive(Debug, Clone)]
pub struct ChunkList {
    chunks: Vec<Box<[u8]>>,
    /// Bytes actually written into each chunk at index `i` before the
    /// cursor rolled past it. Only entries below `current_chunk_index` are
    /// meaningful; the current chunk's valid length is `position`.
    filled_lengths: Vec<usize>,
    chunk_size: usize,
    current_chunk_index: usize,
    position: usize,
    length: usize,
}

/// A checkpoint capturing the cursor at the start of a row, so
/// [`ChunkList::restore`] can cheaply rewind a cancelled row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub chunk_index: usize,
    pub position: usize,
    pub length: usize,
}

impl ChunkList {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunks: vec![vec![0u8; chunk_size].into_boxed_slice()],
            filled_lengths: vec![0],
            chunk_size,
            current_chunk_index: 0,
            position: 0,
            length: 0,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            chunk_index: self.current_chunk_index,
            position: self.position,
            length: self.length,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.current_chunk_index = checkpoint.chunk_index;
        self.position = checkpoint.position;
        self.length = checkpoint.length;
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn row_remaining_in_current_chunk(&self) -> usize {
        self.chunk_size - self.position
    }

    /// Appends `bytes` to the buffer, rolling to a new (or reused) chunk if
    /// `bytes` doesn't fit in the remainder of the current one. A single
    /// value must fit within one chunk, otherwise `Err` is returned and
    /// nothing is written.
    pub fn put(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.chunk_size {
            return Err(Error::invalid_api_call(format!(
                "value of {} bytes exceeds the chunk capacity of {} bytes \
                 (increase init_buf_size)",
                bytes.len(),
                self.chunk_size
            )));
        }

        if bytes.len() > self.row_remaining_in_current_chunk() {
            self.roll_to_next_chunk();
        }

        let chunk = &mut self.chunks[self.current_chunk_index];
        chunk[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        self.length += bytes.len();
        Ok(())
    }

    fn roll_to_next_chunk(&mut self) {
        self.filled_lengths[self.current_chunk_index] = self.position;
        self.current_chunk_index += 1;
        if self.current_chunk_index == self.chunks.len() {
            tracing::trace!(
                chunk_index = self.current_chunk_index,
                "allocating new buffer chunk"
            );
            self.chunks
                .push(vec![0u8; self.chunk_size].into_boxed_slice());
            self.filled_lengths.push(0);
        }
        self.position = 0;
    }

    pub fn clear(&mut self) {
        self.current_chunk_index = 0;
        self.position = 0;
        self.length = 0;
    }

    /// Drops chunks beyond the current cursor. Never fails.
    pub fn trim_excess(&mut self) {
        self.chunks.truncate(self.current_chunk_index + 1);
        self.filled_lengths.truncate(self.current_chunk_index + 1);
    }

    /// Bytes belonging to chunk `i`: the length it was actually filled to
    /// when the cursor rolled past it, for every index before the cursor;
    /// just `position` bytes for the chunk the cursor currently sits in.
    /// A chunk is never full to its declared `chunk_size` in general — a
    /// value that doesn't fit in the remainder rolls to the next chunk
    /// rather than splitting across the boundary, so trailing bytes past
    /// `position` at roll time are never written and must not be emitted.
    pub fn chunk_bytes(&self, i: usize) -> &[u8] {
        if i == self.current_chunk_index {
            &self.chunks[i][..self.position]
        } else {
            &self.chunks[i][..self.filled_lengths[i]]
        }
    }

    pub fn chunk_count_to_write(&self) -> usize {
        self.current_chunk_index + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_accumulates_within_a_chunk() {
        let mut c = ChunkList::new(16);
        c.put(b"hello").unwrap();
        c.put(b"world").unwrap();
        assert_eq!(c.length(), 10);
        assert_eq!(c.chunk_count_to_write(), 1);
        assert_eq!(c.chunk_bytes(0), b"helloworld");
    }

    #[test]
    fn put_rolls_to_a_new_chunk_when_full() {
        let mut c = ChunkList::new(4);
        c.put(b"ab").unwrap();
        c.put(b"cd").unwrap(); // fills chunk 0 exactly
        c.put(b"ef").unwrap(); // must roll
        assert_eq!(c.chunk_count_to_write(), 2);
        assert_eq!(c.chunk_bytes(0), b"abcd");
        assert_eq!(c.chunk_bytes(1), b"ef");
    }

    #[test]
    fn oversized_value_is_rejected() {
        let mut c = ChunkList::new(4);
        assert!(c.put(b"12345").is_err());
    }

    #[test]
    fn checkpoint_and_restore_rewind_exactly() {
        let mut c = ChunkList::new(4);
        c.put(b"ab").unwrap();
        let checkpoint = c.checkpoint();
        c.put(b"cd").unwrap();
        c.put(b"ef").unwrap();
        assert_eq!(c.length(), 6);
        c.restore(checkpoint);
        assert_eq!(c.length(), 2);
        assert_eq!(c.chunk_bytes(0), b"ab");
    }

    #[test]
    fn clear_resets_to_a_fresh_state() {
        let mut c = ChunkList::new(4);
        c.put(b"ab").unwrap();
        c.put(b"cdef").unwrap();
        c.clear();
        assert_eq!(c.length(), 0);
        assert_eq!(c.chunk_count_to_write(), 1);
    }

    #[test]
    fn trim_excess_drops_chunks_beyond_the_cursor() {
        let mut c = ChunkList::new(4);
        c.put(b"ab").unwrap();
        c.put(b"cdef").unwrap();
        c.put(b"gh").unwrap();
        assert_eq!(c.chunks.len(), 2);
        c.trim_excess();
        assert_eq!(c.chunks.len(), 2);
    }

    #[test]
    fn chunk_bytes_excludes_the_unwritten_tail_of_a_chunk_a_value_rolled_out_of() {
        // A value that doesn't fit in the remainder of the current chunk
        // rolls to the next chunk whole rather than splitting across the
        // boundary, so the chunk it rolled out of is left filled only to
        // its last `position` — `chunk_bytes` must return exactly that
        // prefix, not the chunk's full declared size.
        let mut c = ChunkList::new(16);
        c.put(b"weather n=1i\n").unwrap(); // 13 bytes, fits in chunk 0
        c.put(b"weather").unwrap(); // 7 bytes, doesn't fit in the remaining 3: rolls
        assert_eq!(c.chunk_count_to_write(), 2);
        assert_eq!(c.chunk_bytes(0), b"weather n=1i\n");
        assert_eq!(c.chunk_bytes(1), b"weather");
    }

    #[test]
    fn reused_chunk_is_not_reallocated_after_clear() {
        let mut c = ChunkList::new(4);
        c.put(b"abcd").unwrap();
        c.put(b"ef").unwrap();
        assert_eq!(c.chunks.len(), 2);
        c.clear();
        c.put(b"abcd").unwrap();
        c.put(b"gh").unwrap();
        // the second chunk from before `clear` is reused, not reallocated
        assert_eq!(c.chunks.len(), 2);
    }
}
