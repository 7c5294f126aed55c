//! Double buffer with swap-by-index.

/// Two values of the same type playing the roles "current" and "next".
///
/// [`swap`](Self::swap) exchanges the roles by flipping an index; the
/// buffers themselves never move and are never aliased, so a caller can
/// hold `&current` and `&mut next` at once through
/// [`split_mut`](Self::split_mut).
///
/// ```
/// use plume_field::DoubleBuffer;
///
/// let mut buf = DoubleBuffer::new(vec![1.0], vec![0.0]);
/// let (cur, next) = buf.split_mut();
/// next[0] = cur[0] * 2.0;
/// buf.swap();
/// assert_eq!(buf.current(), &vec![2.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DoubleBuffer<T> {
    buffers: [T; 2],
    front: usize,
}

impl<T> DoubleBuffer<T> {
    /// Create a buffer pair.
    pub fn new(current: T, next: T) -> Self {
        Self {
            buffers: [current, next],
            front: 0,
        }
    }

    /// The authoritative buffer.
    pub fn current(&self) -> &T {
        &self.buffers[self.front]
    }

    /// The buffer being written.
    pub fn next(&self) -> &T {
        &self.buffers[self.front ^ 1]
    }

    /// Mutable access to the authoritative buffer.
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.buffers[self.front]
    }

    /// Mutable access to the buffer being written.
    pub fn next_mut(&mut self) -> &mut T {
        &mut self.buffers[self.front ^ 1]
    }

    /// Read the current buffer while writing the next one.
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.buffers;
        if self.front == 0 {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Make "next" the authoritative buffer.
    pub fn swap(&mut self) {
        self.front ^= 1;
    }
}

impl<T: Clone> DoubleBuffer<T> {
    /// Both buffers initialised to `value`.
    pub fn filled(value: T) -> Self {
        Self::new(value.clone(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_exchanges_roles() {
        let mut buf = DoubleBuffer::new(1, 2);
        assert_eq!((*buf.current(), *buf.next()), (1, 2));
        buf.swap();
        assert_eq!((*buf.current(), *buf.next()), (2, 1));
        *buf.next_mut() = 7;
        buf.swap();
        assert_eq!(*buf.current(), 7);
    }

    #[test]
    fn split_follows_front() {
        let mut buf = DoubleBuffer::filled(0);
        *buf.current_mut() = 5;
        {
            let (cur, next) = buf.split_mut();
            *next = *cur + 1;
        }
        buf.swap();
        let (cur, next) = buf.split_mut();
        assert_eq!((*cur, *next), (6, 5));
    }
}
