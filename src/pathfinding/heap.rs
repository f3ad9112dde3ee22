use std::cmp::Ordering;

const DEFAULT_CAPACITY: usize = 25;

/// Position of an item inside a [`MinHeap`].
///
/// A handle stays valid until the heap is next mutated; [`MinHeap::find`]
/// hands out a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapHandle(usize);

#[derive(Debug)]
struct HeapItem<T> {
    value: T,
    index: usize,
}

/// Binary min-heap that supports in-place key updates.
///
/// Ordering comes from the comparator passed at construction, so the same
/// heap serves any open-set entry shape.
pub struct MinHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    items: Vec<HeapItem<T>>,
    compare: F,
}

impl<T, F> MinHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    pub fn new(compare: F) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, compare)
    }

    pub fn with_capacity(capacity: usize, compare: F) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            compare,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first().map(|item| &item.value)
    }

    pub fn push(&mut self, value: T) -> HeapHandle {
        let index = self.items.len();
        self.items.push(HeapItem { value, index });
        HeapHandle(self.sift_up(index))
    }

    /// Removes the smallest item: swap with the last, pop, then sift down.
    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.swap(0, last);
        let item = self.items.pop()?;
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        Some(item.value)
    }

    /// Linear scan for the first item matching `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<HeapHandle> {
        self.items
            .iter()
            .find(|item| predicate(&item.value))
            .map(|item| HeapHandle(item.index))
    }

    pub fn get(&self, handle: HeapHandle) -> Option<&T> {
        self.items.get(handle.0).map(|item| &item.value)
    }

    pub fn get_mut(&mut self, handle: HeapHandle) -> Option<&mut T> {
        self.items.get_mut(handle.0).map(|item| &mut item.value)
    }

    /// Restores heap order after the item behind `handle` had its key
    /// decreased. Increasing a key through this call is not supported.
    pub fn decrease_key(&mut self, handle: HeapHandle) -> HeapHandle {
        if handle.0 >= self.items.len() {
            return handle;
        }
        HeapHandle(self.sift_up(handle.0))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if (self.compare)(&self.items[index].value, &self.items[parent].value)
                == Ordering::Less
            {
                self.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            if left >= len {
                break;
            }
            let mut smallest = left;
            if right < len
                && (self.compare)(&self.items[right].value, &self.items[left].value)
                    == Ordering::Less
            {
                smallest = right;
            }
            if (self.compare)(&self.items[smallest].value, &self.items[index].value)
                == Ordering::Less
            {
                self.swap(index, smallest);
                index = smallest;
            } else {
                break;
            }
        }
    }

    // Keeps the stored indices in step with the array positions.
    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a, b);
        self.items[a].index = a;
        self.items[b].index = b;
    }
}
