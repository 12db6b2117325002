use derivative::Derivative;
use std::marker::PhantomData;

/// A typed handle into a [`SlotMap`](crate::slot_map::SlotMap).
///
/// The generation is bumped every time the underlying entry is removed, so a handle that
/// outlived its data is detected instead of aliasing whatever was inserted next.
#[derive(Derivative)]
#[derivative(
    Debug(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    Hash(bound = "")
)]
pub struct Slot<T> {
    id: usize,
    generation: usize,
    #[derivative(Debug = "ignore", PartialEq = "ignore", Hash = "ignore")]
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> Slot<T> {
    pub fn new(id: usize, generation: usize) -> Self {
        Self {
            id,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn generation(&self) -> usize {
        self.generation
    }
}
