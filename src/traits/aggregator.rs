/// A trait that defines how to fold a stream of items into one output.
///
/// The matcher feeds one `Item` per peak (centroid id and intensity)
/// and collects the `Output` once the pixel is exhausted.
///
/// The `add` method takes an item of type `Item` OR a type that
/// implements `Into<Item>`.
pub trait Aggregator: Send + Sync {
    type Item: Send + Sync + Clone;
    type Output: Send + Sync;

    fn add(&mut self, item: impl Into<Self::Item>);
    fn finalize(self) -> Self::Output;
}
