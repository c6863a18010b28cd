use crate::error::SortError;

pub(crate) type ReduceFn<V> = dyn FnMut(V, V) -> Result<V, anyhow::Error>;

/// The optional combine function, applied wherever two entries with equal keys meet.
pub(crate) struct Reducer<V> {
    reduce: Option<Box<ReduceFn<V>>>,
    reductions: usize,
}

impl<V> Reducer<V> {
    pub(crate) fn none() -> Reducer<V> {
        Reducer {
            reduce: None,
            reductions: 0,
        }
    }

    pub(crate) fn new(reduce: Box<ReduceFn<V>>) -> Reducer<V> {
        Reducer {
            reduce: Some(reduce),
            reductions: 0,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.reduce.is_some()
    }

    pub(crate) fn reductions(&self) -> usize {
        self.reductions
    }

    pub(crate) fn reset(&mut self) {
        self.reductions = 0;
    }

    /// Combine an earlier value with a later one.
    pub(crate) fn reduce(&mut self, earlier: V, later: V) -> Result<V, anyhow::Error> {
        match self.reduce.as_mut() {
            Some(reduce) => {
                self.reductions += 1;
                reduce(earlier, later)
            }
            None => Err(SortError::Reduce("no reduce function configured".to_string()).into()),
        }
    }
}
