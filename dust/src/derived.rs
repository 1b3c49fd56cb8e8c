//! Lazily computed quantities derived from optical properties

/// A derived quantity that is either unset or holds a computed value.
///
/// Values are installed explicitly with [`Derived::set`], computed on demand
/// with [`Derived::ensure_computed`], and dropped with [`Derived::reset`] when
/// the inputs they were computed from change.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived<T> {
    value: Option<T>,
}

impl<T> Default for Derived<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Derived<T> {
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn computed(value: T) -> Self {
        Self { value: Some(value) }
    }

    pub fn is_computed(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    pub fn reset(&mut self) {
        self.value = None;
    }

    /// Return the computed value, running `compute` first if unset.
    ///
    /// A failed computation leaves the quantity unset.
    pub fn ensure_computed<E>(
        &mut self,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        let value = match self.value.take() {
            Some(value) => value,
            None => compute()?,
        };
        Ok(self.value.insert(value))
    }
}
