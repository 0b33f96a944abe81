/// A value together with the database id it is persisted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stored<T> {
    id: i64,
    value: T,
}

impl<T> Stored<T> {
    pub fn new(id: i64, value: T) -> Self {
        Self { id, value }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Maps the value, keeping the id.
    pub fn map<U, F>(self, f: F) -> Stored<U>
    where
        F: FnOnce(T) -> U,
    {
        Stored::new(self.id, f(self.value))
    }
}

/// A persisted row whose value differs from the desired one.
///
/// The row keeps its identity: [`Update::stored`] pairs the existing id with
/// the new value, no new id is allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct Update<T> {
    existing: Stored<T>,
    value: T,
}

impl<T> Update<T> {
    pub fn new(existing: Stored<T>, value: T) -> Self {
        Self { existing, value }
    }

    /// The row as currently persisted.
    pub fn existing(&self) -> &Stored<T> {
        &self.existing
    }

    /// The desired value.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn id(&self) -> i64 {
        self.existing.id
    }

    pub fn into_stored(self) -> Stored<T> {
        let value = self.value;
        self.existing.map(|_| value)
    }
}

impl<T: Clone> Update<T> {
    /// The existing id paired with the desired value.
    pub fn stored(&self) -> Stored<T> {
        Stored::new(self.existing.id, self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_id() {
        let stored = Stored::new(3, "a").map(str::len);
        assert_eq!(stored, Stored::new(3, 1));
    }

    #[test]
    fn test_update_merges_into_existing_id() {
        let update = Update::new(Stored::new(1, "x"), "z");
        assert_eq!(update.id(), 1);
        assert_eq!(update.existing().value(), &"x");
        assert_eq!(update.stored(), Stored::new(1, "z"));
        assert_eq!(update.into_stored(), Stored::new(1, "z"));
    }
}
