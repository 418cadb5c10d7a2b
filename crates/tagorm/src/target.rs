//! Binding targets: a single record, a `Vec` of records or a [`Boxed`] list
//! of boxed records, unified behind [`Target`].

use std::any::type_name;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::OrmResult;
use crate::mapping::{MappingCache, Record, StructMapping, bare_type_name};
use crate::naming::TableNaming;

/// Shape of a binding target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Single,
    SliceOfValues,
    SliceOfPointers,
}

impl Shape {
    pub fn is_single(self) -> bool {
        self == Shape::Single
    }
}

/// A destination for hydrated rows, or a source of records to write.
pub trait Target: Send {
    type Record: Record;

    fn shape(&self) -> Shape;

    /// Number of records currently held (1 for a single record).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element(&self, index: usize) -> Option<&Self::Record>;

    fn element_at(&mut self, index: usize) -> Option<&mut Self::Record>;

    /// Produce one more record through `populate`.
    ///
    /// Slices allocate a default record and append it only when `populate`
    /// succeeds. A single record is populated in place.
    fn grow_by<F>(&mut self, populate: F) -> OrmResult<()>
    where
        F: FnOnce(&mut Self::Record) -> OrmResult<()>;
}

impl<R: Record> Target for R {
    type Record = R;

    fn shape(&self) -> Shape {
        Shape::Single
    }

    fn len(&self) -> usize {
        1
    }

    fn element(&self, index: usize) -> Option<&R> {
        (index == 0).then_some(self)
    }

    fn element_at(&mut self, index: usize) -> Option<&mut R> {
        (index == 0).then_some(self)
    }

    fn grow_by<F>(&mut self, populate: F) -> OrmResult<()>
    where
        F: FnOnce(&mut R) -> OrmResult<()>,
    {
        populate(self)
    }
}

impl<R: Record> Target for Vec<R> {
    type Record = R;

    fn shape(&self) -> Shape {
        Shape::SliceOfValues
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element(&self, index: usize) -> Option<&R> {
        self.get(index)
    }

    fn element_at(&mut self, index: usize) -> Option<&mut R> {
        self.get_mut(index)
    }

    fn grow_by<F>(&mut self, populate: F) -> OrmResult<()>
    where
        F: FnOnce(&mut R) -> OrmResult<()>,
    {
        let mut record = R::default();
        populate(&mut record)?;
        self.push(record);
        Ok(())
    }
}

/// A list of boxed records, bound as [`Shape::SliceOfPointers`].
///
/// ```
/// use tagorm::{Boxed, Record, Shape, Target};
///
/// #[derive(Default, Record)]
/// struct Book {
///     #[db("id,key")]
///     id: i64,
/// }
///
/// let books: Boxed<Book> = Boxed(vec![Box::new(Book { id: 1 })]);
/// assert_eq!(books.shape(), Shape::SliceOfPointers);
/// assert_eq!(books[0].id, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Boxed<R>(pub Vec<Box<R>>);

impl<R> Boxed<R> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn into_inner(self) -> Vec<Box<R>> {
        self.0
    }
}

impl<R> Default for Boxed<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Deref for Boxed<R> {
    type Target = Vec<Box<R>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<R> DerefMut for Boxed<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<R> From<Vec<Box<R>>> for Boxed<R> {
    fn from(records: Vec<Box<R>>) -> Self {
        Self(records)
    }
}

impl<R> FromIterator<R> for Boxed<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self(iter.into_iter().map(Box::new).collect())
    }
}

impl<R: Record> Target for Boxed<R> {
    type Record = R;

    fn shape(&self) -> Shape {
        Shape::SliceOfPointers
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn element(&self, index: usize) -> Option<&R> {
        self.0.get(index).map(|b| &**b)
    }

    fn element_at(&mut self, index: usize) -> Option<&mut R> {
        self.0.get_mut(index).map(|b| &mut **b)
    }

    fn grow_by<F>(&mut self, populate: F) -> OrmResult<()>
    where
        F: FnOnce(&mut R) -> OrmResult<()>,
    {
        let mut record = Box::<R>::default();
        populate(&mut *record)?;
        self.0.push(record);
        Ok(())
    }
}

/// Table name of `R`: its declared name, or the naming strategy applied to
/// the bare type name.
pub fn table_name_of<R: Record>(naming: &TableNaming) -> String {
    match R::table_name() {
        Some(name) => name.to_string(),
        None => naming.apply(bare_type_name(type_name::<R>())),
    }
}

/// A target bound to its record mapping and table, for one execution.
pub struct RecordDescriptor<'a, T: Target> {
    target: &'a mut T,
    mapping: Arc<StructMapping<T::Record>>,
    table: String,
}

impl<'a, T: Target> RecordDescriptor<'a, T> {
    pub fn new(
        target: &'a mut T,
        mappings: &MappingCache,
        naming: &TableNaming,
    ) -> OrmResult<Self> {
        Ok(Self {
            mapping: mappings.get::<T::Record>()?,
            table: table_name_of::<T::Record>(naming),
            target,
        })
    }

    pub fn shape(&self) -> Shape {
        self.target.shape()
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn mapping(&self) -> &Arc<StructMapping<T::Record>> {
        &self.mapping
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn element(&self, index: usize) -> Option<&T::Record> {
        self.target.element(index)
    }

    pub fn element_at(&mut self, index: usize) -> Option<&mut T::Record> {
        self.target.element_at(index)
    }

    pub fn grow_by<F>(&mut self, populate: F) -> OrmResult<()>
    where
        F: FnOnce(&mut T::Record) -> OrmResult<()>,
    {
        self.target.grow_by(populate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;
    use crate::mapping::MappingBuilder;

    #[derive(Debug, Default, PartialEq)]
    struct BookCategory {
        id: i64,
    }

    impl Record for BookCategory {
        fn describe(b: &mut MappingBuilder<Self>) {
            b.column("id", "id,key", |r| &r.id, |r| &mut r.id);
        }
    }

    fn set_id(id: i64) -> impl FnOnce(&mut BookCategory) -> OrmResult<()> {
        move |r| {
            r.id = id;
            Ok(())
        }
    }

    #[test]
    fn single_is_populated_in_place() {
        let mut one = BookCategory::default();
        assert_eq!(one.shape(), Shape::Single);
        assert_eq!(Target::len(&one), 1);
        one.grow_by(set_id(7)).expect("grow");
        assert_eq!(one.id, 7);
        assert!(one.element_at(1).is_none());
    }

    #[test]
    fn slices_append() {
        let mut values: Vec<BookCategory> = Vec::new();
        values.grow_by(set_id(1)).expect("grow");
        values.grow_by(set_id(2)).expect("grow");
        assert_eq!(values.shape(), Shape::SliceOfValues);
        assert_eq!(values.element(1).map(|r| r.id), Some(2));

        let mut boxed: Boxed<BookCategory> = Boxed::new();
        boxed.grow_by(set_id(3)).expect("grow");
        boxed.grow_by(set_id(4)).expect("grow");
        assert_eq!(boxed.shape(), Shape::SliceOfPointers);
        assert_eq!(Target::len(&boxed), 2);
        assert_eq!(boxed.element(1).map(|r| r.id), Some(4));
        assert_eq!(boxed.into_inner()[0].id, 3);
    }

    #[test]
    fn default_naming_keeps_the_type_name() {
        let naming = crate::db::DbConfig::default().table_naming;
        assert_eq!(table_name_of::<BookCategory>(&naming), "BookCategory");
    }

    #[test]
    fn failed_populate_does_not_append() {
        let mut values: Vec<BookCategory> = Vec::new();
        let err = values.grow_by(|_| Err(OrmError::decode("id", "bad")));
        assert!(err.is_err());
        assert!(values.is_empty());
    }

    #[test]
    fn descriptor_resolves_table_name() {
        let cache = MappingCache::new();
        let mut rows: Vec<BookCategory> = Vec::new();
        let desc = RecordDescriptor::new(&mut rows, &cache, &TableNaming::SnakeCasePlural)
            .expect("descriptor");
        assert_eq!(desc.table_name(), "book_categories");
        assert_eq!(desc.mapping().key_columns(), vec!["id"]);
    }
}
