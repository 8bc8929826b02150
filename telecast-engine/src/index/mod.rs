//! Mmapped index readers (§4.B): the two on-disk formats (`ISetMap`,
//! `IListMap`) and the lazy composed views built over them.

mod format;
mod ilist;
mod iset;
mod views;
pub mod writer;

pub use format::MappedIndex;
pub use ilist::MmapIntervalListMapping;
pub use iset::{ISetIntersection, ISetSubset, IsetReader, MmapIntervalSetMapping};
pub use views::{IListToISet, UnionIListsToISet};
