//! malt-brew library interface
//!
//! Turns one uploaded file (plain text, or a zip/tar archive) into a typed
//! content unit plus attachments, and dispatches it to the handler its
//! front matter names.
//!
//! Data flow: upload → [`Brewery`] → [`enzymes`]* → per-member [`Grower`]
//! → [`Yeasts`] dispatch → handler hooks → URL or [`BrewError`].

pub mod brewery;
pub mod brewing;
pub mod enzymes;
pub mod grower;
pub mod storage;
pub mod upload;
pub mod yeast;
pub mod yeasts;

pub use crate::brewery::{Brewery, Primer};
pub use crate::brewing::{BrewError, FieldType, History, Member, Meta, MetaValue, YeastError};
pub use crate::enzymes::{default_enzymes, Enzyme, EnzymeError, TarEnzyme, ZipEnzyme};
pub use crate::grower::Grower;
pub use crate::storage::{LocalStorage, MemoryStorage, Storage};
pub use crate::upload::{RequestMeta, UploadedFile};
pub use crate::yeast::{Culture, Schema, Yeast, Yeasts};
