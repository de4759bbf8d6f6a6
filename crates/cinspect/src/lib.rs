//! cinspect
//!
//! Query and inspection layer over the cinspect analysis engine:
//! - [`Index`]: shared engine context that owns its translation units
//! - [`TranslationUnit`]: one analyzed file with parse, reparse, save and load
//! - [`Cursor`]: generation-checked handles into the AST with tri-state visitation
//! - [`SourceLocation`], [`SourceRange`], [`File`] and [`Token`]
//! - [`IndexAction`] and [`IndexerCallbacks`] for declaration and reference indexing
//!
//! Every handle stays valid only until its unit is reparsed or disposed.
//! After that, queries fail with [`Error::StaleHandle`] instead of reading
//! stale data.

/// Bitset newtype over `u32` with named flags.
macro_rules! option_set {
    ($(#[$meta:meta])* $name:ident { $($(#[$flag_meta:meta])* $flag:ident = $value:expr;)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const NONE: $name = $name(0);
            $($(#[$flag_meta])* pub const $flag: $name = $name($value);)*

            pub const fn from_bits(bits: u32) -> Self {
                $name(bits)
            }

            pub const fn bits(self) -> u32 {
                self.0
            }

            pub const fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }
    };
}

mod config;
mod cursor;
pub mod diagnostic;
mod error;
mod index;
mod indexing;
mod location;
mod token;
mod unit;
mod unsaved;

pub use config::{IndexConfig, CONFIG_ENV};
pub use cursor::{ChildVisit, Cursor};
pub use diagnostic::{Diagnostic, DiagnosticLocation, FixIt, Severity};
pub use error::{Error, Result, StaleReason};
pub use index::{Index, IndexOptions};
pub use indexing::{
    DeclInfo, EntityRefInfo, IncludedFileInfo, IndexAction, IndexerCallbacks, IndexingOptions,
};
pub use location::{File, FileUniqueId, SourceLocation, SourceRange};
pub use token::{Token, TokenKind};
pub use unit::{ParseOptions, ReparseOptions, SaveOptions, TranslationUnit};
pub use unsaved::UnsavedFile;

pub use cinspect_engine::{CursorKind, Entity, FunctionInfo, Language, RecordInfo, StorageClass, VarInfo};
