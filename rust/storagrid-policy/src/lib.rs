#![warn(missing_docs)]

//! Access-policy documents for object-storage containers, and the codec that
//! moves them to and from the JSON encoding spoken by the storage-management
//! API.
//!
//! The wire encoding is ambiguous on input: most list-valued statement fields
//! may arrive either as a bare string or as an array, and principals come in
//! several shapes. [`decode`] canonicalizes all of them into a
//! [`PolicyDocument`]; [`encode`] emits the canonical wire form again.
//!
//! ```
//! use storagrid_policy::{PolicyDocument, Principal, Statement, decode, encode};
//!
//! # fn main() -> Result<(), storagrid_policy::PolicyError> {
//! let document = PolicyDocument::new("read-only", "2012-10-17").with_statement(
//!     Statement::allow()
//!         .action("s3:GetObject")
//!         .resource("arn:aws:s3:::reports/*")
//!         .principal(Principal::aws(["arn:aws:iam::123456789012:user/auditor"]))
//!         .build(),
//! );
//!
//! let bytes = encode(&document)?;
//! assert_eq!(decode(&bytes)?, document);
//! # Ok(())
//! # }
//! ```

mod codec;
pub use codec::*;

mod document;
pub use document::*;

mod error;
pub use error::*;

mod principal;
pub use principal::*;

pub mod value;
