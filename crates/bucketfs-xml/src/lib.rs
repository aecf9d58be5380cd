//! S3 XML response parsing for bucketfs.
//!
//! The object store answers listing requests and failures with XML bodies. This
//! crate turns those bodies into plain Rust values; it never writes XML.
//!
//! # Key components
//!
//! - [`S3Deserialize`] trait and [`from_xml`] function for parsing a document
//!   with an expected root element
//! - [`ListBucketResult`] for `GET /bucket?prefix=...` responses
//! - [`ErrorDocument`] for the `<Error>` body S3 sends with non-2xx statuses
//!
//! # Example
//!
//! ```
//! use bucketfs_xml::{ListBucketResult, from_xml};
//!
//! let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
//! <ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
//!   <Name>bucket</Name>
//!   <IsTruncated>false</IsTruncated>
//!   <Contents><Key>store/a.txt</Key><Size>3</Size></Contents>
//! </ListBucketResult>"#;
//!
//! let result: ListBucketResult = from_xml(xml).unwrap();
//! assert_eq!(result.contents[0].key, "store/a.txt");
//! assert_eq!(result.contents[0].size, 3);
//! ```

pub mod deserialize;
pub mod error;
pub mod types;

pub use deserialize::{S3Deserialize, from_xml};
pub use error::XmlError;
pub use types::{CommonPrefix, ErrorDocument, ListBucketResult, ObjectEntry};
