#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # marcshift: MARC record transcoding
//!
//! Converts bibliographic records between an in-memory [`Record`] model and
//! the wire formats used by library systems:
//!
//! - **ISO 2709** binary, with byte-exact directory offsets ([`iso2709`])
//! - **Aleph Sequential** line exports, with continuation-line merging ([`aleph`])
//! - **MARCXML** ([`marcxml`]) and **OAI-MARC** ([`oai_marcxml`])
//!
//! Streams are framed incrementally: a [`framing::FrameReader`] accepts input
//! chunks of any size and returns records as their boundaries arrive. The
//! [`reader`] and [`writer`] modules wrap the framers and encoders around
//! [`std::io::Read`] and [`std::io::Write`].
//!
//! ## Quick Start
//!
//! ```
//! use marcshift::{iso2709, aleph, Field, Leader, Record};
//!
//! let record = Record::builder(Leader::default())
//!     .control_field_str("001", "000000001")
//!     .field(Field::builder("245".to_string(), '1', '0')
//!         .subfield_str('a', "Suomen historia")
//!         .build())
//!     .build();
//!
//! let binary = iso2709::encode(&record)?;
//! let lines = aleph::encode(&iso2709::decode(&binary)?)?;
//! assert!(lines.contains("000000001 24510 L $$aSuomen historia"));
//! # Ok::<(), marcshift::MarcError>(())
//! ```
//!
//! ## Modules
//!
//! - [`record`]: Record model and canonical text form
//! - [`leader`]: 24-character record leader
//! - [`iso2709`]: ISO 2709 binary codec
//! - [`aleph`]: Aleph Sequential line codec
//! - [`marcxml`] / [`oai_marcxml`]: XML codecs
//! - [`framing`]: Chunk-driven record framers
//! - [`reader`] / [`writer`]: `std::io` adapters
//! - [`formats`]: Format traits and detection
//! - [`recovery`] / [`config`]: Error policy and reader configuration
//! - [`error`]: Error types and result type

pub mod aleph;
pub mod config;
pub mod error;
/// Format traits, format detection and runtime dispatch.
pub mod formats;
pub mod framing;
pub mod iso2709;
pub mod leader;
pub mod marcxml;
pub mod oai_marcxml;
pub mod reader;
/// Record model: `Record`, `Field`, `Subfield`, `ControlField`
pub mod record;
pub mod recovery;
pub mod writer;

pub use config::ReaderConfig;
pub use error::{MarcError, Result};
pub use framing::{AlephFrameReader, FrameReader, Iso2709FrameReader, MarcxmlFrameReader};
pub use leader::Leader;
pub use reader::{AlephReader, FramedReader, MarcReader, MarcxmlReader};
pub use record::{ControlField, Field, FieldBuilder, Record, RecordBuilder, Subfield};
pub use recovery::RecoveryMode;
pub use writer::{AlephWriter, MarcWriter, MarcxmlWriter};
