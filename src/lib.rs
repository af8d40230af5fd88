//! ocrdex - incremental OCR indexing and substring search for image folders.
//!
//! ocrdex walks a directory tree, runs every image it has not seen before
//! through an OCR engine, and keeps the recognized text in a local
//! [redb](https://github.com/cberner/redb) database keyed by file path.
//! Re-running over the same tree only pays for new images.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ocrdex::{Config, Store};
//! use ocrdex::indexer::{self, IndexOptions};
//!
//! let config = Config::load(None, &[], None).unwrap();
//! let store = Store::open(&config.data_dir.images_db()).unwrap();
//! let mut recognizer = config.recognizer();
//!
//! let options = IndexOptions {
//!     languages: config.languages().unwrap(),
//!     since: ocrdex::since::parse_since(Some("1 year ago")).unwrap(),
//!     show_progress: false,
//! };
//! indexer::index_directory(&store, &mut recognizer, Path::new("photos"), &options)
//!     .unwrap();
//!
//! for path in ocrdex::search::execute_search(&store, "invoice").unwrap() {
//!     println!("{path}");
//! }
//! ```

pub mod cli;
pub mod config;
pub mod data_dir;
pub mod error;
pub mod indexer;
pub mod recognizer;
pub mod search;
pub mod since;
pub mod store;
pub mod walker;

pub use config::Config;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use recognizer::{Recognizer, TesseractRecognizer};
pub use store::Store;
