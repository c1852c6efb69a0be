//! Topic-based event bus for fanning native events out to gateway consumers.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/evmgate/evmgate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod bus;
pub use bus::{DEFAULT_SUBSCRIBER_CAPACITY, EventBus, Unsubscriber};

mod error;
pub use error::PubSubError;
